//! Stream data and termination.

use onenet_core::{MsgId, PacketKind};

use super::block::{render_terminate, TERMINATE_REASON_IDX};
use super::response::NackReason;
use super::{encode_msg_header, PayloadFrame, BODY_IDX};
use crate::error::ParseError;
use crate::render::{FieldValue, Fields, Render};

const ELAPSED_IDX: usize = BODY_IDX;
const RESPONSE_FLAG_IDX: usize = BODY_IDX + 4;
const STREAM_DATA_IDX: usize = BODY_IDX + 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamBody {
    Data {
        elapsed_ms: u32,
        response_requested: bool,
        data: Vec<u8>,
    },
    Terminate { reason: NackReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPayload {
    pub frame: PayloadFrame,
    pub msg_id: MsgId,
    pub body: StreamBody,
}

impl StreamPayload {
    pub fn parse(kind: PacketKind, frame: PayloadFrame) -> Result<Self, ParseError> {
        let view = frame.view();
        let (msg_id, _) = view.msg_header()?;
        let body = if kind == PacketKind::StreamTerminate {
            StreamBody::Terminate {
                reason: NackReason(view.u8("termination reason", TERMINATE_REASON_IDX)?),
            }
        } else {
            StreamBody::Data {
                elapsed_ms: view.u32_be("elapsed ms", ELAPSED_IDX)?,
                response_requested: view.u8("response flag", RESPONSE_FLAG_IDX)? != 0,
                data: view.rest(STREAM_DATA_IDX).to_vec(),
            }
        };
        Ok(Self {
            frame,
            msg_id,
            body,
        })
    }

    /// Stream data bytes that follow the payload CRC.
    pub fn encode_data_body(msg_id: MsgId, elapsed_ms: u32, response_requested: bool, data: &[u8]) -> Vec<u8> {
        let mut out = encode_msg_header(msg_id, 0).to_vec();
        out.extend_from_slice(&elapsed_ms.to_be_bytes());
        out.push(u8::from(response_requested));
        out.extend_from_slice(data);
        out
    }
}

impl Render for StreamPayload {
    fn render(&self, out: &mut Fields) {
        match &self.body {
            StreamBody::Data {
                elapsed_ms,
                response_requested,
                data,
            } => {
                out.push("elapsed ms", FieldValue::number(*elapsed_ms, 8));
                out.push("response requested", FieldValue::Flag(*response_requested));
                out.push("data", FieldValue::Bytes(data.clone()));
            }
            StreamBody::Terminate { reason } => render_terminate(*reason, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_packet_exposes_elapsed_time_and_flag() {
        let mut bytes = vec![0x00];
        bytes.extend(StreamPayload::encode_data_body(MsgId::new(3).unwrap(), 1500, true, &[0xDE, 0xAD]));
        bytes.resize(32, 0);
        let stream = StreamPayload::parse(PacketKind::StreamData, PayloadFrame::new(bytes)).unwrap();
        let StreamBody::Data {
            elapsed_ms,
            response_requested,
            data,
        } = stream.body
        else {
            panic!("expected stream data");
        };
        assert_eq!(elapsed_ms, 1500);
        assert!(response_requested);
        assert_eq!(&data[..2], &[0xDE, 0xAD]);
        assert_eq!(data.len(), 32 - STREAM_DATA_IDX);
    }

    #[test]
    fn short_stream_data_is_reported() {
        let bytes = vec![0x00, 0x00, 0x30, 0x00, 0x00];
        assert!(matches!(
            StreamPayload::parse(PacketKind::StreamData, PayloadFrame::new(bytes)),
            Err(ParseError::OutOfBounds {
                field: "elapsed ms",
                ..
            })
        ));
    }
}

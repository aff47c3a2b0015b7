//! Block transfer data and termination.

use onenet_core::{MsgId, PacketKind};

use super::response::NackReason;
use super::{encode_msg_header, PayloadFrame, BODY_IDX};
use crate::error::ParseError;
use crate::render::{FieldValue, Fields, Render};

const PACKET_INDEX_IDX: usize = BODY_IDX;
const CHUNK_INDEX_IDX: usize = BODY_IDX + 2;
const BLOCK_DATA_IDX: usize = BODY_IDX + 3;
/// Termination reason, shared with stream termination.
pub const TERMINATE_REASON_IDX: usize = BODY_IDX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockBody {
    Data {
        packet_index: u16,
        chunk_index: u8,
        data: Vec<u8>,
    },
    Terminate { reason: NackReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPayload {
    pub frame: PayloadFrame,
    pub msg_id: MsgId,
    pub body: BlockBody,
}

impl BlockPayload {
    pub fn parse(kind: PacketKind, frame: PayloadFrame) -> Result<Self, ParseError> {
        let view = frame.view();
        let (msg_id, _) = view.msg_header()?;
        let body = if kind == PacketKind::BlockTerminate {
            BlockBody::Terminate {
                reason: NackReason(view.u8("termination reason", TERMINATE_REASON_IDX)?),
            }
        } else {
            BlockBody::Data {
                packet_index: view.u16_be("packet index", PACKET_INDEX_IDX)?,
                chunk_index: view.u8("chunk index", CHUNK_INDEX_IDX)?,
                data: view.rest(BLOCK_DATA_IDX).to_vec(),
            }
        };
        Ok(Self {
            frame,
            msg_id,
            body,
        })
    }

    /// Block data bytes that follow the payload CRC.
    pub fn encode_data_body(msg_id: MsgId, packet_index: u16, chunk_index: u8, data: &[u8]) -> Vec<u8> {
        let mut out = encode_msg_header(msg_id, 0).to_vec();
        out.extend_from_slice(&packet_index.to_be_bytes());
        out.push(chunk_index);
        out.extend_from_slice(data);
        out
    }
}

pub(crate) fn render_terminate(reason: NackReason, out: &mut Fields) {
    out.push("termination reason", reason.field());
}

impl Render for BlockPayload {
    fn render(&self, out: &mut Fields) {
        match &self.body {
            BlockBody::Data {
                packet_index,
                chunk_index,
                data,
            } => {
                out.push("packet index", FieldValue::number(*packet_index, 4));
                out.push("chunk index", FieldValue::number(*chunk_index, 2));
                out.push("data", FieldValue::Bytes(data.clone()));
            }
            BlockBody::Terminate { reason } => render_terminate(*reason, out),
        }
    }
}

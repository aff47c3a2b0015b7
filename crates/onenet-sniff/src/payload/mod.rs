//! Decrypted payload variants.
//!
//! Every data-bearing payload starts with the same three bytes:
//!
//! ```text
//! [0]     payload CRC
//! [1..3)  message id (high 12 bits) | message type or handle (low 4 bits)
//! ```
//!
//! Variant bodies follow at [`BODY_IDX`]. Offsets are only read through
//! [`PayloadView`], which turns a short buffer into a [`ParseError`].

pub mod admin;
pub mod app;
pub mod block;
pub mod features;
pub mod invite;
pub mod response;
pub mod route;
pub mod stream;

use onenet_codec::layout::PLD_CRC_IDX;
use onenet_core::{MsgId, PacketKind};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::render::{FieldValue, Fields, Render};

pub use admin::AdminPayload;
pub use app::AppPayload;
pub use block::BlockPayload;
pub use features::FeaturesPayload;
pub use invite::InvitePayload;
pub use response::ResponsePayload;
pub use route::RoutePayload;
pub use stream::StreamPayload;

pub const MSG_HEADER_IDX: usize = 1;
pub const MSG_HEADER_LEN: usize = 2;
pub const BODY_IDX: usize = MSG_HEADER_IDX + MSG_HEADER_LEN;

/// Bounds-checked reads from a decrypted payload.
#[derive(Debug, Clone, Copy)]
pub struct PayloadView<'a> {
    bytes: &'a [u8],
}

impl<'a> PayloadView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn slice(&self, field: &'static str, start: usize, len: usize) -> Result<&'a [u8], ParseError> {
        let end = start + len;
        self.bytes.get(start..end).ok_or(ParseError::OutOfBounds {
            field,
            start,
            end,
            len: self.bytes.len(),
        })
    }

    pub fn u8(&self, field: &'static str, idx: usize) -> Result<u8, ParseError> {
        Ok(self.slice(field, idx, 1)?[0])
    }

    pub fn u16_be(&self, field: &'static str, idx: usize) -> Result<u16, ParseError> {
        let b = self.slice(field, idx, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32_be(&self, field: &'static str, idx: usize) -> Result<u32, ParseError> {
        let b = self.slice(field, idx, 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Bytes from `start` to the end; empty when `start` is past the end.
    pub fn rest(&self, start: usize) -> &'a [u8] {
        self.bytes.get(start..).unwrap_or(&[])
    }

    /// Message id and the 4-bit selector sharing its word.
    pub fn msg_header(&self) -> Result<(MsgId, u8), ParseError> {
        let word = self.u16_be("message id", MSG_HEADER_IDX)?;
        Ok((MsgId::from_masked(word >> 4), (word & 0x0F) as u8))
    }
}

/// Packs a message id and 4-bit selector into the two header bytes.
pub fn encode_msg_header(msg_id: MsgId, selector: u8) -> [u8; MSG_HEADER_LEN] {
    ((msg_id.raw() << 4) | u16::from(selector & 0x0F)).to_be_bytes()
}

/// Decrypted payload bytes owned by a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadFrame {
    bytes: Vec<u8>,
}

impl PayloadFrame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn view(&self) -> PayloadView<'_> {
        PayloadView::new(&self.bytes)
    }

    /// Embedded payload CRC.
    pub fn crc(&self) -> u8 {
        self.bytes.get(PLD_CRC_IDX).copied().unwrap_or(0)
    }
}

/// Message type selector of single data and route packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    Application = 0,
    Admin = 1,
    Features = 2,
    Route = 3,
}

impl MessageType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(MessageType::Application),
            1 => Some(MessageType::Admin),
            2 => Some(MessageType::Features),
            3 => Some(MessageType::Route),
            _ => None,
        }
    }
}

/// A classified, decrypted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    SingleApplication(AppPayload),
    SingleAdmin(AdminPayload),
    SingleFeatures(FeaturesPayload),
    SingleRoute(RoutePayload),
    Invite(InvitePayload),
    Response(ResponsePayload),
    Block(BlockPayload),
    Stream(StreamPayload),
}

impl Payload {
    /// Classifies a decrypted payload whose CRC already matched.
    pub fn parse(kind: PacketKind, decrypted: Vec<u8>) -> Result<Self, ParseError> {
        let frame = PayloadFrame::new(decrypted);
        match kind {
            PacketKind::SingleData | PacketKind::Route => Self::parse_data(frame),
            PacketKind::Invite | PacketKind::InviteRequest => {
                InvitePayload::parse(kind, frame).map(Payload::Invite)
            }
            PacketKind::BlockData | PacketKind::BlockTerminate => {
                BlockPayload::parse(kind, frame).map(Payload::Block)
            }
            PacketKind::StreamData | PacketKind::StreamTerminate => {
                StreamPayload::parse(kind, frame).map(Payload::Stream)
            }
            _ => ResponsePayload::parse(kind, frame).map(Payload::Response),
        }
    }

    fn parse_data(frame: PayloadFrame) -> Result<Self, ParseError> {
        let (msg_id, selector) = frame.view().msg_header()?;
        match MessageType::from_code(selector) {
            Some(MessageType::Application) => {
                AppPayload::parse(frame, msg_id).map(Payload::SingleApplication)
            }
            Some(MessageType::Admin) => AdminPayload::parse(frame, msg_id).map(Payload::SingleAdmin),
            Some(MessageType::Features) => {
                FeaturesPayload::parse(frame, msg_id).map(Payload::SingleFeatures)
            }
            Some(MessageType::Route) => RoutePayload::parse(frame, msg_id).map(Payload::SingleRoute),
            None => Err(ParseError::UnknownMessageType(selector)),
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Payload::SingleApplication(_) => "application",
            Payload::SingleAdmin(_) => "admin",
            Payload::SingleFeatures(_) => "features",
            Payload::SingleRoute(_) => "route",
            Payload::Invite(_) => "invite",
            Payload::Response(_) => "response",
            Payload::Block(_) => "block",
            Payload::Stream(_) => "stream",
        }
    }

    pub fn frame(&self) -> &PayloadFrame {
        match self {
            Payload::SingleApplication(p) => &p.frame,
            Payload::SingleAdmin(p) => &p.frame,
            Payload::SingleFeatures(p) => &p.frame,
            Payload::SingleRoute(p) => &p.frame,
            Payload::Invite(p) => &p.frame,
            Payload::Response(p) => &p.frame,
            Payload::Block(p) => &p.frame,
            Payload::Stream(p) => &p.frame,
        }
    }

    pub fn crc(&self) -> u8 {
        self.frame().crc()
    }

    /// Message id, for variants that carry one.
    pub fn msg_id(&self) -> Option<MsgId> {
        match self {
            Payload::SingleApplication(p) => Some(p.msg_id),
            Payload::SingleAdmin(p) => Some(p.msg_id),
            Payload::SingleFeatures(p) => Some(p.msg_id),
            Payload::SingleRoute(p) => Some(p.msg_id),
            Payload::Invite(_) => None,
            Payload::Response(p) => Some(p.msg_id),
            Payload::Block(p) => Some(p.msg_id),
            Payload::Stream(p) => Some(p.msg_id),
        }
    }

    pub fn admin_type(&self) -> Option<u8> {
        match self {
            Payload::SingleAdmin(p) => Some(p.admin_type),
            _ => None,
        }
    }
}

impl Render for Payload {
    fn render(&self, out: &mut Fields) {
        out.push("variant", FieldValue::Text(self.variant_name().to_string()));
        out.push("payload crc", FieldValue::number(self.crc(), 2));
        if let Some(msg_id) = self.msg_id() {
            out.push("msg id", FieldValue::number(msg_id.raw(), 3));
        }
        match self {
            Payload::SingleApplication(p) => p.render(out),
            Payload::SingleAdmin(p) => p.render(out),
            Payload::SingleFeatures(p) => p.render(out),
            Payload::SingleRoute(p) => p.render(out),
            Payload::Invite(p) => p.render(out),
            Payload::Response(p) => p.render(out),
            Payload::Block(p) => p.render(out),
            Payload::Stream(p) => p.render(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_payload(selector: u8, body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xAA];
        bytes.extend_from_slice(&encode_msg_header(MsgId::new(0x123).unwrap(), selector));
        bytes.extend_from_slice(body);
        bytes.resize(8, 0);
        bytes
    }

    #[test]
    fn msg_header_splits_id_and_selector() {
        let header = encode_msg_header(MsgId::new(0xABC).unwrap(), 0x5);
        assert_eq!(header, [0xAB, 0xC5]);
        let bytes = [0x00, 0xAB, 0xC5];
        let (id, selector) = PayloadView::new(&bytes).msg_header().unwrap();
        assert_eq!(id.raw(), 0xABC);
        assert_eq!(selector, 5);
    }

    #[test]
    fn view_reports_out_of_bounds_reads() {
        let bytes = [1_u8, 2, 3];
        let view = PayloadView::new(&bytes);
        assert_eq!(view.u16_be("x", 1), Ok(0x0203));
        assert_eq!(
            view.u32_be("elapsed", 1),
            Err(ParseError::OutOfBounds {
                field: "elapsed",
                start: 1,
                end: 5,
                len: 3
            })
        );
        assert!(view.rest(9).is_empty());
    }

    #[test]
    fn data_kinds_dispatch_on_message_type() {
        let app = Payload::parse(PacketKind::SingleData, data_payload(0, &[0x12, 0x60, 0x01, 0x00, 0x01]))
            .unwrap();
        assert_eq!(app.variant_name(), "application");
        assert_eq!(app.crc(), 0xAA);
        assert_eq!(app.msg_id().map(MsgId::raw), Some(0x123));

        let admin = Payload::parse(PacketKind::SingleData, data_payload(1, &[0x00])).unwrap();
        assert_eq!(admin.admin_type(), Some(0x00));

        let route = Payload::parse(PacketKind::Route, data_payload(3, &[0x00, 0x10, 0x02])).unwrap();
        assert_eq!(route.variant_name(), "route");
    }

    #[test]
    fn unknown_message_type_is_a_parse_error() {
        assert_eq!(
            Payload::parse(PacketKind::SingleData, data_payload(9, &[])),
            Err(ParseError::UnknownMessageType(9))
        );
    }

    #[test]
    fn render_starts_with_common_fields() {
        let app = Payload::parse(PacketKind::SingleData, data_payload(0, &[0x12, 0x60, 0x01, 0x00, 0x01]))
            .unwrap();
        let fields = app.rendered();
        assert_eq!(fields.get("variant"), Some(&FieldValue::Text("application".into())));
        assert_eq!(fields.get("msg id"), Some(&FieldValue::number(0x123_u16, 3)));
    }
}

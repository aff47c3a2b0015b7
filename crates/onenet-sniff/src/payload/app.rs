//! Application messages carried by single data packets.

use onenet_core::MsgId;
use serde::{Deserialize, Serialize};

use super::{encode_msg_header, MessageType, PayloadFrame, PayloadView, BODY_IDX};
use crate::error::ParseError;
use crate::render::{FieldValue, Fields, Render};

const UNITS_IDX: usize = BODY_IDX;
const CLASS_TYPE_IDX: usize = BODY_IDX + 1;
const DATA_IDX: usize = BODY_IDX + 3;

const MSG_CLASS_NAMES: [&str; 10] = [
    "status",
    "status change",
    "status query response",
    "status command response",
    "status fast query response",
    "status ack response",
    "command",
    "query",
    "fast query",
    "poll",
];

const MSG_TYPE_NAMES: [&str; 12] = [
    "switch",
    "percent",
    "temperature",
    "humidity",
    "pressure",
    "rainfall",
    "speed",
    "direction",
    "opening",
    "seal",
    "unit type count",
    "unit type",
];

/// Name of a 4-bit application message class.
pub fn msg_class_name(class: u8) -> Option<&'static str> {
    MSG_CLASS_NAMES.get(class as usize).copied()
}

/// Name of a 12-bit application message type.
pub fn msg_type_name(msg_type: u16) -> Option<&'static str> {
    MSG_TYPE_NAMES.get(msg_type as usize).copied()
}

/// Unit-addressed application message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMessage {
    pub src_unit: u8,
    pub dst_unit: u8,
    /// 4-bit message class.
    pub msg_class: u8,
    /// 12-bit message type.
    pub msg_type: u16,
    pub data: u16,
}

impl AppMessage {
    pub fn parse(view: PayloadView<'_>) -> Result<Self, ParseError> {
        let units = view.u8("units", UNITS_IDX)?;
        let class_type = view.u16_be("message class", CLASS_TYPE_IDX)?;
        Ok(Self {
            src_unit: units >> 4,
            dst_unit: units & 0x0F,
            msg_class: (class_type >> 12) as u8,
            msg_type: class_type & 0x0FFF,
            data: view.u16_be("data", DATA_IDX)?,
        })
    }

    /// Message bytes that follow the payload CRC, ready for encryption.
    pub fn encode_body(&self, msg_id: MsgId) -> Vec<u8> {
        let mut out = Vec::with_capacity(7);
        out.extend_from_slice(&encode_msg_header(msg_id, MessageType::Application as u8));
        out.push(((self.src_unit & 0x0F) << 4) | (self.dst_unit & 0x0F));
        let class_type = (u16::from(self.msg_class & 0x0F) << 12) | (self.msg_type & 0x0FFF);
        out.extend_from_slice(&class_type.to_be_bytes());
        out.extend_from_slice(&self.data.to_be_bytes());
        out
    }

    pub fn render(&self, out: &mut Fields) {
        out.push("src unit", FieldValue::number(self.src_unit, 1));
        out.push("dst unit", FieldValue::number(self.dst_unit, 1));
        out.push(
            "msg class",
            FieldValue::named(self.msg_class, 1, msg_class_name(self.msg_class)),
        );
        out.push(
            "msg type",
            FieldValue::named(self.msg_type, 3, msg_type_name(self.msg_type)),
        );
        out.push("data", FieldValue::number(self.data, 4));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPayload {
    pub frame: PayloadFrame,
    pub msg_id: MsgId,
    pub message: AppMessage,
}

impl AppPayload {
    pub fn parse(frame: PayloadFrame, msg_id: MsgId) -> Result<Self, ParseError> {
        let message = AppMessage::parse(frame.view())?;
        Ok(Self {
            frame,
            msg_id,
            message,
        })
    }
}

impl Render for AppPayload {
    fn render(&self, out: &mut Fields) {
        self.message.render(out);
    }
}

//! Acks and nacks of every packet family.
//!
//! ```text
//! [1..3)  message id | handle
//! [3]     nack reason (nacks only)
//! [..)    ack/nack payload selected by handle, `payload_width(handle)` bytes
//! ```

use std::fmt;

use onenet_core::{Did, MsgId, PacketKind};
use serde::{Deserialize, Serialize};

use super::features::Features;
use super::route::{render_route, unpack_dids};
use super::{PayloadFrame, PayloadView, BODY_IDX};
use crate::error::ParseError;
use crate::render::{FieldValue, Fields, Render};

/// Selector for the ack/nack payload union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Handle {
    Ack = 0x0,
    Features = 0x1,
    Data = 0x2,
    Value = 0x3,
    TimeMs = 0x4,
    TimeoutMs = 0x5,
    SlowDownMs = 0x6,
    SpeedUpMs = 0x7,
    PauseMs = 0x8,
    ResponseTimeMs = 0x9,
    KeyFragment = 0xA,
    Status = 0xB,
    AdminMsg = 0xC,
    BlockPacketsReceived = 0xD,
    Route = 0xE,
    Application = 0xF,
}

impl Handle {
    const ALL: [Handle; 16] = [
        Handle::Ack,
        Handle::Features,
        Handle::Data,
        Handle::Value,
        Handle::TimeMs,
        Handle::TimeoutMs,
        Handle::SlowDownMs,
        Handle::SpeedUpMs,
        Handle::PauseMs,
        Handle::ResponseTimeMs,
        Handle::KeyFragment,
        Handle::Status,
        Handle::AdminMsg,
        Handle::BlockPacketsReceived,
        Handle::Route,
        Handle::Application,
    ];

    /// Every 4-bit code names a handle.
    pub fn from_code(code: u8) -> Self {
        Self::ALL[(code & 0x0F) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            Handle::Ack => "none",
            Handle::Features => "features",
            Handle::Data => "data",
            Handle::Value => "value",
            Handle::TimeMs => "time ms",
            Handle::TimeoutMs => "timeout ms",
            Handle::SlowDownMs => "slow down ms",
            Handle::SpeedUpMs => "speed up ms",
            Handle::PauseMs => "pause ms",
            Handle::ResponseTimeMs => "response time ms",
            Handle::KeyFragment => "key fragment",
            Handle::Status => "status",
            Handle::AdminMsg => "admin msg",
            Handle::BlockPacketsReceived => "block packets received",
            Handle::Route => "route",
            Handle::Application => "application",
        }
    }
}

/// Bytes of ack/nack payload selected by each handle.
pub const fn payload_width(handle: Handle) -> usize {
    match handle {
        Handle::Ack => 0,
        Handle::Route => 12,
        _ => 4,
    }
}

const NACK_REASON_NAMES: [&str; 20] = [
    "unset",
    "internal error",
    "busy",
    "bad position",
    "bad crc",
    "bad data",
    "no response",
    "unsupported",
    "invalid length",
    "already in progress",
    "not authorized",
    "device function error",
    "invalid max hops",
    "invalid hop count",
    "invalid peer",
    "out of resources",
    "bad key",
    "timeout",
    "no route",
    "transaction aborted",
];

/// Nack and termination reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NackReason(pub u8);

impl NackReason {
    pub const GENERAL: NackReason = NackReason(0xFF);

    pub fn name(self) -> Option<&'static str> {
        if self == Self::GENERAL {
            return Some("general error");
        }
        NACK_REASON_NAMES.get(self.0 as usize).copied()
    }

    pub fn field(self) -> FieldValue {
        FieldValue::named(self.0, 2, self.name())
    }
}

impl fmt::Display for NackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

/// The ack/nack payload union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckNackPayload {
    None,
    Features(Features),
    Data(Vec<u8>),
    Value(u32),
    /// One of the millisecond timers; the handle says which.
    Millis(u32),
    KeyFragment(u32),
    Status {
        msg_class: u8,
        msg_type: u16,
        data: u16,
    },
    Admin {
        admin_type: u8,
        data: [u8; 3],
    },
    BlockPacketsReceived(u32),
    Route(Vec<Did>),
    Application(u32),
}

impl AckNackPayload {
    fn parse(handle: Handle, view: PayloadView<'_>, start: usize) -> Result<Self, ParseError> {
        let width = payload_width(handle);
        let bytes = view.slice("ack/nack payload", start, width)?;
        let word = || u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Ok(match handle {
            Handle::Ack => AckNackPayload::None,
            Handle::Features => AckNackPayload::Features(Features::parse(view, start)?),
            Handle::Data => AckNackPayload::Data(bytes.to_vec()),
            Handle::Value => AckNackPayload::Value(word()),
            Handle::TimeMs
            | Handle::TimeoutMs
            | Handle::SlowDownMs
            | Handle::SpeedUpMs
            | Handle::PauseMs
            | Handle::ResponseTimeMs => AckNackPayload::Millis(word()),
            Handle::KeyFragment => AckNackPayload::KeyFragment(word()),
            Handle::Status => {
                let class_type = u16::from_be_bytes([bytes[0], bytes[1]]);
                AckNackPayload::Status {
                    msg_class: (class_type >> 12) as u8,
                    msg_type: class_type & 0x0FFF,
                    data: u16::from_be_bytes([bytes[2], bytes[3]]),
                }
            }
            Handle::AdminMsg => AckNackPayload::Admin {
                admin_type: bytes[0],
                data: [bytes[1], bytes[2], bytes[3]],
            },
            Handle::BlockPacketsReceived => AckNackPayload::BlockPacketsReceived(word()),
            Handle::Route => AckNackPayload::Route(unpack_dids(bytes)),
            Handle::Application => AckNackPayload::Application(word()),
        })
    }

    fn render(&self, out: &mut Fields) {
        match self {
            AckNackPayload::None => {}
            AckNackPayload::Features(features) => features.render(out),
            AckNackPayload::Data(bytes) => out.push("data", FieldValue::Bytes(bytes.clone())),
            AckNackPayload::Value(v) => out.push("value", FieldValue::number(*v, 8)),
            AckNackPayload::Millis(ms) => out.push("ms", FieldValue::number(*ms, 8)),
            AckNackPayload::KeyFragment(frag) => {
                out.push("key fragment", FieldValue::number(*frag, 8))
            }
            AckNackPayload::Status {
                msg_class,
                msg_type,
                data,
            } => {
                out.push(
                    "msg class",
                    FieldValue::named(*msg_class, 1, super::app::msg_class_name(*msg_class)),
                );
                out.push(
                    "msg type",
                    FieldValue::named(*msg_type, 3, super::app::msg_type_name(*msg_type)),
                );
                out.push("data", FieldValue::number(*data, 4));
            }
            AckNackPayload::Admin { admin_type, data } => {
                out.push(
                    "admin type",
                    FieldValue::named(*admin_type, 2, super::admin::admin_type_name(*admin_type)),
                );
                out.push("admin data", FieldValue::Bytes(data.to_vec()));
            }
            AckNackPayload::BlockPacketsReceived(bits) => {
                out.push("packets received", FieldValue::number(*bits, 8))
            }
            AckNackPayload::Route(route) => render_route(route, out),
            AckNackPayload::Application(v) => out.push("application", FieldValue::number(*v, 8)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePayload {
    pub frame: PayloadFrame,
    pub kind: PacketKind,
    pub msg_id: MsgId,
    pub handle: Handle,
    /// Present for nacks only.
    pub nack_reason: Option<NackReason>,
    pub body: AckNackPayload,
}

impl ResponsePayload {
    pub fn parse(kind: PacketKind, frame: PayloadFrame) -> Result<Self, ParseError> {
        let view = frame.view();
        let (msg_id, selector) = view.msg_header()?;
        let handle = Handle::from_code(selector);
        let (nack_reason, start) = if kind.is_nack() {
            (Some(NackReason(view.u8("nack reason", BODY_IDX)?)), BODY_IDX + 1)
        } else {
            (None, BODY_IDX)
        };
        let body = AckNackPayload::parse(handle, view, start)?;
        Ok(Self {
            frame,
            kind,
            msg_id,
            handle,
            nack_reason,
            body,
        })
    }
}

impl Render for ResponsePayload {
    fn render(&self, out: &mut Fields) {
        out.push(
            "handle",
            FieldValue::named(self.handle as u8, 1, Some(self.handle.name())),
        );
        if let Some(reason) = self.nack_reason {
            out.push("nack reason", reason.field());
        }
        self.body.render(out);
    }
}

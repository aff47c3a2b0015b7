//! Administrative messages.
//!
//! The admin type at [`ADMIN_TYPE_IDX`] selects how the remaining bytes are
//! read; unknown types keep their raw bytes.

use onenet_core::{Did, MsgId};
use serde::{Deserialize, Serialize};

use super::features::Features;
use super::{encode_msg_header, MessageType, PayloadFrame, PayloadView, BODY_IDX};
use crate::error::ParseError;
use crate::render::{FieldValue, Fields, Render};

pub const ADMIN_TYPE_IDX: usize = BODY_IDX;
pub const ADMIN_DATA_IDX: usize = BODY_IDX + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AdminType {
    FeaturesQuery = 0x00,
    FeaturesResponse = 0x01,
    NewKeyFragment = 0x02,
    AssignPeer = 0x03,
    UnassignPeer = 0x04,
    ChangeKeepAlive = 0x05,
    ChangeSettings = 0x06,
    FragmentDelayLow = 0x07,
    FragmentDelayHigh = 0x08,
    AddDevice = 0x09,
    RemoveDevice = 0x0A,
    ChangeDataRate = 0x0B,
    StatusQuery = 0x0C,
    KeepAliveQuery = 0x0D,
    KeepAliveResponse = 0x0E,
    BlockStreamTimeout = 0x0F,
    ChangeMaxHops = 0x10,
    PeerQuery = 0x11,
    AssignDid = 0x12,
    BlockStreamRequest = 0x13,
    TerminateBlockStream = 0x14,
}

impl AdminType {
    const ALL: [AdminType; 21] = [
        AdminType::FeaturesQuery,
        AdminType::FeaturesResponse,
        AdminType::NewKeyFragment,
        AdminType::AssignPeer,
        AdminType::UnassignPeer,
        AdminType::ChangeKeepAlive,
        AdminType::ChangeSettings,
        AdminType::FragmentDelayLow,
        AdminType::FragmentDelayHigh,
        AdminType::AddDevice,
        AdminType::RemoveDevice,
        AdminType::ChangeDataRate,
        AdminType::StatusQuery,
        AdminType::KeepAliveQuery,
        AdminType::KeepAliveResponse,
        AdminType::BlockStreamTimeout,
        AdminType::ChangeMaxHops,
        AdminType::PeerQuery,
        AdminType::AssignDid,
        AdminType::BlockStreamRequest,
        AdminType::TerminateBlockStream,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            AdminType::FeaturesQuery => "features query",
            AdminType::FeaturesResponse => "features response",
            AdminType::NewKeyFragment => "new key fragment",
            AdminType::AssignPeer => "assign peer",
            AdminType::UnassignPeer => "unassign peer",
            AdminType::ChangeKeepAlive => "change keep alive",
            AdminType::ChangeSettings => "change settings",
            AdminType::FragmentDelayLow => "fragment delay low",
            AdminType::FragmentDelayHigh => "fragment delay high",
            AdminType::AddDevice => "add device",
            AdminType::RemoveDevice => "remove device",
            AdminType::ChangeDataRate => "change data rate",
            AdminType::StatusQuery => "status query",
            AdminType::KeepAliveQuery => "keep alive query",
            AdminType::KeepAliveResponse => "keep alive response",
            AdminType::BlockStreamTimeout => "block/stream timeout",
            AdminType::ChangeMaxHops => "change max hops",
            AdminType::PeerQuery => "peer query",
            AdminType::AssignDid => "assign did",
            AdminType::BlockStreamRequest => "block/stream request",
            AdminType::TerminateBlockStream => "terminate block/stream",
        }
    }
}

pub fn admin_type_name(code: u8) -> Option<&'static str> {
    AdminType::from_code(code).map(AdminType::name)
}

/// Shape of the bytes following the admin type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminBody {
    Empty,
    Features(Features),
    KeyFragment(u32),
    Peer {
        src_unit: u8,
        peer_unit: u8,
        peer_did: Did,
    },
    Millis(u32),
    Settings(u8),
    Device(Did),
    DataRate {
        data_rate: u8,
        channel: u8,
    },
    MaxHops(u8),
    Raw(Vec<u8>),
}

impl AdminBody {
    fn parse(admin_type: Option<AdminType>, view: PayloadView<'_>) -> Result<Self, ParseError> {
        let at = ADMIN_DATA_IDX;
        let Some(admin_type) = admin_type else {
            return Ok(AdminBody::Raw(view.rest(at).to_vec()));
        };
        Ok(match admin_type {
            AdminType::FeaturesQuery
            | AdminType::StatusQuery
            | AdminType::KeepAliveQuery
            | AdminType::PeerQuery => AdminBody::Empty,
            AdminType::FeaturesResponse => AdminBody::Features(Features::parse(view, at)?),
            AdminType::NewKeyFragment => AdminBody::KeyFragment(view.u32_be("key fragment", at)?),
            AdminType::AssignPeer | AdminType::UnassignPeer => {
                let units = view.u8("peer units", at)?;
                AdminBody::Peer {
                    src_unit: units >> 4,
                    peer_unit: units & 0x0F,
                    peer_did: Did::from_masked(view.u16_be("peer did", at + 1)?),
                }
            }
            AdminType::ChangeKeepAlive
            | AdminType::FragmentDelayLow
            | AdminType::FragmentDelayHigh
            | AdminType::KeepAliveResponse
            | AdminType::BlockStreamTimeout => AdminBody::Millis(view.u32_be("milliseconds", at)?),
            AdminType::ChangeSettings => AdminBody::Settings(view.u8("settings", at)?),
            AdminType::AddDevice | AdminType::RemoveDevice | AdminType::AssignDid => {
                AdminBody::Device(Did::from_masked(view.u16_be("device did", at)?))
            }
            AdminType::ChangeDataRate => AdminBody::DataRate {
                data_rate: view.u8("data rate", at)?,
                channel: view.u8("channel", at + 1)?,
            },
            AdminType::ChangeMaxHops => AdminBody::MaxHops(view.u8("max hops", at)?),
            AdminType::BlockStreamRequest | AdminType::TerminateBlockStream => {
                AdminBody::Raw(view.rest(at).to_vec())
            }
        })
    }

    /// Bytes following the admin type, the inverse of parsing.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            AdminBody::Empty => Vec::new(),
            AdminBody::Features(features) => features.to_bytes().to_vec(),
            AdminBody::KeyFragment(v) | AdminBody::Millis(v) => v.to_be_bytes().to_vec(),
            AdminBody::Peer {
                src_unit,
                peer_unit,
                peer_did,
            } => {
                let mut out = vec![((src_unit & 0x0F) << 4) | (peer_unit & 0x0F)];
                out.extend_from_slice(&peer_did.raw().to_be_bytes());
                out
            }
            AdminBody::Settings(v) | AdminBody::MaxHops(v) => vec![*v],
            AdminBody::Device(did) => did.raw().to_be_bytes().to_vec(),
            AdminBody::DataRate { data_rate, channel } => vec![*data_rate, *channel],
            AdminBody::Raw(bytes) => bytes.clone(),
        }
    }

    fn render(&self, out: &mut Fields) {
        match self {
            AdminBody::Empty => {}
            AdminBody::Features(features) => features.render(out),
            AdminBody::KeyFragment(v) => out.push("key fragment", FieldValue::number(*v, 8)),
            AdminBody::Peer {
                src_unit,
                peer_unit,
                peer_did,
            } => {
                out.push("src unit", FieldValue::number(*src_unit, 1));
                out.push("peer did", FieldValue::number(peer_did.raw(), 3));
                out.push("peer unit", FieldValue::number(*peer_unit, 1));
            }
            AdminBody::Millis(ms) => out.push("ms", FieldValue::number(*ms, 8)),
            AdminBody::Settings(flags) => out.push("settings", FieldValue::number(*flags, 2)),
            AdminBody::Device(did) => out.push("device did", FieldValue::number(did.raw(), 3)),
            AdminBody::DataRate { data_rate, channel } => {
                out.push("data rate", FieldValue::number(*data_rate, 2));
                out.push("channel", FieldValue::number(*channel, 2));
            }
            AdminBody::MaxHops(v) => out.push("max hops", FieldValue::number(*v, 1)),
            AdminBody::Raw(bytes) => out.push("admin data", FieldValue::Bytes(bytes.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPayload {
    pub frame: PayloadFrame,
    pub msg_id: MsgId,
    pub admin_type: u8,
    pub body: AdminBody,
}

impl AdminPayload {
    pub fn parse(frame: PayloadFrame, msg_id: MsgId) -> Result<Self, ParseError> {
        let view = frame.view();
        let admin_type = view.u8("admin type", ADMIN_TYPE_IDX)?;
        let body = AdminBody::parse(AdminType::from_code(admin_type), view)?;
        Ok(Self {
            frame,
            msg_id,
            admin_type,
            body,
        })
    }

    /// Message bytes that follow the payload CRC.
    pub fn encode_body(msg_id: MsgId, admin_type: AdminType, body: &AdminBody) -> Vec<u8> {
        let mut out = encode_msg_header(msg_id, MessageType::Admin as u8).to_vec();
        out.push(admin_type as u8);
        out.extend_from_slice(&body.encode());
        out
    }
}

impl Render for AdminPayload {
    fn render(&self, out: &mut Fields) {
        out.push(
            "admin type",
            FieldValue::named(self.admin_type, 2, admin_type_name(self.admin_type)),
        );
        self.body.render(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(admin_type: AdminType, body: &AdminBody) -> AdminPayload {
        let mut bytes = vec![0x00];
        bytes.extend_from_slice(&AdminPayload::encode_body(MsgId::new(7).unwrap(), admin_type, body));
        bytes.resize(8, 0);
        AdminPayload::parse(PayloadFrame::new(bytes), MsgId::new(7).unwrap()).unwrap()
    }

    #[test]
    fn typed_shapes_survive_a_single_payload() {
        let cases = [
            (AdminType::NewKeyFragment, AdminBody::KeyFragment(0x0C0D_0E0F)),
            (
                AdminType::AssignPeer,
                AdminBody::Peer {
                    src_unit: 1,
                    peer_unit: 3,
                    peer_did: Did::new(0x00A).unwrap(),
                },
            ),
            (AdminType::ChangeKeepAlive, AdminBody::Millis(60_000)),
            (AdminType::RemoveDevice, AdminBody::Device(Did::new(0x005).unwrap())),
            (
                AdminType::FeaturesResponse,
                AdminBody::Features(Features::from_bytes([0x80, 0x01, 4, 8])),
            ),
            (AdminType::ChangeMaxHops, AdminBody::MaxHops(5)),
            (AdminType::StatusQuery, AdminBody::Empty),
        ];
        for (admin_type, body) in cases {
            let parsed = parse(admin_type, &body);
            assert_eq!(parsed.admin_type, admin_type as u8);
            assert_eq!(parsed.body, body, "{admin_type:?}");
        }
    }

    #[test]
    fn unknown_admin_type_keeps_raw_bytes() {
        let bytes = vec![0x00, 0x00, 0x71, 0xEE, 1, 2, 3, 4];
        let admin = AdminPayload::parse(PayloadFrame::new(bytes), MsgId::new(7).unwrap()).unwrap();
        assert_eq!(admin.admin_type, 0xEE);
        assert_eq!(admin.body, AdminBody::Raw(vec![1, 2, 3, 4]));
        assert_eq!(admin_type_name(0xEE), None);
    }

    #[test]
    fn renders_named_admin_type() {
        let admin = parse(AdminType::ChangeSettings, &AdminBody::Settings(0x81));
        let fields = admin.rendered();
        assert_eq!(
            fields.get("admin type").unwrap().to_string(),
            "change settings (0x06)"
        );
    }
}

//! Invite and invite-request payloads, encrypted with invite keys.

use onenet_core::{Did, PacketKind};
use onenet_crypto::keys::KEY_LEN;
use onenet_crypto::Key;

use super::features::{Features, FEATURES_LEN};
use super::{PayloadFrame, PayloadView};
use crate::error::ParseError;
use crate::render::{FieldValue, Fields, Render};

const VERSION_IDX: usize = 1;
const ASSIGNED_DID_IDX: usize = 2;
const NETWORK_KEY_IDX: usize = ASSIGNED_DID_IDX + Did::ENCODED_LEN;
const INVITE_FEATURES_IDX: usize = NETWORK_KEY_IDX + KEY_LEN;
const REQUEST_FEATURES_IDX: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteBody {
    /// Master hands a joining device its DID and the network key.
    Invite {
        assigned_did: Did,
        network_key: Key,
        features: Features,
    },
    /// Device asks to join.
    Request { features: Features },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitePayload {
    pub frame: PayloadFrame,
    pub version: u8,
    pub body: InviteBody,
}

impl InvitePayload {
    pub fn parse(kind: PacketKind, frame: PayloadFrame) -> Result<Self, ParseError> {
        let view = frame.view();
        let version = view.u8("invite version", VERSION_IDX)?;
        let body = if kind == PacketKind::Invite {
            Self::parse_invite(view)?
        } else {
            InviteBody::Request {
                features: Features::parse(view, REQUEST_FEATURES_IDX)?,
            }
        };
        Ok(Self {
            frame,
            version,
            body,
        })
    }

    fn parse_invite(view: PayloadView<'_>) -> Result<InviteBody, ParseError> {
        let did_symbols = view.slice("assigned did", ASSIGNED_DID_IDX, Did::ENCODED_LEN)?;
        let assigned_did = Did::decode(did_symbols).map_err(|error| ParseError::Symbol {
            field: "assigned did",
            error,
        })?;
        let key_bytes = view.slice("network key", NETWORK_KEY_IDX, KEY_LEN)?;
        let mut key = [0_u8; KEY_LEN];
        key.copy_from_slice(key_bytes);
        Ok(InviteBody::Invite {
            assigned_did,
            network_key: Key::from_bytes(key),
            features: Features::parse(view, INVITE_FEATURES_IDX)?,
        })
    }

    /// Invite bytes that follow the payload CRC.
    pub fn encode_invite_body(version: u8, assigned_did: Did, network_key: &Key, features: &Features) -> Vec<u8> {
        let mut out = vec![version];
        out.extend_from_slice(&assigned_did.encode());
        out.extend_from_slice(network_key.as_bytes());
        out.extend_from_slice(&features.to_bytes());
        out
    }

    /// Invite-request bytes that follow the payload CRC.
    pub fn encode_request_body(version: u8, features: &Features) -> Vec<u8> {
        let mut out = vec![version];
        out.extend_from_slice(&features.to_bytes());
        out.resize(1 + FEATURES_LEN + 2, 0);
        out
    }
}

impl Render for InvitePayload {
    fn render(&self, out: &mut Fields) {
        out.push("invite version", FieldValue::number(self.version, 2));
        match &self.body {
            InviteBody::Invite {
                assigned_did,
                network_key,
                features,
            } => {
                out.push("assigned did", FieldValue::number(assigned_did.raw(), 3));
                out.push("network key", FieldValue::Text(network_key.to_string()));
                features.render(out);
            }
            InviteBody::Request { features } => features.render(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onenet_crypto::DEFAULT_NETWORK_KEY;

    fn frame(body: Vec<u8>, len: usize) -> PayloadFrame {
        let mut bytes = vec![0x00];
        bytes.extend(body);
        bytes.resize(len, 0);
        PayloadFrame::new(bytes)
    }

    #[test]
    fn invite_hands_out_did_and_key() {
        let features = Features::from_bytes([0xC0, 0x01, 3, 4]);
        let body = InvitePayload::encode_invite_body(2, Did::new(0x00C).unwrap(), &DEFAULT_NETWORK_KEY, &features);
        assert_eq!(body.len() + 1, 24);
        let invite = InvitePayload::parse(PacketKind::Invite, frame(body, 24)).unwrap();
        assert_eq!(invite.version, 2);
        assert_eq!(
            invite.body,
            InviteBody::Invite {
                assigned_did: Did::new(0x00C).unwrap(),
                network_key: DEFAULT_NETWORK_KEY,
                features,
            }
        );
    }

    #[test]
    fn invite_with_bad_did_symbols_is_a_parse_error() {
        let mut body = vec![1, 0x00, 0x00];
        body.resize(23, 0);
        assert!(matches!(
            InvitePayload::parse(PacketKind::Invite, frame(body, 24)),
            Err(ParseError::Symbol {
                field: "assigned did",
                ..
            })
        ));
    }

    #[test]
    fn request_carries_features() {
        let features = Features::from_bytes([0x08, 0x03, 0, 2]);
        let body = InvitePayload::encode_request_body(1, &features);
        let request = InvitePayload::parse(PacketKind::InviteRequest, frame(body, 8)).unwrap();
        assert_eq!(request.body, InviteBody::Request { features });
    }
}

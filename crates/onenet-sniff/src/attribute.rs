//! Selection of the fields rendered for each stored packet.

use std::fmt;
use std::str::FromStr;

use onenet_core::Did;
use serde::Serialize;

use crate::error::ConfigError;
use crate::packet::Packet;
use crate::render::{FieldValue, Fields, Render};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Timestamp,
    Raw,
    RepeaterDid,
    DstDid,
    Nid,
    SrcDid,
    Pid,
    HeaderCrc,
    Hops,
    Validity,
    Key,
    Payload,
    Issues,
}

impl Attribute {
    pub const ALL: [Attribute; 13] = [
        Attribute::Timestamp,
        Attribute::Raw,
        Attribute::RepeaterDid,
        Attribute::DstDid,
        Attribute::Nid,
        Attribute::SrcDid,
        Attribute::Pid,
        Attribute::HeaderCrc,
        Attribute::Hops,
        Attribute::Validity,
        Attribute::Key,
        Attribute::Payload,
        Attribute::Issues,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Timestamp => "timestamp",
            Attribute::Raw => "raw",
            Attribute::RepeaterDid => "rptr",
            Attribute::DstDid => "dst",
            Attribute::Nid => "nid",
            Attribute::SrcDid => "src",
            Attribute::Pid => "pid",
            Attribute::HeaderCrc => "hdrcrc",
            Attribute::Hops => "hops",
            Attribute::Validity => "validity",
            Attribute::Key => "key",
            Attribute::Payload => "payload",
            Attribute::Issues => "issues",
        }
    }

    fn render(self, timestamp: u64, packet: &Packet, out: &mut Fields) {
        let header = &packet.header;
        let did = |did: Option<Did>| match did {
            Some(did) => FieldValue::number(did.raw(), 3),
            None => FieldValue::Text("undecodable".into()),
        };
        match self {
            Attribute::Timestamp => out.push("timestamp", FieldValue::Text(timestamp.to_string())),
            Attribute::Raw => out.push("raw", FieldValue::Bytes(packet.raw.bytes().to_vec())),
            Attribute::RepeaterDid => out.push("rptr", did(header.repeater_did)),
            Attribute::DstDid => out.push("dst", did(header.dst_did)),
            Attribute::SrcDid => out.push("src", did(header.src_did)),
            Attribute::Nid => match header.nid {
                Some(nid) => out.push("nid", FieldValue::number(nid.raw(), 9)),
                None => out.push("nid", FieldValue::Text("undecodable".into())),
            },
            Attribute::Pid => match header.pid {
                Some(pid) => out.push(
                    "pid",
                    FieldValue::named(pid.raw(), 3, packet.kind.map(|k| k.name())),
                ),
                None => out.push("pid", FieldValue::Text("undecodable".into())),
            },
            Attribute::HeaderCrc => {
                if let Some(crc) = header.msg_crc {
                    out.push("hdrcrc", FieldValue::number(crc, 2));
                }
            }
            Attribute::Hops => {
                if let Some(hops) = header.hops {
                    out.push("hops", FieldValue::Text(format!("{}/{}", hops.hops, hops.max_hops)));
                }
            }
            Attribute::Validity => {
                let v = packet.validity;
                out.push("valid", FieldValue::Flag(packet.is_valid()));
                out.push("valid digits", FieldValue::Flag(v.valid_digits));
                out.push("valid pid", FieldValue::Flag(v.valid_pid));
                out.push("valid length", FieldValue::Flag(v.valid_length));
                out.push("valid decode", FieldValue::Flag(v.valid_decode));
                out.push("valid header crc", FieldValue::Flag(v.valid_header_checksum));
                out.push("valid decrypt", FieldValue::Flag(v.valid_decrypt));
                out.push("valid payload crc", FieldValue::Flag(v.valid_payload_checksum));
            }
            Attribute::Key => {
                if let Some(key) = packet.key {
                    let text = key.invite_code().unwrap_or_else(|| key.to_string());
                    out.push("key", FieldValue::Text(text));
                }
            }
            Attribute::Payload => {
                if let Some(payload) = &packet.payload {
                    payload.render(out);
                } else if let Some(err) = &packet.parse_error {
                    out.push("parse error", FieldValue::Text(err.to_string()));
                }
            }
            Attribute::Issues => {
                let reasons = packet.reasons();
                if !reasons.is_empty() {
                    out.push("issues", FieldValue::Text(reasons.join("; ")));
                }
            }
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownAttribute(s.trim().to_string()))
    }
}

/// Ordered, duplicate-free attribute selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSet {
    attributes: Vec<Attribute>,
}

impl Default for AttributeSet {
    fn default() -> Self {
        Self {
            attributes: Attribute::ALL.to_vec(),
        }
    }
}

impl AttributeSet {
    pub fn empty() -> Self {
        Self {
            attributes: Vec::new(),
        }
    }

    /// Builds a selection from attribute names; an empty list selects everything.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        if names.is_empty() {
            return Ok(Self::default());
        }
        let mut set = Self::empty();
        for name in names {
            set.add(name.as_ref().parse()?);
        }
        Ok(set)
    }

    pub fn add(&mut self, attribute: Attribute) -> bool {
        if self.attributes.contains(&attribute) {
            return false;
        }
        self.attributes.push(attribute);
        true
    }

    pub fn remove(&mut self, attribute: Attribute) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| *a != attribute);
        before != self.attributes.len()
    }

    pub fn contains(&self, attribute: Attribute) -> bool {
        self.attributes.contains(&attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = Attribute> + '_ {
        self.attributes.iter().copied()
    }

    pub fn render(&self, timestamp: u64, packet: &Packet) -> PacketRecord {
        let mut fields = Fields::new();
        for attribute in &self.attributes {
            attribute.render(timestamp, packet, &mut fields);
        }
        PacketRecord {
            timestamp_ms: timestamp,
            fields,
        }
    }
}

/// Rendered view of one stored packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketRecord {
    pub timestamp_ms: u64,
    pub fields: Fields,
}

impl fmt::Display for PacketRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp_ms, self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!("DST".parse::<Attribute>(), Ok(Attribute::DstDid));
        assert_eq!(
            "colour".parse::<Attribute>(),
            Err(ConfigError::UnknownAttribute("colour".into()))
        );
    }

    #[test]
    fn selection_is_ordered_and_duplicate_free() {
        let mut set = AttributeSet::from_names(&["src", "dst"]).unwrap();
        assert!(!set.add(Attribute::SrcDid));
        assert!(set.add(Attribute::Payload));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Attribute::SrcDid, Attribute::DstDid, Attribute::Payload]
        );
        assert!(set.remove(Attribute::DstDid));
        assert!(!set.contains(Attribute::DstDid));
    }

    #[test]
    fn empty_name_list_selects_everything() {
        let names: [&str; 0] = [];
        assert_eq!(AttributeSet::from_names(&names).unwrap(), AttributeSet::default());
    }
}

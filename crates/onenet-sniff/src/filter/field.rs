//! Queryable packet fields and boolean predicates.

use std::fmt;
use std::str::FromStr;

use onenet_core::{Did, MsgId, Nid, RawPid};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::packet::Packet;

/// A numeric packet attribute with a fixed value domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterField {
    Timestamp,
    RepeaterDid,
    DstDid,
    SrcDid,
    Nid,
    Pid,
    MsgId,
    HeaderCrc,
    PayloadCrc,
    Hops,
    MaxHops,
    AdminType,
    KeyFragment,
}

impl FilterField {
    pub const ALL: [FilterField; 13] = [
        FilterField::Timestamp,
        FilterField::RepeaterDid,
        FilterField::DstDid,
        FilterField::SrcDid,
        FilterField::Nid,
        FilterField::Pid,
        FilterField::MsgId,
        FilterField::HeaderCrc,
        FilterField::PayloadCrc,
        FilterField::Hops,
        FilterField::MaxHops,
        FilterField::AdminType,
        FilterField::KeyFragment,
    ];

    /// Name used in filter commands.
    pub fn name(self) -> &'static str {
        match self {
            FilterField::Timestamp => "timestamp",
            FilterField::RepeaterDid => "rptr",
            FilterField::DstDid => "dst",
            FilterField::SrcDid => "src",
            FilterField::Nid => "nid",
            FilterField::Pid => "pid",
            FilterField::MsgId => "msgid",
            FilterField::HeaderCrc => "hdrcrc",
            FilterField::PayloadCrc => "pldcrc",
            FilterField::Hops => "hops",
            FilterField::MaxHops => "maxhops",
            FilterField::AdminType => "admintype",
            FilterField::KeyFragment => "keyfragment",
        }
    }

    /// Largest value the field can hold.
    pub fn max(self) -> u64 {
        match self {
            FilterField::Timestamp => u64::MAX,
            FilterField::RepeaterDid | FilterField::DstDid | FilterField::SrcDid => {
                u64::from(Did::MAX)
            }
            FilterField::Nid => Nid::MAX,
            FilterField::Pid => u64::from(RawPid::MAX),
            FilterField::MsgId => u64::from(MsgId::MAX),
            FilterField::HeaderCrc | FilterField::PayloadCrc | FilterField::AdminType => {
                u64::from(u8::MAX)
            }
            FilterField::Hops | FilterField::MaxHops => u64::from(onenet_core::Hops::MAX),
            FilterField::KeyFragment => u64::from(u32::MAX),
        }
    }

    /// The packet's value for this field, when it has one.
    pub fn value_of(self, timestamp: u64, packet: &Packet) -> Option<u64> {
        let header = &packet.header;
        match self {
            FilterField::Timestamp => Some(timestamp),
            FilterField::RepeaterDid => header.repeater_did.map(|d| u64::from(d.raw())),
            FilterField::DstDid => header.dst_did.map(|d| u64::from(d.raw())),
            FilterField::SrcDid => header.src_did.map(|d| u64::from(d.raw())),
            FilterField::Nid => header.nid.map(Nid::raw),
            FilterField::Pid => header.pid.map(|p| u64::from(p.raw())),
            FilterField::MsgId => packet
                .payload
                .as_ref()
                .and_then(|p| p.msg_id())
                .map(|id| u64::from(id.raw())),
            FilterField::HeaderCrc => header.msg_crc.map(u64::from),
            FilterField::PayloadCrc => packet.payload.as_ref().map(|p| u64::from(p.crc())),
            FilterField::Hops => header.hops.map(|h| u64::from(h.hops)),
            FilterField::MaxHops => header.hops.map(|h| u64::from(h.max_hops)),
            FilterField::AdminType => packet
                .payload
                .as_ref()
                .and_then(|p| p.admin_type())
                .map(u64::from),
            FilterField::KeyFragment => packet.key.map(|k| u64::from(k.fragment())),
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterField {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownField(s.to_string()))
    }
}

/// Boolean packet properties filtered by a three-valued predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Predicate {
    HeaderCrcValid,
    PayloadCrcValid,
    DecodeValid,
    Valid,
}

impl Predicate {
    pub const ALL: [Predicate; 4] = [
        Predicate::HeaderCrcValid,
        Predicate::PayloadCrcValid,
        Predicate::DecodeValid,
        Predicate::Valid,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Predicate::HeaderCrcValid => "hdrcrcvalid",
            Predicate::PayloadCrcValid => "pldcrcvalid",
            Predicate::DecodeValid => "decodevalid",
            Predicate::Valid => "valid",
        }
    }

    pub fn observe(self, packet: &Packet) -> bool {
        match self {
            Predicate::HeaderCrcValid => packet.validity.valid_header_checksum,
            Predicate::PayloadCrcValid => packet.validity.valid_payload_checksum,
            Predicate::DecodeValid => packet.validity.valid_decode,
            Predicate::Valid => packet.is_valid(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Predicate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownField(s.to_string()))
    }
}

/// Three-valued match state of a [`Predicate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchPredicate {
    #[default]
    Wildcard,
    MustMatch,
    MustNotMatch,
}

impl MatchPredicate {
    pub fn accepts(self, observed: bool) -> bool {
        match self {
            MatchPredicate::Wildcard => true,
            MatchPredicate::MustMatch => observed,
            MatchPredicate::MustNotMatch => !observed,
        }
    }
}

impl fmt::Display for MatchPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchPredicate::Wildcard => "any",
            MatchPredicate::MustMatch => "match",
            MatchPredicate::MustNotMatch => "nomatch",
        })
    }
}

impl FromStr for MatchPredicate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(MatchPredicate::Wildcard),
            "match" => Ok(MatchPredicate::MustMatch),
            "nomatch" => Ok(MatchPredicate::MustNotMatch),
            _ => Err(ConfigError::BadCommand(s.to_string())),
        }
    }
}

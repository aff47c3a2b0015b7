use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::symbol::{decode_bits, decode_8to6, encode_6to8_masked, encode_value_into};

fn check_width(value: u64, bits: u32) -> Result<(), DecodeError> {
    if value >> bits != 0 {
        return Err(DecodeError::ValueTooWide { value, bits });
    }
    Ok(())
}

/// 12-bit logical device identifier (DID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Did(u16);

impl Did {
    /// Raw width in bits.
    pub const BITS: u32 = 12;
    /// Encoded width in symbols.
    pub const ENCODED_LEN: usize = 2;
    /// Largest raw DID.
    pub const MAX: u16 = 0x0FFF;
    /// Broadcast address.
    pub const BROADCAST: Did = Did(0x000);
    /// Address of the network master.
    pub const MASTER: Did = Did(0x001);

    /// Builds a DID from its raw value, failing when wider than 12 bits.
    pub fn new(raw: u16) -> Result<Self, DecodeError> {
        check_width(u64::from(raw), Self::BITS)?;
        Ok(Self(raw))
    }

    /// Keeps the low 12 bits of `raw`; used for DIDs packed into payload bytes.
    pub fn from_masked(raw: u16) -> Self {
        Self(raw & Self::MAX)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    /// Encodes the DID as its two wire symbols.
    pub fn encode(self) -> [u8; 2] {
        let mut out = [0_u8; 2];
        let encoded = encode_value_into(u64::from(self.0 & Self::MAX), &mut out);
        debug_assert!(encoded.is_ok(), "a 12-bit DID always fits two symbols");
        out
    }

    /// Decodes a DID from exactly two wire symbols.
    pub fn decode(symbols: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self(decode_bits(symbols, Self::BITS)? as u16))
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03X}", self.0)
    }
}

/// 36-bit network identifier (NID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nid(u64);

impl Nid {
    /// Raw width in bits.
    pub const BITS: u32 = 36;
    /// Encoded width in symbols.
    pub const ENCODED_LEN: usize = 6;
    /// Largest raw NID.
    pub const MAX: u64 = 0xF_FFFF_FFFF;

    /// Builds a NID from its raw value, failing when wider than 36 bits.
    pub fn new(raw: u64) -> Result<Self, DecodeError> {
        check_width(raw, Self::BITS)?;
        Ok(Self(raw))
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn encode(self) -> [u8; 6] {
        let mut out = [0_u8; 6];
        let encoded = encode_value_into(self.0 & Self::MAX, &mut out);
        debug_assert!(encoded.is_ok(), "a 36-bit NID always fits six symbols");
        out
    }

    pub fn decode(symbols: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self(decode_bits(symbols, Self::BITS)?))
    }
}

impl fmt::Display for Nid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:09X}", self.0)
    }
}

/// 12-bit message identifier carried inside decrypted payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MsgId(u16);

impl MsgId {
    pub const BITS: u32 = 12;
    pub const MAX: u16 = 0x0FFF;

    pub fn new(raw: u16) -> Result<Self, DecodeError> {
        check_width(u64::from(raw), Self::BITS)?;
        Ok(Self(raw))
    }

    /// Keeps the low 12 bits of `raw`.
    pub fn from_masked(raw: u16) -> Self {
        Self(raw & Self::MAX)
    }

    pub fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03X}", self.0)
    }
}

bitflags! {
    /// Flag bits carried above the packet-kind code in the raw PID.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PidFlags: u16 {
        /// Packet carries a trailing hops symbol and may be repeated.
        const MULTI_HOP = 0x040;
        /// Receiver should stay awake after this exchange.
        const STAY_AWAKE = 0x080;
    }
}

/// The fixed set of ONE-NET packet kinds selected by the low six PID bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum PacketKind {
    SingleData = 0x00,
    SingleAck = 0x01,
    SingleNack = 0x02,
    Route = 0x03,
    RouteAck = 0x04,
    RouteNack = 0x05,
    BlockData = 0x06,
    BlockAck = 0x07,
    BlockNack = 0x08,
    BlockTerminate = 0x09,
    StreamData = 0x0A,
    StreamAck = 0x0B,
    StreamNack = 0x0C,
    StreamTerminate = 0x0D,
    Invite = 0x0E,
    InviteRequest = 0x0F,
}

impl PacketKind {
    pub const ALL: [PacketKind; 16] = [
        PacketKind::SingleData,
        PacketKind::SingleAck,
        PacketKind::SingleNack,
        PacketKind::Route,
        PacketKind::RouteAck,
        PacketKind::RouteNack,
        PacketKind::BlockData,
        PacketKind::BlockAck,
        PacketKind::BlockNack,
        PacketKind::BlockTerminate,
        PacketKind::StreamData,
        PacketKind::StreamAck,
        PacketKind::StreamNack,
        PacketKind::StreamTerminate,
        PacketKind::Invite,
        PacketKind::InviteRequest,
    ];

    /// Maps a 6-bit kind code to a packet kind.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Display name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            PacketKind::SingleData => "single data",
            PacketKind::SingleAck => "single ack",
            PacketKind::SingleNack => "single nack",
            PacketKind::Route => "route",
            PacketKind::RouteAck => "route ack",
            PacketKind::RouteNack => "route nack",
            PacketKind::BlockData => "block data",
            PacketKind::BlockAck => "block ack",
            PacketKind::BlockNack => "block nack",
            PacketKind::BlockTerminate => "block terminate",
            PacketKind::StreamData => "stream data",
            PacketKind::StreamAck => "stream ack",
            PacketKind::StreamNack => "stream nack",
            PacketKind::StreamTerminate => "stream terminate",
            PacketKind::Invite => "invite",
            PacketKind::InviteRequest => "invite request",
        }
    }

    /// Invite packets are encrypted with invite keys rather than network keys.
    pub fn is_invite(self) -> bool {
        matches!(self, PacketKind::Invite | PacketKind::InviteRequest)
    }

    pub fn is_stream(self) -> bool {
        matches!(
            self,
            PacketKind::StreamData
                | PacketKind::StreamAck
                | PacketKind::StreamNack
                | PacketKind::StreamTerminate
        )
    }

    pub fn is_ack(self) -> bool {
        matches!(
            self,
            PacketKind::SingleAck | PacketKind::RouteAck | PacketKind::BlockAck | PacketKind::StreamAck
        )
    }

    pub fn is_nack(self) -> bool {
        matches!(
            self,
            PacketKind::SingleNack
                | PacketKind::RouteNack
                | PacketKind::BlockNack
                | PacketKind::StreamNack
        )
    }

    /// Ack or nack of any family.
    pub fn is_response(self) -> bool {
        self.is_ack() || self.is_nack()
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which keyring a packet's payload is encrypted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyScope {
    /// Shared network keys for normal traffic.
    Network,
    /// Invite keys used while a device joins a network.
    Invite,
}

impl PacketKind {
    pub fn key_scope(self) -> KeyScope {
        if self.is_invite() {
            KeyScope::Invite
        } else {
            KeyScope::Network
        }
    }
}

/// 12-bit raw packet identifier as carried in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RawPid(u16);

impl RawPid {
    pub const BITS: u32 = 12;
    pub const ENCODED_LEN: usize = 2;
    pub const MAX: u16 = 0x0FFF;
    const KIND_MASK: u16 = 0x003F;
    const RESERVED_MASK: u16 = 0x0F00;

    pub fn new(raw: u16) -> Result<Self, DecodeError> {
        check_width(u64::from(raw), Self::BITS)?;
        Ok(Self(raw))
    }

    /// Builds a PID from a kind and flag set with reserved bits clear.
    pub fn from_parts(kind: PacketKind, flags: PidFlags) -> Self {
        Self(u16::from(kind.code()) | flags.bits())
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    /// Low six bits.
    pub fn kind_code(self) -> u8 {
        (self.0 & Self::KIND_MASK) as u8
    }

    /// Packet kind, or `None` when the kind code is out of range.
    pub fn kind(self) -> Option<PacketKind> {
        PacketKind::from_code(self.kind_code())
    }

    pub fn flags(self) -> PidFlags {
        PidFlags::from_bits_truncate(self.0)
    }

    pub fn is_multi_hop(self) -> bool {
        self.flags().contains(PidFlags::MULTI_HOP)
    }

    pub fn is_stay_awake(self) -> bool {
        self.flags().contains(PidFlags::STAY_AWAKE)
    }

    /// Bits 8-11, which must be zero on the wire.
    pub fn reserved_bits(self) -> u16 {
        (self.0 & Self::RESERVED_MASK) >> 8
    }

    pub fn encode(self) -> [u8; 2] {
        let mut out = [0_u8; 2];
        let encoded = encode_value_into(u64::from(self.0 & Self::MAX), &mut out);
        debug_assert!(encoded.is_ok(), "a 12-bit PID always fits two symbols");
        out
    }

    pub fn decode(symbols: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self(decode_bits(symbols, Self::BITS)? as u16))
    }
}

impl fmt::Display for RawPid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03X}", self.0)
    }
}

/// Multi-hop hop counters carried in one trailing symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hops {
    /// Hops taken so far.
    pub hops: u8,
    /// Maximum hops allowed.
    pub max_hops: u8,
}

impl Hops {
    /// Largest value of either counter.
    pub const MAX: u8 = 7;

    pub fn new(hops: u8, max_hops: u8) -> Result<Self, DecodeError> {
        check_width(u64::from(hops), 3)?;
        check_width(u64::from(max_hops), 3)?;
        Ok(Self { hops, max_hops })
    }

    /// Hop counts are consistent when no more hops were taken than allowed.
    pub fn is_consistent(self) -> bool {
        self.hops <= self.max_hops
    }

    pub fn encode(self) -> u8 {
        encode_6to8_masked(((self.hops & 0x07) << 3) | (self.max_hops & 0x07))
    }

    pub fn decode(symbol: u8) -> Result<Self, DecodeError> {
        let raw = decode_8to6(symbol)?;
        Ok(Self {
            hops: (raw >> 3) & 0x07,
            max_hops: raw & 0x07,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn did_rejects_values_wider_than_12_bits() {
        assert!(Did::new(0x0FFF).is_ok());
        assert_eq!(
            Did::new(0x1000),
            Err(DecodeError::ValueTooWide {
                value: 0x1000,
                bits: 12
            })
        );
    }

    #[test]
    fn master_did_encodes_as_b4bc() {
        assert_eq!(Did::MASTER.encode(), [0xB4, 0xBC]);
        assert_eq!(Did::decode(&[0xB4, 0xBC]).unwrap(), Did::MASTER);
        assert_eq!(Did::MASTER.to_string(), "001");
    }

    #[test]
    fn nid_round_trips_and_displays_nine_digits() {
        let nid = Nid::new(0x0_0000_0102).unwrap();
        assert_eq!(Nid::decode(&nid.encode()).unwrap(), nid);
        assert_eq!(nid.to_string(), "000000102");
        assert!(Nid::new(0x10_0000_0000).is_err());
    }

    #[test]
    fn pid_splits_kind_flags_and_reserved_bits() {
        let pid = RawPid::from_parts(
            PacketKind::StreamData,
            PidFlags::MULTI_HOP | PidFlags::STAY_AWAKE,
        );
        assert_eq!(pid.raw(), 0x0CA);
        assert_eq!(pid.kind(), Some(PacketKind::StreamData));
        assert!(pid.is_multi_hop());
        assert!(pid.is_stay_awake());
        assert_eq!(pid.reserved_bits(), 0);

        let odd = RawPid::new(0x53F).unwrap();
        assert_eq!(odd.kind(), None);
        assert_eq!(odd.reserved_bits(), 0x5);
        assert_eq!(RawPid::decode(&odd.encode()).unwrap(), odd);
    }

    #[test]
    fn packet_kind_codes_are_dense() {
        for (idx, kind) in PacketKind::ALL.iter().enumerate() {
            assert_eq!(kind.code() as usize, idx);
            assert_eq!(PacketKind::from_code(idx as u8), Some(*kind));
        }
        assert_eq!(PacketKind::from_code(0x10), None);
        assert_eq!(PacketKind::from_code(0x3F), None);
    }

    #[test]
    fn packet_kind_families() {
        assert!(PacketKind::Invite.is_invite());
        assert!(PacketKind::InviteRequest.is_invite());
        assert!(PacketKind::StreamTerminate.is_stream());
        assert!(PacketKind::BlockNack.is_response());
        assert!(!PacketKind::BlockTerminate.is_response());
        assert!(!PacketKind::SingleData.is_invite());
    }

    #[test]
    fn hops_round_trip() {
        let hops = Hops::new(2, 5).unwrap();
        assert_eq!(Hops::decode(hops.encode()).unwrap(), hops);
        assert!(hops.is_consistent());
        assert!(!Hops::new(6, 3).unwrap().is_consistent());
        assert!(Hops::new(8, 3).is_err());
    }

    #[test]
    fn widest_field_values_encode_as_all_ones_symbols() {
        assert_eq!(Did::from_masked(Did::MAX).encode(), [0x22, 0x22]);
        assert_eq!(Nid::new(Nid::MAX).unwrap().encode(), [0x22; 6]);
        assert_eq!(RawPid::new(RawPid::MAX).unwrap().encode(), [0x22, 0x22]);
        let hops = Hops::new(Hops::MAX, Hops::MAX).unwrap();
        assert_eq!(hops.encode(), 0x22);
        assert_eq!(Hops::decode(hops.encode()).unwrap(), hops);
    }
}

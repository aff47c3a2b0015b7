//! Device feature records.

use bitflags::bitflags;
use onenet_core::MsgId;
use serde::{Deserialize, Serialize};

use super::{PayloadFrame, PayloadView, BODY_IDX};
use crate::error::ParseError;
use crate::render::{FieldValue, Fields, Render};

pub const FEATURES_LEN: usize = 4;

const DATA_RATE_NAMES: [&str; 6] = ["38400", "76800", "115200", "153600", "192000", "230400"];

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct FeatureFlags: u8 {
        const MULTI_HOP = 0x80;
        const REPEATER = 0x40;
        const BLOCK = 0x20;
        const STREAM = 0x10;
        const SLEEPS = 0x08;
        const EXTENDED_SINGLE = 0x04;
        const ROUTE = 0x02;
    }
}

/// Capabilities a device advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    pub flags: FeatureFlags,
    /// Bit `n` set when data rate `n` is supported.
    pub data_rates: u8,
    pub max_hops: u8,
    pub max_peers: u8,
}

impl Features {
    pub fn parse(view: PayloadView<'_>, start: usize) -> Result<Self, ParseError> {
        let b = view.slice("features", start, FEATURES_LEN)?;
        Ok(Self::from_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn from_bytes(bytes: [u8; FEATURES_LEN]) -> Self {
        Self {
            flags: FeatureFlags::from_bits_retain(bytes[0]),
            data_rates: bytes[1],
            max_hops: bytes[2],
            max_peers: bytes[3],
        }
    }

    pub fn to_bytes(&self) -> [u8; FEATURES_LEN] {
        [self.flags.bits(), self.data_rates, self.max_hops, self.max_peers]
    }

    /// Names of the supported data rates in bits per second.
    pub fn data_rate_names(&self) -> Vec<&'static str> {
        DATA_RATE_NAMES
            .iter()
            .enumerate()
            .filter(|(bit, _)| self.data_rates & (1 << bit) != 0)
            .map(|(_, name)| *name)
            .collect()
    }

    pub fn render(&self, out: &mut Fields) {
        let flag_names: Vec<&str> = self.flags.iter_names().map(|(name, _)| name).collect();
        let flag_names = flag_names.join("|");
        let rate_names = self.data_rate_names().join(",");
        out.push(
            "feature flags",
            FieldValue::named(self.flags.bits(), 2, non_empty(&flag_names)),
        );
        out.push(
            "data rates",
            FieldValue::named(self.data_rates, 2, non_empty(&rate_names)),
        );
        out.push("max hops", FieldValue::number(self.max_hops, 1));
        out.push("max peers", FieldValue::number(self.max_peers, 2));
    }
}

fn non_empty(text: &str) -> Option<&str> {
    (!text.is_empty()).then_some(text)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturesPayload {
    pub frame: PayloadFrame,
    pub msg_id: MsgId,
    pub features: Features,
}

impl FeaturesPayload {
    pub fn parse(frame: PayloadFrame, msg_id: MsgId) -> Result<Self, ParseError> {
        let features = Features::parse(frame.view(), BODY_IDX)?;
        Ok(Self {
            frame,
            msg_id,
            features,
        })
    }
}

impl Render for FeaturesPayload {
    fn render(&self, out: &mut Fields) {
        self.features.render(out);
    }
}

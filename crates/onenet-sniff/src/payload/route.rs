//! Route messages: the DIDs a multi-hop packet travelled through.

use onenet_core::{Did, MsgId};

use super::{PayloadFrame, BODY_IDX};
use crate::error::ParseError;
use crate::render::{FieldValue, Fields, Render};

/// Unpacks 12-bit DIDs stored two per three bytes, stopping at DID 0.
pub fn unpack_dids(bytes: &[u8]) -> Vec<Did> {
    let mut dids = Vec::new();
    let mut acc: u32 = 0;
    let mut bits = 0_u32;
    for &byte in bytes {
        acc = (acc << 8) | u32::from(byte);
        bits += 8;
        if bits >= 12 {
            bits -= 12;
            let raw = ((acc >> bits) & 0x0FFF) as u16;
            if raw == 0 {
                break;
            }
            dids.push(Did::from_masked(raw));
        }
    }
    dids
}

/// Packs DIDs two per three bytes; the final nibble is zero-padded.
pub fn pack_dids(dids: &[Did]) -> Vec<u8> {
    let mut out = Vec::with_capacity(dids.len() * 3 / 2 + 1);
    for pair in dids.chunks(2) {
        let a = pair[0].raw();
        out.push((a >> 4) as u8);
        match pair.get(1) {
            Some(b) => {
                let b = b.raw();
                out.push((((a & 0x0F) << 4) | (b >> 8)) as u8);
                out.push((b & 0xFF) as u8);
            }
            None => out.push(((a & 0x0F) << 4) as u8),
        }
    }
    out
}

pub(crate) fn render_route(route: &[Did], out: &mut Fields) {
    let text = route
        .iter()
        .map(|did| format!("{did}"))
        .collect::<Vec<_>>()
        .join(" -> ");
    out.push("route", FieldValue::Text(text));
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePayload {
    pub frame: PayloadFrame,
    pub msg_id: MsgId,
    pub route: Vec<Did>,
}

impl RoutePayload {
    pub fn parse(frame: PayloadFrame, msg_id: MsgId) -> Result<Self, ParseError> {
        let route = unpack_dids(frame.view().rest(BODY_IDX));
        Ok(Self {
            frame,
            msg_id,
            route,
        })
    }
}

impl Render for RoutePayload {
    fn render(&self, out: &mut Fields) {
        render_route(&self.route, out);
    }
}

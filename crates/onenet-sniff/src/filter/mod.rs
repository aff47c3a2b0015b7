//! Interval-set packet filter.
//!
//! One [`RangeSet`] per numeric field, one [`MatchPredicate`] per boolean
//! predicate and two key subsets. A packet passes when every configured
//! constraint accepts it; unconfigured fields impose nothing.

pub mod command;
pub mod field;
pub mod range_set;

use std::collections::BTreeMap;

use onenet_core::KeyScope;
use onenet_crypto::{Key, KeyRings, Keyring};

use crate::error::ConfigError;
use crate::packet::Packet;

pub use command::FilterCommand;
pub use field::{FilterField, MatchPredicate, Predicate};
pub use range_set::{RangeError, RangeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    ranges: BTreeMap<FilterField, RangeSet>,
    predicates: BTreeMap<Predicate, MatchPredicate>,
    /// Accepted keys per scope; an empty ring accepts any key.
    keys: KeyRings,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_mut(&mut self, field: FilterField) -> &mut RangeSet {
        self.ranges
            .entry(field)
            .or_insert_with(|| RangeSet::new(field.max()))
    }

    fn range_err(field: FilterField) -> impl FnOnce(RangeError) -> ConfigError {
        move |source| ConfigError::Range {
            field: field.name(),
            source,
        }
    }

    pub fn accept_value(&mut self, field: FilterField, value: u64) -> Result<(), ConfigError> {
        self.accept_range(field, value, value)
    }

    pub fn accept_range(&mut self, field: FilterField, lo: u64, hi: u64) -> Result<(), ConfigError> {
        self.set_mut(field)
            .accept_range(lo, hi)
            .map_err(Self::range_err(field))
    }

    pub fn reject_value(&mut self, field: FilterField, value: u64) -> Result<(), ConfigError> {
        self.reject_range(field, value, value)
    }

    pub fn reject_range(&mut self, field: FilterField, lo: u64, hi: u64) -> Result<(), ConfigError> {
        self.set_mut(field)
            .reject_range(lo, hi)
            .map_err(Self::range_err(field))
    }

    /// Drops every constraint on `field`.
    pub fn clear_field(&mut self, field: FilterField) {
        self.ranges.remove(&field);
    }

    pub fn range_set(&self, field: FilterField) -> Option<&RangeSet> {
        self.ranges.get(&field)
    }

    pub fn value_accepted(&self, field: FilterField, value: u64) -> bool {
        self.ranges.get(&field).map_or(true, |set| set.contains(value))
    }

    pub fn set_predicate(&mut self, predicate: Predicate, state: MatchPredicate) {
        self.predicates.insert(predicate, state);
    }

    pub fn predicate(&self, predicate: Predicate) -> MatchPredicate {
        self.predicates.get(&predicate).copied().unwrap_or_default()
    }

    pub fn match_value_accepted(&self, predicate: Predicate, observed: bool) -> bool {
        self.predicate(predicate).accepts(observed)
    }

    pub fn accepted_keys(&self, scope: KeyScope) -> &Keyring {
        self.keys.for_scope(scope)
    }

    pub fn accept_key(&mut self, scope: KeyScope, key: Key) -> bool {
        self.keys.for_scope_mut(scope).insert(key)
    }

    pub fn reject_key(&mut self, scope: KeyScope, key: &Key) -> bool {
        self.keys.for_scope_mut(scope).remove(key)
    }

    fn key_accepted(&self, packet: &Packet) -> bool {
        let Some(kind) = packet.kind else {
            return self.keys.network.is_empty() && self.keys.invite.is_empty();
        };
        let ring = self.keys.for_scope(kind.key_scope());
        if ring.is_empty() {
            return true;
        }
        packet.key.is_some_and(|key| ring.contains(&key))
    }

    /// True when every configured constraint accepts `packet` stored at `timestamp`.
    pub fn accepts(&self, timestamp: u64, packet: &Packet) -> bool {
        let ranges_ok = self.ranges.iter().all(|(field, set)| {
            set.is_wildcard()
                || field
                    .value_of(timestamp, packet)
                    .is_some_and(|value| set.contains(value))
        });
        ranges_ok
            && self
                .predicates
                .iter()
                .all(|(predicate, state)| state.accepts(predicate.observe(packet)))
            && self.key_accepted(packet)
    }

    /// Human-readable state of one field.
    pub fn describe(&self, field: FilterField) -> String {
        match self.ranges.get(&field) {
            Some(set) => format!("{field}: {set}"),
            None => format!("{field}: any"),
        }
    }
}

//! Analysis session: keyrings, filter, attribute selection and packet store
//! owned together and passed explicitly.

use std::io::BufRead;
use std::ops::RangeInclusive;
use std::time::Duration;

use onenet_codec::raw::RawPacket;
use onenet_crypto::{KeyRings, PayloadCipher, XteaCipher};
use serde::Serialize;
use tracing::{debug, info};

use crate::attribute::{AttributeSet, PacketRecord};
use crate::capture::CaptureReader;
use crate::config::SniffConfig;
use crate::error::{SessionError, StoreError};
use crate::filter::{Filter, FilterCommand};
use crate::packet::Packet;
use crate::pipeline::decode_packet;
use crate::store::PacketStore;

/// Counters for one ingested capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Capture entries read, well-formed or not.
    pub entries: usize,
    pub stored: usize,
    /// Stored packets that failed at least one validity check.
    pub invalid: usize,
    pub capture_errors: usize,
    pub pipeline_errors: usize,
    pub duplicates: usize,
}

pub struct AnalysisSession<C = XteaCipher> {
    config: SniffConfig,
    keys: KeyRings,
    filter: Filter,
    attributes: AttributeSet,
    store: PacketStore,
    cipher: C,
    /// Timestamp bounds applied on top of the filter.
    window: Option<RangeInclusive<u64>>,
}

impl AnalysisSession<XteaCipher> {
    pub fn new(config: SniffConfig) -> Result<Self, SessionError> {
        Self::with_cipher(config, XteaCipher)
    }
}

impl<C: PayloadCipher> AnalysisSession<C> {
    pub fn with_cipher(config: SniffConfig, cipher: C) -> Result<Self, SessionError> {
        let keys = config.keyrings()?;
        let filter = config.filter()?;
        let attributes = config.attribute_set()?;
        let store = PacketStore::new(config.timestamp_offset_ms);
        debug!(
            network_keys = keys.network.len(),
            invite_keys = keys.invite.len(),
            offset_ms = config.timestamp_offset_ms,
            "analysis session created"
        );
        Ok(Self {
            config,
            keys,
            filter,
            attributes,
            store,
            cipher,
            window: None,
        })
    }

    pub fn config(&self) -> &SniffConfig {
        &self.config
    }

    pub fn keys(&self) -> &KeyRings {
        &self.keys
    }

    /// Keyrings used for later ingests; stored packets are not re-decoded.
    pub fn keys_mut(&mut self) -> &mut KeyRings {
        &mut self.keys
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut Filter {
        &mut self.filter
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeSet {
        &mut self.attributes
    }

    pub fn store(&self) -> &PacketStore {
        &self.store
    }

    /// Decodes one packet and stores it; returns the stored timestamp.
    pub fn ingest(&mut self, raw: RawPacket) -> Result<u64, SessionError> {
        let packet = decode_packet(raw, &self.keys, &self.cipher)?;
        Ok(self.store.insert(packet)?)
    }

    /// Like [`Self::ingest`], from a hex string.
    ///
    /// Odd digit counts and non-hex characters are [`SessionError::Parse`]
    /// errors raised before any decode; nothing is stored.
    pub fn ingest_hex(&mut self, timestamp_ms: u64, text: &str) -> Result<u64, SessionError> {
        let raw = RawPacket::from_hex(timestamp_ms, text).map_err(SessionError::from_hex_input)?;
        self.ingest(raw)
    }

    /// Ingests every packet of a capture; bad entries are counted and skipped.
    pub fn ingest_capture<R: BufRead>(&mut self, reader: R) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for item in CaptureReader::new(reader) {
            summary.entries += 1;
            let raw = match item {
                Ok(raw) => raw,
                Err(_) => {
                    summary.capture_errors += 1;
                    continue;
                }
            };
            match self.ingest(raw) {
                Ok(timestamp) => {
                    summary.stored += 1;
                    if self.store.get(timestamp).is_some_and(|p| !p.is_valid()) {
                        summary.invalid += 1;
                    }
                }
                Err(SessionError::Store(StoreError::DuplicateTimestamp(_))) => {
                    summary.duplicates += 1;
                }
                Err(err) => {
                    debug!(error = %err, "packet not decoded");
                    summary.pipeline_errors += 1;
                }
            }
        }
        info!(
            entries = summary.entries,
            stored = summary.stored,
            invalid = summary.invalid,
            capture_errors = summary.capture_errors,
            pipeline_errors = summary.pipeline_errors,
            duplicates = summary.duplicates,
            "capture ingested"
        );
        summary
    }

    /// Parses and applies one filter command; display commands return text.
    pub fn apply_command(&mut self, text: &str) -> Result<Option<String>, SessionError> {
        let command: FilterCommand = text.parse()?;
        Ok(command.apply(&mut self.filter)?)
    }

    /// Stored packets accepted by the session filter.
    pub fn query(&self) -> impl Iterator<Item = (u64, &Packet)> {
        let window = self.window.clone();
        self.store
            .query(&self.filter)
            .filter(move |(timestamp, _)| window.as_ref().map_or(true, |w| w.contains(timestamp)))
    }

    /// Narrows queries to packets stored within `span` of the newest one
    /// stored at the time of the call.
    ///
    /// The window intersects whatever the timestamp filter already accepts,
    /// so it can only remove packets from query results.
    pub fn restrict_to_window(&mut self, span: Duration) {
        let Some((newest, _)) = self.store.iter().last() else {
            return;
        };
        let span = u64::try_from(span.as_millis()).unwrap_or(u64::MAX);
        let oldest = newest.saturating_sub(span);
        debug!(oldest, newest, "query window set");
        self.window = Some(oldest..=newest);
    }

    pub fn clear_window(&mut self) {
        self.window = None;
    }

    /// Rendered records for every packet the filter accepts.
    pub fn records(&self) -> Vec<PacketRecord> {
        self.query()
            .map(|(timestamp, packet)| self.attributes.render(timestamp, packet))
            .collect()
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.window = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use onenet_codec::error::CodecError;

    use crate::error::ParseError;

    const SINGLE_APP_FIXTURE: &str =
        "55555533B4BCB4C3B4B6B4B4B4B4BAA5B4BCB4B4A626B5C3C6B2C23A5456CABC";

    struct BrokenPipe;

    impl io::Read for BrokenPipe {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    impl BufRead for BrokenPipe {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn consume(&mut self, _amt: usize) {}
    }

    fn session_with(timestamps: &[u64]) -> AnalysisSession {
        let mut session = session();
        for ts in timestamps {
            session.ingest_hex(*ts, SINGLE_APP_FIXTURE).unwrap();
        }
        session
    }

    fn session() -> AnalysisSession {
        AnalysisSession::new(SniffConfig::default()).unwrap()
    }

    #[test]
    fn odd_hex_is_rejected_before_decoding() {
        let mut session = session();
        assert_eq!(
            session.ingest_hex(1, "5555553"),
            Err(SessionError::Parse(ParseError::OddHexDigits(7)))
        );
        assert_eq!(
            session.ingest_hex(2, "55x5"),
            Err(SessionError::Parse(ParseError::InvalidHexDigit { ch: 'x', index: 2 }))
        );
        assert_eq!(
            session.ingest_hex(3, "  "),
            Err(SessionError::Codec(CodecError::Empty))
        );
        assert!(session.store().is_empty());
    }

    #[test]
    fn bad_config_fails_session_creation() {
        let config = SniffConfig {
            attributes: vec!["colour".into()],
            ..SniffConfig::default()
        };
        assert!(matches!(
            AnalysisSession::new(config),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn commands_update_the_filter() {
        let mut session = session();
        assert_eq!(session.apply_command("dst add 0x5").unwrap(), None);
        assert_eq!(
            session.apply_command("dst display").unwrap().as_deref(),
            Some("dst: 0x5")
        );
        assert!(session.apply_command("dst add 0x1000").is_err());
    }

    #[test]
    fn capture_counts_malformed_entries() {
        let mut session = session();
        let summary = session.ingest_capture("not a header\n\n3 received 1 bytes: 55\n".as_bytes());
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.capture_errors, 1);
        assert_eq!(summary.pipeline_errors, 1);
        assert_eq!(summary.stored, 0);
    }
    #[test]
    fn failing_reader_ends_the_batch() {
        let mut session = session();
        let summary = session.ingest_capture(BrokenPipe);
        assert_eq!(summary.capture_errors, 1);
        assert_eq!(summary.entries, 1);
        assert_eq!(summary.stored, 0);
    }

    #[test]
    fn window_keeps_only_recent_packets() {
        let mut session = session_with(&[0, 4_000, 9_000, 10_000]);
        session.restrict_to_window(Duration::from_secs(5));
        let kept: Vec<u64> = session.query().map(|(ts, _)| ts).collect();
        assert_eq!(kept, vec![9_000, 10_000]);

        session.clear_window();
        assert_eq!(session.query().count(), 4);
    }

    #[test]
    fn window_narrows_an_existing_timestamp_filter() {
        let mut session = session_with(&[0, 4_000, 9_000, 10_000]);
        session.apply_command("timestamp add 0-10").unwrap();
        assert_eq!(session.query().count(), 1);

        session.restrict_to_window(Duration::from_secs(5));
        assert_eq!(session.query().count(), 0);
        assert!(session.records().is_empty());
    }

    #[test]
    fn window_on_an_empty_store_is_a_no_op() {
        let mut session = session();
        session.restrict_to_window(Duration::from_secs(5));
        session.ingest_hex(7, SINGLE_APP_FIXTURE).unwrap();
        assert_eq!(session.query().count(), 1);
    }
}

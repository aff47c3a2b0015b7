//! Text and JSON-lines rendering of packet records.

use std::io::{self, Write};

use clap::ValueEnum;
use onenet_sniff::attribute::PacketRecord;
use onenet_sniff::session::BatchSummary;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

pub fn write_records<W: Write>(
    out: &mut W,
    records: &[PacketRecord],
    format: OutputFormat,
) -> io::Result<()> {
    for record in records {
        match format {
            OutputFormat::Text => writeln!(out, "{record}")?,
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(record)?)?,
        }
    }
    Ok(())
}

pub fn write_summary<W: Write>(
    out: &mut W,
    summary: &BatchSummary,
    shown: usize,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => writeln!(
            out,
            "{} entries, {} stored ({} invalid), {} shown, {} capture errors, {} undecodable, {} duplicates",
            summary.entries,
            summary.stored,
            summary.invalid,
            shown,
            summary.capture_errors,
            summary.pipeline_errors,
            summary.duplicates
        ),
        OutputFormat::Json => {
            let value = serde_json::json!({ "summary": summary, "shown": shown });
            writeln!(out, "{value}")
        }
    }
}

// crates/mcp-conformance-harness/src/transcript.rs
// ============================================================================
// Module: Scenario Transcript
// Description: Ordered record of chat exchanges, RPC calls, and parsed data.
// Purpose: Give every scenario outcome a replayable diagnostic trail.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Transcript`] collects [`TranscriptEntry`] values with a monotonically
//! increasing sequence number. Session transcripts are merged into the
//! scenario transcript with [`Transcript::extend`], which renumbers entries.

use serde::Serialize;
use serde_json::Value;

/// Source of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptChannel {
    /// Chat completion exchange.
    Chat,
    /// JSON-RPC request/response or notification.
    Rpc,
    /// Structure parsed from model or tool output.
    Parse,
}

/// One recorded exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    /// 1-based position within the transcript.
    pub sequence: u64,
    /// Entry source.
    pub channel: TranscriptChannel,
    /// Method, call, or parse step name.
    pub method: String,
    /// Request payload (prompt, JSON-RPC request, raw text).
    pub request: Value,
    /// Response payload (`null` when absent).
    pub response: Value,
    /// Failure detail when the exchange failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ordered transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    /// Entries in sequence order.
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends an entry and returns its sequence number.
    pub fn record(
        &mut self,
        channel: TranscriptChannel,
        method: &str,
        request: Value,
        response: Value,
        error: Option<String>,
    ) -> u64 {
        let sequence = self.next_sequence();
        self.entries.push(TranscriptEntry {
            sequence,
            channel,
            method: method.to_string(),
            request,
            response,
            error,
        });
        sequence
    }

    /// Appends all entries of `other`, renumbering them.
    pub fn extend(&mut self, other: Self) {
        for mut entry in other.entries {
            entry.sequence = self.next_sequence();
            self.entries.push(entry);
        }
    }

    /// Returns the entries.
    #[must_use]
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Consumes the transcript, returning its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<TranscriptEntry> {
        self.entries
    }

    /// Returns the entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns entries for one method.
    pub fn by_method<'a>(&'a self, method: &'a str) -> impl Iterator<Item = &'a TranscriptEntry> {
        self.entries.iter().filter(move |entry| entry.method == method)
    }

    /// Next 1-based sequence number.
    fn next_sequence(&self) -> u64 {
        u64::try_from(self.entries.len()).unwrap_or(u64::MAX).saturating_add(1)
    }
}

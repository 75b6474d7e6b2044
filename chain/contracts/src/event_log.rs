//! Append-only event log with a SHA-256 hash chain
//!
//! Every committed operation appends one [`LoggedEvent`]. Each entry's
//! digest covers the previous digest, its sequence number, the ledger
//! height and the JSON encoding of the event, so a copy held off-chain
//! can be checked against [`EventLog::head`] with [`EventLog::verify_chain`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use ledger_types::ids::Address;

use crate::events::ExchangeEvent;

/// Digest preceding the first entry
pub const GENESIS_DIGEST: [u8; 32] = [0u8; 32];

/// A committed event plus its position in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub sequence: u64,
    pub id: Uuid,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
    pub event: ExchangeEvent,
    pub digest: [u8; 32],
}

/// Compute the chained digest for an entry.
///
/// `ExchangeEvent` is plain data keyed by strings, so its JSON encoding
/// cannot fail; an encoding error would hash as an empty payload.
pub fn chain_digest(
    previous: &[u8; 32],
    sequence: u64,
    height: u64,
    event: &ExchangeEvent,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(previous);
    hasher.update(sequence.to_be_bytes());
    hasher.update(height.to_be_bytes());
    hasher.update(serde_json::to_vec(event).unwrap_or_default());
    hasher.finalize().into()
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<LoggedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return the committed entry.
    pub fn append(
        &mut self,
        height: u64,
        timestamp: DateTime<Utc>,
        event: ExchangeEvent,
    ) -> &LoggedEvent {
        let sequence = self.entries.len() as u64;
        let digest = chain_digest(&self.head(), sequence, height, &event);
        self.entries.push(LoggedEvent {
            sequence,
            id: Uuid::now_v7(),
            height,
            timestamp,
            event,
            digest,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Digest of the latest entry, or [`GENESIS_DIGEST`] when empty.
    pub fn head(&self) -> [u8; 32] {
        self.entries
            .last()
            .map(|e| e.digest)
            .unwrap_or(GENESIS_DIGEST)
    }

    /// Recompute the chain and compare it with the stored digests.
    pub fn verify_chain(&self) -> bool {
        verify_entries(&self.entries)
    }

    pub fn entries(&self) -> &[LoggedEvent] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LoggedEvent> {
        self.entries.last()
    }

    /// Entries with `sequence >= from`.
    pub fn since(&self, from: u64) -> &[LoggedEvent] {
        let start = usize::try_from(from)
            .unwrap_or(usize::MAX)
            .min(self.entries.len());
        &self.entries[start..]
    }

    /// Entries in which `account` acted or is the subject.
    pub fn involving<'a>(
        &'a self,
        account: &'a Address,
    ) -> impl Iterator<Item = &'a LoggedEvent> + 'a {
        self.entries.iter().filter(move |e| e.event.involves(account))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Verify a chain of entries starting from [`GENESIS_DIGEST`].
pub fn verify_entries(entries: &[LoggedEvent]) -> bool {
    let mut previous = GENESIS_DIGEST;
    for (i, entry) in entries.iter().enumerate() {
        if entry.sequence != i as u64 {
            return false;
        }
        let expected = chain_digest(&previous, entry.sequence, entry.height, &entry.event);
        if expected != entry.digest {
            return false;
        }
        previous = entry.digest;
    }
    true
}

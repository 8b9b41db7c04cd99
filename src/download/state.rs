//! Transfer outcomes and run tallies.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Terminal state of one attachment transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Success,
    AlreadyExists,
    DuplicateContent,
    Throttled,
    TooLarge,
    Timeout,
    LocalIoError,
    OtherError,
}

impl TransferStatus {
    /// Every status, in display order.
    pub const ALL: [TransferStatus; 8] = [
        TransferStatus::Success,
        TransferStatus::AlreadyExists,
        TransferStatus::DuplicateContent,
        TransferStatus::TooLarge,
        TransferStatus::Throttled,
        TransferStatus::Timeout,
        TransferStatus::LocalIoError,
        TransferStatus::OtherError,
    ];

    /// Whether the scheduler should requeue the attachment.
    pub fn is_requeue(self) -> bool {
        self == TransferStatus::Throttled
    }

    /// Whether the status represents a failure rather than a skip or success.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            TransferStatus::Throttled
                | TransferStatus::Timeout
                | TransferStatus::LocalIoError
                | TransferStatus::OtherError
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            TransferStatus::Success => "downloaded",
            TransferStatus::AlreadyExists => "already exists",
            TransferStatus::DuplicateContent => "duplicate content",
            TransferStatus::Throttled => "throttled",
            TransferStatus::TooLarge => "too large",
            TransferStatus::Timeout => "timed out",
            TransferStatus::LocalIoError => "local i/o error",
            TransferStatus::OtherError => "failed",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub filename: String,
    pub status: TransferStatus,
}

impl TransferOutcome {
    pub fn new(filename: impl Into<String>, status: TransferStatus) -> Self {
        Self {
            filename: filename.into(),
            status,
        }
    }
}

/// Count of outcomes per status.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadTally {
    counts: BTreeMap<TransferStatus, u64>,
}

impl DownloadTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tally from a list of outcomes.
    pub fn from_outcomes(outcomes: &[TransferOutcome]) -> Self {
        let mut tally = Self::new();
        for outcome in outcomes {
            tally.record(outcome.status);
        }
        tally
    }

    pub fn record(&mut self, status: TransferStatus) {
        *self.counts.entry(status).or_insert(0) += 1;
    }

    pub fn count(&self, status: TransferStatus) -> u64 {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    /// Total outcomes recorded.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Outcomes that ended in a failure status.
    pub fn failures(&self) -> u64 {
        self.counts
            .iter()
            .filter(|(status, _)| status.is_failure())
            .map(|(_, count)| count)
            .sum()
    }

    /// Non-zero counts in display order.
    pub fn entries(&self) -> Vec<(TransferStatus, u64)> {
        TransferStatus::ALL
            .iter()
            .map(|&status| (status, self.count(status)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_from_outcomes() {
        let outcomes = vec![
            TransferOutcome::new("a.png", TransferStatus::Success),
            TransferOutcome::new("b.png", TransferStatus::Success),
            TransferOutcome::new("c.png", TransferStatus::DuplicateContent),
            TransferOutcome::new("d.png", TransferStatus::OtherError),
        ];
        let tally = DownloadTally::from_outcomes(&outcomes);
        assert_eq!(tally.count(TransferStatus::Success), 2);
        assert_eq!(tally.count(TransferStatus::DuplicateContent), 1);
        assert_eq!(tally.count(TransferStatus::Timeout), 0);
        assert_eq!(tally.total(), 4);
        assert_eq!(tally.failures(), 1);
    }

    #[test]
    fn test_entries_skip_zero_counts() {
        let mut tally = DownloadTally::new();
        tally.record(TransferStatus::TooLarge);
        tally.record(TransferStatus::Success);
        assert_eq!(
            tally.entries(),
            vec![(TransferStatus::Success, 1), (TransferStatus::TooLarge, 1)]
        );
    }

    #[test]
    fn test_status_classification() {
        assert!(TransferStatus::Throttled.is_requeue());
        assert!(!TransferStatus::Timeout.is_requeue());
        assert!(!TransferStatus::AlreadyExists.is_failure());
        assert!(TransferStatus::LocalIoError.is_failure());
        assert_eq!(TransferStatus::TooLarge.to_string(), "too large");
    }
}

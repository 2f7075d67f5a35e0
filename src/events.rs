// ============================================================================
// Observable Events - WagerBook Ledger
// ============================================================================
//
// Typed event records appended at every externally observable state change.
// The log is append-only; events carry the exact fields callers need to
// reconstruct ledger activity without replaying engine internals.
//
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::escrow::WagerOutcome;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WagerEvent {
    WagerCreated {
        id: String,
        creator: String,
        content_hash: String,
        storage_ref: String,
        content_key: String,
        creator_stake: u64,
        required_match: u64,
        odds_bps: u64,
        deadline: Option<u64>,
    },
    WagerFilled {
        id: String,
        filler: String,
        amount: u64,
        remaining: u64,
    },
    WagerCancelled {
        id: String,
        creator: String,
        refund: u64,
    },
    WagerExpired {
        id: String,
        creator: String,
        refund: u64,
        had_fills: bool,
    },
    WagerSettled {
        id: String,
        winner: Option<String>,
        payout: u64,
        creator_won: bool,
    },
    KeeperProposed {
        proposal_id: String,
        proposer: String,
        target: String,
        add: bool,
    },
    KeeperAdded {
        keeper: String,
        endpoint: String,
    },
    KeeperRemoved {
        keeper: String,
    },
    VoteCast {
        id: String,
        keeper: String,
        score: i64,
        creator_won: bool,
    },
    ConsensusReached {
        id: String,
        outcome: WagerOutcome,
        avg_score: i64,
        divergent: bool,
    },
    DisputeRaised {
        id: String,
        challenger: String,
        stake: u64,
        reason: String,
    },
    DisputeResolved {
        id: String,
        flipped: bool,
        corrected_score: i64,
        corrected_outcome: WagerOutcome,
    },
    DisputeSlashed {
        id: String,
        challenger: String,
        stake: u64,
    },
    DisputeRewarded {
        id: String,
        challenger: String,
        refund: u64,
        reward: u64,
    },
    KeeperPenalized {
        id: String,
        keeper: String,
        submitted_score: i64,
        corrected_score: i64,
    },
    FeesWithdrawn {
        to: String,
        amount: u64,
    },
}

/// A logged event with its emission time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub seq: u64,
    pub at: u64,
    pub event: WagerEvent,
}

/// Append-only in-memory event log
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<LoggedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: WagerEvent) {
        let seq = self.events.len() as u64;
        let stamp = chrono::Utc::now().timestamp().max(0) as u64;
        tracing::info!(seq, event = ?event, "ledger event");
        self.events.push(LoggedEvent { seq, at: stamp, event });
    }

    pub fn all(&self) -> &[LoggedEvent] {
        &self.events
    }

    pub fn recent(&self, limit: usize) -> Vec<&LoggedEvent> {
        self.events.iter().rev().take(limit).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_assigns_sequence() {
        let mut log = EventLog::new();
        log.emit(WagerEvent::FeesWithdrawn { to: "TREASURY".to_string(), amount: 5 });
        log.emit(WagerEvent::KeeperRemoved { keeper: "k1".to_string() });

        assert_eq!(log.len(), 2);
        assert_eq!(log.all()[0].seq, 0);
        assert_eq!(log.all()[1].seq, 1);
    }

    #[test]
    fn test_recent_is_reverse_ordered() {
        let mut log = EventLog::new();
        for amount in 0..5 {
            log.emit(WagerEvent::FeesWithdrawn { to: "TREASURY".to_string(), amount });
        }
        let recent = log.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].seq, 4);
    }
}

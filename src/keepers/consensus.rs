// ============================================================================
// Outcome Consensus - WagerBook Ledger
// ============================================================================
//
// Aggregates keeper outcome reports into a single decision per wager. Each
// keeper reports once: a signed net score (positive favors the creator) and
// a verdict. A decision lands once one verdict accumulates a supermajority
// of the current keeper count (minimum two, so a lone keeper can never
// finalize). An exactly-zero average score declares a tie regardless of the
// verdict tally; an invalid-evidence supermajority voids the wager.
//
// Score divergence beyond the configured tolerance is surfaced as a flag on
// the record: keepers agreeing on direction but not magnitude is a signal
// dispute arbitration cares about.
//
// ============================================================================

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{WagerError, WagerResult};
use crate::escrow::WagerOutcome;

/// A keeper's verdict on a wager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    Creator,
    Counter,
    /// Underlying evidence invalid; the wager should be voided
    Invalid,
}

impl VoteChoice {
    /// Map the public (score, win-flag) report shape onto a verdict. An
    /// absent win-flag marks the evidence invalid.
    pub fn from_report(win_flag: Option<bool>) -> Self {
        match win_flag {
            Some(true) => VoteChoice::Creator,
            Some(false) => VoteChoice::Counter,
            None => VoteChoice::Invalid,
        }
    }
}

/// One keeper report for one wager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperVote {
    pub keeper: String,
    pub score: i64,
    pub choice: VoteChoice,
    pub cast_at: u64,
}

/// Per-wager vote aggregation and (eventual) decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusRecord {
    pub wager_id: String,
    pub votes: Vec<KeeperVote>,
    pub decision: Option<WagerOutcome>,
    /// Average of all submitted scores, truncated toward zero
    pub avg_score: i64,
    /// Scores span more than the tolerance even though verdicts may agree
    pub divergent: bool,
    pub decided_at: Option<u64>,
}

impl ConsensusRecord {
    fn new(wager_id: &str) -> Self {
        Self {
            wager_id: wager_id.to_string(),
            votes: Vec::new(),
            decision: None,
            avg_score: 0,
            divergent: false,
            decided_at: None,
        }
    }

    fn tally(&self, choice: VoteChoice) -> usize {
        self.votes.iter().filter(|v| v.choice == choice).count()
    }
}

/// Derive the outcome a (score, verdict) correction encodes: invalid voids,
/// a zero score ties, otherwise the verdict stands.
pub fn outcome_from_report(score: i64, win_flag: Option<bool>) -> WagerOutcome {
    match win_flag {
        None => WagerOutcome::Voided,
        Some(_) if score == 0 => WagerOutcome::Tie,
        Some(true) => WagerOutcome::CreatorWins,
        Some(false) => WagerOutcome::CounterWins,
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OutcomeConsensus {
    pub records: HashMap<String, ConsensusRecord>,
}

impl OutcomeConsensus {
    pub fn new() -> Self {
        Self { records: HashMap::new() }
    }

    pub fn record(&self, wager_id: &str) -> Option<&ConsensusRecord> {
        self.records.get(wager_id)
    }

    /// The decided outcome plus decision time, if consensus was reached.
    pub fn decision(&self, wager_id: &str) -> Option<(WagerOutcome, u64)> {
        let record = self.records.get(wager_id)?;
        Some((record.decision?, record.decided_at?))
    }

    /// Accept one keeper report. Returns the decision if this vote reached
    /// quorum. `quorum` is derived from the current keeper count by the
    /// caller; `tolerance` bounds acceptable score spread.
    pub fn submit_vote(
        &mut self,
        wager_id: &str,
        keeper: &str,
        score: i64,
        choice: VoteChoice,
        quorum: usize,
        tolerance: i64,
    ) -> WagerResult<Option<WagerOutcome>> {
        let record = self
            .records
            .entry(wager_id.to_string())
            .or_insert_with(|| ConsensusRecord::new(wager_id));

        if record.decision.is_some() {
            return Err(WagerError::ConsensusAlreadyReached(wager_id.to_string()));
        }
        if record.votes.iter().any(|v| v.keeper == keeper) {
            return Err(WagerError::AlreadyVoted(wager_id.to_string()));
        }

        record.votes.push(KeeperVote {
            keeper: keeper.to_string(),
            score,
            choice,
            cast_at: now(),
        });

        let sum: i64 = record.votes.iter().map(|v| v.score).sum();
        record.avg_score = sum / record.votes.len() as i64;

        if record.votes.len() >= 2 {
            let max = record.votes.iter().map(|v| v.score).max().unwrap();
            let min = record.votes.iter().map(|v| v.score).min().unwrap();
            record.divergent = max - min > tolerance;
        }

        let decided = if record.tally(VoteChoice::Invalid) >= quorum {
            Some(WagerOutcome::Voided)
        } else if record.tally(VoteChoice::Creator) >= quorum {
            Some(if record.avg_score == 0 { WagerOutcome::Tie } else { WagerOutcome::CreatorWins })
        } else if record.tally(VoteChoice::Counter) >= quorum {
            Some(if record.avg_score == 0 { WagerOutcome::Tie } else { WagerOutcome::CounterWins })
        } else {
            None
        };

        if let Some(outcome) = decided {
            record.decision = Some(outcome);
            record.decided_at = Some(now());
        }
        Ok(decided)
    }

    /// Replace a decision with a dispute correction. The vote history is
    /// untouched; only the decision and aggregate score move.
    pub fn apply_correction(
        &mut self,
        wager_id: &str,
        outcome: WagerOutcome,
        corrected_score: i64,
    ) -> WagerResult<()> {
        let record = self
            .records
            .get_mut(wager_id)
            .ok_or_else(|| WagerError::NoConsensus(wager_id.to_string()))?;
        if record.decision.is_none() {
            return Err(WagerError::NoConsensus(wager_id.to_string()));
        }
        record.decision = Some(outcome);
        record.avg_score = corrected_score;
        Ok(())
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_keepers_must_both_agree() {
        let mut consensus = OutcomeConsensus::new();

        let decided = consensus
            .submit_vote("wgr_1", "k0", 40, VoteChoice::Creator, 2, 500)
            .unwrap();
        assert!(decided.is_none());

        let decided = consensus
            .submit_vote("wgr_1", "k1", 38, VoteChoice::Creator, 2, 500)
            .unwrap();
        assert_eq!(decided, Some(WagerOutcome::CreatorWins));
    }

    #[test]
    fn test_lone_keeper_never_finalizes() {
        let mut consensus = OutcomeConsensus::new();
        let decided = consensus
            .submit_vote("wgr_1", "k0", 40, VoteChoice::Creator, 2, 500)
            .unwrap();
        assert!(decided.is_none());
        assert!(consensus.decision("wgr_1").is_none());
    }

    #[test]
    fn test_repeat_vote_rejected() {
        let mut consensus = OutcomeConsensus::new();
        consensus.submit_vote("wgr_1", "k0", 40, VoteChoice::Creator, 2, 500).unwrap();

        assert_eq!(
            consensus.submit_vote("wgr_1", "k0", 45, VoteChoice::Creator, 2, 500),
            Err(WagerError::AlreadyVoted("wgr_1".into()))
        );
    }

    #[test]
    fn test_votes_after_decision_rejected() {
        let mut consensus = OutcomeConsensus::new();
        consensus.submit_vote("wgr_1", "k0", 40, VoteChoice::Creator, 2, 500).unwrap();
        consensus.submit_vote("wgr_1", "k1", 40, VoteChoice::Creator, 2, 500).unwrap();

        assert_eq!(
            consensus.submit_vote("wgr_1", "k2", -40, VoteChoice::Counter, 2, 500),
            Err(WagerError::ConsensusAlreadyReached("wgr_1".into()))
        );
    }

    #[test]
    fn test_counter_side_quorum() {
        let mut consensus = OutcomeConsensus::new();
        consensus.submit_vote("wgr_1", "k0", -10, VoteChoice::Counter, 3, 500).unwrap();
        consensus.submit_vote("wgr_1", "k1", 12, VoteChoice::Creator, 3, 500).unwrap();
        consensus.submit_vote("wgr_1", "k2", -11, VoteChoice::Counter, 3, 500).unwrap();
        let decided = consensus
            .submit_vote("wgr_1", "k3", -9, VoteChoice::Counter, 3, 500)
            .unwrap();

        assert_eq!(decided, Some(WagerOutcome::CounterWins));
    }

    #[test]
    fn test_zero_average_declares_tie() {
        let mut consensus = OutcomeConsensus::new();
        consensus.submit_vote("wgr_1", "k0", 5, VoteChoice::Creator, 2, 500).unwrap();
        let decided = consensus
            .submit_vote("wgr_1", "k1", -5, VoteChoice::Creator, 2, 500)
            .unwrap();

        assert_eq!(decided, Some(WagerOutcome::Tie));
    }

    #[test]
    fn test_invalid_quorum_voids() {
        let mut consensus = OutcomeConsensus::new();
        consensus.submit_vote("wgr_1", "k0", 0, VoteChoice::Invalid, 2, 500).unwrap();
        let decided = consensus
            .submit_vote("wgr_1", "k1", 0, VoteChoice::Invalid, 2, 500)
            .unwrap();

        assert_eq!(decided, Some(WagerOutcome::Voided));
    }

    #[test]
    fn test_divergence_flagged_even_when_agreeing() {
        let mut consensus = OutcomeConsensus::new();
        consensus.submit_vote("wgr_1", "k0", 100, VoteChoice::Creator, 2, 500).unwrap();
        consensus.submit_vote("wgr_1", "k1", 900, VoteChoice::Creator, 2, 500).unwrap();

        let record = consensus.record("wgr_1").unwrap();
        assert_eq!(record.decision, Some(WagerOutcome::CreatorWins));
        assert!(record.divergent);
    }

    #[test]
    fn test_correction_replaces_decision() {
        let mut consensus = OutcomeConsensus::new();
        consensus.submit_vote("wgr_1", "k0", 40, VoteChoice::Creator, 2, 500).unwrap();
        consensus.submit_vote("wgr_1", "k1", 40, VoteChoice::Creator, 2, 500).unwrap();

        consensus
            .apply_correction("wgr_1", WagerOutcome::CounterWins, -40)
            .unwrap();
        assert_eq!(consensus.decision("wgr_1").unwrap().0, WagerOutcome::CounterWins);
    }

    #[test]
    fn test_correction_requires_prior_decision() {
        let mut consensus = OutcomeConsensus::new();
        assert_eq!(
            consensus.apply_correction("wgr_1", WagerOutcome::Tie, 0),
            Err(WagerError::NoConsensus("wgr_1".into()))
        );
    }

    #[test]
    fn test_outcome_from_report() {
        assert_eq!(outcome_from_report(10, Some(true)), WagerOutcome::CreatorWins);
        assert_eq!(outcome_from_report(-10, Some(false)), WagerOutcome::CounterWins);
        assert_eq!(outcome_from_report(0, Some(true)), WagerOutcome::Tie);
        assert_eq!(outcome_from_report(7, None), WagerOutcome::Voided);
    }
}

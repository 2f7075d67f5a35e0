// ============================================================================
// Dispute Arbitration - WagerBook Ledger
// ============================================================================
//
// Staked challenges against a reached consensus. At most one dispute ever
// exists per wager: created once, mutated once by resolution, then terminal.
// The stake is consumed exactly once - slashed into accrued fees when the
// recomputation upholds the original decision, or refunded with a reward
// carved from the pot when the decision flips.
//
// Keeper penalties only apply on a flip: if the decision stood, the original
// call was correct by definition and nobody is penalized.
//
// ============================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{WagerError, WagerResult};
use crate::escrow::WagerOutcome;

/// The lifecycle record of a challenge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeInfo {
    pub wager_id: String,
    pub challenger: String,
    pub stake: u64,
    pub reason: String,
    pub raised_at: u64,
    pub resolved_at: Option<u64>,
    /// Whether resolution flipped the decision
    pub outcome_changed: bool,
    /// Snapshot of the decision under challenge
    pub original_outcome: WagerOutcome,
    pub original_avg_score: i64,
    pub corrected_outcome: Option<WagerOutcome>,
    pub corrected_score: Option<i64>,
    /// Reward carved from the pot on a flip
    pub reward_paid: u64,
    /// Stake absorbed into accrued fees
    pub slashed: bool,
    /// Keepers already penalized for this dispute
    pub penalized: Vec<String>,
}

impl DisputeInfo {
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DisputeArbitration {
    pub disputes: HashMap<String, DisputeInfo>,
}

impl DisputeArbitration {
    pub fn new() -> Self {
        Self { disputes: HashMap::new() }
    }

    pub fn get(&self, wager_id: &str) -> Option<&DisputeInfo> {
        self.disputes.get(wager_id)
    }

    /// Open a challenge against a decided wager. The caller has already
    /// verified consensus state and wager status; this enforces the
    /// dispute-local rules and records the original decision for the later
    /// diff.
    #[allow(clippy::too_many_arguments)]
    pub fn raise(
        &mut self,
        wager_id: &str,
        challenger: &str,
        stake: u64,
        reason: &str,
        min_stake: u64,
        max_reason_len: usize,
        original_outcome: WagerOutcome,
        original_avg_score: i64,
        decided_at: u64,
        window_secs: u64,
        now: u64,
    ) -> WagerResult<()> {
        if self.disputes.contains_key(wager_id) {
            return Err(WagerError::AlreadyDisputed(wager_id.to_string()));
        }
        if reason.is_empty() {
            return Err(WagerError::EmptyReason);
        }
        if reason.len() > max_reason_len {
            return Err(WagerError::ReasonTooLong { len: reason.len(), max: max_reason_len });
        }
        if stake < min_stake {
            return Err(WagerError::StakeBelowMinimum { stake, minimum: min_stake });
        }
        let closes_at = decided_at + window_secs;
        if now > closes_at {
            return Err(WagerError::DisputeWindowClosed {
                id: wager_id.to_string(),
                closed_at: closes_at,
                now,
            });
        }

        self.disputes.insert(
            wager_id.to_string(),
            DisputeInfo {
                wager_id: wager_id.to_string(),
                challenger: challenger.to_string(),
                stake,
                reason: reason.to_string(),
                raised_at: now,
                resolved_at: None,
                outcome_changed: false,
                original_outcome,
                original_avg_score,
                corrected_outcome: None,
                corrected_score: None,
                reward_paid: 0,
                slashed: false,
                penalized: Vec::new(),
            },
        );
        Ok(())
    }

    /// Record the one-time resolution. Returns whether the decision flipped.
    pub fn resolve(
        &mut self,
        wager_id: &str,
        corrected_score: i64,
        corrected_outcome: WagerOutcome,
        now: u64,
    ) -> WagerResult<bool> {
        let dispute = self
            .disputes
            .get_mut(wager_id)
            .ok_or_else(|| WagerError::DisputeNotFound(wager_id.to_string()))?;
        if dispute.is_resolved() {
            return Err(WagerError::DisputeAlreadyResolved(wager_id.to_string()));
        }

        let flipped = corrected_outcome != dispute.original_outcome;
        dispute.resolved_at = Some(now);
        dispute.outcome_changed = flipped;
        dispute.corrected_outcome = Some(corrected_outcome);
        dispute.corrected_score = Some(corrected_score);
        Ok(flipped)
    }

    /// Consume the stake by slashing. Only valid once, only after
    /// resolution, and never after a refund.
    pub fn mark_slashed(&mut self, wager_id: &str) -> WagerResult<u64> {
        let dispute = self
            .disputes
            .get_mut(wager_id)
            .ok_or_else(|| WagerError::DisputeNotFound(wager_id.to_string()))?;
        if !dispute.is_resolved() || dispute.slashed || dispute.reward_paid > 0 {
            return Err(WagerError::DisputeAlreadyResolved(wager_id.to_string()));
        }
        dispute.slashed = true;
        Ok(dispute.stake)
    }

    /// Consume the stake by refunding, recording the pot reward alongside.
    pub fn mark_rewarded(&mut self, wager_id: &str, reward: u64) -> WagerResult<(String, u64)> {
        let dispute = self
            .disputes
            .get_mut(wager_id)
            .ok_or_else(|| WagerError::DisputeNotFound(wager_id.to_string()))?;
        if !dispute.is_resolved() || dispute.slashed || dispute.reward_paid > 0 {
            return Err(WagerError::DisputeAlreadyResolved(wager_id.to_string()));
        }
        dispute.reward_paid = reward;
        Ok((dispute.challenger.clone(), dispute.stake))
    }

    /// Record a keeper penalty; returns false when already penalized for
    /// this dispute (double-penalty guard).
    pub fn mark_penalized(&mut self, wager_id: &str, keeper: &str) -> bool {
        match self.disputes.get_mut(wager_id) {
            Some(dispute) if !dispute.penalized.iter().any(|k| k == keeper) => {
                dispute.penalized.push(keeper.to_string());
                true
            }
            _ => false,
        }
    }

    /// Stake still escrowed in unresolved disputes
    pub fn pending_stake_total(&self) -> u64 {
        self.disputes
            .values()
            .filter(|d| !d.is_resolved())
            .map(|d| d.stake)
            .sum()
    }
}

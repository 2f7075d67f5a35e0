// ============================================================================
// Wager System - WagerBook Ledger
// ============================================================================
//
// The single entry point for every state-mutating operation. Owns the
// escrow book, the keeper engines, the collateral vault and the event log,
// and enforces the cross-subsystem preconditions no single engine can see.
//
// Every operation is one atomic sequential step: validation first (no state
// touched on rejection), then internal bookkeeping, then collateral
// transfers as the final step once all invariants are re-established.
// Deadline expiry is evaluated lazily whenever an operation touches a
// wager, and via the permissionless sweep.
//
// ============================================================================

use serde::Serialize;
use tracing::info;

use crate::config::{BPS_DENOM, WagerConfig};
use crate::error::{WagerError, WagerResult};
use crate::escrow::{
    build_settlement, CancelOutcome, FillReceipt, SettlementPlan, WagerBook, WagerOutcome,
    WagerStatus,
};
use crate::events::{EventLog, WagerEvent};
use crate::keepers::{
    outcome_from_report, DisputeArbitration, ExecutedChange, KeeperRegistry, OutcomeConsensus,
    ProposalAction, VoteChoice,
};
use crate::vault::Vault;

/// Aggregate operation counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemStats {
    pub wagers_created: u64,
    pub fills_accepted: u64,
    pub wagers_cancelled: u64,
    pub wagers_expired: u64,
    pub wagers_settled: u64,
    pub votes_cast: u64,
    pub disputes_raised: u64,
    pub disputes_resolved: u64,
    pub volume_escrowed: u64,
}

/// Result of a safe batch operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub processed: Vec<String>,
    pub skipped: Vec<String>,
}

/// Result of a dispute resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisputeVerdict {
    pub wager_id: String,
    pub flipped: bool,
    pub corrected_outcome: WagerOutcome,
    pub penalized: Vec<String>,
}

#[derive(Debug)]
pub struct WagerSystem {
    pub config: WagerConfig,
    pub vault: Vault,
    pub book: WagerBook,
    pub registry: KeeperRegistry,
    pub consensus: OutcomeConsensus,
    pub disputes: DisputeArbitration,
    pub events: EventLog,
    /// Settlement fees and slashed dispute stakes awaiting withdrawal
    pub accrued_fees: u64,
    pub stats: SystemStats,
}

impl WagerSystem {
    pub fn new(config: WagerConfig, vault: Vault, genesis_keeper: &str, endpoint: &str) -> Self {
        info!(
            fee_bps = config.fee_bps,
            decimals = config.decimals,
            genesis = genesis_keeper,
            "wager system initialized"
        );
        Self {
            config,
            vault,
            book: WagerBook::new(),
            registry: KeeperRegistry::new(genesis_keeper, endpoint),
            consensus: OutcomeConsensus::new(),
            disputes: DisputeArbitration::new(),
            events: EventLog::new(),
            accrued_fees: 0,
            stats: SystemStats::default(),
        }
    }

    // ------------------------------------------------------------------
    // Escrow & matching
    // ------------------------------------------------------------------

    /// Create a wager and escrow the full creator stake.
    pub fn create_wager(
        &mut self,
        creator: &str,
        storage_ref: &str,
        content_key: &str,
        stake: u64,
        odds_bps: u64,
        deadline: Option<u64>,
    ) -> WagerResult<String> {
        let available = self.vault.available(creator);
        if stake > 0 && available < stake {
            return Err(WagerError::InsufficientBalance { required: stake, available });
        }

        let id = self
            .book
            .create_wager(creator, storage_ref, content_key, stake, odds_bps, deadline)?;
        self.vault.escrow_from(creator, stake)?;

        let wager = self.book.get(&id)?;
        self.stats.wagers_created += 1;
        self.stats.volume_escrowed += stake;
        self.events.emit(WagerEvent::WagerCreated {
            id: id.clone(),
            creator: creator.to_string(),
            content_hash: wager.content_hash.clone(),
            storage_ref: storage_ref.to_string(),
            content_key: content_key.to_string(),
            creator_stake: stake,
            required_match: wager.required_match,
            odds_bps,
            deadline,
        });
        Ok(id)
    }

    /// Fill part (or all) of a wager's open counter-stake.
    pub fn fill_wager(&mut self, filler: &str, id: &str, amount: u64) -> WagerResult<FillReceipt> {
        self.expire_if_due(id);

        let available = self.vault.available(filler);
        if amount > 0 && available < amount {
            return Err(WagerError::InsufficientBalance { required: amount, available });
        }

        let receipt = self.book.fill(id, filler, amount, self.config.max_fills)?;
        self.vault.escrow_from(filler, amount)?;

        self.stats.fills_accepted += 1;
        self.stats.volume_escrowed += amount;
        self.events.emit(WagerEvent::WagerFilled {
            id: id.to_string(),
            filler: filler.to_string(),
            amount,
            remaining: receipt.remaining,
        });
        Ok(receipt)
    }

    /// Cancel the unfilled remainder; creator-only.
    pub fn cancel_wager(&mut self, caller: &str, id: &str) -> WagerResult<CancelOutcome> {
        self.expire_if_due(id);

        let outcome = self.book.cancel(id, caller)?;
        self.vault.release_to(&outcome.creator, outcome.refund)?;

        self.stats.wagers_cancelled += 1;
        self.events.emit(WagerEvent::WagerCancelled {
            id: id.to_string(),
            creator: outcome.creator.clone(),
            refund: outcome.refund,
        });
        Ok(outcome)
    }

    /// Permissionless: expire every open wager past its deadline.
    pub fn sweep_expired(&mut self) -> Vec<String> {
        let outcomes = self.book.sweep_expired(crate::escrow::wagers::now());
        let mut swept = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            // Refunds were computed against an already re-established book
            // state; transfers are the final step.
            self.vault
                .release_to(&outcome.creator, outcome.refund)
                .expect("pool holds every escrowed stake");
            self.stats.wagers_expired += 1;
            self.events.emit(WagerEvent::WagerExpired {
                id: outcome.wager_id.clone(),
                creator: outcome.creator,
                refund: outcome.refund,
                had_fills: outcome.had_fills,
            });
            swept.push(outcome.wager_id);
        }
        swept
    }

    fn expire_if_due(&mut self, id: &str) {
        if let Some(outcome) = self.book.try_expire(id, crate::escrow::wagers::now()) {
            self.vault
                .release_to(&outcome.creator, outcome.refund)
                .expect("pool holds every escrowed stake");
            self.stats.wagers_expired += 1;
            self.events.emit(WagerEvent::WagerExpired {
                id: outcome.wager_id,
                creator: outcome.creator,
                refund: outcome.refund,
                had_fills: outcome.had_fills,
            });
        }
    }

    // ------------------------------------------------------------------
    // Outcome reporting
    // ------------------------------------------------------------------

    /// Submit one keeper outcome report. A missing win-flag marks the
    /// evidence invalid. Returns the decision if this report reached quorum.
    pub fn report_vote(
        &mut self,
        keeper: &str,
        id: &str,
        score: i64,
        win_flag: Option<bool>,
    ) -> WagerResult<Option<WagerOutcome>> {
        self.expire_if_due(id);
        self.registry.ensure_keeper(keeper)?;

        let wager = self.book.get(id)?;
        if wager.status == WagerStatus::Settled {
            return Err(WagerError::AlreadySettled(id.to_string()));
        }
        if wager.status != WagerStatus::FullyMatched {
            return Err(WagerError::InvalidStatus {
                id: id.to_string(),
                status: wager.status.as_str().to_string(),
            });
        }

        let choice = VoteChoice::from_report(win_flag);
        let quorum = self.registry.consensus_quorum();
        let decided =
            self.consensus
                .submit_vote(id, keeper, score, choice, quorum, self.config.score_tolerance)?;

        self.stats.votes_cast += 1;
        self.events.emit(WagerEvent::VoteCast {
            id: id.to_string(),
            keeper: keeper.to_string(),
            score,
            creator_won: win_flag.unwrap_or(false),
        });

        if let Some(outcome) = decided {
            let record = self.consensus.record(id).expect("vote just recorded");
            self.events.emit(WagerEvent::ConsensusReached {
                id: id.to_string(),
                outcome,
                avg_score: record.avg_score,
                divergent: record.divergent,
            });
        }
        Ok(decided)
    }

    /// Safe batch reporting: one keeper, many wagers; ineligible entries are
    /// skipped rather than aborting the rest.
    pub fn report_votes(
        &mut self,
        keeper: &str,
        votes: &[(String, i64, Option<bool>)],
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for (id, score, win_flag) in votes {
            match self.report_vote(keeper, id, *score, *win_flag) {
                Ok(_) => report.processed.push(id.clone()),
                Err(_) => report.skipped.push(id.clone()),
            }
        }
        report
    }

    // ------------------------------------------------------------------
    // Settlement
    // ------------------------------------------------------------------

    /// Permissionless settlement of a decided wager.
    pub fn settle(&mut self, id: &str) -> WagerResult<SettlementPlan> {
        self.expire_if_due(id);

        self.book.ensure_settleable(id)?;
        let (outcome, _) = self
            .consensus
            .decision(id)
            .ok_or_else(|| WagerError::NoConsensus(id.to_string()))?;
        let pot_deduction = self.disputes.get(id).map(|d| d.reward_paid).unwrap_or(0);

        let wager = self.book.get(id)?;
        let plan = build_settlement(wager, outcome, self.config.fee_bps, pot_deduction);

        self.book.mark_settled(id)?;
        self.accrued_fees += plan.fee;
        self.stats.wagers_settled += 1;

        for (account, amount) in &plan.credits {
            self.vault
                .release_to(account, *amount)
                .expect("pool holds the full pot");
        }

        self.events.emit(WagerEvent::WagerSettled {
            id: id.to_string(),
            winner: plan.winner.clone(),
            payout: plan.payout,
            creator_won: plan.creator_won,
        });
        Ok(plan)
    }

    /// Safe batch settlement: skips wagers that are not yet eligible so one
    /// bad entry cannot block the rest.
    pub fn settle_batch(&mut self, ids: &[String]) -> BatchReport {
        let mut report = BatchReport::default();
        for id in ids {
            match self.settle(id) {
                Ok(_) => report.processed.push(id.clone()),
                Err(_) => report.skipped.push(id.clone()),
            }
        }
        report
    }

    /// Strict batch settlement: the whole batch is checked for eligibility
    /// before any wager settles; the first ineligible entry fails the batch
    /// with nothing executed.
    pub fn settle_batch_strict(&mut self, ids: &[String]) -> WagerResult<Vec<SettlementPlan>> {
        let mut unique: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }

        for id in &unique {
            self.expire_if_due(id);
            self.book.ensure_settleable(id)?;
            if self.consensus.decision(id).is_none() {
                return Err(WagerError::NoConsensus(id.clone()));
            }
        }

        let mut plans = Vec::with_capacity(unique.len());
        for id in &unique {
            plans.push(self.settle(id)?);
        }
        Ok(plans)
    }

    // ------------------------------------------------------------------
    // Keeper governance
    // ------------------------------------------------------------------

    pub fn propose_keeper(
        &mut self,
        proposer: &str,
        target: &str,
        endpoint: &str,
        add: bool,
    ) -> WagerResult<String> {
        let action = if add { ProposalAction::Add } else { ProposalAction::Remove };
        let proposal_id = self.registry.propose(proposer, target, endpoint, action)?;
        self.events.emit(WagerEvent::KeeperProposed {
            proposal_id: proposal_id.clone(),
            proposer: proposer.to_string(),
            target: target.to_string(),
            add,
        });
        Ok(proposal_id)
    }

    pub fn vote_on_proposal(&mut self, voter: &str, proposal_id: &str, approve: bool) -> WagerResult<()> {
        self.registry.vote(voter, proposal_id, approve)
    }

    pub fn execute_proposal(&mut self, caller: &str, proposal_id: &str) -> WagerResult<ExecutedChange> {
        let change = self.registry.execute(caller, proposal_id)?;
        match change.action {
            ProposalAction::Add => self.events.emit(WagerEvent::KeeperAdded {
                keeper: change.target.clone(),
                endpoint: change.endpoint.clone(),
            }),
            ProposalAction::Remove => self.events.emit(WagerEvent::KeeperRemoved {
                keeper: change.target.clone(),
            }),
        }
        Ok(change)
    }

    // ------------------------------------------------------------------
    // Disputes
    // ------------------------------------------------------------------

    /// Raise a staked challenge against a reached consensus. Freezes
    /// settlement until resolved.
    pub fn raise_dispute(
        &mut self,
        challenger: &str,
        id: &str,
        stake: u64,
        reason: &str,
    ) -> WagerResult<()> {
        self.expire_if_due(id);

        let wager = self.book.get(id)?;
        match wager.status {
            WagerStatus::Settled => return Err(WagerError::AlreadySettled(id.to_string())),
            WagerStatus::DisputePending => return Err(WagerError::AlreadyDisputed(id.to_string())),
            WagerStatus::FullyMatched => {}
            _ => {
                return Err(WagerError::InvalidStatus {
                    id: id.to_string(),
                    status: wager.status.as_str().to_string(),
                })
            }
        }

        let (outcome, decided_at) = self
            .consensus
            .decision(id)
            .ok_or_else(|| WagerError::NoConsensus(id.to_string()))?;
        let avg_score = self.consensus.record(id).map(|r| r.avg_score).unwrap_or(0);

        let available = self.vault.available(challenger);
        if available < stake {
            return Err(WagerError::InsufficientBalance { required: stake, available });
        }

        self.disputes.raise(
            id,
            challenger,
            stake,
            reason,
            self.config.min_dispute_stake,
            self.config.max_reason_len,
            outcome,
            avg_score,
            decided_at,
            self.config.dispute_window_secs,
            crate::escrow::wagers::now(),
        )?;
        self.book.get_mut(id)?.status = WagerStatus::DisputePending;
        self.vault.escrow_from(challenger, stake)?;

        self.stats.disputes_raised += 1;
        self.events.emit(WagerEvent::DisputeRaised {
            id: id.to_string(),
            challenger: challenger.to_string(),
            stake,
            reason: reason.to_string(),
        });
        Ok(())
    }

    /// Keeper-only, one-shot dispute resolution with a corrected report.
    pub fn resolve_dispute(
        &mut self,
        keeper: &str,
        id: &str,
        corrected_score: i64,
        corrected_win_flag: Option<bool>,
    ) -> WagerResult<DisputeVerdict> {
        self.registry.ensure_keeper(keeper)?;
        self.book.get(id)?;

        let corrected_outcome = outcome_from_report(corrected_score, corrected_win_flag);
        let flipped = self.disputes.resolve(
            id,
            corrected_score,
            corrected_outcome,
            crate::escrow::wagers::now(),
        )?;

        // Unfreeze settlement.
        let wager = self.book.get_mut(id)?;
        if wager.status == WagerStatus::DisputePending {
            wager.status = WagerStatus::FullyMatched;
        }

        let mut penalized = Vec::new();
        if flipped {
            self.consensus.apply_correction(id, corrected_outcome, corrected_score)?;

            let pot = self.book.get(id)?.total_pot();
            let reward = ((pot as u128 * self.config.dispute_reward_bps as u128)
                / BPS_DENOM as u128) as u64;
            let (challenger, stake) = self.disputes.mark_rewarded(id, reward)?;

            // Penalize every keeper whose original report errs beyond
            // tolerance, exactly once each.
            let erring: Vec<(String, i64)> = self
                .consensus
                .record(id)
                .map(|record| {
                    record
                        .votes
                        .iter()
                        .filter(|v| (v.score - corrected_score).abs() > self.config.score_tolerance)
                        .map(|v| (v.keeper.clone(), v.score))
                        .collect()
                })
                .unwrap_or_default();
            for (erring_keeper, submitted) in erring {
                if self.disputes.mark_penalized(id, &erring_keeper) {
                    self.registry.penalize(&erring_keeper);
                    penalized.push(erring_keeper.clone());
                    self.events.emit(WagerEvent::KeeperPenalized {
                        id: id.to_string(),
                        keeper: erring_keeper,
                        submitted_score: submitted,
                        corrected_score,
                    });
                }
            }

            self.vault
                .release_to(&challenger, stake + reward)
                .expect("pool holds the dispute stake and the pot");
            self.events.emit(WagerEvent::DisputeRewarded {
                id: id.to_string(),
                challenger,
                refund: stake,
                reward,
            });
        } else {
            let stake = self.disputes.mark_slashed(id)?;
            self.accrued_fees += stake;
            let challenger = self
                .disputes
                .get(id)
                .map(|d| d.challenger.clone())
                .unwrap_or_default();
            self.events.emit(WagerEvent::DisputeSlashed {
                id: id.to_string(),
                challenger,
                stake,
            });
        }

        self.stats.disputes_resolved += 1;
        self.events.emit(WagerEvent::DisputeResolved {
            id: id.to_string(),
            flipped,
            corrected_score,
            corrected_outcome,
        });

        Ok(DisputeVerdict {
            wager_id: id.to_string(),
            flipped,
            corrected_outcome,
            penalized,
        })
    }

    // ------------------------------------------------------------------
    // Fees & accounting
    // ------------------------------------------------------------------

    /// Permissionless: pay accumulated fees out to the configured recipient.
    pub fn withdraw_fees(&mut self) -> WagerResult<u64> {
        let amount = self.accrued_fees;
        if amount == 0 {
            return Ok(0);
        }
        self.accrued_fees = 0;
        let recipient = self.config.fee_recipient.clone();
        self.vault.release_to(&recipient, amount)?;
        self.events.emit(WagerEvent::FeesWithdrawn { to: recipient, amount });
        Ok(amount)
    }

    /// Conservation invariant: the pool holds exactly the unsettled wager
    /// escrow (net of rewards already carved out), pending dispute stakes
    /// and unwithdrawn fees.
    pub fn pool_is_conserved(&self) -> bool {
        let outstanding: u64 = self
            .book
            .wagers
            .values()
            .filter(|w| !w.status.is_terminal())
            .map(|w| {
                let reward_paid = self.disputes.get(&w.id).map(|d| d.reward_paid).unwrap_or(0);
                w.creator_stake + w.matched - reward_paid
            })
            .sum();
        self.vault.pool() == outstanding + self.disputes.pending_stake_total() + self.accrued_fees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system() -> WagerSystem {
        let config = WagerConfig::new(10, 500, 0, "TREASURY").unwrap();
        let mut vault = Vault::new(0);
        for account in ["alice", "bob", "carol", "eve", "k0", "k1", "k2"] {
            vault.register(account, 10_000_000);
        }
        WagerSystem::new(config, vault, "k0", "tcp://keeper-0")
    }

    /// Promote k1 and k2 so the registry holds three keepers
    fn with_three_keepers(system: &mut WagerSystem) {
        for target in ["k1", "k2"] {
            let id = system.propose_keeper("k0", target, "tcp://keeper", true).unwrap();
            let members: Vec<String> =
                system.registry.keepers.iter().map(|k| k.account.clone()).collect();
            for member in members {
                system.vote_on_proposal(&member, &id, true).unwrap();
            }
            system.execute_proposal("k0", &id).unwrap();
        }
    }

    fn matched_wager(system: &mut WagerSystem) -> String {
        let id = system
            .create_wager("alice", "store://bucket-7", "prop-42", 100_000, 20_000, None)
            .unwrap();
        system.fill_wager("bob", &id, 30_000).unwrap();
        system.fill_wager("carol", &id, 20_000).unwrap();
        id
    }

    fn decide(system: &mut WagerSystem, id: &str, score: i64, win_flag: Option<bool>) {
        with_three_keepers(system);
        system.report_vote("k0", id, score, win_flag).unwrap();
        let decided = system.report_vote("k1", id, score, win_flag).unwrap();
        assert!(decided.is_some());
    }

    #[test]
    fn test_create_escrows_stake() {
        let mut system = system();
        let id = system
            .create_wager("alice", "store://bucket-7", "prop-42", 100_000, 20_000, None)
            .unwrap();

        assert_eq!(system.vault.available("alice"), 9_900_000);
        assert_eq!(system.vault.pool(), 100_000);
        assert_eq!(system.book.get(&id).unwrap().required_match, 50_000);
        assert!(system.pool_is_conserved());
    }

    #[test]
    fn test_create_insufficient_balance() {
        let mut system = system();
        let err = system
            .create_wager("alice", "store://b", "k", 100_000_000, 10_000, None)
            .unwrap_err();
        assert_eq!(
            err,
            WagerError::InsufficientBalance { required: 100_000_000, available: 10_000_000 }
        );
        assert_eq!(system.stats.wagers_created, 0);
    }

    #[test]
    fn test_full_lifecycle_counter_wins() {
        let mut system = system();
        let id = matched_wager(&mut system);
        decide(&mut system, &id, -40, Some(false));

        let plan = system.settle(&id).unwrap();
        assert_eq!(plan.fee, 150);
        assert_eq!(plan.payout, 149_850);
        // bob staked 30k of 50k: 60% of the payout
        assert_eq!(system.vault.available("bob"), 10_000_000 - 30_000 + 89_910);
        assert_eq!(system.vault.available("carol"), 10_000_000 - 20_000 + 59_940);
        assert_eq!(system.accrued_fees, 150);
        assert!(system.pool_is_conserved());
    }

    #[test]
    fn test_settle_requires_consensus() {
        let mut system = system();
        let id = matched_wager(&mut system);
        assert_eq!(system.settle(&id), Err(WagerError::NoConsensus(id)));
    }

    #[test]
    fn test_settle_twice_fails() {
        let mut system = system();
        let id = matched_wager(&mut system);
        decide(&mut system, &id, 40, Some(true));

        system.settle(&id).unwrap();
        assert_eq!(system.settle(&id), Err(WagerError::AlreadySettled(id)));
    }

    #[test]
    fn test_cancel_refunds_and_conserves() {
        let mut system = system();
        let id = system
            .create_wager("alice", "store://b", "k", 100_000, 20_000, None)
            .unwrap();
        system.fill_wager("bob", &id, 10_000).unwrap();

        let outcome = system.cancel_wager("alice", &id).unwrap();
        assert_eq!(outcome.refund, 80_000); // 100_000 * 40_000 / 50_000
        assert!(outcome.closed_with_fills);
        assert_eq!(system.vault.available("alice"), 10_000_000 - 20_000);
        assert!(system.pool_is_conserved());
    }

    #[test]
    fn test_batch_settlement_safe_skips() {
        let mut system = system();
        let decided = matched_wager(&mut system);
        decide(&mut system, &decided, 40, Some(true));
        let undecided = matched_wager(&mut system);

        let report =
            system.settle_batch(&[decided.clone(), undecided.clone(), "wgr_missing".to_string()]);
        assert_eq!(report.processed, vec![decided]);
        assert_eq!(report.skipped, vec![undecided, "wgr_missing".to_string()]);
    }

    #[test]
    fn test_batch_settlement_strict_aborts_whole_batch() {
        let mut system = system();
        let decided = matched_wager(&mut system);
        decide(&mut system, &decided, 40, Some(true));
        let undecided = matched_wager(&mut system);

        let err = system
            .settle_batch_strict(&[decided.clone(), undecided.clone()])
            .unwrap_err();
        assert_eq!(err, WagerError::NoConsensus(undecided));
        // nothing settled
        assert_eq!(system.book.get(&decided).unwrap().status, WagerStatus::FullyMatched);
        assert_eq!(system.stats.wagers_settled, 0);
    }

    #[test]
    fn test_dispute_slash_path() {
        let mut system = system();
        let id = matched_wager(&mut system);
        decide(&mut system, &id, 40, Some(true));

        system.raise_dispute("eve", &id, 100, "scores look wrong").unwrap();
        assert_eq!(system.book.get(&id).unwrap().status, WagerStatus::DisputePending);
        assert_eq!(system.settle(&id), Err(WagerError::DisputePending(id.clone())));

        // recomputation upholds the original call
        let verdict = system.resolve_dispute("k0", &id, 41, Some(true)).unwrap();
        assert!(!verdict.flipped);
        assert!(verdict.penalized.is_empty());
        assert_eq!(system.accrued_fees, 100);
        assert_eq!(system.vault.available("eve"), 10_000_000 - 100);
        assert!(system.pool_is_conserved());

        // settlement proceeds on the original outcome
        let plan = system.settle(&id).unwrap();
        assert_eq!(plan.outcome, WagerOutcome::CreatorWins);
        assert!(system.pool_is_conserved());
    }

    #[test]
    fn test_dispute_flip_rewards_and_penalizes() {
        let mut system = system();
        let id = matched_wager(&mut system);
        decide(&mut system, &id, 2_000, Some(true));

        system.raise_dispute("eve", &id, 100, "reference data was stale").unwrap();
        let verdict = system.resolve_dispute("k2", &id, -2_000, Some(false)).unwrap();
        assert!(verdict.flipped);
        // both original reporters erred by 4_000 > 500 tolerance
        assert_eq!(verdict.penalized, vec!["k0".to_string(), "k1".to_string()]);
        assert_eq!(system.registry.strikes("k0"), 1);
        assert_eq!(system.registry.strikes("k1"), 1);

        // challenger got the stake back plus 5% of the 150_000 pot
        assert_eq!(system.vault.available("eve"), 10_000_000 + 7_500);
        assert!(system.pool_is_conserved());

        // settlement now follows the corrected outcome, with the reward
        // carved out of the pot
        let plan = system.settle(&id).unwrap();
        assert_eq!(plan.outcome, WagerOutcome::CounterWins);
        assert_eq!(plan.payout, 150_000 - 150 - 7_500);
        assert!(system.pool_is_conserved());
    }

    #[test]
    fn test_dispute_rejected_after_settlement() {
        let mut system = system();
        let id = matched_wager(&mut system);
        decide(&mut system, &id, 40, Some(true));
        system.settle(&id).unwrap();

        assert_eq!(
            system.raise_dispute("eve", &id, 100, "too late"),
            Err(WagerError::AlreadySettled(id))
        );
    }

    #[test]
    fn test_dispute_requires_consensus() {
        let mut system = system();
        let id = matched_wager(&mut system);
        assert_eq!(
            system.raise_dispute("eve", &id, 100, "premature"),
            Err(WagerError::NoConsensus(id))
        );
    }

    #[test]
    fn test_dispute_stake_below_minimum() {
        let mut system = system();
        let id = matched_wager(&mut system);
        decide(&mut system, &id, 40, Some(true));

        // decimals = 0 in tests, so the minimum is 10 units
        assert_eq!(
            system.raise_dispute("eve", &id, 9, "underfunded"),
            Err(WagerError::StakeBelowMinimum { stake: 9, minimum: 10 })
        );
    }

    #[test]
    fn test_voided_consensus_refunds_everyone() {
        let mut system = system();
        let id = matched_wager(&mut system);
        decide(&mut system, &id, 0, None);

        let plan = system.settle(&id).unwrap();
        assert_eq!(plan.outcome, WagerOutcome::Voided);
        assert_eq!(plan.fee, 0);
        assert_eq!(system.vault.available("alice"), 10_000_000);
        assert_eq!(system.vault.available("bob"), 10_000_000);
        assert_eq!(system.vault.available("carol"), 10_000_000);
        assert!(system.pool_is_conserved());
    }

    #[test]
    fn test_withdraw_fees() {
        let mut system = system();
        let id = matched_wager(&mut system);
        decide(&mut system, &id, 40, Some(true));
        system.settle(&id).unwrap();

        let amount = system.withdraw_fees().unwrap();
        assert_eq!(amount, 150);
        assert_eq!(system.vault.available("TREASURY"), 150);
        assert_eq!(system.accrued_fees, 0);
        assert_eq!(system.withdraw_fees().unwrap(), 0);
        assert!(system.pool_is_conserved());
    }

    #[test]
    fn test_expiry_sweep_refunds() {
        let mut system = system();
        let id = system
            .create_wager(
                "alice",
                "store://b",
                "k",
                100_000,
                10_000,
                Some(crate::escrow::wagers::now() + 3_600),
            )
            .unwrap();
        system.book.get_mut(&id).unwrap().deadline = Some(10);

        let swept = system.sweep_expired();
        assert_eq!(swept, vec![id.clone()]);
        assert_eq!(system.vault.available("alice"), 10_000_000);
        assert_eq!(system.book.get(&id).unwrap().status, WagerStatus::Cancelled);
        assert!(system.pool_is_conserved());
    }

    #[test]
    fn test_lazy_expiry_on_touch() {
        let mut system = system();
        let id = system
            .create_wager(
                "alice",
                "store://b",
                "k",
                100_000,
                10_000,
                Some(crate::escrow::wagers::now() + 3_600),
            )
            .unwrap();
        system.book.get_mut(&id).unwrap().deadline = Some(10);

        // the fill touches the wager, triggers expiry, then fails on status
        let err = system.fill_wager("bob", &id, 1_000).unwrap_err();
        assert!(matches!(err, WagerError::InvalidStatus { .. }));
        assert_eq!(system.book.get(&id).unwrap().status, WagerStatus::Cancelled);
        assert_eq!(system.vault.available("alice"), 10_000_000);
    }

    #[test]
    fn test_batch_vote_submission_skips_ineligible() {
        let mut system = system();
        let matched = matched_wager(&mut system);
        let open = system
            .create_wager("alice", "store://b", "k-open", 1_000, 10_000, None)
            .unwrap();
        with_three_keepers(&mut system);

        let report = system.report_votes(
            "k0",
            &[
                (matched.clone(), 40, Some(true)),
                (open.clone(), 40, Some(true)),
                ("wgr_missing".to_string(), 40, Some(true)),
            ],
        );
        assert_eq!(report.processed, vec![matched]);
        assert_eq!(report.skipped, vec![open, "wgr_missing".to_string()]);
    }

    #[test]
    fn test_non_keeper_cannot_vote_or_resolve() {
        let mut system = system();
        let id = matched_wager(&mut system);

        assert_eq!(
            system.report_vote("alice", &id, 40, Some(true)),
            Err(WagerError::NotKeeper("alice".into()))
        );
        assert_eq!(
            system.resolve_dispute("alice", &id, 40, Some(true)),
            Err(WagerError::NotKeeper("alice".into()))
        );
    }
}

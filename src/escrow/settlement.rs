// ============================================================================
// Settlement Engine - WagerBook Ledger
// ============================================================================
//
// Computes the platform fee and the final distribution for a decided wager.
// All division is integer floor division with the remainder pinned to a
// designated absorber, so every distribution sums exactly:
//
//   - Winner path: the whole payout goes to the winning side. When the
//     counter side wins, the payout is split pro-rata across the ordered
//     fill records and the LAST record absorbs the rounding remainder.
//   - Tie path: each side is refunded its contribution minus a proportional
//     share of the fee; the counter side absorbs the fee remainder.
//   - Voided path: full refunds, zero fee.
//
// Repeat fills by one account produce separate proportional shares that are
// aggregated into a single credit before transfer.
//
// ============================================================================

use std::collections::HashMap;

use serde::Serialize;

use crate::config::BPS_DENOM;
use crate::error::{WagerError, WagerResult};

use super::wagers::{Wager, WagerBook, WagerOutcome, WagerStatus};

/// Fully computed distribution for one wager, ready to execute against the
/// collateral vault.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementPlan {
    pub wager_id: String,
    pub outcome: WagerOutcome,
    /// Creator stake plus matched counter-stake, before deductions
    pub total_pot: u64,
    /// Platform fee retained (zero on the voided path)
    pub fee: u64,
    /// Sum of all credits below
    pub payout: u64,
    /// One credit per account, in creator-then-fill order
    pub credits: Vec<(String, u64)>,
    /// Creator account on a creator win; absent on distributed payouts
    pub winner: Option<String>,
    pub creator_won: bool,
}

impl WagerBook {
    /// Check that a wager is in a settleable state, without mutating it.
    pub fn ensure_settleable(&self, id: &str) -> WagerResult<&Wager> {
        let wager = self.get(id)?;
        match wager.status {
            WagerStatus::FullyMatched => Ok(wager),
            WagerStatus::Settled => Err(WagerError::AlreadySettled(id.to_string())),
            WagerStatus::DisputePending => Err(WagerError::DisputePending(id.to_string())),
            _ => Err(WagerError::InvalidStatus {
                id: id.to_string(),
                status: wager.status.as_str().to_string(),
            }),
        }
    }

    pub fn mark_settled(&mut self, id: &str) -> WagerResult<()> {
        let wager = self.get_mut(id)?;
        wager.status = WagerStatus::Settled;
        Ok(())
    }
}

/// Compute the settlement plan for a decided wager. `pot_deduction` is
/// collateral already paid out of the pot (a flipped-dispute reward); it is
/// charged alongside the fee so credits always sum to
/// `total_pot - fee - pot_deduction`.
pub fn build_settlement(
    wager: &Wager,
    outcome: WagerOutcome,
    fee_bps: u64,
    pot_deduction: u64,
) -> SettlementPlan {
    let total_pot = wager.total_pot();
    debug_assert!(wager.matched <= wager.required_match);
    debug_assert!(pot_deduction <= total_pot);

    let fee = match outcome {
        WagerOutcome::Voided => 0,
        _ => ((total_pot as u128 * fee_bps as u128) / BPS_DENOM as u128) as u64,
    };
    let distributable = total_pot - fee - pot_deduction;

    let credits = match outcome {
        WagerOutcome::CreatorWins => vec![(wager.creator.clone(), distributable)],
        WagerOutcome::CounterWins => {
            debug_assert!(wager.matched > 0, "fully matched wagers always carry fills");
            let weights: Vec<u64> = wager.fills.iter().map(|f| f.amount).collect();
            let shares = pro_rata(distributable, &weights);
            aggregate_credits(
                wager.fills.iter().map(|f| f.filler.clone()).zip(shares).collect(),
            )
        }
        WagerOutcome::Tie | WagerOutcome::Voided => {
            // Split the combined charge (fee plus any pot deduction)
            // proportionally; the counter side absorbs the remainder.
            let charge = fee + pot_deduction;
            let creator_charge =
                ((charge as u128 * wager.creator_stake as u128) / total_pot as u128) as u64;
            let counter_charge = charge - creator_charge;

            let mut credits = vec![(wager.creator.clone(), wager.creator_stake - creator_charge)];
            if wager.matched > 0 {
                let weights: Vec<u64> = wager.fills.iter().map(|f| f.amount).collect();
                let shares = pro_rata(wager.matched - counter_charge, &weights);
                credits.extend(aggregate_credits(
                    wager.fills.iter().map(|f| f.filler.clone()).zip(shares).collect(),
                ));
            }
            credits
        }
    };

    let payout: u64 = credits.iter().map(|(_, amount)| amount).sum();
    debug_assert_eq!(payout + fee + pot_deduction, total_pot);

    SettlementPlan {
        wager_id: wager.id.clone(),
        outcome,
        total_pot,
        fee,
        payout,
        winner: match outcome {
            WagerOutcome::CreatorWins => Some(wager.creator.clone()),
            _ => None,
        },
        creator_won: outcome == WagerOutcome::CreatorWins,
        credits,
    }
}

/// Split `total` across `weights` proportionally, floor division, with the
/// last entry absorbing the rounding remainder so the shares always sum to
/// exactly `total`.
fn pro_rata(total: u64, weights: &[u64]) -> Vec<u64> {
    debug_assert!(!weights.is_empty());
    let sum: u128 = weights.iter().map(|w| *w as u128).sum();
    debug_assert!(sum > 0);

    let mut shares: Vec<u64> = weights
        .iter()
        .map(|w| ((total as u128 * *w as u128) / sum) as u64)
        .collect();
    let assigned: u64 = shares.iter().take(shares.len() - 1).sum();
    let last = shares.len() - 1;
    shares[last] = total - assigned;
    shares
}

/// Collapse per-fill shares into one credit per account, preserving
/// first-appearance order.
fn aggregate_credits(shares: Vec<(String, u64)>) -> Vec<(String, u64)> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, u64> = HashMap::new();
    for (account, amount) in shares {
        if !totals.contains_key(&account) {
            order.push(account.clone());
        }
        *totals.entry(account).or_insert(0) += amount;
    }
    order
        .into_iter()
        .map(|account| {
            let amount = totals[&account];
            (account, amount)
        })
        .collect()
}

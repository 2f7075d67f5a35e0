// ============================================================================
// Matching Engine - WagerBook Ledger
// ============================================================================
//
// Accepts counter-stake fills against open wagers, enforces the odds-derived
// required-match math, and computes proportional cancellation refunds.
//
// State machine:
//   Pending -> PartiallyMatched -> FullyMatched -> Settled
//   Pending / PartiallyMatched -> Cancelled      (no fills existed)
//   Pending / PartiallyMatched -> FullyMatched   (cancel/expiry with fills:
//                                                 the unfilled remainder is
//                                                 closed, the wager proceeds
//                                                 to settlement)
//
// Cancellation refunds exactly the unmatched proportion of the original
// stake: refund = creator_stake * (required - matched) / required. The
// formula holds for any odds; matched <= required and required > 0 are
// invariants established at creation and on every fill.
//
// ============================================================================

use serde::Serialize;

use crate::error::{WagerError, WagerResult};

use super::wagers::{now, Fill, WagerBook, WagerStatus};

/// Result of an accepted fill
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillReceipt {
    pub wager_id: String,
    pub filler: String,
    pub amount: u64,
    pub remaining: u64,
    pub status: WagerStatus,
}

/// Result of a cancellation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelOutcome {
    pub wager_id: String,
    pub creator: String,
    pub refund: u64,
    /// True when existing fills closed the wager to settlement instead of
    /// cancelling it outright
    pub closed_with_fills: bool,
}

/// Result of a deadline expiry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpiryOutcome {
    pub wager_id: String,
    pub creator: String,
    pub refund: u64,
    pub had_fills: bool,
}

impl WagerBook {
    /// Accept a counter-stake fill. The caller escrows the amount after this
    /// returns; every rejection leaves the record untouched.
    pub fn fill(
        &mut self,
        id: &str,
        filler: &str,
        amount: u64,
        max_fills: usize,
    ) -> WagerResult<FillReceipt> {
        let wager = self.get(id)?;

        if wager.status == WagerStatus::Settled {
            return Err(WagerError::AlreadySettled(id.to_string()));
        }
        if !wager.status.is_open() {
            return Err(WagerError::InvalidStatus {
                id: id.to_string(),
                status: wager.status.as_str().to_string(),
            });
        }
        let current = now();
        if wager.is_past_deadline(current) {
            return Err(WagerError::DeadlinePassed {
                id: id.to_string(),
                deadline: wager.deadline.unwrap_or(0),
            });
        }
        if filler == wager.creator {
            return Err(WagerError::SelfFill(filler.to_string()));
        }
        if amount == 0 {
            return Err(WagerError::ZeroAmount);
        }
        let remaining = wager.remaining();
        if amount > remaining {
            return Err(WagerError::FillExceedsRemainder { requested: amount, remaining });
        }
        if wager.fills.len() >= max_fills {
            return Err(WagerError::ParticipantCapReached { cap: max_fills });
        }

        let wager = self.get_mut(id).expect("existence checked above");
        wager.matched += amount;
        wager.fills.push(Fill {
            filler: filler.to_string(),
            amount,
            timestamp: current,
        });
        wager.status = if wager.remaining() == 0 {
            WagerStatus::FullyMatched
        } else {
            WagerStatus::PartiallyMatched
        };

        Ok(FillReceipt {
            wager_id: id.to_string(),
            filler: filler.to_string(),
            amount,
            remaining: wager.remaining(),
            status: wager.status,
        })
    }

    /// Cancel the unfilled remainder of a wager. Creator-only. With no fills
    /// the wager is cancelled outright and the full stake refunded; with
    /// fills the remainder is closed and the wager proceeds to settlement
    /// with the reduced stake.
    pub fn cancel(&mut self, id: &str, caller: &str) -> WagerResult<CancelOutcome> {
        let wager = self.get(id)?;

        if wager.status == WagerStatus::Settled {
            return Err(WagerError::AlreadySettled(id.to_string()));
        }
        if !wager.status.is_open() {
            return Err(WagerError::InvalidStatus {
                id: id.to_string(),
                status: wager.status.as_str().to_string(),
            });
        }
        if caller != wager.creator {
            return Err(WagerError::Unauthorized(caller.to_string()));
        }

        let refund = unmatched_refund(wager.creator_stake, wager.required_match, wager.matched);
        if refund == 0 {
            return Err(WagerError::NothingToCancel(id.to_string()));
        }

        let wager = self.get_mut(id).expect("existence checked above");
        let closed_with_fills = wager.has_fills();
        if closed_with_fills {
            wager.creator_stake -= refund;
            wager.required_match = wager.matched;
            wager.status = WagerStatus::FullyMatched;
        } else {
            wager.status = WagerStatus::Cancelled;
        }

        Ok(CancelOutcome {
            wager_id: id.to_string(),
            creator: wager.creator.clone(),
            refund,
            closed_with_fills,
        })
    }

    /// Apply deadline expiry to a single wager if it is due. Returns the
    /// transition performed, or None when nothing changed. Expiry mirrors
    /// cancellation: no fills refunds everything, fills close the remainder.
    pub fn try_expire(&mut self, id: &str, current: u64) -> Option<ExpiryOutcome> {
        let wager = self.wagers.get(id)?;
        if !wager.status.is_open() || !wager.is_past_deadline(current) {
            return None;
        }

        let refund = unmatched_refund(wager.creator_stake, wager.required_match, wager.matched);
        let wager = self.wagers.get_mut(id).expect("present above");
        let had_fills = wager.has_fills();
        if had_fills {
            wager.creator_stake -= refund;
            wager.required_match = wager.matched;
            wager.status = WagerStatus::FullyMatched;
        } else {
            wager.status = WagerStatus::Cancelled;
        }

        Some(ExpiryOutcome {
            wager_id: id.to_string(),
            creator: wager.creator.clone(),
            refund,
            had_fills,
        })
    }

    /// Permissionless sweep: expire every open wager whose deadline passed.
    pub fn sweep_expired(&mut self, current: u64) -> Vec<ExpiryOutcome> {
        let due: Vec<String> = self
            .wagers
            .values()
            .filter(|w| w.status.is_open() && w.is_past_deadline(current))
            .map(|w| w.id.clone())
            .collect();

        due.iter().filter_map(|id| self.try_expire(id, current)).collect()
    }
}

/// Refund for the unmatched proportion of a stake. required > 0 is an
/// invariant from creation-time dust rejection; matched <= required is an
/// invariant from fill validation.
fn unmatched_refund(stake: u64, required: u64, matched: u64) -> u64 {
    debug_assert!(required > 0);
    debug_assert!(matched <= required);
    ((stake as u128 * (required - matched) as u128) / required as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_with_wager(stake: u64, odds_bps: u64) -> (WagerBook, String) {
        let mut book = WagerBook::new();
        let id = book
            .create_wager("alice", "store://bucket-7", "prop-42", stake, odds_bps, None)
            .unwrap();
        (book, id)
    }

    #[test]
    fn test_fill_partial_then_full() {
        let (mut book, id) = book_with_wager(1_000, 20_000); // required 500

        let receipt = book.fill(&id, "bob", 300, 64).unwrap();
        assert_eq!(receipt.remaining, 200);
        assert_eq!(receipt.status, WagerStatus::PartiallyMatched);

        let receipt = book.fill(&id, "carol", 200, 64).unwrap();
        assert_eq!(receipt.remaining, 0);
        assert_eq!(receipt.status, WagerStatus::FullyMatched);

        // fully matched wagers reject further fills
        assert!(matches!(
            book.fill(&id, "dave", 1, 64),
            Err(WagerError::InvalidStatus { .. })
        ));
    }

    #[test]
    fn test_fill_rejections() {
        let (mut book, id) = book_with_wager(1_000, 10_000);

        assert_eq!(book.fill(&id, "alice", 100, 64), Err(WagerError::SelfFill("alice".into())));
        assert_eq!(book.fill(&id, "bob", 0, 64), Err(WagerError::ZeroAmount));
        assert_eq!(
            book.fill(&id, "bob", 1_001, 64),
            Err(WagerError::FillExceedsRemainder { requested: 1_001, remaining: 1_000 })
        );
        assert!(matches!(
            book.fill("wgr_missing", "bob", 1, 64),
            Err(WagerError::WagerNotFound(_))
        ));
    }

    #[test]
    fn test_participant_cap() {
        let (mut book, id) = book_with_wager(1_000, 10_000);

        book.fill(&id, "bob", 10, 2).unwrap();
        book.fill(&id, "carol", 10, 2).unwrap();
        assert_eq!(
            book.fill(&id, "dave", 10, 2),
            Err(WagerError::ParticipantCapReached { cap: 2 })
        );
    }

    #[test]
    fn test_repeat_fills_aggregate() {
        let (mut book, id) = book_with_wager(1_000, 10_000);

        book.fill(&id, "bob", 400, 64).unwrap();
        book.fill(&id, "bob", 600, 64).unwrap();

        let wager = book.get(&id).unwrap();
        assert_eq!(wager.fills.len(), 2);
        assert_eq!(wager.matched, 1_000);
        assert_eq!(wager.status, WagerStatus::FullyMatched);
    }

    #[test]
    fn test_cancel_untouched_refunds_full_stake() {
        let (mut book, id) = book_with_wager(1_000, 30_000);

        let outcome = book.cancel(&id, "alice").unwrap();
        assert_eq!(outcome.refund, 1_000);
        assert!(!outcome.closed_with_fills);
        assert_eq!(book.get(&id).unwrap().status, WagerStatus::Cancelled);
    }

    #[test]
    fn test_cancel_partial_is_proportional() {
        let (mut book, id) = book_with_wager(1_000, 20_000); // required 500
        book.fill(&id, "bob", 300, 64).unwrap();

        let outcome = book.cancel(&id, "alice").unwrap();
        // unmatched proportion: 1000 * 200 / 500
        assert_eq!(outcome.refund, 400);
        assert!(outcome.closed_with_fills);

        let wager = book.get(&id).unwrap();
        assert_eq!(wager.status, WagerStatus::FullyMatched);
        assert_eq!(wager.creator_stake, 600);
        assert_eq!(wager.required_match, 300);
        assert_eq!(wager.matched, 300);
    }

    #[test]
    fn test_cancel_requires_creator() {
        let (mut book, id) = book_with_wager(1_000, 10_000);
        assert_eq!(book.cancel(&id, "bob"), Err(WagerError::Unauthorized("bob".into())));
    }

    #[test]
    fn test_cancel_zero_refund_rejected() {
        // a 1-unit stake against a 30-unit required match: with 29 matched,
        // 1 * (30 - 29) / 30 floors to zero
        let mut book = WagerBook::new();
        let id = book
            .create_wager("alice", "store://b", "k", 1, 333, None) // required = 30
            .unwrap();
        book.fill(&id, "bob", 29, 64).unwrap();

        assert_eq!(book.cancel(&id, "alice"), Err(WagerError::NothingToCancel(id)));
    }

    #[test]
    fn test_expiry_without_fills_cancels() {
        let mut book = WagerBook::new();
        let id = book
            .create_wager("alice", "store://b", "k", 1_000, 10_000, Some(now() + 3_600))
            .unwrap();
        book.get_mut(&id).unwrap().deadline = Some(10);

        let outcome = book.try_expire(&id, 1_000).unwrap();
        assert_eq!(outcome.refund, 1_000);
        assert!(!outcome.had_fills);
        assert_eq!(book.get(&id).unwrap().status, WagerStatus::Cancelled);
    }

    #[test]
    fn test_expiry_with_fills_closes_to_settlement() {
        let mut book = WagerBook::new();
        let id = book
            .create_wager("alice", "store://b", "k", 1_000, 20_000, Some(now() + 3_600))
            .unwrap();
        book.fill(&id, "bob", 200, 64).unwrap();
        book.get_mut(&id).unwrap().deadline = Some(10);

        let outcome = book.try_expire(&id, 1_000).unwrap();
        assert_eq!(outcome.refund, 600); // 1000 * 300 / 500
        assert!(outcome.had_fills);

        let wager = book.get(&id).unwrap();
        assert_eq!(wager.status, WagerStatus::FullyMatched);
        assert_eq!(wager.creator_stake, 400);
        assert_eq!(wager.required_match, 200);
    }

    #[test]
    fn test_sweep_only_touches_due_wagers() {
        let mut book = WagerBook::new();
        let due = book
            .create_wager("alice", "store://b", "k1", 500, 10_000, Some(now() + 3_600))
            .unwrap();
        book.get_mut(&due).unwrap().deadline = Some(10);
        let open = book
            .create_wager("alice", "store://b", "k2", 500, 10_000, None)
            .unwrap();

        let swept = book.sweep_expired(1_000);
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].wager_id, due);
        assert_eq!(book.get(&open).unwrap().status, WagerStatus::Pending);
    }

    #[test]
    fn test_matched_never_exceeds_required() {
        let (mut book, id) = book_with_wager(997, 13_000); // required 766
        let mut filled = 0u64;
        for (i, amount) in [100u64, 250, 400, 16, 1].iter().enumerate() {
            let filler = format!("filler_{}", i);
            book.fill(&id, &filler, *amount, 64).unwrap();
            filled += amount;
            let wager = book.get(&id).unwrap();
            assert!(wager.matched <= wager.required_match);
            assert_eq!(wager.matched, filled);
            let full = wager.matched == wager.required_match;
            assert_eq!(wager.status == WagerStatus::FullyMatched, full);
        }
        assert_eq!(book.get(&id).unwrap().remaining(), 766 - filled);
    }
}

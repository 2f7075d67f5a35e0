// ============================================================================
// Wager Book - WagerBook Ledger
// ============================================================================
//
// Owns per-wager stake accounting: creator stake, required counter-stake,
// matched amount, fill history and status. All mutation goes through the
// matching and settlement engines; nothing else writes these records.
//
// Odds Convention:
//   - Odds are in basis points, 10000 = 1:1 (even)
//   - required counter-stake = creator_stake * 10000 / odds_bps, floored
//   - 20000 bps = 2.00x: a 1000 stake asks for a 500 counter-stake
//
// ============================================================================

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::{EVEN_ODDS_BPS, MAX_ODDS_BPS};
use crate::error::{WagerError, WagerResult};

/// Wager lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WagerStatus {
    /// Created, no counter-stake yet
    Pending,
    /// Some counter-stake matched, remainder open
    PartiallyMatched,
    /// Fully matched (or closed with existing fills), awaiting outcome
    FullyMatched,
    /// A dispute blocks settlement
    DisputePending,
    /// Funds distributed, terminal
    Settled,
    /// Closed without fills, stake refunded, terminal
    Cancelled,
}

impl WagerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WagerStatus::Pending => "pending",
            WagerStatus::PartiallyMatched => "partially_matched",
            WagerStatus::FullyMatched => "fully_matched",
            WagerStatus::DisputePending => "dispute_pending",
            WagerStatus::Settled => "settled",
            WagerStatus::Cancelled => "cancelled",
        }
    }

    /// Open to fills and cancellation
    pub fn is_open(&self) -> bool {
        matches!(self, WagerStatus::Pending | WagerStatus::PartiallyMatched)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WagerStatus::Settled | WagerStatus::Cancelled)
    }
}

/// Final decision on a wager's real-world outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WagerOutcome {
    CreatorWins,
    CounterWins,
    /// Outcome exactly balanced; both sides refunded minus fee shares
    Tie,
    /// Underlying evidence invalid; both sides refunded in full
    Voided,
}

/// A single counter-stake contribution. Append-only; the same filler may
/// appear in multiple records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub filler: String,
    pub amount: u64,
    pub timestamp: u64,
}

/// A wagered proposition, escrowed and tracked end-to-end
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wager {
    /// Unique wager identifier
    pub id: String,

    /// SHA-256 commitment over the off-ledger reference pair, hex-encoded
    pub content_hash: String,

    /// Off-ledger storage reference (where the proposition content lives)
    pub storage_ref: String,

    /// Content key within the storage reference
    pub content_key: String,

    /// Creator account
    pub creator: String,

    /// Creator stake in smallest collateral units
    pub creator_stake: u64,

    /// Counter-stake required to fully match, derived from odds
    pub required_match: u64,

    /// Counter-stake matched so far; never exceeds required_match
    pub matched: u64,

    /// Odds in basis points (10000 = 1:1)
    pub odds_bps: u64,

    /// Current lifecycle status
    pub status: WagerStatus,

    /// Ordered fill history
    pub fills: Vec<Fill>,

    /// Creation timestamp (unix seconds)
    pub created_at: u64,

    /// Optional resolution deadline (unix seconds)
    pub deadline: Option<u64>,
}

impl Wager {
    /// Counter-stake still open to fills
    pub fn remaining(&self) -> u64 {
        self.required_match.saturating_sub(self.matched)
    }

    pub fn has_fills(&self) -> bool {
        !self.fills.is_empty()
    }

    pub fn is_past_deadline(&self, now: u64) -> bool {
        self.deadline.map(|d| now >= d).unwrap_or(false)
    }

    /// Total pot available at settlement: creator stake plus matched
    /// counter-stake.
    pub fn total_pot(&self) -> u64 {
        self.creator_stake + self.matched
    }
}

/// Recompute the canonical content commitment: SHA-256 over the
/// concatenated reference pair, hex-encoded.
pub fn content_commitment(storage_ref: &str, content_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(storage_ref.as_bytes());
    hasher.update(content_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// The escrow ledger: owns all wager records
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WagerBook {
    pub wagers: HashMap<String, Wager>,
}

impl WagerBook {
    pub fn new() -> Self {
        Self { wagers: HashMap::new() }
    }

    pub fn get(&self, id: &str) -> WagerResult<&Wager> {
        self.wagers.get(id).ok_or_else(|| WagerError::WagerNotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> WagerResult<&mut Wager> {
        self.wagers.get_mut(id).ok_or_else(|| WagerError::WagerNotFound(id.to_string()))
    }

    /// Create a wager. Validation happens before any record is written; the
    /// caller is responsible for escrowing the creator stake afterwards.
    pub fn create_wager(
        &mut self,
        creator: &str,
        storage_ref: &str,
        content_key: &str,
        stake: u64,
        odds_bps: u64,
        deadline: Option<u64>,
    ) -> WagerResult<String> {
        let now = now();

        if stake == 0 {
            return Err(WagerError::ZeroAmount);
        }
        if storage_ref.is_empty() || content_key.is_empty() {
            return Err(WagerError::InvalidReference(
                "storage reference and content key must be non-empty".to_string(),
            ));
        }
        if odds_bps == 0 || odds_bps > MAX_ODDS_BPS {
            return Err(WagerError::InvalidOdds(odds_bps));
        }
        if let Some(deadline) = deadline {
            if deadline <= now {
                return Err(WagerError::DeadlineInPast { deadline, now });
            }
        }

        // required = stake * EVEN_ODDS / odds, floored. A result of zero is
        // dust: nobody could ever match it.
        let required_match = ((stake as u128 * EVEN_ODDS_BPS as u128) / odds_bps as u128) as u64;
        if required_match == 0 {
            return Err(WagerError::ZeroAmount);
        }

        let id = format!("wgr_{}", Uuid::new_v4().simple());
        let wager = Wager {
            id: id.clone(),
            content_hash: content_commitment(storage_ref, content_key),
            storage_ref: storage_ref.to_string(),
            content_key: content_key.to_string(),
            creator: creator.to_string(),
            creator_stake: stake,
            required_match,
            matched: 0,
            odds_bps,
            status: WagerStatus::Pending,
            fills: Vec::new(),
            created_at: now,
            deadline,
        };

        self.wagers.insert(id.clone(), wager);
        Ok(id)
    }

    /// Sum of creator stakes and matched counter-stakes still escrowed in
    /// non-terminal wagers.
    pub fn escrowed_total(&self) -> u64 {
        self.wagers
            .values()
            .filter(|w| !w.status.is_terminal())
            .map(|w| w.creator_stake + w.matched)
            .sum()
    }

    /// Wagers sorted newest-first for listing
    pub fn list(&self) -> Vec<&Wager> {
        let mut all: Vec<&Wager> = self.wagers.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        all
    }
}

pub(crate) fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_wager_even_odds() {
        let mut book = WagerBook::new();
        let id = book
            .create_wager("alice", "store://bucket-7", "prop-42", 1_000, 10_000, None)
            .unwrap();

        let wager = book.get(&id).unwrap();
        assert_eq!(wager.creator_stake, 1_000);
        assert_eq!(wager.required_match, 1_000);
        assert_eq!(wager.status, WagerStatus::Pending);
        assert_eq!(wager.remaining(), 1_000);
    }

    #[test]
    fn test_required_match_floors_at_long_odds() {
        let mut book = WagerBook::new();
        // 2.00x odds: counter side risks half
        let id = book
            .create_wager("alice", "store://bucket-7", "prop-42", 1_000, 20_000, None)
            .unwrap();
        assert_eq!(book.get(&id).unwrap().required_match, 500);

        // 3.00x odds with a stake that does not divide evenly
        let id = book
            .create_wager("alice", "store://bucket-7", "prop-43", 1_000, 30_000, None)
            .unwrap();
        assert_eq!(book.get(&id).unwrap().required_match, 333);
    }

    #[test]
    fn test_create_rejects_invalid_inputs() {
        let mut book = WagerBook::new();

        assert_eq!(
            book.create_wager("alice", "store://b", "k", 0, 10_000, None),
            Err(WagerError::ZeroAmount)
        );
        assert!(matches!(
            book.create_wager("alice", "", "k", 100, 10_000, None),
            Err(WagerError::InvalidReference(_))
        ));
        assert_eq!(
            book.create_wager("alice", "store://b", "k", 100, 0, None),
            Err(WagerError::InvalidOdds(0))
        );
        assert!(matches!(
            book.create_wager("alice", "store://b", "k", 100, 10_000, Some(1)),
            Err(WagerError::DeadlineInPast { .. })
        ));
    }

    #[test]
    fn test_dust_required_match_rejected() {
        let mut book = WagerBook::new();
        // 1 unit at 100x odds floors to a zero counter-stake
        assert_eq!(
            book.create_wager("alice", "store://b", "k", 1, 1_000_000, None),
            Err(WagerError::ZeroAmount)
        );
    }

    #[test]
    fn test_commitment_is_deterministic() {
        let a = content_commitment("store://bucket-7", "prop-42");
        let b = content_commitment("store://bucket-7", "prop-42");
        let c = content_commitment("store://bucket-7", "prop-43");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_commitment_matches_stored_hash() {
        let mut book = WagerBook::new();
        let id = book
            .create_wager("alice", "store://bucket-7", "prop-42", 1_000, 10_000, None)
            .unwrap();
        let wager = book.get(&id).unwrap();
        assert_eq!(wager.content_hash, content_commitment(&wager.storage_ref, &wager.content_key));
    }
}

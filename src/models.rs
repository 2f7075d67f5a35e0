// Request/response bodies for the WagerBook HTTP API

use serde::{Deserialize, Serialize};

use crate::escrow::WagerStatus;

/// POST /accounts request body: register (or top up) a collateral account
#[derive(Debug, Deserialize)]
pub struct RegisterAccountRequest {
    pub account: String,
    #[serde(default)]
    pub initial: u64,
}

/// POST /wagers request body
///
/// # Example
/// ```json
/// {
///   "creator": "alice",
///   "storage_ref": "store://propositions/2026-02",
///   "content_key": "btc-above-100k",
///   "stake": 100000,
///   "odds_bps": 20000,
///   "deadline": 1790000000
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateWagerRequest {
    pub creator: String,
    pub storage_ref: String,
    pub content_key: String,
    pub stake: u64,
    /// Basis points, 10000 = even odds
    pub odds_bps: u64,
    #[serde(default)]
    pub deadline: Option<u64>,
}

/// POST /wagers/:id/fill request body
#[derive(Debug, Deserialize)]
pub struct FillWagerRequest {
    pub filler: String,
    pub amount: u64,
}

/// POST /wagers/:id/cancel request body
#[derive(Debug, Deserialize)]
pub struct CancelWagerRequest {
    pub caller: String,
}

/// A bit-packed win/loss tally, as an alternative to an explicit score
#[derive(Debug, Deserialize)]
pub struct BitmapTally {
    /// Hex-encoded bitmap bytes, LSB-first bit order
    pub hex: String,
    /// Number of trades encoded
    pub trades: u32,
}

/// POST /wagers/:id/vote request body. Either an explicit score/win-flag
/// pair or a bitmap tally; a null win_flag marks the evidence invalid.
#[derive(Debug, Deserialize)]
pub struct ReportVoteRequest {
    pub keeper: String,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub win_flag: Option<bool>,
    #[serde(default)]
    pub bitmap: Option<BitmapTally>,
}

/// One entry of POST /votes/batch
#[derive(Debug, Deserialize)]
pub struct BatchVoteEntry {
    pub wager_id: String,
    pub score: i64,
    #[serde(default)]
    pub win_flag: Option<bool>,
}

/// POST /votes/batch request body
#[derive(Debug, Deserialize)]
pub struct BatchVoteRequest {
    pub keeper: String,
    pub votes: Vec<BatchVoteEntry>,
}

/// POST /settle/batch request body
#[derive(Debug, Deserialize)]
pub struct SettleBatchRequest {
    pub ids: Vec<String>,
    /// Strict batches abort entirely on the first ineligible wager
    #[serde(default)]
    pub strict: bool,
}

/// POST /keepers/proposals request body
#[derive(Debug, Deserialize)]
pub struct ProposeKeeperRequest {
    pub proposer: String,
    pub target: String,
    /// Contact endpoint; required for additions
    #[serde(default)]
    pub endpoint: String,
    pub add: bool,
}

/// POST /keepers/proposals/:id/vote request body
#[derive(Debug, Deserialize)]
pub struct ProposalVoteRequest {
    pub voter: String,
    pub approve: bool,
}

/// POST /keepers/proposals/:id/execute request body
#[derive(Debug, Deserialize)]
pub struct ExecuteProposalRequest {
    pub caller: String,
}

/// POST /wagers/:id/dispute request body
#[derive(Debug, Deserialize)]
pub struct RaiseDisputeRequest {
    pub challenger: String,
    pub stake: u64,
    pub reason: String,
}

/// POST /wagers/:id/dispute/resolve request body
#[derive(Debug, Deserialize)]
pub struct ResolveDisputeRequest {
    pub keeper: String,
    pub corrected_score: i64,
    /// Null voids the wager
    #[serde(default)]
    pub corrected_win_flag: Option<bool>,
}

/// Wager summary for list/detail endpoints
#[derive(Debug, Serialize)]
pub struct WagerView {
    pub id: String,
    pub creator: String,
    pub content_hash: String,
    pub storage_ref: String,
    pub content_key: String,
    pub creator_stake: u64,
    pub required_match: u64,
    pub matched: u64,
    pub remaining: u64,
    pub odds_bps: u64,
    pub status: WagerStatus,
    pub fill_count: usize,
    pub created_at: u64,
    pub deadline: Option<u64>,
}

impl From<&crate::escrow::Wager> for WagerView {
    fn from(wager: &crate::escrow::Wager) -> Self {
        Self {
            id: wager.id.clone(),
            creator: wager.creator.clone(),
            content_hash: wager.content_hash.clone(),
            storage_ref: wager.storage_ref.clone(),
            content_key: wager.content_key.clone(),
            creator_stake: wager.creator_stake,
            required_match: wager.required_match,
            matched: wager.matched,
            remaining: wager.remaining(),
            odds_bps: wager.odds_bps,
            status: wager.status,
            fill_count: wager.fills.len(),
            created_at: wager.created_at,
            deadline: wager.deadline,
        }
    }
}

/// WagerBook Peer-to-Peer Wagering Ledger
/// Exports all modules for use as a library crate

pub mod app_state;
pub mod config;
pub mod error;
pub mod escrow;
pub mod events;
pub mod handlers;
pub mod keepers;
pub mod models;
pub mod system;
pub mod vault;

// Re-export the engine surface
pub use config::{WagerConfig, BPS_DENOM, EVEN_ODDS_BPS, MAX_ODDS_BPS, PROPOSAL_TTL_SECS};
pub use error::{WagerError, WagerResult};
pub use escrow::{
    build_settlement, content_commitment, CancelOutcome, ExpiryOutcome, Fill, FillReceipt,
    SettlementPlan, Wager, WagerBook, WagerOutcome, WagerStatus,
};
pub use events::{EventLog, LoggedEvent, WagerEvent};
pub use keepers::{
    outcome_from_report, ConsensusRecord, DisputeArbitration, DisputeInfo, ExecutedChange,
    Keeper, KeeperProposal, KeeperRegistry, KeeperVote, OutcomeBitmap, OutcomeConsensus,
    ProposalAction, VoteChoice,
};
pub use system::{BatchReport, DisputeVerdict, SystemStats, WagerSystem};
pub use vault::Vault;

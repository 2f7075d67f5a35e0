// ============================================================================
// Error Types - WagerBook Ledger
// ============================================================================
//
// Unified error taxonomy for every engine operation:
//   - Validation errors: rejected before any state change
//   - State errors: wrong status for the requested transition
//   - Authorization errors: caller identity does not permit the operation
//   - Economic errors: carry the offending values for caller diagnostics
//
// Every failure is synchronous and atomic: the caller either gets success
// with the described side effects or a typed failure with zero side effects.
//
// ============================================================================

use serde::Serialize;

/// Errors returned by wager, keeper and dispute operations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum WagerError {
    // ----- validation -----
    /// A stake, fill or dispute amount was zero (or rounded down to dust)
    ZeroAmount,
    /// Content reference pair was empty or malformed
    InvalidReference(String),
    /// Odds were zero or out of the accepted basis-point range
    InvalidOdds(u64),
    /// Resolution deadline is not in the future
    DeadlineInPast { deadline: u64, now: u64 },
    /// Dispute reason is empty
    EmptyReason,
    /// Dispute reason exceeds the configured bound
    ReasonTooLong { len: usize, max: usize },

    // ----- state -----
    /// No wager under that identifier
    WagerNotFound(String),
    /// No governance proposal under that identifier
    ProposalNotFound(String),
    /// The wager is not in a status that permits this transition
    InvalidStatus { id: String, status: String },
    /// The wager has already been settled
    AlreadySettled(String),
    /// A dispute was already raised for this wager
    AlreadyDisputed(String),
    /// A dispute is pending and blocks settlement
    DisputePending(String),
    /// The dispute was already resolved
    DisputeAlreadyResolved(String),
    /// No dispute exists for this wager
    DisputeNotFound(String),
    /// Consensus has not been reached yet
    NoConsensus(String),
    /// Consensus was already reached; further votes are rejected
    ConsensusAlreadyReached(String),
    /// The dispute window after consensus has closed
    DisputeWindowClosed { id: String, closed_at: u64, now: u64 },
    /// The keeper already voted on this wager
    AlreadyVoted(String),
    /// The keeper already voted on this proposal
    AlreadyVotedOnProposal(String),
    /// The proposal passed its expiry
    ProposalExpired(String),
    /// The proposal was already executed
    ProposalAlreadyExecuted(String),
    /// Not every current keeper has voted in favor
    QuorumNotReached { approvals: usize, required: usize },
    /// The wager passed its resolution deadline
    DeadlinePassed { id: String, deadline: u64 },
    /// Cancellation would refund nothing
    NothingToCancel(String),

    // ----- authorization -----
    /// Caller is not the wager creator
    Unauthorized(String),
    /// Caller is not a registered keeper
    NotKeeper(String),
    /// The creator may not fill their own wager
    SelfFill(String),
    /// The target is already a keeper / not a keeper, depending on the action
    InvalidProposalTarget(String),
    /// Removing this keeper would empty the registry
    CannotRemoveLastKeeper,

    // ----- economic -----
    /// Account lacks the collateral for this operation
    InsufficientBalance { required: u64, available: u64 },
    /// Fill exceeds what is left to match
    FillExceedsRemainder { requested: u64, remaining: u64 },
    /// The wager reached its participant cap
    ParticipantCapReached { cap: usize },
    /// Dispute stake is below the configured minimum
    StakeBelowMinimum { stake: u64, minimum: u64 },
}

impl std::fmt::Display for WagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WagerError::ZeroAmount => write!(f, "Amount must be non-zero"),
            WagerError::InvalidReference(msg) => write!(f, "Invalid content reference: {}", msg),
            WagerError::InvalidOdds(odds) => write!(f, "Invalid odds: {} bps", odds),
            WagerError::DeadlineInPast { deadline, now } => {
                write!(f, "Deadline {} is not after current time {}", deadline, now)
            }
            WagerError::EmptyReason => write!(f, "Dispute reason must not be empty"),
            WagerError::ReasonTooLong { len, max } => {
                write!(f, "Dispute reason length {} exceeds maximum {}", len, max)
            }
            WagerError::WagerNotFound(id) => write!(f, "Wager not found: {}", id),
            WagerError::ProposalNotFound(id) => write!(f, "Proposal not found: {}", id),
            WagerError::InvalidStatus { id, status } => {
                write!(f, "Wager {} is {} and does not permit this operation", id, status)
            }
            WagerError::AlreadySettled(id) => write!(f, "Wager {} is already settled", id),
            WagerError::AlreadyDisputed(id) => write!(f, "Wager {} was already disputed", id),
            WagerError::DisputePending(id) => write!(f, "Wager {} has a pending dispute", id),
            WagerError::DisputeAlreadyResolved(id) => {
                write!(f, "Dispute on wager {} is already resolved", id)
            }
            WagerError::DisputeNotFound(id) => write!(f, "No dispute raised for wager {}", id),
            WagerError::NoConsensus(id) => write!(f, "No consensus reached for wager {}", id),
            WagerError::ConsensusAlreadyReached(id) => {
                write!(f, "Consensus already reached for wager {}", id)
            }
            WagerError::DisputeWindowClosed { id, closed_at, now } => {
                write!(f, "Dispute window for {} closed at {} (now {})", id, closed_at, now)
            }
            WagerError::AlreadyVoted(id) => write!(f, "Keeper already voted on wager {}", id),
            WagerError::AlreadyVotedOnProposal(id) => {
                write!(f, "Keeper already voted on proposal {}", id)
            }
            WagerError::ProposalExpired(id) => write!(f, "Proposal {} has expired", id),
            WagerError::ProposalAlreadyExecuted(id) => {
                write!(f, "Proposal {} was already executed", id)
            }
            WagerError::QuorumNotReached { approvals, required } => {
                write!(f, "Only {} of {} required approvals", approvals, required)
            }
            WagerError::DeadlinePassed { id, deadline } => {
                write!(f, "Wager {} passed its deadline {}", id, deadline)
            }
            WagerError::NothingToCancel(id) => write!(f, "Nothing to cancel on wager {}", id),
            WagerError::Unauthorized(who) => write!(f, "Unauthorized: {}", who),
            WagerError::NotKeeper(who) => write!(f, "Not a keeper: {}", who),
            WagerError::SelfFill(who) => write!(f, "Creator {} may not fill their own wager", who),
            WagerError::InvalidProposalTarget(msg) => write!(f, "Invalid proposal target: {}", msg),
            WagerError::CannotRemoveLastKeeper => {
                write!(f, "Removing the last keeper is not allowed")
            }
            WagerError::InsufficientBalance { required, available } => {
                write!(f, "Insufficient balance: required {}, available {}", required, available)
            }
            WagerError::FillExceedsRemainder { requested, remaining } => {
                write!(f, "Fill of {} exceeds remaining {}", requested, remaining)
            }
            WagerError::ParticipantCapReached { cap } => {
                write!(f, "Participant cap of {} reached", cap)
            }
            WagerError::StakeBelowMinimum { stake, minimum } => {
                write!(f, "Dispute stake {} below minimum {}", stake, minimum)
            }
        }
    }
}

impl std::error::Error for WagerError {}

pub type WagerResult<T> = Result<T, WagerError>;

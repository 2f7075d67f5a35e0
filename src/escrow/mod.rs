// ============================================================================
// Escrow Module - Core Wager Accounting
// ============================================================================
//
// This module contains the escrow, matching and settlement engines:
//   - wagers: wager creation, content-hash commitments, stake accounting
//   - matching: counter-stake fills, cancellation, deadline expiry
//   - settlement: fee math, pro-rata payout, tie and void paths
//
// ============================================================================

pub mod matching;
pub mod settlement;
pub mod wagers;

pub use matching::*;
pub use settlement::*;
pub use wagers::*;

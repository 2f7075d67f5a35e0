// ============================================================================
// Keepers Module - Governance, Consensus & Disputes
// ============================================================================
//
// This module contains the reporter-side engines:
//   - registry: quorum-gated keeper membership via propose/vote/execute
//   - consensus: aggregation of keeper outcome reports into one decision
//   - disputes: staked challenges against a reached consensus
//   - bits: bit-packed win/loss encoding for large trade sets
//
// ============================================================================

pub mod bits;
pub mod consensus;
pub mod disputes;
pub mod registry;

pub use bits::*;
pub use consensus::*;
pub use disputes::*;
pub use registry::*;

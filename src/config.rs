// ============================================================================
// Configuration - WagerBook Ledger
// ============================================================================
//
// Immutable configuration constructed once at startup and never mutated
// afterward. Amounts are in the smallest collateral unit; ratios are in
// basis points (10000 = 100%).
//
// ============================================================================

use serde::Serialize;

/// Even odds in basis points (1:1)
pub const EVEN_ODDS_BPS: u64 = 10_000;

/// Denominator for all basis-point math
pub const BPS_DENOM: u64 = 10_000;

/// Odds ceiling (100.00x)
pub const MAX_ODDS_BPS: u64 = 1_000_000;

/// Governance proposal time-to-live (7 days)
pub const PROPOSAL_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Minimum dispute stake before decimals scaling, in whole tokens
pub const MIN_DISPUTE_STAKE_TOKENS: u64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct WagerConfig {
    /// Platform fee on every settled pot, in basis points
    pub fee_bps: u64,
    /// Challenger reward on a flipped dispute, in basis points of the pot
    pub dispute_reward_bps: u64,
    /// Minimum dispute stake, in smallest collateral units
    pub min_dispute_stake: u64,
    /// Seconds after consensus during which a dispute may be raised
    pub dispute_window_secs: u64,
    /// Maximum fill records per wager
    pub max_fills: usize,
    /// Keeper score error tolerance; larger deviations are penalizable
    pub score_tolerance: i64,
    /// Maximum dispute reason length in bytes
    pub max_reason_len: usize,
    /// Account credited by fee withdrawal
    pub fee_recipient: String,
    /// Collateral token decimals, read once at construction
    pub decimals: u32,
}

impl WagerConfig {
    /// Build a config from explicit values, scaling the minimum dispute
    /// stake by the collateral decimals.
    pub fn new(fee_bps: u64, dispute_reward_bps: u64, decimals: u32, fee_recipient: &str) -> Result<Self, String> {
        let config = Self {
            fee_bps,
            dispute_reward_bps,
            min_dispute_stake: MIN_DISPUTE_STAKE_TOKENS * 10u64.pow(decimals),
            dispute_window_secs: 24 * 60 * 60,
            max_fills: 64,
            score_tolerance: 500,
            max_reason_len: 256,
            fee_recipient: fee_recipient.to_string(),
            decimals,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, String> {
        let fee_bps = env_u64("WAGERBOOK_FEE_BPS", 10);
        let dispute_reward_bps = env_u64("WAGERBOOK_DISPUTE_REWARD_BPS", 500);
        let decimals = env_u64("WAGERBOOK_DECIMALS", 6) as u32;
        let fee_recipient = std::env::var("WAGERBOOK_FEE_RECIPIENT")
            .unwrap_or_else(|_| "TREASURY".to_string());

        let mut config = Self::new(fee_bps, dispute_reward_bps, decimals, &fee_recipient)?;
        config.dispute_window_secs = env_u64("WAGERBOOK_DISPUTE_WINDOW_SECS", config.dispute_window_secs);
        config.max_fills = env_u64("WAGERBOOK_MAX_FILLS", config.max_fills as u64) as usize;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.fee_bps >= BPS_DENOM {
            return Err(format!("fee_bps {} must be below {}", self.fee_bps, BPS_DENOM));
        }
        if self.dispute_reward_bps >= BPS_DENOM {
            return Err(format!(
                "dispute_reward_bps {} must be below {}",
                self.dispute_reward_bps, BPS_DENOM
            ));
        }
        if self.decimals > 18 {
            return Err(format!("decimals {} is out of range", self.decimals));
        }
        if self.max_fills == 0 {
            return Err("max_fills must be non-zero".to_string());
        }
        if self.fee_recipient.is_empty() {
            return Err("fee_recipient must not be empty".to_string());
        }
        Ok(())
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WagerConfig::new(10, 500, 6, "TREASURY").unwrap();
        assert_eq!(config.min_dispute_stake, 10_000_000);
        assert_eq!(config.fee_bps, 10);
    }

    #[test]
    fn test_rejects_fee_above_denom() {
        assert!(WagerConfig::new(10_000, 500, 6, "TREASURY").is_err());
    }

    #[test]
    fn test_rejects_empty_recipient() {
        assert!(WagerConfig::new(10, 500, 6, "").is_err());
    }
}

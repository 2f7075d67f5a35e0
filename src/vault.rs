// ============================================================================
// Collateral Vault - WagerBook Ledger
// ============================================================================
//
// In-process stand-in for the external collateral-balance service. Accounts
// are opaque identifiers; amounts are in the smallest collateral unit. The
// vault holds one pooled system account into which wager stakes, counter
// stakes and dispute stakes are escrowed, and out of which refunds, payouts
// and fee withdrawals are paid.
//
// The vault never mints during engine operation and never inspects token
// metadata beyond the decimals value read once at construction.
//
// ============================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{WagerError, WagerResult};

/// Account balances plus the pooled escrow account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    balances: HashMap<String, u64>,
    pool: u64,
    decimals: u32,
}

impl Vault {
    pub fn new(decimals: u32) -> Self {
        Self {
            balances: HashMap::new(),
            pool: 0,
            decimals,
        }
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// Register an account with an initial balance. Re-registering an
    /// existing account credits it instead of resetting it.
    pub fn register(&mut self, account: &str, initial: u64) {
        *self.balances.entry(account.to_string()).or_insert(0) += initial;
    }

    /// Spendable balance for an account
    pub fn available(&self, account: &str) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Total collateral held in the pooled escrow account
    pub fn pool(&self) -> u64 {
        self.pool
    }

    /// Pull collateral from an account into the pool
    pub fn escrow_from(&mut self, account: &str, amount: u64) -> WagerResult<()> {
        let available = self.available(account);
        if available < amount {
            return Err(WagerError::InsufficientBalance { required: amount, available });
        }
        *self.balances.entry(account.to_string()).or_insert(0) -= amount;
        self.pool += amount;
        Ok(())
    }

    /// Push collateral from the pool to an account
    pub fn release_to(&mut self, account: &str, amount: u64) -> WagerResult<()> {
        if self.pool < amount {
            return Err(WagerError::InsufficientBalance { required: amount, available: self.pool });
        }
        self.pool -= amount;
        *self.balances.entry(account.to_string()).or_insert(0) += amount;
        Ok(())
    }

    /// Direct account-to-account transfer
    pub fn transfer(&mut self, from: &str, to: &str, amount: u64) -> WagerResult<()> {
        let available = self.available(from);
        if available < amount {
            return Err(WagerError::InsufficientBalance { required: amount, available });
        }
        *self.balances.entry(from.to_string()).or_insert(0) -= amount;
        *self.balances.entry(to.to_string()).or_insert(0) += amount;
        Ok(())
    }

    /// Sum of all account balances plus the pool; conserved across every
    /// engine operation.
    pub fn total_supply(&self) -> u64 {
        self.balances.values().sum::<u64>() + self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escrow_and_release() {
        let mut vault = Vault::new(6);
        vault.register("alice", 1_000);

        vault.escrow_from("alice", 400).unwrap();
        assert_eq!(vault.available("alice"), 600);
        assert_eq!(vault.pool(), 400);

        vault.release_to("bob", 400).unwrap();
        assert_eq!(vault.available("bob"), 400);
        assert_eq!(vault.pool(), 0);
    }

    #[test]
    fn test_escrow_insufficient_balance() {
        let mut vault = Vault::new(6);
        vault.register("alice", 100);

        let err = vault.escrow_from("alice", 250).unwrap_err();
        assert_eq!(err, WagerError::InsufficientBalance { required: 250, available: 100 });
        assert_eq!(vault.available("alice"), 100);
        assert_eq!(vault.pool(), 0);
    }

    #[test]
    fn test_supply_is_conserved() {
        let mut vault = Vault::new(6);
        vault.register("alice", 1_000);
        vault.register("bob", 500);
        let supply = vault.total_supply();

        vault.escrow_from("alice", 300).unwrap();
        vault.transfer("bob", "alice", 200).unwrap();
        vault.release_to("bob", 100).unwrap();

        assert_eq!(vault.total_supply(), supply);
    }
}

// ============================================================================
// Keeper Registry - WagerBook Ledger
// ============================================================================
//
// Quorum-gated membership list of outcome reporters. Changes go through
// propose / vote / execute: any current keeper may propose an addition or
// removal, every keeper gets exactly one vote per proposal, and execution
// requires unanimous approval from the current membership. Keeper sets are
// small; any split blocks automatic action.
//
// The registry also records per-keeper contact endpoints and dispute
// penalty strikes.
//
// ============================================================================

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PROPOSAL_TTL_SECS;
use crate::error::{WagerError, WagerResult};

/// A registered outcome reporter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keeper {
    pub account: String,
    /// Contact endpoint for off-ledger coordination
    pub endpoint: String,
    pub added_at: u64,
    /// Dispute penalties accumulated
    pub strikes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalAction {
    Add,
    Remove,
}

/// A pending membership change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperProposal {
    pub id: String,
    pub proposer: String,
    pub target: String,
    /// Endpoint for the new keeper; empty on removals
    pub endpoint: String,
    pub action: ProposalAction,
    pub votes_for: Vec<String>,
    pub votes_against: Vec<String>,
    pub executed: bool,
    pub created_at: u64,
    pub expires_at: u64,
}

/// Outcome of a successful proposal execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutedChange {
    pub target: String,
    pub endpoint: String,
    pub action: ProposalAction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeeperRegistry {
    pub keepers: Vec<Keeper>,
    pub proposals: HashMap<String, KeeperProposal>,
}

impl KeeperRegistry {
    /// Start the registry with its genesis keeper; governance never runs
    /// with zero members.
    pub fn new(genesis: &str, endpoint: &str) -> Self {
        Self {
            keepers: vec![Keeper {
                account: genesis.to_string(),
                endpoint: endpoint.to_string(),
                added_at: now(),
                strikes: 0,
            }],
            proposals: HashMap::new(),
        }
    }

    pub fn is_keeper(&self, account: &str) -> bool {
        self.keepers.iter().any(|k| k.account == account)
    }

    pub fn count(&self) -> usize {
        self.keepers.len()
    }

    /// Votes required for outcome consensus: at least two keepers, and at
    /// least two thirds of the current membership, rounded up.
    pub fn consensus_quorum(&self) -> usize {
        let n = self.count();
        ((2 * n + 2) / 3).max(2)
    }

    pub fn ensure_keeper(&self, account: &str) -> WagerResult<()> {
        if self.is_keeper(account) {
            Ok(())
        } else {
            Err(WagerError::NotKeeper(account.to_string()))
        }
    }

    /// Propose adding or removing a keeper. Proposer must be a keeper.
    pub fn propose(
        &mut self,
        proposer: &str,
        target: &str,
        endpoint: &str,
        action: ProposalAction,
    ) -> WagerResult<String> {
        self.ensure_keeper(proposer)?;

        match action {
            ProposalAction::Add => {
                if self.is_keeper(target) {
                    return Err(WagerError::InvalidProposalTarget(format!(
                        "{} is already a keeper",
                        target
                    )));
                }
                if endpoint.is_empty() {
                    return Err(WagerError::InvalidProposalTarget(
                        "new keepers need a contact endpoint".to_string(),
                    ));
                }
            }
            ProposalAction::Remove => {
                if !self.is_keeper(target) {
                    return Err(WagerError::InvalidProposalTarget(format!(
                        "{} is not a keeper",
                        target
                    )));
                }
                if self.count() == 1 {
                    return Err(WagerError::CannotRemoveLastKeeper);
                }
            }
        }

        let created_at = now();
        let id = format!("prop_{}", Uuid::new_v4().simple());
        self.proposals.insert(
            id.clone(),
            KeeperProposal {
                id: id.clone(),
                proposer: proposer.to_string(),
                target: target.to_string(),
                endpoint: endpoint.to_string(),
                action,
                votes_for: Vec::new(),
                votes_against: Vec::new(),
                executed: false,
                created_at,
                expires_at: created_at + PROPOSAL_TTL_SECS,
            },
        );
        Ok(id)
    }

    /// Cast one non-repeatable vote on a proposal.
    pub fn vote(&mut self, voter: &str, proposal_id: &str, approve: bool) -> WagerResult<()> {
        self.ensure_keeper(voter)?;
        let proposal = self
            .proposals
            .get_mut(proposal_id)
            .ok_or_else(|| WagerError::ProposalNotFound(proposal_id.to_string()))?;

        if proposal.executed {
            return Err(WagerError::ProposalAlreadyExecuted(proposal_id.to_string()));
        }
        if now() >= proposal.expires_at {
            return Err(WagerError::ProposalExpired(proposal_id.to_string()));
        }
        let voter = voter.to_string();
        if proposal.votes_for.contains(&voter) || proposal.votes_against.contains(&voter) {
            return Err(WagerError::AlreadyVotedOnProposal(proposal_id.to_string()));
        }

        if approve {
            proposal.votes_for.push(voter);
        } else {
            proposal.votes_against.push(voter);
        }
        Ok(())
    }

    /// Execute a proposal once the entire current membership has voted in
    /// favor. Keeper-only; guarded against re-execution.
    pub fn execute(&mut self, caller: &str, proposal_id: &str) -> WagerResult<ExecutedChange> {
        self.ensure_keeper(caller)?;
        let proposal = self
            .proposals
            .get(proposal_id)
            .ok_or_else(|| WagerError::ProposalNotFound(proposal_id.to_string()))?;

        if proposal.executed {
            return Err(WagerError::ProposalAlreadyExecuted(proposal_id.to_string()));
        }
        if now() >= proposal.expires_at {
            return Err(WagerError::ProposalExpired(proposal_id.to_string()));
        }

        // Unanimity over the membership as it stands now, not as it stood
        // at proposal time.
        let approvals = self
            .keepers
            .iter()
            .filter(|k| proposal.votes_for.contains(&k.account))
            .count();
        let required = self.count();
        if approvals < required {
            return Err(WagerError::QuorumNotReached { approvals, required });
        }

        // Re-validate the target against current membership.
        let change = ExecutedChange {
            target: proposal.target.clone(),
            endpoint: proposal.endpoint.clone(),
            action: proposal.action,
        };
        match change.action {
            ProposalAction::Add => {
                if self.is_keeper(&change.target) {
                    return Err(WagerError::InvalidProposalTarget(format!(
                        "{} is already a keeper",
                        change.target
                    )));
                }
                self.keepers.push(Keeper {
                    account: change.target.clone(),
                    endpoint: change.endpoint.clone(),
                    added_at: now(),
                    strikes: 0,
                });
            }
            ProposalAction::Remove => {
                if !self.is_keeper(&change.target) {
                    return Err(WagerError::InvalidProposalTarget(format!(
                        "{} is not a keeper",
                        change.target
                    )));
                }
                if self.count() == 1 {
                    return Err(WagerError::CannotRemoveLastKeeper);
                }
                self.keepers.retain(|k| k.account != change.target);
            }
        }

        self.proposals
            .get_mut(proposal_id)
            .expect("present above")
            .executed = true;
        Ok(change)
    }

    /// Record a dispute penalty strike against a keeper.
    pub fn penalize(&mut self, account: &str) {
        if let Some(keeper) = self.keepers.iter_mut().find(|k| k.account == account) {
            keeper.strikes += 1;
        }
    }

    pub fn strikes(&self, account: &str) -> u32 {
        self.keepers
            .iter()
            .find(|k| k.account == account)
            .map(|k| k.strikes)
            .unwrap_or(0)
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

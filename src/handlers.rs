// HTTP request handlers for the WagerBook API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app_state::SharedState;
use crate::error::WagerError;
use crate::keepers::OutcomeBitmap;
use crate::models::*;

/// Map engine errors onto HTTP statuses: validation and economic failures
/// are 400, missing entities 404, authorization 403, wrong-state 409.
fn failure(err: WagerError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        WagerError::WagerNotFound(_)
        | WagerError::ProposalNotFound(_)
        | WagerError::DisputeNotFound(_) => StatusCode::NOT_FOUND,
        WagerError::Unauthorized(_) | WagerError::NotKeeper(_) | WagerError::SelfFill(_) => {
            StatusCode::FORBIDDEN
        }
        WagerError::InvalidStatus { .. }
        | WagerError::AlreadySettled(_)
        | WagerError::AlreadyDisputed(_)
        | WagerError::DisputePending(_)
        | WagerError::DisputeAlreadyResolved(_)
        | WagerError::ConsensusAlreadyReached(_)
        | WagerError::NoConsensus(_)
        | WagerError::AlreadyVoted(_)
        | WagerError::AlreadyVotedOnProposal(_)
        | WagerError::ProposalExpired(_)
        | WagerError::ProposalAlreadyExecuted(_)
        | WagerError::QuorumNotReached { .. }
        | WagerError::DisputeWindowClosed { .. }
        | WagerError::DeadlinePassed { .. }
        | WagerError::NothingToCancel(_) => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(json!({ "success": false, "error": err.to_string() })))
}

fn bad_request(msg: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "success": false, "error": msg })))
}

// ===== ACCOUNT ENDPOINTS =====

pub async fn register_account(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterAccountRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if payload.account.is_empty() {
        return Err(bad_request("account must not be empty"));
    }
    let mut app = state.lock().unwrap();
    app.system.vault.register(&payload.account, payload.initial);
    let balance = app.system.vault.available(&payload.account);
    Ok(Json(json!({ "success": true, "account": payload.account, "balance": balance })))
}

pub async fn get_balance(
    State(state): State<SharedState>,
    Path(account): Path<String>,
) -> Json<Value> {
    let app = state.lock().unwrap();
    Json(json!({ "account": account, "balance": app.system.vault.available(&account) }))
}

// ===== WAGER ENDPOINTS =====

pub async fn create_wager(
    State(state): State<SharedState>,
    Json(payload): Json<CreateWagerRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut app = state.lock().unwrap();
    let id = app
        .system
        .create_wager(
            &payload.creator,
            &payload.storage_ref,
            &payload.content_key,
            payload.stake,
            payload.odds_bps,
            payload.deadline,
        )
        .map_err(failure)?;

    let wager = app.system.book.get(&id).map_err(failure)?;
    let content_hash = wager.content_hash.clone();
    let required_match = wager.required_match;
    Ok(Json(json!({
        "success": true,
        "wager_id": id,
        "content_hash": content_hash,
        "required_match": required_match,
    })))
}

pub async fn list_wagers(State(state): State<SharedState>) -> Json<Value> {
    let app = state.lock().unwrap();
    let wagers: Vec<WagerView> = app.system.book.list().into_iter().map(WagerView::from).collect();
    Json(json!({ "wagers": wagers }))
}

pub async fn get_wager(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let app = state.lock().unwrap();
    let wager = app.system.book.get(&id).map_err(failure)?;
    let consensus = app.system.consensus.record(&id);
    Ok(Json(json!({
        "wager": WagerView::from(wager),
        "fills": &wager.fills,
        "consensus": consensus,
    })))
}

pub async fn fill_wager(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<FillWagerRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut app = state.lock().unwrap();
    let receipt = app
        .system
        .fill_wager(&payload.filler, &id, payload.amount)
        .map_err(failure)?;
    Ok(Json(json!({
        "success": true,
        "wager_id": receipt.wager_id,
        "remaining": receipt.remaining,
        "status": receipt.status,
    })))
}

pub async fn cancel_wager(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<CancelWagerRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut app = state.lock().unwrap();
    let outcome = app.system.cancel_wager(&payload.caller, &id).map_err(failure)?;
    Ok(Json(json!({
        "success": true,
        "refund": outcome.refund,
        "closed_with_fills": outcome.closed_with_fills,
    })))
}

// ===== OUTCOME REPORTING =====

pub async fn report_vote(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ReportVoteRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let (score, win_flag) = match (&payload.bitmap, payload.score) {
        (Some(tally), _) => {
            let bytes = hex::decode(&tally.hex)
                .map_err(|_| bad_request("bitmap hex is not valid hex"))?;
            let bitmap = OutcomeBitmap::from_bytes(bytes, tally.trades)
                .map_err(|e| bad_request(&e))?;
            if bitmap.is_empty() {
                // no valid trades underneath: report the evidence invalid
                (0, None)
            } else {
                let (score, creator_won) = bitmap.as_vote();
                (score, Some(creator_won))
            }
        }
        (None, Some(score)) => (score, payload.win_flag),
        (None, None) => return Err(bad_request("either score or bitmap is required")),
    };

    let mut app = state.lock().unwrap();
    let decided = app
        .system
        .report_vote(&payload.keeper, &id, score, win_flag)
        .map_err(failure)?;
    Ok(Json(json!({ "success": true, "score": score, "decided": decided })))
}

pub async fn report_votes_batch(
    State(state): State<SharedState>,
    Json(payload): Json<BatchVoteRequest>,
) -> Json<Value> {
    let votes: Vec<(String, i64, Option<bool>)> = payload
        .votes
        .into_iter()
        .map(|v| (v.wager_id, v.score, v.win_flag))
        .collect();

    let mut app = state.lock().unwrap();
    let report = app.system.report_votes(&payload.keeper, &votes);
    Json(json!({ "processed": report.processed, "skipped": report.skipped }))
}

// ===== SETTLEMENT =====

pub async fn settle_wager(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut app = state.lock().unwrap();
    let plan = app.system.settle(&id).map_err(failure)?;
    Ok(Json(json!({ "success": true, "settlement": plan })))
}

pub async fn settle_batch(
    State(state): State<SharedState>,
    Json(payload): Json<SettleBatchRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut app = state.lock().unwrap();
    if payload.strict {
        let plans = app.system.settle_batch_strict(&payload.ids).map_err(failure)?;
        Ok(Json(json!({ "success": true, "settlements": plans })))
    } else {
        let report = app.system.settle_batch(&payload.ids);
        Ok(Json(json!({
            "success": true,
            "processed": report.processed,
            "skipped": report.skipped,
        })))
    }
}

pub async fn sweep_expired(State(state): State<SharedState>) -> Json<Value> {
    let mut app = state.lock().unwrap();
    let swept = app.system.sweep_expired();
    Json(json!({ "expired": swept }))
}

pub async fn withdraw_fees(
    State(state): State<SharedState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut app = state.lock().unwrap();
    let amount = app.system.withdraw_fees().map_err(failure)?;
    Ok(Json(json!({ "success": true, "amount": amount })))
}

// ===== KEEPER GOVERNANCE =====

pub async fn list_keepers(State(state): State<SharedState>) -> Json<Value> {
    let app = state.lock().unwrap();
    Json(json!({
        "keepers": &app.system.registry.keepers,
        "consensus_quorum": app.system.registry.consensus_quorum(),
    }))
}

pub async fn propose_keeper(
    State(state): State<SharedState>,
    Json(payload): Json<ProposeKeeperRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut app = state.lock().unwrap();
    let proposal_id = app
        .system
        .propose_keeper(&payload.proposer, &payload.target, &payload.endpoint, payload.add)
        .map_err(failure)?;
    Ok(Json(json!({ "success": true, "proposal_id": proposal_id })))
}

pub async fn vote_on_proposal(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ProposalVoteRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut app = state.lock().unwrap();
    app.system
        .vote_on_proposal(&payload.voter, &id, payload.approve)
        .map_err(failure)?;
    Ok(Json(json!({ "success": true })))
}

pub async fn execute_proposal(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ExecuteProposalRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut app = state.lock().unwrap();
    let change = app.system.execute_proposal(&payload.caller, &id).map_err(failure)?;
    Ok(Json(json!({ "success": true, "executed": change })))
}

// ===== DISPUTES =====

pub async fn raise_dispute(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<RaiseDisputeRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut app = state.lock().unwrap();
    app.system
        .raise_dispute(&payload.challenger, &id, payload.stake, &payload.reason)
        .map_err(failure)?;
    Ok(Json(json!({ "success": true })))
}

pub async fn resolve_dispute(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ResolveDisputeRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut app = state.lock().unwrap();
    let verdict = app
        .system
        .resolve_dispute(
            &payload.keeper,
            &id,
            payload.corrected_score,
            payload.corrected_win_flag,
        )
        .map_err(failure)?;
    Ok(Json(json!({ "success": true, "verdict": verdict })))
}

pub async fn get_dispute(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let app = state.lock().unwrap();
    match app.system.disputes.get(&id) {
        Some(dispute) => Ok(Json(json!({ "dispute": dispute }))),
        None => Err(failure(WagerError::DisputeNotFound(id))),
    }
}

// ===== OBSERVABILITY =====

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

pub async fn get_events(
    State(state): State<SharedState>,
    Query(query): Query<EventsQuery>,
) -> Json<Value> {
    let app = state.lock().unwrap();
    let limit = query.limit.unwrap_or(100);
    Json(json!({ "events": app.system.events.recent(limit) }))
}

pub async fn get_stats(State(state): State<SharedState>) -> Json<Value> {
    let app = state.lock().unwrap();
    Json(json!({
        "stats": &app.system.stats,
        "accrued_fees": app.system.accrued_fees,
        "pool": app.system.vault.pool(),
        "conserved": app.system.pool_is_conserved(),
    }))
}

pub async fn health_check() -> &'static str {
    "WagerBook P2P Wagering Ledger - Online"
}

// WagerBook P2P Wagering Ledger - Main Entry Point
// Escrow, matching and settlement with keeper-governed outcome consensus

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use wagerbook::app_state::AppState;
use wagerbook::handlers::*;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt().init();

    let state = AppState::from_env()
        .expect("invalid configuration")
        .shared();

    let app = Router::new()
        // ===== WAGER ENDPOINTS =====
        .route("/wagers", get(list_wagers))
        .route("/wagers", post(create_wager))
        .route("/wagers/:id", get(get_wager))
        .route("/wagers/:id/fill", post(fill_wager))
        .route("/wagers/:id/cancel", post(cancel_wager))
        // ===== OUTCOME REPORTING =====
        .route("/wagers/:id/vote", post(report_vote))
        .route("/votes/batch", post(report_votes_batch))
        // ===== SETTLEMENT =====
        .route("/wagers/:id/settle", post(settle_wager))
        .route("/settle/batch", post(settle_batch))
        .route("/sweep", post(sweep_expired))
        .route("/fees/withdraw", post(withdraw_fees))
        // ===== DISPUTES =====
        .route("/wagers/:id/dispute", post(raise_dispute))
        .route("/wagers/:id/dispute", get(get_dispute))
        .route("/wagers/:id/dispute/resolve", post(resolve_dispute))
        // ===== KEEPER GOVERNANCE =====
        .route("/keepers", get(list_keepers))
        .route("/keepers/proposals", post(propose_keeper))
        .route("/keepers/proposals/:id/vote", post(vote_on_proposal))
        .route("/keepers/proposals/:id/execute", post(execute_proposal))
        // ===== ACCOUNTS =====
        .route("/accounts", post(register_account))
        .route("/balance/:account", get(get_balance))
        // ===== OBSERVABILITY =====
        .route("/events", get(get_events))
        .route("/stats", get(get_stats))
        // ===== HEALTH CHECK =====
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let port: u16 = std::env::var("WAGERBOOK_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(4070);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "wagerbook listening");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
        })
        .await
        .unwrap();
}

//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the vault's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                   | Description                              |
//! |--------|------------------------|------------------------------------------|
//! | GET    | `/health`              | Liveness probe                           |
//! | GET    | `/status`              | Vault summary                            |
//! | POST   | `/stake`               | Explicit stake                           |
//! | POST   | `/withdraw`            | Withdraw available balance               |
//! | POST   | `/transfer`            | Raw message, bare transfers stake        |
//! | GET    | `/balances/:address`   | Recorded principal                       |
//! | GET    | `/available/:address`  | Withdrawable amount                      |
//! | GET    | `/holdings/:address`   | Delegate pool claim held by an address   |
//! | GET    | `/solvency`            | Pool holding versus recorded principal   |
//! | POST   | `/pool/rewards`        | Accrue rewards in the in-memory pool     |
//! | POST   | `/pool/loss`           | Apply a loss to the in-memory pool       |
//! | GET    | `/ws`                  | WebSocket for live vault events          |
//!
//! Amounts are JSON integers in gwei.

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use stakevault_contracts::{
    dispatch, EventRecord, Message, SharedVault, SolvencyReport, StakeVault, VaultError,
    VaultEvent, VaultSummary,
};
use stakevault_protocol::delegate::InMemoryStakingPool;
use stakevault_protocol::types::{Address, Amount};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The hosted vault. Its mutex serialises every operation.
    pub vault: SharedVault,
    /// The delegate pool the vault forwards into.
    pub pool: Arc<InMemoryStakingPool>,
    /// Fans committed vault events out to WebSocket subscribers.
    pub event_tx: broadcast::Sender<EventRecord>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/stake", post(stake_handler))
        .route("/withdraw", post(withdraw_handler))
        .route("/transfer", post(transfer_handler))
        .route("/balances/:address", get(balance_handler))
        .route("/available/:address", get(available_handler))
        .route("/holdings/:address", get(holdings_handler))
        .route("/solvency", get(solvency_handler))
        .route("/pool/rewards", post(rewards_handler))
        .route("/pool/loss", post(loss_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /stake` and `POST /withdraw`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationRequest {
    pub caller: Address,
    pub amount: Amount,
}

/// Body of `POST /pool/rewards` and `POST /pool/loss`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PoolAdjustment {
    pub amount: Amount,
}

/// Response payload for a committed operation.
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationResponse {
    /// The event the operation emitted.
    pub event: EventRecord,
    /// Caller's recorded principal afterwards.
    pub balance: Amount,
    /// Caller's withdrawable amount afterwards.
    pub available: Amount,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    pub vault: VaultSummary,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for the per-address queries.
#[derive(Debug, Serialize, Deserialize)]
pub struct AmountResponse {
    pub address: Address,
    pub amount: Amount,
}

/// Error body returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable code, e.g. `insufficient_balance`.
    pub code: String,
}

fn error_response(status: StatusCode, error: String, code: &str) -> Response {
    let body = ErrorResponse {
        error,
        code: code.to_string(),
    };
    (status, Json(body)).into_response()
}

fn vault_error_status(err: &VaultError) -> StatusCode {
    match err {
        VaultError::NotInitialized | VaultError::AlreadyInitialized => StatusCode::CONFLICT,
        VaultError::PoolTransferFailed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn parse_address(raw: &str) -> Result<Address, Response> {
    raw.parse().map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("invalid address {}: {}", raw, e),
            "invalid_address",
        )
    })
}

// ---------------------------------------------------------------------------
// Operation execution
// ---------------------------------------------------------------------------

/// Runs one vault operation under the vault lock and publishes its events
/// before the lock is released, so subscribers see them in commit order.
fn execute<F>(state: &AppState, operation: &str, caller: Address, op: F) -> Response
where
    F: FnOnce(&mut StakeVault) -> Result<EventRecord, VaultError>,
{
    let timer = state
        .metrics
        .operation_latency_seconds
        .with_label_values(&[operation])
        .start_timer();
    let (result, summary, balance, available) = {
        let mut vault = state.vault.lock();
        let result = op(&mut vault);
        for record in vault.drain_events() {
            match record.event {
                VaultEvent::Staked { .. } => state.metrics.stakes_total.inc(),
                VaultEvent::Withdrawn { .. } => state.metrics.withdrawals_total.inc(),
            }
            // No subscribers is fine.
            let _ = state.event_tx.send(record);
        }
        (
            result,
            vault.summary(),
            vault.balance_of(&caller),
            vault.available_amount(&caller),
        )
    };
    timer.observe_duration();
    state.metrics.observe(&summary);

    match result {
        Ok(event) => (
            StatusCode::OK,
            Json(OperationResponse {
                event,
                balance,
                available,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::debug!(operation, %caller, error = %e, "operation rejected");
            state.metrics.reject(operation, e.code());
            error_response(vault_error_status(&e), e.to_string(), e.code())
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: returns the vault summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let summary = state.vault.lock().summary();
    state.metrics.observe(&summary);
    Json(StatusResponse {
        version: state.version.clone(),
        vault: summary,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `POST /stake`
async fn stake_handler(
    State(state): State<AppState>,
    Json(req): Json<OperationRequest>,
) -> Response {
    execute(&state, "stake", req.caller, |vault| {
        vault.stake(req.caller, req.amount)
    })
}

/// `POST /withdraw`
async fn withdraw_handler(
    State(state): State<AppState>,
    Json(req): Json<OperationRequest>,
) -> Response {
    execute(&state, "withdraw", req.caller, |vault| {
        vault.withdraw(req.caller, req.amount)
    })
}

/// `POST /transfer`: a raw message. Without a `call`, the attached value
/// is staked.
async fn transfer_handler(
    State(state): State<AppState>,
    Json(message): Json<Message>,
) -> Response {
    execute(&state, "transfer", message.sender, |vault| {
        dispatch(vault, message)
    })
}

/// `GET /balances/:address`
async fn balance_handler(Path(address): Path<String>, State(state): State<AppState>) -> Response {
    match parse_address(&address) {
        Ok(address) => {
            let amount = state.vault.lock().balance_of(&address);
            Json(AmountResponse { address, amount }).into_response()
        }
        Err(resp) => resp,
    }
}

/// `GET /available/:address`
async fn available_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match parse_address(&address) {
        Ok(address) => {
            let amount = state.vault.lock().available_amount(&address);
            Json(AmountResponse { address, amount }).into_response()
        }
        Err(resp) => resp,
    }
}

/// `GET /holdings/:address`: delegate pool claim of any address, e.g. what
/// a withdrawer has received.
async fn holdings_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match parse_address(&address) {
        Ok(address) => {
            let amount = state.vault.lock().delegate_balance_of(&address);
            Json(AmountResponse { address, amount }).into_response()
        }
        Err(resp) => resp,
    }
}

/// `GET /solvency`
async fn solvency_handler(State(state): State<AppState>) -> Json<SolvencyReport> {
    Json(state.vault.lock().solvency())
}

/// `POST /pool/rewards`
async fn rewards_handler(
    State(state): State<AppState>,
    Json(req): Json<PoolAdjustment>,
) -> Response {
    match state.pool.accrue_rewards(req.amount) {
        Ok(()) => {
            tracing::info!(amount = req.amount, "rewards accrued to delegate pool");
            Json(state.vault.lock().solvency()).into_response()
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string(), "pool_overflow"),
    }
}

/// `POST /pool/loss`
async fn loss_handler(
    State(state): State<AppState>,
    Json(req): Json<PoolAdjustment>,
) -> Json<SolvencyReport> {
    state.pool.apply_loss(req.amount);
    tracing::warn!(amount = req.amount, "loss applied to delegate pool");
    Json(state.vault.lock().solvency())
}

/// `GET /ws`: WebSocket upgrade for live event streaming.
///
/// Clients receive JSON-encoded [`EventRecord`]s for every committed stake
/// and withdrawal. Client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection, forwarding broadcast events
/// until the client disconnects or the channel is closed.
async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(record) => {
                        let payload = match serde_json::to_string(&record) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(WsMessage::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use stakevault_contracts::AvailabilityCalculator;
    use stakevault_protocol::oracle::DelegateOracle;
    use stakevault_protocol::setup::VaultSetup;
    use tower::ServiceExt;

    fn vault_address() -> Address {
        Address::repeat_byte(0xee)
    }

    fn user(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn setup() -> VaultSetup {
        VaultSetup {
            deposit_contract: Address::repeat_byte(0xdc),
            oracle: Address::repeat_byte(0x0c),
            operator_registry: Address::repeat_byte(0x06),
            admin: Address::repeat_byte(0xad),
        }
    }

    /// Creates a test AppState around a vault built by `build`.
    fn app_state_with<F>(build: F) -> AppState
    where
        F: FnOnce(Arc<InMemoryStakingPool>) -> StakeVault,
    {
        let pool = Arc::new(InMemoryStakingPool::new());
        let vault = build(Arc::clone(&pool));
        let (event_tx, _) = broadcast::channel(16);
        AppState {
            version: "0.1.0-test".into(),
            vault: vault.into_shared(),
            pool,
            event_tx,
            metrics: Arc::new(crate::metrics::VaultMetrics::new().unwrap()),
        }
    }

    /// An initialised principal-policy vault.
    fn test_app_state() -> AppState {
        app_state_with(|pool| {
            let mut vault =
                StakeVault::new(vault_address(), pool, AvailabilityCalculator::principal());
            vault.initialize(setup()).unwrap();
            vault
        })
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Sends a POST request with JSON body and returns (status, body_bytes).
    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    fn op(caller: Address, amount: Amount) -> serde_json::Value {
        serde_json::json!({ "caller": caller, "amount": amount })
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn stake_updates_balance_and_status() {
        let router = create_router(test_app_state());

        let (status, body) = post_json(&router, "/stake", op(user(1), 3_000)).await;
        assert_eq!(status, StatusCode::OK);
        let resp: OperationResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            resp.event.event,
            VaultEvent::Staked {
                user: user(1),
                amount: 3_000
            }
        );
        assert_eq!(resp.balance, 3_000);
        assert_eq!(resp.available, 3_000);

        let (status, body) = get(&router, &format!("/balances/{}", user(1))).await;
        assert_eq!(status, StatusCode::OK);
        let resp: AmountResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.amount, 3_000);

        let (_, body) = get(&router, "/status").await;
        let resp: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.vault.total_recorded, 3_000);
        assert_eq!(resp.vault.pool_holding, 3_000);
        assert_eq!(resp.vault.depositors, 1);
        assert!(resp.vault.initialized);
    }

    #[tokio::test]
    async fn zero_stake_is_bad_request() {
        let router = create_router(test_app_state());
        let (status, body) = post_json(&router, "/stake", op(user(1), 0)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "zero_stake_amount");
        assert!(err.error.contains("more than 0"));
    }

    #[tokio::test]
    async fn withdraw_errors_are_distinguished() {
        let router = create_router(test_app_state());
        post_json(&router, "/stake", op(user(1), 4)).await;

        let (status, body) = post_json(&router, "/withdraw", op(user(1), 50)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "insufficient_balance");

        let (status, body) = post_json(&router, "/withdraw", op(user(2), 30)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "unknown_depositor");
        assert!(err.error.contains("no verifiable balance"));
    }

    #[tokio::test]
    async fn withdraw_pays_recipient_claim_tokens() {
        let router = create_router(test_app_state());
        post_json(&router, "/stake", op(user(1), 4)).await;

        let (status, body) = post_json(&router, "/withdraw", op(user(1), 1)).await;
        assert_eq!(status, StatusCode::OK);
        let resp: OperationResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.balance, 3);

        let (_, body) = get(&router, &format!("/holdings/{}", user(1))).await;
        let resp: AmountResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.amount, 1);
    }

    #[tokio::test]
    async fn bare_transfer_stakes_value() {
        let router = create_router(test_app_state());
        let body = serde_json::json!({ "sender": user(1), "value": 7 });
        let (status, body) = post_json(&router, "/transfer", body).await;

        assert_eq!(status, StatusCode::OK);
        let resp: OperationResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.event.event.name(), "staked");
        assert_eq!(resp.balance, 7);
    }

    #[tokio::test]
    async fn paused_pool_is_bad_gateway() {
        let state = test_app_state();
        state.pool.pause();
        let router = create_router(state.clone());

        let (status, body) = post_json(&router, "/stake", op(user(1), 10)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "pool_transfer_failed");
        assert_eq!(state.vault.lock().balance_of(&user(1)), 0);
    }

    #[tokio::test]
    async fn uninitialized_vault_is_conflict() {
        let state = app_state_with(|pool| {
            StakeVault::new(vault_address(), pool, AvailabilityCalculator::principal())
        });
        let router = create_router(state);
        let (status, body) = post_json(&router, "/stake", op(user(1), 10)).await;

        assert_eq!(status, StatusCode::CONFLICT);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "not_initialized");
    }

    #[tokio::test]
    async fn invalid_address_is_bad_request() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/balances/0x1234").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "invalid_address");
    }

    #[tokio::test]
    async fn committed_operations_are_broadcast() {
        let state = test_app_state();
        let mut rx = state.event_tx.subscribe();
        let router = create_router(state);

        post_json(&router, "/stake", op(user(1), 5)).await;
        post_json(&router, "/stake", op(user(1), 0)).await;
        post_json(&router, "/withdraw", op(user(1), 2)).await;

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.event.name(), "staked");
        assert_eq!(second.event.name(), "withdrawn");
        assert_eq!(second.sequence, first.sequence + 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_operations_broadcast_in_commit_order() {
        let mut state = test_app_state();
        let (event_tx, mut rx) = broadcast::channel(256);
        state.event_tx = event_tx;
        let router = create_router(state);

        let tasks: Vec<_> = (1..=8u8)
            .map(|n| {
                let router = router.clone();
                tokio::spawn(async move {
                    for _ in 0..10 {
                        let (status, _) = post_json(&router, "/stake", op(user(n), 3)).await;
                        assert_eq!(status, StatusCode::OK);
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let mut sequences = Vec::new();
        while let Ok(record) = rx.try_recv() {
            sequences.push(record.sequence);
        }
        assert_eq!(sequences, (1..=80).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn rewards_raise_yield_scaled_availability() {
        let state = app_state_with(|pool| {
            let oracle = Arc::new(DelegateOracle::new(pool.clone(), vault_address()));
            let mut vault = StakeVault::new(
                vault_address(),
                pool,
                AvailabilityCalculator::yield_scaled(oracle),
            );
            vault.initialize(setup()).unwrap();
            vault
        });
        let router = create_router(state);
        post_json(&router, "/stake", op(user(1), 100)).await;
        post_json(&router, "/stake", op(user(2), 300)).await;

        let (status, body) =
            post_json(&router, "/pool/rewards", serde_json::json!({ "amount": 200 })).await;
        assert_eq!(status, StatusCode::OK);
        let report: SolvencyReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.pool_holding, 600);
        assert!(report.solvent);

        let (_, body) = get(&router, &format!("/available/{}", user(1))).await;
        let resp: AmountResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.amount, 150);
    }

    #[tokio::test]
    async fn loss_shows_up_in_solvency() {
        let router = create_router(test_app_state());
        post_json(&router, "/stake", op(user(1), 100)).await;

        let (status, _) =
            post_json(&router, "/pool/loss", serde_json::json!({ "amount": 10 })).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = get(&router, "/solvency").await;
        let report: SolvencyReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.total_recorded, 100);
        assert_eq!(report.pool_holding, 90);
        assert!(!report.solvent);
    }
}

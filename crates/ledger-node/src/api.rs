//! HTTP boundary. Inbound transactions are validated here, before they reach
//! the ledger pool.

use crate::transport::NodeRequest;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::constants::{PATH_BLOCK_RECEIVE, PATH_NODES_NEW, PATH_NODES_REGISTER};
use ledger_core::error::ValidationError;
use ledger_core::{Block, ChainSnapshot, ChainStore, Ledger, LedgerError, NewTransaction};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub index: u64,
}

#[derive(Serialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

pub enum ApiError {
    Validation(ValidationError),
    Ledger(LedgerError),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::Ledger(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Ledger(e) => {
                let status = match &e {
                    LedgerError::Consensus(_) | LedgerError::NodeExists(_) => StatusCode::CONFLICT,
                    LedgerError::InvalidNode(_) => StatusCode::BAD_REQUEST,
                    _ => {
                        error!("Request failed: {}", e);
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn router<S: ChainStore>(ledger: Ledger<S>) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/transactions/new", post(new_transaction::<S>))
        .route("/chain", get(full_chain::<S>))
        .route(PATH_NODES_REGISTER, post(register_node::<S>))
        .route(PATH_NODES_NEW, post(new_node::<S>))
        .route(PATH_BLOCK_RECEIVE, post(receive_block::<S>))
        .with_state(ledger)
}

async fn new_transaction<S: ChainStore>(
    State(ledger): State<Ledger<S>>,
    Json(submission): Json<NewTransaction>,
) -> Result<Json<SubmitResponse>, ApiError> {
    submission.validate(ledger.verifier())?;
    let index = ledger.submit(submission.into_transaction()).await;
    Ok(Json(SubmitResponse {
        message: format!("Transaction will be added to Block {index}"),
        index,
    }))
}

async fn full_chain<S: ChainStore>(State(ledger): State<Ledger<S>>) -> Json<ChainResponse> {
    let chain = ledger.chain().await;
    Json(ChainResponse {
        length: chain.len(),
        chain,
    })
}

/// Registers the caller and hands back the full chain and peer set. A peer
/// that is already known still gets the snapshot.
async fn register_node<S: ChainStore>(
    State(ledger): State<Ledger<S>>,
    Json(req): Json<NodeRequest>,
) -> Result<Json<ChainSnapshot>, ApiError> {
    match ledger.register_node(&req.node).await {
        Ok(_) | Err(LedgerError::NodeExists(_)) => Ok(Json(ledger.snapshot().await)),
        Err(e) => Err(e.into()),
    }
}

/// Gossip from another peer; always acknowledged.
async fn new_node<S: ChainStore>(
    State(ledger): State<Ledger<S>>,
    Json(req): Json<NodeRequest>,
) -> StatusCode {
    if let Err(e) = ledger.register_node(&req.node).await {
        debug!("Ignoring announced node {}: {}", req.node, e);
    }
    StatusCode::OK
}

async fn receive_block<S: ChainStore>(
    State(ledger): State<Ledger<S>>,
    Json(block): Json<Block>,
) -> Result<StatusCode, ApiError> {
    ledger.validate_and_append(block).await?;
    Ok(StatusCode::CREATED)
}

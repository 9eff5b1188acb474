//! Main HTTP server implementation
//!
//! Thin JSON transport over the session engine: handlers deserialize the
//! request, call exactly one engine operation, and serialize the snapshot.
//! All waiting is client-side polling of the snapshot endpoint; nothing here
//! holds a connection open.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
};
use engine::{CreateSessionParams, NewParticipant, SessionEngine, SessionStore};
use shared::{SessionId, SessionSnapshot};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use crate::types::{
    CreateSessionRequest, FinalVoteRequest, HealthResponse, JoinSessionRequest,
    SessionActionRequest, SnapshotQuery, SwipeRequest,
};

/// Main server struct, generic over the engine's persistence
pub struct Server<S: SessionStore> {
    state: Arc<ServerState>,
    engine: Arc<SessionEngine<S>>,
}

// Manual Clone: the store type itself need not be Clone
impl<S: SessionStore> Clone for Server<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            engine: self.engine.clone(),
        }
    }
}

impl<S: SessionStore + 'static> Server<S> {
    pub fn new(bind_address: SocketAddr, engine: SessionEngine<S>) -> Self {
        Self {
            state: Arc::new(ServerState::new(bind_address)),
            engine: Arc::new(engine),
        }
    }

    /// Build the Axum router with all routes
    pub fn build_router(&self) -> Router {
        Router::new()
            // Session lifecycle
            .route("/api/session", post(create_session_handler))
            .route("/api/session/join", post(join_session_handler))
            .route("/api/session/:id", get(snapshot_handler))
            .route("/api/session/start", post(start_handler))
            .route("/api/session/begin", post(begin_handler))
            .route("/api/session/cancel", post(cancel_handler))
            // Swiping and voting
            .route("/api/session/swipe", post(swipe_handler))
            .route("/api/session/compute-finalists", post(compute_finalists_handler))
            .route("/api/session/final-vote", post(final_vote_handler))
            .route("/api/session/finalize", post(finalize_handler))
            // Health check
            .route("/health", get(health_handler))
            .layer(
                ServiceBuilder::new()
                    .layer(CorsLayer::permissive())
                    .into_inner(),
            )
            .with_state(self.clone())
    }

    /// Start the HTTP server and serve until shutdown
    pub async fn run(&self) -> ServerResult<()> {
        let router = self.build_router();
        let listener = tokio::net::TcpListener::bind(self.state.bind_address)
            .await
            .map_err(|e| {
                ServerError::Startup(format!(
                    "Failed to bind to {}: {e}",
                    self.state.bind_address
                ))
            })?;

        info!("🌐 Session server listening on http://{}", self.state.bind_address);

        tokio::select! {
            result = axum::serve(listener, router) => {
                result.map_err(|e| ServerError::Startup(format!("Server error: {e}")))?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
            }
        }
        Ok(())
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }
}

// HTTP Handlers

async fn create_session_handler<S: SessionStore + 'static>(
    State(server): State<Server<S>>,
    Json(req): Json<CreateSessionRequest>,
) -> ServerResult<Json<SessionSnapshot>> {
    if req.candidates.is_empty() {
        return Err(ServerError::InvalidRequest {
            details: "candidate pool must not be empty".to_string(),
        });
    }
    let snapshot = server
        .engine
        .create_session(CreateSessionParams {
            mode: req.mode,
            host: NewParticipant {
                id: req.participant_id,
                display_name: req.display_name,
            },
            pool: req.candidates,
            min_participants: req.min_participants,
            round1_limit: req.round1_limit,
            round2_limit: req.round2_limit,
            demo: req.demo,
        })
        .await?;
    Ok(Json(snapshot))
}

async fn join_session_handler<S: SessionStore + 'static>(
    State(server): State<Server<S>>,
    Json(req): Json<JoinSessionRequest>,
) -> ServerResult<Json<SessionSnapshot>> {
    let snapshot = server
        .engine
        .join_session(
            &req.join_code,
            NewParticipant {
                id: req.participant_id,
                display_name: req.display_name,
            },
        )
        .await?;
    Ok(Json(snapshot))
}

/// The polling read: reconciles the session, then returns its full state
async fn snapshot_handler<S: SessionStore + 'static>(
    Path(id): Path<SessionId>,
    Query(query): Query<SnapshotQuery>,
    State(server): State<Server<S>>,
) -> ServerResult<Json<SessionSnapshot>> {
    let snapshot = server.engine.snapshot(id, &query.participant_id).await?;
    Ok(Json(snapshot))
}

async fn start_handler<S: SessionStore + 'static>(
    State(server): State<Server<S>>,
    Json(req): Json<SessionActionRequest>,
) -> ServerResult<Json<SessionSnapshot>> {
    let snapshot = server
        .engine
        .mark_pool_ready(req.session_id, &req.participant_id)
        .await?;
    Ok(Json(snapshot))
}

async fn begin_handler<S: SessionStore + 'static>(
    State(server): State<Server<S>>,
    Json(req): Json<SessionActionRequest>,
) -> ServerResult<Json<SessionSnapshot>> {
    let snapshot = server
        .engine
        .begin_swiping(req.session_id, &req.participant_id)
        .await?;
    Ok(Json(snapshot))
}

async fn swipe_handler<S: SessionStore + 'static>(
    State(server): State<Server<S>>,
    Json(req): Json<SwipeRequest>,
) -> ServerResult<Json<SessionSnapshot>> {
    let snapshot = server
        .engine
        .submit_swipe(
            req.session_id,
            &req.participant_id,
            &req.candidate_id,
            req.decision,
            req.round,
            req.decided_at_ms,
        )
        .await?;
    Ok(Json(snapshot))
}

async fn compute_finalists_handler<S: SessionStore + 'static>(
    State(server): State<Server<S>>,
    Json(req): Json<SessionActionRequest>,
) -> ServerResult<Json<SessionSnapshot>> {
    let snapshot = server
        .engine
        .compute_finalists(req.session_id, &req.participant_id)
        .await?;
    Ok(Json(snapshot))
}

async fn final_vote_handler<S: SessionStore + 'static>(
    State(server): State<Server<S>>,
    Json(req): Json<FinalVoteRequest>,
) -> ServerResult<Json<SessionSnapshot>> {
    let snapshot = server
        .engine
        .cast_final_vote(req.session_id, &req.participant_id, &req.candidate_id)
        .await?;
    Ok(Json(snapshot))
}

async fn finalize_handler<S: SessionStore + 'static>(
    State(server): State<Server<S>>,
    Json(req): Json<SessionActionRequest>,
) -> ServerResult<Json<SessionSnapshot>> {
    let snapshot = server
        .engine
        .finalize(req.session_id, &req.participant_id)
        .await?;
    Ok(Json(snapshot))
}

async fn cancel_handler<S: SessionStore + 'static>(
    State(server): State<Server<S>>,
    Json(req): Json<SessionActionRequest>,
) -> ServerResult<Json<SessionSnapshot>> {
    let snapshot = server
        .engine
        .cancel(req.session_id, &req.participant_id)
        .await?;
    Ok(Json(snapshot))
}

async fn health_handler<S: SessionStore + 'static>(
    State(server): State<Server<S>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        uptime_secs: server.state.uptime_secs(),
    })
}

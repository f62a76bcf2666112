//! JSON API over axum: sessions, tab selection and control events.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::bindings::Update;
use crate::error::DashError;
use crate::loader::Datasets;
use crate::session::{Session, SessionSettings};
use crate::view::{ComponentId, TabId, ViewTree};

/// Sessions idle for longer than this are dropped unless configured otherwise.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

#[derive(Clone)]
pub struct AppState {
    datasets: Arc<Datasets>,
    settings: SessionSettings,
    sessions: Arc<DashMap<Uuid, SessionEntry>>,
    idle_timeout: Duration,
}

impl AppState {
    pub fn new(datasets: Arc<Datasets>, settings: SessionSettings) -> Self {
        Self {
            datasets,
            settings,
            sessions: Arc::new(DashMap::new()),
            idle_timeout: DEFAULT_SESSION_IDLE,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drops every session not touched within the idle timeout. Returns how many went.
    pub fn expire_idle(&self) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| entry.last_seen.elapsed() <= self.idle_timeout);
        let expired = before.saturating_sub(self.sessions.len());
        if expired > 0 {
            tracing::info!(expired, sessions = self.sessions.len(), "idle sessions expired");
        }
        expired
    }

    fn insert(&self, id: Uuid, session: Session) {
        self.expire_idle();
        self.sessions.insert(
            id,
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                last_seen: Instant::now(),
            },
        );
    }

    /// Looks up a live session and marks it as used.
    fn session(&self, id: &str) -> Result<(Uuid, Arc<Mutex<Session>>), ApiError> {
        let unknown = || ApiError::new(StatusCode::NOT_FOUND, format!("unknown session '{}'", id));
        let uuid = Uuid::parse_str(id).map_err(|_| unknown())?;
        self.expire_idle();
        let mut entry = self.sessions.get_mut(&uuid).ok_or_else(unknown)?;
        entry.last_seen = Instant::now();
        Ok((uuid, Arc::clone(&entry.session)))
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<DashError> for ApiError {
    fn from(e: DashError) -> Self {
        let status = match e {
            DashError::UnknownControl(_) => StatusCode::NOT_FOUND,
            DashError::InvalidControlValue { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.user_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
struct SessionView {
    session_id: Uuid,
    tab: TabId,
    tree: ViewTree,
}

impl SessionView {
    fn of(session_id: Uuid, session: &Session) -> Self {
        Self {
            session_id,
            tab: session.tab(),
            tree: session.tree().clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TabRequest {
    tab: String,
}

#[derive(Debug, Deserialize)]
struct ControlRequest {
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Serialize)]
struct ControlResponse {
    updates: Vec<Update>,
}

/// Runs dashboard work off the async executor; rules may block on outbound requests.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        tracing::error!(error = %e, "dashboard task panicked");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    })?
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/sessions", post(create_session))
        .route(
            "/api/sessions/:id",
            get(get_session).delete(delete_session),
        )
        .route("/api/sessions/:id/tab", put(select_tab))
        .route("/api/sessions/:id/controls/:control", post(set_control))
        .with_state(state)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "dashboard listening");
    axum::serve(listener, router(state)).await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_session(State(state): State<AppState>) -> Result<Response, ApiError> {
    let view = blocking(move || {
        let session = Session::new(Arc::clone(&state.datasets), state.settings.clone());
        let id = Uuid::new_v4();
        let view = SessionView::of(id, &session);
        state.insert(id, session);
        tracing::info!(session = %id, sessions = state.sessions.len(), "session created");
        Ok(view)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let (uuid, session) = state.session(&id)?;
    // The lock is held for the whole of a control event, which may wait on an outbound call
    let view = blocking(move || Ok(SessionView::of(uuid, &session.lock()))).await?;
    Ok(Json(view))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let (uuid, _) = state.session(&id)?;
    state.sessions.remove(&uuid);
    tracing::info!(session = %uuid, "session closed");
    Ok(StatusCode::NO_CONTENT)
}

async fn select_tab(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<TabRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let (uuid, session) = state.session(&id)?;
    let tab: TabId = request
        .tab
        .parse()
        .map_err(|e: String| ApiError::new(StatusCode::BAD_REQUEST, e))?;
    let view = blocking(move || {
        let mut session = session.lock();
        session.select_tab(tab);
        Ok(SessionView::of(uuid, &session))
    })
    .await?;
    Ok(Json(view))
}

async fn set_control(
    State(state): State<AppState>,
    Path((id, control)): Path<(String, String)>,
    Json(request): Json<ControlRequest>,
) -> Result<Json<ControlResponse>, ApiError> {
    let (_, session) = state.session(&id)?;
    let control: ComponentId = control
        .parse()
        .map_err(|e: String| ApiError::new(StatusCode::NOT_FOUND, e))?;
    let updates = blocking(move || {
        let mut session = session.lock();
        Ok(session.set_control_json(control, request.value)?)
    })
    .await?;
    Ok(Json(ControlResponse { updates }))
}

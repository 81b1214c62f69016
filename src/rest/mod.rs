//! REST transport edge.
//!
//! `axum` router exposing the account/session HTTP surface. `POST` and
//! `DELETE` publish a command via the Kafka producer rather than calling
//! the processor inline; `GET`/`PATCH` call the processor directly since
//! they're pure reads (or, for `PATCH`, a synchronous CRUD write outside
//! the session state machine).

pub mod model;

use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, patch, post};
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::account::model::AccountUpdate;
use crate::account::AccountProcessor;
use crate::config::Config;
use crate::db::accounts::AccountStore;
use crate::dispatcher::{CreateAccountCommand, SessionCommand, SessionCommandBody};
use crate::events::EventSink;
use crate::kafka::producer::{nil_session_id, CommandProducer};
use crate::state::SessionRegistry;
use crate::tenant::{TenantContext, TenantId};

use self::model::RestModel;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AccountStore>,
    pub registry: Arc<SessionRegistry>,
    pub events: Arc<dyn EventSink>,
    pub config: Config,
    pub producer: Arc<dyn CommandProducer>,
}

impl AppState {
    fn processor_for(&self, tenant: TenantId) -> AccountProcessor {
        AccountProcessor::new(
            TenantContext::new(tenant),
            self.store.clone(),
            self.registry.clone(),
            self.events.clone(),
            self.config.clone(),
        )
    }
}

/// Reads `TENANT_ID`/`REGION`/`MAJOR_VERSION`/`MINOR_VERSION` headers into a
/// `TenantId`.
pub struct TenantHeader(pub TenantId);

#[axum::async_trait]
impl<S> FromRequestParts<S> for TenantHeader
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_tenant_headers(&parts.headers).ok_or((StatusCode::BAD_REQUEST, "missing tenant headers"))
    }
}

fn parse_tenant_headers(headers: &HeaderMap) -> Option<TenantId> {
    let id = Uuid::parse_str(headers.get("TENANT_ID")?.to_str().ok()?).ok()?;
    let region = headers.get("REGION")?.to_str().ok()?.to_string();
    let major_version = headers.get("MAJOR_VERSION")?.to_str().ok()?.parse().ok()?;
    let minor_version = headers.get("MINOR_VERSION")?.to_str().ok()?.parse().ok()?;
    Some(TenantId::new(id, region, major_version, minor_version))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/accounts/", post(create_account).get(list_or_find_account))
        .route("/api/accounts/:id", get(get_account).patch(patch_account))
        .route("/api/accounts/:id/session", axum::routing::delete(delete_session))
        .with_state(Arc::new(state))
}

#[derive(Debug, Deserialize)]
struct CreateAccountBody {
    name: String,
    password: String,
}

async fn create_account(
    State(state): State<Arc<AppState>>,
    TenantHeader(tenant): TenantHeader,
    Json(body): Json<CreateAccountBody>,
) -> impl IntoResponse {
    let cmd = CreateAccountCommand {
        name: body.name,
        password: body.password,
    };
    match state.producer.publish_create_account(&tenant, cmd).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => (StatusCode::from_u16(e.http_status()).unwrap(), e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct NameQuery {
    name: Option<String>,
}

async fn list_or_find_account(
    State(state): State<Arc<AppState>>,
    TenantHeader(tenant): TenantHeader,
    Query(query): Query<NameQuery>,
) -> impl IntoResponse {
    let processor = state.processor_for(tenant);
    match query.name {
        Some(name) => match processor.get_by_name(&name).await {
            Ok(account) => Json(RestModel::from(account)).into_response(),
            Err(e) => (StatusCode::from_u16(e.http_status()).unwrap(), e.to_string()).into_response(),
        },
        None => match processor.list_by_tenant().await {
            Ok(accounts) => {
                let models: Vec<RestModel> = accounts.into_iter().map(RestModel::from).collect();
                Json(models).into_response()
            }
            Err(e) => (StatusCode::from_u16(e.http_status()).unwrap(), e.to_string()).into_response(),
        },
    }
}

async fn get_account(
    State(state): State<Arc<AppState>>,
    TenantHeader(tenant): TenantHeader,
    Path(id): Path<u32>,
) -> impl IntoResponse {
    let processor = state.processor_for(tenant);
    match processor.get_by_id(id).await {
        Ok(account) => Json(RestModel::from(account)).into_response(),
        Err(e) => (StatusCode::from_u16(e.http_status()).unwrap(), e.to_string()).into_response(),
    }
}

async fn patch_account(
    State(state): State<Arc<AppState>>,
    TenantHeader(tenant): TenantHeader,
    Path(id): Path<u32>,
    Json(update): Json<AccountUpdate>,
) -> impl IntoResponse {
    let processor = state.processor_for(tenant);
    match processor.update(id, update).await {
        Ok(account) => Json(RestModel::from(account)).into_response(),
        Err(e) => (StatusCode::from_u16(e.http_status()).unwrap(), e.to_string()).into_response(),
    }
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    TenantHeader(tenant): TenantHeader,
    Path(id): Path<u32>,
) -> impl IntoResponse {
    let cmd = SessionCommand {
        session_id: nil_session_id(),
        account_id: id,
        issuer: "INTERNAL".to_string(),
        body: SessionCommandBody::Logout,
    };
    match state.producer.publish_session_command(&tenant, cmd).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => (StatusCode::from_u16(e.http_status()).unwrap(), e.to_string()).into_response(),
    }
}

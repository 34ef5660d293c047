use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

/// Grand exchange slots per account; higher indexes are ignored.
pub const SLOT_COUNT: u8 = 8;
pub const MAX_RSN_LEN: usize = 12;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub code: i32,
    #[serde(rename = "type")]
    pub kind: String,
    pub key: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub key: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub errors: Vec<ApiError>,
    pub messages: Vec<ApiMessage>,
    pub time: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub token: String,
}

#[derive(Deserialize)]
pub struct RegisterParams {
    pub rsn: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SlotState {
    pub index: u8,
    pub item_id: i32,
    pub state: String,
    pub updated_time: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SlotsUpdate {
    pub rsn: String,
    pub slots: Vec<SlotState>,
}

#[derive(Default)]
pub struct Store {
    next_account_id: i64,
    /// access token -> user (the login token the session was issued for)
    sessions: HashMap<String, String>,
    accounts: HashMap<String, Vec<Account>>,
}

impl Store {
    fn issue_token(&mut self, user: String) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(token.clone(), user);
        token
    }
}

pub type Db = Arc<RwLock<Store>>;

type Rejection = (StatusCode, Json<Envelope<()>>);

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/account/self", get(list_accounts))
        .route("/account/register", get(register_account))
        .route("/auth/refresh", get(refresh_token))
        .route("/auth/token", post(exchange_token))
        .route("/ge/slots/update", post(update_slots))
        .with_state(db);
    Router::new().nest("/v1", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn envelope<T>(data: Option<T>, errors: Vec<ApiError>) -> Json<Envelope<T>> {
    Json(Envelope {
        data,
        errors,
        messages: Vec::new(),
        time: now(),
    })
}

fn validation_error(key: &str, message: &str) -> ApiError {
    ApiError {
        code: 400,
        kind: "VALIDATION".to_string(),
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn unauthorized() -> Rejection {
    let error = ApiError {
        code: 401,
        kind: "AUTH".to_string(),
        key: "token".to_string(),
        message: "missing, invalid or expired token".to_string(),
    };
    (StatusCode::UNAUTHORIZED, envelope(None, vec![error]))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token.trim())
}

fn authenticate(store: &Store, headers: &HeaderMap) -> Result<String, Rejection> {
    bearer(headers)
        .and_then(|token| store.sessions.get(token))
        .cloned()
        .ok_or_else(unauthorized)
}

async fn exchange_token(
    State(db): State<Db>,
    Json(input): Json<LoginRequest>,
) -> Json<Envelope<TokenResponse>> {
    let login = input.token.trim();
    if login.is_empty() {
        return envelope(None, vec![validation_error("token", "token must not be empty")]);
    }
    let access_token = db.write().await.issue_token(login.to_string());
    info!("issued access token");
    envelope(Some(TokenResponse { access_token }), Vec::new())
}

async fn refresh_token(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Envelope<TokenResponse>>, Rejection> {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    if let Some(old) = bearer(&headers) {
        store.sessions.remove(old);
    }
    let access_token = store.issue_token(user);
    Ok(envelope(Some(TokenResponse { access_token }), Vec::new()))
}

async fn list_accounts(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Envelope<Vec<Account>>>, Rejection> {
    let store = db.read().await;
    let user = authenticate(&store, &headers)?;
    let accounts = store.accounts.get(&user).cloned().unwrap_or_default();
    Ok(envelope(Some(accounts), Vec::new()))
}

async fn register_account(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<RegisterParams>,
) -> Result<Json<Envelope<Account>>, Rejection> {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;

    let rsn = params.rsn.as_deref().unwrap_or("").trim().to_string();
    if rsn.is_empty() {
        return Ok(envelope(None, vec![validation_error("rsn", "rsn must not be empty")]));
    }
    if rsn.chars().count() > MAX_RSN_LEN {
        return Ok(envelope(None, vec![validation_error("rsn", "rsn is too long")]));
    }

    let existing = store
        .accounts
        .get(&user)
        .and_then(|accounts| accounts.iter().find(|a| a.name.eq_ignore_ascii_case(&rsn)))
        .cloned();
    if let Some(account) = existing {
        return Ok(envelope(Some(account), Vec::new()));
    }

    store.next_account_id += 1;
    let account = Account {
        id: store.next_account_id,
        name: rsn,
    };
    store.accounts.entry(user).or_default().push(account.clone());
    info!(id = account.id, "registered account");
    Ok(envelope(Some(account), Vec::new()))
}

async fn update_slots(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(update): Json<SlotsUpdate>,
) -> Result<Json<Envelope<i64>>, Rejection> {
    let store = db.read().await;
    let user = authenticate(&store, &headers)?;
    let registered = store
        .accounts
        .get(&user)
        .is_some_and(|accounts| accounts.iter().any(|a| a.name.eq_ignore_ascii_case(&update.rsn)));
    let ignored = if registered {
        update.slots.iter().filter(|slot| slot.index >= SLOT_COUNT).count()
    } else {
        update.slots.len()
    };
    Ok(envelope(Some(ignored as i64), Vec::new()))
}

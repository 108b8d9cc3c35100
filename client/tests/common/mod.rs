#![allow(dead_code)]
use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use wagedesk_client::{
    api::ApiClient,
    auth::{
        storage::{MemorySessionStorage, SessionStorage},
        supabase::SupabaseAuth,
    },
    WorkspaceStore,
};

const JWT_SECRET: &str = "test-secret-that-is-at-least-32-chars-long!!";
pub const ANON_KEY: &str = "test-anon-key";
pub const PASSWORD: &str = "testpass123";

pub struct MockUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub metadata: Value,
}

/// Everything the mock auth + application backend knows. Tests mutate it
/// between calls to script the backend's behaviour.
#[derive(Default)]
pub struct MockBackend {
    pub users: HashMap<Uuid, MockUser>,
    pub access_tokens: HashMap<String, Uuid>,
    pub refresh_tokens: HashMap<String, Uuid>,
    pub contexts: HashMap<Uuid, Vec<Value>>,
    /// Number of upcoming `/me/context` calls that answer 500.
    pub context_failures: u32,
    /// Per-call delays for `/me/context`, consumed front to back.
    pub context_delays: VecDeque<Duration>,
    pub context_calls: u32,
    /// Answer refresh grants with 429 instead of issuing a session.
    pub refresh_rate_limited: bool,
    pub fail_logout: bool,
    pub logout_calls: u32,
    /// Lifetime of newly issued access tokens.
    pub session_ttl_secs: Option<i64>,
}

pub type SharedMock = Arc<Mutex<MockBackend>>;

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    exp: i64,
    iat: i64,
    jti: Uuid,
}

/// Spin up the mock backend on a random port. Auth endpoints live under
/// `/auth/v1`, application endpoints at the root, as in production.
pub async fn setup_mock_backend() -> (SocketAddr, SharedMock) {
    let mock: SharedMock = Arc::new(Mutex::new(MockBackend::default()));

    let app = Router::new()
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/user", get(get_user).put(update_user))
        .route("/auth/v1/logout", post(logout))
        .route("/me/context", get(me_context))
        .route("/companies/:id", get(get_company))
        .route("/workspaces/:id/companies", get(list_companies))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, mock)
}

pub fn base_url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

/// Store wired to the mock backend with fresh in-memory session storage.
pub fn build_store(addr: SocketAddr) -> WorkspaceStore {
    build_store_with(addr, Arc::new(MemorySessionStorage::new()), Duration::from_secs(5))
}

pub fn build_store_with(
    addr: SocketAddr,
    storage: Arc<dyn SessionStorage>,
    timeout: Duration,
) -> WorkspaceStore {
    let auth = SupabaseAuth::new(base_url(addr), ANON_KEY, timeout, storage)
        .expect("Failed to build auth client");
    let api = ApiClient::new(base_url(addr), timeout).expect("Failed to build api client");
    WorkspaceStore::new(Arc::new(auth), api)
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}+{}@test.local", prefix, &Uuid::new_v4().to_string()[..8])
}

pub fn add_user(mock: &SharedMock, email: &str) -> Uuid {
    let id = Uuid::new_v4();
    mock.lock().unwrap().users.insert(
        id,
        MockUser {
            id,
            email: email.to_string(),
            password: PASSWORD.to_string(),
            metadata: json!({}),
        },
    );
    id
}

pub fn set_context(mock: &SharedMock, user_id: Uuid, workspaces: Vec<Value>) {
    mock.lock().unwrap().contexts.insert(user_id, workspaces);
}

/// A company row. Returns its id alongside the JSON.
pub fn company_json(name: &str, status: &str) -> (Uuid, Value) {
    let id = Uuid::new_v4();
    (
        id,
        json!({
            "id": id,
            "name": name,
            "industry": "Manufacturing",
            "logo_url": null,
            "status": status,
        }),
    )
}

/// A workspace membership. Returns the workspace id alongside the JSON.
pub fn workspace_json(name: &str, role: &str, status: &str, companies: Vec<Value>) -> (Uuid, Value) {
    let id = Uuid::new_v4();
    (
        id,
        json!({
            "workspace_id": id,
            "role": role,
            "display_name": "Test Member",
            "email": "member@test.local",
            "workspaces": {
                "id": id,
                "name": name,
                "status": status,
                "companies": companies,
            }
        }),
    )
}

fn mint_token(user_id: Uuid, ttl_secs: i64) -> String {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let claims = Claims {
        sub: user_id,
        exp: now + ttl_secs,
        iat: now,
        jti: Uuid::new_v4(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to mint token")
}

fn user_json(user: &MockUser) -> Value {
    json!({
        "id": user.id,
        "email": user.email,
        "user_metadata": user.metadata,
    })
}

fn issue_session(backend: &mut MockBackend, user_id: Uuid) -> Value {
    let ttl = backend.session_ttl_secs.unwrap_or(3600);
    let access = mint_token(user_id, ttl);
    let refresh = Uuid::new_v4().to_string();
    backend.access_tokens.insert(access.clone(), user_id);
    backend.refresh_tokens.insert(refresh.clone(), user_id);

    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": ttl,
        "expires_at": now + ttl,
        "refresh_token": refresh,
        "user": user_json(&backend.users[&user_id]),
    })
}

fn error(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get("Authorization")?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?;
    Some(token.to_string())
}

fn has_api_key(headers: &HeaderMap) -> bool {
    headers
        .get("apikey")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == ANON_KEY)
}

/// Resolve the bearer token to a user. Expired or revoked tokens are rejected.
fn authenticate(backend: &MockBackend, headers: &HeaderMap) -> Option<Uuid> {
    let token = extract_bearer_token(headers)?;
    decode::<Claims>(
        &token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .ok()?;
    backend.access_tokens.get(&token).copied()
}

async fn token(
    State(mock): State<SharedMock>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !has_api_key(&headers) {
        return error(StatusCode::UNAUTHORIZED, json!({ "message": "No API key found in request" }));
    }
    let mut backend = mock.lock().unwrap();

    match params.get("grant_type").map(String::as_str) {
        Some("password") => {
            let email = body["email"].as_str().unwrap_or_default();
            let password = body["password"].as_str().unwrap_or_default();
            let user_id = backend
                .users
                .values()
                .find(|u| u.email == email && u.password == password)
                .map(|u| u.id);
            match user_id {
                Some(id) => Json(issue_session(&mut backend, id)).into_response(),
                None => error(
                    StatusCode::BAD_REQUEST,
                    json!({
                        "error": "invalid_grant",
                        "error_description": "Invalid login credentials",
                    }),
                ),
            }
        }
        Some("refresh_token") => {
            if backend.refresh_rate_limited {
                return error(
                    StatusCode::TOO_MANY_REQUESTS,
                    json!({ "msg": "Request rate limit reached" }),
                );
            }
            let refresh = body["refresh_token"].as_str().unwrap_or_default();
            match backend.refresh_tokens.remove(refresh) {
                Some(id) => Json(issue_session(&mut backend, id)).into_response(),
                None => error(
                    StatusCode::BAD_REQUEST,
                    json!({
                        "code": 400,
                        "msg": "Invalid Refresh Token: Refresh Token Not Found",
                    }),
                ),
            }
        }
        _ => error(
            StatusCode::BAD_REQUEST,
            json!({ "msg": "unsupported_grant_type" }),
        ),
    }
}

async fn get_user(State(mock): State<SharedMock>, headers: HeaderMap) -> Response {
    let backend = mock.lock().unwrap();
    match authenticate(&backend, &headers) {
        Some(id) => Json(user_json(&backend.users[&id])).into_response(),
        None => error(StatusCode::UNAUTHORIZED, json!({ "msg": "invalid JWT" })),
    }
}

async fn update_user(
    State(mock): State<SharedMock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut backend = mock.lock().unwrap();
    let Some(id) = authenticate(&backend, &headers) else {
        return error(StatusCode::UNAUTHORIZED, json!({ "msg": "invalid JWT" }));
    };
    let email_taken = body["email"].as_str().is_some_and(|email| {
        backend.users.values().any(|u| u.id != id && u.email == email)
    });
    if email_taken {
        return error(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "msg": "A user with this email address has already been registered" }),
        );
    }

    let user = backend.users.get_mut(&id).unwrap();
    if let Some(email) = body["email"].as_str() {
        user.email = email.to_string();
    }
    if let Some(password) = body["password"].as_str() {
        user.password = password.to_string();
    }
    if let Some(username) = body["data"]["username"].as_str() {
        user.metadata["username"] = json!(username);
    }
    Json(user_json(user)).into_response()
}

async fn logout(State(mock): State<SharedMock>, headers: HeaderMap) -> Response {
    let mut backend = mock.lock().unwrap();
    backend.logout_calls += 1;
    if backend.fail_logout {
        return error(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "msg": "Auth service unavailable" }),
        );
    }
    if let Some(token) = extract_bearer_token(&headers) {
        backend.access_tokens.remove(&token);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn me_context(State(mock): State<SharedMock>, headers: HeaderMap) -> Response {
    let (workspaces, delay) = {
        let mut backend = mock.lock().unwrap();
        backend.context_calls += 1;
        let Some(id) = authenticate(&backend, &headers) else {
            return error(StatusCode::UNAUTHORIZED, json!({ "error": "Invalid token" }));
        };
        if backend.context_failures > 0 {
            backend.context_failures -= 1;
            return error(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Database unavailable" }),
            );
        }
        (
            backend.contexts.get(&id).cloned().unwrap_or_default(),
            backend.context_delays.pop_front(),
        )
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    Json(json!({ "workspaces": workspaces })).into_response()
}

fn visible_companies(backend: &MockBackend, user_id: Uuid) -> Vec<Value> {
    backend
        .contexts
        .get(&user_id)
        .into_iter()
        .flatten()
        .flat_map(|ws| ws["workspaces"]["companies"].as_array().cloned().unwrap_or_default())
        .collect()
}

async fn get_company(
    State(mock): State<SharedMock>,
    Path(company_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let backend = mock.lock().unwrap();
    let Some(user_id) = authenticate(&backend, &headers) else {
        return error(StatusCode::UNAUTHORIZED, json!({ "error": "Invalid token" }));
    };
    visible_companies(&backend, user_id)
        .into_iter()
        .find(|c| c["id"] == json!(company_id))
        .map(|c| Json(c).into_response())
        .unwrap_or_else(|| error(StatusCode::NOT_FOUND, json!({ "error": "Company not found" })))
}

async fn list_companies(
    State(mock): State<SharedMock>,
    Path(workspace_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let backend = mock.lock().unwrap();
    let Some(user_id) = authenticate(&backend, &headers) else {
        return error(StatusCode::UNAUTHORIZED, json!({ "error": "Invalid token" }));
    };
    let companies: Vec<Value> = backend
        .contexts
        .get(&user_id)
        .into_iter()
        .flatten()
        .filter(|ws| ws["workspace_id"] == json!(workspace_id))
        .flat_map(|ws| ws["workspaces"]["companies"].as_array().cloned().unwrap_or_default())
        .collect();
    Json(companies).into_response()
}

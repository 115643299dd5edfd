//! Shared utilities for integration tests: a mock clinic backend.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use clinic_client::{ApiClient, ClientConfig, HeadlessNavigator};

pub const CSRF_TOKEN: &str = "mock-csrf-token";
pub const EMAIL: &str = "doctor@clinic.test";
pub const PASSWORD: &str = "correct-horse";
pub const GOOGLE_TOKEN: &str = "google-id-token";

type Reply = (StatusCode, Json<Value>);

/// Programmable backend state, shared with the test body.
#[derive(Default)]
pub struct MockState {
    session_valid: AtomicBool,
    refresh_ok: AtomicBool,
    refresh_delay_ms: AtomicU64,
    always_unauthorized: AtomicBool,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub csrf_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
    pub protected_hits: AtomicUsize,
    /// `X-CSRFToken` seen on each mutating protected request.
    pub csrf_headers: Mutex<Vec<Option<String>>>,
    /// `X-CSRFToken` seen on each refresh call.
    pub refresh_csrf_headers: Mutex<Vec<Option<String>>>,
}

impl MockState {
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn csrf_calls(&self) -> usize {
        self.csrf_calls.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn protected_hits(&self) -> usize {
        self.protected_hits.load(Ordering::SeqCst)
    }

    pub fn csrf_headers(&self) -> Vec<Option<String>> {
        self.csrf_headers.lock().unwrap().clone()
    }

    pub fn set_session_valid(&self, valid: bool) {
        self.session_valid.store(valid, Ordering::SeqCst);
    }

    pub fn set_refresh_ok(&self, ok: bool) {
        self.refresh_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.refresh_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Protected endpoints reject every request, even after a refresh.
    pub fn set_always_unauthorized(&self, on: bool) {
        self.always_unauthorized.store(on, Ordering::SeqCst);
    }

    fn authorized(&self) -> bool {
        self.session_valid.load(Ordering::SeqCst) && !self.always_unauthorized.load(Ordering::SeqCst)
    }
}

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub fn base_url(&self) -> String {
        format!("http://{}/auth/", self.addr)
    }

    /// Client config pointing at this backend.
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::default();
        config.api.base_url = self.base_url();
        config.api.request_timeout_secs = 5;
        config.api.connect_timeout_secs = 1;
        config.api.system_proxy = false;
        config
    }

    /// Client at navigation `location`, with its navigator.
    pub fn client_at(&self, location: &str) -> (Arc<ApiClient>, Arc<HeadlessNavigator>) {
        self.client_with(self.config(), location)
    }

    pub fn client_with(
        &self,
        config: ClientConfig,
        location: &str,
    ) -> (Arc<ApiClient>, Arc<HeadlessNavigator>) {
        let navigator = Arc::new(HeadlessNavigator::new(location));
        let client = ApiClient::builder(config)
            .navigator(navigator.clone())
            .build()
            .unwrap();
        (Arc::new(client), navigator)
    }
}

/// Start the mock backend on an ephemeral local port.
///
/// Starts with no valid session and a refresh endpoint that succeeds.
pub async fn start_mock_backend() -> MockBackend {
    let state = Arc::new(MockState::default());
    state.set_refresh_ok(true);

    let app = Router::new()
        .route("/auth/csrf/", get(csrf))
        .route("/auth/token/refresh/", post(refresh))
        .route("/auth/logout/", post(logout))
        .route("/auth/login/", post(login))
        .route("/auth/login/google/", post(google_login))
        .route("/auth/register/", post(register))
        .route("/auth/profile/", get(profile))
        .route("/auth/appointments/", get(list_appointments).post(create_appointment))
        .route("/auth/bills/broken/", get(broken))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend { addr, state }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn profile_json() -> Value {
    json!({
        "id": 3,
        "email": EMAIL,
        "role": "doctor",
        "first_name": "Ada",
        "last_name": "Okafor"
    })
}

fn unauthorized() -> Reply {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Authentication credentials were not provided."})),
    )
}

async fn csrf(State(state): State<Arc<MockState>>) -> Reply {
    state.csrf_calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, Json(json!({ "csrf": CSRF_TOKEN })))
}

async fn refresh(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Reply {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    state
        .refresh_csrf_headers
        .lock()
        .unwrap()
        .push(header(&headers, "x-csrftoken"));

    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if state.refresh_ok.load(Ordering::SeqCst) {
        state.set_session_valid(true);
        (
            StatusCode::OK,
            Json(json!({ "message": "Token refreshed", "user": profile_json() })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Token is invalid or expired" })),
        )
    }
}

async fn logout(State(state): State<Arc<MockState>>) -> Reply {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    state.set_session_valid(false);
    (StatusCode::OK, Json(json!({ "message": "Logged out" })))
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Reply {
    if body["email"] == EMAIL && body["password"] == PASSWORD {
        state.set_session_valid(true);
        let mut reply = profile_json();
        reply["message"] = json!("Login successful");
        (StatusCode::OK, Json(reply))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid email or password" })),
        )
    }
}

async fn google_login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Reply {
    if body["id_token"] == GOOGLE_TOKEN {
        state.set_session_valid(true);
        let mut reply = profile_json();
        reply["role"] = json!("patient");
        (StatusCode::OK, Json(reply))
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid Google token" })),
        )
    }
}

async fn register(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Reply {
    state.register_calls.fetch_add(1, Ordering::SeqCst);
    if body["email"] == "taken@clinic.test" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "A user with this email already exists" })),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({ "message": "Registration successful. Please verify your email." })),
    )
}

async fn profile(State(state): State<Arc<MockState>>) -> Reply {
    if !state.authorized() {
        return unauthorized();
    }
    (StatusCode::OK, Json(profile_json()))
}

async fn list_appointments(State(state): State<Arc<MockState>>) -> Reply {
    state.protected_hits.fetch_add(1, Ordering::SeqCst);
    if !state.authorized() {
        return unauthorized();
    }
    (StatusCode::OK, Json(json!({ "appointments": [] })))
}

async fn create_appointment(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    state.protected_hits.fetch_add(1, Ordering::SeqCst);
    state
        .csrf_headers
        .lock()
        .unwrap()
        .push(header(&headers, "x-csrftoken"));
    if !state.authorized() {
        return unauthorized();
    }
    (StatusCode::CREATED, Json(json!({ "id": 41, "slot": body["slot"] })))
}

async fn broken(State(state): State<Arc<MockState>>) -> Reply {
    state.protected_hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "database unavailable" })),
    )
}

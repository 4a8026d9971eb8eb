#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use roster_admin::{
    admin_router, Argon2Config, InMemoryStore, NewUser, PasswordPolicy, PasswordService, UserRepository,
    UsersState,
};

pub const BASE: &str = "/admin/auth/user";

pub const ROLE_NAMES: [&str; 5] = ["Admin", "Editor", "Viewer", "Auditor", "Support"];

/// In-memory store with roles 1..=5 and cheap hashing.
pub fn store() -> Arc<InMemoryStore> {
    let passwords = PasswordService::new(Argon2Config::testing(), PasswordPolicy::lenient())
        .expect("password service");
    let store = InMemoryStore::new(Arc::new(passwords));
    for name in ROLE_NAMES {
        store.insert_role(name, None);
    }
    Arc::new(store)
}

pub fn state(store: &Arc<InMemoryStore>) -> UsersState {
    UsersState::new(store.clone(), store.clone(), store.clone())
}

pub fn app_with(state: UsersState) -> Router {
    admin_router(state).split_for_parts().0
}

pub fn app(store: &Arc<InMemoryStore>) -> Router {
    app_with(state(store))
}

pub async fn seed_user(store: &InMemoryStore, n: u32, role_ids: &[i64]) -> i64 {
    let user = NewUser::new(format!("User {}", n), format!("user{}@example.com", n), "password123");
    store.create(user, role_ids).await.expect("seed user").id
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub async fn read_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

pub fn xhr_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("X-Requested-With", "XMLHttpRequest")
        .body(Body::empty())
        .expect("request")
}

pub fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()
        .expect("ascii")
        .to_string()
}

/// `name=value` of the flash cookie set by `response`, if any.
pub fn flash_cookie(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("roster_flash=") && !v.starts_with("roster_flash=;"))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn decode_flash(cookie: &str) -> serde_json::Value {
    let value = cookie.trim_start_matches("roster_flash=");
    let bytes = URL_SAFE_NO_PAD.decode(value).expect("base64");
    serde_json::from_slice(&bytes).expect("flash json")
}

/// Contents of `<script type="application/json" id="{id}">`.
pub fn json_island(html: &str, id: &str) -> serde_json::Value {
    let marker = format!("id=\"{}\">", id);
    let start = html.find(&marker).expect("island") + marker.len();
    let end = start + html[start..].find("</script>").expect("island end");
    serde_json::from_str(&html[start..end]).expect("island json")
}

//! One-shot flash messages carried across a redirect in a cookie.

use std::collections::BTreeMap;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const FLASH_COOKIE: &str = "roster_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
    /// Submitted form values to re-populate the form with
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub old_input: BTreeMap<String, String>,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
            old_input: BTreeMap::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
            old_input: BTreeMap::new(),
        }
    }

    pub fn with_input(mut self, field: &str, value: impl Into<String>) -> Self {
        self.old_input.insert(field.to_string(), value.into());
        self
    }

    fn encode(&self) -> Option<String> {
        serde_json::to_vec(self).ok().map(|json| URL_SAFE_NO_PAD.encode(json))
    }

    fn decode(raw: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Queue `flash` for the next page render.
pub fn put(jar: CookieJar, flash: &Flash) -> CookieJar {
    match flash.encode() {
        Some(value) => jar.add(
            Cookie::build((FLASH_COOKIE, value))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax),
        ),
        None => jar,
    }
}

/// Read and clear the pending flash. A garbled cookie is dropped.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };

    let flash = Flash::decode(cookie.value());
    if flash.is_none() {
        debug!("Discarding unreadable flash cookie");
    }
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flash)
}

//! browser sessions for the login gate
//!
//! a browser without a valid `dashboard_session` cookie is on the login page;
//! one with a session is on the dashboard. logout drops the session.

use axum::http::{header, HeaderMap};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "dashboard_session";
const SESSION_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Login,
    Dashboard { section: String },
}

#[derive(Debug, Clone)]
struct Session {
    section: String,
    created_at: Instant,
}

impl Session {
    fn expired(&self) -> bool {
        self.created_at.elapsed() > SESSION_TIMEOUT
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// start a logged-in session, returning its cookie token
    pub async fn create(&self, section: &str) -> String {
        let token = Uuid::new_v4().to_string();
        let session = Session { section: section.to_string(), created_at: Instant::now() };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.expired());
        sessions.insert(token.clone(), session);
        token
    }

    pub async fn page(&self, token: Option<&str>) -> Page {
        let Some(token) = token else {
            return Page::Login;
        };
        let sessions = self.sessions.read().await;
        match sessions.get(token) {
            Some(s) if !s.expired() => Page::Dashboard { section: s.section.clone() },
            _ => Page::Login,
        }
    }

    pub async fn remove(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }
}

/// session token from the request cookies
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
}

pub fn set_cookie(token: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Strict", SESSION_COOKIE, token)
}

pub fn clear_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE)
}

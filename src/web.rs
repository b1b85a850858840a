//! ==============================================================================
//! web.rs - dashboard web server
//! ==============================================================================
//!
//! routes:
//!     GET  /             dashboard (login required, else -> /login)
//!     GET  /login        login + forgot password form
//!     POST /login        check section/password, start session
//!     POST /recover      reveal password if the recovery answer matches
//!     POST /logout       end session
//!     GET  /api/reading  json snapshot of the latest reading (login required)
//!
//! relationships:
//!     - used by: main.rs (run_server)
//!     - reads: AppState snapshots written by the refresh loop
//!     - uses: auth.rs, session.rs, pages.rs
//!
//! ==============================================================================

use crate::auth::DemoAuth;
use crate::pages::{self, Notice};
use crate::session::{self, Page, SessionStore};
use crate::AppState;

use anyhow::{Context, Result};
use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct WebContext {
    pub state: Arc<RwLock<AppState>>,
    pub sessions: SessionStore,
    pub auth: Arc<DemoAuth>,
    /// title prefix, the configured default section
    pub brand: String,
    pub refresh_ms: u64,
    pub zoom: u8,
}

impl WebContext {
    async fn page(&self, headers: &HeaderMap) -> Page {
        let token = session::session_token(headers);
        self.sessions.page(token.as_deref()).await
    }

    fn login_page(&self, notice: Option<Notice>) -> Html<String> {
        Html(pages::login_page(&self.brand, &self.auth.sections(), &self.auth.questions(), notice.as_ref()))
    }
}

pub fn router(ctx: WebContext) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/login", get(login_page_handler).post(login_handler))
        .route("/recover", post(recover_handler))
        .route("/logout", post(logout_handler))
        .route("/api/reading", get(api_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

pub async fn run_server(ctx: WebContext, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    axum::serve(listener, router(ctx)).await?;
    Ok(())
}

#[derive(Deserialize)]
struct LoginForm {
    // an empty selector posts no section at all
    #[serde(default)]
    section: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct RecoverForm {
    #[serde(default)]
    section: String,
    #[serde(default)]
    answer: String,
}

async fn dashboard_handler(State(ctx): State<WebContext>, headers: HeaderMap) -> Response {
    let section = match ctx.page(&headers).await {
        Page::Dashboard { section } => section,
        Page::Login => return Redirect::to("/login").into_response(),
    };

    let state = ctx.state.read().await;
    Html(pages::dashboard_page(&ctx.brand, &section, &state.view, ctx.refresh_ms, ctx.zoom)).into_response()
}

async fn login_page_handler(State(ctx): State<WebContext>, headers: HeaderMap) -> Response {
    match ctx.page(&headers).await {
        Page::Dashboard { .. } => Redirect::to("/").into_response(),
        Page::Login => ctx.login_page(None).into_response(),
    }
}

async fn login_handler(State(ctx): State<WebContext>, Form(form): Form<LoginForm>) -> Response {
    match ctx.auth.login(&form.section, &form.password) {
        Ok(()) => {
            tracing::info!("[AUTH] Section {} logged in", form.section);
            let token = ctx.sessions.create(&form.section).await;
            (
                [(header::SET_COOKIE, session::set_cookie(&token))],
                Redirect::to("/"),
            )
                .into_response()
        }
        Err(e) => {
            tracing::info!("[AUTH] Rejected login for section {}", form.section);
            ctx.login_page(Some(Notice::Error(e.to_string()))).into_response()
        }
    }
}

async fn recover_handler(State(ctx): State<WebContext>, Form(form): Form<RecoverForm>) -> Response {
    let notice = match ctx.auth.recover(&form.section, &form.answer) {
        Ok(password) => Notice::Success(format!("Password for {}: {}", form.section, password)),
        Err(e) => Notice::Error(e.to_string()),
    };
    ctx.login_page(Some(notice)).into_response()
}

async fn logout_handler(State(ctx): State<WebContext>, headers: HeaderMap) -> Response {
    if let Some(token) = session::session_token(&headers) {
        ctx.sessions.remove(&token).await;
    }
    (
        [(header::SET_COOKIE, session::clear_cookie())],
        Redirect::to("/login"),
    )
        .into_response()
}

/// json api endpoint for programmatic access
async fn api_handler(State(ctx): State<WebContext>, headers: HeaderMap) -> Response {
    if ctx.page(&headers).await == Page::Login {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let state = ctx.state.read().await;
    Json(state.clone()).into_response()
}

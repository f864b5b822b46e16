pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod views;

use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue};
use axum::Router;
use sqlx::PgPool;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::token::TokenSigner;
use crate::config::Config;
use crate::email::{LogMailer, Mailer, SmtpMailer};
use crate::error::AppError;
use crate::rate_limit::ResetRequestLimiter;
use crate::state::{AppState, SharedState};

/// Builds the router with the mailer chosen from `config.smtp`.
pub fn build_app(pool: PgPool, config: Config) -> (Router, SharedState) {
    let mailer: Arc<dyn Mailer> = match config.smtp.as_ref().map(SmtpMailer::new) {
        Some(Ok(mailer)) => {
            tracing::info!("SMTP configured");
            Arc::new(mailer)
        }
        Some(Err(e)) => {
            tracing::warn!("SMTP not available, reset links will be logged: {e}");
            Arc::new(LogMailer)
        }
        None => {
            tracing::warn!("SMTP not configured, reset links will be logged");
            Arc::new(LogMailer)
        }
    };

    build_app_with_mailer(pool, config, mailer)
}

pub fn build_app_with_mailer(
    pool: PgPool,
    config: Config,
    mailer: Arc<dyn Mailer>,
) -> (Router, SharedState) {
    let max_body_size = config.max_body_size;

    let state: SharedState = Arc::new(AppState {
        pool,
        signer: TokenSigner::new(config.secret_key.clone()),
        config,
        mailer,
        reset_limiter: ResetRequestLimiter::standard(),
    });

    let app = Router::new()
        .merge(views::view_routes())
        .route("/health", axum::routing::get(health))
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        // Reset links carry the token in the path.
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    (app, state)
}

async fn health() -> &'static str {
    "ok"
}

async fn not_found() -> AppError {
    AppError::NotFound("There is nothing at this address.".to_string())
}

use askama::Template;
use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::auth::{password, token};
use crate::db;
use crate::error::AppError;
use crate::state::{AppState, SharedState};
use crate::views::flash::{self, Flash, FlashView};
use crate::views::render;

const REQUEST_PATH: &str = "/reset-password";
const COMPLETE_PATH: &str = "/password-reset-complete";

#[derive(Template)]
#[template(path = "reset/request.html")]
struct RequestTemplate {
    flash: Option<FlashView>,
}

#[derive(Template)]
#[template(path = "reset/new_password.html")]
struct NewPasswordTemplate {
    flash: Option<FlashView>,
    token: String,
}

#[derive(Template)]
#[template(path = "reset/complete.html")]
struct CompleteTemplate {
    flash: Option<FlashView>,
}

#[derive(Deserialize)]
pub struct ResetRequestForm {
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize)]
pub struct NewPasswordForm {
    #[serde(default)]
    pub password: String,
}

pub async fn request_page(jar: CookieJar) -> Result<(CookieJar, Response), AppError> {
    let (jar, flash) = flash::take(jar);
    let page = render(&RequestTemplate { flash })?;
    Ok((jar, page.into_response()))
}

/// Same answer, with the same latency, whether or not the address has an
/// account: the lookup and the mail run after the response is built.
pub async fn request_submit(
    State(state): State<SharedState>,
    jar: CookieJar,
    form: Result<Form<ResetRequestForm>, FormRejection>,
) -> (CookieJar, Redirect) {
    let email = match form {
        Ok(Form(form)) => form.email.trim().to_string(),
        Err(rejection) => {
            tracing::info!("Unreadable reset request form: {rejection}");
            String::new()
        }
    };

    if email.is_empty() {
        let jar = flash::set(jar, Flash::EmailRequired, state.secure_cookies());
        return (jar, Redirect::to(REQUEST_PATH));
    }

    tokio::spawn(send_reset_link(state.clone(), email));

    let jar = flash::set(jar, Flash::LinkSent, state.secure_cookies());
    (jar, Redirect::to(REQUEST_PATH))
}

async fn send_reset_link(state: SharedState, email: String) {
    let user = match db::users::find_by_email(&state.pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::info!("Password reset requested for an unknown email");
            return;
        }
        Err(e) => {
            tracing::error!("Database error during password reset lookup: {e}");
            return;
        }
    };

    if let Err(retry_after) = state.reset_limiter.check(&user.email) {
        tracing::warn!(
            user_id = %user.id,
            "Password reset throttled, window resets in {retry_after}s"
        );
        return;
    }

    let reset_token = match state.signer.issue(&user.email, token::RESET_PASSWORD) {
        Ok(reset_token) => reset_token,
        Err(e) => {
            tracing::error!(user_id = %user.id, "Failed to issue reset token: {e}");
            return;
        }
    };
    let reset_url = format!("{}{REQUEST_PATH}/{reset_token}", state.config.base_url);

    match state
        .mailer
        .send_password_reset(
            &user.email,
            &user.username,
            &reset_url,
            state.config.token_ttl,
        )
        .await
    {
        Ok(()) => tracing::info!(user_id = %user.id, "Password reset email sent"),
        Err(e) => tracing::error!(user_id = %user.id, "Failed to send password reset email: {e}"),
    }
}

/// Email bound to a reset token, or None when the token should be refused.
fn verified_email(state: &AppState, reset_token: &str) -> Option<String> {
    match state
        .signer
        .verify(reset_token, token::RESET_PASSWORD, state.config.token_ttl)
    {
        Ok(email) => Some(email),
        Err(e) => {
            tracing::info!("Rejected password reset token: {e}");
            None
        }
    }
}

fn invalid_link(state: &AppState, jar: CookieJar) -> Response {
    let jar = flash::set(jar, Flash::InvalidToken, state.secure_cookies());
    (jar, Redirect::to(REQUEST_PATH)).into_response()
}

pub async fn token_page(
    State(state): State<SharedState>,
    Path(reset_token): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if verified_email(&state, &reset_token).is_none() {
        return Ok(invalid_link(&state, jar));
    }

    let (jar, flash) = flash::take(jar);
    let page = render(&NewPasswordTemplate {
        flash,
        token: reset_token,
    })?;
    Ok((jar, page).into_response())
}

pub async fn token_submit(
    State(state): State<SharedState>,
    Path(reset_token): Path<String>,
    jar: CookieJar,
    form: Result<Form<NewPasswordForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Some(email) = verified_email(&state, &reset_token) else {
        return Ok(invalid_link(&state, jar));
    };

    let new_password = match form {
        Ok(Form(form)) => form.password,
        Err(rejection) => {
            tracing::info!("Unreadable new password form: {rejection}");
            String::new()
        }
    };

    if new_password.is_empty() {
        let jar = flash::set(jar, Flash::PasswordRequired, state.secure_cookies());
        let back = format!("{REQUEST_PATH}/{reset_token}");
        return Ok((jar, Redirect::to(&back)).into_response());
    }

    let hashed = password::hash(&new_password).map_err(AppError::Internal)?;
    if !db::users::update_password_by_email(&state.pool, &email, &hashed).await? {
        tracing::warn!("Valid reset token for an email with no account");
        return Ok(invalid_link(&state, jar));
    }

    tracing::info!("Password updated through reset link");
    Ok(Redirect::to(COMPLETE_PATH).into_response())
}

pub async fn complete_page() -> Result<Response, AppError> {
    let page = render(&CompleteTemplate { flash: None })?;
    Ok(page.into_response())
}

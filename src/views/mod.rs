pub mod flash;
pub mod reset;

use askama::Template;
use axum::response::Html;
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::state::SharedState;

pub fn view_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(reset::request_page).post(reset::request_submit))
        .route(
            "/reset-password",
            get(reset::request_page).post(reset::request_submit),
        )
        .route(
            "/reset-password/{token}",
            get(reset::token_page).post(reset::token_submit),
        )
        .route("/password-reset-complete", get(reset::complete_page))
}

pub(crate) fn render<T: Template>(template: &T) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

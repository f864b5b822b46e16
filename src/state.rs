use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::token::TokenSigner;
use crate::config::Config;
use crate::email::Mailer;
use crate::rate_limit::ResetRequestLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub signer: TokenSigner,
    pub mailer: Arc<dyn Mailer>,
    pub reset_limiter: ResetRequestLimiter,
}

impl AppState {
    /// Cookies only get the `Secure` flag when links are served over https.
    pub fn secure_cookies(&self) -> bool {
        self.config.base_url.starts_with("https://")
    }
}

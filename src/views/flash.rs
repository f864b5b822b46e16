//! One-shot messages carried across a redirect in a cookie. The cookie only
//! ever holds a short code; the text is looked up server side.

use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;

const COOKIE_NAME: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    LinkSent,
    EmailRequired,
    InvalidToken,
    PasswordRequired,
}

/// What a template needs to show a flash.
#[derive(Debug, Clone)]
pub struct FlashView {
    pub level: &'static str,
    pub message: &'static str,
}

impl Flash {
    fn code(self) -> &'static str {
        match self {
            Flash::LinkSent => "link_sent",
            Flash::EmailRequired => "email_required",
            Flash::InvalidToken => "invalid_token",
            Flash::PasswordRequired => "password_required",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "link_sent" => Some(Flash::LinkSent),
            "email_required" => Some(Flash::EmailRequired),
            "invalid_token" => Some(Flash::InvalidToken),
            "password_required" => Some(Flash::PasswordRequired),
            _ => None,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Flash::LinkSent => {
                "If that email is registered, a password reset link has been sent to it."
            }
            Flash::EmailRequired => "Please enter your email address.",
            Flash::InvalidToken => "The reset link is invalid or has expired.",
            Flash::PasswordRequired => "Please enter a new password.",
        }
    }

    pub fn level(self) -> &'static str {
        match self {
            Flash::LinkSent => "info",
            _ => "danger",
        }
    }

    pub fn view(self) -> FlashView {
        FlashView {
            level: self.level(),
            message: self.message(),
        }
    }
}

/// Queue `flash` for the next page render.
pub fn set(jar: CookieJar, flash: Flash, secure: bool) -> CookieJar {
    let cookie = Cookie::build((COOKIE_NAME, flash.code()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(5))
        .build();
    jar.add(cookie)
}

/// Read and clear the pending flash, if any. Unknown codes are dropped.
pub fn take(jar: CookieJar) -> (CookieJar, Option<FlashView>) {
    let Some(code) = jar.get(COOKIE_NAME).map(|c| c.value().to_string()) else {
        return (jar, None);
    };
    let jar = jar.remove(Cookie::build(COOKIE_NAME).path("/"));
    (jar, Flash::from_code(&code).map(Flash::view))
}

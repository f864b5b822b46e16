use std::time::Duration;

use askama::Template;

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    username: &'a str,
    reset_url: &'a str,
    expires_in: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    username: &'a str,
    reset_url: &'a str,
    expires_in: &'a str,
}

pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

pub fn render_password_reset(
    username: &str,
    reset_url: &str,
    ttl: Duration,
) -> Result<RenderedEmail, String> {
    let expires_in = describe_ttl(ttl);

    let text = PasswordResetText {
        username,
        reset_url,
        expires_in: &expires_in,
    }
    .render()
    .map_err(|e| format!("Failed to render email text: {e}"))?;

    let html = PasswordResetHtml {
        username,
        reset_url,
        expires_in: &expires_in,
    }
    .render()
    .map_err(|e| format!("Failed to render email html: {e}"))?;

    Ok(RenderedEmail {
        subject: "Password Reset Request".to_string(),
        text,
        html,
    })
}

/// "1 hour", "5 minutes", "90 seconds".
pub fn describe_ttl(ttl: Duration) -> String {
    let secs = ttl.as_secs();
    let (n, unit) = if secs % 3600 == 0 && secs >= 3600 {
        (secs / 3600, "hour")
    } else if secs % 60 == 0 && secs >= 60 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

//! Operator login and logout

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};

use crate::session::{Session, SessionState};
use crate::Dyncontent;

/// Store a superadmin token after checking it against the API
pub async fn login(app: &Dyncontent, token: &str, expires_in_hours: Option<i64>) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        bail!("token must not be empty");
    }
    let expires = expiry(expires_in_hours, Utc::now())?;

    let mut session = app.session();
    session.restore(Utc::now())?;
    if matches!(session.state(), SessionState::Authenticated(_)) {
        session.logout()?;
    }
    session.begin_login()?;

    let admin = app.admin()?.with_token(Some(token.to_string()));
    match admin.list_plugins().await {
        Ok(_) => {
            session.complete_login(Session {
                token: token.to_string(),
                user: None,
                superadmin: true,
                expires,
            })?;
            println!("Logged in to {}", app.config.api_base_url);
            Ok(())
        }
        Err(e) => {
            session.fail_login()?;
            bail!("login failed: {}", e)
        }
    }
}

/// Expiry `hours` after `now`; must be positive and representable
fn expiry(hours: Option<i64>, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    let Some(hours) = hours else {
        return Ok(None);
    };
    if hours <= 0 {
        bail!("expires-in must be a positive number of hours");
    }
    match Duration::try_hours(hours).and_then(|d| now.checked_add_signed(d)) {
        Some(at) => Ok(Some(at)),
        None => bail!("expires-in out of range"),
    }
}

pub fn logout(app: &Dyncontent) -> Result<()> {
    let mut session = app.session();
    session.logout()?;
    println!("Logged out");
    Ok(())
}

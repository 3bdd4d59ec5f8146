use tracing::{info, warn};

use super::password::{verify_decoy, verify_password};
use super::sessions::SessionStore;
use crate::error::AppError;
use crate::gateway::{Gateway, GatewayError};
use crate::profile::repo_types::AccountId;
use crate::profile::validation::{is_valid_email, normalize_email};

#[derive(Debug)]
pub struct LoggedIn {
    pub account_id: AccountId,
    pub token: String,
}

/// An unknown email and a wrong password fail identically.
pub async fn login(
    gw: &dyn Gateway,
    sessions: &dyn SessionStore,
    email: &str,
    password: &str,
) -> Result<LoggedIn, AppError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(AppError::MalformedInput("invalid email".into()));
    }

    let creds = match gw.get_credentials_by_email(&email).await {
        Ok(c) => c,
        Err(GatewayError::NotFound(_)) => {
            verify_decoy(password);
            warn!(email = %email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        }
        Err(e) => return Err(e.into()),
    };

    if !verify_password(password, &creds.password_hash).map_err(AppError::Internal)? {
        warn!(account_id = creds.id, "login wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = sessions.create(creds.id).await?;
    info!(account_id = creds.id, "logged in");
    Ok(LoggedIn { account_id: creds.id, token })
}

/// Best effort: the client forgets the token regardless.
pub async fn logout(sessions: &dyn SessionStore, token: &str) {
    if let Err(e) = sessions.delete(token).await {
        warn!(error = %e, "session delete failed");
    }
}

//! Session tokens.
//!
//! A token is an HS256-signed [`Claims`] whose `sid` names a row in the
//! `sessions` table. Both must check out: a validly signed token whose row
//! was deleted at logout no longer authenticates.

use axum::async_trait;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use super::claims::Claims;
use crate::config::SessionConfig;
use crate::profile::repo_types::AccountId;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
    #[error("could not sign session token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Open a session for `account` and return its token.
    async fn create(&self, account: AccountId) -> Result<String, SessionError>;

    /// `Ok(None)` for unknown, forged or expired tokens.
    async fn resolve(&self, token: &str) -> Result<Option<AccountId>, SessionError>;

    /// Deleting a token that does not resolve is not an error.
    async fn delete(&self, token: &str) -> Result<(), SessionError>;
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: TimeDuration,
}

impl SessionKeys {
    pub fn from_config(cfg: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: TimeDuration::days(cfg.ttl_days),
        }
    }

    /// Returns the token and the instant it stops being valid.
    pub fn sign(
        &self,
        account: AccountId,
        sid: Uuid,
    ) -> Result<(String, OffsetDateTime), jsonwebtoken::errors::Error> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: account,
            sid,
            iat: now.unix_timestamp() as usize,
            exp: expires_at.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(account_id = account, session_id = %sid, "session token signed");
        Ok((token, expires_at))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

pub struct PgSessionStore {
    pool: PgPool,
    keys: SessionKeys,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, keys: SessionKeys) -> Self {
        Self { pool, keys }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, account: AccountId) -> Result<String, SessionError> {
        let purged = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?
            .rows_affected();
        if purged > 0 {
            debug!(purged, "expired sessions removed");
        }

        let sid = Uuid::new_v4();
        let (token, expires_at) = self.keys.sign(account, sid)?;
        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, account_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(sid)
        .bind(account)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(token)
    }

    async fn resolve(&self, token: &str) -> Result<Option<AccountId>, SessionError> {
        let claims = match self.keys.verify(token) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "session token rejected");
                return Ok(None);
            }
        };
        let owner = sqlx::query_scalar::<_, AccountId>(
            r#"
            SELECT account_id
              FROM sessions
             WHERE session_id = $1
               AND expires_at > now()
            "#,
        )
        .bind(claims.sid)
        .fetch_optional(&self.pool)
        .await?;

        match owner {
            Some(id) if id == claims.sub => Ok(Some(id)),
            Some(id) => {
                warn!(
                    session_id = %claims.sid,
                    row = id,
                    token = claims.sub,
                    "session owner mismatch"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, token: &str) -> Result<(), SessionError> {
        let Ok(claims) = self.keys.verify(token) else {
            return Ok(());
        };
        sqlx::query("DELETE FROM sessions WHERE session_id = $1")
            .bind(claims.sid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

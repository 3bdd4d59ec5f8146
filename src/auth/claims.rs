use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::repo_types::AccountId;

/// Session token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: AccountId, // account id
    pub sid: Uuid,      // row in the sessions table
    pub iat: usize,     // issued at (unix timestamp)
    pub exp: usize,     // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
}

//! Persistence gateway: every statement the services issue against the
//! relational store goes through [`Gateway`].
//!
//! Multi-statement writes (`create_account`, `purchase_skin`) run inside a
//! single transaction in the Postgres implementation; callers never see
//! partial state.

use std::collections::BTreeSet;
use std::fmt;

use axum::async_trait;

use crate::profile::repo_types::{Account, AccountChanges, AccountId, Credentials, NewAccount};
use crate::scoreboard::services::Position;
use crate::store::repo_types::{PurchaseOutcome, Skin, SkinChoice, SkinId, Wallet};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Account,
    Skin,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Account => f.write_str("account"),
            Entity::Skin => f.write_str("skin"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("email already registered")]
    DuplicateEmail,
    #[error("nickname already taken")]
    DuplicateNickname,
    #[error("required field missing")]
    MissingRequiredField,
    #[error("insufficient coins")]
    InsufficientFunds,
    #[error("database unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Insert the account and its default-skin ownership row atomically.
    async fn create_account(&self, new: &NewAccount) -> Result<Account, GatewayError>;

    /// Only the `Some` fields of `changes` are written. Empty changes are a no-op.
    async fn update_account(
        &self,
        id: AccountId,
        changes: &AccountChanges,
    ) -> Result<(), GatewayError>;

    /// `private = false` leaves email, coins and owned skins out of the result.
    async fn get_account(&self, id: AccountId, private: bool) -> Result<Account, GatewayError>;
    async fn get_account_by_nickname(&self, nickname: &str) -> Result<Account, GatewayError>;

    /// Used only for login credential comparison.
    async fn get_credentials_by_email(&self, email: &str) -> Result<Credentials, GatewayError>;

    async fn email_exists(&self, email: &str) -> Result<bool, GatewayError>;
    async fn nickname_exists(&self, nickname: &str) -> Result<bool, GatewayError>;
    async fn count_accounts(&self) -> Result<i64, GatewayError>;

    /// `None` clears the avatar.
    async fn set_avatar(&self, id: AccountId, path: Option<&str>) -> Result<(), GatewayError>;

    /// Ordered by id ascending.
    async fn list_skins(&self) -> Result<Vec<Skin>, GatewayError>;
    async fn get_skin(&self, id: SkinId) -> Result<Skin, GatewayError>;
    async fn owned_skins(&self, account: AccountId) -> Result<BTreeSet<SkinId>, GatewayError>;
    async fn wallet(&self, account: AccountId) -> Result<Wallet, GatewayError>;

    /// Grants `skin` and charges its cost in one transaction. A second grant of
    /// the same pair reports `AlreadyOwned` and charges nothing.
    async fn purchase_skin(
        &self,
        account: AccountId,
        skin: &Skin,
    ) -> Result<PurchaseOutcome, GatewayError>;

    async fn adjust_coins(&self, account: AccountId, delta: i64) -> Result<(), GatewayError>;
    async fn equip_skin(&self, account: AccountId, choice: SkinChoice) -> Result<(), GatewayError>;

    async fn list_by_record(&self, limit: i64, offset: i64) -> Result<Vec<Position>, GatewayError>;
}

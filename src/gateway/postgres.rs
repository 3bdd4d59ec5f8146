use std::collections::BTreeSet;

use axum::async_trait;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::{Entity, Gateway, GatewayError};
use crate::profile::repo_types::{
    Account, AccountChanges, AccountId, Credentials, NewAccount, PrivateDetails, Stats,
};
use crate::scoreboard::services::Position;
use crate::store::repo_types::{
    PurchaseOutcome, Skin, SkinChoice, SkinId, Wallet, DEFAULT_SKIN_ID, STARTING_COINS,
};

const ACCOUNT_COLUMNS: &str =
    "account_id, email, nickname, avatar, record, win, draws, loss, coins, skin";

#[derive(Debug, FromRow)]
struct AccountRow {
    account_id: AccountId,
    email: String,
    nickname: String,
    avatar: Option<String>,
    #[sqlx(flatten)]
    stats: Stats,
    coins: i64,
    skin: Option<SkinId>,
}

impl AccountRow {
    /// `skins` is `Some` only for private reads.
    fn into_account(self, skins: Option<Vec<SkinId>>) -> Account {
        Account {
            id: self.account_id,
            nickname: self.nickname,
            avatar: self.avatar,
            stats: self.stats,
            equipped: SkinChoice::from_column(self.skin),
            private: skins.map(|skins| PrivateDetails {
                email: self.email,
                coins: self.coins,
                skins,
            }),
        }
    }
}

/// Map constraint violations onto typed outcomes; anything else is a
/// transport-level failure.
fn classify(err: sqlx::Error) -> GatewayError {
    if let sqlx::Error::Database(db) = &err {
        match (db.code().as_deref(), db.constraint()) {
            (Some("23505"), Some("accounts_email_key")) => return GatewayError::DuplicateEmail,
            (Some("23505"), Some("accounts_nickname_key")) => {
                return GatewayError::DuplicateNickname
            }
            (Some("23502"), _) => return GatewayError::MissingRequiredField,
            (Some("23514"), Some("accounts_coins_check")) => {
                return GatewayError::InsufficientFunds
            }
            (Some("23503"), Some("purchased_skins_account_id_fkey")) => {
                return GatewayError::NotFound(Entity::Account)
            }
            (Some("23503"), Some("purchased_skins_skin_id_fkey")) => {
                return GatewayError::NotFound(Entity::Skin)
            }
            _ => {}
        }
    }
    GatewayError::Unavailable(err)
}

async fn adjust_coins_on(
    conn: &mut PgConnection,
    account: AccountId,
    delta: i64,
) -> Result<(), GatewayError> {
    let res = sqlx::query(
        r#"
        UPDATE accounts
           SET coins = coins + $1
         WHERE account_id = $2
        "#,
    )
    .bind(delta)
    .bind(account)
    .execute(conn)
    .await
    .map_err(classify)?;

    if res.rows_affected() == 0 {
        return Err(GatewayError::NotFound(Entity::Account));
    }
    Ok(())
}

#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_row(&self, id: AccountId) -> Result<AccountRow, GatewayError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(GatewayError::NotFound(Entity::Account))
    }

    async fn owned_list(&self, account: AccountId) -> Result<Vec<SkinId>, GatewayError> {
        let skins = sqlx::query_scalar::<_, SkinId>(
            r#"
            SELECT skin_id
              FROM purchased_skins
             WHERE account_id = $1
             ORDER BY skin_id
            "#,
        )
        .bind(account)
        .fetch_all(&self.pool)
        .await?;
        Ok(skins)
    }
}

#[async_trait]
impl Gateway for PgGateway {
    async fn create_account(&self, new: &NewAccount) -> Result<Account, GatewayError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO accounts (email, password, nickname, coins) \
             VALUES ($1, $2, $3, $4) RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.nickname)
            .bind(STARTING_COINS)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;

        sqlx::query("INSERT INTO purchased_skins (account_id, skin_id) VALUES ($1, $2)")
            .bind(row.account_id)
            .bind(DEFAULT_SKIN_ID)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        tx.commit().await?;
        debug!(account_id = row.account_id, "account row and default skin inserted");
        Ok(row.into_account(Some(vec![DEFAULT_SKIN_ID])))
    }

    async fn update_account(
        &self,
        id: AccountId,
        changes: &AccountChanges,
    ) -> Result<(), GatewayError> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE accounts SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(nickname) = &changes.nickname {
                set.push("nickname = ").push_bind_unseparated(nickname.clone());
            }
            if let Some(email) = &changes.email {
                set.push("email = ").push_bind_unseparated(email.clone());
            }
            if let Some(hash) = &changes.password_hash {
                set.push("password = ").push_bind_unseparated(hash.clone());
            }
        }
        qb.push(" WHERE account_id = ").push_bind(id);

        let res = qb.build().execute(&self.pool).await.map_err(classify)?;
        if res.rows_affected() == 0 {
            return Err(GatewayError::NotFound(Entity::Account));
        }
        Ok(())
    }

    async fn get_account(&self, id: AccountId, private: bool) -> Result<Account, GatewayError> {
        let row = self.fetch_row(id).await?;
        let skins = if private { Some(self.owned_list(id).await?) } else { None };
        Ok(row.into_account(skins))
    }

    async fn get_account_by_nickname(&self, nickname: &str) -> Result<Account, GatewayError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE nickname = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(nickname)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(GatewayError::NotFound(Entity::Account))?;
        Ok(row.into_account(None))
    }

    async fn get_credentials_by_email(&self, email: &str) -> Result<Credentials, GatewayError> {
        sqlx::query_as::<_, Credentials>(
            r#"
            SELECT account_id, password
              FROM accounts
             WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GatewayError::NotFound(Entity::Account))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, GatewayError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM accounts WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn nickname_exists(&self, nickname: &str) -> Result<bool, GatewayError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM accounts WHERE nickname = $1)",
        )
        .bind(nickname)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count_accounts(&self) -> Result<i64, GatewayError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn set_avatar(&self, id: AccountId, path: Option<&str>) -> Result<(), GatewayError> {
        let res = sqlx::query(
            r#"
            UPDATE accounts
               SET avatar = $2
             WHERE account_id = $1
            "#,
        )
        .bind(id)
        .bind(path)
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            return Err(GatewayError::NotFound(Entity::Account));
        }
        Ok(())
    }

    async fn list_skins(&self) -> Result<Vec<Skin>, GatewayError> {
        let skins = sqlx::query_as::<_, Skin>(
            "SELECT skin_id, skin_name, cost FROM skins ORDER BY skin_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(skins)
    }

    async fn get_skin(&self, id: SkinId) -> Result<Skin, GatewayError> {
        sqlx::query_as::<_, Skin>("SELECT skin_id, skin_name, cost FROM skins WHERE skin_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(GatewayError::NotFound(Entity::Skin))
    }

    async fn owned_skins(&self, account: AccountId) -> Result<BTreeSet<SkinId>, GatewayError> {
        Ok(self.owned_list(account).await?.into_iter().collect())
    }

    async fn wallet(&self, account: AccountId) -> Result<Wallet, GatewayError> {
        let (coins, skin) = sqlx::query_as::<_, (i64, Option<SkinId>)>(
            "SELECT coins, skin FROM accounts WHERE account_id = $1",
        )
        .bind(account)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GatewayError::NotFound(Entity::Account))?;

        Ok(Wallet { coins, equipped: SkinChoice::from_column(skin) })
    }

    async fn purchase_skin(
        &self,
        account: AccountId,
        skin: &Skin,
    ) -> Result<PurchaseOutcome, GatewayError> {
        let mut tx = self.pool.begin().await?;

        // Concurrent buyers of the same pair serialize on the primary key;
        // the loser inserts nothing and pays nothing.
        let inserted = sqlx::query(
            r#"
            INSERT INTO purchased_skins (account_id, skin_id)
            VALUES ($1, $2)
            ON CONFLICT (account_id, skin_id) DO NOTHING
            "#,
        )
        .bind(account)
        .bind(skin.id)
        .execute(&mut *tx)
        .await
        .map_err(classify)?
        .rows_affected();

        if inserted == 0 {
            return Ok(PurchaseOutcome::AlreadyOwned);
        }

        if skin.cost != 0 {
            adjust_coins_on(&mut *tx, account, -skin.cost).await?;
        }

        tx.commit().await?;
        Ok(PurchaseOutcome::Purchased)
    }

    async fn adjust_coins(&self, account: AccountId, delta: i64) -> Result<(), GatewayError> {
        let mut conn = self.pool.acquire().await?;
        adjust_coins_on(&mut *conn, account, delta).await
    }

    async fn equip_skin(&self, account: AccountId, choice: SkinChoice) -> Result<(), GatewayError> {
        let res = sqlx::query(
            r#"
            UPDATE accounts
               SET skin = $1
             WHERE account_id = $2
            "#,
        )
        .bind(choice.column())
        .bind(account)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        if res.rows_affected() == 0 {
            return Err(GatewayError::NotFound(Entity::Account));
        }
        Ok(())
    }

    async fn list_by_record(&self, limit: i64, offset: i64) -> Result<Vec<Position>, GatewayError> {
        let rows = sqlx::query_as::<_, Position>(
            r#"
            SELECT account_id, nickname, record
              FROM accounts
             ORDER BY record DESC, account_id ASC
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

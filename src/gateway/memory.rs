//! In-memory [`Gateway`] for service tests. Counts reads and writes so tests
//! can assert that a code path issued no query, and can be switched into a
//! failing mode to simulate a lost database.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::async_trait;
use tokio::sync::{Barrier, Mutex};

use super::{Entity, Gateway, GatewayError};
use crate::profile::repo_types::{
    Account, AccountChanges, AccountId, Credentials, NewAccount, PrivateDetails, Stats,
};
use crate::scoreboard::services::Position;
use crate::store::repo_types::{
    PurchaseOutcome, Skin, SkinChoice, SkinId, Wallet, DEFAULT_SKIN_ID, STARTING_COINS,
};

#[derive(Debug, Clone)]
pub struct StoredAccount {
    pub email: String,
    pub password_hash: String,
    pub nickname: String,
    pub avatar: Option<String>,
    pub stats: Stats,
    pub coins: i64,
    pub skin: SkinChoice,
    pub owned: BTreeSet<SkinId>,
}

#[derive(Default)]
struct Tables {
    next_id: AccountId,
    accounts: BTreeMap<AccountId, StoredAccount>,
    skins: BTreeMap<SkinId, Skin>,
}

#[derive(Default)]
pub struct MemoryGateway {
    tables: Mutex<Tables>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    unavailable: AtomicBool,
    purchased: AtomicUsize,
    already_owned: AtomicUsize,
    wallet_gate: std::sync::Mutex<Option<Arc<Barrier>>>,
}

impl MemoryGateway {
    /// Catalog: the default skin plus `crimson` (50) and `emerald` (100).
    pub fn new() -> Self {
        Self::with_skins(vec![
            Skin { id: DEFAULT_SKIN_ID, name: "default".into(), cost: 0 },
            Skin { id: 1, name: "crimson".into(), cost: 50 },
            Skin { id: 2, name: "emerald".into(), cost: 100 },
        ])
    }

    pub fn with_skins(skins: Vec<Skin>) -> Self {
        let gw = Self::default();
        {
            let mut t = gw.tables.try_lock().expect("fresh mutex");
            t.next_id = 1;
            t.skins = skins.into_iter().map(|s| (s.id, s)).collect();
        }
        gw
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// `(Purchased, AlreadyOwned)` outcomes reported by `purchase_skin`.
    pub fn purchase_outcomes(&self) -> (usize, usize) {
        (self.purchased.load(Ordering::SeqCst), self.already_owned.load(Ordering::SeqCst))
    }

    /// Every `wallet` read waits on `barrier` first, so concurrent callers
    /// can be lined up at the same point.
    pub fn gate_wallet(&self, barrier: Arc<Barrier>) {
        if let Ok(mut gate) = self.wallet_gate.lock() {
            *gate = Some(barrier);
        }
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    pub async fn snapshot(&self, id: AccountId) -> Option<StoredAccount> {
        self.tables.lock().await.accounts.get(&id).cloned()
    }

    /// Seed an account directly, bypassing validation.
    pub async fn seed(&self, nickname: &str, email: &str, coins: i64) -> AccountId {
        let mut t = self.tables.lock().await;
        let id = t.next_id;
        t.next_id += 1;
        t.accounts.insert(
            id,
            StoredAccount {
                email: email.into(),
                password_hash: String::new(),
                nickname: nickname.into(),
                avatar: None,
                stats: Stats::default(),
                coins,
                skin: SkinChoice::Default,
                owned: BTreeSet::from([DEFAULT_SKIN_ID]),
            },
        );
        id
    }

    pub async fn set_record(&self, id: AccountId, record: i32) {
        if let Some(a) = self.tables.lock().await.accounts.get_mut(&id) {
            a.stats.record = record;
        }
    }

    fn read(&self) -> Result<(), GatewayError> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn write(&self) -> Result<(), GatewayError> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn to_account(id: AccountId, a: &StoredAccount, private: bool) -> Account {
    Account {
        id,
        nickname: a.nickname.clone(),
        avatar: a.avatar.clone(),
        stats: a.stats,
        equipped: a.skin,
        private: private.then(|| PrivateDetails {
            email: a.email.clone(),
            coins: a.coins,
            skins: a.owned.iter().copied().collect(),
        }),
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn create_account(&self, new: &NewAccount) -> Result<Account, GatewayError> {
        self.write()?;
        let mut t = self.tables.lock().await;
        if new.email.is_empty() || new.nickname.is_empty() || new.password_hash.is_empty() {
            return Err(GatewayError::MissingRequiredField);
        }
        if t.accounts.values().any(|a| a.email == new.email) {
            return Err(GatewayError::DuplicateEmail);
        }
        if t.accounts.values().any(|a| a.nickname == new.nickname) {
            return Err(GatewayError::DuplicateNickname);
        }
        let id = t.next_id;
        t.next_id += 1;
        let stored = StoredAccount {
            email: new.email.clone(),
            password_hash: new.password_hash.clone(),
            nickname: new.nickname.clone(),
            avatar: None,
            stats: Stats::default(),
            coins: STARTING_COINS,
            skin: SkinChoice::Default,
            owned: BTreeSet::from([DEFAULT_SKIN_ID]),
        };
        let account = to_account(id, &stored, true);
        t.accounts.insert(id, stored);
        Ok(account)
    }

    async fn update_account(
        &self,
        id: AccountId,
        changes: &AccountChanges,
    ) -> Result<(), GatewayError> {
        if changes.is_empty() {
            return Ok(());
        }
        self.write()?;
        let mut t = self.tables.lock().await;
        if let Some(email) = &changes.email {
            if t.accounts.iter().any(|(k, a)| *k != id && &a.email == email) {
                return Err(GatewayError::DuplicateEmail);
            }
        }
        if let Some(nickname) = &changes.nickname {
            if t.accounts.iter().any(|(k, a)| *k != id && &a.nickname == nickname) {
                return Err(GatewayError::DuplicateNickname);
            }
        }
        let a = t.accounts.get_mut(&id).ok_or(GatewayError::NotFound(Entity::Account))?;
        if let Some(nickname) = &changes.nickname {
            a.nickname = nickname.clone();
        }
        if let Some(email) = &changes.email {
            a.email = email.clone();
        }
        if let Some(hash) = &changes.password_hash {
            a.password_hash = hash.clone();
        }
        Ok(())
    }

    async fn get_account(&self, id: AccountId, private: bool) -> Result<Account, GatewayError> {
        self.read()?;
        let t = self.tables.lock().await;
        t.accounts
            .get(&id)
            .map(|a| to_account(id, a, private))
            .ok_or(GatewayError::NotFound(Entity::Account))
    }

    async fn get_account_by_nickname(&self, nickname: &str) -> Result<Account, GatewayError> {
        self.read()?;
        let t = self.tables.lock().await;
        t.accounts
            .iter()
            .find(|(_, a)| a.nickname == nickname)
            .map(|(id, a)| to_account(*id, a, false))
            .ok_or(GatewayError::NotFound(Entity::Account))
    }

    async fn get_credentials_by_email(&self, email: &str) -> Result<Credentials, GatewayError> {
        self.read()?;
        let t = self.tables.lock().await;
        t.accounts
            .iter()
            .find(|(_, a)| a.email == email)
            .map(|(id, a)| Credentials {
                id: *id,
                password_hash: a.password_hash.clone(),
            })
            .ok_or(GatewayError::NotFound(Entity::Account))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, GatewayError> {
        self.read()?;
        Ok(self.tables.lock().await.accounts.values().any(|a| a.email == email))
    }

    async fn nickname_exists(&self, nickname: &str) -> Result<bool, GatewayError> {
        self.read()?;
        Ok(self.tables.lock().await.accounts.values().any(|a| a.nickname == nickname))
    }

    async fn count_accounts(&self) -> Result<i64, GatewayError> {
        self.read()?;
        Ok(self.tables.lock().await.accounts.len() as i64)
    }

    async fn set_avatar(&self, id: AccountId, path: Option<&str>) -> Result<(), GatewayError> {
        self.write()?;
        let mut t = self.tables.lock().await;
        let a = t.accounts.get_mut(&id).ok_or(GatewayError::NotFound(Entity::Account))?;
        a.avatar = path.map(str::to_owned);
        Ok(())
    }

    async fn list_skins(&self) -> Result<Vec<Skin>, GatewayError> {
        self.read()?;
        Ok(self.tables.lock().await.skins.values().cloned().collect())
    }

    async fn get_skin(&self, id: SkinId) -> Result<Skin, GatewayError> {
        self.read()?;
        let t = self.tables.lock().await;
        t.skins.get(&id).cloned().ok_or(GatewayError::NotFound(Entity::Skin))
    }

    async fn owned_skins(&self, account: AccountId) -> Result<BTreeSet<SkinId>, GatewayError> {
        self.read()?;
        let t = self.tables.lock().await;
        Ok(t.accounts.get(&account).map(|a| a.owned.clone()).unwrap_or_default())
    }

    async fn wallet(&self, account: AccountId) -> Result<Wallet, GatewayError> {
        let gate = self.wallet_gate.lock().ok().and_then(|g| g.clone());
        if let Some(barrier) = gate {
            barrier.wait().await;
        }
        self.read()?;
        let t = self.tables.lock().await;
        t.accounts
            .get(&account)
            .map(|a| Wallet { coins: a.coins, equipped: a.skin })
            .ok_or(GatewayError::NotFound(Entity::Account))
    }

    async fn purchase_skin(
        &self,
        account: AccountId,
        skin: &Skin,
    ) -> Result<PurchaseOutcome, GatewayError> {
        self.write()?;
        let mut t = self.tables.lock().await;
        if !t.skins.contains_key(&skin.id) {
            return Err(GatewayError::NotFound(Entity::Skin));
        }
        let a = t.accounts.get_mut(&account).ok_or(GatewayError::NotFound(Entity::Account))?;
        if a.owned.contains(&skin.id) {
            self.already_owned.fetch_add(1, Ordering::SeqCst);
            return Ok(PurchaseOutcome::AlreadyOwned);
        }
        if a.coins < skin.cost {
            return Err(GatewayError::InsufficientFunds);
        }
        a.owned.insert(skin.id);
        a.coins -= skin.cost;
        self.purchased.fetch_add(1, Ordering::SeqCst);
        Ok(PurchaseOutcome::Purchased)
    }

    async fn adjust_coins(&self, account: AccountId, delta: i64) -> Result<(), GatewayError> {
        self.write()?;
        let mut t = self.tables.lock().await;
        let a = t.accounts.get_mut(&account).ok_or(GatewayError::NotFound(Entity::Account))?;
        if a.coins + delta < 0 {
            return Err(GatewayError::InsufficientFunds);
        }
        a.coins += delta;
        Ok(())
    }

    async fn equip_skin(&self, account: AccountId, choice: SkinChoice) -> Result<(), GatewayError> {
        self.write()?;
        let mut t = self.tables.lock().await;
        let a = t.accounts.get_mut(&account).ok_or(GatewayError::NotFound(Entity::Account))?;
        a.skin = choice;
        Ok(())
    }

    async fn list_by_record(&self, limit: i64, offset: i64) -> Result<Vec<Position>, GatewayError> {
        self.read()?;
        let t = self.tables.lock().await;
        let mut rows: Vec<Position> = t
            .accounts
            .iter()
            .map(|(id, a)| Position {
                id: *id,
                nickname: a.nickname.clone(),
                record: a.stats.record,
            })
            .collect();
        rows.sort_by(|a, b| b.record.cmp(&a.record).then(a.id.cmp(&b.id)));
        Ok(rows
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }
}

mod tests {
    use super::*;

    fn new_account(nickname: &str, email: &str) -> NewAccount {
        NewAccount {
            email: email.into(),
            password_hash: "hash".into(),
            nickname: nickname.into(),
        }
    }

    #[tokio::test]
    async fn create_grants_default_skin_and_starting_coins() {
        let gw = MemoryGateway::new();
        let account = gw.create_account(&new_account("Nick", "nick@example.com")).await.unwrap();
        let private = account.private.unwrap();
        assert_eq!(private.coins, STARTING_COINS);
        assert_eq!(private.skins, vec![DEFAULT_SKIN_ID]);
    }

    #[tokio::test]
    async fn purchase_twice_charges_once() {
        let gw = MemoryGateway::new();
        let id = gw.seed("Nick", "nick@example.com", 100).await;
        let skin = gw.get_skin(1).await.unwrap();

        assert_eq!(gw.purchase_skin(id, &skin).await.unwrap(), PurchaseOutcome::Purchased);
        assert_eq!(gw.purchase_skin(id, &skin).await.unwrap(), PurchaseOutcome::AlreadyOwned);
        assert_eq!(gw.wallet(id).await.unwrap().coins, 50);
    }

    #[tokio::test]
    async fn adjust_coins_never_goes_negative() {
        let gw = MemoryGateway::new();
        let id = gw.seed("Nick", "nick@example.com", 10).await;
        assert!(matches!(gw.adjust_coins(id, -11).await, Err(GatewayError::InsufficientFunds)));
        gw.adjust_coins(id, 5).await.unwrap();
        assert_eq!(gw.wallet(id).await.unwrap().coins, 15);
    }

    #[tokio::test]
    async fn unavailable_mode_fails_every_call() {
        let gw = MemoryGateway::new();
        gw.set_unavailable(true);
        assert!(matches!(gw.count_accounts().await, Err(GatewayError::Unavailable(_))));
        assert_eq!(gw.reads(), 0);
    }
}

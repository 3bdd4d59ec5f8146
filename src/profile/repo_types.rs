use serde::Serialize;
use sqlx::FromRow;

use crate::store::repo_types::{SkinChoice, SkinId};

/// Assigned by the database on creation, never reused.
pub type AccountId = i64;

/// Game results. Written by the match service, only read here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct Stats {
    pub record: i32,
    pub win: i32,
    pub draws: i32,
    pub loss: i32,
}

/// Fields only the account owner gets to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrivateDetails {
    pub email: String,
    pub coins: i64,
    pub skins: Vec<SkinId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub nickname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub stats: Stats,
    #[serde(rename = "current_skin")]
    pub equipped: SkinChoice,
    #[serde(flatten)]
    pub private: Option<PrivateDetails>,
}

/// Login lookup result. Never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct Credentials {
    #[sqlx(rename = "account_id")]
    pub id: AccountId,
    #[sqlx(rename = "password")]
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub nickname: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

impl AccountChanges {
    pub fn is_empty(&self) -> bool {
        self.nickname.is_none() && self.email.is_none() && self.password_hash.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(private: Option<PrivateDetails>) -> Account {
        Account {
            id: 42,
            nickname: "Nick".into(),
            avatar: None,
            stats: Stats { record: 100, win: 3, draws: 1, loss: 2 },
            equipped: SkinChoice::Default,
            private,
        }
    }

    #[test]
    fn public_account_hides_private_fields() {
        let json = serde_json::to_value(account(None)).unwrap();
        assert_eq!(json["id"], 42);
        assert_eq!(json["record"], 100);
        assert_eq!(json["current_skin"], 0);
        assert!(json.get("email").is_none());
        assert!(json.get("coins").is_none());
        assert!(json.get("skins").is_none());
        assert!(json.get("avatar").is_none());
    }

    #[test]
    fn private_account_flattens_details() {
        let json = serde_json::to_value(account(Some(PrivateDetails {
            email: "nick@example.com".into(),
            coins: 40,
            skins: vec![0, 7],
        })))
        .unwrap();
        assert_eq!(json["email"], "nick@example.com");
        assert_eq!(json["coins"], 40);
        assert_eq!(json["skins"], serde_json::json!([0, 7]));
    }

    #[test]
    fn empty_changes() {
        assert!(AccountChanges::default().is_empty());
        let changes = AccountChanges { nickname: Some("Nick".into()), ..Default::default() };
        assert!(!changes.is_empty());
    }
}

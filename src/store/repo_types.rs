use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type SkinId = i64;

/// Catalog id of the free skin every account owns from registration.
pub const DEFAULT_SKIN_ID: SkinId = 0;

/// Coin balance granted on registration.
pub const STARTING_COINS: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Skin {
    #[sqlx(rename = "skin_id")]
    pub id: SkinId,
    #[sqlx(rename = "skin_name")]
    pub name: String,
    pub cost: i64,
}

/// The skin an account wears. On the wire and in requests the default skin
/// is id `0`; in the database it is a NULL `skin` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SkinId", into = "SkinId")]
pub enum SkinChoice {
    Default,
    Skin(SkinId),
}

impl SkinChoice {
    pub fn id(self) -> SkinId {
        match self {
            SkinChoice::Default => DEFAULT_SKIN_ID,
            SkinChoice::Skin(id) => id,
        }
    }

    pub fn from_column(column: Option<SkinId>) -> Self {
        column.map_or(SkinChoice::Default, SkinChoice::from)
    }

    pub fn column(self) -> Option<SkinId> {
        match self {
            SkinChoice::Default => None,
            SkinChoice::Skin(id) => Some(id),
        }
    }
}

impl From<SkinId> for SkinChoice {
    fn from(id: SkinId) -> Self {
        if id == DEFAULT_SKIN_ID {
            SkinChoice::Default
        } else {
            SkinChoice::Skin(id)
        }
    }
}

impl From<SkinChoice> for SkinId {
    fn from(choice: SkinChoice) -> Self {
        choice.id()
    }
}

/// Coin balance plus the equipped skin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wallet {
    pub coins: i64,
    pub equipped: SkinChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Purchased,
    AlreadyOwned,
}

use serde::{Deserialize, Serialize};

use super::repo_types::{Skin, SkinId};

#[derive(Debug, Default, Deserialize)]
pub struct SkinQuery {
    pub id: Option<SkinId>,
}

/// Body of skin purchase and equip requests.
#[derive(Debug, Deserialize)]
pub struct SkinRequest {
    pub skin: SkinId,
}

#[derive(Debug, Serialize)]
pub struct AllSkins {
    pub skins: Vec<Skin>,
}

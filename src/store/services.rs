use tracing::{debug, info, warn};

use super::repo_types::{PurchaseOutcome, Skin, SkinChoice, SkinId};
use crate::error::AppError;
use crate::gateway::Gateway;
use crate::profile::repo_types::AccountId;

pub async fn list_skins(gw: &dyn Gateway) -> Result<Vec<Skin>, AppError> {
    Ok(gw.list_skins().await?)
}

pub async fn get_skin(gw: &dyn Gateway, id: SkinId) -> Result<Skin, AppError> {
    Ok(gw.get_skin(id).await?)
}

/// Buying a skin the account already owns succeeds without charging.
pub async fn purchase(
    gw: &dyn Gateway,
    account: AccountId,
    skin_id: SkinId,
) -> Result<(), AppError> {
    if gw.owned_skins(account).await?.contains(&skin_id) {
        debug!(account_id = account, skin_id, "skin already owned");
        return Ok(());
    }

    let skin = gw.get_skin(skin_id).await?;
    let wallet = gw.wallet(account).await?;
    if wallet.coins < skin.cost {
        warn!(
            account_id = account,
            skin_id,
            coins = wallet.coins,
            cost = skin.cost,
            "not enough coins"
        );
        return Err(AppError::InsufficientFunds);
    }

    match gw.purchase_skin(account, &skin).await? {
        PurchaseOutcome::Purchased => {
            info!(account_id = account, skin_id, cost = skin.cost, "skin purchased")
        }
        // a concurrent request for the same skin got there first
        PurchaseOutcome::AlreadyOwned => {
            debug!(account_id = account, skin_id, "skin granted concurrently")
        }
    }
    Ok(())
}

/// Skin `0` is the default skin, which every account owns.
pub async fn equip(
    gw: &dyn Gateway,
    account: AccountId,
    skin_id: SkinId,
) -> Result<(), AppError> {
    let choice = SkinChoice::from(skin_id);
    let wallet = gw.wallet(account).await?;
    if wallet.equipped == choice {
        return Ok(());
    }

    if let SkinChoice::Skin(id) = choice {
        if !gw.owned_skins(account).await?.contains(&id) {
            warn!(account_id = account, skin_id = id, "equip of unowned skin");
            return Err(AppError::SkinNotOwned);
        }
    }

    gw.equip_skin(account, choice).await?;
    info!(account_id = account, skin_id, "skin equipped");
    Ok(())
}

use std::path::Path;

use bytes::Bytes;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::{info, warn};

use super::dto::ProfileForm;
use super::repo_types::{Account, AccountChanges, AccountId, NewAccount};
use super::validation::{
    normalize_email, only_conflicts, validate_email, validate_nickname, validate_password,
    validate_registration, FieldError,
};
use crate::auth::password::hash_password;
use crate::auth::sessions::SessionStore;
use crate::error::AppError;
use crate::gateway::Gateway;
use crate::storage::BlobStorage;

#[derive(Debug)]
pub struct Registered {
    pub account: Account,
    pub token: String,
}

/// An uploaded file as it came off the wire.
#[derive(Debug)]
pub struct AvatarUpload {
    pub body: Bytes,
    pub filename: String,
    pub content_type: String,
}

/// Uniqueness failures alone are a conflict; any format error makes the
/// whole list a validation failure.
fn reject(errors: Vec<FieldError>) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else if only_conflicts(&errors) {
        Err(AppError::Conflict(errors))
    } else {
        Err(AppError::ValidationFailed(errors))
    }
}

pub async fn register(
    gw: &dyn Gateway,
    sessions: &dyn SessionStore,
    form: &ProfileForm,
) -> Result<Registered, AppError> {
    let email = normalize_email(&form.email);
    if form.nickname.is_empty() || email.is_empty() || form.password.is_empty() {
        return Err(AppError::IncompleteRequest(
            "nickname, email and password are required",
        ));
    }

    reject(validate_registration(gw, &form.nickname, &email, &form.password).await?)?;

    let password_hash = hash_password(&form.password).map_err(AppError::Internal)?;
    let account = gw
        .create_account(&NewAccount {
            email,
            password_hash,
            nickname: form.nickname.clone(),
        })
        .await?;
    let token = sessions.create(account.id).await?;

    info!(account_id = account.id, nickname = %account.nickname, "account registered");
    Ok(Registered { account, token })
}

/// Only non-empty fields are validated and written.
pub async fn update_profile(
    gw: &dyn Gateway,
    id: AccountId,
    form: &ProfileForm,
) -> Result<(), AppError> {
    let email = normalize_email(&form.email);
    if form.nickname.is_empty() && email.is_empty() && form.password.is_empty() {
        return Ok(());
    }

    let mut errors = Vec::new();
    if !form.nickname.is_empty() {
        errors.extend(validate_nickname(gw, &form.nickname).await?);
    }
    if !email.is_empty() {
        errors.extend(validate_email(gw, &email).await?);
    }
    if !form.password.is_empty() {
        errors.extend(validate_password(&form.password));
    }
    reject(errors)?;

    let password_hash = if form.password.is_empty() {
        None
    } else {
        Some(hash_password(&form.password).map_err(AppError::Internal)?)
    };
    let changes = AccountChanges {
        nickname: Some(form.nickname.clone()).filter(|n| !n.is_empty()),
        email: Some(email).filter(|e| !e.is_empty()),
        password_hash,
    };
    gw.update_account(id, &changes).await?;

    info!(
        account_id = id,
        nickname = changes.nickname.is_some(),
        email = changes.email.is_some(),
        password = changes.password_hash.is_some(),
        "profile updated"
    );
    Ok(())
}

/// Unguessable name for a stored avatar, keeping a sane extension.
pub fn avatar_filename(account: AccountId, original: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(OffsetDateTime::now_utc().unix_timestamp_nanos().to_be_bytes());
    hasher.update(rand::random::<u64>().to_be_bytes());
    hasher.update(account.to_be_bytes());
    hasher.update(original.as_bytes());
    let digest = hasher.finalize();
    let stem = digest[..8].iter().map(|b| format!("{b:02x}")).collect::<String>();

    match extension(original) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

fn extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?;
    let ok = !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    ok.then(|| ext.to_ascii_lowercase())
}

/// Writes the blob first, then records its path. A failed record update
/// leaves the blob behind.
pub async fn attach_avatar(
    gw: &dyn Gateway,
    storage: &dyn BlobStorage,
    dir: &str,
    id: AccountId,
    upload: AvatarUpload,
) -> Result<String, AppError> {
    let filename = avatar_filename(id, &upload.filename);
    let path = storage
        .save(dir, &filename, upload.body, &upload.content_type)
        .await
        .map_err(AppError::Storage)?;

    if let Err(e) = gw.set_avatar(id, Some(&path)).await {
        warn!(account_id = id, path = %path, error = %e, "avatar blob orphaned");
        return Err(e.into());
    }

    info!(account_id = id, path = %path, "avatar attached");
    Ok(path)
}

pub async fn detach_avatar(gw: &dyn Gateway, id: AccountId) -> Result<(), AppError> {
    gw.set_avatar(id, None).await?;
    info!(account_id = id, "avatar detached");
    Ok(())
}

/// True when the nickname or the email already belongs to someone.
pub async fn check_availability(
    gw: &dyn Gateway,
    nickname: Option<&str>,
    email: Option<&str>,
) -> Result<bool, AppError> {
    let nickname = nickname.filter(|n| !n.is_empty());
    let email = email.map(normalize_email).filter(|e| !e.is_empty());
    if nickname.is_none() && email.is_none() {
        return Err(AppError::IncompleteRequest("nickname or email is required"));
    }

    if let Some(nickname) = nickname {
        if gw.nickname_exists(nickname).await? {
            return Ok(true);
        }
    }
    if let Some(email) = email {
        if gw.email_exists(&email).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

pub async fn public_profile(gw: &dyn Gateway, id: AccountId) -> Result<Account, AppError> {
    Ok(gw.get_account(id, false).await?)
}

pub async fn profile_by_nickname(gw: &dyn Gateway, nickname: &str) -> Result<Account, AppError> {
    Ok(gw.get_account_by_nickname(nickname).await?)
}

/// Includes email, coins and owned skins.
pub async fn own_profile(gw: &dyn Gateway, id: AccountId) -> Result<Account, AppError> {
    Ok(gw.get_account(id, true).await?)
}

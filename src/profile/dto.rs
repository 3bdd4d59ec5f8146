use serde::{Deserialize, Serialize};

use super::repo_types::{Account, AccountId};

/// Body of `POST /profile` and `PUT /profile`. Empty strings mean "not supplied".
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    pub id: Option<AccountId>,
    pub nickname: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckQuery {
    pub nickname: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Availability {
    pub taken: bool,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub session_id: String,
    pub profile: Account,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar: String,
}

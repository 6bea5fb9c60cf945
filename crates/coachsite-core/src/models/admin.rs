use serde::{Deserialize, Serialize};

/// The signed-in administrator as returned by login and verify.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
}

impl AdminProfile {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// `data` of a successful `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub token: String,
    pub admin: AdminProfile,
}

/// `data` of a successful `GET /auth/verify`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyData {
    pub admin: AdminProfile,
}

use serde::{Deserialize, Serialize};

use crate::contract::{Account, NewAccount};

/// Account as returned to callers. The password is never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountDto {
    pub name: String,
    pub email: String,
    /// "true" or "false".
    pub activated: String,
    pub sam: String,
}

impl From<Account> for AccountDto {
    fn from(a: Account) -> Self {
        Self {
            name: a.name,
            email: a.email,
            activated: a.activated.to_string(),
            sam: a.sam,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddAccountReq {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(
        default,
        deserialize_with = "plugkit_bus::message::activated_flag::deserialize"
    )]
    pub activated: Option<bool>,
    /// Accepted for compatibility; ignored.
    #[serde(default)]
    pub sam: String,
}

impl From<AddAccountReq> for NewAccount {
    fn from(r: AddAccountReq) -> Self {
        Self {
            name: r.name,
            email: r.email,
            password: r.password,
            activated: r.activated,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangePasswordReq {
    #[serde(default)]
    pub password: String,
}

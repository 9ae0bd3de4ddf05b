/// Authoritative account record, keyed by email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub email: String,
    pub name: String,
    pub password: String,
    pub activated: bool,
    /// Reserved for directory integrations; always empty today.
    pub sam: String,
}

/// Data for creating an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    /// `false` when omitted.
    pub activated: Option<bool>,
}

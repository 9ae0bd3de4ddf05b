//! Wire messages exchanged between the authority and its followers.
//!
//! Field names are PascalCase on the wire so that payloads stay readable by
//! every participant already bound to the exchange.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// The state change a [`Command`] asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CommandMethod {
    Create,
    Delete,
    ChangePassword,
    Disable,
    /// Anything a newer or foreign publisher may send.
    Other(String),
}

impl CommandMethod {
    pub fn as_str(&self) -> &str {
        match self {
            CommandMethod::Create => "Create",
            CommandMethod::Delete => "Delete",
            CommandMethod::ChangePassword => "ChangePassword",
            CommandMethod::Disable => "Disable",
            CommandMethod::Other(raw) => raw,
        }
    }

    pub fn requires_password(&self) -> bool {
        matches!(self, CommandMethod::Create | CommandMethod::ChangePassword)
    }
}

impl From<String> for CommandMethod {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            // "Add" is what older authorities put on the wire for a create.
            "Create" | "Add" => CommandMethod::Create,
            "Delete" => CommandMethod::Delete,
            "ChangePassword" => CommandMethod::ChangePassword,
            "Disable" => CommandMethod::Disable,
            _ => CommandMethod::Other(raw),
        }
    }
}

impl From<CommandMethod> for String {
    fn from(method: CommandMethod) -> Self {
        match method {
            CommandMethod::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CommandMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Violations of the command invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("email is required")]
    EmptyEmail,
    #[error("password is required for {0}")]
    MissingPassword(CommandMethod),
}

/// A requested state change for one account, keyed by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Command {
    pub method: CommandMethod,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, with = "activated_flag")]
    pub activated: Option<bool>,
    #[serde(default)]
    pub sam: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl Command {
    fn new(method: CommandMethod, email: impl Into<String>) -> Self {
        Self {
            method,
            name: String::new(),
            email: email.into(),
            activated: None,
            sam: String::new(),
            password: None,
            correlation_id: None,
        }
    }

    pub fn create(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        activated: bool,
    ) -> Self {
        Self {
            name: name.into(),
            password: Some(password.into()),
            activated: Some(activated),
            ..Self::new(CommandMethod::Create, email)
        }
    }

    pub fn delete(email: impl Into<String>) -> Self {
        Self::new(CommandMethod::Delete, email)
    }

    pub fn change_password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..Self::new(CommandMethod::ChangePassword, email)
        }
    }

    pub fn disable(email: impl Into<String>) -> Self {
        Self {
            activated: Some(false),
            ..Self::new(CommandMethod::Disable, email)
        }
    }

    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        if self.email.trim().is_empty() {
            return Err(CommandError::EmptyEmail);
        }
        if self.method.requires_password()
            && !matches!(self.password.as_deref(), Some(p) if !p.is_empty())
        {
            return Err(CommandError::MissingPassword(self.method.clone()));
        }
        Ok(())
    }
}

/// The outcome of applying a [`Command`] on a follower.
///
/// An empty `err` means success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandResult {
    pub method: CommandMethod,
    #[serde(default)]
    pub err: String,
    #[serde(default)]
    pub plugin: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl CommandResult {
    pub fn success(command: &Command, plugin: impl Into<String>) -> Self {
        Self {
            method: command.method.clone(),
            err: String::new(),
            plugin: plugin.into(),
            email: command.email.clone(),
            correlation_id: command.correlation_id,
        }
    }

    pub fn failure(command: &Command, plugin: impl Into<String>, err: impl fmt::Display) -> Self {
        let mut err = err.to_string();
        if err.is_empty() {
            err = "unknown error".to_string();
        }
        Self {
            err,
            ..Self::success(command, plugin)
        }
    }

    pub fn is_success(&self) -> bool {
        self.err.is_empty()
    }

    pub fn error(&self) -> Option<&str> {
        (!self.err.is_empty()).then_some(self.err.as_str())
    }
}

/// `Activated` travels as the string "true"/"false"; an empty string means unset.
pub mod activated_flag {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<bool>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(match value {
            Some(true) => "true",
            Some(false) => "false",
            None => "",
        })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        match Option::<Flag>::deserialize(d)? {
            None => Ok(None),
            Some(Flag::Bool(b)) => Ok(Some(b)),
            Some(Flag::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "" => Ok(None),
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                other => Err(serde::de::Error::custom(format!(
                    "invalid Activated value '{other}'"
                ))),
            },
        }
    }
}

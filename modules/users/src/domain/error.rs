use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("user '{email}' not found")]
    NotFound { email: String },

    #[error("user email exists already")]
    EmailExists { email: String },

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn not_found(email: impl Into<String>) -> Self {
        Self::NotFound {
            email: email.into(),
        }
    }

    pub fn email_exists(email: impl Into<String>) -> Self {
        Self::EmailExists {
            email: email.into(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}

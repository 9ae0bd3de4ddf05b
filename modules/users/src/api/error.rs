use plugkit::{problem, PlugResponse};
use tracing::error;

use crate::domain::error::DomainError;

/// Map a domain error to a problem response for `instance`.
pub fn domain_error_response(e: &DomainError, instance: &str) -> PlugResponse {
    let p = match e {
        DomainError::NotFound { email } => {
            problem::not_found(format!("user '{email}' not found")).with_code("USER_NOT_FOUND")
        }
        DomainError::EmailExists { .. } => {
            problem::conflict(e.to_string()).with_code("USER_EMAIL_EXISTS")
        }
        DomainError::Validation { .. } => problem::bad_request(e.to_string()).with_code("VALIDATION"),
        DomainError::Database { message } => {
            error!(error = %message, "database failure");
            problem::internal_error("internal database error")
        }
    };
    PlugResponse::problem(p.with_instance(instance))
}

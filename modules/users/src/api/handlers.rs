use axum::http::StatusCode;
use plugkit::{problem, PlugRequest, PlugResponse};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::dto::{AccountDto, AddAccountReq, ChangePasswordReq};
use crate::api::error::domain_error_response;
use crate::domain::service::Service;

/// Path ids arrive percent-encoded (`a%40b.com`).
fn email_from(id: Option<String>) -> Option<String> {
    let raw = id?;
    let decoded = urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw);
    (!decoded.trim().is_empty()).then_some(decoded)
}

fn missing_email(req: &PlugRequest, action: &str) -> PlugResponse {
    PlugResponse::problem(
        problem::bad_request(format!("email needed to {action}")).with_instance(&req.url),
    )
}

pub async fn list_accounts(svc: Arc<Service>, req: PlugRequest, _id: Option<String>) -> PlugResponse {
    match svc.list_accounts().await {
        Ok(accounts) => {
            let body: Vec<AccountDto> = accounts.into_iter().map(AccountDto::from).collect();
            PlugResponse::json(StatusCode::OK, &body)
        }
        Err(e) => domain_error_response(&e, &req.url),
    }
}

pub async fn get_account(svc: Arc<Service>, req: PlugRequest, id: Option<String>) -> PlugResponse {
    let Some(email) = email_from(id) else {
        return missing_email(&req, "retrieve account information");
    };
    match svc.get_account(&email).await {
        Ok(account) => PlugResponse::json(StatusCode::OK, &AccountDto::from(account)),
        Err(e) => domain_error_response(&e, &req.url),
    }
}

pub async fn add_account(svc: Arc<Service>, req: PlugRequest, _id: Option<String>) -> PlugResponse {
    let body: AddAccountReq = match req.json() {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "invalid add request body");
            return PlugResponse::problem(
                problem::bad_request(format!("invalid JSON body: {e}")).with_instance(&req.url),
            );
        }
    };
    info!(email = %body.email, "add account requested");
    match svc.add_account(body.into()).await {
        Ok(_) => PlugResponse::accepted(),
        Err(e) => domain_error_response(&e, &req.url),
    }
}

pub async fn change_password(svc: Arc<Service>, req: PlugRequest, id: Option<String>) -> PlugResponse {
    let Some(email) = email_from(id) else {
        return missing_email(&req, "modify account");
    };
    let body: ChangePasswordReq = match req.json() {
        Ok(b) => b,
        Err(e) => {
            return PlugResponse::problem(
                problem::bad_request(format!("invalid JSON body: {e}")).with_instance(&req.url),
            )
        }
    };
    match svc.change_password(&email, &body.password).await {
        Ok(()) => PlugResponse::accepted(),
        Err(e) => domain_error_response(&e, &req.url),
    }
}

pub async fn disable_account(svc: Arc<Service>, req: PlugRequest, id: Option<String>) -> PlugResponse {
    let Some(email) = email_from(id) else {
        return missing_email(&req, "disable account");
    };
    match svc.disable_account(&email).await {
        Ok(()) => PlugResponse::accepted(),
        Err(e) => domain_error_response(&e, &req.url),
    }
}

pub async fn delete_account(svc: Arc<Service>, req: PlugRequest, id: Option<String>) -> PlugResponse {
    let Some(email) = email_from(id) else {
        return missing_email(&req, "delete account");
    };
    match svc.delete_account(&email).await {
        Ok(()) => PlugResponse::accepted(),
        Err(e) => domain_error_response(&e, &req.url),
    }
}

//! Direct provisioning surface that bypasses the broker.

use axum::http::{Method, StatusCode};
use plugkit::{problem, PlugRequest, PlugResponse, RouteTable};
use plugkit_bus::Command;
use serde::Deserialize;
use std::sync::Arc;

use crate::domain::applier::Applier;
use crate::domain::error::ApplyError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DirectReq {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub fn route_table() -> Result<RouteTable<Applier>, regex::Error> {
    RouteTable::new()
        .route("add", r"^/owncloud/add", Method::POST, add)?
        .route("delete", r"^/owncloud/delete", Method::POST, delete)?
        .route(
            "changepassword",
            r"^/owncloud/changepassword",
            Method::POST,
            change_password,
        )
}

fn parse(req: &PlugRequest) -> Result<DirectReq, PlugResponse> {
    req.json::<DirectReq>().map_err(|e| {
        PlugResponse::problem(
            problem::bad_request(format!("invalid JSON body: {e}")).with_instance(&req.url),
        )
    })
}

async fn run(applier: &Applier, command: Command, instance: &str) -> PlugResponse {
    match applier.apply(&command).await {
        Ok(()) => PlugResponse::empty(StatusCode::OK),
        Err(ApplyError::Invalid(e)) => {
            PlugResponse::problem(problem::bad_request(e.to_string()).with_instance(instance))
        }
        Err(e) => PlugResponse::problem(
            problem::Problem::new(StatusCode::BAD_GATEWAY, "Bad Gateway", e.to_string())
                .with_instance(instance),
        ),
    }
}

async fn add(applier: Arc<Applier>, req: PlugRequest, _id: Option<String>) -> PlugResponse {
    let body = match parse(&req) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let cmd = Command::create("", body.email, body.password, false);
    run(&applier, cmd, &req.url).await
}

async fn delete(applier: Arc<Applier>, req: PlugRequest, _id: Option<String>) -> PlugResponse {
    let body = match parse(&req) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    run(&applier, Command::delete(body.email), &req.url).await
}

async fn change_password(
    applier: Arc<Applier>,
    req: PlugRequest,
    _id: Option<String>,
) -> PlugResponse {
    let body = match parse(&req) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    run(&applier, Command::change_password(body.email, body.password), &req.url).await
}

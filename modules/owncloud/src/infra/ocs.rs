//! ownCloud OCS provisioning API client.

use async_trait::async_trait;
use plugkit::TracedClient;
use reqwest::Method;
use serde::Deserialize;
use std::time::Duration;

use crate::config::OwncloudConfig;
use crate::domain::error::ApplyError;
use crate::domain::ports::ExternalAccounts;

const USERS_PATH: &str = "ocs/v1.php/cloud/users";

#[derive(Debug, Deserialize)]
struct Envelope {
    ocs: Ocs,
}

#[derive(Debug, Deserialize)]
struct Ocs {
    meta: Meta,
}

#[derive(Debug, Deserialize)]
struct Meta {
    statuscode: u32,
    #[serde(default)]
    message: Option<String>,
}

pub struct OcsClient {
    http: TracedClient,
    users_url: String,
    admin_user: String,
    admin_password: String,
}

impl OcsClient {
    pub fn new(cfg: &OwncloudConfig) -> anyhow::Result<Self> {
        let base = url::Url::parse(&cfg.base_url)?;
        let users_url = format!("{}/{USERS_PATH}", base.as_str().trim_end_matches('/'));
        Ok(Self {
            http: TracedClient::with_timeout(Duration::from_secs(cfg.timeout_secs))?,
            users_url,
            admin_user: cfg.admin_user.clone(),
            admin_password: cfg.admin_password.clone(),
        })
    }

    fn user_url(&self, user_id: &str) -> String {
        format!("{}/{}", self.users_url, urlencoding::encode(user_id))
    }

    async fn call(
        &self,
        method: Method,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<(), ApplyError> {
        let mut builder = self
            .http
            .request(method, url)
            .query(&[("format", "json")])
            .basic_auth(&self.admin_user, Some(&self.admin_password))
            .header("OCS-APIRequest", "true");
        if !form.is_empty() {
            builder = builder.form(form);
        }
        let req = builder
            .build()
            .map_err(|e| ApplyError::Transport(e.to_string()))?;

        let resp = self
            .http
            .execute(req)
            .await
            .map_err(|e| ApplyError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ApplyError::Transport(e.to_string()))?;

        let envelope: Envelope = match serde_json::from_slice(&body) {
            Ok(env) => env,
            Err(_) if !status.is_success() => return Err(ApplyError::HttpStatus(status.as_u16())),
            Err(e) => return Err(ApplyError::Decode(e.to_string())),
        };
        match envelope.ocs.meta.statuscode {
            100 | 200 => Ok(()),
            code => Err(ApplyError::Rejected {
                status_code: code,
                message: envelope
                    .ocs
                    .meta
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "no message".to_string()),
            }),
        }
    }
}

#[async_trait]
impl ExternalAccounts for OcsClient {
    async fn create(&self, user_id: &str, password: &str) -> Result<(), ApplyError> {
        self.call(
            Method::POST,
            &self.users_url,
            &[("userid", user_id), ("password", password)],
        )
        .await
    }

    async fn delete(&self, user_id: &str) -> Result<(), ApplyError> {
        self.call(Method::DELETE, &self.user_url(user_id), &[]).await
    }

    async fn set_password(&self, user_id: &str, password: &str) -> Result<(), ApplyError> {
        self.call(
            Method::PUT,
            &self.user_url(user_id),
            &[("key", "password"), ("value", password)],
        )
        .await
    }
}

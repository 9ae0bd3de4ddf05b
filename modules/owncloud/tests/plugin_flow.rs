//! The owncloud plugin against a mock ownCloud and the in-memory broker.

use axum::http::{Method, StatusCode};
use futures::StreamExt;
use httpmock::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use owncloud::OwncloudPlugin;
use plugkit::{ConfigProvider, PlugRequest, Plugin, PluginCtx, PluginCtxBuilder};
use plugkit_bus::{
    Broker, Command, CommandMethod, CommandResult, DeliveryStream, MemoryBroker, Publisher,
    QueueBinding, JSON_CONTENT_TYPE,
};

const EXCHANGE: &str = "users_topic";

struct Sections(serde_json::Value);

impl ConfigProvider for Sections {
    fn get_plugin_config(&self, plugin_name: &str) -> Option<&serde_json::Value> {
        self.0.get(plugin_name)
    }
}

struct Harness {
    plugin: OwncloudPlugin,
    broker: Arc<MemoryBroker>,
    results: DeliveryStream,
    _token: CancellationToken,
}

async fn start(server: &MockServer) -> Harness {
    let broker = Arc::new(MemoryBroker::new());
    let token = CancellationToken::new();
    let config = Sections(serde_json::json!({
        "owncloud": {
            "base_url": server.url("/owncloud"),
            "admin_password": "secret",
            "durable_queue": false
        }
    }));
    let ctx: PluginCtx = PluginCtxBuilder::new(token.clone())
        .with_broker(broker.clone(), EXCHANGE)
        .with_config_provider(Arc::new(config))
        .build()
        .for_plugin("owncloud");

    let plugin = OwncloudPlugin::default();
    plugin.init(&ctx).await.unwrap();
    let results = broker
        .subscribe(QueueBinding::new(EXCHANGE, "*.users"))
        .await
        .unwrap();
    plugin.activate(&ctx).await.unwrap();

    Harness {
        plugin,
        broker,
        results,
        _token: token,
    }
}

fn ok_body() -> String {
    serde_json::json!({"ocs": {"meta": {"statuscode": 100, "message": ""}}}).to_string()
}

async fn next_result(h: &mut Harness) -> CommandResult {
    let delivery = timeout(Duration::from_secs(2), h.results.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(delivery.routing_key, "owncloud.users");
    serde_json::from_slice(&delivery.payload).unwrap()
}

#[tokio::test]
async fn create_command_is_applied_and_reported() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(POST).path("/owncloud/ocs/v1.php/cloud/users");
        then.status(200).body(ok_body());
    });
    let mut h = start(&server).await;

    let id = uuid::Uuid::new_v4();
    let cmd = Command::create("A", "a@b.com", "p", true).with_correlation_id(id);
    Publisher::new(h.broker.clone(), EXCHANGE)
        .publish_json("users.req", &cmd)
        .await
        .unwrap();

    let result = next_result(&mut h).await;
    assert!(result.is_success());
    assert_eq!(result.method, CommandMethod::Create);
    assert_eq!(result.plugin, "owncloud");
    assert_eq!(result.correlation_id, Some(id));
    m.assert();

    h.plugin.deactivate().await.unwrap();
}

#[tokio::test]
async fn malformed_command_is_skipped_without_result() {
    let server = MockServer::start();
    let mut h = start(&server).await;

    h.broker
        .publish(EXCHANGE, "users.req", b"{not json", JSON_CONTENT_TYPE)
        .await
        .unwrap();
    Publisher::new(h.broker.clone(), EXCHANGE)
        .publish_json("users.req", &Command::disable("a@b.com"))
        .await
        .unwrap();

    // The only result is for the well-formed command that followed.
    let result = next_result(&mut h).await;
    assert_eq!(result.method, CommandMethod::Disable);
    assert_eq!(result.error(), Some("unsupported method: Disable"));

    h.plugin.deactivate().await.unwrap();
}

#[tokio::test]
async fn direct_route_applies_synchronously() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(DELETE)
            .path("/owncloud/ocs/v1.php/cloud/users/alice");
        then.status(200).body(ok_body());
    });
    let h = start(&server).await;

    let req = PlugRequest::new(Method::POST, "/owncloud/delete")
        .with_json(&serde_json::json!({"Email": "alice"}));
    let resp = h.plugin.dispatch(req).await;
    assert_eq!(resp.status, StatusCode::OK);
    m.assert();

    h.plugin.deactivate().await.unwrap();
}

#[tokio::test]
async fn direct_route_maps_remote_failure_to_bad_gateway() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/owncloud/ocs/v1.php/cloud/users");
        then.status(503).body("maintenance");
    });
    let h = start(&server).await;

    let req = PlugRequest::new(Method::POST, "/owncloud/add")
        .with_json(&serde_json::json!({"Email": "a@b.com", "Password": "p"}));
    let resp = h.plugin.dispatch(req).await;
    assert_eq!(resp.status, StatusCode::BAD_GATEWAY);

    let bad = h
        .plugin
        .dispatch(PlugRequest::new(Method::POST, "/owncloud/add").with_body("nope"))
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    let other = h
        .plugin
        .dispatch(PlugRequest::new(Method::GET, "/api/users"))
        .await;
    assert_eq!(other.status, StatusCode::NOT_FOUND);

    h.plugin.deactivate().await.unwrap();
}

#[tokio::test]
async fn health_follows_broker_connection() {
    let server = MockServer::start();
    let h = start(&server).await;
    assert!(h.plugin.health_check().await.healthy);

    h.plugin.deactivate().await.unwrap();
    h.broker.close().await.unwrap();
    assert!(!h.plugin.health_check().await.healthy);
}

//! Service behavior and the spans it emits.

mod common;

use std::sync::Arc;
use tracing_test::traced_test;

use common::RecordingSink;
use plugkit_bus::CommandMethod;
use users::domain::error::DomainError;
use users::domain::service::Service;
use users::NewAccount;

fn new_account(email: &str) -> NewAccount {
    NewAccount {
        name: "Alice".to_string(),
        email: email.to_string(),
        password: "p".to_string(),
        activated: None,
    }
}

async fn service(sink: Arc<RecordingSink>) -> Service {
    Service::new(common::memory_repo().await, sink)
}

#[traced_test]
#[tokio::test]
async fn add_account_stores_then_announces_create() {
    let sink = Arc::new(RecordingSink::default());
    let svc = service(sink.clone()).await;

    let created = svc.add_account(new_account("a@b.com")).await.unwrap();
    assert!(!created.activated);

    let fetched = svc.get_account("a@b.com").await.unwrap();
    assert_eq!(fetched, created);

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, CommandMethod::Create);
    assert_eq!(sent[0].email, "a@b.com");
    assert_eq!(sent[0].password.as_deref(), Some("p"));
    assert_eq!(sent[0].activated, Some(false));

    assert!(logs_contain("users.service.add_account"));
    assert!(logs_contain("account created"));
}

#[tokio::test]
async fn duplicate_add_publishes_nothing() {
    let sink = Arc::new(RecordingSink::default());
    let svc = service(sink.clone()).await;

    svc.add_account(new_account("a@b.com")).await.unwrap();
    let err = svc.add_account(new_account("a@b.com")).await.unwrap_err();

    assert!(matches!(err, DomainError::EmailExists { .. }));
    assert_eq!(err.to_string(), "user email exists already");
    assert_eq!(sink.sent().len(), 1);
}

#[tokio::test]
async fn validation_rejects_missing_email_or_password() {
    let sink = Arc::new(RecordingSink::default());
    let svc = service(sink.clone()).await;

    let mut no_pw = new_account("a@b.com");
    no_pw.password.clear();
    assert!(matches!(
        svc.add_account(no_pw).await,
        Err(DomainError::Validation { field: "password", .. })
    ));
    assert!(matches!(
        svc.add_account(new_account(" ")).await,
        Err(DomainError::Validation { field: "email", .. })
    ));
    assert!(matches!(
        svc.change_password("a@b.com", "").await,
        Err(DomainError::Validation { .. })
    ));
    assert!(sink.sent().is_empty());
}

#[tokio::test]
async fn updates_on_missing_accounts_are_not_found() {
    let sink = Arc::new(RecordingSink::default());
    let svc = service(sink.clone()).await;

    assert!(matches!(
        svc.change_password("x@b.com", "n").await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(matches!(
        svc.disable_account("x@b.com").await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(sink.sent().is_empty());
}

#[tokio::test]
async fn delete_of_absent_account_still_announces() {
    let sink = Arc::new(RecordingSink::default());
    let svc = service(sink.clone()).await;

    svc.delete_account("x@b.com").await.unwrap();

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, CommandMethod::Delete);
    assert_eq!(sent[0].email, "x@b.com");
}

#[tokio::test]
async fn each_mutation_announces_its_command() {
    let sink = Arc::new(RecordingSink::default());
    let svc = service(sink.clone()).await;

    svc.add_account(new_account("a@b.com")).await.unwrap();
    svc.change_password("a@b.com", "n").await.unwrap();
    svc.disable_account("a@b.com").await.unwrap();
    assert!(!svc.get_account("a@b.com").await.unwrap().activated);
    svc.delete_account("a@b.com").await.unwrap();

    let methods: Vec<CommandMethod> = sink.sent().into_iter().map(|c| c.method).collect();
    assert_eq!(
        methods,
        vec![
            CommandMethod::Create,
            CommandMethod::ChangePassword,
            CommandMethod::Disable,
            CommandMethod::Delete
        ]
    );
}

#[traced_test]
#[tokio::test]
async fn publish_failure_is_logged_not_returned() {
    let sink = Arc::new(RecordingSink::failing());
    let svc = service(sink).await;

    svc.add_account(new_account("a@b.com")).await.unwrap();
    assert!(svc.get_account("a@b.com").await.is_ok());
    assert!(logs_contain("command publish failed"));
}

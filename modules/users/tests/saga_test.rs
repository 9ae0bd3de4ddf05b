//! Compensation of creates that a follower failed to apply.

mod common;

use std::sync::Arc;

use common::RecordingSink;
use plugkit_bus::{Command, CommandMethod, CommandResult};
use users::domain::compensator::{Compensator, Outcome};
use users::domain::repo::AccountsRepository;
use users::domain::service::Service;
use users::{Account, NewAccount};

fn alice() -> Account {
    Account {
        email: "a@b.com".to_string(),
        name: "Alice".to_string(),
        password: "p".to_string(),
        activated: false,
        sam: String::new(),
    }
}

fn failed(command: &Command) -> CommandResult {
    CommandResult::failure(command, "owncloud", "user already exists")
}

#[tokio::test]
async fn failed_create_retracts_the_record_exactly_once() {
    let repo = common::memory_repo().await;
    repo.insert(alice()).await.unwrap();
    let compensator = Compensator::new(repo.clone());

    let result = failed(&Command::create("Alice", "a@b.com", "p", false));
    assert_eq!(
        compensator.on_result(&result).await.unwrap(),
        Outcome::Retracted { removed: true }
    );
    assert!(repo.find("a@b.com").await.unwrap().is_none());

    // A second report for the same create must not error.
    assert_eq!(
        compensator.on_result(&result).await.unwrap(),
        Outcome::Retracted { removed: false }
    );
}

#[tokio::test]
async fn legacy_add_results_are_compensated_too() {
    let repo = common::memory_repo().await;
    repo.insert(alice()).await.unwrap();
    let compensator = Compensator::new(repo.clone());

    let result: CommandResult = serde_json::from_value(serde_json::json!({
        "Method": "Add",
        "Err": "boom",
        "Plugin": "owncloud",
        "Email": "a@b.com"
    }))
    .unwrap();
    assert_eq!(result.method, CommandMethod::Create);

    compensator.on_result(&result).await.unwrap();
    assert!(repo.find("a@b.com").await.unwrap().is_none());
}

#[tokio::test]
async fn other_failures_never_touch_storage() {
    let repo = common::memory_repo().await;
    repo.insert(alice()).await.unwrap();
    let compensator = Compensator::new(repo.clone());

    for cmd in [
        Command::delete("a@b.com"),
        Command::change_password("a@b.com", "n"),
        Command::disable("a@b.com"),
    ] {
        assert_eq!(
            compensator.on_result(&failed(&cmd)).await.unwrap(),
            Outcome::Unrepaired
        );
    }
    assert_eq!(repo.find("a@b.com").await.unwrap(), Some(alice()));
}

#[tokio::test]
async fn success_is_only_confirmed() {
    let repo = common::memory_repo().await;
    repo.insert(alice()).await.unwrap();
    let compensator = Compensator::new(repo.clone());

    let ok = CommandResult::success(&Command::create("Alice", "a@b.com", "p", false), "owncloud");
    assert_eq!(compensator.on_result(&ok).await.unwrap(), Outcome::Confirmed);
    assert!(repo.find("a@b.com").await.unwrap().is_some());
}

#[tokio::test]
async fn rollback_notification_is_opt_in() {
    let repo = common::memory_repo().await;
    repo.insert(alice()).await.unwrap();

    let sink = Arc::new(RecordingSink::default());
    let notifying = Compensator::new(repo.clone()).notifying(sink.clone());

    let result = failed(&Command::create("Alice", "a@b.com", "p", false));
    notifying.on_result(&result).await.unwrap();
    notifying.on_result(&result).await.unwrap();

    let sent = sink.sent();
    assert_eq!(sent.len(), 1, "only the first, effective rollback is announced");
    assert_eq!(sent[0].method, CommandMethod::Delete);
    assert_eq!(sent[0].email, "a@b.com");
}

#[tokio::test]
async fn user_delete_after_retraction_succeeds_and_announces() {
    let repo = common::memory_repo().await;
    let sink = Arc::new(RecordingSink::default());
    let svc = Service::new(repo.clone(), sink.clone());
    svc.add_account(NewAccount {
        name: "Alice".to_string(),
        email: "a@b.com".to_string(),
        password: "p".to_string(),
        activated: None,
    })
    .await
    .unwrap();

    let compensator = Compensator::new(repo.clone());
    assert!(compensator.retract_account("a@b.com").await.unwrap());

    svc.delete_account("a@b.com").await.unwrap();

    let methods: Vec<CommandMethod> = sink.sent().into_iter().map(|c| c.method).collect();
    assert_eq!(methods, vec![CommandMethod::Create, CommandMethod::Delete]);
    assert!(repo.find("a@b.com").await.unwrap().is_none());
}

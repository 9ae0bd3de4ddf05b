#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use plugkit_bus::Command;
use plugkit_db::{ConnectOpts, DbHandle, MEMORY_DSN};
use sea_orm_migration::MigratorTrait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use users::domain::ports::CommandSink;
use users::infra::storage::{migrations::Migrator, SeaOrmAccountsRepository};

pub async fn memory_db() -> Arc<DbHandle> {
    let db = DbHandle::connect(MEMORY_DSN, ConnectOpts::default())
        .await
        .unwrap();
    Migrator::up(&db.sea(), None).await.unwrap();
    Arc::new(db)
}

pub async fn memory_repo() -> Arc<SeaOrmAccountsRepository<sea_orm::DatabaseConnection>> {
    let db = memory_db().await;
    Arc::new(SeaOrmAccountsRepository::new(db.sea()))
}

/// Captures every command instead of publishing it.
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<Command>>,
    pub fail: AtomicBool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        let s = Self::default();
        s.fail.store(true, Ordering::SeqCst);
        s
    }

    pub fn sent(&self) -> Vec<Command> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl CommandSink for RecordingSink {
    async fn send(&self, command: Command) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("broker unavailable");
        }
        self.sent.lock().push(command);
        Ok(())
    }
}

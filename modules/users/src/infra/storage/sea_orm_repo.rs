//! SeaORM-backed implementation of the accounts port.
//!
//! Generic over `C: ConnectionTrait`, so it works with a pooled
//! `DatabaseConnection` or a transaction.

use anyhow::Context;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};

use crate::contract::Account;
use crate::domain::repo::{AccountsRepository, InsertError};
use crate::infra::storage::entity::{ActiveModel as AccountAM, Column, Entity as AccountEntity};

pub struct SeaOrmAccountsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmAccountsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl<C> AccountsRepository for SeaOrmAccountsRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn list(&self) -> anyhow::Result<Vec<Account>> {
        let rows = AccountEntity::find()
            .order_by_asc(Column::Email)
            .all(&self.conn)
            .await
            .context("list failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find(&self, email: &str) -> anyhow::Result<Option<Account>> {
        let found = AccountEntity::find_by_id(email.to_string())
            .one(&self.conn)
            .await
            .context("find failed")?;
        Ok(found.map(Into::into))
    }

    async fn insert(&self, a: Account) -> Result<(), InsertError> {
        let m = AccountAM {
            email: Set(a.email),
            name: Set(a.name),
            password: Set(a.password),
            activated: Set(a.activated),
            sam: Set(a.sam),
        };
        match m.insert(&self.conn).await {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(InsertError::Duplicate)
            }
            Err(e) => Err(InsertError::Other(anyhow::Error::new(e).context("insert failed"))),
        }
    }

    async fn update_password(&self, email: &str, password: &str) -> anyhow::Result<bool> {
        let res = AccountEntity::update_many()
            .col_expr(Column::Password, Expr::value(password))
            .filter(Column::Email.eq(email))
            .exec(&self.conn)
            .await
            .context("update_password failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn set_activated(&self, email: &str, activated: bool) -> anyhow::Result<bool> {
        let res = AccountEntity::update_many()
            .col_expr(Column::Activated, Expr::value(activated))
            .filter(Column::Email.eq(email))
            .exec(&self.conn)
            .await
            .context("set_activated failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn delete(&self, email: &str) -> anyhow::Result<bool> {
        let res = AccountEntity::delete_by_id(email.to_string())
            .exec(&self.conn)
            .await
            .context("delete failed")?;
        Ok(res.rows_affected > 0)
    }
}

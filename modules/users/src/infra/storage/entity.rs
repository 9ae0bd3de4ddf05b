use sea_orm::entity::prelude::*;

use crate::contract::Account;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub email: String,
    pub name: String,
    pub password: String,
    pub activated: bool,
    pub sam: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Account {
    fn from(m: Model) -> Self {
        Self {
            email: m.email,
            name: m.name,
            password: m.password,
            activated: m.activated,
            sam: m.sam,
        }
    }
}

//! Post entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::{NotSet, Set};

use solace_core::domain::{NewPost, Post};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Identity provider subject of the author. Not a foreign key: authors
    /// live in the identity provider, not in `users`.
    pub user_id: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub anonymous: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Post {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            content: model.content,
            anonymous: model.anonymous,
            created_at: model.created_at.into(),
        }
    }
}

impl From<NewPost> for ActiveModel {
    fn from(post: NewPost) -> Self {
        Self {
            id: NotSet,
            user_id: Set(post.user_id),
            content: Set(post.content),
            anonymous: Set(post.anonymous),
            created_at: Set(post.created_at.into()),
        }
    }
}

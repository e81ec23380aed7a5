//! SeaORM repository implementations.

use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbConn, DbErr, EntityTrait, QueryFilter, QueryOrder, RuntimeErr,
    SqlErr, sqlx,
};

use solace_core::domain::{NewPost, NewUser, Post, User, mask_email};
use solace_core::error::RepoError;
use solace_core::ports::{PostRepository, UserRepository};

use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};

/// A repository over one SeaORM entity, sharing the pooled connection.
pub struct SeaOrmRepository<E>
where
    E: EntityTrait,
{
    pub(crate) db: DbConn,
    _entity: PhantomData<E>,
}

impl<E> SeaOrmRepository<E>
where
    E: EntityTrait,
{
    pub fn new(db: DbConn) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }
}

/// SeaORM user repository.
pub type SeaOrmUserRepository = SeaOrmRepository<UserEntity>;

/// SeaORM post repository.
pub type SeaOrmPostRepository = SeaOrmRepository<PostEntity>;

/// Translate a driver error into the repository taxonomy.
///
/// Unique index violations become [`RepoError::Duplicate`]; rows that do not
/// fit the model (NULLs or column type mismatches) become [`RepoError::Decode`].
fn map_db_err(err: DbErr) -> RepoError {
    if let Some(mapped) = err.sql_err().and_then(map_sql_err) {
        return mapped;
    }
    match err {
        DbErr::Conn(e) => RepoError::Connection(e.to_string()),
        DbErr::ConnectionAcquire(e) => RepoError::Connection(e.to_string()),
        DbErr::Type(msg) => RepoError::Decode(msg),
        DbErr::Query(RuntimeErr::SqlxError(
            e @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)),
        )) => RepoError::Decode(e.to_string()),
        other => RepoError::Query(other.to_string()),
    }
}

fn map_sql_err(err: SqlErr) -> Option<RepoError> {
    match err {
        SqlErr::UniqueConstraintViolation(detail) => Some(RepoError::Duplicate(detail)),
        _ => None,
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn insert(&self, user: NewUser) -> Result<User, RepoError> {
        let active: user::ActiveModel = user.into();
        let model = active.insert(&self.db).await.map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl PostRepository for SeaOrmPostRepository {
    async fn insert(&self, post: NewPost) -> Result<Post, RepoError> {
        let active: post::ActiveModel = post.into();
        let model = active.insert(&self.db).await.map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn list_all(&self) -> Result<Vec<Post>, RepoError> {
        // Ids come from a sequence, so ordering by id is insertion order.
        let models = PostEntity::find()
            .order_by_asc(post::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| {
                let err = map_db_err(e);
                if let RepoError::Decode(cause) = &err {
                    tracing::error!(%cause, "Undecodable post record, failing listing");
                }
                err
            })?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}

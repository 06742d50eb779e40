use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Collection, Database};

use super::connection::{next_id, USERS};
use super::{StoreError, UserRepository};
use crate::types::{NewUser, User};

fn collection(db: &Database) -> Collection<User> {
    db.collection::<User>(USERS)
}

pub struct MongoUsers {
    db: Database,
}

impl MongoUsers {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for MongoUsers {
    async fn find(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(collection(&self.db).find_one(doc! { "id": id }).await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(collection(&self.db)
            .find_one(doc! { "username": username })
            .await?)
    }

    async fn insert(&self, data: NewUser) -> Result<User, StoreError> {
        let user = User {
            id: next_id(&self.db, USERS).await?,
            username: data.username,
            password_hash: data.password_hash,
            email: data.email,
            created_at: Utc::now(),
            last_login: None,
        };
        // `password_hash` is skipped when a `User` is serialized, so the
        // stored document is spelled out.
        self.db
            .collection::<Document>(USERS)
            .insert_one(doc! {
                "id": user.id,
                "username": &user.username,
                "password_hash": &user.password_hash,
                "email": &user.email,
                "created_at": user.created_at.to_rfc3339(),
                "last_login": Bson::Null,
            })
            .await?;
        Ok(user)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(collection(&self.db).count_documents(doc! {}).await?)
    }

    /// Update last login time
    async fn touch_login(&self, id: i64) -> Result<(), StoreError> {
        collection(&self.db)
            .update_one(
                doc! { "id": id },
                doc! { "$set": { "last_login": Utc::now().to_rfc3339() } },
            )
            .await?;
        Ok(())
    }
}

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};

use super::connection::{next_id, REPLIES};
use super::{ReplyRepository, StoreError};
use crate::types::{NewReply, Reply};

fn collection(db: &Database) -> Collection<Reply> {
    db.collection::<Reply>(REPLIES)
}

pub struct MongoReplies {
    db: Database,
}

impl MongoReplies {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReplyRepository for MongoReplies {
    async fn for_post(&self, post_id: i64) -> Result<Vec<Reply>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "id": -1 }).build();
        let cursor = collection(&self.db)
            .find(doc! { "post_id": post_id })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find(&self, id: i64) -> Result<Option<Reply>, StoreError> {
        Ok(collection(&self.db).find_one(doc! { "id": id }).await?)
    }

    async fn insert(&self, data: NewReply) -> Result<Reply, StoreError> {
        let reply = Reply {
            id: next_id(&self.db, REPLIES).await?,
            post_id: data.post_id,
            content: data.content,
            user_id: data.user_id,
            created_at: Utc::now(),
        };
        collection(&self.db).insert_one(&reply).await?;
        Ok(reply)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = collection(&self.db).delete_one(doc! { "id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_for_post(&self, post_id: i64) -> Result<u64, StoreError> {
        let result = collection(&self.db)
            .delete_many(doc! { "post_id": post_id })
            .await?;
        Ok(result.deleted_count)
    }
}

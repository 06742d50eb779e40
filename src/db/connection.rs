use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Database, IndexModel};
use serde::Deserialize;
use tokio::time::sleep;

use super::{HealthCheck, StoreError};
use crate::config::Config;

pub const POSTS: &str = "posts";
pub const REPLIES: &str = "replies";
pub const USERS: &str = "users";
const COUNTERS: &str = "counters";

const MAX_RETRIES: u32 = 10;
const MAX_BACKOFF_MS: u64 = 5000;

pub struct MongoDb {
    pub client: Client,
    pub database: Database,
}

impl MongoDb {
    pub async fn new(config: &Config) -> mongodb::error::Result<Self> {
        let client = Client::with_uri_str(&config.mongodb_uri).await?;
        let database = client.database(&config.mongodb_database);
        Ok(Self { client, database })
    }

    pub async fn ensure_indexes(&self) -> mongodb::error::Result<()> {
        for (name, index) in index_models() {
            self.database
                .collection::<mongodb::bson::Document>(name)
                .create_index(index)
                .await?;
        }
        Ok(())
    }
}

fn unique(keys: mongodb::bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

/// Unique `id` on every record collection, unique usernames, and the
/// `post_id` lookups of a post's replies.
pub fn index_models() -> Vec<(&'static str, IndexModel)> {
    vec![
        (POSTS, unique(doc! { "id": 1 })),
        (REPLIES, unique(doc! { "id": 1 })),
        (USERS, unique(doc! { "id": 1 })),
        (USERS, unique(doc! { "username": 1 })),
        (
            REPLIES,
            IndexModel::builder().keys(doc! { "post_id": 1, "id": -1 }).build(),
        ),
    ]
}

#[async_trait]
impl HealthCheck for MongoDb {
    async fn ping(&self) -> Result<(), StoreError> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Counter {
    seq: i64,
}

/// Allocates the next integer id for `collection`.
pub async fn next_id(db: &Database, collection: &str) -> mongodb::error::Result<i64> {
    let options = FindOneAndUpdateOptions::builder()
        .upsert(true)
        .return_document(ReturnDocument::After)
        .build();

    let counter = db
        .collection::<Counter>(COUNTERS)
        .find_one_and_update(doc! { "_id": collection }, doc! { "$inc": { "seq": 1_i64 } })
        .with_options(options)
        .await?;

    // The upsert always returns the counter; a first id of 1 otherwise
    Ok(counter.map_or(1, |c| c.seq))
}

/// Connect to MongoDB with exponential backoff retry logic
pub async fn connect_with_retry(config: &Config) -> Result<MongoDb, StoreError> {
    let mut retry_count = 0;
    let mut backoff_ms = 500;

    loop {
        let attempt = match MongoDb::new(config).await {
            Ok(db) => verify_connection(&db).await.map(|_| db),
            Err(e) => Err(StoreError::Mongo(e)),
        };

        match attempt {
            Ok(db) => return Ok(db),
            Err(e) => {
                warn!("MongoDB connection failed: {}", e);
                retry_count += 1;
                if retry_count >= MAX_RETRIES {
                    return Err(StoreError::Other(format!(
                        "failed to connect to MongoDB after {} retries: {}",
                        MAX_RETRIES, e
                    )));
                }
                info!(
                    "Retrying MongoDB connection in {}ms (attempt {}/{})",
                    backoff_ms,
                    retry_count + 1,
                    MAX_RETRIES
                );
                sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}

/// Verify MongoDB connection with a ping command
pub async fn verify_connection(db: &MongoDb) -> Result<(), StoreError> {
    db.ping().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replies_are_indexed_by_post() {
        let models = index_models();
        let post_index = models
            .iter()
            .find(|(name, model)| *name == REPLIES && model.keys.contains_key("post_id"))
            .map(|(_, model)| model)
            .unwrap();
        assert!(post_index.options.is_none());

        let unique_ids = models
            .iter()
            .filter(|(_, model)| model.keys.contains_key("id") && !model.keys.contains_key("post_id"))
            .count();
        assert_eq!(unique_ids, 3);
    }
}

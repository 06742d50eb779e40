pub mod connection;
pub mod memory;
pub mod posts;
pub mod replies;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{NewPost, NewReply, NewUser, Post, PostForm, Reply, User};

pub use connection::{connect_with_retry, verify_connection, MongoDb};
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("storage error: {0}")]
    Other(String),
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// All posts, newest id first.
    async fn list_latest(&self) -> Result<Vec<Post>, StoreError>;
    async fn find(&self, id: i64) -> Result<Option<Post>, StoreError>;
    async fn insert(&self, post: NewPost) -> Result<Post, StoreError>;
    /// Returns `None` when no post has this id.
    async fn update(&self, id: i64, data: &PostForm) -> Result<Option<Post>, StoreError>;
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
    /// Case-insensitive substring match on the title, newest id first.
    async fn search_title(&self, query: &str) -> Result<Vec<Post>, StoreError>;
}

#[async_trait]
pub trait ReplyRepository: Send + Sync {
    async fn for_post(&self, post_id: i64) -> Result<Vec<Reply>, StoreError>;
    async fn find(&self, id: i64) -> Result<Option<Reply>, StoreError>;
    async fn insert(&self, reply: NewReply) -> Result<Reply, StoreError>;
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
    async fn delete_for_post(&self, post_id: i64) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
    async fn count(&self) -> Result<u64, StoreError>;
    async fn touch_login(&self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
}

/// The repositories handed to the controllers.
#[derive(Clone)]
pub struct Storage {
    pub posts: Arc<dyn PostRepository>,
    pub replies: Arc<dyn ReplyRepository>,
    pub users: Arc<dyn UserRepository>,
    health: Arc<dyn HealthCheck>,
}

impl Storage {
    pub fn mongo(mongodb: Arc<MongoDb>) -> Self {
        let database = mongodb.database.clone();
        Self {
            posts: Arc::new(posts::MongoPosts::new(database.clone())),
            replies: Arc::new(replies::MongoReplies::new(database.clone())),
            users: Arc::new(users::MongoUsers::new(database)),
            health: mongodb,
        }
    }

    pub fn memory() -> Self {
        let store = MemoryStore::default();
        Self {
            posts: Arc::new(store.clone()),
            replies: Arc::new(store.clone()),
            users: Arc::new(store.clone()),
            health: Arc::new(store),
        }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.health.ping().await
    }
}

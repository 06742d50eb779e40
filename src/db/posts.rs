use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Collection, Database};

use super::connection::{next_id, POSTS};
use super::{PostRepository, StoreError};
use crate::types::{NewPost, Post, PostForm};

fn collection(db: &Database) -> Collection<Post> {
    db.collection::<Post>(POSTS)
}

/// Create a new post
pub async fn create_post(db: &Database, data: NewPost) -> Result<Post, mongodb::error::Error> {
    let now = Utc::now();
    let post = Post {
        id: next_id(db, POSTS).await?,
        title: data.title,
        content: data.content,
        user_id: data.user_id,
        created_at: now,
        updated_at: now,
    };

    collection(db).insert_one(&post).await?;
    Ok(post)
}

/// Get post by ID
pub async fn get_post_by_id(db: &Database, id: i64) -> Result<Option<Post>, mongodb::error::Error> {
    collection(db).find_one(doc! { "id": id }).await
}

/// `$set` of the fillable fields, stamping `updated_at`
pub fn update_doc(data: &PostForm, now: DateTime<Utc>) -> Document {
    doc! {
        "$set": {
            "title": &data.title,
            "content": &data.content,
            "updated_at": now.to_rfc3339(),
        }
    }
}

/// Update the fillable fields of a post in place
pub async fn update_post(
    db: &Database,
    id: i64,
    data: &PostForm,
) -> Result<Option<Post>, mongodb::error::Error> {
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    collection(db)
        .find_one_and_update(doc! { "id": id }, update_doc(data, Utc::now()))
        .with_options(options)
        .await
}

/// Delete a post
pub async fn delete_post(db: &Database, id: i64) -> Result<bool, mongodb::error::Error> {
    let result = collection(db).delete_one(doc! { "id": id }).await?;
    Ok(result.deleted_count > 0)
}

/// List posts matching `filter`, newest first
pub async fn list_posts(db: &Database, filter: Document) -> Result<Vec<Post>, mongodb::error::Error> {
    let options = FindOptions::builder().sort(doc! { "id": -1 }).build();

    let cursor = collection(db).find(filter).with_options(options).await?;
    cursor.try_collect().await
}

/// Filter matching `query` anywhere in the title, ignoring case
pub fn title_filter(query: &str) -> Document {
    doc! {
        "title": {
            "$regex": regex::escape(query),
            "$options": "i"
        }
    }
}

pub struct MongoPosts {
    db: Database,
}

impl MongoPosts {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostRepository for MongoPosts {
    async fn list_latest(&self) -> Result<Vec<Post>, StoreError> {
        Ok(list_posts(&self.db, doc! {}).await?)
    }

    async fn find(&self, id: i64) -> Result<Option<Post>, StoreError> {
        Ok(get_post_by_id(&self.db, id).await?)
    }

    async fn insert(&self, post: NewPost) -> Result<Post, StoreError> {
        Ok(create_post(&self.db, post).await?)
    }

    async fn update(&self, id: i64, data: &PostForm) -> Result<Option<Post>, StoreError> {
        Ok(update_post(&self.db, id, data).await?)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(delete_post(&self.db, id).await?)
    }

    async fn search_title(&self, query: &str) -> Result<Vec<Post>, StoreError> {
        Ok(list_posts(&self.db, title_filter(query)).await?)
    }
}

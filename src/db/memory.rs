use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{HealthCheck, PostRepository, ReplyRepository, StoreError, UserRepository};
use crate::types::{NewPost, NewReply, NewUser, Post, PostForm, Reply, User};

#[derive(Default)]
struct Tables {
    posts: BTreeMap<i64, Post>,
    replies: BTreeMap<i64, Reply>,
    users: BTreeMap<i64, User>,
    last_post_id: i64,
    last_reply_id: i64,
    last_user_id: i64,
}

/// Process-local storage used by the tests and by `STORAGE=memory`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

fn newest_first<T: Clone>(rows: impl DoubleEndedIterator<Item = T>) -> Vec<T> {
    rows.rev().collect()
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn list_latest(&self) -> Result<Vec<Post>, StoreError> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.posts.values().cloned()))
    }

    async fn find(&self, id: i64) -> Result<Option<Post>, StoreError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn insert(&self, data: NewPost) -> Result<Post, StoreError> {
        let mut tables = self.tables.write().await;
        tables.last_post_id += 1;
        let now = Utc::now();
        let post = Post {
            id: tables.last_post_id,
            title: data.title,
            content: data.content,
            user_id: data.user_id,
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, id: i64, data: &PostForm) -> Result<Option<Post>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.posts.get_mut(&id).map(|post| {
            post.title = data.title.clone();
            post.content = data.content.clone();
            post.updated_at = Utc::now();
            post.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.posts.remove(&id).is_some())
    }

    async fn search_title(&self, query: &str) -> Result<Vec<Post>, StoreError> {
        let needle = query.to_lowercase();
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .posts
                .values()
                .filter(|post| post.title.to_lowercase().contains(&needle))
                .cloned(),
        ))
    }
}

#[async_trait]
impl ReplyRepository for MemoryStore {
    async fn for_post(&self, post_id: i64) -> Result<Vec<Reply>, StoreError> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .replies
                .values()
                .filter(|reply| reply.post_id == post_id)
                .cloned(),
        ))
    }

    async fn find(&self, id: i64) -> Result<Option<Reply>, StoreError> {
        Ok(self.tables.read().await.replies.get(&id).cloned())
    }

    async fn insert(&self, data: NewReply) -> Result<Reply, StoreError> {
        let mut tables = self.tables.write().await;
        tables.last_reply_id += 1;
        let reply = Reply {
            id: tables.last_reply_id,
            post_id: data.post_id,
            content: data.content,
            user_id: data.user_id,
            created_at: Utc::now(),
        };
        tables.replies.insert(reply.id, reply.clone());
        Ok(reply)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.replies.remove(&id).is_some())
    }

    async fn delete_for_post(&self, post_id: i64) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.replies.len();
        tables.replies.retain(|_, reply| reply.post_id != post_id);
        Ok((before - tables.replies.len()) as u64)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn insert(&self, data: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|user| user.username == data.username) {
            return Err(StoreError::Other(format!(
                "username {} already exists",
                data.username
            )));
        }
        tables.last_user_id += 1;
        let user = User {
            id: tables.last_user_id,
            username: data.username,
            password_hash: data.password_hash,
            email: data.email,
            created_at: Utc::now(),
            last_login: None,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.tables.read().await.users.len() as u64)
    }

    async fn touch_login(&self, id: i64) -> Result<(), StoreError> {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Storage;
    use crate::types::{NewPost, NewReply, PostForm};

    fn new_post(title: &str, user_id: i64) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: "content".to_string(),
            user_id,
        }
    }

    #[tokio::test]
    async fn test_posts_are_listed_newest_first() {
        let storage = Storage::memory();
        storage.posts.insert(new_post("first", 1)).await.unwrap();
        storage.posts.insert(new_post("second", 1)).await.unwrap();

        let titles: Vec<_> = storage
            .posts
            .list_latest()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let storage = Storage::memory();
        storage.posts.insert(new_post("Rust tips", 1)).await.unwrap();
        storage.posts.insert(new_post("Cooking", 1)).await.unwrap();

        let found = storage.posts.search_title("rUST").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Rust tips");
    }

    #[tokio::test]
    async fn test_update_missing_post() {
        let storage = Storage::memory();
        let form = PostForm {
            title: "t".to_string(),
            content: "c".to_string(),
        };
        assert!(storage.posts.update(42, &form).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_for_post_only_touches_that_post() {
        let storage = Storage::memory();
        for post_id in [1, 1, 2] {
            storage
                .replies
                .insert(NewReply {
                    post_id,
                    content: "hi".to_string(),
                    user_id: 1,
                })
                .await
                .unwrap();
        }

        assert_eq!(storage.replies.delete_for_post(1).await.unwrap(), 2);
        assert!(storage.replies.for_post(1).await.unwrap().is_empty());
        assert_eq!(storage.replies.for_post(2).await.unwrap().len(), 1);
    }
}

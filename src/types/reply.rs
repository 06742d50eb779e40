use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reply {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ReplyForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 5000, message = "La réponse doit faire entre 1 et 5000 caractères"))]
    pub content: String,
}

impl ReplyForm {
    pub fn filtered(self) -> Self {
        Self {
            content: self.content.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewReply {
    pub post_id: i64,
    pub content: String,
    pub user_id: i64,
}

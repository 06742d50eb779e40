use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fillable fields of a post as submitted by a form or a JSON body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PostForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Le titre doit faire entre 1 et 255 caractères"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Le contenu ne peut pas être vide"))]
    pub content: String,
}

impl PostForm {
    /// Trims the submitted values. Unknown fields are already dropped by
    /// deserialization.
    pub fn filtered(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub user_id: i64,
}

impl NewPost {
    pub fn from_form(form: PostForm, user_id: i64) -> Self {
        Self {
            title: form.title,
            content: form.content,
            user_id,
        }
    }
}

/// Field name to messages, in the shape the `Form` helper expects.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Le champ {} est invalide", field))
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

/// Validates a submitted form, collecting the messages per field.
pub fn validate_form<T: Validate>(form: T) -> Result<T, FieldErrors> {
    match form.validate() {
        Ok(()) => Ok(form),
        Err(errors) => Err(field_errors(&errors)),
    }
}

pub mod api;
pub mod auth;
pub mod posts;
pub mod replies;

use actix_web::web;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::context::RequestInfo;
use crate::errors::{AppError, AppResult};

pub use api::api_scope;

/// Registers every route. The literal `/posts/...` paths come before the
/// ones taking an id.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(api_scope())
        .service(posts::home)
        .service(posts::index)
        .service(posts::create)
        .service(posts::search)
        .service(posts::store)
        .service(posts::show)
        .service(posts::edit)
        .service(posts::update)
        .service(posts::destroy)
        .service(replies::store)
        .service(replies::destroy)
        .service(auth::login_form)
        .service(auth::login)
        .service(auth::logout);
}

/// Decodes a submitted body, JSON or urlencoded depending on its content
/// type. Actions call this after their access checks. A body that cannot be
/// decoded counts as an empty submission and fails validation.
pub(crate) fn submitted<T>(request: &RequestInfo, body: &[u8]) -> T
where
    T: DeserializeOwned + Default,
{
    let decoded = if request.json_body {
        serde_json::from_slice(body).map_err(|e| e.to_string())
    } else {
        std::str::from_utf8(body)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                web::Query::<T>::from_query(raw)
                    .map(web::Query::into_inner)
                    .map_err(|e| e.to_string())
            })
    };

    decoded.unwrap_or_else(|e| {
        warn!("Unreadable {} body: {}", request.path, e);
        T::default()
    })
}

pub(crate) fn to_value<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))
}

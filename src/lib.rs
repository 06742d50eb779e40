//! Posts and replies board: actix-web controllers, Tera views and a small
//! response layer over MongoDB.

#[cfg(test)]
#[macro_use]
mod test_support;

pub mod accounts;
pub mod config;
pub mod context;
pub mod db;
pub mod errors;
pub mod middlewares;
pub mod response;
pub mod routes;
pub mod session;
pub mod state;
pub mod types;
pub mod views;

use actix_web::body::MessageBody;
use actix_web::http::StatusCode;
use actix_web::middleware::ErrorHandlers;

pub use config::Config;
pub use errors::{AppError, AppResult};
pub use state::AppState;

/// Error pages for the statuses the application answers with.
pub fn error_handlers<B: MessageBody + 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new()
        .handler(StatusCode::FORBIDDEN, errors::error_page_handler)
        .handler(StatusCode::NOT_FOUND, errors::error_page_handler)
        .handler(StatusCode::INTERNAL_SERVER_ERROR, errors::error_page_handler)
}

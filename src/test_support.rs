use actix_web::http::header;
use actix_web::web;

use crate::accounts::create_user;
use crate::config::Config;
use crate::db::Storage;
use crate::session::{issue_token, AuthUser};
use crate::state::AppState;
use crate::types::{NewPost, NewReply, Post, Reply};

pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Builds the application service the way `main` does, over `$state`.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .wrap(crate::error_handlers())
                .wrap(crate::middlewares::MethodOverride)
                .wrap(actix_web::middleware::NormalizePath::trim())
                .configure(crate::routes::configure),
        )
        .await
    };
}

pub fn test_state() -> web::Data<AppState> {
    let state = AppState::new(Config::for_tests(), Storage::memory()).expect("test state");
    web::Data::new(state)
}

pub async fn seed_user(state: &AppState, username: &str) -> AuthUser {
    let user = create_user(
        state.storage.users.as_ref(),
        username,
        TEST_PASSWORD,
        &format!("{}@example.com", username),
        state.config.bcrypt_cost,
    )
    .await
    .expect("seed user");

    AuthUser {
        id: user.id,
        username: user.username,
    }
}

pub async fn seed_post(state: &AppState, author: &AuthUser, title: &str) -> Post {
    state
        .storage
        .posts
        .insert(NewPost {
            title: title.to_string(),
            content: format!("Contenu de {}", title),
            user_id: author.id,
        })
        .await
        .expect("seed post")
}

pub async fn seed_reply(state: &AppState, author: &AuthUser, post_id: i64, content: &str) -> Reply {
    state
        .storage
        .replies
        .insert(NewReply {
            post_id,
            content: content.to_string(),
            user_id: author.id,
        })
        .await
        .expect("seed reply")
}

/// `Authorization` header for `user`.
pub fn bearer(state: &AppState, user: &AuthUser) -> (header::HeaderName, String) {
    let account = crate::types::User {
        id: user.id,
        username: user.username.clone(),
        password_hash: String::new(),
        email: String::new(),
        created_at: chrono::Utc::now(),
        last_login: None,
    };
    let (token, _) = issue_token(&account, &state.config.jwt_secret, 1).expect("token");
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

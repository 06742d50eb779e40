use actix_web::{get, post, web, HttpResponse};
use log::{info, warn};
use serde_json::json;
use tera::Context;

use super::posts::autoload;
use super::{submitted, to_value};
use crate::accounts::authenticate;
use crate::context::Ctx;
use crate::errors::{AppError, AppResult};
use crate::session::{issue_token, AuthUser};
use crate::types::{FieldErrors, LoginRequest, LoginResponse};
use crate::views::HelperCall;

const INVALID_CREDENTIALS: &str = "Identifiants invalides";

fn render_login(ctx: &mut Ctx, username: &str, errors: &FieldErrors) -> AppResult<HttpResponse> {
    let mut vars = Context::new();
    vars.insert("action", "/login");

    let form = HelperCall::with_params(
        "Form",
        vec![json!({ "username": username, "password": "" }), to_value(errors)?],
    );

    let mut response = ctx.response(&autoload());
    response.set_title("Connexion");
    response.view("auth.login", &vars, &[form])?;
    response.finish(&mut ctx.session)
}

#[get("/login")]
pub async fn login_form(mut ctx: Ctx) -> AppResult<HttpResponse> {
    render_login(&mut ctx, "", &FieldErrors::new())
}

#[post("/login")]
pub async fn login(mut ctx: Ctx, body: web::Bytes) -> AppResult<HttpResponse> {
    let credentials = submitted::<LoginRequest>(&ctx.request, &body);
    let username = credentials.username.trim();

    let users = ctx.state.storage.users.clone();
    let user = match authenticate(users.as_ref(), username, &credentials.password).await? {
        Some(user) => user,
        None => {
            warn!("Failed login attempt for {}", username);
            if ctx.request.is_json {
                return Err(AppError::Forbidden(INVALID_CREDENTIALS.to_string()));
            }
            let mut errors = FieldErrors::new();
            errors.insert("password".to_string(), vec![INVALID_CREDENTIALS.to_string()]);
            return render_login(&mut ctx, username, &errors);
        }
    };

    users.touch_login(user.id).await?;
    let ttl_hours = ctx.state.config.session_ttl_hours;
    let (token, expires_at) = issue_token(&user, &ctx.state.config.jwt_secret, ttl_hours)?;
    info!("User {} logged in", user.username);

    let response = ctx.response(&autoload());
    if ctx.request.is_json {
        return Ok(response.json(&LoginResponse {
            token,
            username: user.username,
            expires_at,
        }));
    }

    ctx.session.flash(format!("Bienvenue {}", user.username));
    ctx.session.login(
        AuthUser {
            id: user.id,
            username: user.username,
        },
        token,
        ttl_hours,
    );
    Ok(response.redirect("/posts", &ctx.request, &ctx.session))
}

#[post("/logout")]
pub async fn logout(mut ctx: Ctx) -> AppResult<HttpResponse> {
    if let Some(user) = ctx.session.user() {
        info!("User {} logged out", user.username);
    }
    ctx.session.logout();
    ctx.session.flash("Vous êtes déconnecté");

    let response = ctx.response(&autoload());
    Ok(response.redirect("/", &ctx.request, &ctx.session))
}

#[cfg(test)]
mod tests {
    use actix_web::http::{header, StatusCode};
    use actix_web::test::{self, TestRequest};

    use crate::session::{read_token, AUTH_COOKIE};
    use crate::test_support::{seed_user, test_state, TEST_PASSWORD};
    use crate::types::LoginResponse;

    #[actix_web::test]
    async fn test_login_form() {
        let state = test_state();
        let app = test_app!(state);

        let req = TestRequest::get().uri("/login").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_login_sets_cookie() {
        let state = test_state();
        let alice = seed_user(&state, "alice").await;
        let app = test_app!(state);

        let req = TestRequest::post()
            .uri("/login")
            .set_form([("username", "alice"), ("password", TEST_PASSWORD)])
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FOUND);

        let cookie = res
            .response()
            .cookies()
            .find(|c| c.name() == AUTH_COOKIE)
            .unwrap();
        let user = read_token(cookie.value(), &state.config.jwt_secret).unwrap();
        assert_eq!(user.id, alice.id);

        let stored = state.storage.users.find(alice.id).await.unwrap().unwrap();
        assert!(stored.last_login.is_some());
    }

    #[actix_web::test]
    async fn test_login_json_returns_token() {
        let state = test_state();
        seed_user(&state, "alice").await;
        let app = test_app!(state);

        let req = TestRequest::post()
            .uri("/login")
            .set_json(serde_json::json!({ "username": "alice", "password": TEST_PASSWORD }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["username"], "alice");
        assert!(body["token"].as_str().map_or(false, |t| !t.is_empty()));
        assert!(body["expires_at"].as_i64().is_some());
    }

    #[actix_web::test]
    async fn test_login_with_wrong_password() {
        let state = test_state();
        seed_user(&state, "alice").await;
        let app = test_app!(state);

        let req = TestRequest::post()
            .uri("/login")
            .set_form([("username", "alice"), ("password", "wrong")])
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.response().cookies().all(|c| c.name() != AUTH_COOKIE));

        let body = String::from_utf8(test::read_body(res).await.to_vec()).unwrap();
        assert!(body.contains("Identifiants invalides"));
    }

    #[actix_web::test]
    async fn test_login_json_with_wrong_password_is_forbidden() {
        let state = test_state();
        seed_user(&state, "alice").await;
        let app = test_app!(state);

        let req = TestRequest::post()
            .uri("/login")
            .set_json(serde_json::json!({ "username": "alice", "password": "wrong" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_logout_clears_cookie() {
        let state = test_state();
        let app = test_app!(state);

        let req = TestRequest::post().uri("/logout").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "http://localhost/"
        );
        let cookie = res
            .response()
            .cookies()
            .find(|c| c.name() == AUTH_COOKIE)
            .unwrap();
        assert_eq!(cookie.value(), "");
    }

    #[test]
    fn test_login_response_shape() {
        let response = LoginResponse {
            token: "t".to_string(),
            username: "alice".to_string(),
            expires_at: 10,
        };
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["expires_at"], 10);
    }
}

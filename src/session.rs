//! Per-request session: the authenticated user, read from a JWT, and a
//! one-shot flash message carried in a cookie.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponseBuilder};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::types::User;

pub const AUTH_COOKIE: &str = "auth_token";
pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Signs a session token for `user`. Returns the token and its expiry as a
/// Unix timestamp.
pub fn issue_token(user: &User, secret: &str, ttl_hours: i64) -> AppResult<(String, i64)> {
    let expires_at = (Utc::now() + chrono::Duration::hours(ttl_hours)).timestamp();
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        exp: expires_at,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Impossible de créer la session: {}", e)))?;

    Ok((token, expires_at))
}

/// `None` for an invalid, expired or foreign token.
pub fn read_token(token: &str, secret: &str) -> Option<AuthUser> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    Some(AuthUser {
        id: data.claims.sub.parse().ok()?,
        username: data.claims.username,
    })
}

#[derive(Debug)]
enum AuthChange {
    Login { token: String, ttl_hours: i64 },
    Logout,
}

#[derive(Debug, Default)]
pub struct Session {
    user: Option<AuthUser>,
    incoming_flash: Option<String>,
    flash_consumed: bool,
    outgoing_flash: Option<String>,
    auth_change: Option<AuthChange>,
    secure_cookies: bool,
}

impl Session {
    /// The bearer token wins over the cookie. `secure_cookies` marks the
    /// cookies this session writes as HTTPS only.
    pub fn from_request(req: &HttpRequest, secret: &str, secure_cookies: bool) -> Self {
        let bearer = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string);

        let token = bearer.or_else(|| req.cookie(AUTH_COOKIE).map(|c| c.value().to_string()));

        let incoming_flash = req.cookie(FLASH_COOKIE).and_then(|c| {
            urlencoding::decode(c.value())
                .ok()
                .map(|s| s.into_owned())
                .filter(|s| !s.is_empty())
        });

        Self {
            user: token.and_then(|t| read_token(&t, secret)),
            incoming_flash,
            secure_cookies,
            ..Self::default()
        }
    }

    pub fn for_user(user: AuthUser) -> Self {
        Self {
            user: Some(user),
            ..Self::default()
        }
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    /// The authenticated user, or `Forbidden(message)` for anonymous requests.
    pub fn require_user(&self, message: &str) -> AppResult<&AuthUser> {
        self.user
            .as_ref()
            .ok_or_else(|| AppError::Forbidden(message.to_string()))
    }

    /// Message shown on the next rendered page.
    pub fn flash(&mut self, message: impl Into<String>) {
        self.outgoing_flash = Some(message.into());
    }

    pub fn take_flash(&mut self) -> Option<String> {
        let flash = self.incoming_flash.take();
        if flash.is_some() {
            self.flash_consumed = true;
        }
        flash
    }

    pub fn login(&mut self, user: AuthUser, token: String, ttl_hours: i64) {
        self.user = Some(user);
        self.auth_change = Some(AuthChange::Login { token, ttl_hours });
    }

    pub fn logout(&mut self) {
        self.user = None;
        self.auth_change = Some(AuthChange::Logout);
    }

    /// Writes the pending cookie changes onto a response.
    pub fn apply(&self, builder: &mut HttpResponseBuilder) {
        match &self.auth_change {
            Some(AuthChange::Login { token, ttl_hours }) => {
                builder.cookie(
                    Cookie::build(AUTH_COOKIE, token.clone())
                        .path("/")
                        .http_only(true)
                        .same_site(SameSite::Lax)
                        .secure(self.secure_cookies)
                        .max_age(Duration::hours(*ttl_hours))
                        .finish(),
                );
            }
            Some(AuthChange::Logout) => {
                builder.cookie(removal(AUTH_COOKIE));
            }
            None => {}
        }

        if let Some(message) = &self.outgoing_flash {
            builder.cookie(
                Cookie::build(FLASH_COOKIE, urlencoding::encode(message).into_owned())
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .secure(self.secure_cookies)
                    .finish(),
            );
        } else if self.flash_consumed {
            builder.cookie(removal(FLASH_COOKIE));
        }
    }
}

fn removal(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path("/").finish();
    cookie.make_removal();
    cookie
}

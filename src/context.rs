//! Explicit per-request context handed to every controller action.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, Error, FromRequest, HttpRequest};

use crate::errors::AppError;
use crate::response::Response;
use crate::session::Session;
use crate::state::AppState;
use crate::views::HelperCall;

fn header_has_json(req: &HttpRequest, name: &header::HeaderName) -> bool {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map_or(false, |v| v.contains("application/json"))
}

/// True when the client sent or asked for JSON.
pub fn wants_json(req: &HttpRequest) -> bool {
    [header::ACCEPT, header::CONTENT_TYPE]
        .iter()
        .any(|name| header_has_json(req, name))
}

/// What the controllers need to know about the incoming request.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub is_json: bool,
    /// The body is JSON rather than an urlencoded form.
    pub json_body: bool,
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub referer: Option<String>,
}

impl RequestInfo {
    pub fn from_request(req: &HttpRequest) -> Self {
        let info = req.connection_info();
        Self {
            is_json: wants_json(req),
            json_body: header_has_json(req, &header::CONTENT_TYPE),
            scheme: info.scheme().to_string(),
            host: info.host().to_string(),
            path: req.path().to_string(),
            referer: req
                .headers()
                .get(header::REFERER)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string),
        }
    }
}

pub struct Ctx {
    pub state: web::Data<AppState>,
    pub session: Session,
    pub request: RequestInfo,
}

impl Ctx {
    pub fn from_http_request(req: &HttpRequest) -> Result<Self, AppError> {
        let state = req
            .app_data::<web::Data<AppState>>()
            .cloned()
            .ok_or_else(|| AppError::Internal("application state missing".to_string()))?;

        let session = Session::from_request(req, &state.config.jwt_secret, !state.config.is_dev);

        Ok(Self {
            state,
            session,
            request: RequestInfo::from_request(req),
        })
    }

    /// A fresh response carrying the controller's autoloaded helpers.
    pub fn response(&self, autoload: &[HelperCall]) -> Response {
        Response::new(self.state.clone(), autoload)
    }
}

impl FromRequest for Ctx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ctx::from_http_request(req).map_err(Error::from))
    }
}

// src/errors.rs
use actix_web::{
    body::MessageBody, dev::ServiceResponse, http::StatusCode, middleware::ErrorHandlerResponse,
    web, HttpRequest, HttpResponse, ResponseError, Result,
};
use log::error;
use tera::Context;
use thiserror::Error;

use crate::context::wants_json;
use crate::db::StoreError;
use crate::response::status_text;
use crate::state::AppState;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Internal(String),

    #[error("Erreur de stockage: {0}")]
    Store(#[from] StoreError),

    #[error("Erreur de rendu: {0}")]
    Template(#[from] tera::Error),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) | AppError::Store(_) | AppError::Template(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    // The ErrorHandlers middleware turns this into the rendered error page.
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}

// ---------- Error Handlers ----------

/// Rewrites 403, 404 and 500 responses into an error page, JSON when the
/// client asked for it.
pub fn error_page_handler<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>>
where
    B: MessageBody + 'static,
{
    let status = res.status();
    let message = res.response().error().map(|err| err.to_string());
    let (req, _res) = res.into_parts();

    let state = req.app_data::<web::Data<AppState>>().cloned();
    let is_dev = state.as_ref().map_or(false, |s| s.config.is_dev);

    if status.is_server_error() {
        error!(
            "{} {} failed: {}",
            req.method(),
            req.path(),
            message.as_deref().unwrap_or("unknown error")
        );
    }

    let details = error_details(status, message, req.path(), is_dev);
    let reason = reason_phrase(status);

    let is_json_request = req.path().starts_with("/api") || wants_json(&req);

    let response = if is_json_request {
        HttpResponse::build(status).json(serde_json::json!({
            "status": "error",
            "code": status.as_u16(),
            "message": reason,
            "details": details,
        }))
    } else {
        let body = render_error_page(state.as_ref().map(|s| s.get_ref()), &req, status, details.as_deref(), is_dev);
        HttpResponse::build(status)
            .content_type("text/html; charset=utf-8")
            .body(body)
    };

    Ok(ErrorHandlerResponse::Response(ServiceResponse::new(
        req,
        response.map_into_right_body(),
    )))
}

fn reason_phrase(status: StatusCode) -> &'static str {
    status_text(status.as_u16())
        .or_else(|| status.canonical_reason())
        .unwrap_or("Error")
}

/// What the client gets to see beyond the status line. Server errors only
/// expose their cause in development mode.
fn error_details(status: StatusCode, message: Option<String>, path: &str, is_dev: bool) -> Option<String> {
    if status.is_server_error() {
        return if is_dev { message } else { None };
    }

    match message {
        Some(message) => Some(message),
        None if is_dev => Some(path.to_string()),
        None => None,
    }
}

fn error_template(status: StatusCode, is_dev: bool) -> &'static str {
    match status {
        StatusCode::FORBIDDEN => "errors/403.html",
        StatusCode::NOT_FOUND => "errors/404.html",
        _ if is_dev => "errors/500-dev.html",
        _ => "errors/500.html",
    }
}

fn render_error_page(
    state: Option<&AppState>,
    req: &HttpRequest,
    status: StatusCode,
    details: Option<&str>,
    is_dev: bool,
) -> String {
    let mut ctx = Context::new();
    ctx.insert("code", &status.as_u16());
    ctx.insert("reason", reason_phrase(status));
    ctx.insert("message", &details);
    ctx.insert("path", req.path());

    let rendered = state
        .ok_or_else(|| AppError::Internal("application state missing".to_string()))
        .and_then(|state| state.views.render_file(error_template(status, is_dev), &ctx));

    match rendered {
        Ok(html) => html,
        Err(e) => {
            error!("Error page rendering failed: {}", e);
            fallback_page(status, details)
        }
    }
}

fn fallback_page(status: StatusCode, details: Option<&str>) -> String {
    let reason = reason_phrase(status);
    let details = details
        .map(|d| format!("<pre>{}</pre>", html_escape::encode_text(d)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{code} {reason}</title>
</head>
<body>
    <h1>{code}</h1>
    <h2>{reason}</h2>
    {details}
    <p><a href="/">Retour à l'accueil</a></p>
</body>
</html>"#,
        code = status.as_u16(),
        reason = reason,
        details = details,
    )
}

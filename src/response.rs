//! The response being assembled by a controller action: status, headers,
//! charset and the rendered body, finished into an actix `HttpResponse`.

use actix_web::http::header::{self, HeaderName, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, HttpResponseBuilder};
use serde::Serialize;
use serde_json::json;
use tera::Context;

use crate::context::RequestInfo;
use crate::errors::{AppError, AppResult};
use crate::session::Session;
use crate::state::AppState;
use crate::views::HelperCall;

const DEFAULT_CHARSET: &str = "UTF-8";

/// Reason phrases of the status codes the application answers with.
pub fn status_text(code: u16) -> Option<&'static str> {
    match code {
        200 => Some("OK"),
        403 => Some("Forbidden"),
        404 => Some("Not Found"),
        500 => Some("Internal Server Error"),
        _ => None,
    }
}

pub struct Response {
    state: web::Data<AppState>,
    autoload: Vec<HelperCall>,
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    charset: Option<String>,
    title: Option<String>,
    render: String,
}

impl Response {
    pub fn new(state: web::Data<AppState>, autoload: &[HelperCall]) -> Self {
        Self {
            state,
            autoload: autoload.to_vec(),
            status: StatusCode::OK,
            headers: Vec::new(),
            charset: None,
            title: None,
            render: String::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status_code(&mut self, code: u16) -> AppResult<()> {
        if status_text(code).is_none() {
            return Err(AppError::Internal(format!("Code de réponse inconnu: {}", code)));
        }
        self.status = StatusCode::from_u16(code)
            .map_err(|e| AppError::Internal(format!("Code de réponse invalide: {}", e)))?;
        Ok(())
    }

    pub fn set_charset(&mut self, charset: &str) {
        self.charset = Some(charset.to_string());
    }

    pub fn charset(&self) -> &str {
        self.charset.as_deref().unwrap_or(DEFAULT_CHARSET)
    }

    /// Page title handed to the layout's `Html` helper.
    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    pub fn header(&mut self, name: &str, value: &str) -> AppResult<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| AppError::Internal(format!("En-tête invalide: {}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| AppError::Internal(format!("Valeur d'en-tête invalide pour {}", name)))?;
        self.headers.push((name, value));
        Ok(())
    }

    /// Renders the view at the dotted `path` and appends it to the body.
    pub fn view(&mut self, path: &str, vars: &Context, helpers: &[HelperCall]) -> AppResult<()> {
        let html = self
            .state
            .views
            .require_view(path, vars, helpers, &self.autoload)?;
        self.render.push_str(&html);
        Ok(())
    }

    /// The body rendered so far, without the layout.
    pub fn render(&self) -> &str {
        &self.render
    }

    pub fn clear(&mut self) {
        self.render.clear();
    }

    /// Status line, content type, extra headers and session cookies.
    pub fn prepare(&self, session: &Session) -> HttpResponseBuilder {
        let mut builder = HttpResponse::build(self.status);
        builder.insert_header((
            header::CONTENT_TYPE,
            format!("text/html;charset={}", self.charset()),
        ));
        for (name, value) in &self.headers {
            builder.append_header((name.clone(), value.clone()));
        }
        session.apply(&mut builder);
        builder
    }

    /// Wraps the body in the layout and builds the final response.
    pub fn finish(&self, session: &mut Session) -> AppResult<HttpResponse> {
        let mut layout_helpers = self.autoload.clone();
        if let Some(title) = &self.title {
            layout_helpers.push(HelperCall::with_params("Html", vec![json!(title)]));
        }

        let mut ctx = Context::new();
        ctx.insert("content", &self.render);
        ctx.insert("current_user", &session.user());
        ctx.insert("flash", &session.take_flash());

        let page = self
            .state
            .views
            .require_view("layout", &ctx, &[], &layout_helpers)?;

        Ok(self.prepare(session).body(page))
    }

    /// Redirects to `url`, a path on this site unless already absolute.
    pub fn redirect(&self, url: &str, request: &RequestInfo, session: &Session) -> HttpResponse {
        let location = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            let host = self
                .state
                .config
                .server_name
                .as_deref()
                .unwrap_or(&request.host);
            format!("{}://{}{}", request.scheme, host, url)
        };

        self.redirect_to(location, session)
    }

    /// Redirects to the page the request came from.
    pub fn referer(&self, request: &RequestInfo, session: &Session) -> AppResult<HttpResponse> {
        let referer = request
            .referer
            .clone()
            .ok_or_else(|| AppError::Internal("Il n'existe pas de requête précédente".to_string()))?;
        Ok(self.redirect_to(referer, session))
    }

    fn redirect_to(&self, location: String, session: &Session) -> HttpResponse {
        let mut builder = self.prepare(session);
        if !self.status.is_redirection() {
            builder.status(StatusCode::FOUND);
        }
        builder.insert_header((header::LOCATION, location)).finish()
    }

    pub fn json<T: Serialize>(&self, data: &T) -> HttpResponse {
        HttpResponse::build(self.status).json(data)
    }
}

//! Lets HTML forms, which can only `POST`, reach `DELETE`, `PUT` and
//! `PATCH` routes through a `_method` query parameter.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    web, Error,
};
use serde::Deserialize;
use std::future::{ready, Ready};

#[derive(Deserialize)]
struct Override {
    #[serde(rename = "_method")]
    method: Option<String>,
}

/// The method a `POST` with this query string stands for, if any.
pub fn override_method(query: &str) -> Option<Method> {
    let method = web::Query::<Override>::from_query(query)
        .ok()?
        .into_inner()
        .method?;

    match method.to_ascii_uppercase().as_str() {
        "DELETE" => Some(Method::DELETE),
        "PUT" => Some(Method::PUT),
        "PATCH" => Some(Method::PATCH),
        _ => None,
    }
}

pub struct MethodOverride;

impl<S, B> Transform<S, ServiceRequest> for MethodOverride
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MethodOverrideMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MethodOverrideMiddleware { service }))
    }
}

pub struct MethodOverrideMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for MethodOverrideMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = S::Future;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        if req.method() == Method::POST {
            if let Some(method) = override_method(req.query_string()) {
                req.head_mut().method = method;
            }
        }
        self.service.call(req)
    }
}

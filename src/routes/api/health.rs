use actix_web::{get, web, HttpResponse, Responder};
use log::warn;

use crate::state::AppState;

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    let (status, database) = match state.storage.ping().await {
        Ok(_) => ("healthy", "connected"),
        Err(err) => {
            warn!("Health ping failed: {}", err);
            ("degraded", "disconnected")
        }
    };

    HttpResponse::Ok().json(serde_json::json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "database": database
    }))
}

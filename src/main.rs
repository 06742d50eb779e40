use std::sync::Arc;

use actix_files as fs;
use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info, warn};

use postboard::accounts::initialize_admin;
use postboard::config::{Config, StorageKind};
use postboard::db::{connect_with_retry, Storage};
use postboard::middlewares::{MethodOverride, RequestLogging};
use postboard::{error_handlers, routes, AppState};

// -------------------- Server bootstrap --------------------
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load env
    dotenv().ok();
    // Setup logging
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting server at http://{}:{}", config.host, config.port);
    info!("Environment: {}", config.env_mode());
    info!("Serving templates from {}", config.templates_glob);
    if config.is_dev {
        warn!("Development mode: detailed errors will be shown, set RUST_ENV=production to hide them");
    }

    let storage = match config.storage {
        StorageKind::Mongo => {
            info!("Connecting to MongoDB...");
            let mongodb = match connect_with_retry(&config).await {
                Ok(m) => m,
                Err(e) => {
                    error!("Failed to connect to MongoDB: {}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = mongodb.ensure_indexes().await {
                error!("Failed to create MongoDB indexes: {}", e);
                std::process::exit(1);
            }
            info!("MongoDB connected successfully");
            Storage::mongo(Arc::new(mongodb))
        }
        StorageKind::Memory => {
            warn!("Using in-memory storage, data is lost on restart");
            Storage::memory()
        }
    };

    if let Some(seed) = &config.admin {
        if let Err(e) = initialize_admin(storage.users.as_ref(), seed, config.bcrypt_cost).await {
            error!("Failed to create the initial user: {}", e);
        }
    }

    let bind = (config.host.clone(), config.port);
    let state = match AppState::new(config, storage) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            error!("Template loading failed: {}", e);
            std::process::exit(1);
        }
    };

    HttpServer::new(move || {
        App::new()
            // Share application state
            .app_data(state.clone())
            // Middleware
            .wrap(error_handlers())
            .wrap(MethodOverride)
            .wrap(middleware::NormalizePath::trim())
            .wrap(middleware::Compress::default())
            .wrap(RequestLogging)
            .wrap(middleware::Logger::default())
            // Routes
            .configure(routes::configure)
            // Static files (CSS, JS, images, etc.)
            .service(fs::Files::new("/static", "./static"))
    })
    .bind(bind)?
    .run()
    .await
}

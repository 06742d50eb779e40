use crate::config::Config;
use crate::db::Storage;
use crate::errors::AppResult;
use crate::views::Views;

/// Shared application state, registered once as `web::Data`.
pub struct AppState {
    pub config: Config,
    pub storage: Storage,
    pub views: Views,
}

impl AppState {
    pub fn new(config: Config, storage: Storage) -> AppResult<Self> {
        let views = Views::load(&config.templates_glob)?;
        Ok(Self {
            config,
            storage,
            views,
        })
    }
}

pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod export;
pub mod notifications;

pub use db::DbPool;

use chrono::Utc;
use config::Config;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::engine::{Cart, ScreenGuard};

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub cart: Mutex<Cart>,
    pub guard: Arc<ScreenGuard>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, pin_set: bool) -> Self {
        Self {
            config,
            db,
            cart: Mutex::new(Cart::default()),
            guard: Arc::new(ScreenGuard::new(pin_set, Utc::now())),
        }
    }
}

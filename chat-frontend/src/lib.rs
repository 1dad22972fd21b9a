pub mod config;
pub mod forms;
pub mod handlers;
pub mod http;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod stores;

use config::BackendSettings;
use http::{ApiError, HttpClientFactory};
use services::{AuthService, ChatService, UserService};
use std::sync::Arc;

/// Shared application state containing the backend services
#[derive(Clone)]
pub struct AppState {
    pub factory: Arc<HttpClientFactory>,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub chat_service: ChatService,
}

impl AppState {
    pub fn new(backend: &BackendSettings) -> Result<Self, ApiError> {
        let factory = Arc::new(HttpClientFactory::new(backend)?);
        Ok(Self {
            auth_service: AuthService::new(factory.clone()),
            user_service: UserService::new(factory.clone()),
            chat_service: ChatService::new(factory.clone()),
            factory,
        })
    }
}

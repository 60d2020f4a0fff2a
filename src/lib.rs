pub mod aws_clients;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod meme_service;
pub mod memory_store;
pub mod models;
pub mod payload;
pub mod repositories;
pub mod routes;
pub mod seed;
pub mod startup;
pub mod user_service;

use crate::domain::{MemeRepository, UserRepository};
use crate::meme_service::MemeService;
use crate::user_service::UserService;
use std::sync::Arc;

/// AppState holds shared resources for the web server.
#[derive(Clone)]
pub struct AppState {
    pub meme_service: MemeService,
    pub user_service: UserService,
}

impl AppState {
    pub fn new(memes: Arc<dyn MemeRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self {
            meme_service: MemeService::new(memes.clone(), users.clone()),
            user_service: UserService::new(memes, users),
        }
    }
}

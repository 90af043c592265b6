//! # EduDesk
//!
//! Backend for homeworks, quizzes and attendance sheets. Teachers own
//! assignments, students submit responses, and anyone holding a share link
//! gets the view that link grants.
//!
//! ## Overview
//!
//! The crate is split along the request path:
//!
//! - [`auth`] - token codec, login/refresh service, request authentication
//! - [`policy`] - the access decision table consulted by every handler
//! - [`links`] - share link and attendance PIN generation
//! - [`db`] - libSQL persistence (local file, in-memory, or Turso)
//! - [`api`] - axum handlers, routes and the OpenAPI document
//! - [`types`] - domain records, request/response bodies, [`AppError`]
//! - [`utils`] - `edudesk.toml` loading
//! - [`cli`] - the `edudesk-server` command line
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use edudesk::{api::routes::create_app, db::DatabaseProvider, AppState, EduConfig};
//! use std::sync::Arc;
//!
//! let config = EduConfig::load("edudesk.toml")?;
//! let db = Arc::new(DatabaseProvider::from_config(&config.database).create_client().await?);
//! let app = create_app(AppState::from_config(config, db)?);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `local-db` | Local SQLite database (default) |
//! | `turso` | Remote Turso database |

#![cfg_attr(docsrs, feature(doc_cfg))]

/// HTTP API handlers and routes.
pub mod api;
/// Token authentication and middleware.
pub mod auth;
/// Command line interface.
pub mod cli;
/// Database clients (Turso/SQLite).
pub mod db;
/// Share link and PIN generation.
pub mod links;
/// Access decisions for assignments and submissions.
pub mod policy;
/// Core types (records, requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

pub use auth::jwt::TokenCodec;
pub use auth::service::AuthService;
pub use db::TursoClient;
pub use links::ShareLinkIssuer;
pub use types::{AppError, Result};
pub use utils::toml_config::{ConfigError, EduConfig};

use crate::db::UserLookup;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded `edudesk.toml`
    pub config: Arc<EduConfig>,
    /// Database client
    pub db: Arc<TursoClient>,
    /// Authentication service
    pub auth_service: Arc<AuthService>,
    /// Share link generator
    pub links: Arc<ShareLinkIssuer>,
}

impl AppState {
    /// Builds the state, reading both token secrets from the environment.
    pub fn from_config(config: EduConfig, db: Arc<TursoClient>) -> std::result::Result<Self, ConfigError> {
        let codec = config.token_codec()?;
        Ok(Self::with_codec(config, db, codec))
    }

    /// Builds the state around an already constructed codec.
    pub fn with_codec(config: EduConfig, db: Arc<TursoClient>, codec: TokenCodec) -> Self {
        let users: Arc<dyn UserLookup> = db.clone();
        let auth_service = AuthService::new(codec, config.access_ttl(), config.refresh_ttl(), users);
        let links = config.link_issuer();

        Self {
            config: Arc::new(config),
            db,
            auth_service: Arc::new(auth_service),
            links: Arc::new(links),
        }
    }
}

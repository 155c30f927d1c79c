pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::models::event::SessionEvent;
use crate::services::backend_service::HttpEvaluationBackend;
use crate::services::session_service::{EvaluationSession, SessionSettings};
use crate::utils::time::SystemClock;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

pub use crate::error::{Error, Result};

/// Opens a session against the configured REST backend using the system
/// clock.
pub async fn open_session(
    config: &Config,
    evaluation_id: &str,
) -> Result<(EvaluationSession, UnboundedReceiver<SessionEvent>)> {
    let backend = HttpEvaluationBackend::from_config(config)?;
    EvaluationSession::load(
        Arc::new(backend),
        Arc::new(SystemClock),
        SessionSettings::from(config),
        evaluation_id,
    )
    .await
}

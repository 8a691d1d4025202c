//! Skillbot Server - Kakao skill webhook server.
//!
//! Receives skill events, acknowledges each immediately, and answers
//! asynchronously through an assistant backend, delivering the result to
//! the event's callback URL.
//!
//! ## Architecture
//!
//! ```text
//! Platform → POST /skill → ack ("processing")        (synchronous)
//!                 │
//!                 └→ SessionPipeline                  (background task)
//!                      resolve → trim → append → run
//!                           │
//!                           └→ POST callbackUrl       (best-effort)
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod delivery;
pub mod payload;
pub mod pipeline;
pub mod routes;
pub mod session;
pub mod window;

// Re-export commonly used types
pub use delivery::CallbackSender;
pub use payload::{ack, simple_text, AckResponse, SkillEvent, SkillResponse};
pub use pipeline::SessionPipeline;
pub use routes::{build_router, AppState};
pub use session::SessionStore;
pub use window::{ContextWindow, TrimError};

use skillbot_agent::{AssistantBackend, OpenAiAssistant};
use skillbot_common::config::Config;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Build the shared application state from a backend and configuration.
pub fn create_state(backend: Arc<dyn AssistantBackend>, config: &Config) -> Arc<AppState> {
    let pipeline = Arc::new(SessionPipeline::new(
        backend,
        config.session.max_context_messages,
    ));

    Arc::new(AppState {
        pipeline,
        ack_text: config.session.ack_text.clone(),
    })
}

/// Start the skill HTTP server and serve until the listener closes.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        config.server.bind.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    let backend = Arc::new(OpenAiAssistant::from_config(&config.assistant));
    let state = create_state(backend, config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = build_router(state).layer(cors);

    tracing::info!("Starting Skillbot on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

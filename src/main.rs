//! FixMaster server entry point.
//!
//! Loads configuration, wires adapters into the agent orchestrator, and
//! serves the chat endpoint.

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fixmaster::adapters::ai::{AnthropicConfig, AnthropicEngine};
use fixmaster::adapters::http::chat::{chat_router, ChatAppState};
use fixmaster::adapters::knowledge::{IFixitConfig, IFixitConnector};
use fixmaster::adapters::search::{GroundedSearchConfig, GroundedSearchConnector};
use fixmaster::adapters::session::InMemorySessionStore;
use fixmaster::adapters::usage::InMemoryUsageTracker;
use fixmaster::application::agent::{
    AgentOrchestrator, ContextManager, OrchestratorConfig, ToolRegistry,
};
use fixmaster::config::AppConfig;
use fixmaster::ports::ReasoningEngine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    let engine: Arc<dyn ReasoningEngine> = Arc::new(AnthropicEngine::new(
        AnthropicConfig::new(config.ai.anthropic_api_key.clone().unwrap_or_default())
            .with_model(&config.ai.model)
            .with_timeout(config.ai.timeout())
            .with_max_retries(config.ai.max_retries),
    ));

    let knowledge = Arc::new(IFixitConnector::new(
        IFixitConfig::new()
            .with_base_url(&config.knowledge.base_url)
            .with_timeout(config.knowledge.timeout()),
    ));

    let search = Arc::new(GroundedSearchConnector::new(
        GroundedSearchConfig::new(
            &config.search.endpoint,
            config.search.api_key.clone().unwrap_or_default(),
        )
        .with_timeout(config.search.timeout())
        .with_max_results(config.search.max_results),
    ));

    let store = Arc::new(InMemorySessionStore::new());
    let usage = Arc::new(InMemoryUsageTracker::new());

    let registry = Arc::new(ToolRegistry::new(
        knowledge,
        search,
        config.agent.tool_timeout(),
    ));
    let context = Arc::new(ContextManager::new(
        store,
        engine.clone(),
        config.agent.context_window,
        config.agent.summarize_timeout(),
    ));
    let orchestrator = Arc::new(AgentOrchestrator::new(
        engine,
        registry,
        context,
        usage,
        OrchestratorConfig {
            max_iterations: config.agent.max_iterations,
            engine_timeout: config.ai.timeout(),
            base_cost_tokens: config.agent.base_cost_tokens,
            round_cost_tokens: config.agent.round_cost_tokens,
            fallback_cost_tokens: config.agent.fallback_cost_tokens,
        },
    ));

    let app = chat_router()
        .with_state(ChatAppState::new(orchestrator))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.server.socket_addr();
    info!(%addr, "FixMaster server running");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

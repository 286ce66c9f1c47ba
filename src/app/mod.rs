// Application wiring: builds the triage service from configuration and exposes it over HTTP.

pub mod http;

use crate::adapters::{GeminiClient, JsonlAuditSink, LogDispatchNotifier};
use crate::config::AppConfig;
use crate::core::service::TriageService;
use crate::utils::error::Result;

pub type DefaultTriageService = TriageService<JsonlAuditSink>;

/// Builds the production service. Fails when the reasoning client cannot be
/// constructed (e.g. no API key) or the audit log cannot be opened.
pub fn build_service(config: &AppConfig) -> Result<DefaultTriageService> {
    let model = GeminiClient::new(&config.reasoning)?;
    let audit = JsonlAuditSink::open(&config.audit.path)?;

    tracing::info!(
        "🤖 Reasoning model: {} (timeout {}s, reformat on parse error: {})",
        model.model(),
        config.reasoning.timeout_seconds,
        config.reasoning.reformat_on_parse_error
    );

    Ok(TriageService::new(model, audit, LogDispatchNotifier::new())
        .with_timeout(config.reasoning.timeout())
        .with_reformat_on_parse_error(config.reasoning.reformat_on_parse_error))
}

/// HTTP state for the production service. A missing API key leaves the server up
/// but answering 503 on `/triage`; any other startup failure is returned.
pub fn build_app_state(config: &AppConfig) -> Result<http::AppState<JsonlAuditSink>> {
    match build_service(config) {
        Ok(service) => Ok(http::AppState::ready(service)),
        Err(e) if e.is_unavailable() => {
            tracing::warn!("⚠️ {} - /triage will report service unavailable", e);
            Ok(http::AppState::unavailable(e.to_string()))
        }
        Err(e) => Err(e),
    }
}

use crate::config::toml_config::{AppConfig, DEFAULT_CONFIG_FILE};
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "triage-flow")]
#[command(about = "Reasoning-first triage service")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Override server.bind_addr
    #[arg(long)]
    pub bind_addr: Option<String>,

    /// Override reasoning.timeout_seconds
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// Override audit.path
    #[arg(long)]
    pub audit_path: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    pub log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Loads the TOML file (or defaults), fills the API key from the environment and
    /// applies command-line overrides.
    pub fn resolve(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load_or_default(&self.config)?.with_api_key_from_env();
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(bind_addr) = &self.bind_addr {
            config.server.bind_addr = bind_addr.clone();
            tracing::info!("🔧 bind_addr overridden to: {}", bind_addr);
        }
        if let Some(timeout) = self.timeout_seconds {
            config.reasoning.timeout_seconds = timeout;
            tracing::info!("🔧 timeout_seconds overridden to: {}", timeout);
        }
        if let Some(path) = &self.audit_path {
            config.audit.path = path.clone();
            tracing::info!("🔧 audit.path overridden to: {}", path);
        }
        if self.log_json {
            config.logging.json = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let cli = CliConfig::parse_from([
            "triage-flow",
            "--bind-addr",
            "127.0.0.1:3000",
            "--timeout-seconds",
            "3",
            "--audit-path",
            "/tmp/audit.jsonl",
            "--log-json",
        ]);

        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.server.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.reasoning.timeout_seconds, 3);
        assert_eq!(config.audit.path, "/tmp/audit.jsonl");
        assert!(config.logging.json);
        assert_eq!(cli.config, DEFAULT_CONFIG_FILE);
    }

    #[test]
    fn test_cli_without_overrides_keeps_config() {
        let cli = CliConfig::parse_from(["triage-flow"]);
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.server.bind_addr, "0.0.0.0:8000");
        assert!(!config.logging.json);
        assert!(!cli.verbose);
    }
}

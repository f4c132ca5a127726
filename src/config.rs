use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "volshrink.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub orchestrator: OrchestratorConfig,
    pub agent: AgentConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Port the agent listens on; used when a target name carries no port.
    pub agent_port: u16,
    pub agent_scheme: String,
    /// Bound on every remote call. Expiry fails that target only.
    pub request_timeout_ms: u64,
    /// Shrinks smaller than this get an advisory (not a rejection).
    pub min_granularity_bytes: u64,
    pub max_targets: usize,
    pub parallel_collection: bool,
    /// Target names served in-process instead of over the network.
    pub local_aliases: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_port: 7070,
            agent_scheme: "http".into(),
            request_timeout_ms: 30_000,
            min_granularity_bytes: crate::units::MIB,
            max_targets: 64,
            parallel_collection: true,
            local_aliases: vec!["localhost".into(), ".".into()],
        }
    }
}

impl OrchestratorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// True when agent passwords travel unencrypted.
    pub fn sends_plaintext_credentials(&self) -> bool {
        self.agent_scheme == "http"
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Added to a volume's used space to get its minimum size.
    pub minimum_headroom_bytes: u64,
    /// Program and arguments run to resize; `{device}`, `{mount}` and `{size}` are substituted.
    pub resize_command: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 7070,
            username: String::new(),
            password: String::new(),
            minimum_headroom_bytes: 0,
            resize_command: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    pub path: String,
    pub retention_days: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "data/audit.db".into(),
            retention_days: 90,
        }
    }
}

impl AppConfig {
    /// Loads from `path`, else `CONFIG_FILE`, else `volshrink.toml`.
    /// Only the implicit default file may be missing (defaults are used then).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("CONFIG_FILE").map(Into::into));
        let path = match explicit {
            Some(p) => p,
            None => {
                let p = Path::new(DEFAULT_CONFIG_FILE);
                if !p.exists() {
                    return Ok(Self::default());
                }
                p.to_path_buf()
            }
        };
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading {}: {}", path.display(), e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.orchestrator.agent_port > 0,
            "orchestrator.agent_port must be between 1 and 65535, got {}",
            self.orchestrator.agent_port
        );
        anyhow::ensure!(
            matches!(self.orchestrator.agent_scheme.as_str(), "http" | "https"),
            "orchestrator.agent_scheme must be \"http\" or \"https\", got {:?}",
            self.orchestrator.agent_scheme
        );
        anyhow::ensure!(
            self.orchestrator.request_timeout_ms > 0,
            "orchestrator.request_timeout_ms must be > 0, got {}",
            self.orchestrator.request_timeout_ms
        );
        anyhow::ensure!(
            self.orchestrator.max_targets > 0,
            "orchestrator.max_targets must be > 0, got {}",
            self.orchestrator.max_targets
        );
        anyhow::ensure!(
            self.agent.port > 0,
            "agent.port must be between 1 and 65535, got {}",
            self.agent.port
        );
        anyhow::ensure!(!self.agent.host.is_empty(), "agent.host must be non-empty");
        if self.audit.enabled {
            anyhow::ensure!(!self.audit.path.is_empty(), "audit.path must be non-empty");
            anyhow::ensure!(
                self.audit.retention_days > 0,
                "audit.retention_days must be > 0, got {}",
                self.audit.retention_days
            );
        }
        Ok(())
    }

    /// Extra checks before serving: the agent refuses to start without credentials.
    pub fn validate_agent(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.agent.username.is_empty(),
            "agent.username must be non-empty"
        );
        anyhow::ensure!(
            !self.agent.password.is_empty(),
            "agent.password must be non-empty"
        );
        Ok(())
    }
}

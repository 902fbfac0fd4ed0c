use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::classify::StatusPolicy;

/// Where ingested records go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres(String),
    /// `DATABASE_URL=memory`
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    /// Empty means any origin is allowed.
    pub cors_origins: Vec<String>,
    pub status_policy: StatusPolicy,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let store = if database_url.trim().eq_ignore_ascii_case("memory") {
            StoreBackend::Memory
        } else {
            StoreBackend::Postgres(database_url)
        };

        let cors_origins: Vec<String> = var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty() && *o != "*")
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            store,
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&var, "PORT", 3001).context("PORT must be a valid number")?,
            max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", 10)
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            cors_origins,
            status_policy: parse_or(&var, "STATUS_POLICY", StatusPolicy::Computed)
                .context("STATUS_POLICY must be 'computed' or 'supplied'")?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cors_layer(&self) -> anyhow::Result<CorsLayer> {
        if self.cors_origins.is_empty() {
            return Ok(CorsLayer::permissive());
        }

        let origins = self
            .cors_origins
            .iter()
            .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin {o:?}")))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]))
    }
}

// ── Simulator ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulatorMode {
    /// One random event per tick.
    Basic,
    /// A live event plus perturbed scenario variants per tick.
    #[default]
    Scenario,
}

impl FromStr for SimulatorMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(SimulatorMode::Basic),
            "scenario" => Ok(SimulatorMode::Scenario),
            other => Err(anyhow!("unknown simulator mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Full ingestion URL, e.g. `http://localhost:3001/data`.
    pub backend_url: String,
    pub interval: Duration,
    pub mode: SimulatorMode,
    pub scenarios: usize,
    pub dataset: Option<PathBuf>,
    /// Stop after this many ticks; `None` runs until interrupted.
    pub max_ticks: Option<u64>,
}

impl SimulatorConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let interval_secs: u64 = parse_or(&var, "SIMULATOR_INTERVAL_SECS", 5)
            .context("SIMULATOR_INTERVAL_SECS must be a valid number")?;
        if interval_secs == 0 {
            return Err(anyhow!("SIMULATOR_INTERVAL_SECS must be > 0"));
        }

        let max_ticks = var("SIMULATOR_MAX_TICKS")
            .map(|raw| raw.trim().parse::<u64>())
            .transpose()
            .context("SIMULATOR_MAX_TICKS must be a valid number")?;

        Ok(Self {
            backend_url: var("BACKEND_URL")
                .unwrap_or_else(|| "http://localhost:3001/data".to_string()),
            interval: Duration::from_secs(interval_secs),
            mode: parse_or(&var, "SIMULATOR_MODE", SimulatorMode::Scenario)?,
            scenarios: parse_or(&var, "SIMULATOR_SCENARIOS", 3)
                .context("SIMULATOR_SCENARIOS must be a valid number")?,
            dataset: var("SIMULATOR_DATASET")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            max_ticks,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e| anyhow!("{key}={raw:?}: {e}")),
        None => Ok(default),
    }
}

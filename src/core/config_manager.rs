// src/core/config_manager.rs
//! Configuration loading: defaults, then an optional TOML file, then the
//! environment

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::core::FsOps;

const DEFAULT_CONFIG_FILE: &str = "talentflow.toml";

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment: EnvironmentConfig,
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub name: String,
    pub database_path: PathBuf,
    pub upload_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedStep {
    pub message: String,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub confirmation_message: String,
    pub steps: Vec<ScriptedStep>,
    /// Pause between the last announcement and the structured preview.
    pub final_delay: Duration,
    /// Pause before a refinement produces its replacement preview.
    pub refine_delay: Duration,
    pub notification_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let step = |message: &str, millis: u64| ScriptedStep {
            message: message.to_string(),
            delay: Duration::from_millis(millis),
        };
        Self {
            confirmation_message:
                "Got it! I'm analyzing your requirements and building a search plan.".to_string(),
            steps: vec![
                step("Parsing job requirements...", 1000),
                step("Extracting key skills and experience...", 1500),
                step("Identifying target companies...", 1500),
                step("Generating search strategy...", 1000),
            ],
            final_delay: Duration::from_millis(1000),
            refine_delay: Duration::from_millis(1500),
            notification_capacity: 50,
        }
    }
}

// ===== File Format =====

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    environment: EnvironmentSection,
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    pipeline: PipelineSection,
}

#[derive(Debug, Default, Deserialize)]
struct EnvironmentSection {
    database_path: Option<PathBuf>,
    upload_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelineSection {
    confirmation_message: Option<String>,
    steps: Option<Vec<StepSection>>,
    final_delay_ms: Option<u64>,
    refine_delay_ms: Option<u64>,
    notification_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct StepSection {
    message: String,
    delay_ms: u64,
}

impl ConfigManager {
    pub fn load() -> Result<Self> {
        let env = std::env::var("TALENTFLOW_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string());
        info!("Loading configuration for environment: {}", env);

        let base_dir = if env == "production" {
            PathBuf::from("/app")
        } else {
            std::env::current_dir().context("Failed to get current directory")?
        };

        let config_path = std::env::var("TALENTFLOW_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| base_dir.join(DEFAULT_CONFIG_FILE));

        let file = if config_path.exists() {
            info!("Reading configuration file: {}", config_path.display());
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            Self::parse_file(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            ConfigFile::default()
        };

        let mut config = Self::from_file(&env, &base_dir, file);
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn parse_file(content: &str) -> Result<ConfigFile> {
        Ok(toml::from_str(content)?)
    }

    fn from_file(env: &str, base_dir: &Path, file: ConfigFile) -> Self {
        let resolve = |path: Option<PathBuf>, default: &str| {
            let path = path.unwrap_or_else(|| PathBuf::from(default));
            if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            }
        };

        let environment = EnvironmentConfig {
            name: env.to_string(),
            database_path: resolve(file.environment.database_path, "talentflow.db"),
            upload_path: resolve(file.environment.upload_path, "uploads"),
        };

        let server = ServerConfig {
            address: file
                .server
                .address
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: file.server.port.unwrap_or(8000),
        };

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            confirmation_message: file
                .pipeline
                .confirmation_message
                .unwrap_or(defaults.confirmation_message),
            steps: match file.pipeline.steps {
                Some(steps) => steps
                    .into_iter()
                    .map(|s| ScriptedStep {
                        message: s.message,
                        delay: Duration::from_millis(s.delay_ms),
                    })
                    .collect(),
                None => defaults.steps,
            },
            final_delay: file
                .pipeline
                .final_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.final_delay),
            refine_delay: file
                .pipeline
                .refine_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.refine_delay),
            notification_capacity: file
                .pipeline
                .notification_capacity
                .unwrap_or(defaults.notification_capacity),
        };

        Self {
            environment,
            server,
            pipeline,
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("DATABASE_PATH") {
            self.environment.database_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("UPLOAD_PATH") {
            self.environment.upload_path = PathBuf::from(path);
        }
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid port number"))?;
        }
        Ok(())
    }

    /// Ensure the upload directory and the database parent exist.
    pub async fn ensure_directories(&self) -> Result<()> {
        FsOps::ensure_dir_exists(&self.environment.upload_path)
            .await
            .context("Failed to create upload directory")?;

        if let Some(db_parent) = self.environment.database_path.parent() {
            FsOps::ensure_dir_exists(db_parent)
                .await
                .context("Failed to create database directory")?;
        }

        Ok(())
    }
}

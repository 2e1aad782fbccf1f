use crate::settings::AlarmSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
    #[serde(default)]
    pub alarms: AlarmSettings,
    #[serde(default)]
    pub reachability: ReachabilityConfig,
    #[serde(default)]
    pub gpu: GpuQueryConfig,
    #[serde(default)]
    pub siren: SirenConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReachabilityConfig {
    #[serde(default = "default_reachability_host")]
    pub host: String,
    #[serde(default = "default_reachability_port")]
    pub port: u16,
    #[serde(default = "default_reachability_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GpuQueryConfig {
    #[serde(default = "default_gpu_command")]
    pub command: String,
    #[serde(default = "default_gpu_args")]
    pub args: Vec<String>,
    #[serde(default = "default_gpu_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SirenConfig {
    /// Команда проигрывателя, например `["paplay", "alarm.wav"]`.
    /// Без неё используется звонок терминала.
    #[serde(default)]
    pub command: Option<Vec<String>>,
    #[serde(default = "default_siren_loops")]
    pub loops: u32,
    #[serde(default = "default_siren_interval_ms")]
    pub interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            refresh_interval_secs: default_refresh_interval_secs(),
            monitor_interval_secs: default_monitor_interval_secs(),
            alarms: AlarmSettings::default(),
            reachability: ReachabilityConfig::default(),
            gpu: GpuQueryConfig::default(),
            siren: SirenConfig::default(),
        }
    }
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        Self {
            host: default_reachability_host(),
            port: default_reachability_port(),
            timeout_ms: default_reachability_timeout_ms(),
        }
    }
}

impl Default for GpuQueryConfig {
    fn default() -> Self {
        Self {
            command: default_gpu_command(),
            args: default_gpu_args(),
            timeout_ms: default_gpu_timeout_ms(),
        }
    }
}

impl Default for SirenConfig {
    fn default() -> Self {
        Self {
            command: None,
            loops: default_siren_loops(),
            interval_ms: default_siren_interval_ms(),
        }
    }
}

impl ReachabilityConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("не удалось прочитать файл конфигурации {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("не удалось разобрать YAML в {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("ошибка валидации конфигурации: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        Self::from_yaml(&text, &path_display)
    }

    pub fn from_yaml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Validation(
                "поле listen обязательно".to_string(),
            ));
        }
        if SocketAddr::from_str(&self.listen).is_err() {
            return Err(ConfigError::Validation(
                "поле listen должно быть корректным адресом host:port".to_string(),
            ));
        }
        if self.refresh_interval_secs < 1 {
            return Err(ConfigError::Validation(
                "refresh_interval_secs должно быть >= 1".to_string(),
            ));
        }
        if self.monitor_interval_secs < 1 {
            return Err(ConfigError::Validation(
                "monitor_interval_secs должно быть >= 1".to_string(),
            ));
        }

        self.alarms
            .validate()
            .map_err(|err| ConfigError::Validation(format!("alarms: {err}")))?;
        validate_reachability(&self.reachability)?;
        validate_gpu(&self.gpu)?;
        validate_siren(&self.siren)?;

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_reachability(cfg: &ReachabilityConfig) -> Result<(), ConfigError> {
    if cfg.host.trim().is_empty() {
        return Err(ConfigError::Validation(
            "reachability.host не должен быть пустым".to_string(),
        ));
    }
    if cfg.port == 0 {
        return Err(ConfigError::Validation(
            "reachability.port должен быть в диапазоне 1..65535".to_string(),
        ));
    }
    if cfg.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "reachability.timeout_ms должен быть > 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_gpu(cfg: &GpuQueryConfig) -> Result<(), ConfigError> {
    if cfg.command.trim().is_empty() {
        return Err(ConfigError::Validation(
            "gpu.command не должен быть пустым".to_string(),
        ));
    }
    if cfg.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "gpu.timeout_ms должен быть > 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_siren(cfg: &SirenConfig) -> Result<(), ConfigError> {
    if cfg.loops < 1 {
        return Err(ConfigError::Validation(
            "siren.loops должно быть >= 1".to_string(),
        ));
    }
    if let Some(command) = &cfg.command {
        if command.first().map_or(true, |program| program.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "siren.command должен содержать программу".to_string(),
            ));
        }
    }
    Ok(())
}

fn default_listen() -> String {
    "127.0.0.1:9187".to_string()
}

const fn default_refresh_interval_secs() -> u64 {
    1
}

const fn default_monitor_interval_secs() -> u64 {
    5
}

fn default_reachability_host() -> String {
    "8.8.8.8".to_string()
}

const fn default_reachability_port() -> u16 {
    53
}

const fn default_reachability_timeout_ms() -> u64 {
    3000
}

fn default_gpu_command() -> String {
    "nvidia-smi".to_string()
}

fn default_gpu_args() -> Vec<String> {
    vec![
        "--query-gpu=temperature.gpu".to_string(),
        "--format=csv,noheader,nounits".to_string(),
    ]
}

const fn default_gpu_timeout_ms() -> u64 {
    5000
}

const fn default_siren_loops() -> u32 {
    100
}

const fn default_siren_interval_ms() -> u64 {
    1000
}

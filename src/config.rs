// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Orchestrator configuration from environment variables or TOML.
//!
//! All values are loaded from `MOBILE_AI_*` environment variables with
//! defaults. Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `MOBILE_AI_GPU_MAX_TOKENS` | 128 | Token sequence length, GPU engine |
//! | `MOBILE_AI_FALLBACK_MAX_TOKENS` | 512 | Token sequence length, fallback engine |
//! | `MOBILE_AI_NUM_THREADS` | 4 | CPU threads (0 = all cores) |
//! | `MOBILE_AI_DYNAMIC_SEQ_LEN` | 8 | Size given to dynamic input dimensions |
//! | `MOBILE_AI_WARM_UP` | true | Run one inference after init |
//! | `MOBILE_AI_PERF_PROBE` | true | Time one inference for the score |
//! | `MOBILE_AI_GPU_ASSETS` | built-in list | Comma-separated asset candidates |
//! | `MOBILE_AI_LOG_LEVEL` | info | `EnvFilter` directive |
//! | `MOBILE_AI_LOG_FORMAT` | json | `json` or `pretty` |

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::runtime::DelegateOptions;
use crate::engine::tokenizer::TokenizerPolicy;
use crate::engine::AdapterSettings;
use crate::telemetry::{LogConfig, LogFormat};

const MAX_TOKENS_CEILING: usize = 8192;

/// Bundled GPU models, best first.
const DEFAULT_GPU_ASSETS: &[&str] = &[
    "models/real_tinyllama.tflite",
    "models/tiny_transformer.tflite",
    "models/numeric_model.tflite",
    "models/simple_text_model.tflite",
    "models/phi3_mini_mobile.tflite",
    "models/distilbert_mobile.tflite",
    "models/text_generator_mobile.tflite",
    "models/gemma_270m_mobile.tflite",
    "models/test_model.tflite",
];

pub fn default_gpu_assets() -> Vec<String> {
    DEFAULT_GPU_ASSETS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for both engines and logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub gpu_max_tokens: usize,
    pub fallback_max_tokens: usize,
    /// 0 means one thread per CPU.
    pub num_threads: usize,
    pub dynamic_seq_len: usize,
    pub warm_up: bool,
    pub perf_probe: bool,
    pub gpu_assets: Vec<String>,
    pub delegate: DelegateOptions,
    pub log: LogConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            gpu_max_tokens: 128,
            fallback_max_tokens: 512,
            num_threads: 4,
            dynamic_seq_len: 8,
            warm_up: true,
            perf_probe: true,
            gpu_assets: default_gpu_assets(),
            delegate: DelegateOptions::default(),
            log: LogConfig::default(),
        }
    }
}

/// Effective configuration summary (serializable).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveConfig {
    pub gpu_max_tokens: usize,
    pub fallback_max_tokens: usize,
    pub num_threads: usize,
    pub dynamic_seq_len: usize,
    pub warm_up: bool,
    pub perf_probe: bool,
    pub gpu_assets: Vec<String>,
    pub delegate: DelegateOptions,
    pub log_level: String,
    pub log_format: LogFormat,
}

fn env_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn env_list(key: &str) -> Option<Vec<String>> {
    let val = std::env::var(key).ok()?;
    let list: Vec<String> = val
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    (!list.is_empty()).then_some(list)
}

/// Load configuration from environment variables.
///
/// Missing or invalid values fall back to defaults without panicking.
pub fn load() -> OrchestratorConfig {
    let defaults = OrchestratorConfig::default();
    let log = LogConfig {
        level: std::env::var("MOBILE_AI_LOG_LEVEL").unwrap_or(defaults.log.level.clone()),
        format: std::env::var("MOBILE_AI_LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.log.format),
        output_path: None,
    };

    OrchestratorConfig {
        gpu_max_tokens: env_usize("MOBILE_AI_GPU_MAX_TOKENS", defaults.gpu_max_tokens),
        fallback_max_tokens: env_usize("MOBILE_AI_FALLBACK_MAX_TOKENS", defaults.fallback_max_tokens),
        num_threads: env_usize("MOBILE_AI_NUM_THREADS", defaults.num_threads),
        dynamic_seq_len: env_usize("MOBILE_AI_DYNAMIC_SEQ_LEN", defaults.dynamic_seq_len),
        warm_up: env_bool("MOBILE_AI_WARM_UP", defaults.warm_up),
        perf_probe: env_bool("MOBILE_AI_PERF_PROBE", defaults.perf_probe),
        gpu_assets: env_list("MOBILE_AI_GPU_ASSETS").unwrap_or(defaults.gpu_assets),
        delegate: defaults.delegate,
        log,
    }
    .normalized()
}

impl OrchestratorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        Ok(config.normalized())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Apply floors and ceilings.
    pub fn normalized(mut self) -> Self {
        self.gpu_max_tokens = self.gpu_max_tokens.clamp(1, MAX_TOKENS_CEILING);
        self.fallback_max_tokens = self.fallback_max_tokens.clamp(1, MAX_TOKENS_CEILING);
        self.dynamic_seq_len = self.dynamic_seq_len.clamp(1, MAX_TOKENS_CEILING);
        if self.gpu_assets.is_empty() {
            self.gpu_assets = default_gpu_assets();
        }
        self
    }

    /// Thread count with 0 resolved to the number of CPUs.
    pub fn resolved_threads(&self) -> usize {
        if self.num_threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.num_threads
        }
    }

    pub fn gpu_settings(&self) -> AdapterSettings {
        AdapterSettings {
            tokenizer: TokenizerPolicy {
                max_len: self.gpu_max_tokens,
                ..TokenizerPolicy::gpu_default()
            },
            delegate: self.delegate.clone(),
            num_threads: self.resolved_threads(),
            dynamic_seq_len: self.dynamic_seq_len,
            warm_up: self.warm_up,
            perf_probe: self.perf_probe,
            asset_candidates: self.gpu_assets.clone(),
        }
    }

    pub fn fallback_settings(&self) -> AdapterSettings {
        AdapterSettings {
            tokenizer: TokenizerPolicy {
                max_len: self.fallback_max_tokens,
                ..TokenizerPolicy::fallback_default()
            },
            asset_candidates: Vec::new(),
            ..self.gpu_settings()
        }
    }

    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            gpu_max_tokens: self.gpu_max_tokens,
            fallback_max_tokens: self.fallback_max_tokens,
            num_threads: self.resolved_threads(),
            dynamic_seq_len: self.dynamic_seq_len,
            warm_up: self.warm_up,
            perf_probe: self.perf_probe,
            gpu_assets: self.gpu_assets.clone(),
            delegate: self.delegate.clone(),
            log_level: self.log.level.clone(),
            log_format: self.log.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serialize env-mutating tests to avoid cross-test pollution.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "MOBILE_AI_GPU_MAX_TOKENS",
        "MOBILE_AI_FALLBACK_MAX_TOKENS",
        "MOBILE_AI_NUM_THREADS",
        "MOBILE_AI_DYNAMIC_SEQ_LEN",
        "MOBILE_AI_WARM_UP",
        "MOBILE_AI_PERF_PROBE",
        "MOBILE_AI_GPU_ASSETS",
        "MOBILE_AI_LOG_LEVEL",
        "MOBILE_AI_LOG_FORMAT",
    ];

    fn clear_env_vars() {
        for k in ENV_KEYS {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn test_defaults_are_sensible() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        let cfg = load();
        assert_eq!(cfg, OrchestratorConfig::default());
        assert_eq!(cfg.gpu_assets.len(), 9);
        assert_eq!(cfg.gpu_assets[0], "models/real_tinyllama.tflite");
        assert_eq!(cfg.log.format, LogFormat::Json);
    }

    #[test]
    fn test_env_vars_override_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("MOBILE_AI_GPU_MAX_TOKENS", "64");
        std::env::set_var("MOBILE_AI_WARM_UP", "off");
        std::env::set_var("MOBILE_AI_GPU_ASSETS", "a.tflite, b.tflite,,");
        std::env::set_var("MOBILE_AI_LOG_FORMAT", "pretty");
        let cfg = load();
        assert_eq!(cfg.gpu_max_tokens, 64);
        assert!(!cfg.warm_up);
        assert_eq!(cfg.gpu_assets, vec!["a.tflite", "b.tflite"]);
        assert_eq!(cfg.log.format, LogFormat::Pretty);
        clear_env_vars();
    }

    #[test]
    fn test_invalid_env_falls_back_to_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("MOBILE_AI_FALLBACK_MAX_TOKENS", "lots");
        std::env::set_var("MOBILE_AI_PERF_PROBE", "maybe");
        std::env::set_var("MOBILE_AI_LOG_FORMAT", "xml");
        std::env::set_var("MOBILE_AI_GPU_ASSETS", " , ");
        let cfg = load();
        assert_eq!(cfg.fallback_max_tokens, 512);
        assert!(cfg.perf_probe);
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert_eq!(cfg.gpu_assets, default_gpu_assets());
        clear_env_vars();
    }

    #[test]
    fn test_floors_applied() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("MOBILE_AI_GPU_MAX_TOKENS", "0");
        std::env::set_var("MOBILE_AI_DYNAMIC_SEQ_LEN", "0");
        std::env::set_var("MOBILE_AI_NUM_THREADS", "0");
        let cfg = load();
        assert_eq!(cfg.gpu_max_tokens, 1);
        assert_eq!(cfg.dynamic_seq_len, 1);
        assert!(cfg.resolved_threads() >= 1);
        clear_env_vars();
    }

    #[test]
    fn test_toml_partial_override() {
        let cfg = OrchestratorConfig::from_toml_str(
            r#"
            gpu_max_tokens = 256
            warm_up = false

            [delegate]
            preference = "sustained_speed"
            priorities = ["max_precision", "auto", "auto"]
            enable_quantized = false

            [log]
            level = "debug"
            format = "pretty"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.gpu_max_tokens, 256);
        assert_eq!(cfg.fallback_max_tokens, 512);
        assert!(!cfg.warm_up);
        assert!(!cfg.delegate.enable_quantized);
        assert_eq!(cfg.log.level, "debug");
        assert_eq!(cfg.gpu_settings().tokenizer.max_len, 256);
    }

    #[test]
    fn test_toml_errors_are_reported() {
        assert!(matches!(
            OrchestratorConfig::from_toml_str("gpu_max_tokens = \"many\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            OrchestratorConfig::from_file(Path::new("/no/such/config.toml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_engine_settings_differ_in_tokenizer() {
        let cfg = OrchestratorConfig::default();
        let gpu = cfg.gpu_settings();
        let fallback = cfg.fallback_settings();
        assert_eq!(gpu.tokenizer, TokenizerPolicy::gpu_default());
        assert_eq!(fallback.tokenizer, TokenizerPolicy::fallback_default());
        assert!(fallback.asset_candidates.is_empty());
        assert_eq!(gpu, AdapterSettings::gpu_default());
    }

    #[test]
    fn test_effective_config_serializes() {
        let eff = OrchestratorConfig::default().effective_config();
        let json = serde_json::to_value(&eff).unwrap();
        assert_eq!(json["gpu_max_tokens"], 128);
        assert_eq!(json["log_format"], "json");
    }
}

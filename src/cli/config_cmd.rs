// Copyright 2024-2026 Mobile AI Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Config CLI subcommands: show, defaults, validate.
//!
//! These commands read configuration from environment variables or a TOML
//! file passed with `--config`.

use std::path::Path;

use crate::config::{self, EffectiveConfig, OrchestratorConfig};

/// Environment config, or the TOML file at `path` if given.
pub fn load_config(path: Option<&Path>) -> Result<OrchestratorConfig, config::ConfigError> {
    match path {
        Some(path) => OrchestratorConfig::from_file(path),
        None => Ok(config::load()),
    }
}

/// Print effective config as key-value pairs to stdout.
pub fn run_show(path: Option<&Path>) -> i32 {
    match load_config(path) {
        Ok(cfg) => {
            print_config(&cfg.effective_config());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            super::EXIT_USAGE
        }
    }
}

/// Print default config values (no env overrides) to stdout.
pub fn run_defaults() {
    print_config(&OrchestratorConfig::default().effective_config());
}

/// Validate configuration for obvious misconfigurations.
///
/// Returns 0 if valid, 1 if any warnings are found, 2 if it cannot be loaded.
pub fn run_validate(path: Option<&Path>) -> i32 {
    let cfg = match load_config(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {}", e);
            return super::EXIT_USAGE;
        }
    };
    let warnings = validate(&cfg);
    for w in &warnings {
        eprintln!("WARNING: {}", w);
    }
    if warnings.is_empty() {
        println!("Configuration is valid.");
        0
    } else {
        1
    }
}

/// Settings that load but will not work as intended.
pub fn validate(cfg: &OrchestratorConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if cfg.dynamic_seq_len > cfg.gpu_max_tokens {
        warnings.push(format!(
            "MOBILE_AI_DYNAMIC_SEQ_LEN ({}) > MOBILE_AI_GPU_MAX_TOKENS ({}); tokens past {} are never bound",
            cfg.dynamic_seq_len, cfg.gpu_max_tokens, cfg.gpu_max_tokens
        ));
    }
    if cfg.fallback_max_tokens < 2 {
        warnings.push(format!(
            "MOBILE_AI_FALLBACK_MAX_TOKENS ({}) leaves no room for text between BOS and EOS",
            cfg.fallback_max_tokens
        ));
    }
    if tracing_subscriber::EnvFilter::try_new(&cfg.log.level).is_err() {
        warnings.push(format!("MOBILE_AI_LOG_LEVEL '{}' is not a valid filter", cfg.log.level));
    }
    warnings
}

fn print_config(cfg: &EffectiveConfig) {
    println!("MOBILE_AI_GPU_MAX_TOKENS={}", cfg.gpu_max_tokens);
    println!("MOBILE_AI_FALLBACK_MAX_TOKENS={}", cfg.fallback_max_tokens);
    println!("MOBILE_AI_NUM_THREADS={}", cfg.num_threads);
    println!("MOBILE_AI_DYNAMIC_SEQ_LEN={}", cfg.dynamic_seq_len);
    println!("MOBILE_AI_WARM_UP={}", cfg.warm_up);
    println!("MOBILE_AI_PERF_PROBE={}", cfg.perf_probe);
    println!("MOBILE_AI_GPU_ASSETS={}", cfg.gpu_assets.join(","));
    println!("MOBILE_AI_LOG_LEVEL={}", cfg.log_level);
    println!("MOBILE_AI_LOG_FORMAT={}", cfg.log_format);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate_clean() {
        assert!(validate(&OrchestratorConfig::default()).is_empty());
    }

    #[test]
    fn test_validate_flags_seq_len_and_filter() {
        let mut cfg = OrchestratorConfig { dynamic_seq_len: 256, ..Default::default() };
        cfg.log.level = "[[[".to_string();
        let warnings = validate(&cfg);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("MOBILE_AI_DYNAMIC_SEQ_LEN"));
    }

    #[test]
    fn test_load_config_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "fallback_max_tokens = 1\n").unwrap();
        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.fallback_max_tokens, 1);
        assert_eq!(validate(&cfg).len(), 1);
        assert_eq!(run_validate(Some(file.path())), 1);
    }

    #[test]
    fn test_bad_file_is_usage_error() {
        assert_eq!(run_show(Some(Path::new("/no/such/file.toml"))), 2);
    }
}

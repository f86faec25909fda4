//! mobile-ai-cli entry point.
//!
//! ## CLI Subcommands
//!
//! - `mobile-ai-cli infer <model> <text>` - Initialize from a model file and run once
//! - `mobile-ai-cli assets <dir> <text>` - Initialize from bundled assets and run once
//! - `mobile-ai-cli info <model> [--json]` - Backend info and engine status
//! - `mobile-ai-cli selftest` - Exercise the pipeline on scripted engines
//! - `mobile-ai-cli config show|defaults|validate`

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use mobile_ai_core::cli::{config_cmd, engine_cmd, EXIT_USAGE};
use mobile_ai_core::telemetry::{init_logging, init_metrics};

fn main() -> ExitCode {
    let mut args: Vec<String> = std::env::args().collect();
    let config_path = take_flag_value(&mut args, "--config").map(PathBuf::from);
    let json = take_flag(&mut args, "--json");
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    let code = match command {
        "infer" | "assets" | "info" | "selftest" => {
            let config = match config_cmd::load_config(config_path.as_deref()) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::from(EXIT_USAGE as u8);
                }
            };
            if let Err(e) = init_logging(&config.log) {
                eprintln!("Warning: logging disabled: {}", e);
            }
            init_metrics();

            match (command, args.get(2), args.get(3)) {
                ("infer", Some(model), Some(text)) => engine_cmd::run_infer(&config, Path::new(model), text),
                ("assets", Some(dir), Some(text)) => engine_cmd::run_assets(&config, Path::new(dir), text),
                ("info", Some(model), _) => engine_cmd::run_info(&config, Path::new(model), json),
                ("selftest", _, _) => engine_cmd::run_selftest(&config),
                _ => {
                    print_command_help(command);
                    EXIT_USAGE
                }
            }
        }
        "config" => {
            let subcommand = args.get(2).map(|s| s.as_str()).unwrap_or("show");
            match subcommand {
                "show" => config_cmd::run_show(config_path.as_deref()),
                "defaults" => {
                    config_cmd::run_defaults();
                    0
                }
                "validate" => config_cmd::run_validate(config_path.as_deref()),
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_command_help("config");
                    1
                }
            }
        }
        "help" | "--help" | "-h" => {
            if let Some(subcommand) = args.get(2) {
                print_command_help(subcommand);
            } else {
                print_usage();
            }
            0
        }
        "version" | "--version" | "-V" => {
            println!("mobile-ai-cli {}", env!("CARGO_PKG_VERSION"));
            0
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            1
        }
    };
    ExitCode::from(code as u8)
}

/// Remove `flag` from `args`; true if it was present.
fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    match args.iter().position(|a| a == flag) {
        Some(i) => {
            args.remove(i);
            true
        }
        None => false,
    }
}

/// Remove `flag VALUE` from `args` and return the value.
fn take_flag_value(args: &mut Vec<String>, flag: &str) -> Option<String> {
    let i = args.iter().position(|a| a == flag)?;
    args.remove(i);
    (i < args.len()).then(|| args.remove(i))
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "mobile-ai-cli - On-device inference backend orchestrator v{}

USAGE:
    mobile-ai-cli [COMMAND] [OPTIONS]

COMMANDS:
    infer        Initialize from a model file and run one inference
    assets       Initialize from a bundled asset directory and run one inference
    info         Show the selected backend and engine status
    selftest     Exercise backend selection and inference on scripted engines
    config       Show or validate configuration (show, defaults, validate)
    version      Show version information
    help         Show this help message

OPTIONS:
    --config FILE  Load configuration from a TOML file instead of the environment
    --json         JSON output (info)
    -h, --help     Show help for command
    -V, --version  Show version information

ENVIRONMENT:
    MOBILE_AI_GPU_MAX_TOKENS       Token sequence length, GPU engine (default: 128)
    MOBILE_AI_FALLBACK_MAX_TOKENS  Token sequence length, fallback engine (default: 512)
    MOBILE_AI_NUM_THREADS          CPU threads, 0 = all cores (default: 4)
    MOBILE_AI_DYNAMIC_SEQ_LEN      Size for dynamic input dimensions (default: 8)
    MOBILE_AI_WARM_UP              Warm-up inference after init (default: true)
    MOBILE_AI_PERF_PROBE           Timed probe for the performance score (default: true)
    MOBILE_AI_GPU_ASSETS           Comma-separated bundled model candidates
    MOBILE_AI_LOG_LEVEL            Log filter (default: info)
    MOBILE_AI_LOG_FORMAT           json or pretty (default: json)

EXIT CODES:
    0  Success
    1  Failure (no backend initialized, failed check)
    2  Usage or configuration error
",
        version
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "infer" => eprintln!(
            "mobile-ai-cli infer - Run one inference from a model file

USAGE:
    mobile-ai-cli infer <MODEL> <TEXT> [--config FILE]

DESCRIPTION:
    Tries the GPU engine first and the accelerated fallback engine second.
    Prints backend info to stderr and the response to stdout.
"
        ),
        "assets" => eprintln!(
            "mobile-ai-cli assets - Run one inference from bundled assets

USAGE:
    mobile-ai-cli assets <DIR> <TEXT> [--config FILE]

DESCRIPTION:
    Serves MOBILE_AI_GPU_ASSETS candidates from DIR. If none loads, the GPU
    engine answers in fallback mode.
"
        ),
        "info" => eprintln!(
            "mobile-ai-cli info - Show backend selection for a model

USAGE:
    mobile-ai-cli info <MODEL> [--json] [--config FILE]
"
        ),
        "selftest" => eprintln!(
            "mobile-ai-cli selftest - Check selection and inference on scripted engines

USAGE:
    mobile-ai-cli selftest

EXIT CODES:
    0  All checks passed
    1  At least one check failed
"
        ),
        "config" => eprintln!(
            "mobile-ai-cli config - Configuration

USAGE:
    mobile-ai-cli config show [--config FILE]
    mobile-ai-cli config defaults
    mobile-ai-cli config validate [--config FILE]
"
        ),
        _ => {
            eprintln!("No help available for '{}'", command);
            print_usage();
        }
    }
}

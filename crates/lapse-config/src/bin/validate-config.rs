//! Config validation CLI tool
//!
//! Validates a lapse configuration file and reports any errors.

use lapse_api::MissingTagAction;
use lapse_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a lapse configuration file.");
            eprintln!();
            eprintln!("Default location: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match lapse_config::load_config(&config_path) {
        Ok(policy) => {
            let lifecycle = &policy.lifecycle;
            let missing = match lifecycle.default_action_on_missing_tag {
                MissingTagAction::None => "none",
                MissingTagAction::Warn => "warn",
            };

            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", lapse_config::CURRENT_CONFIG_VERSION);
            println!("  Stop-after tag: \"{}\"", lifecycle.tag_key);
            println!("  Warning period: {} days", lifecycle.warning_period_days);
            println!("  Missing tag action: {}", missing);
            println!("  Warning annotation tag: \"{}\"", lifecycle.annotation_tag_key);
            println!("  State tag: \"{}\"", lifecycle.state_tag_key);
            if !lifecycle.exempt_tag_keys.is_empty() {
                println!("  Exempt tags: {}", lifecycle.exempt_tag_keys.join(", "));
            }
            println!("  Channel: {}", policy.notifications.channel);
            println!(
                "  Webhook: {}",
                if policy.notifications.webhook_url.is_some() { "configured" } else { "none" }
            );
            println!("  Inventory: {}", policy.service.inventory_path.display());
            println!("  Journal: {}", policy.service.journal_path.display());

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                lapse_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                lapse_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                lapse_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                lapse_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        lapse_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}

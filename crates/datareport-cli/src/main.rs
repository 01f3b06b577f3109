//! # datareport CLI entry point
//!
//! Parses command-line arguments, initialises tracing and dispatches to the
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use datareport_cli::config::VerifyConfig;
use datareport_cli::verify::{run_check_rules, run_verify, CheckRulesArgs, VerifyArgs};

/// datareport — validate structured report data against rule trees.
#[derive(Parser, Debug)]
#[command(name = "datareport", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate data files against a rule file.
    Verify(VerifyArgs),

    /// Parse a rule file and report malformed rules.
    CheckRules(CheckRulesArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "datareport starting");

    let result = VerifyConfig::resolve(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Verify(args) => run_verify(args, &config),
        Commands::CheckRules(args) => run_check_rules(args, &config),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_verify_single_file() {
        let cli = Cli::try_parse_from(["datareport", "verify", "report.yaml"]).unwrap();
        if let Commands::Verify(args) = cli.command {
            assert_eq!(args.files, vec![PathBuf::from("report.yaml")]);
            assert!(args.validation.is_none());
            assert!(!args.strict);
            assert!(args.max_depth.is_none());
        } else {
            panic!("expected verify");
        }
    }

    #[test]
    fn cli_parse_verify_with_all_options() {
        let cli = Cli::try_parse_from([
            "datareport",
            "verify",
            "--validation",
            "rules.yaml",
            "--strict",
            "--max-depth",
            "12",
            "a.yaml",
            "b.json",
        ])
        .unwrap();
        if let Commands::Verify(args) = cli.command {
            assert_eq!(args.validation, Some(PathBuf::from("rules.yaml")));
            assert!(args.strict);
            assert_eq!(args.max_depth, Some(12));
            assert_eq!(args.files, vec![PathBuf::from("a.yaml"), PathBuf::from("b.json")]);
        } else {
            panic!("expected verify");
        }
    }

    #[test]
    fn cli_parse_verify_requires_files() {
        assert!(Cli::try_parse_from(["datareport", "verify"]).is_err());
    }

    #[test]
    fn cli_parse_check_rules() {
        let cli = Cli::try_parse_from(["datareport", "check-rules", "verify.yaml"]).unwrap();
        if let Commands::CheckRules(args) = cli.command {
            assert_eq!(args.rules, PathBuf::from("verify.yaml"));
        } else {
            panic!("expected check-rules");
        }
    }

    #[test]
    fn cli_parse_verbose_levels() {
        let cli0 = Cli::try_parse_from(["datareport", "verify", "a.yaml"]).unwrap();
        assert_eq!(cli0.verbose, 0);

        let cli2 = Cli::try_parse_from(["datareport", "-vv", "verify", "a.yaml"]).unwrap();
        assert_eq!(cli2.verbose, 2);

        let cli3 = Cli::try_parse_from(["datareport", "verify", "-vvv", "a.yaml"]).unwrap();
        assert_eq!(cli3.verbose, 3);
    }

    #[test]
    fn cli_parse_config_option() {
        let cli = Cli::try_parse_from(["datareport", "--config", "datareport.yaml", "check-rules", "r.yaml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("datareport.yaml")));
    }

    #[test]
    fn cli_parse_no_subcommand_errors() {
        assert!(Cli::try_parse_from(["datareport"]).is_err());
    }

    #[test]
    fn cli_parse_invalid_subcommand_errors() {
        assert!(Cli::try_parse_from(["datareport", "render"]).is_err());
    }
}

//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and the Commands enum.

use clap::{
    ArgGroup, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Security-attribute index for infrastructure-as-code
#[derive(Parser, Debug)]
#[command(
    name = "iacindex",
    version = env!("CARGO_PKG_VERSION"),
    about = "Index infrastructure-as-code resources by security attribute and compliance control",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Quick Start:\n  $ iacindex init\n  $ iacindex build infra modules\n  $ iacindex query --control CC6.8\n  $ iacindex query --attribute encryption --environment production --json"
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .iacindex directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Build the index from configuration files
    #[command(
        about = "Scan configuration files and build the security index",
        after_help = "Examples:\n  iacindex build\n  iacindex build infra modules --threads 8\n  iacindex build --dry-run --json"
    )]
    Build {
        /// Scan roots (overrides scan.roots from settings)
        #[arg(value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Number of worker threads (overrides config)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Rebuild even if the persisted index is fresh
        #[arg(short, long)]
        force: bool,

        /// Build and report without writing the index
        #[arg(long)]
        dry_run: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show index metadata and freshness
    #[command(about = "Show what the persisted index contains")]
    Status {
        /// Re-scan and compare checksums; exits non-zero when stale
        #[arg(long)]
        check: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Look up resources by control, attribute, type or environment
    #[command(
        about = "Query the persisted index",
        long_about = "Query the persisted index. Several filters are intersected.",
        after_help = "Examples:\n  iacindex query --control CC6.8\n  iacindex query --attribute encryption --resource-type aws_kms_key\n  iacindex query --control CC6.1 --limit 5 --json\n  iacindex query --compliance-status non_compliant --risk-level high",
        group(ArgGroup::new("filter").required(true).multiple(true)
            .args(["control", "attribute", "resource_type", "environment", "risk_level", "compliance_status"]))
    )]
    Query {
        /// Compliance control id (e.g. CC6.8)
        #[arg(long)]
        control: Option<String>,

        /// Security attribute tag (e.g. encryption)
        #[arg(long)]
        attribute: Option<String>,

        /// Exact resource type (e.g. aws_kms_key)
        #[arg(long)]
        resource_type: Option<String>,

        /// Deployment environment (production, staging, development, test)
        #[arg(long)]
        environment: Option<String>,

        /// Assessed risk level
        #[arg(long, value_parser = ["low", "medium", "high"])]
        risk_level: Option<String>,

        /// Assessed compliance status
        #[arg(long, value_parser = ["compliant", "partially_compliant", "non_compliant", "not_applicable"])]
        compliance_status: Option<String>,

        /// Maximum number of resources to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Remove the persisted index
    #[command(about = "Delete the persisted index file")]
    Clear {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Check the persisted index for structural problems
    #[command(about = "Validate the persisted index")]
    Validate {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the active classification rule table
    #[command(about = "Show the classification rules in effect")]
    Rules {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_query_requires_a_filter() {
        assert!(Cli::try_parse_from(["iacindex", "query"]).is_err());

        let cli = Cli::try_parse_from([
            "iacindex",
            "query",
            "--control",
            "CC6.8",
            "--attribute",
            "encryption",
            "--limit",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Query {
                control,
                attribute,
                limit,
                ..
            } => {
                assert_eq!(control.as_deref(), Some("CC6.8"));
                assert_eq!(attribute.as_deref(), Some("encryption"));
                assert_eq!(limit, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_posture_filters() {
        let cli = Cli::try_parse_from(["iacindex", "query", "--risk-level", "high"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Query { risk_level: Some(ref level), .. } if level == "high"
        ));

        assert!(Cli::try_parse_from(["iacindex", "query", "--risk-level", "severe"]).is_err());
        assert!(
            Cli::try_parse_from(["iacindex", "query", "--compliance-status", "non_compliant"])
                .is_ok()
        );
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["iacindex", "status", "-c", "/tmp/settings.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/settings.toml")));
    }
}

//! iacindex command line entry point.

use clap::Parser;
use iacindex::Settings;
use iacindex::cli::commands::{self, build::BuildArgs, query::QueryArgs};
use iacindex::cli::{Cli, Commands};
use iacindex::io::ExitCode;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Init writes the config file, so it must not require one
    if let Commands::Init { force } = cli.command {
        return commands::init::run(force).into();
    }

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::ConfigError.into();
        }
    };
    iacindex::logging::init_with_config(&settings.logging);

    let code = match run(cli.command, settings).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::GeneralError
        }
    };
    code.into()
}

fn load_settings(cli: &Cli) -> Result<Settings, Box<figment::Error>> {
    match &cli.config {
        Some(path) => Settings::load_from(path).map(|mut settings| {
            if settings.workspace_root.is_none() {
                settings.workspace_root = Settings::workspace_root();
            }
            settings
        }),
        None => Settings::load(),
    }
}

async fn run(command: Commands, settings: Settings) -> anyhow::Result<ExitCode> {
    let code = match command {
        Commands::Init { force } => commands::init::run(force),
        Commands::Build {
            paths,
            threads,
            force,
            dry_run,
            json,
        } => {
            let args = BuildArgs {
                paths,
                threads,
                force,
                dry_run,
                json,
            };
            run_build(settings, args).await?
        }
        Commands::Status { check, json } => {
            tokio::task::spawn_blocking(move || commands::status::run(settings, check, json))
                .await?
        }
        Commands::Query {
            control,
            attribute,
            resource_type,
            environment,
            risk_level,
            compliance_status,
            limit,
            json,
        } => commands::query::run(
            &settings,
            QueryArgs {
                control,
                attribute,
                resource_type,
                environment,
                risk_level,
                compliance_status,
                limit,
                json,
            },
        ),
        Commands::Clear { yes } => commands::clear::run(&settings, yes),
        Commands::Validate { json } => commands::validate::run(&settings, json),
        Commands::Rules { json } => commands::rules::run(&settings, json),
    };
    Ok(code)
}

/// Run the blocking build on a worker thread; Ctrl-C cancels it cooperatively.
async fn run_build(settings: Settings, args: BuildArgs) -> anyhow::Result<ExitCode> {
    let cancel = CancellationToken::new();

    let signal_token = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling build...");
            signal_token.cancel();
        }
    });

    let build_token = cancel.clone();
    let code =
        tokio::task::spawn_blocking(move || commands::build::run(settings, args, &build_token))
            .await?;

    signal_task.abort();
    Ok(code)
}

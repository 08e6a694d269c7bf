use archiver::commands::archive::{run_with, RunHooks};
use archiver::types::{ArchiveError, EXIT_USAGE};
use archiver::{Cli, Config};
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = match Cli::try_parse_normalized(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => EXIT_USAGE,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    init_logging(&cli);

    match try_main(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {}", e);
            let code = e
                .downcast_ref::<ArchiveError>()
                .map_or(EXIT_USAGE, ArchiveError::exit_code);
            std::process::exit(code);
        }
    }
}

fn try_main(cli: Cli) -> anyhow::Result<i32> {
    // Convert CLI args to Config - this validates immediately
    let config = Config::try_from(cli)?;

    let summary = run_with(
        &config,
        RunHooks {
            handle_ctrl_c: true,
            ..RunHooks::default()
        },
    )?;

    Ok(summary.exit_code(config.strict))
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

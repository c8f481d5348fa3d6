use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use cnx_cli::args::CliArgs;
use cnx_cli::config;
use cnx_cli::driver::{JobOptions, run_job};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(error) => {
            eprintln!("cnext: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let args = CliArgs::parse();

    if args.pio_install || args.pio_uninstall {
        eprintln!("cnext: PlatformIO integration is handled by the packaging scripts");
        return Ok(true);
    }

    let Some(input) = args.input.clone() else {
        anyhow::bail!("no input given; pass a .cnx file or a directory");
    };
    let project_root = if input.is_dir() {
        input.clone()
    } else {
        input
            .parent()
            .map(PathBuf::from)
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from("."))
    };

    let config_file = config::load_config(&project_root)?;
    let options = config::resolve_options(&args, config_file.as_ref(), &project_root)?;

    let job = JobOptions {
        input,
        project_root,
        options,
        define_names: args.define_names(),
        parse_only: args.parse_only,
        no_cache: args.no_cache,
        write: true,
    };
    let result = run_job(&job)?;

    // One diagnostic per line: path:line:col: severity: message [Ecode]
    for diagnostic in &result.diagnostics {
        println!("{diagnostic}");
    }
    for path in &result.written {
        tracing::debug!(path = %path.display(), "wrote");
    }
    Ok(result.success)
}

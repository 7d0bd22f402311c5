// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{IdentityReport, RunArgs};
use hostcompat::config::{HostConfig, load_config, validate_config};
use hostcompat::{StdioMode, bootstrap};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "hostcompat",
    version,
    about = "Reference system-API surface over host primitives"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved host identity.
    Identity {
        /// Print JSON instead of a one-line summary.
        #[arg(long)]
        json: bool,
    },

    /// Run a program through the command adapter. Exits with the child's code.
    Run {
        program: String,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,

        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Environment override as KEY=VALUE. Can be repeated.
        #[arg(long = "env")]
        env_vars: Vec<String>,

        /// piped | null | inherit. Defaults to piped with --input, else inherit.
        #[arg(long)]
        stdin: Option<StdioMode>,

        #[arg(long, default_value = "inherit")]
        stdout: StdioMode,

        #[arg(long, default_value = "inherit")]
        stderr: StdioMode,

        /// Text written to the child's stdin, which is then closed.
        #[arg(long)]
        input: Option<String>,

        /// Print the collected output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Call one symbol of a native library.
    #[cfg(feature = "ffi")]
    Ffi {
        #[arg(long)]
        lib: PathBuf,

        #[arg(long)]
        symbol: String,

        /// Comma-separated parameter types, e.g. `i32,pointer`.
        #[arg(long, default_value = "")]
        params: String,

        #[arg(long, default_value = "void")]
        result: String,

        /// Argument values, one per parameter.
        #[arg(allow_hyphen_values = true)]
        values: Vec<String>,
    },

    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Load and validate a config file, printing warnings.
    Check { path: Option<PathBuf> },
    /// Print the JSON schema of the config file.
    Schema,
}

fn init_tracing(debug: bool, config: &HostConfig) {
    let filter = if debug {
        EnvFilter::new("hostcompat=debug")
    } else {
        let level = config.log_level.as_deref().unwrap_or("info");
        EnvFilter::new(format!("hostcompat={level}"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `config check` reports load failures itself.
    let config = match &cli.command {
        Commands::Config { .. } => HostConfig::default(),
        _ => load_config(cli.config.as_deref()).context("load config")?,
    };
    init_tracing(cli.debug, &config);
    if !matches!(cli.command, Commands::Config { .. }) {
        for warning in validate_config(&config).context("validate config")? {
            tracing::warn!(target: "hostcompat", "{warning}");
        }
    }

    match cli.command {
        Commands::Identity { json } => cmd_identity(&config, json),
        Commands::Run {
            program,
            args,
            cwd,
            env_vars,
            stdin,
            stdout,
            stderr,
            input,
            json,
        } => {
            let run = RunArgs {
                program,
                args,
                cwd,
                env: env_vars,
                stdin,
                stdout,
                stderr,
                input,
            };
            cmd_run(&config, run, json).await
        }
        #[cfg(feature = "ffi")]
        Commands::Ffi {
            lib,
            symbol,
            params,
            result,
            values,
        } => cmd_ffi(&config, lib, symbol, params, result, values),
        Commands::Config { action } => match action {
            ConfigAction::Check { path } => cmd_config_check(path.or(cli.config)),
            ConfigAction::Schema => {
                println!("{}", commands::schema_json()?);
                Ok(())
            }
        },
    }
}

fn cmd_identity(config: &HostConfig, json: bool) -> Result<()> {
    let boot = bootstrap(config);
    let report = IdentityReport::new(&boot.identity, boot.capabilities.as_ref());
    println!("{}", report.render(json)?);
    Ok(())
}

async fn cmd_run(config: &HostConfig, run: RunArgs, json: bool) -> Result<()> {
    let boot = bootstrap(config);
    let caps = boot
        .capabilities
        .context("the reference runtime is present; nothing to emulate")?;
    let output = commands::run_command(&caps, &run).await?;

    if json {
        println!("{}", commands::output_json(&output)?);
    } else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&output.stdout).context("write stdout")?;
        stdout.flush().context("flush stdout")?;
    }

    let code = commands::exit_code(&output);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

#[cfg(feature = "ffi")]
fn cmd_ffi(
    config: &HostConfig,
    lib: PathBuf,
    symbol: String,
    params: String,
    result: String,
    values: Vec<String>,
) -> Result<()> {
    let params = commands::ffi::parse_types(&params)?;
    let result = result.trim().parse()?;
    let boot = bootstrap(config);
    let caps = boot
        .capabilities
        .context("the reference runtime is present; nothing to emulate")?;
    let value = commands::ffi::call(&caps, &lib, &symbol, &params, result, &values)?;
    println!("{value}");
    Ok(())
}

fn cmd_config_check(path: Option<PathBuf>) -> Result<()> {
    let (config, warnings) = commands::config_check(path.as_deref())?;
    for w in &warnings {
        eprintln!("warning: {w}");
    }
    println!("ok: {}", serde_json::to_string(&config)?);
    Ok(())
}

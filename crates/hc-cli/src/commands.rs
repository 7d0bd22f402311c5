// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command implementations for the hostcompat CLI.

use anyhow::{Context, Result};
use hostcompat::config::{ConfigWarning, HostConfig, config_schema, load_config, validate_config};
use hostcompat::process::ProcessError;
use hostcompat::{
    CapabilitySet, CommandOptions, CommandOutput, HostIdentity, HostVariant, SURFACE_NAME,
    StdioMode,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Printable identity report.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityReport {
    pub flavor: String,
    pub version: String,
    pub variant: HostVariant,
    pub ffi: bool,
    pub surface: &'static str,
}

impl IdentityReport {
    pub fn new(identity: &HostIdentity, caps: Option<&CapabilitySet>) -> Self {
        Self {
            flavor: identity.name().to_string(),
            version: identity.version.clone(),
            variant: HostVariant::select(identity),
            ffi: caps.is_some_and(CapabilitySet::has_foreign),
            surface: SURFACE_NAME,
        }
    }

    pub fn render(&self, json: bool) -> Result<String> {
        if json {
            return serde_json::to_string_pretty(self).context("serialize identity");
        }
        Ok(format!(
            "{}/{} variant={} ffi={} surface={}",
            self.flavor, self.version, self.variant, self.ffi, self.surface
        ))
    }
}

/// Parse a `KEY=VALUE` flag.
pub fn parse_key_value_flag(raw: &str, flag_name: &str) -> Result<(String, String)> {
    let (raw_key, raw_value) = raw
        .split_once('=')
        .with_context(|| format!("{flag_name} expects KEY=VALUE, got '{raw}'"))?;

    let key = raw_key.trim();
    if key.is_empty() {
        anyhow::bail!("{flag_name} key cannot be empty (got '{raw}')");
    }

    Ok((key.to_string(), raw_value.to_string()))
}

/// Inputs of the `run` subcommand.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<String>,
    pub stdin: Option<StdioMode>,
    pub stdout: StdioMode,
    pub stderr: StdioMode,
    pub input: Option<String>,
}

impl RunArgs {
    /// Build command options. `--input` implies a piped stdin unless a
    /// mode was given explicitly.
    pub fn options(&self) -> Result<CommandOptions> {
        let stdin = self.stdin.unwrap_or(if self.input.is_some() {
            StdioMode::Piped
        } else {
            StdioMode::Inherit
        });
        if self.input.is_some() && stdin != StdioMode::Piped {
            anyhow::bail!("--input requires --stdin piped");
        }

        let mut options = CommandOptions::default()
            .args(self.args.iter().cloned())
            .stdin(stdin)
            .stdout(self.stdout)
            .stderr(self.stderr);
        if let Some(cwd) = &self.cwd {
            options = options.cwd(cwd);
        }
        let env = self
            .env
            .iter()
            .map(|raw| parse_key_value_flag(raw, "--env"))
            .collect::<Result<BTreeMap<_, _>>>()?;
        for (k, v) in env {
            options = options.env(k, v);
        }
        Ok(options)
    }
}

/// Spawn, feed `--input`, and collect the output.
///
/// The stdin feed runs alongside the stdout drain, so a child that fills
/// its stdout pipe before reading all of its input cannot stall the run.
pub async fn run_command(caps: &CapabilitySet, args: &RunArgs) -> Result<CommandOutput> {
    let options = args.options()?;
    let mut child = caps
        .command(&args.program, options)
        .spawn()
        .with_context(|| format!("spawn '{}'", args.program))?;

    let stdin = child.take_stdin();
    let input = args.input.as_deref();
    let feed = async move {
        if let (Some(input), Some(mut stdin)) = (input, stdin) {
            let mut writer = stdin.writer();
            writer.write(input.as_bytes()).await?;
            writer.close().await?;
            writer.release_lock();
        }
        Ok::<_, ProcessError>(())
    };

    let (output, ()) = tokio::try_join!(child.output(), feed).context("run child")?;
    Ok(output)
}

/// Exit code the CLI should report for a finished child.
///
/// Signal-terminated children report code 0, so they map to 1.
pub fn exit_code(output: &CommandOutput) -> i32 {
    match (output.success, output.code) {
        (true, _) => 0,
        (false, 0) => 1,
        (false, code) => code,
    }
}

/// JSON form of a finished command. Stdout is decoded lossily.
pub fn output_json(output: &CommandOutput) -> Result<String> {
    let value = serde_json::json!({
        "success": output.success,
        "code": output.code,
        "signal": output.signal,
        "stdout": output.stdout_text(),
    });
    serde_json::to_string_pretty(&value).context("serialize output")
}

/// Load, validate and report a configuration file.
pub fn config_check(path: Option<&Path>) -> Result<(HostConfig, Vec<ConfigWarning>)> {
    let config = load_config(path).context("load config")?;
    let warnings = validate_config(&config).context("validate config")?;
    Ok((config, warnings))
}

pub fn schema_json() -> Result<String> {
    serde_json::to_string_pretty(&config_schema()).context("serialize schema")
}

#[cfg(feature = "ffi")]
pub mod ffi {
    use anyhow::{Context, Result};
    use hostcompat::CapabilitySet;
    use hostcompat::ffi::{ForeignFunction, NativeType, NativeValue, SymbolDefinition, SymbolMap};
    use std::path::Path;

    /// Parse a comma-separated list of type tags. Empty means no parameters.
    pub fn parse_types(raw: &str) -> Result<Vec<NativeType>> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<NativeType>().map_err(anyhow::Error::from))
            .collect()
    }

    /// Open `lib`, bind one symbol and call it with textual `values`.
    #[allow(unsafe_code)]
    pub fn call(
        caps: &CapabilitySet,
        lib: &Path,
        symbol: &str,
        params: &[NativeType],
        result: NativeType,
        values: &[String],
    ) -> Result<NativeValue> {
        let foreign = caps.require_foreign()?;
        let definition = ForeignFunction::new(params.iter().copied(), result);
        let mut symbols = SymbolMap::new();
        symbols.insert(symbol.to_string(), SymbolDefinition::Function(definition));

        let args = params
            .iter()
            .zip(values)
            .map(|(ty, raw)| NativeValue::parse(*ty, raw))
            .collect::<Result<Vec<_>, _>>()?;
        if values.len() != params.len() {
            anyhow::bail!(
                "'{symbol}' takes {} value(s), got {}",
                params.len(),
                values.len()
            );
        }

        let library = foreign
            .dlopen(lib, &symbols)
            .with_context(|| format!("dlopen '{}'", lib.display()))?;
        // SAFETY: the signature comes from the user, who vouches for it.
        let value = unsafe { library.call(symbol, &args) }?;
        library.close()?;
        Ok(value)
    }
}

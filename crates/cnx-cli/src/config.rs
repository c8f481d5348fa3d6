//! `cnext.config.json` and option precedence.
//!
//! Precedence for every knob: CLI > config file > `platformio.ini`
//! inference > `#pragma target` > built-in defaults. Only the target
//! participates in the last two rungs.

use cnx_common::TargetChip;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::args::CliArgs;

pub const CONFIG_FILE_NAME: &str = "cnext.config.json";

/// The recognized keys of `cnext.config.json`; they mirror the CLI flags.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigFile {
    pub out: Option<String>,
    pub header_out: Option<String>,
    pub base_path: Option<String>,
    pub include: Vec<String>,
    pub defines: FxHashMap<String, String>,
    pub target: Option<String>,
    pub cpp: bool,
    pub debug: bool,
}

/// Load the config file from the project root, tolerating absence.
/// A malformed file is an error the user needs to see, not a silent
/// fallback.
pub fn load_config(root: &Path) -> anyhow::Result<Option<ConfigFile>> {
    let path = root.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)?;
    let config = serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
    Ok(Some(config))
}

static PIO_BOARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*board\s*=\s*(\S+)").expect("static regex"));

/// Infer a target chip from `platformio.ini`, if one is present.
pub fn infer_pio_target(root: &Path) -> Option<TargetChip> {
    let text = std::fs::read_to_string(root.join("platformio.ini")).ok()?;
    PIO_BOARD
        .captures_iter(&text)
        .find_map(|cap| TargetChip::from_board(&cap[1]))
}

/// Everything the driver needs, with precedence already applied.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    pub out: Option<PathBuf>,
    pub header_out: Option<PathBuf>,
    pub base_path: Option<PathBuf>,
    pub include: Vec<PathBuf>,
    /// Raw NAME[=VALUE] defines for the preprocessor subprocess.
    pub defines: Vec<String>,
    /// Target, unless a `#pragma target` should still have its say.
    pub target: Option<TargetChip>,
    pub cpp: bool,
    pub debug: bool,
}

pub fn resolve_options(
    args: &CliArgs,
    config: Option<&ConfigFile>,
    project_root: &Path,
) -> anyhow::Result<ResolvedOptions> {
    let mut include: Vec<PathBuf> = args.include.clone();
    if let Some(config) = config {
        include.extend(config.include.iter().map(PathBuf::from));
    }

    let mut defines = args.defines.clone();
    if let Some(config) = config {
        for (name, value) in &config.defines {
            let rendered = if value.is_empty() {
                name.clone()
            } else {
                format!("{name}={value}")
            };
            if !defines.contains(&rendered) {
                defines.push(rendered);
            }
        }
    }

    let target = match &args.target {
        Some(name) => Some(
            TargetChip::from_name(name)
                .ok_or_else(|| anyhow::anyhow!("unknown target '{name}'"))?,
        ),
        None => match config.and_then(|c| c.target.as_deref()) {
            Some(name) => Some(
                TargetChip::from_name(name)
                    .ok_or_else(|| anyhow::anyhow!("unknown target '{name}' in config"))?,
            ),
            None => infer_pio_target(project_root),
        },
    };

    Ok(ResolvedOptions {
        out: args
            .out
            .clone()
            .or_else(|| config.and_then(|c| c.out.as_ref().map(PathBuf::from))),
        header_out: args
            .header_out
            .clone()
            .or_else(|| config.and_then(|c| c.header_out.as_ref().map(PathBuf::from))),
        base_path: args
            .base_path
            .clone()
            .or_else(|| config.and_then(|c| c.base_path.as_ref().map(PathBuf::from))),
        include,
        defines,
        target,
        cpp: args.cpp || config.is_some_and(|c| c.cpp),
        debug: args.debug || config.is_some_and(|c| c.debug),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> CliArgs {
        CliArgs::parse_from(argv)
    }

    #[test]
    fn cli_wins_over_config() {
        let config = ConfigFile {
            out: Some("cfg_out".to_string()),
            target: Some("cortex-m0".to_string()),
            ..Default::default()
        };
        let cli = args(&["cnext", "main.cnx", "--out", "cli_out", "--target", "cortex-m7"]);
        let resolved = resolve_options(&cli, Some(&config), Path::new(".")).expect("resolve");
        assert_eq!(resolved.out.as_deref(), Some(Path::new("cli_out")));
        assert_eq!(resolved.target, Some(TargetChip::CortexM7));
    }

    #[test]
    fn config_fills_cli_gaps() {
        let config = ConfigFile {
            out: Some("cfg_out".to_string()),
            cpp: true,
            ..Default::default()
        };
        let cli = args(&["cnext", "main.cnx"]);
        let resolved = resolve_options(&cli, Some(&config), Path::new(".")).expect("resolve");
        assert_eq!(resolved.out.as_deref(), Some(Path::new("cfg_out")));
        assert!(resolved.cpp);
    }

    #[test]
    fn unknown_target_is_an_error() {
        let cli = args(&["cnext", "main.cnx", "--target", "riscv"]);
        assert!(resolve_options(&cli, None, Path::new(".")).is_err());
    }

    #[test]
    fn pio_board_regex_matches() {
        assert!(PIO_BOARD.is_match("[env:teensy]\nboard = teensy40\n"));
    }

    #[test]
    fn config_file_parses_recognized_keys() {
        let json = r#"{
            "out": "build",
            "headerOut": "include",
            "include": ["lib"],
            "defines": {"FEATURE": "1"},
            "target": "cortex-m4",
            "cpp": true
        }"#;
        let config: ConfigFile = serde_json::from_str(json).expect("parse");
        assert_eq!(config.out.as_deref(), Some("build"));
        assert_eq!(config.header_out.as_deref(), Some("include"));
        assert!(config.cpp);
        assert!(!config.debug);
    }
}

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the cnext binary.
#[derive(Parser, Debug)]
#[command(
    name = "cnext",
    version,
    about = "C-Next to MISRA-friendly C/C++ translator for embedded targets"
)]
pub struct CliArgs {
    /// CNX file or directory to translate.
    pub input: Option<PathBuf>,

    /// Directory for generated .c/.cpp files (defaults to beside sources).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Directory for generated headers (defaults to --out).
    #[arg(long = "header-out", alias = "header_out")]
    pub header_out: Option<PathBuf>,

    /// Base directory for computing relative output paths.
    #[arg(long = "base-path", alias = "base_path")]
    pub base_path: Option<PathBuf>,

    /// Additional include search directory (repeatable).
    #[arg(short = 'I', long = "include")]
    pub include: Vec<PathBuf>,

    /// Preprocessor define, NAME or NAME=VALUE (repeatable).
    #[arg(short = 'D', value_name = "NAME[=VALUE]")]
    pub defines: Vec<String>,

    /// Target chip for atomic/critical lowering (e.g. cortex-m7, avr).
    #[arg(long)]
    pub target: Option<String>,

    /// Force C++ output (.cpp/.hpp).
    #[arg(long)]
    pub cpp: bool,

    /// Swap clamp helpers for panic-on-overflow variants.
    #[arg(long)]
    pub debug: bool,

    /// Parse and analyze only; write nothing.
    #[arg(long = "parse-only", alias = "parse_only")]
    pub parse_only: bool,

    /// Bypass the content-addressed symbol cache.
    #[arg(long = "no-cache", alias = "no_cache")]
    pub no_cache: bool,

    /// Install the PlatformIO build hook (handled by the packaging
    /// scripts, not this binary).
    #[arg(long = "pio-install", hide = true)]
    pub pio_install: bool,

    /// Remove the PlatformIO build hook.
    #[arg(long = "pio-uninstall", hide = true)]
    pub pio_uninstall: bool,
}

impl CliArgs {
    /// Bare define names, for the CNX-side `#ifdef` evaluation.
    pub fn define_names(&self) -> Vec<String> {
        self.defines
            .iter()
            .map(|d| d.split('=').next().unwrap_or(d).to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typical_invocation() {
        let args = CliArgs::parse_from([
            "cnext",
            "src/",
            "--out",
            "build",
            "-I",
            "lib",
            "-D",
            "FEATURE=1",
            "-D",
            "EXTRA",
            "--target",
            "cortex-m7",
            "--cpp",
        ]);
        assert_eq!(args.input.as_deref(), Some(std::path::Path::new("src/")));
        assert_eq!(args.include.len(), 1);
        assert!(args.cpp);
        assert_eq!(args.define_names(), vec!["FEATURE", "EXTRA"]);
        assert_eq!(args.target.as_deref(), Some("cortex-m7"));
    }

    #[test]
    fn flags_default_off() {
        let args = CliArgs::parse_from(["cnext", "main.cnx"]);
        assert!(!args.debug);
        assert!(!args.parse_only);
        assert!(!args.no_cache);
    }
}

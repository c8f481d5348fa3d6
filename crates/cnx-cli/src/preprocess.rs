//! The system preprocessor subprocess.
//!
//! Only headers whose `#if` expressions the raw parser cannot evaluate
//! go through here. Failure falls back to the raw header text with a
//! warning; the subprocess inherits the parent environment.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes, message};
use std::path::{Path, PathBuf};
use std::process::Command;

const PREPROCESSOR: &str = "cc";

/// Run `cc -E -P` over a header. `defines` are raw NAME[=VALUE] strings.
pub fn preprocess(
    path: &Path,
    defines: &[String],
    include_dirs: &[PathBuf],
) -> std::io::Result<String> {
    let mut command = Command::new(PREPROCESSOR);
    command.arg("-E").arg("-P").arg("-x").arg("c");
    for define in defines {
        command.arg("-D").arg(define);
    }
    for dir in include_dirs {
        command.arg("-I").arg(dir);
    }
    command.arg(path);
    let output = command.output()?;
    if !output.status.success() {
        return Err(std::io::Error::other(format!(
            "preprocessor exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Preprocess when the heuristic demands it, falling back to the raw
/// text (with a warning) when the subprocess fails.
pub fn expand_if_needed(
    path: &Path,
    raw: &str,
    defines: &[String],
    include_dirs: &[PathBuf],
    warnings: &mut Vec<Diagnostic>,
) -> String {
    if !cnx_parser::cheader::needs_preprocessing(raw) {
        return raw.to_string();
    }
    match preprocess(path, defines, include_dirs) {
        Ok(expanded) => expanded,
        Err(error) => {
            tracing::debug!(path = %path.display(), %error, "preprocessor failed");
            warnings.push(Diagnostic::warning(
                path.display().to_string(),
                1,
                1,
                message(
                    diagnostic_codes::PREPROCESSOR_FAILED,
                    &[&path.display().to_string()],
                ),
                diagnostic_codes::PREPROCESSOR_FAILED,
            ));
            raw.to_string()
        }
    }
}

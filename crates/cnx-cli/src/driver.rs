//! The pipeline driver.
//!
//! Stages run strictly in order: discovery, header symbol collection,
//! CNX symbol collection, the modification-map prepass, external
//! reference resolution, conflict detection, then per-file analysis +
//! codegen + header generation in topological order. One bad file does
//! not stop its siblings, but a failed job writes nothing: output commit
//! is all-or-none.

use anyhow::{Context, Result};
use cnx_analyzer::AnalysisContext;
use cnx_common::diagnostics::{Diagnostic, diagnostic_codes, message};
use cnx_common::{LineMap, TargetChip};
use cnx_emitter::{EmitOptions, GeneratedFile};
use cnx_parser::ast::SourceUnit;
use cnx_resolver::TranslationContext;
use cnx_scanner::Token;
use rustc_hash::FxHashSet;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use crate::cache::SymbolCache;
use crate::config::ResolvedOptions;
use crate::discovery;
use crate::preprocess;

#[derive(Debug)]
pub struct JobOptions {
    pub input: PathBuf,
    pub project_root: PathBuf,
    pub options: ResolvedOptions,
    /// Bare define names for CNX-side `#ifdef` evaluation.
    pub define_names: Vec<String>,
    pub parse_only: bool,
    pub no_cache: bool,
    /// Write outputs to disk (false returns them in the result only).
    pub write: bool,
}

#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub ok: bool,
}

#[derive(Debug, Default)]
pub struct JobResult {
    pub files: Vec<FileOutcome>,
    pub diagnostics: Vec<Diagnostic>,
    pub written: Vec<PathBuf>,
    pub success: bool,
    /// Generated text by source path, kept for callers that do not
    /// write to disk.
    pub outputs: Vec<(PathBuf, GeneratedFile)>,
}

struct ParsedUnit {
    path: PathBuf,
    source: String,
    unit: SourceUnit,
    tokens: Vec<Token>,
}

pub fn run_job(job: &JobOptions) -> Result<JobResult> {
    let mut result = JobResult::default();

    // ==================== Stage 1: discovery ====================
    let pipeline = discovery::discover(&job.input, &job.options.include)?;
    result.diagnostics.extend(pipeline.warnings.clone());
    tracing::debug!(
        files = pipeline.cnx_files.len(),
        headers = pipeline.headers.len(),
        "discovery complete"
    );

    let mut ctx = TranslationContext::new(TargetChip::Generic, job.options.debug);
    if job.options.cpp {
        ctx.require_cpp();
    }

    // ==================== Stage 2: header symbols ====================
    let cache = SymbolCache::new(&job.project_root, !job.no_cache);
    for (header_path, literal) in &pipeline.headers {
        let raw = std::fs::read_to_string(header_path)
            .with_context(|| format!("reading {}", header_path.display()))?;
        // The C++-required flag is monotone; even a cache hit rescans
        // the raw text for C++ markers.
        if cnx_parser::cheader::detect_cpp(&raw) {
            ctx.require_cpp();
        }
        let symbols = match cache.load(&raw) {
            Some(symbols) => symbols,
            None => {
                let text = preprocess::expand_if_needed(
                    header_path,
                    &raw,
                    &job.options.defines,
                    &job.options.include,
                    &mut result.diagnostics,
                );
                let symbols = cnx_parser::cheader::parse_header(&text);
                cache.store(&raw, &symbols);
                symbols
            }
        };
        if symbols.is_cpp {
            ctx.require_cpp();
        }
        cnx_resolver::headers::collect_header(
            &symbols,
            &header_path.display().to_string(),
            literal,
            &mut ctx.symbols,
            &mut ctx.type_headers,
        );
    }

    // ==================== Stage 3: CNX symbols ====================
    let defines: FxHashSet<String> = job.define_names.iter().cloned().collect();
    let mut parsed: Vec<ParsedUnit> = Vec::new();
    let mut failed: FxHashSet<PathBuf> = FxHashSet::default();

    for path in &pipeline.cnx_files {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let parse_result = cnx_parser::parse(&source, &path.display().to_string(), &defines);
        result.diagnostics.extend(parse_result.diagnostics.clone());
        let Some(unit) = parse_result.unit else {
            failed.insert(path.clone());
            continue;
        };
        let collect_diags =
            cnx_resolver::collect::collect_unit(&unit, &source, &mut ctx.symbols);
        if collect_diags.iter().any(|d| d.is_error()) {
            failed.insert(path.clone());
        }
        result.diagnostics.extend(collect_diags);
        ctx.include_directives
            .insert(unit.path.clone(), unit.includes.clone());
        parsed.push(ParsedUnit {
            path: path.clone(),
            source,
            unit,
            tokens: parse_result.tokens,
        });
    }

    // Target precedence: CLI/config/platformio already resolved; a
    // `#pragma target` is next; the PRIMASK fallback default is last.
    ctx.target = job.options.target.unwrap_or_else(|| {
        parsed
            .iter()
            .find_map(|p| p.unit.pragma_target.as_deref().and_then(TargetChip::from_name))
            .unwrap_or_default()
    });

    // Modification-map prepass, in topological order.
    for parsed_unit in &parsed {
        cnx_resolver::modmap::scan_unit(&parsed_unit.unit, &ctx.symbols, &mut ctx.modifications);
    }

    // ==================== Stage 3b: external references ====================
    result
        .diagnostics
        .extend(cnx_resolver::external::resolve_external_references(
            &mut ctx.symbols,
        ));

    // ==================== Stage 4: conflicts ====================
    let conflicts = cnx_resolver::conflicts::detect_conflicts(&ctx.symbols);
    let conflicts_found = conflicts.iter().any(|d| d.is_error());
    result.diagnostics.extend(conflicts);
    if conflicts_found {
        // Conflicts abort the pipeline before code generation.
        for path in &pipeline.cnx_files {
            result.files.push(FileOutcome {
                path: path.clone(),
                ok: false,
            });
        }
        result.success = false;
        return Ok(result);
    }

    // ==================== Stage 5/6: analyze + generate ====================
    let emit_options = EmitOptions {
        language: ctx.output_language(),
        target: ctx.target,
        debug: ctx.debug,
    };
    for parsed_unit in &parsed {
        if !pipeline.generate.contains(&parsed_unit.path) {
            // Transitively included files contribute symbols only.
            continue;
        }
        if failed.contains(&parsed_unit.path) {
            result.files.push(FileOutcome {
                path: parsed_unit.path.clone(),
                ok: false,
            });
            continue;
        }
        let line_map = LineMap::build(&parsed_unit.source);
        let analysis_ctx = AnalysisContext::new(
            &parsed_unit.unit,
            &parsed_unit.tokens,
            &parsed_unit.source,
            &line_map,
            &ctx.symbols,
        );
        let analyzer_diags = cnx_analyzer::run_analyzers(&analysis_ctx);
        let analyzer_failed = analyzer_diags.iter().any(|d| d.is_error());
        result.diagnostics.extend(analyzer_diags);
        if analyzer_failed {
            result.files.push(FileOutcome {
                path: parsed_unit.path.clone(),
                ok: false,
            });
            continue;
        }

        let generation = std::panic::catch_unwind(AssertUnwindSafe(|| {
            cnx_emitter::generate_unit(
                &parsed_unit.unit,
                &parsed_unit.source,
                &mut ctx,
                &emit_options,
            )
        }));
        match generation {
            Ok(Ok(generated)) => {
                result.files.push(FileOutcome {
                    path: parsed_unit.path.clone(),
                    ok: true,
                });
                result.outputs.push((parsed_unit.path.clone(), generated));
            }
            Ok(Err(diags)) => {
                result.diagnostics.extend(diags);
                result.files.push(FileOutcome {
                    path: parsed_unit.path.clone(),
                    ok: false,
                });
            }
            Err(payload) => {
                // A codegen panic is an analyzer gap; contain it at the
                // file boundary so siblings still translate.
                let text = panic_text(payload.as_ref());
                let (line, column) = panic_location(&text);
                result.diagnostics.push(Diagnostic::error(
                    parsed_unit.path.display().to_string(),
                    line,
                    column,
                    message(diagnostic_codes::CODEGEN_FAILED, &[]),
                    diagnostic_codes::CODEGEN_FAILED,
                ));
                result.files.push(FileOutcome {
                    path: parsed_unit.path.clone(),
                    ok: false,
                });
            }
        }
    }

    for path in &pipeline.cnx_files {
        if failed.contains(path) && !result.files.iter().any(|f| f.path == *path) {
            result.files.push(FileOutcome {
                path: path.clone(),
                ok: false,
            });
        }
    }

    result.success = result.files.iter().all(|f| f.ok)
        && !result.diagnostics.iter().any(|d| d.is_error());

    // ==================== Output commit (all-or-none) ====================
    if result.success && job.write && !job.parse_only {
        let written = write_outputs(job, &emit_options, &result.outputs)?;
        result.written = written;
    }
    Ok(result)
}

fn panic_text(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        String::new()
    }
}

/// Best-effort line/column extraction from a panic message
/// ("...:12:5" or "line 12").
fn panic_location(text: &str) -> (u32, u32) {
    if let Some(idx) = text.find("line ") {
        let digits: String = text[idx + 5..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(line) = digits.parse() {
            return (line, 1);
        }
    }
    let parts: Vec<&str> = text.rsplit(':').collect();
    if parts.len() >= 2 {
        if let (Ok(column), Ok(line)) = (parts[0].trim().parse(), parts[1].trim().parse()) {
            return (line, column);
        }
    }
    (1, 1)
}

fn write_outputs(
    job: &JobOptions,
    emit_options: &EmitOptions,
    outputs: &[(PathBuf, GeneratedFile)],
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let mut helpers_dir: Option<PathBuf> = None;

    for (source_path, generated) in outputs {
        let (body_dir, header_dir) = output_dirs(job, source_path);
        std::fs::create_dir_all(&body_dir)
            .with_context(|| format!("creating {}", body_dir.display()))?;
        std::fs::create_dir_all(&header_dir)
            .with_context(|| format!("creating {}", header_dir.display()))?;

        let body_path = body_dir.join(format!(
            "{}.{}",
            generated.stem,
            emit_options.language.source_extension()
        ));
        let header_path = header_dir.join(format!(
            "{}.{}",
            generated.stem,
            emit_options.language.header_extension()
        ));
        std::fs::write(&body_path, &generated.body)
            .with_context(|| format!("writing {}", body_path.display()))?;
        std::fs::write(&header_path, &generated.header)
            .with_context(|| format!("writing {}", header_path.display()))?;
        written.push(body_path);
        written.push(header_path);
        helpers_dir.get_or_insert(body_dir);
    }

    // One shared helpers header per output tree.
    if let Some(dir) = helpers_dir {
        let helpers_path = dir.join(cnx_emitter::HELPERS_FILE_NAME);
        std::fs::write(&helpers_path, cnx_emitter::helpers_header())
            .with_context(|| format!("writing {}", helpers_path.display()))?;
        written.push(helpers_path);
    }
    Ok(written)
}

/// Output directories for one source file, preserving subdirectory
/// structure relative to the base path when an --out dir is set.
fn output_dirs(job: &JobOptions, source_path: &Path) -> (PathBuf, PathBuf) {
    let source_parent = source_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let body_dir = match &job.options.out {
        Some(out) => {
            let base = job
                .options
                .base_path
                .clone()
                .unwrap_or_else(|| job.project_root.clone());
            match source_parent.strip_prefix(&base) {
                Ok(rel) => out.join(rel),
                Err(_) => out.clone(),
            }
        }
        None => source_parent,
    };
    let header_dir = match &job.options.header_out {
        Some(dir) => dir.clone(),
        None => body_dir.clone(),
    };
    (body_dir, header_dir)
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;

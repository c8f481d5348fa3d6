//! Stage 1: file discovery, include resolution and topological sort.
//!
//! From the CLI input, build the transitive set of CNX files and C/C++
//! headers to consume. The dependency graph is sorted so that any file
//! depended on is processed before its dependents; cross-file const
//! inference relies on this order. Cycles are warnings, not errors:
//! translation proceeds in a stable order within the cycle.

use anyhow::{Context, Result, bail};
use cnx_common::common::GENERATED_HEADER_MARKER;
use cnx_common::diagnostics::{Diagnostic, diagnostic_codes, message};
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What the pipeline consumes.
#[derive(Debug, Default)]
pub struct PipelineInput {
    /// All CNX files, topologically sorted (dependencies first).
    pub cnx_files: Vec<PathBuf>,
    /// Files that get regenerated (explicit roots). Transitively
    /// included CNX files contribute symbols only.
    pub generate: IndexSet<PathBuf>,
    /// C/C++ headers to parse, with the literal directive that named
    /// each (empty for headers found without a directive).
    pub headers: Vec<(PathBuf, String)>,
    pub warnings: Vec<Diagnostic>,
}

static INCLUDE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*#\s*include\s+(?:"([^"]+)"|<([^>]+)>)"#).expect("static regex"));

/// Discover the transitive file set starting from a file or directory.
pub fn discover(input: &Path, include_dirs: &[PathBuf]) -> Result<PipelineInput> {
    let mut pipeline = PipelineInput::default();
    let mut roots: Vec<PathBuf> = Vec::new();

    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|e| e == "cnx")
            {
                roots.push(entry.path().to_path_buf());
            }
        }
        if roots.is_empty() {
            bail!("no .cnx files under {}", input.display());
        }
    } else if input.exists() {
        match input.extension().and_then(|e| e.to_str()) {
            Some("cnx") => roots.push(input.to_path_buf()),
            Some("c") | Some("cpp") | Some("cc") | Some("ino") => {
                roots = entry_point_scan(input, include_dirs, &mut pipeline)?;
                if roots.is_empty() {
                    bail!(
                        "{} does not include any generated C-Next headers",
                        input.display()
                    );
                }
            }
            _ => bail!("unsupported input {}", input.display()),
        }
    } else {
        bail!("input not found: {}", input.display());
    }

    // BFS over includes, recording edges includer -> includee.
    let mut edges: IndexMap<PathBuf, IndexSet<PathBuf>> = IndexMap::new();
    let mut seen: IndexSet<PathBuf> = IndexSet::new();
    let mut seen_headers: IndexSet<PathBuf> = IndexSet::new();
    let mut queue: VecDeque<PathBuf> = VecDeque::new();

    for root in &roots {
        let canonical = canonicalize_lossy(root);
        pipeline.generate.insert(canonical.clone());
        if seen.insert(canonical.clone()) {
            queue.push_back(canonical);
        }
    }

    while let Some(current) = queue.pop_front() {
        let text = read_text_file(&current)?;
        edges.entry(current.clone()).or_default();
        for cap in INCLUDE_LINE.captures_iter(&text) {
            let (path_text, system) = match (cap.get(1), cap.get(2)) {
                (Some(m), _) => (m.as_str(), false),
                (_, Some(m)) => (m.as_str(), true),
                _ => continue,
            };
            let literal = cap.get(0).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
            let resolved = resolve_include(path_text, system, &current, include_dirs);
            let Some(resolved) = resolved else {
                pipeline.warnings.push(Diagnostic::warning(
                    current.display().to_string(),
                    1,
                    1,
                    message(diagnostic_codes::UNRESOLVED_INCLUDE, &[path_text]),
                    diagnostic_codes::UNRESOLVED_INCLUDE,
                ));
                continue;
            };
            if path_text.ends_with(".cnx") {
                edges
                    .entry(current.clone())
                    .or_default()
                    .insert(resolved.clone());
                if seen.insert(resolved.clone()) {
                    queue.push_back(resolved);
                }
            } else if seen_headers.insert(resolved.clone()) {
                // Generated headers are skipped to break migration-time
                // cycles; their companion CNX source is already in the set.
                let header_text = read_text_file(&resolved)?;
                if !header_text.contains(GENERATED_HEADER_MARKER) {
                    pipeline.headers.push((resolved, literal));
                }
            }
        }
    }

    let (sorted, cycle_warnings) = topological_sort(&edges);
    pipeline.cnx_files = sorted;
    pipeline.warnings.extend(cycle_warnings);
    Ok(pipeline)
}

fn canonicalize_lossy(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Read a source file, rejecting binary content.
fn read_text_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if bytes.contains(&0) {
        bail!("{} is not a text file", path.display());
    }
    String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path.display()))
}

/// Quoted includes search the current directory first, then the include
/// path; angle-bracket includes search only the include path.
fn resolve_include(
    path_text: &str,
    system: bool,
    from: &Path,
    include_dirs: &[PathBuf],
) -> Option<PathBuf> {
    if !system {
        if let Some(parent) = from.parent() {
            let candidate = parent.join(path_text);
            if candidate.exists() {
                return Some(canonicalize_lossy(&candidate));
            }
        }
    }
    for dir in include_dirs {
        let candidate = dir.join(path_text);
        if candidate.exists() {
            return Some(canonicalize_lossy(&candidate));
        }
    }
    None
}

/// Drop-in migration: a C/C++ entry point pulls in CNX sources through
/// the magic marker in their generated headers.
fn entry_point_scan(
    input: &Path,
    include_dirs: &[PathBuf],
    pipeline: &mut PipelineInput,
) -> Result<Vec<PathBuf>> {
    let text = read_text_file(input)?;
    let mut roots = Vec::new();
    for cap in INCLUDE_LINE.captures_iter(&text) {
        let (path_text, system) = match (cap.get(1), cap.get(2)) {
            (Some(m), _) => (m.as_str(), false),
            (_, Some(m)) => (m.as_str(), true),
            _ => continue,
        };
        let Some(resolved) = resolve_include(path_text, system, input, include_dirs) else {
            continue;
        };
        let header_text = read_text_file(&resolved)?;
        if header_text.contains(GENERATED_HEADER_MARKER) {
            // The companion source sits beside its generated header.
            let candidate = resolved.with_extension("cnx");
            if candidate.exists() {
                roots.push(candidate);
            }
        } else {
            let literal = cap
                .get(0)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            pipeline.headers.push((resolved, literal));
        }
    }
    Ok(roots)
}

/// Kahn's algorithm over the include graph, deterministic by discovery
/// order. Nodes left over belong to cycles; they are appended in stable
/// order with a warning each.
fn topological_sort(
    edges: &IndexMap<PathBuf, IndexSet<PathBuf>>,
) -> (Vec<PathBuf>, Vec<Diagnostic>) {
    // An edge includer -> includee means the includee must be emitted
    // first, so each node's unmet count is its dependency count.
    let mut unmet: IndexMap<&PathBuf, usize> = IndexMap::new();
    for (node, deps) in edges {
        unmet.entry(node).or_insert(0);
        for dep in deps {
            unmet.entry(dep).or_insert(0);
        }
    }
    for (node, deps) in edges {
        if let Some(count) = unmet.get_mut(node) {
            *count += deps.iter().filter(|d| *d != node).count();
        }
    }

    let mut queue: VecDeque<&PathBuf> = unmet
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| *node)
        .collect();
    let mut done: IndexSet<&PathBuf> = IndexSet::new();
    let mut sorted: Vec<PathBuf> = Vec::new();

    while let Some(node) = queue.pop_front() {
        if !done.insert(node) {
            continue;
        }
        sorted.push(node.clone());
        for (includer, deps) in edges {
            if deps.contains(node) && !done.contains(includer) {
                if let Some(count) = unmet.get_mut(includer) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        queue.push_back(includer);
                    }
                }
            }
        }
    }

    // Whatever is left sits on a cycle: warn and append in stable order.
    let mut warnings = Vec::new();
    let leftovers: Vec<&PathBuf> = unmet
        .keys()
        .filter(|node| !done.contains(*node))
        .copied()
        .collect();
    for node in leftovers {
        warnings.push(Diagnostic::warning(
            node.display().to_string(),
            1,
            1,
            message(
                diagnostic_codes::DEPENDENCY_CYCLE,
                &[&node.display().to_string()],
            ),
            diagnostic_codes::DEPENDENCY_CYCLE,
        ));
        sorted.push(node.clone());
    }
    (sorted, warnings)
}

#[cfg(test)]
#[path = "tests/discovery_tests.rs"]
mod tests;

use super::*;
use crate::config::ResolvedOptions;
use std::fs;

fn options() -> ResolvedOptions {
    ResolvedOptions {
        out: None,
        header_out: None,
        base_path: None,
        include: Vec::new(),
        defines: Vec::new(),
        target: None,
        cpp: false,
        debug: false,
    }
}

fn job_for(dir: &Path, input: PathBuf, options: ResolvedOptions) -> JobOptions {
    JobOptions {
        input,
        project_root: dir.to_path_buf(),
        options,
        define_names: Vec::new(),
        parse_only: false,
        no_cache: true,
        write: true,
    }
}

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("write fixture");
    path
}

#[test]
fn translates_a_single_file_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write(
        dir.path(),
        "main.cnx",
        "export void blink(u8 times) { u8 i <- times; }\n",
    );
    let result = run_job(&job_for(dir.path(), input, options())).expect("job");
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
    assert!(dir.path().join("main.c").exists());
    assert!(dir.path().join("main.h").exists());
    assert!(dir.path().join("cnx_helpers.h").exists());
    let body = fs::read_to_string(dir.path().join("main.c")).expect("read");
    assert!(body.contains("void blink(uint8_t times) {"));
}

// Scenario: cross-file const inference in C++ mode.
#[test]
fn cross_file_auto_const_in_cpp_mode() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        "a.cnx",
        "export void read_only(u8 data[]) { u8 first <- data[0]; }\n",
    );
    write(
        dir.path(),
        "b.cnx",
        "#include \"a.cnx\"\nexport void caller(u8 buf[]) { read_only(buf); }\n",
    );
    let mut opts = options();
    opts.cpp = true;
    let result = run_job(&job_for(dir.path(), dir.path().to_path_buf(), opts)).expect("job");
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);

    let a_body = fs::read_to_string(dir.path().join("a.cpp")).expect("a.cpp");
    let a_header = fs::read_to_string(dir.path().join("a.hpp")).expect("a.hpp");
    assert!(
        a_body.contains("void read_only(const uint8_t data[]) {"),
        "a.cpp:\n{a_body}"
    );
    assert!(
        a_header.contains("void read_only(const uint8_t data[]);"),
        "a.hpp:\n{a_header}"
    );
    // The generated header carries the entry-point marker.
    assert!(a_header.starts_with("// Generated by C-Next Transpiler"));
}

#[test]
fn c_mode_does_not_emit_auto_const() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write(
        dir.path(),
        "a.cnx",
        "export void read_only(u8 data[]) { u8 first <- data[0]; }\n",
    );
    let result = run_job(&job_for(dir.path(), input, options())).expect("job");
    assert!(result.success);
    let body = fs::read_to_string(dir.path().join("a.c")).expect("a.c");
    assert!(body.contains("void read_only(uint8_t data[]) {"), "a.c:\n{body}");
    assert!(!body.contains("const uint8_t data[]"));
}

#[test]
fn failed_file_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "good.cnx", "export void fine() { }\n");
    write(dir.path(), "bad.cnx", "export void broken() { goto out; }\n");
    let result = run_job(&job_for(dir.path(), dir.path().to_path_buf(), options())).expect("job");
    assert!(!result.success);
    // No partial output: the good file's C must not exist either.
    assert!(!dir.path().join("good.c").exists());
    assert!(!dir.path().join("bad.c").exists());
    assert!(result.written.is_empty());
}

#[test]
fn parse_only_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write(dir.path(), "main.cnx", "export void f() { }\n");
    let mut job = job_for(dir.path(), input, options());
    job.parse_only = true;
    let result = run_job(&job).expect("job");
    assert!(result.success);
    assert!(!dir.path().join("main.c").exists());
    assert!(!result.outputs.is_empty());
}

#[test]
fn conflict_aborts_before_codegen() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "a.cnx", "export u8 shared;\n");
    write(dir.path(), "b.cnx", "export u8 shared;\n");
    let result = run_job(&job_for(dir.path(), dir.path().to_path_buf(), options())).expect("job");
    assert!(!result.success);
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.code == diagnostic_codes::DUPLICATE_SYMBOL)
    );
    assert!(result.outputs.is_empty());
}

#[test]
fn pipeline_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write(
        dir.path(),
        "main.cnx",
        "enum E { A, B }\nexport void f(E e) { switch (e) { case E.A { } case E.B { } } }\n",
    );
    let job = job_for(dir.path(), input, options());
    run_job(&job).expect("first run");
    let first = fs::read_to_string(dir.path().join("main.c")).expect("read");
    run_job(&job).expect("second run");
    let second = fs::read_to_string(dir.path().join("main.c")).expect("read");
    assert_eq!(first, second);
}

#[test]
fn pragma_target_applies_when_nothing_else_sets_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write(
        dir.path(),
        "main.cnx",
        "#pragma target cortex-m7\natomic u8 counter <- 0;\nexport void tick() { counter +<- 1; }\n",
    );
    let result = run_job(&job_for(dir.path(), input, options())).expect("job");
    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
    let body = fs::read_to_string(dir.path().join("main.c")).expect("read");
    assert!(body.contains("__LDREXB"), "body:\n{body}");
}

#[test]
fn out_dir_receives_outputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("build");
    let input = write(dir.path(), "main.cnx", "export void f() { }\n");
    let mut opts = options();
    opts.out = Some(out.clone());
    let result = run_job(&job_for(dir.path(), input, opts)).expect("job");
    assert!(result.success);
    assert!(out.join("main.c").exists());
    assert!(out.join("main.h").exists());
    assert!(out.join("cnx_helpers.h").exists());
}

#[test]
fn panic_location_extraction() {
    assert_eq!(panic_location("boom at line 42"), (42, 1));
    assert_eq!(panic_location("main.cnx:12:7"), (12, 7));
    assert_eq!(panic_location("no location"), (1, 1));
}

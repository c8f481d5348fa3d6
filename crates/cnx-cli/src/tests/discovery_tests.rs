use super::*;
use std::fs;

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("write fixture");
    path
}

#[test]
fn single_file_discovers_transitive_includes_in_topo_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "b.cnx", "export const u8 SIZE <- 4;\n");
    let a = write(dir.path(), "a.cnx", "#include \"b.cnx\"\nu8 buf[SIZE];\n");

    let pipeline = discover(&a, &[]).expect("discover");
    assert_eq!(pipeline.cnx_files.len(), 2);
    assert!(
        pipeline.cnx_files[0].ends_with("b.cnx"),
        "dependency must come first: {:?}",
        pipeline.cnx_files
    );
    assert!(pipeline.cnx_files[1].ends_with("a.cnx"));
    // Only the root regenerates; the include contributes symbols only.
    assert_eq!(pipeline.generate.len(), 1);
    assert!(pipeline.generate.iter().next().expect("root").ends_with("a.cnx"));
    assert!(pipeline.warnings.is_empty());
}

#[test]
fn directory_input_collects_all_roots() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "one.cnx", "u8 x;\n");
    write(dir.path(), "two.cnx", "u8 y;\n");

    let pipeline = discover(dir.path(), &[]).expect("discover");
    assert_eq!(pipeline.cnx_files.len(), 2);
    assert_eq!(pipeline.generate.len(), 2);
}

#[test]
fn headers_carry_their_literal_directive() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "util.h", "void helper(void);\n");
    let a = write(dir.path(), "a.cnx", "#include \"util.h\"\nu8 x;\n");

    let pipeline = discover(&a, &[]).expect("discover");
    assert_eq!(pipeline.headers.len(), 1);
    assert_eq!(pipeline.headers[0].1, "#include \"util.h\"");
}

#[test]
fn unresolved_include_is_a_warning_not_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let a = write(dir.path(), "a.cnx", "#include <NoSuchLib.h>\nu8 x;\n");

    let pipeline = discover(&a, &[]).expect("discover");
    assert_eq!(pipeline.warnings.len(), 1);
    assert_eq!(
        pipeline.warnings[0].code,
        diagnostic_codes::UNRESOLVED_INCLUDE
    );
}

#[test]
fn include_cycle_warns_and_keeps_all_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "a.cnx", "#include \"b.cnx\"\nu8 x;\n");
    write(dir.path(), "b.cnx", "#include \"a.cnx\"\nu8 y;\n");

    let pipeline = discover(&dir.path().join("a.cnx"), &[]).expect("discover");
    assert_eq!(pipeline.cnx_files.len(), 2);
    assert!(
        pipeline
            .warnings
            .iter()
            .any(|d| d.code == diagnostic_codes::DEPENDENCY_CYCLE)
    );
}

#[test]
fn generated_headers_are_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        "old.h",
        "// Generated by C-Next Transpiler\n#ifndef OLD_H\n#endif\n",
    );
    let a = write(dir.path(), "a.cnx", "#include \"old.h\"\nu8 x;\n");

    let pipeline = discover(&a, &[]).expect("discover");
    assert!(pipeline.headers.is_empty());
}

#[test]
fn quoted_includes_prefer_the_current_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let lib = dir.path().join("lib");
    fs::create_dir_all(&lib).expect("mkdir");
    write(&lib, "util.h", "int lib_version;\n");
    write(dir.path(), "util.h", "int local_version;\n");
    let a = write(dir.path(), "a.cnx", "#include \"util.h\"\nu8 x;\n");

    let pipeline = discover(&a, &[lib]).expect("discover");
    assert_eq!(pipeline.headers.len(), 1);
    let resolved = fs::read_to_string(&pipeline.headers[0].0).expect("read");
    assert!(resolved.contains("local_version"));
}

#[test]
fn missing_input_is_fatal() {
    assert!(discover(Path::new("/no/such/file.cnx"), &[]).is_err());
}

#[test]
fn binary_file_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.cnx");
    fs::write(&path, b"\x00\x01\x02").expect("write");
    assert!(discover(&path, &[]).is_err());
}

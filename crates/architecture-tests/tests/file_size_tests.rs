//! Architecture tests for file size limits.
//!
//! - Files over 700 LOC need a reason to stay that large (warning logged).
//! - Files over 1000 LOC are presumed mis-scoped (test failure).
//!
//! Walks every .rs file under `crates/` and counts non-blank, non-comment lines.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const WARNING_THRESHOLD: usize = 700;
const FAILURE_THRESHOLD: usize = 1000;

/// Files excluded from size checks, as (path_suffix, justification) pairs.
///
/// The path_suffix is matched against the end of the file path.
const EXCLUDED_FILES: &[(&str, &str)] = &[];

#[test]
fn file_size_limits() {
    let workspace_root = workspace_root();
    let crates_dir = workspace_root.join("crates");

    assert!(
        crates_dir.exists(),
        "crates/ directory not found at {:?}",
        crates_dir
    );

    let rust_files = find_rust_files(&crates_dir);
    let mut failures = Vec::new();
    let mut warnings = Vec::new();

    for file_path in &rust_files {
        let loc = count_loc(file_path);
        let relative_path = file_path.strip_prefix(&workspace_root).unwrap_or(file_path);
        let relative_str = relative_path.to_string_lossy();

        let is_excluded = EXCLUDED_FILES
            .iter()
            .any(|(suffix, _)| relative_str.ends_with(suffix));

        if loc > FAILURE_THRESHOLD {
            if is_excluded {
                eprintln!(
                    "[EXCLUDED] {}: {} LOC (threshold: {})",
                    relative_str, loc, FAILURE_THRESHOLD
                );
            } else {
                failures.push((relative_str.to_string(), loc));
            }
        } else if loc > WARNING_THRESHOLD {
            warnings.push((relative_str.to_string(), loc));
        }
    }

    if !warnings.is_empty() {
        eprintln!(
            "\n=== File Size Warnings (files >{} LOC) ===",
            WARNING_THRESHOLD
        );
        for (path, loc) in &warnings {
            eprintln!("  - {}: {} lines", path, loc);
        }
        eprintln!();
    }

    if !failures.is_empty() {
        let mut error_message = format!(
            "\n=== Architecture Test Failed: File Size Limit Exceeded ===\n\n\
             Files exceeding {} LOC (presumed mis-scoped):\n",
            FAILURE_THRESHOLD
        );
        for (path, loc) in &failures {
            error_message.push_str(&format!("  - {}: {} lines\n", path, loc));
        }
        error_message.push_str("\nSplit these files or add them to EXCLUDED_FILES with a justification.\n");

        panic!("{}", error_message);
    }

    eprintln!(
        "\n[architecture] Checked {} Rust files for size limits.",
        rust_files.len()
    );
}

/// Counts lines of code, skipping blank lines and comments.
///
/// Block comments are handled simplistically: only continuation lines starting
/// with `*` are skipped.
fn count_loc(path: &Path) -> usize {
    let content = fs::read_to_string(path).expect("Failed to read file");
    let mut count = 0;
    let mut in_block_comment = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with("/*") && !trimmed.starts_with("/**") {
            in_block_comment = true;
        }
        if trimmed.ends_with("*/") {
            in_block_comment = false;
            continue;
        }

        if in_block_comment && trimmed.starts_with('*') {
            continue;
        }

        if trimmed.starts_with("//") {
            continue;
        }

        count += 1;
    }

    count
}

/// All .rs files under `dir`, skipping build output and this crate.
fn find_rust_files(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name();
            name != "target" && name != "architecture-tests"
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|entry| entry.into_path())
        .collect()
}

/// The workspace root, two levels above this crate's manifest.
fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map(Path::to_path_buf)
        .expect("architecture-tests lives under crates/")
}

fn loc_of(source: &str) -> usize {
    let mut file = tempfile::Builder::new().suffix(".rs").tempfile().unwrap();
    file.write_all(source.as_bytes()).unwrap();
    count_loc(file.path())
}

#[test]
fn test_count_loc_basic() {
    let loc = loc_of(
        r#"// This is a comment
fn main() {
    let x = 5; // inline comment

    // Another comment
    println!("Hello");
}
"#,
    );
    assert_eq!(loc, 4);
}

#[test]
fn test_count_loc_doc_comments() {
    let loc = loc_of(
        r#"//! Module documentation

/// Function documentation
fn test() {
    // implementation
    let x = 1;
}
"#,
    );
    assert_eq!(loc, 3);
}

#[test]
fn test_count_loc_block_comments() {
    let loc = loc_of(
        r#"/* Header comment. */
fn answer() -> u8 {
    42
}
"#,
    );
    assert_eq!(loc, 3);
}

#[test]
fn test_workspace_root_has_crates_dir() {
    assert!(workspace_root().join("crates").is_dir());
    assert!(workspace_root().join("Cargo.toml").is_file());
}

#[test]
fn test_excluded_files_list_is_consistent() {
    for (pattern, justification) in EXCLUDED_FILES {
        assert!(!pattern.is_empty(), "Excluded file pattern must not be empty");
        assert!(
            !justification.is_empty(),
            "Justification for '{}' must not be empty",
            pattern
        );
    }
}

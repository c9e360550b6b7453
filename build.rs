use std::path::{Path, PathBuf};
use std::process::Command;

const MAX_LINES: usize = 750;

const CHECKED_EXTENSIONS: &[&str] = &["rs", "md", "yaml", "toml"];

const EXCLUDED_DIRS: &[&str] = &["target", ".git", "node_modules", "examples"];

const EXCLUDED_FILES: &[&str] = &["Cargo.lock"];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=workflow.yaml");

    enforce_line_limits();
    enforce_no_dead_code_allows();
    enforce_no_test_skips();
    enforce_serial_for_env_mutations();
}

fn manifest_root() -> PathBuf {
    PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set"))
}

/// Rust sources under the crate, excluding this build script.
fn rust_sources(root: &Path) -> Vec<PathBuf> {
    collect_files_to_check(root)
        .into_iter()
        .filter(|p| {
            p.extension().and_then(|e| e.to_str()) == Some("rs")
                && p.file_name().and_then(|n| n.to_str()) != Some("build.rs")
        })
        .collect()
}

fn enforce_line_limits() {
    let root = manifest_root();
    let files = collect_files_to_check(&root);

    for file in &files {
        println!("cargo:rerun-if-changed={}", file.display());
    }

    let mut violations = Vec::new();
    for file in &files {
        match count_lines(file) {
            Ok(line_count) if line_count > MAX_LINES => {
                let rel_path = file.strip_prefix(&root).unwrap_or(file);
                violations.push((rel_path.to_path_buf(), line_count));
            }
            Ok(_) => {}
            Err(e) => {
                let rel_path = file.strip_prefix(&root).unwrap_or(file);
                println!(
                    "cargo:warning=Could not read file {}: {}",
                    rel_path.display(),
                    e
                );
            }
        }
    }

    if !violations.is_empty() {
        eprintln!("\n========================================");
        eprintln!("FILE LINE LIMIT EXCEEDED (max {} lines)", MAX_LINES);
        eprintln!("========================================");
        for (path, lines) in &violations {
            eprintln!(
                "  {} - {} lines (exceeds by {})",
                path.display(),
                lines,
                lines - MAX_LINES
            );
        }
        eprintln!("========================================\n");
        eprintln!("Please split these files into smaller modules.\n");
        panic!(
            "Build failed: {} file(s) exceed the {} line limit",
            violations.len(),
            MAX_LINES
        );
    }
}

fn collect_files_to_check(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if let Ok(output) = Command::new("git")
        .args(["ls-files"])
        .current_dir(root)
        .output()
    {
        if output.status.success() {
            if let Ok(stdout) = String::from_utf8(output.stdout) {
                for line in stdout.lines() {
                    let path = root.join(line);
                    if should_check_file(&path, root) {
                        files.push(path);
                    }
                }
                if !files.is_empty() {
                    return files;
                }
            }
        }
    }

    walk_directory(root, root, &mut files);
    files
}

fn walk_directory(dir: &Path, root: &Path, files: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();

        if path.is_dir() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if EXCLUDED_DIRS.contains(&name) {
                    continue;
                }
            }
            walk_directory(&path, root, files);
        } else if should_check_file(&path, root) {
            files.push(path);
        }
    }
}

fn should_check_file(path: &Path, root: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e,
        None => return false,
    };

    if !CHECKED_EXTENSIONS.contains(&ext) {
        return false;
    }

    if let Ok(rel_path) = path.strip_prefix(root) {
        let rel_str = rel_path.to_string_lossy();
        if EXCLUDED_FILES.iter().any(|excluded| rel_str == *excluded) {
            return false;
        }

        for component in rel_path.components() {
            if let Some(name) = component.as_os_str().to_str() {
                if EXCLUDED_DIRS.contains(&name) {
                    return false;
                }
            }
        }
    }

    true
}

fn count_lines(path: &Path) -> std::io::Result<usize> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count())
}

fn report_and_fail(title: &str, violations: &[(PathBuf, Vec<(usize, String)>)], advice: &[&str]) {
    let total_count: usize = violations.iter().map(|(_, v)| v.len()).sum();

    eprintln!("\n========================================");
    eprintln!("{}", title);
    eprintln!("========================================");
    eprintln!();
    for (path, lines) in violations {
        for (line_num, message) in lines {
            eprintln!("  {}:{}", path.display(), line_num);
            eprintln!("    {}", message.trim());
            eprintln!();
        }
    }
    eprintln!("========================================");
    for line in advice {
        eprintln!("{}", line);
    }
    eprintln!("========================================\n");
    panic!("Build failed: {} occurrence(s) of: {}", total_count, title);
}

fn enforce_no_dead_code_allows() {
    let root = manifest_root();
    let mut violations: Vec<(PathBuf, Vec<(usize, String)>)> = Vec::new();

    for file in &rust_sources(&root) {
        if let Ok(content) = std::fs::read_to_string(file) {
            let file_violations: Vec<(usize, String)> = content
                .lines()
                .enumerate()
                .filter(|(_, line)| {
                    let trimmed = line.trim();
                    (trimmed.starts_with("#[allow(") || trimmed.starts_with("#![allow("))
                        && trimmed.contains("dead_code")
                })
                .map(|(line_num, line)| (line_num + 1, line.to_string()))
                .collect();
            if !file_violations.is_empty() {
                let rel_path = file.strip_prefix(&root).unwrap_or(file).to_path_buf();
                violations.push((rel_path, file_violations));
            }
        }
    }

    if !violations.is_empty() {
        report_and_fail(
            "#[allow(dead_code)] IS NOT ALLOWED",
            &violations,
            &[
                "Delete unused code, or move test-only code behind #[cfg(test)].",
            ],
        );
    }
}

/// Test bodies found in a file: (attribute line, name, body lines).
fn test_functions<'a>(lines: &[&'a str]) -> Vec<(usize, String, Vec<(usize, &'a str)>)> {
    let mut tests = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let trimmed = lines[i].trim();
        if trimmed == "#[test]" || trimmed.starts_with("#[tokio::test") {
            let start = i + 1;
            let attributes_start = i.saturating_sub(3);
            let serial = lines[attributes_start..i]
                .iter()
                .chain(lines[i..lines.len().min(i + 4)].iter())
                .any(|l| {
                    let l = l.trim();
                    l == "#[serial]" || l == "#[serial_test::serial]"
                });
            let mut name = String::new();
            let mut j = i + 1;
            while j < lines.len().min(i + 5) {
                if let Some(fn_pos) = lines[j].find("fn ") {
                    let after_fn = lines[j].get(fn_pos + 3..).unwrap_or("");
                    name = after_fn.split('(').next().unwrap_or("").trim().to_string();
                    break;
                }
                j += 1;
            }

            let mut body = Vec::new();
            let mut depth = 0i32;
            let mut opened = false;
            while j < lines.len() {
                let line = lines[j];
                body.push((depth, line));
                for c in line.chars() {
                    if c == '{' {
                        depth += 1;
                        opened = true;
                    } else if c == '}' {
                        depth -= 1;
                    }
                }
                j += 1;
                if opened && depth <= 0 {
                    break;
                }
            }
            let name = if serial { format!("{} [serial]", name) } else { name };
            tests.push((
                start,
                name,
                body.into_iter()
                    .map(|(d, l)| (usize::try_from(d).unwrap_or(0), l))
                    .collect(),
            ));
            i = j;
        } else {
            i += 1;
        }
    }
    tests
}

/// Bans tests that silently skip instead of failing.
fn enforce_no_test_skips() {
    let root = manifest_root();
    let skip_patterns = ["Skipping test", "skipping test", "Test skipped", "test skipped"];
    let mut violations: Vec<(PathBuf, Vec<(usize, String)>)> = Vec::new();

    for file in &rust_sources(&root) {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        let lines: Vec<&str> = content.lines().collect();
        let mut file_violations = Vec::new();
        for (start, name, body) in test_functions(&lines) {
            let skips = body.iter().any(|(depth, line)| {
                skip_patterns.iter().any(|p| line.contains(p))
                    || (line.trim() == "return;" && *depth > 1)
            });
            if skips {
                file_violations.push((start, format!("test `{}` silently skips", name)));
            }
        }
        if !file_violations.is_empty() {
            let rel_path = file.strip_prefix(&root).unwrap_or(file).to_path_buf();
            violations.push((rel_path, file_violations));
        }
    }

    if !violations.is_empty() {
        report_and_fail(
            "SILENT TEST SKIPS ARE NOT ALLOWED",
            &violations,
            &["Tests must FAIL if they cannot run. Use assert!() on preconditions."],
        );
    }
}

/// Requires #[serial] for tests that mutate environment variables.
fn enforce_serial_for_env_mutations() {
    let root = manifest_root();
    let mut violations: Vec<(PathBuf, Vec<(usize, String)>)> = Vec::new();

    for file in &rust_sources(&root) {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        let lines: Vec<&str> = content.lines().collect();
        let mut file_violations = Vec::new();
        for (start, name, body) in test_functions(&lines) {
            if name.ends_with("[serial]") {
                continue;
            }
            let mutates = body.iter().any(|(_, line)| {
                let trimmed = line.trim();
                !trimmed.starts_with("//")
                    && (trimmed.contains("env::set_var") || trimmed.contains("env::remove_var"))
            });
            if mutates {
                file_violations.push((start, format!("test `{}` mutates env without #[serial]", name)));
            }
        }
        if !file_violations.is_empty() {
            let rel_path = file.strip_prefix(&root).unwrap_or(file).to_path_buf();
            violations.push((rel_path, file_violations));
        }
    }

    if !violations.is_empty() {
        report_and_fail(
            "ENV MUTATIONS REQUIRE #[serial]",
            &violations,
            &["Add #[serial] from serial_test to every test that calls set_var or remove_var."],
        );
    }
}

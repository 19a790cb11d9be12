//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries
//! (domain → application → infra/commands/output) are maintained.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

fn src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

fn relative(file: &Path) -> String {
    file.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .display()
        .to_string()
        .replace('\\', "/")
}

/// Track brace depth and return whether a line is inside a test-only block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` or
    /// `#[cfg(all(test, ...))]` block.
    fn process_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if !self.in_test_block && trimmed.starts_with("#[cfg(") && trimmed.contains("test") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Non-test, non-comment lines of every file under `dir`, with line numbers.
fn production_lines(dir: &Path) -> Vec<(String, usize, String)> {
    let mut out = Vec::new();
    for file in collect_rs_files(dir) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let rel = relative(&file);
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test
                || trimmed.starts_with("//")
                || trimmed.starts_with("/*")
                || trimmed.starts_with('*')
            {
                continue;
            }
            out.push((rel.clone(), i + 1, line.to_string()));
        }
    }
    out
}

fn find_violations(dir: &Path, forbidden: &[&str]) -> Vec<String> {
    production_lines(dir)
        .into_iter()
        .filter_map(|(rel, lineno, line)| {
            forbidden
                .iter()
                .find(|pattern| line.contains(*pattern))
                .map(|pattern| format!("{rel}:{lineno}: `{pattern}`: {}", line.trim()))
        })
        .collect()
}

// ── Layer boundaries ──────────────────────────────────────────────────────────

#[test]
fn domain_is_pure() {
    let violations = find_violations(
        &src_dir().join("domain"),
        &[
            "crate::infra",
            "crate::application",
            "crate::commands",
            "crate::output",
            "tokio::",
            "std::fs",
            "std::process",
        ],
    );
    assert!(
        violations.is_empty(),
        "domain/ must stay free of I/O and outer layers:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_does_not_reach_outward() {
    let violations = find_violations(
        &src_dir().join("application"),
        &["crate::infra", "crate::commands", "crate::output", "std::process::Command"],
    );
    assert!(
        violations.is_empty(),
        "application/ must depend only on domain/ and its own ports:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let violations =
        find_violations(&src_dir().join("infra"), &["crate::commands", "crate::output"]);
    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let violations = find_violations(&src_dir().join("infra"), &["println!", "eprintln!"]);
    assert!(
        violations.is_empty(),
        "infra/ must not use println!/eprintln! outside #[cfg(test)]:\n{}",
        violations.join("\n")
    );
}

// ── Process execution stays in infra ──────────────────────────────────────────

#[test]
fn no_tokio_command_runner_outside_infra() {
    let violations: Vec<String> = production_lines(&src_dir())
        .into_iter()
        .filter(|(rel, _, line)| !rel.contains("/infra/") && line.contains("TokioCommandRunner::"))
        .map(|(rel, lineno, line)| format!("{rel}:{lineno}: {}", line.trim()))
        .collect();
    assert!(
        violations.is_empty(),
        "Construct command runners inside infra/ only:\n{}",
        violations.join("\n")
    );
}

#[test]
fn services_take_trait_bounds_not_adapters() {
    let concrete = [
        "InventoryBackend",
        "StateManager",
        "YamlConfigStore",
        "AwsCliPowerControl",
        "TokioCommandRunner",
    ];
    let violations: Vec<String> = production_lines(&src_dir().join("application"))
        .into_iter()
        .filter(|(_, _, line)| concrete.iter().any(|c| line.contains(c)))
        .map(|(rel, lineno, line)| format!("{rel}:{lineno}: {}", line.trim()))
        .collect();
    assert!(
        violations.is_empty(),
        "application/ must name ports, not adapters:\n{}",
        violations.join("\n")
    );
}

// ── Presentation ──────────────────────────────────────────────────────────────

#[test]
fn no_json_flag_threading_in_commands() {
    let violations = find_violations(&src_dir().join("commands"), &["json: bool"]);
    assert!(
        violations.is_empty(),
        "Commands read the output mode from AppContext, not a `json: bool` parameter:\n{}",
        violations.join("\n")
    );
}

#[test]
fn commands_do_not_build_adapters_directly() {
    let adapters = ["InventoryBackend::new", "StateManager::new", "YamlConfigStore::new"];
    let violations = find_violations(&src_dir().join("commands"), &adapters);
    assert!(
        violations.is_empty(),
        "Commands get their adapters from AppContext:\n{}",
        violations.join("\n")
    );
}

#[test]
fn command_handlers_accept_app_context() {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src_dir().join("commands")) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let Some(signature) = content
            .lines()
            .find(|l| l.starts_with("pub async fn run(") || l.starts_with("pub fn run("))
        else {
            continue;
        };
        let uses_app = content.contains("app.") || content.contains("commands::require_deployment");
        if uses_app && !signature.contains("app: &AppContext") {
            violations.push(format!("{}: {signature}", relative(&file)));
        }
    }
    assert!(
        violations.is_empty(),
        "Handlers that use the application context must take `app: &AppContext`:\n{}",
        violations.join("\n")
    );
}

#[test]
fn tracker_skips_test_modules() {
    let mut tracker = CfgTestTracker::new();
    let source = "fn a() {}\n#[cfg(test)]\nmod tests {\n    fn b() { println!(); }\n}\nfn c() {}\n";
    let flags: Vec<bool> = source.lines().map(|l| tracker.process_line(l)).collect();
    assert_eq!(flags, vec![false, true, true, true, false, false]);
}

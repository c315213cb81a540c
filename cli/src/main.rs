use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use clap::{ArgAction, Parser};
use console::style;
use globset::{Glob, GlobSet, GlobSetBuilder};
use lintbridge_core::{
    apply_edits, CommandLinter, Diagnostic, DiagnosticCategory, LanguageService, LintEngine,
    LintError, LintService, LogLevel, NodeModulesResolver, PluginConfig, ResolutionCache,
};
use serde::Serialize;
use walkdir::WalkDir;

mod host;

use crate::host::FileHost;

/// Upper bound on fix-all passes per file; each pass only applies edits that
/// do not touch one another.
const MAX_FIX_PASSES: usize = 10;

/// Lintbridge CLI entry point.
#[derive(Debug, Parser)]
#[command(
    name = "lintbridge",
    about = "Run an external linter and apply its autofixes without overlapping edits."
)]
struct Args {
    /// Plugin settings file (YAML or JSON). Used when present.
    #[arg(long, default_value = "lintbridge.yml")]
    settings: PathBuf,

    /// Linter configuration file, overriding `configFile` from the settings.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Linter executable name, overriding `linter` from the settings.
    #[arg(long, value_name = "NAME")]
    linter: Option<String>,

    /// Report every rule failure as a warning.
    #[arg(long, action = ArgAction::SetTrue)]
    warnings: bool,

    /// Apply the non-overlapping autofix batch, repeating until nothing is left.
    #[arg(long, action = ArgAction::SetTrue)]
    fix: bool,

    /// Emit JSON output for automation.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Glob patterns to skip (comma-separated).
    #[arg(
        long,
        value_delimiter = ',',
        value_name = "GLOB[,GLOB]",
        default_value = "**/node_modules/**,**/node_modules"
    )]
    ignore: Vec<String>,

    /// Files or directories to lint.
    #[arg(value_name = "PATH", default_value = ".", num_args = 0..)]
    paths: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Problem {
    line: usize,
    column: usize,
    severity: DiagnosticCategory,
    message: String,
}

#[derive(Debug, Serialize)]
struct FileResult {
    path: String,
    fixed: usize,
    problems: Vec<Problem>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    run_lint(args)
}

fn run_lint(args: Args) -> anyhow::Result<()> {
    let root = env::current_dir()?;
    let settings = load_settings(&args)?;
    let ignore = build_ignore_set(&args.ignore)?;
    let files = collect_files(&args.paths, ignore.as_ref())?;

    let host = Arc::new(FileHost::new());
    let resolver = NodeModulesResolver::new(Arc::new(ResolutionCache::new()));
    let linter = CommandLinter::new(settings.linter.clone(), resolver);
    let service = LintService::new(host.clone(), linter, settings, root.clone());

    let mut results = Vec::with_capacity(files.len());
    for path in files {
        let result = lint_file(&service, &host, &path, &root, args.fix)?;
        if !args.json {
            print_human_result(&result);
        }
        results.push(result);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    let errors = results
        .iter()
        .flat_map(|r| &r.problems)
        .filter(|p| p.severity == DiagnosticCategory::Error)
        .count();
    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn lint_file<E: LintEngine>(
    service: &LintService<Arc<FileHost>, E>,
    host: &FileHost,
    path: &Path,
    root: &Path,
    fix: bool,
) -> anyhow::Result<FileResult> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file = path.to_string_lossy().into_owned();
    host.set(&file, text.clone());

    let mut diagnostics = service.semantic_diagnostics(&file);
    let mut fixed = 0usize;
    if fix {
        match run_fix_passes(service, host, &file) {
            Ok(Some(outcome)) => {
                fixed = outcome.fixed;
                diagnostics = outcome.diagnostics;
            }
            Ok(None) => {}
            Err(err) => {
                host.log(
                    LogLevel::Error,
                    &format!("left {} unchanged: {err}", path.display()),
                );
                host.set(&file, text);
            }
        }
        if fixed > 0 {
            let updated = host.text(&file).unwrap_or_default();
            fs::write(path, updated)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }

    let problems = diagnostics
        .iter()
        .map(|diag| {
            let (line, column) = host.location(&file, diag.start).unwrap_or((1, 1));
            Problem {
                line,
                column,
                severity: diag.category,
                message: diag.message.clone(),
            }
        })
        .collect();
    host.remove(&file);
    service.forget(&file);

    let display = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    Ok(FileResult {
        path: display.to_string_lossy().into_owned(),
        fixed,
        problems,
    })
}

struct FixOutcome {
    fixed: usize,
    diagnostics: Vec<Diagnostic>,
}

/// Applies fix-all batches until none is left. Every pass re-lints the
/// rewritten text; a failed re-lint aborts the whole run, since the stale
/// index describes offsets of the previous text.
fn run_fix_passes<E: LintEngine>(
    service: &LintService<Arc<FileHost>, E>,
    host: &FileHost,
    file: &str,
) -> Result<Option<FixOutcome>, LintError> {
    let mut outcome: Option<FixOutcome> = None;
    for _ in 0..MAX_FIX_PASSES {
        let edits = service.fix_all_edits(file);
        if edits.is_empty() {
            break;
        }
        let current = host
            .text(file)
            .ok_or_else(|| LintError::UnknownFile(file.to_string()))?;
        host.set(file, apply_edits(&current, &edits)?);

        let mut diagnostics = host.semantic_diagnostics(file);
        diagnostics.extend(service.recompute(file)?);
        let fixed = outcome.as_ref().map_or(0, |o| o.fixed) + edits.len();
        outcome = Some(FixOutcome { fixed, diagnostics });
    }
    Ok(outcome)
}

fn load_settings(args: &Args) -> anyhow::Result<PluginConfig> {
    let mut settings = if args.settings.exists() {
        PluginConfig::load(&args.settings)
            .with_context(|| format!("Failed to load settings {}", args.settings.display()))?
    } else {
        PluginConfig::default()
    };
    if let Some(config) = &args.config {
        settings.config_file = Some(config.clone());
    }
    if let Some(linter) = &args.linter {
        settings.linter = linter.clone();
    }
    if args.warnings {
        settings.always_show_rule_failures_as_warnings = true;
    }
    Ok(settings)
}

fn build_ignore_set(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    let patterns: Vec<&String> = patterns.iter().filter(|p| !p.trim().is_empty()).collect();
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid glob `{pattern}`"))?);
    }
    Ok(Some(builder.build()?))
}

fn collect_files(paths: &[PathBuf], ignore: Option<&GlobSet>) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut walker = WalkDir::new(path).sort_by_file_name().into_iter();
            while let Some(entry_res) = walker.next() {
                let entry = entry_res?;
                let entry_path = entry.path();
                if let Some(set) = ignore {
                    if set.is_match(entry_path) {
                        if entry.file_type().is_dir() {
                            walker.skip_current_dir();
                        }
                        continue;
                    }
                }
                if entry.file_type().is_file() && is_supported(entry_path) {
                    files.push(entry_path.to_path_buf());
                }
            }
        } else if path.is_file() {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" | "mts" | "cts"
        ),
        None => false,
    }
}

fn print_human_result(result: &FileResult) {
    if result.problems.is_empty() && result.fixed == 0 {
        return;
    }
    println!("{}", style(&result.path).bold());
    if result.fixed > 0 {
        println!("  {} {} edit(s) applied", style("fixed").green(), result.fixed);
    }
    for problem in &result.problems {
        let label = match problem.severity {
            DiagnosticCategory::Error => style("error").red(),
            _ => style("warning").yellow(),
        };
        println!(
            "  {}:{}  {}  {}",
            problem.line, problem.column, label, problem.message
        );
    }
}

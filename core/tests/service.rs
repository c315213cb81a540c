use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use lintbridge_core::{
    apply_edits, Diagnostic, DiagnosticCategory, Finding, FixAction, FixKind, LanguageService,
    LineIndex, LintEngine, LintError, LintOptions, LintReport, LintResult, LintService, LogLevel,
    PluginConfig, PositionMapper, RuleBatchPolicy, DIAGNOSTIC_CODE,
};

const SOURCE: &str = "var a = 1\nvar b = \"x\"\nfoo()\n";

#[derive(Default)]
struct FakeHost {
    files: HashMap<String, LineIndex>,
    prior_diagnostics: Vec<Diagnostic>,
    prior_fixes: Vec<FixAction>,
    logs: RefCell<Vec<(LogLevel, String)>>,
}

impl FakeHost {
    fn with_file(name: &str, text: &str) -> Self {
        let mut host = Self::default();
        host.files.insert(name.to_string(), LineIndex::new(text));
        host
    }

    fn index(&self, file: &str) -> Result<&LineIndex, LintError> {
        self.files
            .get(file)
            .ok_or_else(|| LintError::UnknownFile(file.to_string()))
    }
}

impl PositionMapper for FakeHost {
    fn position_of(&self, file: &str, line: usize, character: usize) -> Result<usize, LintError> {
        self.index(file)?.position_of(file, line, character)
    }

    fn line_and_character_of(
        &self,
        file: &str,
        offset: usize,
    ) -> Result<(usize, usize), LintError> {
        Ok(self.index(file)?.position_at(offset))
    }
}

impl LanguageService for FakeHost {
    fn source_text(&self, file: &str) -> Option<String> {
        self.files.get(file).map(|idx| idx.text().to_string())
    }

    fn semantic_diagnostics(&self, _file: &str) -> Vec<Diagnostic> {
        self.prior_diagnostics.clone()
    }

    fn code_fixes_at_position(
        &self,
        _file: &str,
        _start: usize,
        _end: usize,
        _error_codes: &[u32],
    ) -> Vec<FixAction> {
        self.prior_fixes.clone()
    }

    fn supported_code_fixes(&self) -> Vec<u32> {
        vec![2304]
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.logs.borrow_mut().push((level, message.to_string()));
    }
}

/// Replays a scripted report, or fails when none is set.
#[derive(Default)]
struct FakeEngine {
    findings: RefCell<Option<Vec<Finding>>>,
    calls: Cell<usize>,
    last_options: RefCell<Option<LintOptions>>,
}

impl FakeEngine {
    fn reporting(findings: Vec<Finding>) -> Self {
        let engine = Self::default();
        engine.findings.replace(Some(findings));
        engine
    }
}

impl LintEngine for FakeEngine {
    fn lint_text(
        &self,
        _text: &str,
        file_name: &str,
        options: &LintOptions,
    ) -> Result<LintReport, LintError> {
        self.calls.set(self.calls.get() + 1);
        self.last_options.replace(Some(options.clone()));
        let Some(messages) = self.findings.borrow().clone() else {
            return Err(LintError::Engine("linter crashed".into()));
        };
        Ok(LintReport {
            error_count: 0,
            warning_count: messages.len(),
            results: vec![LintResult {
                file_path: file_name.to_string(),
                messages,
                ..LintResult::default()
            }],
        })
    }
}

fn findings() -> Vec<Finding> {
    vec![
        Finding::new(1, 1, "Unexpected var, use let or const instead.")
            .with_end(1, 4)
            .with_rule("no-var")
            .with_severity(2)
            .with_fix(0, 3, "let"),
        Finding::new(2, 1, "Unexpected var, use let or const instead.")
            .with_end(2, 4)
            .with_rule("no-var")
            .with_severity(2)
            .with_fix(10, 13, "let"),
        Finding::new(2, 9, "Strings must use singlequote.")
            .with_end(2, 12)
            .with_rule("quotes")
            .with_severity(1)
            .with_fix(18, 21, "'x'"),
        Finding::new(3, 1, "'foo' is not defined.")
            .with_end(3, 4)
            .with_rule("no-undef")
            .with_severity(2),
    ]
}

fn service(
    host: FakeHost,
    engine: FakeEngine,
    config: PluginConfig,
) -> LintService<FakeHost, FakeEngine> {
    LintService::new(host, engine, config, "/project")
}

fn host_diagnostic() -> Diagnostic {
    Diagnostic {
        file: "a.ts".into(),
        start: 22,
        length: 3,
        message: "Cannot find name 'foo'.".into(),
        category: DiagnosticCategory::Error,
        source: None,
        code: 2304,
    }
}

fn host_fix() -> FixAction {
    FixAction {
        fix_name: "import".into(),
        description: "Add import from \"./foo\"".into(),
        kind: FixKind::Host,
        changes: Vec::new(),
    }
}

#[test]
fn appends_lint_diagnostics_after_prior_ones() {
    let mut host = FakeHost::with_file("a.ts", SOURCE);
    host.prior_diagnostics = vec![host_diagnostic()];
    let svc = service(host, FakeEngine::reporting(findings()), PluginConfig::default());

    let diags = svc.semantic_diagnostics("a.ts");
    assert_eq!(diags.len(), 5);
    assert_eq!(diags[0], host_diagnostic());
    assert!(diags[1..].iter().all(Diagnostic::is_lint));
    assert_eq!(diags[1].start, 0);
    assert_eq!(diags[1].length, 3);
    assert_eq!(
        diags[1].message,
        "Unexpected var, use let or const instead. (no-var)"
    );
    assert_eq!(diags[1].category, DiagnosticCategory::Error);
    assert_eq!(diags[3].category, DiagnosticCategory::Warning);
    assert_eq!(svc.findings("a.ts").unwrap().len(), 4);
}

#[test]
fn forced_warnings_override_severity() {
    let config = PluginConfig {
        always_show_rule_failures_as_warnings: true,
        ..PluginConfig::default()
    };
    let svc = service(
        FakeHost::with_file("a.ts", SOURCE),
        FakeEngine::reporting(findings()),
        config,
    );
    assert!(svc
        .semantic_diagnostics("a.ts")
        .iter()
        .all(|d| d.category == DiagnosticCategory::Warning));
}

#[test]
fn type_errors_suppress_linting() {
    let mut host = FakeHost::with_file("a.ts", SOURCE);
    host.prior_diagnostics = vec![host_diagnostic()];
    let config = PluginConfig {
        supress_while_type_errors_present: true,
        ..PluginConfig::default()
    };
    let svc = service(host, FakeEngine::reporting(findings()), config);

    assert_eq!(svc.semantic_diagnostics("a.ts"), vec![host_diagnostic()]);
    assert_eq!(svc.engine().calls.get(), 0);
    let logs = svc.host().logs.borrow();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].0, LogLevel::Info);
}

#[test]
fn suppression_needs_prior_diagnostics() {
    let config = PluginConfig {
        supress_while_type_errors_present: true,
        ..PluginConfig::default()
    };
    let svc = service(
        FakeHost::with_file("a.ts", SOURCE),
        FakeEngine::reporting(findings()),
        config,
    );
    assert_eq!(svc.semantic_diagnostics("a.ts").len(), 4);
}

#[test]
fn definition_files_are_not_linted() {
    let svc = service(
        FakeHost::with_file("types.d.ts", SOURCE),
        FakeEngine::reporting(findings()),
        PluginConfig::default(),
    );
    assert!(svc.semantic_diagnostics("types.d.ts").is_empty());
    assert_eq!(svc.engine().calls.get(), 0);
}

#[test]
fn engine_failure_falls_back_to_prior_and_logs() {
    let mut host = FakeHost::with_file("a.ts", SOURCE);
    host.prior_diagnostics = vec![host_diagnostic()];
    let svc = service(host, FakeEngine::default(), PluginConfig::default());

    assert_eq!(svc.semantic_diagnostics("a.ts"), vec![host_diagnostic()]);
    let logs = svc.host().logs.borrow();
    assert_eq!(logs.len(), 1);
    let (level, message) = &logs[0];
    assert_eq!(*level, LogLevel::Error);
    assert!(message.contains("lint engine"), "{message}");
    assert!(message.contains("linter crashed"), "{message}");
}

#[test]
fn unknown_file_falls_back_and_logs_origin() {
    let svc = service(
        FakeHost::default(),
        FakeEngine::reporting(findings()),
        PluginConfig::default(),
    );
    assert!(svc.semantic_diagnostics("missing.ts").is_empty());
    assert!(svc.host().logs.borrow()[0].1.contains("offset translation"));
}

#[test]
fn failed_recomputation_keeps_previous_index() {
    let svc = service(
        FakeHost::with_file("a.ts", SOURCE),
        FakeEngine::reporting(findings()),
        PluginConfig::default(),
    );
    svc.semantic_diagnostics("a.ts");

    // The next pass reports a finding past the end of the document.
    svc.engine().findings.replace(Some(vec![
        Finding::new(1, 1, "ok").with_rule("semi"),
        Finding::new(40, 1, "gone").with_rule("semi"),
    ]));
    assert!(svc.semantic_diagnostics("a.ts").is_empty());

    let index = svc.findings("a.ts").unwrap();
    assert_eq!(index.len(), 4);
    assert!(index.lookup(0, 3).is_some());
}

#[test]
fn recomputation_replaces_index_wholesale() {
    let svc = service(
        FakeHost::with_file("a.ts", SOURCE),
        FakeEngine::reporting(findings()),
        PluginConfig::default(),
    );
    svc.semantic_diagnostics("a.ts");
    svc.engine()
        .findings
        .replace(Some(vec![Finding::new(3, 1, "only").with_end(3, 4)]));
    svc.semantic_diagnostics("a.ts");

    let index = svc.findings("a.ts").unwrap();
    assert_eq!(index.len(), 1);
    assert!(index.lookup(0, 3).is_none());
}

#[test]
fn unused_variable_findings_are_dropped_when_configured() {
    let config = PluginConfig {
        disable_no_unused_variable_rule: true,
        ..PluginConfig::default()
    };
    let svc = service(
        FakeHost::with_file("a.ts", SOURCE),
        FakeEngine::reporting(vec![
            Finding::new(1, 5, "'a' is assigned a value but never used.")
                .with_rule("no-unused-vars"),
        ]),
        config,
    );
    assert!(svc.semantic_diagnostics("a.ts").is_empty());
    assert!(svc.findings("a.ts").unwrap().is_empty());
}

#[test]
fn relative_config_file_is_resolved_against_project_root() {
    let config = PluginConfig {
        config_file: Some(".eslintrc.json".into()),
        ..PluginConfig::default()
    };
    let svc = service(
        FakeHost::with_file("a.ts", SOURCE),
        FakeEngine::reporting(Vec::new()),
        config,
    );
    svc.semantic_diagnostics("a.ts");
    let options = svc.engine().last_options.borrow().clone().unwrap();
    assert_eq!(
        options.config_file,
        Some(std::path::PathBuf::from("/project/.eslintrc.json"))
    );
    assert_eq!(options.cwd, std::path::PathBuf::from("/project"));
}

#[test]
fn fixes_are_appended_to_host_fixes() {
    let mut host = FakeHost::with_file("a.ts", SOURCE);
    host.prior_fixes = vec![host_fix()];
    let svc = service(host, FakeEngine::reporting(findings()), PluginConfig::default());
    svc.semantic_diagnostics("a.ts");

    let fixes = svc.code_fixes_at_position("a.ts", 0, 3, &[DIAGNOSTIC_CODE]);
    let kinds: Vec<_> = fixes.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FixKind::Host,
            FixKind::Single,
            FixKind::FixAllOfRule,
            FixKind::FixAllAutoFixable,
            FixKind::DisableRule,
        ]
    );
    assert_eq!(fixes[0], host_fix());
}

#[test]
fn no_finding_at_range_returns_host_fixes_unchanged() {
    let mut host = FakeHost::with_file("a.ts", SOURCE);
    host.prior_fixes = vec![host_fix(), host_fix()];
    let svc = service(host, FakeEngine::reporting(findings()), PluginConfig::default());
    svc.semantic_diagnostics("a.ts");

    assert_eq!(
        svc.code_fixes_at_position("a.ts", 1, 3, &[DIAGNOSTIC_CODE]),
        vec![host_fix(), host_fix()]
    );
    assert_eq!(
        svc.code_fixes_at_position("never-linted.ts", 0, 3, &[]),
        vec![host_fix(), host_fix()]
    );
}

#[test]
fn rule_batch_is_only_offered_for_two_or_more_fixes() {
    let svc = service(
        FakeHost::with_file("a.ts", SOURCE),
        FakeEngine::reporting(findings()),
        PluginConfig::default(),
    );
    svc.semantic_diagnostics("a.ts");

    let quotes = svc.code_fixes_at_position("a.ts", 18, 21, &[]);
    assert!(quotes.iter().all(|f| f.kind != FixKind::FixAllOfRule));
    let no_var = svc.code_fixes_at_position("a.ts", 0, 3, &[]);
    assert!(no_var.iter().any(|f| f.kind == FixKind::FixAllOfRule));
}

#[test]
fn rule_batch_policy_follows_config() {
    let overlapping = vec![
        Finding::new(1, 1, "a").with_end(1, 6).with_rule("r").with_fix(0, 5, "x"),
        Finding::new(1, 3, "b").with_end(1, 5).with_rule("r").with_fix(2, 4, "y"),
    ];
    for (policy, expected) in [
        (RuleBatchPolicy::Unfiltered, 2),
        (RuleBatchPolicy::NonOverlapping, 1),
    ] {
        let config = PluginConfig {
            rule_fix_all_policy: policy,
            ..PluginConfig::default()
        };
        let svc = service(
            FakeHost::with_file("a.ts", SOURCE),
            FakeEngine::reporting(overlapping.clone()),
            config,
        );
        svc.semantic_diagnostics("a.ts");
        let fixes = svc.code_fixes_at_position("a.ts", 0, 5, &[]);
        let batch = fixes
            .iter()
            .find(|f| f.kind == FixKind::FixAllOfRule)
            .unwrap();
        assert_eq!(batch.edits().count(), expected, "{policy:?}");
    }
}

#[test]
fn fix_all_batch_rewrites_document() {
    let svc = service(
        FakeHost::with_file("a.ts", SOURCE),
        FakeEngine::reporting(findings()),
        PluginConfig::default(),
    );
    svc.semantic_diagnostics("a.ts");
    let edits = svc.fix_all_edits("a.ts");
    assert_eq!(edits.len(), 3);
    assert_eq!(
        apply_edits(SOURCE, &edits).unwrap(),
        "let a = 1\nlet b = 'x'\nfoo()\n"
    );
}

#[test]
fn supported_codes_include_lint_code() {
    let svc = service(
        FakeHost::default(),
        FakeEngine::default(),
        PluginConfig::default(),
    );
    assert_eq!(svc.supported_code_fixes(), vec![2304, DIAGNOSTIC_CODE]);
}

#[test]
fn forgetting_a_document_drops_its_fixes() {
    let svc = service(
        FakeHost::with_file("a.ts", SOURCE),
        FakeEngine::reporting(findings()),
        PluginConfig::default(),
    );
    svc.semantic_diagnostics("a.ts");
    svc.forget("a.ts");
    assert!(svc.code_fixes_at_position("a.ts", 0, 3, &[]).is_empty());
}

#[test]
fn recompute_reports_failure_and_keeps_stale_index() {
    let svc = service(
        FakeHost::with_file("a.ts", SOURCE),
        FakeEngine::reporting(findings()),
        PluginConfig::default(),
    );
    assert_eq!(svc.recompute("a.ts").unwrap().len(), 4);
    let before = svc.findings("a.ts").unwrap();

    svc.engine().findings.replace(None);
    assert!(matches!(svc.recompute("a.ts"), Err(LintError::Engine(_))));
    let after = svc.findings("a.ts").unwrap();
    assert!(std::sync::Arc::ptr_eq(&before, &after));
    assert!(svc.host().logs.borrow().is_empty());
}

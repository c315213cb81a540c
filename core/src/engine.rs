//! The external linter and how it is located.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::error::{LintError, Result};
use crate::finding::LintReport;

/// Per-invocation linter settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintOptions {
    /// Working directory the linter resolves its configuration from.
    pub cwd: PathBuf,
    pub config_file: Option<PathBuf>,
}

/// Anything that can lint a document's text.
pub trait LintEngine {
    fn lint_text(&self, text: &str, file_name: &str, options: &LintOptions) -> Result<LintReport>;
}

impl<T: LintEngine + ?Sized> LintEngine for Arc<T> {
    fn lint_text(&self, text: &str, file_name: &str, options: &LintOptions) -> Result<LintReport> {
        (**self).lint_text(text, file_name, options)
    }
}

/// Locates a module by name under a set of search roots.
pub trait ModuleResolver {
    fn resolve(&self, name: &str, roots: &[PathBuf]) -> Option<PathBuf>;
}

/// Memoized resolution results, shared by every resolver built from it.
///
/// Each distinct key is probed once; [`ResolutionCache::clear`] forgets
/// everything, including the global package-manager directories.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    modules: DashMap<String, Option<PathBuf>>,
    global_dirs: Mutex<Option<Vec<PathBuf>>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with(
        &self,
        key: &str,
        probe: impl FnOnce() -> Option<PathBuf>,
    ) -> Option<PathBuf> {
        if let Some(hit) = self.modules.get(key) {
            return hit.value().clone();
        }
        let found = probe();
        self.modules.insert(key.to_string(), found.clone());
        found
    }

    /// Global package-manager directories, probed on first use.
    pub fn global_dirs(&self, probe: impl FnOnce() -> Vec<PathBuf>) -> Vec<PathBuf> {
        let mut slot = self
            .global_dirs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.get_or_insert_with(probe).clone()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn clear(&self) {
        self.modules.clear();
        *self
            .global_dirs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

/// Probes `node_modules/.bin` under each root, then the global
/// package-manager bin directories.
#[derive(Debug, Clone)]
pub struct NodeModulesResolver {
    cache: Arc<ResolutionCache>,
    global_dirs: Option<Vec<PathBuf>>,
}

impl NodeModulesResolver {
    pub fn new(cache: Arc<ResolutionCache>) -> Self {
        Self {
            cache,
            global_dirs: None,
        }
    }

    /// Uses fixed global directories instead of asking the package managers.
    pub fn with_global_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.global_dirs = Some(dirs);
        self
    }

    fn globals(&self) -> Vec<PathBuf> {
        match &self.global_dirs {
            Some(dirs) => dirs.clone(),
            None => self.cache.global_dirs(discover_global_dirs),
        }
    }
}

impl ModuleResolver for NodeModulesResolver {
    fn resolve(&self, name: &str, roots: &[PathBuf]) -> Option<PathBuf> {
        let cache_key = format!(
            "{name}@{}",
            roots
                .iter()
                .map(|r| r.to_string_lossy())
                .collect::<Vec<_>>()
                .join(":")
        );
        self.cache.get_or_insert_with(&cache_key, || {
            let local = roots
                .iter()
                .map(|root| root.join("node_modules").join(".bin"));
            local
                .chain(self.globals())
                .find_map(|dir| executable_in(&dir, name))
        })
    }
}

fn executable_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let candidates = if cfg!(windows) {
        vec![format!("{name}.cmd"), format!("{name}.exe"), name.to_string()]
    } else {
        vec![name.to_string()]
    };
    candidates
        .iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| path.is_file())
}

/// Asks npm and yarn where globally installed executables live.
fn discover_global_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(prefix) = command_output("npm", &["prefix", "-g"]) {
        let prefix = PathBuf::from(prefix);
        if cfg!(windows) {
            dirs.push(prefix);
        } else {
            dirs.push(prefix.join("bin"));
        }
    }
    if let Some(bin) = command_output("yarn", &["global", "bin"]) {
        dirs.push(PathBuf::from(bin));
    }
    dirs
}

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Runs a command-line linter that reads the document from stdin and
/// prints a JSON report.
pub struct CommandLinter {
    name: String,
    resolver: Box<dyn ModuleResolver + Send + Sync>,
}

impl CommandLinter {
    pub fn new(
        name: impl Into<String>,
        resolver: impl ModuleResolver + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            resolver: Box::new(resolver),
        }
    }

    fn locate(&self, cwd: &Path) -> Result<PathBuf> {
        self.resolver
            .resolve(&self.name, &[cwd.to_path_buf()])
            .ok_or_else(|| LintError::ModuleNotFound {
                name: self.name.clone(),
            })
    }
}

impl LintEngine for CommandLinter {
    fn lint_text(&self, text: &str, file_name: &str, options: &LintOptions) -> Result<LintReport> {
        let program = self.locate(&options.cwd)?;

        let mut command = Command::new(&program);
        command
            .arg("--stdin")
            .arg("--stdin-filename")
            .arg(file_name)
            .arg("--format")
            .arg("json");
        if let Some(config) = &options.config_file {
            command.arg("--config").arg(config);
        }
        if !options.cwd.as_os_str().is_empty() {
            command.current_dir(&options.cwd);
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        let output = child.wait_with_output()?;

        // Exit status 1 only means problems were found.
        let code = output.status.code();
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !matches!(code, Some(0) | Some(1)) || stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LintError::Engine(format!(
                "{} exited with {:?}: {}",
                program.display(),
                code,
                stderr.trim()
            )));
        }
        LintReport::from_json(&stdout)
    }
}

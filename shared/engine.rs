//! # The Engine Contract
//!
//! The statistical work happens in an external R process. This module owns the
//! narrow protocol between the two sides:
//!
//! 1. **Prepare:** the caller writes its inputs into a fresh [`Workspace`], and an
//!    [`Invocation`] (interpreter, script, `--temp_dir=`, optional `--rs=`) is
//!    built for it.
//! 2. **Invoke:** a [`ScriptRunner`] executes the invocation and reports the exit
//!    code together with the captured output.
//! 3. **Collect:** the caller reads the engine's result files back out of the
//!    workspace.
//!
//! The runner is a trait so the orchestration (validation, serialization, error
//! mapping, cleanup) can be exercised without an R installation. Calls are
//! synchronous and never retried.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::BridgeError;
use crate::shared::files::FileError;
use crate::shared::workspace::Workspace;

pub const DEFAULT_INTERPRETER: &str = "Rscript";

/// The R scripts shipped inside the library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineScript {
    Impute,
    Prune,
}

impl EngineScript {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Impute => "impute_by_mice.r",
            Self::Prune => "estimate_adj_matrix_for_stacked_imputed_datasets.r",
        }
    }

    fn bundled_source(self) -> &'static str {
        match self {
            Self::Impute => include_str!("../scripts/impute_by_mice.r"),
            Self::Prune => {
                include_str!("../scripts/estimate_adj_matrix_for_stacked_imputed_datasets.r")
            }
        }
    }
}

impl fmt::Display for EngineScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Where and how the engine runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interpreter executable, resolved through `PATH` when not absolute.
    pub interpreter: PathBuf,
    /// Directory holding the engine scripts. When `None`, the scripts bundled
    /// into this library are written into each call's workspace.
    pub script_dir: Option<PathBuf>,
    /// Parent directory for per-call workspaces. Defaults to the system temp dir.
    pub workspace_root: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
            script_dir: None,
            workspace_root: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write engine config file: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse TOML engine config: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize engine config to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Builds the command line for `script` against `workspace`.
    ///
    /// With no `script_dir`, the bundled script is materialized into the
    /// workspace first, so the call never depends on files outside it.
    pub fn invocation(
        &self,
        script: EngineScript,
        workspace: &Workspace,
        seed: Option<i64>,
    ) -> io::Result<Invocation> {
        let script_path = match &self.script_dir {
            Some(dir) => dir.join(script.file_name()),
            None => {
                let path = workspace.file(script.file_name());
                fs::write(&path, script.bundled_source())?;
                path
            }
        };

        let mut args = vec![format!("--temp_dir={}", workspace.path().display())];
        if let Some(seed) = seed {
            args.push(format!("--rs={seed}"));
        }

        Ok(Invocation {
            program: self.interpreter.clone(),
            script: script_path,
            args,
        })
    }
}

/// One fully resolved engine command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub script: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    /// Value of a `--name=value` flag, if present.
    pub fn flag(&self, name: &str) -> Option<&str> {
        let prefix = format!("--{name}=");
        self.args.iter().find_map(|arg| arg.strip_prefix(&prefix))
    }

    pub fn temp_dir(&self) -> Option<&Path> {
        self.flag("temp_dir").map(Path::new)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program.display(), self.script.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit status and captured output of one engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes an engine invocation to completion.
pub trait ScriptRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<RunOutput>;
}

impl<F> ScriptRunner for F
where
    F: Fn(&Invocation) -> io::Result<RunOutput>,
{
    fn run(&self, invocation: &Invocation) -> io::Result<RunOutput> {
        self(invocation)
    }
}

/// Runs the engine as a foreground child process with stdout and stderr captured.
///
/// There is no timeout: a hung engine blocks the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubprocessRunner;

impl ScriptRunner for SubprocessRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<RunOutput> {
        let output = Command::new(&invocation.program)
            .arg(&invocation.script)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()?;
        Ok(RunOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runs the invocation and maps the outcome onto the caller-facing error taxonomy.
pub fn invoke(
    runner: &dyn ScriptRunner,
    invocation: &Invocation,
) -> Result<RunOutput, BridgeError> {
    info!("Running engine: {invocation}");
    let output = match runner.run(invocation) {
        Ok(output) => output,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            error!("Engine interpreter not found: {}", invocation.program.display());
            return Err(BridgeError::EngineNotFound {
                interpreter: invocation.program.display().to_string(),
            });
        }
        Err(err) => {
            return Err(BridgeError::Runtime(format!(
                "Failed to start '{invocation}': {err}"
            )));
        }
    };

    if !output.is_success() {
        error!("Engine stdout:\n{}", output.stdout);
        error!("Engine stderr:\n{}", output.stderr);
        let status = output
            .code
            .map_or_else(|| "a signal".to_string(), |code| format!("status {code}"));
        return Err(BridgeError::Runtime(format!(
            "{} exited with {status}: {}",
            invocation.script.display(),
            output.stderr.trim()
        )));
    }

    debug!("Engine finished successfully");
    Ok(output)
}

/// Runs one engine call inside its own workspace.
///
/// `write_inputs` serializes the validated inputs, the engine runs, and
/// `collect_outputs` parses its result files. The workspace is removed on every
/// path out of this function, including errors from any phase.
pub fn execute<T>(
    config: &EngineConfig,
    runner: &dyn ScriptRunner,
    script: EngineScript,
    seed: Option<i64>,
    write_inputs: impl FnOnce(&Workspace) -> Result<(), FileError>,
    collect_outputs: impl FnOnce(&Workspace) -> Result<T, FileError>,
) -> Result<T, BridgeError> {
    let workspace = Workspace::create(config.workspace_root.as_deref()).map_err(|e| {
        BridgeError::Runtime(format!("Failed to create a temporary workspace: {e}"))
    })?;

    let outcome = (|| -> Result<T, BridgeError> {
        write_inputs(&workspace)?;
        let invocation = config.invocation(script, &workspace, seed)?;
        invoke(runner, &invocation)?;
        Ok(collect_outputs(&workspace)?)
    })();

    // A removal failure is logged by `close`; it never masks the call's outcome.
    let _ = workspace.close();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn invocation_uses_bundled_script_and_flags() {
        let workspace = Workspace::create(None).unwrap();
        let config = EngineConfig::default();

        let invocation = config
            .invocation(EngineScript::Prune, &workspace, Some(7))
            .unwrap();

        assert_eq!(invocation.program, PathBuf::from("Rscript"));
        assert_eq!(
            invocation.script,
            workspace.file("estimate_adj_matrix_for_stacked_imputed_datasets.r")
        );
        let script = fs::read_to_string(&invocation.script).unwrap();
        assert!(script.contains("glmnet"));
        assert_eq!(invocation.temp_dir(), Some(workspace.path()));
        assert_eq!(invocation.flag("rs"), Some("7"));
        assert_eq!(invocation.args.len(), 2);
    }

    #[test]
    fn invocation_without_seed_has_only_the_workspace_flag() {
        let workspace = Workspace::create(None).unwrap();
        let scripts = tempdir().unwrap();
        let config = EngineConfig {
            script_dir: Some(scripts.path().to_path_buf()),
            ..EngineConfig::default()
        };

        let invocation = config
            .invocation(EngineScript::Impute, &workspace, None)
            .unwrap();

        assert_eq!(invocation.script, scripts.path().join("impute_by_mice.r"));
        assert!(!workspace.file("impute_by_mice.r").exists());
        assert_eq!(invocation.flag("rs"), None);
        assert_eq!(invocation.args.len(), 1);
        assert!(invocation.to_string().starts_with("Rscript "));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        let config = EngineConfig {
            interpreter: PathBuf::from("/opt/R/bin/Rscript"),
            script_dir: Some(PathBuf::from("/srv/engine")),
            workspace_root: None,
        };

        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(&path, "workspace_root = \"/var/tmp\"\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.interpreter, PathBuf::from(DEFAULT_INTERPRETER));
        assert_eq!(config.workspace_root, Some(PathBuf::from("/var/tmp")));
        assert!(matches!(
            EngineConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn missing_interpreter_is_reported_distinctly() {
        init_logging();
        let invocation = Invocation {
            program: PathBuf::from("pruning-missing-data-no-such-interpreter"),
            script: PathBuf::from("impute_by_mice.r"),
            args: vec!["--temp_dir=/tmp".into()],
        };

        match invoke(&SubprocessRunner, &invocation).unwrap_err() {
            BridgeError::EngineNotFound { interpreter } => {
                assert_eq!(interpreter, "pruning-missing-data-no-such-interpreter")
            }
            other => panic!("expected EngineNotFound, got {other:?}"),
        }
    }

    #[test]
    fn non_zero_exit_surfaces_engine_stderr() {
        init_logging();
        let runner = |_: &Invocation| -> io::Result<RunOutput> {
            Ok(RunOutput {
                code: Some(1),
                stdout: "partial progress".into(),
                stderr: "Error in mice(): too many missing values\n".into(),
            })
        };
        let invocation = Invocation {
            program: PathBuf::from("Rscript"),
            script: PathBuf::from("impute_by_mice.r"),
            args: Vec::new(),
        };

        match invoke(&runner, &invocation).unwrap_err() {
            BridgeError::Runtime(message) => {
                assert!(message.contains("status 1"), "{message}");
                assert!(message.contains("too many missing values"), "{message}");
            }
            other => panic!("expected Runtime, got {other:?}"),
        }
    }

    #[test]
    fn other_spawn_failures_are_runtime_errors() {
        let runner = |_: &Invocation| -> io::Result<RunOutput> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "not executable"))
        };
        let invocation = Invocation {
            program: PathBuf::from("Rscript"),
            script: PathBuf::from("impute_by_mice.r"),
            args: Vec::new(),
        };
        assert!(matches!(
            invoke(&runner, &invocation).unwrap_err(),
            BridgeError::Runtime(_)
        ));
    }

    #[test]
    fn execute_cleans_up_on_success_and_on_every_failure() {
        init_logging();
        let root = tempdir().unwrap();
        let config = EngineConfig {
            workspace_root: Some(root.path().to_path_buf()),
            ..EngineConfig::default()
        };
        let assert_clean = || assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);

        let seen = RefCell::new(None);
        let ok_runner = |invocation: &Invocation| -> io::Result<RunOutput> {
            let dir = invocation.temp_dir().unwrap();
            *seen.borrow_mut() = Some(dir.to_path_buf());
            fs::write(dir.join("out.csv"), "V1\n42\n")?;
            Ok(RunOutput::success())
        };
        let value = execute(
            &config,
            &ok_runner,
            EngineScript::Impute,
            None,
            |ws| crate::shared::files::write_scalar(&ws.file("in.csv"), 1),
            |ws| crate::shared::files::read_matrix(&ws.file("out.csv")),
        )
        .unwrap();
        assert_eq!(value[[0, 0]], 42.0);
        assert!(!seen.borrow().as_ref().unwrap().exists());
        assert_clean();

        // The engine fails.
        let failing = |_: &Invocation| -> io::Result<RunOutput> {
            Ok(RunOutput {
                code: Some(2),
                ..RunOutput::default()
            })
        };
        let err = execute(
            &config,
            &failing,
            EngineScript::Impute,
            Some(1),
            |_| Ok(()),
            |ws| crate::shared::files::read_matrix(&ws.file("out.csv")),
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::Runtime(_)));
        assert_clean();

        // The engine succeeds but never writes its result.
        let silent = |_: &Invocation| -> io::Result<RunOutput> { Ok(RunOutput::success()) };
        let err = execute(
            &config,
            &silent,
            EngineScript::Prune,
            None,
            |_| Ok(()),
            |ws| crate::shared::files::read_matrix(&ws.file("result_adj_mat.csv")),
        )
        .unwrap_err();
        match err {
            BridgeError::Runtime(message) => assert!(message.contains("result_adj_mat.csv")),
            other => panic!("expected Runtime, got {other:?}"),
        }
        assert_clean();

        // Serialization fails before the engine ever runs.
        let never = |_: &Invocation| -> io::Result<RunOutput> {
            panic!("engine must not run when serialization fails")
        };
        let err = execute(
            &config,
            &never,
            EngineScript::Prune,
            None,
            |ws| crate::shared::files::write_scalar(&ws.file("missing_dir/x.csv"), 1),
            |_| Ok(()),
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::Runtime(_)));
        assert_clean();
    }
}

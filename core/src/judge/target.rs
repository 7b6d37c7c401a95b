use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::process::Command;

use crate::cmdline::{Bindings, CommandTemplate};
use crate::config::CompileConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum CompileOutcome {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Failed to spawn '{shell} -c {command}': {source}")]
    Spawn {
        shell: String,
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot resolve artifact path: {0}")]
    ArtifactPath(#[source] fsutil::Error),

    #[error("Compile error: exitcode={0}")]
    ExitCode(i32),

    #[error("Failed to compile: process terminated by signal")]
    Signaled,
}

/// A runnable program produced by a successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    /// `path` must be absolute, so that spawning it never goes through `$PATH` lookup.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One program under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    source: PathBuf,
    artifact: PathBuf,
    outcome: CompileOutcome,
}

impl Target {
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact
    }

    pub fn outcome(&self) -> CompileOutcome {
        self.outcome
    }

    /// Available only after a successful compile.
    pub fn artifact(&self) -> Option<Artifact> {
        match self.outcome {
            CompileOutcome::Success => Some(Artifact::new(&self.artifact)),
            _ => None,
        }
    }
}

/// Turns a source file into a runnable artifact via `<shell> -c <command>`.
#[derive(Debug, Clone)]
pub struct Compiler {
    shell: PathBuf,
    command: CommandTemplate,
    artifact: CommandTemplate,
}

impl Compiler {
    pub fn new(cfg: &CompileConfig) -> Self {
        Self {
            shell: cfg.shell.to_owned(),
            command: cfg.command.to_owned(),
            artifact: cfg.artifact.to_owned(),
        }
    }

    /// Derive the (deterministic) artifact path for `source`. Nothing is compiled yet.
    pub fn target(&self, source: impl Into<PathBuf>) -> Target {
        let source = source.into();
        let artifact = self.artifact.render(&Bindings {
            source: &source,
            artifact: None,
        });
        Target {
            source,
            artifact: artifact.into(),
            outcome: CompileOutcome::Pending,
        }
    }

    pub fn command_line(&self, target: &Target) -> String {
        self.command.render(&Bindings {
            source: &target.source,
            artifact: Some(&target.artifact),
        })
    }

    /// Compile `target` and record the outcome on it. Blocks (asynchronously) until the
    /// compiler exits; the outcome is never left `Pending`.
    pub async fn compile(&self, target: &mut Target) -> Result<Artifact, CompileError> {
        let res = self.try_compile(target).await;
        target.outcome = match res {
            Ok(_) => CompileOutcome::Success,
            Err(_) => CompileOutcome::Failed,
        };
        res
    }

    async fn try_compile(&self, target: &mut Target) -> Result<Artifact, CompileError> {
        target.artifact = fsutil::absolutize(&target.artifact).map_err(CompileError::ArtifactPath)?;
        let cmd = self.command_line(target);
        log::info!("Compiling {}", target.source.to_string_lossy());
        log::info!("{}", cmd);

        let status = Command::new(&self.shell)
            .args(["-c", &cmd])
            .status()
            .await
            .map_err(|source| CompileError::Spawn {
                shell: self.shell.to_string_lossy().into_owned(),
                command: cmd.clone(),
                source,
            })?;

        match status.code() {
            Some(0) => Ok(Artifact::new(&target.artifact)),
            Some(code) => Err(CompileError::ExitCode(code)),
            None => Err(CompileError::Signaled),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::judge::fixture::*;

    #[test]
    fn artifact_path_is_derived_from_source() {
        let compiler = Compiler::new(&CompileConfig::default());
        let t = compiler.target("sol/main.c");
        assert_eq!(t.artifact_path(), Path::new("sol/main.c.out"));
        assert_eq!(t.outcome(), CompileOutcome::Pending);
        assert_eq!(t.artifact(), None);
        assert_eq!(compiler.command_line(&t), "cc sol/main.c -o sol/main.c.out");
    }

    #[tokio::test]
    async fn compile_ok() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_file(dir.path(), "square.sh", SQUARE);
        let compiler = Compiler::new(&script_compile_config());

        let mut t = compiler.target(&src);
        let artifact = compiler.compile(&mut t).await.unwrap();
        assert_eq!(t.outcome(), CompileOutcome::Success);
        assert!(artifact.path().is_absolute());
        assert!(artifact.path().is_file());
        assert_eq!(t.artifact(), Some(artifact));
    }

    #[tokio::test]
    async fn compile_error_on_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_file(dir.path(), "broken.c", SYNTAX_ERROR);
        let compiler = Compiler::new(&script_compile_config());

        let mut t = compiler.target(&src);
        let err = compiler.compile(&mut t).await.unwrap_err();
        assert!(matches!(err, CompileError::ExitCode(_)), "{:?}", err);
        assert_eq!(t.outcome(), CompileOutcome::Failed);
        assert_eq!(t.artifact(), None);
    }

    #[tokio::test]
    async fn compile_error_on_missing_shell() {
        let cfg = CompileConfig {
            shell: "/no/such/shell".into(),
            ..script_compile_config()
        };
        let compiler = Compiler::new(&cfg);
        let mut t = compiler.target("whatever.sh");
        let err = compiler.compile(&mut t).await.unwrap_err();
        assert!(matches!(err, CompileError::Spawn { .. }), "{:?}", err);
        assert_eq!(t.outcome(), CompileOutcome::Failed);
    }
}

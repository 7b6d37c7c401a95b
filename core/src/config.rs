use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::{ensure, Context as _};
use serde::{Deserialize, Serialize};

use crate::cmdline::{CommandTemplate, Var};
use crate::judge::{CompareMode, DeadlinePolicy};
use crate::serdable::GlobPattern;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub compile: CompileConfig,
    pub run: RunConfig,
    pub cases: CasesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileConfig {
    pub shell: PathBuf,
    pub command: CommandTemplate,
    pub artifact: CommandTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub time_limit_ms: u64,
    pub deadline: DeadlinePolicy,
    pub compare: CompareMode,
    pub check_exit_status: bool,
    pub output_dir: PathBuf,
    pub output_prefix: String,
    pub stderr_capture_max_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CasesConfig {
    pub exclude: Vec<GlobPattern>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            shell: "/bin/sh".into(),
            command: CommandTemplate::parse("cc #{source} -o #{artifact}")
                .expect("default compile command is a valid template"),
            artifact: CommandTemplate::parse("#{source}.out")
                .expect("default artifact path is a valid template"),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 10_000,
            deadline: DeadlinePolicy::default(),
            compare: CompareMode::default(),
            check_exit_status: false,
            output_dir: ".".into(),
            output_prefix: "output".to_owned(),
            stderr_capture_max_bytes: 4096,
        }
    }
}

impl Default for CasesConfig {
    fn default() -> Self {
        Self {
            exclude: vec![GlobPattern::parse(".DS_Store").expect("literal glob pattern")],
        }
    }
}

impl RunConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }
}

impl Config {
    pub const FILENAME: &str = "bjudge.toml";

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let filepath = filepath.into();
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a config file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file in ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }

    /// Explicit file if given, else the nearest `bjudge.toml`, else defaults.
    pub fn load(explicit: Option<&Path>, cur_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let found = match explicit {
            Some(path) => Some(path.to_owned()),
            None => Self::find_file_in_ancestors(cur_dir),
        };
        match found {
            Some(path) => {
                log::info!("Using config {}", path.to_string_lossy());
                Self::from_toml_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.run.time_limit_ms > 0, "Invalid time limit: must be positive");
        ensure!(
            !self.compile.artifact.uses(Var::Artifact),
            "`compile.artifact` cannot refer to #{{artifact}} itself"
        );
        ensure!(
            !self.run.output_prefix.contains(std::path::MAIN_SEPARATOR),
            "`run.output_prefix` must not contain a path separator"
        );
        Ok(())
    }
}

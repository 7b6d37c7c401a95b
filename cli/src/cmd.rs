use std::path::PathBuf;
use std::time::Duration;

use bjudge_core::{
    action,
    judge::{CompareMode, DeadlinePolicy},
};

use crate::config;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory of input cases
    #[arg(short = 'i', long, value_name = "DIR")]
    pub input_dir: PathBuf,

    /// Directory of expected answers (same filenames as the inputs)
    #[arg(short = 'a', long, value_name = "DIR")]
    pub answer_dir: PathBuf,

    /// Time limit of each case, in `--time-unit`
    #[arg(short = 't', long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub time_limit: Option<u64>,

    #[arg(long, value_enum, default_value_t = ArgTimeUnit::S)]
    pub time_unit: ArgTimeUnit,

    /// Config file (default: nearest bjudge.toml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Compile command template, e.g. 'gcc -O2 #{source} -o #{artifact}'
    #[arg(long, value_name = "CMD")]
    pub compile: Option<String>,

    /// Where captured outputs are written
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub deadline: Option<ArgDeadline>,

    #[arg(long, value_enum)]
    pub compare: Option<ArgCompare>,

    /// Judge a non-zero exit (or a signal) with output as Runtime Error
    #[arg(long)]
    pub check_exit_status: bool,

    /// Also write the results as JSON
    #[arg(long, value_name = "FILE")]
    pub report_json: Option<PathBuf>,

    /// Source files of the programs under test
    #[arg(required = true, value_name = "TARGET")]
    pub targets: Vec<PathBuf>,
}

pub type CmdResult = anyhow::Result<()>;

impl Args {
    pub async fn exec(&self) -> CmdResult {
        let cfg = config::from_file_and_args(self)?;
        let grading =
            action::do_grade(&self.targets, &self.input_dir, &self.answer_dir, &cfg).await?;
        if let Some(path) = &self.report_json {
            grading.write_json(path)?;
        }
        Ok(())
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit.map(|n| self.time_unit.duration(n))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
#[clap(rename_all = "lower")]
pub enum ArgTimeUnit {
    S,
    Ms,
}

impl ArgTimeUnit {
    pub fn duration(&self, n: u64) -> Duration {
        use ArgTimeUnit::*;
        match self {
            S => Duration::from_secs(n),
            Ms => Duration::from_millis(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum ArgDeadline {
    Total,
    FirstOutput,
}

impl From<ArgDeadline> for DeadlinePolicy {
    fn from(value: ArgDeadline) -> Self {
        use ArgDeadline::*;
        match value {
            Total => DeadlinePolicy::Total,
            FirstOutput => DeadlinePolicy::FirstOutput,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
#[clap(rename_all = "lower")]
pub enum ArgCompare {
    Prefix,
    Exact,
}

impl From<ArgCompare> for CompareMode {
    fn from(value: ArgCompare) -> Self {
        use ArgCompare::*;
        match value {
            Prefix => CompareMode::Prefix,
            Exact => CompareMode::Exact,
        }
    }
}

#[cfg(test)]
mod test {
    use clap::{error::ErrorKind, Parser};

    use super::*;

    #[test]
    fn parse_minimal() {
        let args = Args::try_parse_from(["bjudge", "-i", "in", "-a", "ans", "main.c"]).unwrap();
        assert_eq!(args.input_dir, PathBuf::from("in"));
        assert_eq!(args.answer_dir, PathBuf::from("ans"));
        assert_eq!(args.targets, [PathBuf::from("main.c")]);
        assert_eq!(args.time_limit(), None);
    }

    #[test]
    fn parse_full() {
        let args = Args::try_parse_from([
            "bjudge",
            "-i",
            "in",
            "-a",
            "ans",
            "-t",
            "1500",
            "--time-unit",
            "ms",
            "--deadline",
            "first-output",
            "--compare",
            "exact",
            "--check-exit-status",
            "a.c",
            "b.c",
        ])
        .unwrap();
        assert_eq!(args.time_limit(), Some(Duration::from_millis(1500)));
        assert_eq!(args.deadline, Some(ArgDeadline::FirstOutput));
        assert_eq!(args.compare, Some(ArgCompare::Exact));
        assert!(args.check_exit_status);
        assert_eq!(args.targets.len(), 2);
    }

    #[test]
    fn time_limit_defaults_to_seconds() {
        let args =
            Args::try_parse_from(["bjudge", "-i", "in", "-a", "ans", "-t", "2", "x.c"]).unwrap();
        assert_eq!(args.time_limit(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn usage_errors() {
        let missing_answer = Args::try_parse_from(["bjudge", "-i", "in", "main.c"]).unwrap_err();
        assert_eq!(missing_answer.kind(), ErrorKind::MissingRequiredArgument);

        let no_target = Args::try_parse_from(["bjudge", "-i", "in", "-a", "ans"]).unwrap_err();
        assert_eq!(no_target.kind(), ErrorKind::MissingRequiredArgument);

        let zero_limit =
            Args::try_parse_from(["bjudge", "-i", "in", "-a", "ans", "-t", "0", "x.c"]).unwrap_err();
        assert_eq!(zero_limit.kind(), ErrorKind::ValueValidation);
    }
}

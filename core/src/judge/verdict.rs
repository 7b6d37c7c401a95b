use serde::{Deserialize, Serialize};

use super::{
    case::Case,
    compare::{compare_files, CompareMode, Comparison},
    runner::{RunResult, Termination},
};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum Verdict {
    Correct,
    #[strum(serialize = "Wrong Answer")]
    WrongAnswer,
    Timeout,
    #[strum(serialize = "Runtime Error")]
    RuntimeError,
    #[strum(serialize = "Empty Output")]
    EmptyOutput,
    #[strum(serialize = "Compile Error")]
    CompileError,
}

impl Verdict {
    pub const fn abbr(&self) -> &'static str {
        use Verdict::*;
        match self {
            Correct => "AC",
            WrongAnswer => "WA",
            Timeout => "TLE",
            RuntimeError => "RE",
            EmptyOutput => "EO",
            CompileError => "CE",
        }
    }

    pub const fn is_correct(&self) -> bool {
        matches!(self, Verdict::Correct)
    }
}

/// What is known about a case when it is classified.
#[derive(Debug, Clone, Copy)]
pub enum Evidence<'a> {
    /// The target never produced an artifact; the case was not run.
    CompileFailed,
    Ran(&'a RunResult),
}

/// Turns runner evidence (plus a comparison, only when needed) into exactly one verdict.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    pub compare: CompareMode,
    pub check_exit_status: bool,
}

impl Classifier {
    pub fn new(compare: CompareMode, check_exit_status: bool) -> Self {
        Self {
            compare,
            check_exit_status,
        }
    }

    /// Verdict for `case`. The captured output file is compared against the answer only
    /// when no earlier rule already decided the verdict.
    pub fn classify(&self, case: &Case, evidence: Evidence<'_>) -> fsutil::Result<Verdict> {
        self.classify_with(evidence, || {
            compare_files(case.output_path(), case.answer_path(), self.compare)
        })
    }

    pub fn classify_with<F>(&self, evidence: Evidence<'_>, compare: F) -> fsutil::Result<Verdict>
    where
        F: FnOnce() -> fsutil::Result<Comparison>,
    {
        let run = match evidence {
            Evidence::CompileFailed => return Ok(Verdict::CompileError),
            Evidence::Ran(run) => run,
        };
        match run.termination {
            Termination::TimedOut => return Ok(Verdict::Timeout),
            Termination::LaunchFailed { .. } => return Ok(Verdict::RuntimeError),
            Termination::Completed => {}
        }
        if run.stdout.is_empty() {
            return Ok(Verdict::EmptyOutput);
        }
        if self.check_exit_status && run.exited_abnormally() {
            return Ok(Verdict::RuntimeError);
        }
        Ok(match compare()? {
            Comparison::Match => Verdict::Correct,
            Comparison::Mismatch => Verdict::WrongAnswer,
        })
    }
}

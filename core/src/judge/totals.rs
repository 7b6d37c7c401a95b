use std::{fmt, time::Duration};

use serde::Serialize;

use super::verdict::Verdict;

/// Per-verdict counts plus the cumulative running time of correct cases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub correct: usize,
    pub wrong_answer: usize,
    pub timeout: usize,
    pub runtime_error: usize,
    pub empty_output: usize,
    pub compile_error: usize,
    pub correct_elapsed_ms: u64,
}

impl RunTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, verdict: Verdict, elapsed: Duration) {
        *self.counter_mut(verdict) += 1;
        if verdict.is_correct() {
            self.correct_elapsed_ms += elapsed.as_millis() as u64;
        }
    }

    pub fn merge(&mut self, other: &RunTotals) {
        self.correct += other.correct;
        self.wrong_answer += other.wrong_answer;
        self.timeout += other.timeout;
        self.runtime_error += other.runtime_error;
        self.empty_output += other.empty_output;
        self.compile_error += other.compile_error;
        self.correct_elapsed_ms += other.correct_elapsed_ms;
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        use Verdict::*;
        match verdict {
            Correct => self.correct,
            WrongAnswer => self.wrong_answer,
            Timeout => self.timeout,
            RuntimeError => self.runtime_error,
            EmptyOutput => self.empty_output,
            CompileError => self.compile_error,
        }
    }

    /// Number of classified cases.
    pub fn total(&self) -> usize {
        self.correct
            + self.wrong_answer
            + self.timeout
            + self.runtime_error
            + self.empty_output
            + self.compile_error
    }

    pub fn all_correct(&self) -> bool {
        self.correct == self.total()
    }

    fn counter_mut(&mut self, verdict: Verdict) -> &mut usize {
        use Verdict::*;
        match verdict {
            Correct => &mut self.correct,
            WrongAnswer => &mut self.wrong_answer,
            Timeout => &mut self.timeout,
            RuntimeError => &mut self.runtime_error,
            EmptyOutput => &mut self.empty_output,
            CompileError => &mut self.compile_error,
        }
    }
}

/// The end-of-run report.
impl fmt::Display for RunTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compile Error: {}", self.compile_error)?;
        writeln!(f, "Timeout: {}", self.timeout)?;
        writeln!(f, "Runtime Error: {}", self.runtime_error)?;
        writeln!(f, "Empty Output: {}", self.empty_output)?;
        writeln!(
            f,
            "Wrong Answer: {}/{}",
            self.wrong_answer,
            self.correct + self.wrong_answer
        )?;
        write!(
            f,
            "Correct: {} ({} milliseconds)",
            self.correct, self.correct_elapsed_ms
        )
    }
}

#[cfg(test)]
mod test {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn record_counts_and_times_correct_only() {
        let mut t = RunTotals::new();
        t.record(Verdict::Correct, Duration::from_millis(12));
        t.record(Verdict::Correct, Duration::from_millis(30));
        t.record(Verdict::WrongAnswer, Duration::from_millis(500));
        t.record(Verdict::Timeout, Duration::from_millis(1000));

        assert_eq!(t.correct, 2);
        assert_eq!(t.wrong_answer, 1);
        assert_eq!(t.timeout, 1);
        assert_eq!(t.correct_elapsed_ms, 42);
        assert_eq!(t.total(), 4);
        assert!(!t.all_correct());
    }

    #[test]
    fn every_verdict_has_a_counter() {
        let mut t = RunTotals::new();
        for v in Verdict::iter() {
            t.record(v, Duration::ZERO);
            assert_eq!(t.count(v), 1, "{}", v);
        }
        assert_eq!(t.total(), Verdict::iter().count());
    }

    #[test]
    fn merge_adds_up() {
        let mut a = RunTotals::new();
        a.record(Verdict::Correct, Duration::from_millis(7));
        let mut b = RunTotals::new();
        b.record(Verdict::CompileError, Duration::ZERO);
        b.record(Verdict::Correct, Duration::from_millis(3));

        a.merge(&b);
        assert_eq!(a.correct, 2);
        assert_eq!(a.compile_error, 1);
        assert_eq!(a.correct_elapsed_ms, 10);
    }

    #[test]
    fn report_format() {
        let mut t = RunTotals::new();
        t.record(Verdict::Correct, Duration::from_millis(20));
        t.record(Verdict::WrongAnswer, Duration::from_millis(1));
        t.record(Verdict::CompileError, Duration::ZERO);

        assert_eq!(
            t.to_string(),
            "Compile Error: 1\n\
             Timeout: 0\n\
             Runtime Error: 0\n\
             Empty Output: 0\n\
             Wrong Answer: 1/2\n\
             Correct: 1 (20 milliseconds)"
        );
    }
}

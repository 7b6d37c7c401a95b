pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}
use std::path::{Path, PathBuf};
use std::time::Duration;

use error::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::config::Config;
use crate::judge::{
    BoundedRunner, Case, CaseFilter, Classifier, Compiler, Evidence, Execute, OutputLayout,
    RunTotals, Verdict,
};
use crate::style;

/// Verdict of one case of one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseRecord {
    pub target: PathBuf,
    pub case: String,
    pub verdict: Verdict,
    pub elapsed_ms: u64,
}

/// Everything a grading run produced, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Grading {
    pub totals: RunTotals,
    pub cases: Vec<CaseRecord>,
}

impl Grading {
    fn record(&mut self, target: &Path, case: &Case, verdict: Verdict, elapsed: Duration) {
        self.totals.record(verdict, elapsed);
        self.cases.push(CaseRecord {
            target: target.to_owned(),
            case: case.name().to_owned(),
            verdict,
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }

    pub fn write_json(&self, filepath: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Cannot serialize report")?;
        fsutil::write_with_mkdir(&filepath, json)?;
        Ok(())
    }
}

/// Compile each source once, then run, classify and print every case against it.
/// Cases of a target that failed to compile are all `CompileError` and never run.
pub async fn grade<E>(
    sources: &[PathBuf],
    cases: &[Case],
    compiler: &Compiler,
    executor: &E,
    classifier: &Classifier,
) -> Result<Grading>
where
    E: Execute + ?Sized,
{
    let style = ProgressStyle::default_spinner().template("{spinner} {msg}")?;
    let mut grading = Grading::default();

    for source in sources {
        let mut target = compiler.target(source);
        let artifact = match compiler.compile(&mut target).await {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                log::error!("{}: {:#}", source.to_string_lossy(), e);
                None
            }
        };

        for case in cases {
            let label = format!("{}/{}", source.to_string_lossy(), case.name());

            let (verdict, elapsed) = match &artifact {
                None => {
                    let verdict = classifier.classify(case, Evidence::CompileFailed)?;
                    (verdict, Duration::ZERO)
                }
                Some(artifact) => {
                    let spinner = ProgressBar::new_spinner()
                        .with_style(style.clone())
                        .with_message(format!("{} ...", label));
                    spinner.enable_steady_tick(Duration::from_millis(50));
                    let run = executor.execute(artifact, case).await;
                    spinner.finish_and_clear();

                    if !run.stderr.is_empty() {
                        log::debug!(
                            "{} stderr:\n{}",
                            label,
                            String::from_utf8_lossy(&run.stderr)
                        );
                    }
                    let verdict = classifier
                        .classify(case, Evidence::Ran(&run))
                        .with_context(|| format!("Failed to judge {}", label))?;
                    (verdict, run.elapsed)
                }
            };

            style::print_case_line(&label, verdict, elapsed.as_millis() as u64);
            grading.record(source, case, verdict, elapsed);
        }
    }
    Ok(grading)
}

/// Enumerate cases and grade `sources` with components built from `cfg`, then print the
/// report.
pub async fn do_grade(
    sources: &[PathBuf],
    input_dir: impl AsRef<Path>,
    answer_dir: impl AsRef<Path>,
    cfg: &Config,
) -> Result<Grading> {
    ensure!(!sources.is_empty(), "No target source is given");
    cfg.validate()?;

    let layout = OutputLayout {
        dir: cfg.run.output_dir.to_owned(),
        prefix: cfg.run.output_prefix.to_owned(),
    };
    fsutil::mkdir_all(&layout.dir)?;

    let filter = CaseFilter::new(cfg.cases.exclude.iter().cloned());
    let cases = Case::enumerate(&input_dir, &answer_dir, &filter, &layout)
        .context("Failed to find cases")?;
    if cases.is_empty() {
        log::warn!(
            "No cases found in {}",
            input_dir.as_ref().to_string_lossy()
        );
    }

    let compiler = Compiler::new(&cfg.compile);
    let runner = BoundedRunner::new()
        .time_limit(cfg.run.time_limit())
        .deadline(cfg.run.deadline)
        .stderr_capture_max_bytes(cfg.run.stderr_capture_max_bytes);
    let classifier = Classifier::new(cfg.run.compare, cfg.run.check_exit_status);

    log::info!(
        "{} case(s), time limit {}ms ({} deadline)",
        cases.len(),
        cfg.run.time_limit_ms,
        cfg.run.deadline
    );

    let grading = grade(sources, &cases, &compiler, &runner, &classifier).await?;
    style::print_report(&grading.totals);
    Ok(grading)
}

use std::{
    io,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use anyhow::Context as _;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{
    fs::File as TokioFile,
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::{Child, ChildStderr, ChildStdout, Command},
    time::{error::Elapsed, timeout, Instant},
};

use super::{case::Case, target::Artifact};

/// What the time limit bounds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeadlinePolicy {
    /// From spawn until stdout reaches EOF and the process has exited.
    #[default]
    Total,
    /// Only until stdout first becomes readable (data or EOF). The drain that follows
    /// is unbounded. A process that closes stdout without printing is killed at once;
    /// one that printed gets another time limit to exit before it is killed.
    FirstOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Completed,
    TimedOut,
    LaunchFailed { reason: String },
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub termination: Termination,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub elapsed: Duration,
    pub exit_status: Option<ExitStatus>,
    pub pid: Option<u32>,
}

impl RunResult {
    fn timed_out(elapsed: Duration, pid: Option<u32>) -> Self {
        Self {
            termination: Termination::TimedOut,
            stdout: Vec::new(),
            stderr: Vec::new(),
            elapsed,
            exit_status: None,
            pid,
        }
    }

    fn launch_failed(reason: String, elapsed: Duration) -> Self {
        Self {
            termination: Termination::LaunchFailed { reason },
            stdout: Vec::new(),
            stderr: Vec::new(),
            elapsed,
            exit_status: None,
            pid: None,
        }
    }

    pub fn is_empty_output(&self) -> bool {
        self.termination == Termination::Completed && self.stdout.is_empty()
    }

    /// Non-zero exit code or killed by a signal.
    pub fn exited_abnormally(&self) -> bool {
        self.exit_status.map_or(false, |s| !s.success())
    }
}

/// Runs an artifact against one case. The driver only depends on this seam.
#[async_trait]
pub trait Execute {
    async fn execute(&self, artifact: &Artifact, case: &Case) -> RunResult;
}

#[derive(Debug, Clone)]
pub struct BoundedRunner {
    time_limit: Duration,
    deadline: DeadlinePolicy,
    stderr_capture_max_bytes: usize,
}

impl Default for BoundedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundedRunner {
    const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(10);
    const DEFAULT_STDERR_CAPTURE_MAX_BYTES: usize = 4096;
    const CHUNK_SIZE: usize = 4096;
    const STDERR_DRAIN_GRACE: Duration = Duration::from_millis(100);

    pub fn new() -> Self {
        Self {
            time_limit: Self::DEFAULT_TIME_LIMIT,
            deadline: DeadlinePolicy::default(),
            stderr_capture_max_bytes: Self::DEFAULT_STDERR_CAPTURE_MAX_BYTES,
        }
    }

    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn deadline(mut self, policy: DeadlinePolicy) -> Self {
        self.deadline = policy;
        self
    }

    pub fn stderr_capture_max_bytes(mut self, n: usize) -> Self {
        self.stderr_capture_max_bytes = n;
        self
    }

    pub fn get_time_limit(&self) -> Duration {
        self.time_limit
    }

    pub fn get_deadline(&self) -> DeadlinePolicy {
        self.deadline
    }

    /// Run `artifact` with stdin redirected from the case input. Never fails: launch
    /// problems are reported as [`Termination::LaunchFailed`]. No child outlives this call
    /// on the timeout and error paths.
    pub async fn run(&self, artifact: &Artifact, case: &Case) -> RunResult {
        let start_at = Instant::now();
        match self.try_run(artifact, case, start_at).await {
            Ok(res) => res,
            Err(e) => {
                log::warn!("{}: {:#}", case.name(), e);
                RunResult::launch_failed(format!("{:#}", e), start_at.elapsed())
            }
        }
    }

    async fn try_run(
        &self,
        artifact: &Artifact,
        case: &Case,
        start_at: Instant,
    ) -> anyhow::Result<RunResult> {
        let stdin = fsutil::open_file(case.input_path())?;
        let mut sink = OutputSink::create(case.output_path())?;

        let mut child = ChildGuard::spawn(
            Command::new(artifact.path())
                .stdin(Stdio::from(stdin))
                .stdout(Stdio::piped())
                .stderr(Stdio::piped()),
        )
        .with_context(|| format!("Failed to spawn '{}'", artifact.path().to_string_lossy()))?;
        let pid = child.id();

        let mut stdout = child.take_stdout().context("Failed to open stdout")?;
        let mut stderr_task = child
            .take_stderr()
            .map(|r| tokio::spawn(read_capped(r, self.stderr_capture_max_bytes)));

        let waited = self
            .wait_for_output(&mut child, &mut stdout, &mut sink)
            .await;

        let (stdout_buf, exit_status) = match waited {
            Err(_) => {
                child.terminate_and_reap().await;
                if let Some(task) = stderr_task {
                    task.abort();
                }
                sink.discard();
                return Ok(RunResult::timed_out(start_at.elapsed(), pid));
            }
            Ok(Err(e)) => {
                child.terminate_and_reap().await;
                if let Some(task) = stderr_task {
                    task.abort();
                }
                return Err(e).context("Failed to communicate with subprocess");
            }
            Ok(Ok(collected)) => collected,
        };
        let elapsed = start_at.elapsed();

        sink.commit().await?;

        let stderr_buf = match stderr_task.as_mut() {
            None => Vec::new(),
            Some(task) => match timeout(Self::STDERR_DRAIN_GRACE, &mut *task).await {
                Ok(Ok(Ok(buf))) => buf,
                Ok(Ok(Err(e))) => {
                    log::debug!("{}: Failed to read stderr: {:#}", case.name(), e);
                    Vec::new()
                }
                Ok(Err(_)) => Vec::new(),
                Err(_) => {
                    // stderr kept open by a descendant of the child
                    task.abort();
                    Vec::new()
                }
            },
        };

        Ok(RunResult {
            termination: Termination::Completed,
            stdout: stdout_buf,
            stderr: stderr_buf,
            elapsed,
            exit_status: Some(exit_status),
            pid,
        })
    }

    async fn wait_for_output(
        &self,
        child: &mut ChildGuard,
        stdout: &mut ChildStdout,
        sink: &mut OutputSink,
    ) -> Result<io::Result<(Vec<u8>, ExitStatus)>, Elapsed> {
        match self.deadline {
            DeadlinePolicy::Total => {
                timeout(self.time_limit, async {
                    let captured = drain(stdout, sink, Vec::new()).await?;
                    let status = child.wait().await?;
                    Ok::<_, io::Error>((captured, status))
                })
                .await
            }
            DeadlinePolicy::FirstOutput => {
                let mut first = vec![0u8; Self::CHUNK_SIZE];
                let n = match timeout(self.time_limit, stdout.read(&mut first)).await? {
                    Ok(n) => n,
                    Err(e) => return Ok(Err(e)),
                };
                first.truncate(n);
                Ok(self.settle_after_first_output(child, stdout, sink, first).await)
            }
        }
    }

    async fn settle_after_first_output(
        &self,
        child: &mut ChildGuard,
        stdout: &mut ChildStdout,
        sink: &mut OutputSink,
        first: Vec<u8>,
    ) -> io::Result<(Vec<u8>, ExitStatus)> {
        // EOF before a single byte
        if first.is_empty() {
            let status = child.kill_and_wait().await?;
            return Ok((first, status));
        }

        let captured = drain(stdout, sink, first).await?;
        let status = match timeout(self.time_limit, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                log::warn!(
                    "Process (pid={:?}) closed stdout but did not exit; killing it",
                    child.id()
                );
                child.kill_and_wait().await?
            }
        };
        Ok((captured, status))
    }
}

#[async_trait]
impl Execute for BoundedRunner {
    async fn execute(&self, artifact: &Artifact, case: &Case) -> RunResult {
        self.run(artifact, case).await
    }
}

/// Read stdout to EOF (starting with the bytes already in `captured`), mirroring every
/// chunk into `sink`.
async fn drain(
    stdout: &mut ChildStdout,
    sink: &mut OutputSink,
    mut captured: Vec<u8>,
) -> io::Result<Vec<u8>> {
    sink.write_all(&captured).await?;
    let mut buf = [0u8; BoundedRunner::CHUNK_SIZE];
    loop {
        let n = stdout.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n]).await?;
        captured.extend_from_slice(&buf[..n]);
    }
    Ok(captured)
}

/// Keep the first `max` bytes, discard the rest but keep reading so the writer never blocks.
async fn read_capped<R>(mut reader: R, max: usize) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut kept = Vec::new();
    let mut buf = [0u8; BoundedRunner::CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(kept);
        }
        let room = max.saturating_sub(kept.len());
        kept.extend_from_slice(&buf[..n.min(room)]);
    }
}

/// Owned handle of a spawned child. Dropping it kills the process (`kill_on_drop`);
/// [`ChildGuard::terminate_and_reap`] additionally waits for it, leaving no zombie.
#[derive(Debug)]
pub struct ChildGuard {
    child: Child,
}

impl ChildGuard {
    pub fn spawn(cmd: &mut Command) -> io::Result<Self> {
        cmd.kill_on_drop(true).spawn().map(|child| Self { child })
    }

    /// `None` once the child has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// SIGKILL (a no-op if it already exited), then wait for the exit status.
    pub async fn kill_and_wait(&mut self) -> io::Result<ExitStatus> {
        if let Err(e) = self.child.start_kill() {
            log::debug!("Failed to kill process (pid={:?}): {:#}", self.child.id(), e);
        }
        self.child.wait().await
    }

    /// Like [`ChildGuard::kill_and_wait`] but consumes the guard and only logs failures.
    pub async fn terminate_and_reap(mut self) {
        let pid = self.child.id();
        if let Err(e) = self.kill_and_wait().await {
            log::warn!("Failed to reap process (pid={:?}): {:#}", pid, e);
        }
    }
}

/// Captured stdout being written to `<dest>`. Bytes go to a hidden partial file which is
/// renamed over `dest` on [`OutputSink::commit`] and removed otherwise.
#[derive(Debug)]
struct OutputSink {
    dest: PathBuf,
    partial: PathBuf,
    file: Option<TokioFile>,
    committed: bool,
}

impl OutputSink {
    fn create(dest: &Path) -> fsutil::Result<Self> {
        let partial = fsutil::partial_path(dest);
        let file = fsutil::create_file(&partial)?;
        Ok(Self {
            dest: dest.to_owned(),
            partial,
            file: Some(TokioFile::from_std(file)),
            committed: false,
        })
    }

    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => f.write_all(bytes).await,
            None => Ok(()),
        }
    }

    async fn commit(mut self) -> fsutil::Result<()> {
        if let Some(mut f) = self.file.take() {
            f.flush()
                .await
                .map_err(|e| fsutil::Error::SingleIO("Cannot write file", self.partial.clone(), e))?;
        }
        fsutil::rename(&self.partial, &self.dest)?;
        self.committed = true;
        Ok(())
    }

    /// Drop the partial file and any stale output of a previous run.
    fn discard(self) {
        fsutil::remove_file_if_exists(&self.dest)
            .unwrap_or_else(|e| log::warn!("Failed to remove stale output: {:#}", e));
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        drop(self.file.take());
        fsutil::remove_file_if_exists(&self.partial)
            .unwrap_or_else(|e| log::warn!("Failed to remove partial output: {:#}", e));
    }
}

//! Subprocess-backed table extractor.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};

use super::{ExtractorOptions, ExtractorOutput, TableExtractor, NO_EXIT_STATUS};

/// How long to wait for the output pipes to close once the process group
/// was killed.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Runs an external detection tool, one process per call.
///
/// The command line is `program args.. <option flags> <document path>`.
/// The payload is read from stdout and diagnostics from stderr. On unix the
/// tool runs in its own process group. A tool still running when the
/// options' timeout elapses is killed with its group and reported as
/// [`ExtractorOutput::timed_out`]; processes it leaves behind are killed
/// once its output has been read.
#[derive(Debug, Clone)]
pub struct ProcessExtractor {
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    poll_interval: Duration,
}

impl ProcessExtractor {
    /// Create an extractor running the given program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            poll_interval: Duration::from_millis(10),
        }
    }

    /// Add a fixed argument placed before the option flags.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several fixed arguments.
    pub fn with_args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set how often the process is polled for completion.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Build the full argument list for one invocation.
    pub fn command_args(&self, path: &Path, options: &ExtractorOptions) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend(options.to_args());
        args.push(path.to_string_lossy().into_owned());
        args
    }

    fn run(&self, path: &Path, options: &ExtractorOptions) -> io::Result<ExtractorOutput> {
        let mut command = Command::new(&self.program);
        command
            .args(self.command_args(path, options))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &self.env {
            command.env(key, value);
        }
        // Own process group, so helpers the tool forks can be killed with it.
        #[cfg(unix)]
        command.process_group(0);

        log::debug!(
            "ProcessExtractor: spawning {} for {}",
            self.program.display(),
            path.display()
        );
        let started = Instant::now();
        let deadline = started + options.timeout;
        let mut child = command.spawn()?;

        // Drain both pipes concurrently so a chatty tool cannot block on a
        // full pipe while we wait for it to exit.
        let (tx, rx) = crossbeam_channel::bounded(2);
        let mut readers = 0;
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(Stream::Stdout, stdout, tx.clone());
            readers += 1;
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(Stream::Stderr, stderr, tx.clone());
            readers += 1;
        }
        drop(tx);

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    log::warn!(
                        "ProcessExtractor: {} timed out after {:?}, killing",
                        self.program.display(),
                        options.timeout
                    );
                    terminate(&mut child);
                    return Ok(ExtractorOutput::timed_out());
                }
                Ok(None) => thread::sleep(self.poll_interval),
                Err(e) => {
                    terminate(&mut child);
                    return Err(e);
                }
            }
        };

        // Background processes left by the tool may still hold the pipes.
        // Wait for them until the deadline, then kill the group so the pipes
        // close and whatever was written is still read.
        let mut payload = String::new();
        let mut diagnostics = String::new();
        let mut drain_deadline = deadline.max(Instant::now());
        let mut group_killed = false;
        while readers > 0 {
            match rx.recv_deadline(drain_deadline) {
                Ok((Stream::Stdout, text)) => {
                    payload = text;
                    readers -= 1;
                }
                Ok((Stream::Stderr, text)) => {
                    diagnostics = text;
                    readers -= 1;
                }
                Err(RecvTimeoutError::Timeout) if !group_killed => {
                    log::warn!(
                        "ProcessExtractor: output pipes still held after exit, killing process group"
                    );
                    kill_process_group(&mut child);
                    group_killed = true;
                    drain_deadline = Instant::now() + PIPE_DRAIN_GRACE;
                }
                Err(_) => {
                    log::warn!("ProcessExtractor: gave up reading output pipes");
                    break;
                }
            }
        }
        if !group_killed {
            kill_process_group(&mut child);
        }

        let exit_status = status.code().unwrap_or(NO_EXIT_STATUS);
        log::debug!(
            "ProcessExtractor: exited with {} after {:?} ({} bytes of payload)",
            exit_status,
            started.elapsed(),
            payload.len()
        );

        Ok(ExtractorOutput {
            exit_status,
            diagnostics,
            payload,
        })
    }
}

/// Kill the tool with its process group and reap it.
fn terminate(child: &mut Child) {
    kill_process_group(child);
    let _ = child.kill();
    let _ = child.wait(); // Reap zombie
}

/// Kill every process left in the tool's process group.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(pgid) = i32::try_from(child.id()) else {
        return;
    };
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => log::debug!("ProcessExtractor: killpg {} failed: {}", pgid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
}

impl TableExtractor for ProcessExtractor {
    fn read_tables(&self, path: &Path, options: &ExtractorOptions) -> ExtractorOutput {
        match self.run(path, options) {
            Ok(output) => output,
            Err(e) => {
                log::warn!(
                    "ProcessExtractor: failed to run {}: {}",
                    self.program.display(),
                    e
                );
                ExtractorOutput::failure(
                    NO_EXIT_STATUS,
                    format!("failed to run {}: {}", self.program.display(), e),
                )
            }
        }
    }

    fn name(&self) -> &str {
        "process"
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn spawn_reader<R: Read + Send + 'static>(stream: Stream, mut reader: R, tx: Sender<(Stream, String)>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = reader.read_to_end(&mut buf) {
            log::debug!("ProcessExtractor: error reading {:?}: {}", stream, e);
        }
        // The receiver is gone when the process timed out.
        let _ = tx.send((stream, String::from_utf8_lossy(&buf).into_owned()));
    });
}

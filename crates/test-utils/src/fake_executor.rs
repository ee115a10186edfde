use std::io;
use std::sync::{Arc, Mutex};

use localplugin::errors::{PluginError, Result};
use localplugin::exec::{ExecFuture, LineSource, PluginExecutor, PluginStreams};
use tokio::io::{AsyncWriteExt, DuplexStream};

const PIPE_BUFFER: usize = 64 * 1024;

/// What the supervisor asked the executor to do, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorCall {
    Start,
    Close,
    Terminate,
}

/// A fake executor backed by in-memory pipes.
///
/// The paired [`FakeChild`] plays the plugin: whatever it writes shows up on
/// the supervisor's stdout/stderr line sources.
pub struct FakeExecutor {
    driver_name: String,
    pipes: Option<(DuplexStream, DuplexStream)>,
    fail_start: bool,
    fail_close: bool,
    calls: Arc<Mutex<Vec<ExecutorCall>>>,
}

impl FakeExecutor {
    pub fn new(driver_name: &str) -> (Self, FakeChild) {
        let (out_writer, out_reader) = tokio::io::duplex(PIPE_BUFFER);
        let (err_writer, err_reader) = tokio::io::duplex(PIPE_BUFFER);
        let calls = Arc::new(Mutex::new(Vec::new()));

        let executor = Self {
            driver_name: driver_name.to_string(),
            pipes: Some((out_reader, err_reader)),
            fail_start: false,
            fail_close: false,
            calls: Arc::clone(&calls),
        };
        let child = FakeChild {
            stdout: Some(out_writer),
            stderr: Some(err_writer),
            calls,
        };
        (executor, child)
    }

    /// `start` fails as if the binary could not be executed.
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// `close` fails as if the child exited with an error.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    fn record(&self, call: ExecutorCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PluginExecutor for FakeExecutor {
    fn driver_name(&self) -> &str {
        &self.driver_name
    }

    fn start(&mut self) -> Result<PluginStreams> {
        self.record(ExecutorCall::Start);
        if self.fail_start {
            return Err(PluginError::ProcessStart {
                driver: self.driver_name.clone(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "fake: permission denied"),
            });
        }

        let (stdout, stderr) = self.pipes.take().ok_or(PluginError::AlreadyStarted)?;
        Ok(PluginStreams {
            stdout: LineSource::new(stdout),
            stderr: LineSource::new(stderr),
        })
    }

    fn close(&mut self) -> ExecFuture<'_> {
        self.record(ExecutorCall::Close);
        let driver = self.driver_name.clone();
        let fail = self.fail_close;
        Box::pin(async move {
            if fail {
                return Err(PluginError::ProcessWait {
                    driver,
                    source: io::Error::other("fake: wait failed"),
                });
            }
            Ok(())
        })
    }

    fn terminate(&mut self) -> ExecFuture<'_> {
        self.record(ExecutorCall::Terminate);
        Box::pin(async { Ok(()) })
    }
}

/// The plugin side of a [`FakeExecutor`].
pub struct FakeChild {
    stdout: Option<DuplexStream>,
    stderr: Option<DuplexStream>,
    calls: Arc<Mutex<Vec<ExecutorCall>>>,
}

impl FakeChild {
    /// Write one line to the plugin's stdout.
    pub async fn say(&mut self, line: &str) {
        let pipe = self.stdout.as_mut().expect("stdout already closed");
        pipe.write_all(format!("{line}\n").as_bytes()).await.unwrap();
    }

    /// Write one line to the plugin's stderr.
    pub async fn complain(&mut self, line: &str) {
        let pipe = self.stderr.as_mut().expect("stderr already closed");
        pipe.write_all(format!("{line}\n").as_bytes()).await.unwrap();
    }

    pub fn close_stdout(&mut self) {
        self.stdout = None;
    }

    pub fn close_stderr(&mut self) {
        self.stderr = None;
    }

    /// Close both pipes, like a process exiting.
    pub fn exit(mut self) {
        self.close_stdout();
        self.close_stderr();
    }

    /// Executor calls observed so far.
    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Shared handle to the call log, usable after the child is gone.
    pub fn call_log(&self) -> Arc<Mutex<Vec<ExecutorCall>>> {
        Arc::clone(&self.calls)
    }
}

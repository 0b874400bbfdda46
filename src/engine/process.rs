//! Process-backed engine sessions.
//!
//! The engine is started once per session as a long-running interpreter
//! reading statements from stdin. Each operation is written as a small script
//! block that runs the statement inside `try`/`catch` and then prints a
//! unique marker line on both stdout and stderr. Everything read before the
//! markers belongs to that operation, which gives per-call capture without
//! letting engine output reach this process's own streams.
//!
//! stderr is drained by a helper thread so a chatty engine cannot block on a
//! full pipe while we are waiting on stdout.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use crate::config::EngineConfig;
use crate::error::EngineError;

use super::{CallOutput, EngineArg, EngineCall, EngineLauncher, EngineSession};

/// Launches the engine executable as a child process.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    executable: PathBuf,
}

impl ProcessEngine {
    pub fn new<P: Into<PathBuf>>(executable: P) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.executable.clone())
    }
}

impl EngineLauncher for ProcessEngine {
    fn launch(&self, startup_options: &[String]) -> Result<Box<dyn EngineSession>, EngineError> {
        let executable = self.executable.display().to_string();
        let start_failed = |reason: String| EngineError::StartFailed {
            executable: executable.clone(),
            reason,
        };

        let mut child = Command::new(&self.executable)
            .args(startup_options)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| start_failed(err.to_string()))?;

        let (stdin, stdout, stderr) = match (child.stdin.take(), child.stdout.take(), child.stderr.take())
        {
            (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(start_failed("engine pipes unavailable".to_string()));
            }
        };

        let (tx, rx) = mpsc::channel();
        let stderr_reader = thread::spawn(move || {
            for line in BufReader::new(stderr).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        tracing::info!(
            executable = %self.executable.display(),
            options = ?startup_options,
            pid = child.id(),
            "engine session started"
        );

        Ok(Box::new(ProcessSession {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            stderr_lines: rx,
            stderr_reader: Some(stderr_reader),
            sequence: 0,
        }))
    }
}

struct ProcessSession {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    stderr_lines: Receiver<String>,
    stderr_reader: Option<JoinHandle<()>>,
    sequence: u64,
}

struct Execution {
    output: CallOutput,
    failed: bool,
}

impl ProcessSession {
    fn execute(&mut self, statement: &str) -> Result<Execution, EngineError> {
        self.sequence += 1;
        let marker = format!("__em_fixtures_{}_{}__", self.child.id(), self.sequence);
        let failed_marker = format!("{marker}:failed");
        let script = format!(
            "try\n{statement};\ncatch fixture_err\nfprintf(2, '%s\\n', fixture_err.message);\ndisp('{failed_marker}');\nend\ndisp('{marker}');\nfprintf(2, '{marker}\\n');\n"
        );

        let stdin = self.stdin.as_mut().ok_or(EngineError::NotRunning)?;
        stdin
            .write_all(script.as_bytes())
            .and_then(|()| stdin.flush())
            .map_err(|err| lost(format!("failed to send statement: {err}")))?;

        let mut output = CallOutput::default();
        let mut failed = false;
        loop {
            let mut line = String::new();
            let read = self
                .stdout
                .read_line(&mut line)
                .map_err(|err| lost(format!("failed to read engine output: {err}")))?;
            if read == 0 {
                return Err(lost("engine closed its output mid-call".to_string()));
            }
            if let Some(pending) = text_before_marker(&line, &failed_marker) {
                output.stdout.push_str(pending);
                failed = true;
            } else if let Some(pending) = text_before_marker(&line, &marker) {
                output.stdout.push_str(pending);
                break;
            } else {
                output.stdout.push_str(&line);
            }
        }

        loop {
            match self.stderr_lines.recv() {
                Ok(line) => {
                    if let Some(pending) = text_before_marker(&line, &marker) {
                        output.stderr.push_str(pending);
                        break;
                    }
                    output.stderr.push_str(&line);
                    output.stderr.push('\n');
                }
                Err(_) => return Err(lost("engine closed its error stream mid-call".to_string())),
            }
        }

        Ok(Execution { output, failed })
    }

    fn execute_checked(&mut self, function: &str, statement: &str) -> Result<CallOutput, EngineError> {
        let execution = self.execute(statement)?;
        if execution.failed {
            return Err(EngineError::CallFailed {
                function: function.to_string(),
                message: execution.output.stderr.trim().to_string(),
                output: execution.output,
            });
        }
        Ok(execution.output)
    }
}

impl EngineSession for ProcessSession {
    fn cd(&mut self, dir: &Path) -> Result<(), EngineError> {
        let statement = format!("cd({})", path_literal(dir));
        self.execute_checked("cd", &statement).map(|_| ())
    }

    fn pwd(&mut self) -> Result<PathBuf, EngineError> {
        let output = self.execute_checked("pwd", "disp(pwd)")?;
        output
            .stdout
            .lines()
            .map(|line| line.trim_start_matches(">>").trim())
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from)
            .ok_or_else(|| lost("engine did not report a working directory".to_string()))
    }

    fn addpath(&mut self, dir: &Path) -> Result<(), EngineError> {
        let statement = format!("addpath({})", path_literal(dir));
        self.execute_checked("addpath", &statement).map(|_| ())
    }

    fn call(&mut self, call: &EngineCall) -> Result<CallOutput, EngineError> {
        self.execute_checked(&call.function, &call.render())
    }

    fn quit(mut self: Box<Self>) -> Result<(), EngineError> {
        if let Some(mut stdin) = self.stdin.take() {
            // The engine may already be gone; wait() below reports that.
            let _ = stdin.write_all(b"exit\n").and_then(|()| stdin.flush());
        }

        let status = self
            .child
            .wait()
            .map_err(|err| lost(format!("failed to wait for engine exit: {err}")))?;
        if let Some(reader) = self.stderr_reader.take() {
            let _ = reader.join();
        }

        tracing::info!(%status, "engine session stopped");
        Ok(())
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            tracing::warn!(pid = self.child.id(), "killing engine left running at drop");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Output printed ahead of `marker` on a marker line, or `None` if the line
/// does not end with `marker`. Text without a trailing newline shares the
/// marker's line; a trailing `>>` prompt echo is not output.
fn text_before_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let pending = line.trim_end().strip_suffix(marker)?;
    Some(match pending.trim_end().strip_suffix(">>") {
        Some(before_prompt) => before_prompt.trim_end(),
        None => pending,
    })
}

fn path_literal(path: &Path) -> String {
    EngineArg::Text(path.to_string_lossy().into_owned()).to_literal()
}

fn lost(reason: String) -> EngineError {
    EngineError::SessionLost { reason }
}

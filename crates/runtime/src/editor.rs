//! Editor Subprocess Module
//!
//! The editor is an external, usually interactive program that is handed the
//! scratch file path as its last argument. Running it blocks the calling
//! thread until the program exits. How the program exited is reported as an
//! [`EditorOutcome`]; whether that outcome matters is decided by the
//! pipeline's [`ExitPolicy`].

use std::fmt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus};
use std::time::{Duration, Instant};

use editserver_protocol::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Interval between exit checks while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Program and static arguments used for every edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorCommand {
    program: String,
    args: Vec<String>,
}

impl EditorCommand {
    /// Create a command from an explicit program and argument list.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a whitespace-delimited command line into program and arguments.
    pub fn parse(command: &str) -> Result<Self, ConfigError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(ConfigError::EmptyEditorCommand)?;

        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Build the process invocation for `path`, which always goes last.
    pub fn invocation(&self, path: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(path);
        command
    }
}

impl fmt::Display for EditorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How an editor run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorOutcome {
    /// The process exited on its own with the given code.
    Exited { code: i32 },
    /// The process was terminated by a signal.
    Signalled,
    /// The process outlived its deadline and was killed.
    TimedOut { timeout: Duration },
    /// The process could not be started.
    LaunchFailed { reason: String },
    /// Waiting on the process failed.
    WaitFailed { reason: String },
}

impl EditorOutcome {
    /// Whether the editor reported success.
    pub fn is_success(&self) -> bool {
        matches!(self, EditorOutcome::Exited { code: 0 })
    }

    fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => EditorOutcome::Exited { code },
            None => EditorOutcome::Signalled,
        }
    }
}

impl fmt::Display for EditorOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorOutcome::Exited { code } => write!(f, "exited with status {}", code),
            EditorOutcome::Signalled => write!(f, "terminated by signal"),
            EditorOutcome::TimedOut { timeout } => {
                write!(f, "killed after {}s timeout", timeout.as_secs())
            }
            EditorOutcome::LaunchFailed { reason } => write!(f, "failed to launch: {}", reason),
            EditorOutcome::WaitFailed { reason } => write!(f, "failed to wait: {}", reason),
        }
    }
}

/// What to do when the editor does not finish cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitPolicy {
    /// Log the outcome and return whatever the file contains.
    #[default]
    Tolerant,
    /// Fail the request.
    Strict,
}

/// Runs an editor against a file and blocks until it is done.
///
/// The production implementation is [`CommandEditor`]. Closures of the form
/// `Fn(&Path) -> EditorOutcome` also implement this trait, which lets tests
/// edit files in-process.
pub trait EditorRunner: Send + Sync {
    fn run(&self, path: &Path) -> EditorOutcome;
}

impl<F> EditorRunner for F
where
    F: Fn(&Path) -> EditorOutcome + Send + Sync,
{
    fn run(&self, path: &Path) -> EditorOutcome {
        self(path)
    }
}

/// Editor backed by a child process.
#[derive(Debug, Clone)]
pub struct CommandEditor {
    command: EditorCommand,
    timeout: Option<Duration>,
}

impl CommandEditor {
    pub fn new(command: EditorCommand) -> Self {
        Self {
            command,
            timeout: None,
        }
    }

    /// Kill the editor if it is still running after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &EditorCommand {
        &self.command
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl EditorRunner for CommandEditor {
    fn run(&self, path: &Path) -> EditorOutcome {
        info!(editor = %self.command, path = %path.display(), "Running editor");

        let mut child = match self.command.invocation(path).spawn() {
            Ok(child) => child,
            Err(e) => {
                return EditorOutcome::LaunchFailed {
                    reason: e.to_string(),
                }
            }
        };

        let outcome = match self.timeout {
            Some(timeout) => wait_with_deadline(&mut child, timeout),
            None => match child.wait() {
                Ok(status) => EditorOutcome::from_status(status),
                Err(e) => EditorOutcome::WaitFailed {
                    reason: e.to_string(),
                },
            },
        };

        debug!(editor = %self.command, %outcome, "Editor finished");
        outcome
    }
}

/// Poll the child until it exits or `timeout` elapses, killing it in the
/// latter case.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> EditorOutcome {
    let start = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return EditorOutcome::from_status(status),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    warn!(
                        pid = child.id(),
                        timeout_secs = timeout.as_secs(),
                        "Editor timed out, killing process"
                    );
                    drop(child.kill());
                    drop(child.wait());
                    return EditorOutcome::TimedOut { timeout };
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return EditorOutcome::WaitFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_program_and_args() {
        let command = EditorCommand::parse("gvim -f").unwrap();
        assert_eq!(command.program(), "gvim");
        assert_eq!(command.args(), &["-f".to_string()]);
    }

    #[test]
    fn test_parse_collapses_whitespace() {
        let command = EditorCommand::parse("  emacsclient   -c\t-a ''  ").unwrap();
        assert_eq!(command.program(), "emacsclient");
        assert_eq!(command.args(), &["-c", "-a", "''"]);
    }

    #[test]
    fn test_parse_empty_command() {
        assert_eq!(EditorCommand::parse(""), Err(ConfigError::EmptyEditorCommand));
        assert_eq!(EditorCommand::parse("   \t"), Err(ConfigError::EmptyEditorCommand));
    }

    #[test]
    fn test_path_is_last_argument() {
        let command = EditorCommand::parse("gvim -f --nofork").unwrap();
        let invocation = command.invocation(Path::new("/tmp/edit-server-abcd"));

        assert_eq!(invocation.get_program(), "gvim");
        let args: Vec<_> = invocation.get_args().collect();
        assert_eq!(args, ["-f", "--nofork", "/tmp/edit-server-abcd"]);
    }

    #[test]
    fn test_display_round_trips_command_line() {
        let command = EditorCommand::parse("gvim  -f").unwrap();
        assert_eq!(command.to_string(), "gvim -f");
    }

    #[test]
    fn test_outcome_success() {
        assert!(EditorOutcome::Exited { code: 0 }.is_success());
        assert!(!EditorOutcome::Exited { code: 1 }.is_success());
        assert!(!EditorOutcome::Signalled.is_success());
        assert!(!EditorOutcome::LaunchFailed {
            reason: "nope".to_string()
        }
        .is_success());
    }

    #[test]
    fn test_exit_policy_serde() {
        let policy: ExitPolicy = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(policy, ExitPolicy::Strict);
        assert_eq!(ExitPolicy::default(), ExitPolicy::Tolerant);
    }

    #[test]
    fn test_closure_runner() {
        let runner = |_: &Path| EditorOutcome::Exited { code: 3 };
        assert_eq!(
            runner.run(Path::new("/nowhere")),
            EditorOutcome::Exited { code: 3 }
        );
    }

    #[test]
    fn test_missing_program_is_launch_failure() {
        let editor = CommandEditor::new(EditorCommand::new(
            "edit-server-definitely-not-installed",
            vec![],
        ));
        let outcome = editor.run(Path::new("/tmp/unused"));
        assert!(matches!(outcome, EditorOutcome::LaunchFailed { .. }));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use tempfile::NamedTempFile;

        fn sh(script: &str) -> EditorCommand {
            // `sh -c script path` exposes the appended path as $0.
            EditorCommand::new("sh", vec!["-c".to_string(), script.to_string()])
        }

        #[test]
        fn test_editor_receives_path() {
            let file = NamedTempFile::new().unwrap();
            std::fs::write(file.path(), "draft").unwrap();

            let editor = CommandEditor::new(sh("printf ' edited' >> \"$0\""));
            let outcome = editor.run(file.path());

            assert_eq!(outcome, EditorOutcome::Exited { code: 0 });
            assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "draft edited");
        }

        #[test]
        fn test_nonzero_exit_reported() {
            let file = NamedTempFile::new().unwrap();
            let editor = CommandEditor::new(sh("exit 3"));
            assert_eq!(editor.run(file.path()), EditorOutcome::Exited { code: 3 });
        }

        #[test]
        fn test_timeout_kills_editor() {
            let file = NamedTempFile::new().unwrap();
            let editor = CommandEditor::new(sh("sleep 5"))
                .with_timeout(Some(Duration::from_millis(200)));

            let start = Instant::now();
            let outcome = editor.run(file.path());

            assert!(matches!(outcome, EditorOutcome::TimedOut { .. }));
            assert!(start.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn test_timeout_not_hit_by_fast_editor() {
            let file = NamedTempFile::new().unwrap();
            let editor = CommandEditor::new(EditorCommand::new("true", vec![]))
                .with_timeout(Some(Duration::from_secs(5)));
            assert_eq!(editor.run(file.path()), EditorOutcome::Exited { code: 0 });
        }
    }
}

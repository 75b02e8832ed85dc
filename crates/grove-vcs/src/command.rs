//! Running VCS command-line tools and classifying their failures.

use crate::VcsResult;
use grove_core::{GroveError, VcsKind};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, trace};

/// A single invocation of a VCS tool
pub struct ToolCommand<'a> {
    kind: VcsKind,
    args: Vec<String>,
    cwd: Option<&'a Path>,
    /// URL or path named in classified errors
    target: String,
}

impl<'a> ToolCommand<'a> {
    pub fn new(kind: VcsKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            args: Vec::new(),
            cwd: None,
            target: target.into(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    pub fn current_dir(mut self, dir: &'a Path) -> Self {
        self.cwd = Some(dir);
        self
    }

    /// Human-readable form used in error messages
    pub fn display(&self) -> String {
        format!("{} {}", self.kind.command(), self.args.join(" "))
    }

    /// Run to completion and return trimmed stdout.
    ///
    /// The child process is killed if the returned future is dropped, which is
    /// how cancellation aborts in-flight fetches.
    pub async fn run(self) -> VcsResult<String> {
        let rendered = self.display();
        debug!(command = %rendered, "running VCS command");

        let mut command = Command::new(self.kind.command());
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.cwd {
            command.current_dir(dir);
        }
        match self.kind {
            VcsKind::Git => {
                command.env("GIT_TERMINAL_PROMPT", "0");
            },
            VcsKind::Mercurial => {
                command.env("HGPLAIN", "1");
            },
            VcsKind::Subversion | VcsKind::Bazaar => {},
        }

        let output = command.output().await.map_err(|e| GroveError::VcsCommand {
            command: rendered.clone(),
            message: format!("failed to start {}: {}", self.kind.command(), e),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            trace!(command = %rendered, bytes = stdout.len(), "VCS command finished");
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(classify(&rendered, &self.target, &stderr))
    }
}

const NETWORK_MARKERS: &[&str] = &[
    "could not resolve host",
    "temporary failure in name resolution",
    "connection refused",
    "connection timed out",
    "connection reset",
    "network is unreachable",
    "operation timed out",
    "unable to connect",
    "unable to access",
    "early eof",
    "the remote end hung up unexpectedly",
    "no route to host",
];

const AUTH_MARKERS: &[&str] = &[
    "authentication failed",
    "authentication required",
    "authorization failed",
    "could not read username",
    "could not read password",
    "permission denied (publickey",
    "access denied",
    "http error 401",
    "http error 403",
    "returned error: 401",
    "returned error: 403",
];

const NOT_FOUND_MARKERS: &[&str] = &[
    "unknown revision",
    "did not match any file",
    "not a valid object name",
    "couldn't find remote ref",
    "reference is not a tree",
    "abort: unknown revision",
    "no such tag",
    "requested revision not found",
    "no such revision",
    "e160006",
];

const CORRUPTION_MARKERS: &[&str] = &[
    "not a git repository",
    "corrupt",
    "bad object",
    "loose object",
    "index file smaller than expected",
    "there is no mercurial repository here",
    "is not a working copy",
    "not a branch",
    "e155007",
    "e155037",
    "working copy locked",
];

/// Map a failed command's stderr onto a grove error kind
pub fn classify(command: &str, target: &str, stderr: &str) -> GroveError {
    let lower = stderr.to_ascii_lowercase();
    let message = stderr.lines().last().unwrap_or(stderr).to_string();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has(AUTH_MARKERS) {
        GroveError::AuthenticationRejected {
            url: target.to_string(),
            message,
        }
    } else if has(NETWORK_MARKERS) {
        GroveError::NetworkUnavailable {
            url: target.to_string(),
            message,
        }
    } else if has(CORRUPTION_MARKERS) {
        GroveError::CacheCorruption {
            path: target.to_string(),
            message,
        }
    } else if has(NOT_FOUND_MARKERS) {
        GroveError::RevisionNotFound {
            url: target.to_string(),
            revision: message,
        }
    } else {
        GroveError::VcsCommand {
            command: command.to_string(),
            message: if stderr.is_empty() {
                "exited with a non-zero status".to_string()
            } else {
                message
            },
        }
    }
}

//! The VCS port: everything the workflow engine needs from git.
//!
//! The engine never shells out directly — it talks to the [`Vcs`] trait and
//! inspects `(exit_code, stdout, stderr)` results. A non-zero exit is always
//! a recoverable [`GateflowError::ExternalCommand`]; an exceeded deadline is
//! the distinct [`GateflowError::CommandTimeout`]. Neither crashes the
//! process.

use crate::error::{GateflowError, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// CmdOutput
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Convert a non-zero exit into an `ExternalCommand` error labeled with
    /// the step that produced it.
    pub fn require(self, context: &str) -> Result<CmdOutput> {
        if self.code != 0 {
            return Err(GateflowError::ExternalCommand {
                command: context.to_string(),
                code: self.code,
                stderr: self.stderr,
            });
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Vcs
// ---------------------------------------------------------------------------

pub trait Vcs {
    fn checkout(&self, reference: &str) -> Result<CmdOutput>;
    fn create_branch(&self, name: &str) -> Result<CmdOutput>;
    fn pull(&self) -> Result<CmdOutput>;
    fn rebase(&self, onto: &str) -> Result<CmdOutput>;
    fn merge(&self, reference: &str, no_fast_forward: bool) -> Result<CmdOutput>;
    /// Create a revert commit for `commit`, resolving to the given mainline
    /// parent. A revert commit, not a history rewrite, so it is safe on
    /// shared history.
    fn revert(&self, commit: &str, mainline: u32) -> Result<CmdOutput>;
    fn delete_branch(&self, name: &str) -> Result<CmdOutput>;
    fn current_head_commit(&self) -> Result<CmdOutput>;
    fn current_branch(&self) -> Result<CmdOutput>;
}

// ---------------------------------------------------------------------------
// GitCli
// ---------------------------------------------------------------------------

/// [`Vcs`] implementation that shells out to `git` with a bounded wait.
pub struct GitCli {
    repo_root: PathBuf,
    timeout: Duration,
}

impl GitCli {
    pub fn new(repo_root: &Path) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
            timeout: DEFAULT_GIT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, args: &[&str]) -> Result<CmdOutput> {
        let mut child = Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain pipes on threads so a chatty command can't fill the pipe
        // buffer and deadlock the bounded wait below.
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdout_reader = std::thread::spawn(move || read_pipe(stdout_pipe));
        let stderr_reader = std::thread::spawn(move || read_pipe(stderr_pipe));

        match child.wait_timeout(self.timeout)? {
            Some(status) => {
                let stdout = stdout_reader.join().unwrap_or_default();
                let stderr = stderr_reader.join().unwrap_or_default();
                Ok(CmdOutput {
                    code: status.code().unwrap_or(-1),
                    stdout,
                    stderr,
                })
            }
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(GateflowError::CommandTimeout {
                    command: format!("git {}", args.join(" ")),
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

impl Vcs for GitCli {
    fn checkout(&self, reference: &str) -> Result<CmdOutput> {
        self.run(&["checkout", reference])
    }

    fn create_branch(&self, name: &str) -> Result<CmdOutput> {
        self.run(&["checkout", "-b", name])
    }

    fn pull(&self) -> Result<CmdOutput> {
        self.run(&["pull"])
    }

    fn rebase(&self, onto: &str) -> Result<CmdOutput> {
        self.run(&["rebase", onto])
    }

    fn merge(&self, reference: &str, no_fast_forward: bool) -> Result<CmdOutput> {
        if no_fast_forward {
            self.run(&["merge", "--no-ff", reference])
        } else {
            self.run(&["merge", reference])
        }
    }

    fn revert(&self, commit: &str, mainline: u32) -> Result<CmdOutput> {
        let mainline = mainline.to_string();
        self.run(&["revert", "--no-edit", "-m", &mainline, commit])
    }

    fn delete_branch(&self, name: &str) -> Result<CmdOutput> {
        self.run(&["branch", "-D", name])
    }

    fn current_head_commit(&self) -> Result<CmdOutput> {
        self.run(&["rev-parse", "HEAD"])
    }

    fn current_branch(&self) -> Result<CmdOutput> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"])
    }
}

// ---------------------------------------------------------------------------
// Branch name validation
// ---------------------------------------------------------------------------

/// Enforce git ref-name rules before handing a generated name to the VCS.
pub fn validate_branch_name(name: &str) -> Result<()> {
    let fail = |reason: &str| {
        Err(GateflowError::InvalidBranchName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return fail("name cannot be empty");
    }
    if name.starts_with('.') || name.ends_with('.') {
        return fail("name cannot begin or end with a dot");
    }
    if name.contains("..") {
        return fail("name cannot contain '..'");
    }
    if name.contains("@{") {
        return fail("name cannot contain '@{'");
    }
    if name.starts_with('/') || name.ends_with('/') {
        return fail("name cannot begin or end with a slash");
    }
    if name.contains("//") {
        return fail("name cannot contain consecutive slashes");
    }
    if name.ends_with(".lock") {
        return fail("name cannot end with '.lock'");
    }
    for c in name.chars() {
        if matches!(c, '~' | '^' | ':' | '\\' | '?' | '*' | '[' | ' ' | '\t') || c.is_control() {
            return fail("name contains a forbidden character");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use anyhow::{bail, Context, Result};
use colored::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};

/// A single external command: program, arguments and working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: &Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// True when the program matches and the arguments start with `prefix`
    pub fn matches(&self, program: &str, prefix: &[&str]) -> bool {
        self.program == program
            && self.args.len() >= prefix.len()
            && self.args.iter().zip(prefix).all(|(a, p)| a.as_str() == *p)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.cwd);
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Both streams, for matching on diagnostic text
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

enum SessionProcess {
    Child(Child),
    Detached(i32),
}

/// A running interactive command with piped stdin and stdout
pub struct Session {
    pub stdin: Box<dyn AsyncWrite + Unpin + Send>,
    pub stdout: Box<dyn AsyncRead + Unpin + Send>,
    process: SessionProcess,
}

impl Session {
    fn from_child(mut child: Child) -> Result<Self> {
        let stdin = child.stdin.take().context("Failed to capture stdin")?;
        let stdout = child.stdout.take().context("Failed to capture stdout")?;
        Ok(Self {
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            process: SessionProcess::Child(child),
        })
    }

    /// Session over arbitrary streams that "exits" with `exit_code`
    pub fn detached<W, R>(stdin: W, stdout: R, exit_code: i32) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self {
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            process: SessionProcess::Detached(exit_code),
        }
    }

    /// Wait for the process to exit and return its exit code
    pub async fn wait(&mut self) -> Result<i32> {
        exit_code(&mut self.process).await
    }

    /// Close stdin and discard remaining output until the process exits.
    ///
    /// A child blocked on a full stdout pipe never exits, so the drain and
    /// the wait run together.
    pub async fn finish(&mut self) -> Result<i32> {
        self.stdin = Box::new(tokio::io::sink());

        let stdout = &mut self.stdout;
        let drain = async move {
            let mut sink = tokio::io::sink();
            tokio::io::copy(stdout, &mut sink).await
        };
        let (drained, code) = tokio::join!(drain, exit_code(&mut self.process));

        drained.context("Failed to read process output")?;
        code
    }

    pub async fn kill(&mut self) {
        if let SessionProcess::Child(child) = &mut self.process {
            child.kill().await.ok();
        }
    }
}

async fn exit_code(process: &mut SessionProcess) -> Result<i32> {
    match process {
        SessionProcess::Child(child) => {
            let status = child.wait().await.context("Failed to wait for process")?;
            Ok(status.code().unwrap_or(-1))
        }
        SessionProcess::Detached(code) => Ok(*code),
    }
}

/// Seam for all external process execution
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run to completion, capturing stdout and stderr
    async fn output(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Run to completion with output streamed to the console
    async fn status(&self, invocation: &Invocation) -> Result<i32>;

    /// Start an interactive process with piped stdin/stdout
    fn spawn(&self, invocation: &Invocation) -> Result<Session>;
}

/// Runs commands on the host with tokio
#[derive(Debug, Default, Clone)]
pub struct SystemRunner {
    pub echo: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self { echo: true }
    }

    fn announce(&self, invocation: &Invocation) {
        if self.echo {
            println!("  {} {}", "$".dimmed(), invocation.to_string().dimmed());
        }
    }
}

impl CommandRunner for SystemRunner {
    async fn output(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.announce(invocation);

        let output = invocation
            .command()
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to run `{}`", invocation))?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn status(&self, invocation: &Invocation) -> Result<i32> {
        self.announce(invocation);

        let status = invocation
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .with_context(|| format!("Failed to run `{}`", invocation))?;

        Ok(status.code().unwrap_or(-1))
    }

    fn spawn(&self, invocation: &Invocation) -> Result<Session> {
        self.announce(invocation);

        let child = invocation
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start `{}`", invocation))?;

        Session::from_child(child)
    }
}

/// Run with streamed output, failing on a non-zero exit
pub async fn run_checked<R: CommandRunner>(runner: &R, invocation: &Invocation) -> Result<()> {
    let code = runner.status(invocation).await?;
    if code != 0 {
        bail!("`{}` exited with code {}", invocation, code);
    }
    Ok(())
}

/// Run with captured output, returning stdout on success
pub async fn output_checked<R: CommandRunner>(runner: &R, invocation: &Invocation) -> Result<String> {
    let output = runner.output(invocation).await?;
    if !output.success() {
        bail!(
            "`{}` exited with code {}: {}",
            invocation,
            output.exit_code,
            output.stderr.trim()
        );
    }
    Ok(output.stdout)
}

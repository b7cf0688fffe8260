use anyhow::{bail, Context, Result};
use colored::*;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::config::{LinkConfig, ToolsConfig};
use crate::expect::{drive, PromptError, PromptScript};
use crate::runner::{output_checked, CommandRunner, Invocation};

/// Deployment whose key gets wired into the generated app
pub const STAGING: &str = "Staging";

/// Index of the Staging entry in `code-push deployment ls` output
pub const STAGING_INDEX: usize = 1;

/// Target platforms registered on the update service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }

    /// Name of the app registered for this platform
    pub fn app_name(&self, base: &str) -> String {
        format!("{}-{}", base, self.name())
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of `code-push app add`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Created,
    AlreadyExists,
    Failed(String),
}

/// One entry of `code-push deployment ls --format json`
#[derive(Debug, Clone, Deserialize)]
pub struct Deployment {
    #[serde(default)]
    pub name: Option<String>,
    pub key: String,
}

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("expected at least {} deployments for \"{}\", found {}", STAGING_INDEX + 1, .app, .found)]
    TooFewDeployments { app: String, found: usize },

    #[error("failed to parse deployment list for \"{app}\"")]
    Parse {
        app: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Staging keys for both platforms, consumed by the link step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentKeys {
    pub android: String,
    pub ios: String,
}

/// Register `name` for `platform`, telling "already exists" apart from real failures
pub async fn register_app<R: CommandRunner>(
    runner: &R,
    tools: &ToolsConfig,
    work_dir: &Path,
    name: &str,
    platform: Platform,
) -> Result<Registration> {
    let invocation = Invocation::new(&tools.code_push, work_dir).args([
        "app",
        "add",
        name,
        platform.name(),
        "react-native",
    ]);

    let output = runner.output(&invocation).await?;
    if output.success() {
        return Ok(Registration::Created);
    }

    let combined = output.combined();
    if combined.to_lowercase().contains("already exists") {
        Ok(Registration::AlreadyExists)
    } else {
        let detail = combined.trim().to_string();
        Ok(Registration::Failed(if detail.is_empty() {
            format!("exit code {}", output.exit_code)
        } else {
            detail
        }))
    }
}

/// Parse deployment listing JSON and pick the Staging entry (index 1)
pub fn select_staging(app: &str, json: &str) -> Result<Deployment, DeploymentError> {
    let mut deployments: Vec<Deployment> =
        serde_json::from_str(json).map_err(|source| DeploymentError::Parse {
            app: app.to_string(),
            source,
        })?;

    if deployments.len() <= STAGING_INDEX {
        return Err(DeploymentError::TooFewDeployments {
            app: app.to_string(),
            found: deployments.len(),
        });
    }

    Ok(deployments.swap_remove(STAGING_INDEX))
}

/// Query the deployment list for `name` and return the Staging key
pub async fn fetch_staging_key<R: CommandRunner>(
    runner: &R,
    tools: &ToolsConfig,
    work_dir: &Path,
    name: &str,
) -> Result<String> {
    let invocation = Invocation::new(&tools.code_push, work_dir).args([
        "deployment",
        "ls",
        name,
        "-k",
        "--format",
        "json",
    ]);

    let stdout = output_checked(runner, &invocation).await?;
    let deployment = select_staging(name, &stdout)?;

    if let Some(found) = deployment.name.as_deref() {
        if found != STAGING {
            eprintln!(
                "{} deployment #{} of \"{}\" is \"{}\", not \"{}\"",
                "Warning:".yellow(),
                STAGING_INDEX + 1,
                name,
                found,
                STAGING
            );
        }
    }

    Ok(deployment.key)
}

/// Register the platform app (tolerating existing apps) and fetch its Staging key
pub async fn register_platform<R: CommandRunner>(
    runner: &R,
    tools: &ToolsConfig,
    work_dir: &Path,
    base_name: &str,
    platform: Platform,
) -> Result<String> {
    let name = platform.app_name(base_name);
    println!(
        "Creating CodePush app \"{}\" to release updates for {}...",
        name.cyan(),
        platform
    );

    match register_app(runner, tools, work_dir, &name, platform).await? {
        Registration::Created => println!("App \"{}\" has been created", name),
        Registration::AlreadyExists => println!("App \"{}\" already exists", name),
        Registration::Failed(detail) => eprintln!(
            "{} could not create \"{}\" ({}), trying existing deployments",
            "Warning:".yellow(),
            name,
            detail
        ),
    }
    println!();

    let key = fetch_staging_key(runner, tools, work_dir, &name)
        .await
        .with_context(|| format!("Failed to get deployment key for \"{}\"", name))?;

    println!("Deployment key for {}: {}", platform, key.green());
    println!(
        "Use {} to release updates for {}",
        format!("code-push release-react {} {}", name, platform).cyan(),
        platform
    );
    println!();

    Ok(key)
}

/// Register both platform apps and collect their Staging keys
pub async fn register_all<R: CommandRunner>(
    runner: &R,
    tools: &ToolsConfig,
    work_dir: &Path,
    base_name: &str,
) -> Result<DeploymentKeys> {
    let android = register_platform(runner, tools, work_dir, base_name, Platform::Android).await?;
    let ios = register_platform(runner, tools, work_dir, base_name, Platform::Ios).await?;
    Ok(DeploymentKeys { android, ios })
}

/// Why the link step failed
#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("link command exited with code {0}")]
    Exit(i32),

    #[error("link command did not exit within {:.1}s after the last prompt", .0.as_secs_f32())]
    ExitTimeout(Duration),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Run `react-native link` and answer its deployment key prompts
pub async fn link_module<R: CommandRunner>(
    runner: &R,
    tools: &ToolsConfig,
    module: &str,
    project_dir: &Path,
    keys: &DeploymentKeys,
    link: &LinkConfig,
) -> Result<(), LinkError> {
    let invocation = Invocation::new(&tools.react_native, project_dir).args(["link", module]);
    let mut session = runner.spawn(&invocation)?;

    let script = PromptScript::new()
        .then(&link.android_prompt, &keys.android)
        .then(&link.ios_prompt, &keys.ios);

    let wait = Duration::from_secs(link.timeout);
    if let Err(e) = drive(&mut session.stdout, &mut session.stdin, &script, wait).await {
        session.kill().await;
        return Err(e.into());
    }

    let code = match tokio::time::timeout(wait, session.finish()).await {
        Ok(code) => code?,
        Err(_) => {
            session.kill().await;
            return Err(LinkError::ExitTimeout(wait));
        }
    };
    if code != 0 {
        return Err(LinkError::Exit(code));
    }

    Ok(())
}

/// Check that a required tool is on PATH
pub fn require_tool(program: &str, hint: &str) -> Result<()> {
    if which::which(program).is_err() {
        bail!("{} command not found. {}", program, hint);
    }
    Ok(())
}

use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::assets::setup_assets;
use crate::cli::Cli;
use crate::codepush::{link_module, register_all, require_tool, DeploymentKeys, LinkError};
use crate::config::{Config, HostOs};
use crate::npm::{install_module, resolve_selector, xcode_script_folder};
use crate::patch::{grant_access, patch_debug_mode};
use crate::runner::{run_checked, CommandRunner, Invocation, SystemRunner};

/// Everything one generation run needs
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub app_name: String,
    pub react_native_version: Option<String>,
    pub code_push_version: Option<String>,
    /// Directory the project is generated in; also the base for fixtures
    pub work_dir: PathBuf,
    pub host: HostOs,
    pub skip_patches: bool,
    pub config: Config,
}

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("Folder with name \"{0}\" already exists! Please delete")]
    TargetExists(String),

    #[error("Failed to link {module}")]
    LinkFailed {
        module: String,
        #[source]
        source: LinkError,
    },
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct Outcome {
    pub project_dir: PathBuf,
    pub react_native: String,
    pub code_push: String,
    pub keys: DeploymentKeys,
    pub patched: bool,
}

/// Entry point for the binary: build options from the CLI and run on the host
pub async fn execute(cli: Cli) -> Result<()> {
    let work_dir = std::env::current_dir().context("Failed to get current directory")?;
    let mut config = Config::load(&work_dir)?;

    if let Some(dir) = cli.fixtures {
        config.fixtures.dir = dir;
    }
    if let Some(timeout) = cli.link_timeout {
        config.link.timeout = timeout;
    }

    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let options = CreateOptions {
        app_name: cli
            .app_name
            .unwrap_or_else(|| config.app.default_name.clone()),
        react_native_version: cli.react_native_version,
        code_push_version: cli.code_push_version,
        work_dir,
        host: HostOs::current(),
        skip_patches: cli.skip_patches,
        config,
    };

    ensure_target_free(&options.work_dir, &options.app_name)?;

    let tools = &options.config.tools;
    require_tool(&tools.npm, "Install Node.js first.")?;
    require_tool(&tools.react_native, "Run: npm i -g react-native-cli")?;
    require_tool(&tools.code_push, "Run: npm i -g code-push-cli && code-push register")?;

    run(&SystemRunner::new(), &options).await?;
    Ok(())
}

/// Fail with [`CreateError::TargetExists`] if the project directory is taken
pub fn ensure_target_free(work_dir: &Path, app_name: &str) -> Result<PathBuf> {
    let project_dir = work_dir.join(app_name);
    if project_dir.exists() {
        return Err(CreateError::TargetExists(app_name.to_string()).into());
    }
    Ok(project_dir)
}

/// Generate the CodePushified app described by `options`
pub async fn run<R: CommandRunner>(runner: &R, options: &CreateOptions) -> Result<Outcome> {
    let config = &options.config;
    let tools = &config.tools;
    let packages = &config.packages;
    let work_dir = options.work_dir.as_path();
    let app_name = options.app_name.as_str();

    let project_dir = ensure_target_free(work_dir, app_name)?;

    let react_native = resolve_selector(
        runner,
        tools,
        work_dir,
        &packages.react_native,
        options.react_native_version.as_deref(),
    )
    .await?;
    let code_push = resolve_selector(
        runner,
        tools,
        work_dir,
        &packages.code_push_module,
        options.code_push_version.as_deref(),
    )
    .await?;

    println!("App name: {}", app_name.cyan());
    println!("React Native version: {}", react_native.cyan());
    println!("React Native Module for CodePush version: {}", code_push.cyan());
    println!();

    let keys = register_all(runner, tools, work_dir, app_name).await?;

    step("Installing React Native...");
    let init = Invocation::new(&tools.react_native, work_dir).args([
        "init",
        app_name,
        "--version",
        react_native.as_str(),
    ]);
    run_checked(runner, &init).await?;
    done("React Native has been installed");

    step("Installing React Native Module for CodePush...");
    install_module(runner, tools, &project_dir, &code_push).await?;
    done("React Native Module for CodePush has been installed");

    step("Linking React Native Module for CodePush...");
    if let Err(e) = link_module(
        runner,
        tools,
        &packages.code_push_module,
        &project_dir,
        &keys,
        &config.link,
    )
    .await
    {
        return Err(CreateError::LinkFailed {
            module: packages.code_push_module.clone(),
            source: e,
        }
        .into());
    }
    done("React Native Module for CodePush has been linked");

    setup_assets(
        &project_dir,
        &config.fixtures_dir(work_dir),
        &config.fixtures.placeholder,
        app_name,
    )?;

    let patched = options.host == HostOs::Unix && !options.skip_patches;
    if patched {
        let folder =
            xcode_script_folder(runner, tools, work_dir, &packages.react_native, &react_native)
                .await;
        patch_debug_mode(&project_dir, app_name, folder)?;
        grant_access(runner, work_dir, app_name).await?;
    }

    println!();
    println!(
        "{}",
        format!(
            "React Native app \"{}\" has been generated and CodePushified!",
            app_name
        )
        .green()
        .bold()
    );

    Ok(Outcome {
        project_dir,
        react_native,
        code_push,
        keys,
        patched,
    })
}

fn step(message: &str) {
    println!("{}", message.bold());
}

fn done(message: &str) {
    println!("{}", message.green());
    println!();
}

use clap::Parser;
use colored::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "create-codepush-app")]
#[command(version)]
#[command(about = "Generate a CodePushified React Native app to reproduce issues or for testing")]
#[command(long_about = "Registers <APP_NAME>-android and <APP_NAME>-ios on CodePush, generates a \
React Native project, installs and links react-native-code-push with the Staging deployment keys, \
and replaces the entry files with the CodePush demo app.\n\n\
Requires react-native-cli and code-push-cli installed globally and a prior `code-push register`.")]
pub struct Cli {
    /// Name of the generated app (default: CodePushDemoAppTest)
    pub app_name: Option<String>,

    /// React Native version selector, e.g. react-native@0.45.1 (default: latest)
    pub react_native_version: Option<String>,

    /// CodePush module version selector, e.g. react-native-code-push@5.0.0 (default: latest)
    pub code_push_version: Option<String>,

    /// Directory holding the demo sources and images
    #[arg(long, env = "CODEPUSH_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    /// Seconds to wait for each link prompt and for the link tool to exit
    #[arg(long, env = "CODEPUSH_LINK_TIMEOUT")]
    pub link_timeout: Option<u64>,

    /// Do not patch native build files or fix permissions
    #[arg(long)]
    pub skip_patches: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

/// Error line printed on stderr before exiting with code 1
pub fn error_line(err: &anyhow::Error) -> String {
    format!("{} {:#}", "Error:".red().bold(), err)
}

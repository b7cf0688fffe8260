use anyhow::{Context, Result};
use semver::Version;
use std::path::Path;

use crate::config::ToolsConfig;
use crate::runner::{output_checked, run_checked, CommandRunner, Invocation};

/// First React Native release that ships `react-native-xcode.sh` under `scripts/`
pub const SCRIPTS_FOLDER_SINCE: &str = "0.46.0-rc.0";

/// Split `package@version` into its version part, if any.
/// A leading `@` belongs to a scoped package name.
pub fn version_part(selector: &str) -> Option<&str> {
    let at = selector.rfind('@').filter(|&i| i > 0)?;
    Some(&selector[at + 1..]).filter(|v| !v.is_empty())
}

/// Turn user input into a `package@version` selector.
/// Anything not already naming `package` is taken as its version or tag.
pub fn normalize_selector(package: &str, input: &str) -> String {
    let input = input.trim();
    let named = input
        .strip_prefix(package)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('@'));
    if named {
        input.to_string()
    } else {
        format!("{}@{}", package, input)
    }
}

/// Resolve a version selector, asking the registry for the latest version when none is given
pub async fn resolve_selector<R: CommandRunner>(
    runner: &R,
    tools: &ToolsConfig,
    work_dir: &Path,
    package: &str,
    explicit: Option<&str>,
) -> Result<String> {
    if let Some(input) = explicit {
        return Ok(normalize_selector(package, input));
    }

    let version = view_version(runner, tools, work_dir, package)
        .await
        .with_context(|| format!("Failed to look up latest version of {}", package))?;

    Ok(format!("{}@{}", package, version))
}

/// `npm view <spec> version`, returning the last reported version
async fn view_version<R: CommandRunner>(
    runner: &R,
    tools: &ToolsConfig,
    work_dir: &Path,
    spec: &str,
) -> Result<String> {
    let invocation = Invocation::new(&tools.npm, work_dir).args(["view", spec, "version"]);
    let stdout = output_checked(runner, &invocation).await?;

    // A range prints one `pkg@x.y.z 'x.y.z'` line per match
    stdout
        .split_whitespace()
        .last()
        .map(|v| v.trim_matches('\'').to_string())
        .context("npm printed no version")
}

/// Install the module into the project, saving it to package.json
pub async fn install_module<R: CommandRunner>(
    runner: &R,
    tools: &ToolsConfig,
    project_dir: &Path,
    selector: &str,
) -> Result<()> {
    let invocation = Invocation::new(&tools.npm, project_dir).args(["i", "--save", selector]);
    run_checked(runner, &invocation).await
}

/// Folder under `node_modules/react-native` holding `react-native-xcode.sh`.
/// Falls back to `scripts` whenever the version cannot be determined.
pub async fn xcode_script_folder<R: CommandRunner>(
    runner: &R,
    tools: &ToolsConfig,
    work_dir: &Path,
    package: &str,
    selector: &str,
) -> &'static str {
    let version = match version_part(selector).map(Version::parse) {
        Some(Ok(version)) => Some(version),
        // Dist-tag or range, ask the registry what it points at
        _ => {
            let spec = match version_part(selector) {
                Some(tag) => format!("{}@{}", package, tag),
                None => format!("{}@latest", package),
            };
            view_version(runner, tools, work_dir, &spec)
                .await
                .ok()
                .and_then(|v| Version::parse(&v).ok())
        }
    };

    match version {
        Some(version) => script_folder_for(&version),
        None => "scripts",
    }
}

pub fn script_folder_for(version: &Version) -> &'static str {
    match Version::parse(SCRIPTS_FOLDER_SINCE) {
        Ok(since) if *version < since => "packager",
        _ => "scripts",
    }
}

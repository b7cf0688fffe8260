//! Edits to generated native files so debug builds load bundles from CodePush

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::runner::{output_checked, run_checked, CommandRunner, Invocation};

pub const CODEPUSH_BUNDLE_URL: &str = "jsCodeLocation = [CodePush bundleURL];";

/// Lines of `react-native-xcode.sh` that skip bundling in Debug (1-based, inclusive)
pub const XCODE_DEBUG_SKIP_LINES: (usize, usize) = (17, 20);

/// Replace the first `#ifdef DEBUG ... #endif` block with the CodePush bundle URL
pub fn patch_app_delegate(text: &str) -> Result<String> {
    let re = Regex::new(r"(?s)#ifdef DEBUG.*?#endif")?;
    Ok(re.replacen(text, 1, CODEPUSH_BUNDLE_URL).into_owned())
}

/// Drop the Debug short-circuit from the xcode bundling script
pub fn patch_xcode_script(text: &str) -> String {
    let (first, last) = XCODE_DEBUG_SKIP_LINES;
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split_inclusive('\n').enumerate() {
        let number = i + 1;
        if number < first || number > last {
            out.push_str(line);
        }
    }
    out
}

/// Bundle JS for every Android build variant, not just release
pub fn patch_gradle(text: &str) -> Result<String> {
    let re = Regex::new(r#"(?m)targetName.toLowerCase\(\).contains\("release"\)$"#)?;
    Ok(re.replace_all(text, "true").into_owned())
}

/// Paths of the three patched files inside a generated project
pub fn patch_targets(project_dir: &Path, app_name: &str, xcode_folder: &str) -> [PathBuf; 3] {
    let rn = project_dir.join("node_modules").join("react-native");
    [
        project_dir.join("ios").join(app_name).join("AppDelegate.m"),
        rn.join(xcode_folder).join("react-native-xcode.sh"),
        rn.join("react.gradle"),
    ]
}

/// Apply all debug-mode patches in place
pub fn patch_debug_mode(project_dir: &Path, app_name: &str, xcode_folder: &str) -> Result<()> {
    let [delegate, xcode, gradle] = patch_targets(project_dir, app_name, xcode_folder);

    edit_file(&delegate, patch_app_delegate)?;
    edit_file(&xcode, |text| Ok(patch_xcode_script(text)))?;
    edit_file(&gradle, patch_gradle)?;

    Ok(())
}

fn edit_file(path: &Path, edit: impl FnOnce(&str) -> Result<String>) -> Result<()> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let patched = edit(&content).with_context(|| format!("Failed to patch {}", path.display()))?;
    fs::write(path, patched).with_context(|| format!("Failed to write {}", path.display()))
}

/// Give the current user ownership of `target` and make it world-readable
pub async fn grant_access<R: CommandRunner>(
    runner: &R,
    work_dir: &Path,
    target: &str,
) -> Result<()> {
    let whoami = Invocation::new("whoami", work_dir);
    let user = output_checked(runner, &whoami)
        .await
        .context("Failed to determine current user")?;

    let chown = Invocation::new("chown", work_dir).args(["-R", user.trim(), target]);
    run_checked(runner, &chown).await?;

    let chmod = Invocation::new("chmod", work_dir).args(["-R", "755", target]);
    run_checked(runner, &chmod).await
}

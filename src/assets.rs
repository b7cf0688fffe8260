use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Entry files generated by `react-native init` and replaced by the demo
pub const ENTRY_FILES: [&str; 2] = ["index.ios.js", "index.android.js"];

/// Demo sources copied from the fixture directory
pub const FIXTURE_FILES: [&str; 3] = ["demo.js", "index.ios.js", "index.android.js"];

/// Source file that carries the demo app name
pub const DEMO_FILE: &str = "demo.js";

pub const IMAGES_DIR: &str = "images";

/// Replace every occurrence of `placeholder` with `app_name`
pub fn replace_placeholder(text: &str, placeholder: &str, app_name: &str) -> String {
    if placeholder.is_empty() {
        return text.to_string();
    }
    text.replace(placeholder, app_name)
}

/// Swap the generated entry files for the demo app and rename it to `app_name`
pub fn setup_assets(
    project_dir: &Path,
    fixtures_dir: &Path,
    placeholder: &str,
    app_name: &str,
) -> Result<()> {
    if !fixtures_dir.is_dir() {
        bail!("Fixture directory not found: {}", fixtures_dir.display());
    }

    for name in ENTRY_FILES {
        let path = project_dir.join(name);
        fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }

    for name in FIXTURE_FILES {
        let src = fixtures_dir.join(name);
        let dest = project_dir.join(name);
        fs::copy(&src, &dest)
            .with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))?;
    }

    let images = fixtures_dir.join(IMAGES_DIR);
    if images.exists() {
        copy_dir_recursive(&images, &project_dir.join(IMAGES_DIR))?;
    }

    let demo = project_dir.join(DEMO_FILE);
    let content = fs::read_to_string(&demo)
        .with_context(|| format!("Failed to read {}", demo.display()))?;
    fs::write(&demo, replace_placeholder(&content, placeholder, app_name))
        .with_context(|| format!("Failed to write {}", demo.display()))?;

    Ok(())
}

/// Copy `src` into a new directory `dest`
pub fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir(dest).with_context(|| format!("Failed to create {}", dest.display()))?;

    for entry in fs::read_dir(src).with_context(|| format!("Failed to read {}", src.display()))? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }

    Ok(())
}

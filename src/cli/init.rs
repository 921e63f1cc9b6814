use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Directory the boilerplate is cloned into, relative to the cwd.
pub const OUTPUT_DIR: &str = "output";

const BOILERPLATE: &[(&str, &str)] = &[
    (
        "integration.yml",
        include_str!("../../boilerplate/integration.yml"),
    ),
    ("Dockerfile", include_str!("../../boilerplate/Dockerfile")),
    ("README.md", include_str!("../../boilerplate/README.md")),
];

pub fn run() -> Result<()> {
    let target = Path::new(OUTPUT_DIR);
    run_into(target)?;
    println!("Runtime API integration boilerplate cloned into {target:?}");
    Ok(())
}

/// Writes the embedded template files, leaving existing files untouched.
pub fn run_into(target: &Path) -> Result<()> {
    fs::create_dir_all(target).with_context(|| format!("creating {target:?}"))?;

    for (name, content) in BOILERPLATE {
        let path = target.join(name);
        if path.exists() {
            continue;
        }
        fs::write(&path, content).with_context(|| format!("writing template to {path:?}"))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_every_template_file() {
        let dir = tempfile::tempdir().unwrap();

        run_into(dir.path()).unwrap();

        assert!(dir.path().join("integration.yml").exists());
        assert!(dir.path().join("Dockerfile").exists());
        assert!(dir.path().join("README.md").exists());

        let config = fs::read_to_string(dir.path().join("integration.yml")).unwrap();
        assert!(config.contains("spec_version"));
        assert!(config.contains("slug"));
    }

    #[test]
    fn leaves_existing_files_untouched() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();

        run_into(dir.path()).unwrap();

        let kept = fs::read_to_string(dir.path().join("Dockerfile")).unwrap();
        assert_eq!(kept, "FROM scratch\n");
    }
}

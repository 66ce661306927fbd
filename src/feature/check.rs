use std::path::Path;

use log::info;

use crate::libs::{error::Result, release::Release, version::{SemanticVersion, VersionFile}};

/// Read the project version and verify its release notes are published.
pub fn check(root: &Path, version_file: &VersionFile) -> Result<SemanticVersion>
{
    let version = version_file.extract()?;

    let mut release = Release::new(root);
    release.check_version(&version.to_string())?;

    if let Some(date) = release.date()
    {
        info!("Version {} is ready to be released. Published on {}.", version, date.format("%Y/%m/%d"));
    }
    Ok(version)
}

#[cfg(test)]
pub(crate) fn write_project(root: &Path, version: &str, date: Option<&str>)
{
    std::fs::write(root.join("version.go"), format!("package main\n\nconst VERSION = \"{}\"\n", version)).unwrap();
    if let Some(date) = date
    {
        std::fs::create_dir_all(root.join("releases")).unwrap();
        std::fs::write(root.join(format!("releases/release-{}.md", version)), format!("# {}\n\ndate: {}\n", version, date)).unwrap();
    }
}

#[test]
fn test_check()
{
    let dir = tempfile::tempdir().unwrap();
    let version_file = VersionFile::new(dir.path().join("version.go")).unwrap();

    // No version file at all.
    assert_eq!(check(dir.path(), &version_file).unwrap_err().exit_code(), 3);

    write_project(dir.path(), "1.0.0", None);
    assert_eq!(check(dir.path(), &version_file).unwrap_err().exit_code(), 3);

    write_project(dir.path(), "1.0.0", Some("2999/01/01"));
    assert_eq!(check(dir.path(), &version_file).unwrap_err().exit_code(), 1);

    write_project(dir.path(), "1.0.0", Some("2000/01/01"));
    assert_eq!(check(dir.path(), &version_file).unwrap().to_string(), "1.0.0");
}

use std::{fmt::Display, fs, path::{Path, PathBuf}, str::FromStr};

use log::{debug, info};
use regex::Regex;

use super::error::{Error, Result};

/// `VERSION = "x.y.z"` as declared in a source file, any case, any spacing, `'` or `"` quoted.
pub const DEFAULT_VERSION_PATTERN: &str = concat!(
    r#"(?mi)VERSION\s*=\s*["']("#,
    r"(?:0|[1-9][0-9]*)\.(?:0|[1-9][0-9]*)\.(?:0|[1-9][0-9]*)",
    r"(?:-[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?",
    r"(?:\+[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?",
    r#")["']"#,
);

pub const DEFAULT_VERSION_FILE: &str = "version.go";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticVersion
{
    major: u64,
    minor: u64,
    patch: u64,

    // Prerelease & Build metadata
    prerelease: Option<String>,
    build: Option<String>,
}

impl FromStr for SemanticVersion
{
    type Err = Error;

    // Parse MAJOR.MINOR.PATCH[-prerelease][+build]
    fn from_str(version: &str) -> Result<SemanticVersion>
    {
        let invalid = || Error::Format(format!("'{}' is not a semantic version", version));

        let (version_part, build) = match version.split_once('+')
        {
            Some((head, build)) => (head, Some(build.to_string())),
            None => (version, None),
        };
        let (core, prerelease) = match version_part.split_once('-')
        {
            Some((head, prerelease)) => (head, Some(prerelease.to_string())),
            None => (version_part, None),
        };

        let numbers = core
            .split('.')
            .map(|part|
            {
                if part.len() > 1 && part.starts_with('0')
                {
                    return Err(invalid());
                }
                part.parse::<u64>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<u64>>>()?;

        if numbers.len() != 3
        {
            return Err(invalid());
        }

        let identifiers_ok = |value: &Option<String>| match value
        {
            Some(value) => value.split('.').all(|x| !x.is_empty() && x.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')),
            None => true,
        };
        if !identifiers_ok(&prerelease) || !identifiers_ok(&build)
        {
            return Err(invalid());
        }

        Ok(SemanticVersion { major: numbers[0], minor: numbers[1], patch: numbers[2], prerelease, build })
    }
}

impl Display for SemanticVersion
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        // x.x.x[-prerelease]
        if let Some(prerelease) = &self.prerelease
        {
            write!(f, "-{}", prerelease)?;
        }
        // x.x.x[-prerelease][+build]
        if let Some(build) = &self.build
        {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

/// Source file declaring the version of the project.
#[derive(Debug)]
pub struct VersionFile
{
    path: PathBuf,
    pattern: Regex,
}

impl VersionFile
{
    pub fn new(path: impl Into<PathBuf>) -> Result<VersionFile>
    {
        VersionFile::with_pattern(path, DEFAULT_VERSION_PATTERN)
    }

    /// `pattern` must hold exactly one capturing group around the version.
    pub fn with_pattern(path: impl Into<PathBuf>, pattern: &str) -> Result<VersionFile>
    {
        let pattern = Regex::new(pattern)
            .map_err(|error| Error::Config(format!("Invalid version pattern. {}", error)))?;
        if pattern.captures_len() != 2
        {
            return Err(Error::Config("The version pattern must hold exactly one capturing group".to_string()));
        }

        Ok(VersionFile { path: path.into(), pattern })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// Read the file and return the first declared version.
    pub fn extract(&self) -> Result<SemanticVersion>
    {
        debug!("Reading version from {}", self.path.display());
        let data = fs::read_to_string(&self.path)
            .map_err(|error| Error::io(&self.path, error))?;

        let version = self.pattern
            .captures(&data)
            .and_then(|captures| captures.get(1))
            .map(|found| found.as_str())
            .ok_or_else(|| Error::Format(format!("Unable to find a version declaration in {}", self.path.display())))?;

        let version = version.parse::<SemanticVersion>()?;
        info!("Version: {}", version);
        Ok(version)
    }
}

#[test]
fn test_parse()
{
    let version: SemanticVersion = "1.4.2-rc.1+build.5".parse().unwrap();
    assert_eq!((version.major, version.minor, version.patch), (1, 4, 2));
    assert_eq!(version.prerelease.as_deref(), Some("rc.1"));
    assert_eq!(version.build.as_deref(), Some("build.5"));
    assert_eq!(version.to_string(), "1.4.2-rc.1+build.5");

    assert!("1.4".parse::<SemanticVersion>().is_err());
    assert!("01.4.2".parse::<SemanticVersion>().is_err());
    assert!("1.4.2-".parse::<SemanticVersion>().is_err());
    assert!("1.x.2".parse::<SemanticVersion>().is_err());
}

#[test]
fn test_extract()
{
    let dir = tempfile::tempdir().unwrap();
    let cases = [
        ("package main\n\nconst VERSION = \"1.4.2\"\n", "1.4.2"),
        ("package main\n\nconst (\n\tVERSION    =    '0.10.0-beta.2'\n)\n", "0.10.0-beta.2"),
        ("version=\"3.0.1+20190301\"\n", "3.0.1+20190301"),
        ("var PRERELEASE = false\nvar VERSION= \"2.0.0\"\n", "2.0.0"),
    ];

    for (index, (content, expected)) in cases.iter().enumerate()
    {
        let path = dir.path().join(format!("version-{}.go", index));
        fs::write(&path, content).unwrap();

        let version = VersionFile::new(&path).unwrap().extract().unwrap();
        assert_eq!(version.to_string(), *expected);
    }
}

#[test]
fn test_extract_errors()
{
    let dir = tempfile::tempdir().unwrap();

    let missing = VersionFile::new(dir.path().join("version.go")).unwrap().extract();
    assert_eq!(missing.unwrap_err().exit_code(), 3);

    let path = dir.path().join("version.go");
    fs::write(&path, "package main\n\nconst NAME = \"relmgt\"\n").unwrap();
    let not_found = VersionFile::new(&path).unwrap().extract();
    assert_eq!(not_found.unwrap_err().exit_code(), 2);

    assert!(VersionFile::with_pattern(&path, r"VERSION = .*").is_err());
}

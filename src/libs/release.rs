use std::{fs, path::{Path, PathBuf}, sync::OnceLock};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use log::{debug, info, trace};
use regex::Regex;

use super::error::{Error, Result};

pub const DEFAULT_RELEASE_FILE: &str = "releases/release-{version}.md";
const PUBLISH_DATE_TAG: &str = "^ *date *: *";
const PUBLISH_DATE_LAYOUT: &str = "%Y/%m/%d";

static PUBLISH_DATE: OnceLock<Regex> = OnceLock::new();

/// `date: YYYY/MM/DD` on its own line, any case.
///
/// Built from constants only, so compiling it cannot fail.
fn publish_date_pattern() -> &'static Regex
{
    PUBLISH_DATE.get_or_init(|| {
        // (?m) => Match per line
        Regex::new(&format!("(?mi){}([0-9]{{4}}/[0-9]{{2}}/[0-9]{{2}})", PUBLISH_DATE_TAG))
            .expect("publish date pattern is valid")
    })
}

/// Release notes of a version, which decide when the version can be published.
#[derive(Debug)]
pub struct Release
{
    root:           PathBuf,
    file_template:  String,

    file:           Option<PathBuf>,
    date:           Option<NaiveDate>,
}

impl Release
{
    // Ctor
    pub fn new(root: impl Into<PathBuf>) -> Release
    {
        Release { root: root.into(), file_template: DEFAULT_RELEASE_FILE.to_string(), file: None, date: None }
    }

    /// Release notes file of the last checked version.
    pub fn file(&self) -> Option<&Path>
    {
        self.file.as_deref()
    }

    /// Publish date found by the last check.
    pub fn date(&self) -> Option<NaiveDate>
    {
        self.date
    }

    pub fn file_for(&self, version: &str) -> PathBuf
    {
        self.root.join(self.file_template.replace("{version}", version))
    }

    /// Check `version` against the wall clock.
    pub fn check_version(&mut self, version: &str) -> Result<()>
    {
        self.check_version_at(version, Utc::now())
    }

    /// Ok when the release notes of `version` are published at `now`.
    ///
    /// Checks run in order and the first failure wins:
    /// missing file (3), unreadable file (3), no publish date (2), date in the future (1).
    pub fn check_version_at(&mut self, version: &str, now: DateTime<Utc>) -> Result<()>
    {
        let file = self.file_for(version);
        self.file = Some(file.clone());
        self.date = None;

        // Status 3: File existence
        let metadata = fs::metadata(&file)
            .map_err(|error| Error::io(&file, format!("No release file found. {}", error)))?;
        if !metadata.is_file()
        {
            return Err(Error::io(&file, "It is not a regular file"));
        }

        let data = fs::read_to_string(&file)
            .map_err(|error| Error::io(&file, error))?;

        // Status 2: No date found
        let no_date = || Error::Format(format!("Unable to find the publish date at tag '{}' from {}", PUBLISH_DATE_TAG, file.display()));
        let found = publish_date_pattern()
            .captures(&data)
            .and_then(|captures| captures.get(1))
            .ok_or_else(no_date)?
            .as_str();
        let date = NaiveDate::parse_from_str(found, PUBLISH_DATE_LAYOUT).map_err(|_| no_date())?;
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(no_date)?;
        self.date = Some(date);

        // Status 1: Date is newer
        let diff = now.signed_duration_since(Utc.from_utc_datetime(&midnight));
        let hours = diff.num_hours();
        trace!("diff: {}s, truncated: {}h", diff.num_seconds(), hours);
        if hours < 0
        {
            debug!("Release {} is {}h ahead", version, -hours);
            return Err(Error::NotYetDue { version: version.to_string(), planned: found.to_string() });
        }

        // Status 0: Ready
        info!("Release {} published on {}. Ready.", version, found);
        Ok(())
    }
}

#[cfg(test)]
fn write_release(root: &Path, version: &str, content: &str)
{
    let dir = root.join("releases");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("release-{}.md", version)), content).unwrap();
}

#[cfg(test)]
fn frozen(rfc3339: &str) -> DateTime<Utc>
{
    DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
}

#[test]
fn test_check_version_ready()
{
    let dir = tempfile::tempdir().unwrap();
    write_release(dir.path(), "1.0.0", "# Release 1.0.0\n\ndate: 2000/01/01\n\n- first release\n");

    let mut release = Release::new(dir.path());
    assert!(release.check_version("1.0.0").is_ok());
    assert_eq!(release.date(), NaiveDate::from_ymd_opt(2000, 1, 1));
    assert_eq!(release.file(), Some(dir.path().join("releases/release-1.0.0.md").as_path()));
}

#[test]
fn test_check_version_not_yet_due()
{
    let dir = tempfile::tempdir().unwrap();
    write_release(dir.path(), "1.0.0", "# Release 1.0.0\nDate : 2999/01/01\n");

    let mut release = Release::new(dir.path());
    let error = release.check_version("1.0.0").unwrap_err();
    assert_eq!(error.exit_code(), 1);
    assert!(error.to_string().contains("2999/01/01"));
}

#[test]
fn test_check_version_missing()
{
    let dir = tempfile::tempdir().unwrap();
    let mut release = Release::new(dir.path());

    assert_eq!(release.check_version("1.0.0").unwrap_err().exit_code(), 3);

    // A directory is not a release file.
    fs::create_dir_all(dir.path().join("releases/release-1.0.0.md")).unwrap();
    assert_eq!(release.check_version("1.0.0").unwrap_err().exit_code(), 3);
}

#[test]
fn test_check_version_no_date()
{
    let dir = tempfile::tempdir().unwrap();
    write_release(dir.path(), "1.0.0", "# Release 1.0.0\n\nreleased: 2000/01/01\ndate: tomorrow\n");
    write_release(dir.path(), "1.0.1", "date: 2000/13/45\n");

    let mut release = Release::new(dir.path());
    assert_eq!(release.check_version("1.0.0").unwrap_err().exit_code(), 2);
    assert_eq!(release.check_version("1.0.1").unwrap_err().exit_code(), 2);
    assert_eq!(release.date(), None);
}

#[test]
fn test_check_version_frozen_clock()
{
    let dir = tempfile::tempdir().unwrap();
    write_release(dir.path(), "2.1.0", "date: 2019/06/15\n");
    let mut release = Release::new(dir.path());

    // Less than an hour before the date truncates to zero hours: ready.
    assert!(release.check_version_at("2.1.0", frozen("2019-06-14T23:30:00Z")).is_ok());
    // A full hour before is not due yet.
    assert_eq!(release.check_version_at("2.1.0", frozen("2019-06-14T23:00:00Z")).unwrap_err().exit_code(), 1);
    assert!(release.check_version_at("2.1.0", frozen("2019-06-15T00:00:00Z")).is_ok());

    // Same input, same answer.
    let now = frozen("2019-06-01T12:00:00Z");
    let first = release.check_version_at("2.1.0", now).map_err(|e| e.exit_code());
    let second = release.check_version_at("2.1.0", now).map_err(|e| e.exit_code());
    assert_eq!(first, second);
}

#[test]
fn test_publish_date_pattern()
{
    let pattern = publish_date_pattern();
    assert!(std::ptr::eq(pattern, publish_date_pattern()));

    let found = pattern.captures("# Notes\n  Date : 2021/03/04\n").unwrap();
    assert_eq!(&found[1], "2021/03/04");
    assert!(pattern.captures("released: 2021/03/04\n").is_none());
}

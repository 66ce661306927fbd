//! Error type shared by every release step.
//!
//! Each variant maps onto the process exit code contract, see [`Error::exit_code`].

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error
{
    /// A file is missing, not a regular file or cannot be read.
    #[error("Unable to read {}. {reason}", .path.display())]
    Io { path: PathBuf, reason: String },

    /// An expected pattern (version, publish date) was not found.
    #[error("{0}")]
    Format(String),

    /// The release notes carry a publish date in the future.
    #[error("The release {version} is currently planned for {planned}. Not ready now")]
    NotYetDue { version: String, planned: String },

    #[error("{context}. {source}")]
    Repository
    {
        context: String,
        #[source]
        source: git2::Error,
    },

    #[error("{0}")]
    Config(String),

    #[error("Invalid protocol '{0}'. Expected one of https, http or ssh")]
    UnsupportedProtocol(String),

    /// A step was called before the step it depends on.
    #[error("{0}")]
    Precondition(String),

    #[error("Unable to push to remote '{remote}'. {reason}")]
    Push { remote: String, reason: String },
}

impl Error
{
    pub fn repository(context: impl Into<String>, source: git2::Error) -> Error
    {
        Error::Repository { context: context.into(), source }
    }

    pub fn io(path: impl Into<PathBuf>, reason: impl ToString) -> Error
    {
        Error::Io { path: path.into(), reason: reason.to_string() }
    }

    /// Status returned to the caller as the process exit code.
    pub fn exit_code(&self) -> i32
    {
        match self
        {
            Error::Io { .. } => 3,
            Error::Format(_) => 2,
            Error::NotYetDue { .. }
            | Error::Repository { .. }
            | Error::Config(_)
            | Error::UnsupportedProtocol(_)
            | Error::Precondition(_)
            | Error::Push { .. } => 1,
        }
    }
}

#[test]
fn test_exit_codes()
{
    assert_eq!(Error::io("releases/release-1.0.0.md", "not found").exit_code(), 3);
    assert_eq!(Error::Format("no date".to_string()).exit_code(), 2);
    assert_eq!(Error::NotYetDue { version: "1.0.0".into(), planned: "2999/01/01".into() }.exit_code(), 1);
    assert_eq!(Error::UnsupportedProtocol("ftp".into()).exit_code(), 1);
    assert_eq!(Error::repository("Unable to resolve HEAD", git2::Error::from_str("boom")).exit_code(), 1);
}

#[test]
fn test_messages()
{
    let error = Error::NotYetDue { version: "1.2.0".into(), planned: "2999/01/01".into() };
    assert_eq!(error.to_string(), "The release 1.2.0 is currently planned for 2999/01/01. Not ready now");

    let error = Error::io("version.go", "No such file");
    assert_eq!(error.to_string(), "Unable to read version.go. No such file");
}

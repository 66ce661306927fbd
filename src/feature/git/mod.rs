//! Tag and upstream remote management.
//!
//! [`Git`] carries the release policy (idempotent tagging, transient push remote)
//! on top of a [`GitBackend`], the storage and transport capabilities of a repository.
//! [`Git2Backend`] provides them through libgit2.

use std::path::Path;

pub use git2::Oid;

use crate::libs::error::Result;

mod backend;
mod push;
mod remote;
mod tag;

#[cfg(test)]
pub(crate) mod fixtures;

pub use backend::Git2Backend;

pub const DEFAULT_FETCH_REMOTE: &str = "origin";

/// Repository capabilities used to tag and publish a release.
pub trait GitBackend
{
    /// Synchronize the tags of `remote`. Returns false when no such remote exists.
    fn fetch_tags(&mut self, remote: &str) -> Result<bool>;

    fn head_commit(&self) -> Result<Oid>;

    /// Commit targeted by the tag `name`, if it exists.
    fn tag_target(&self, name: &str) -> Result<Option<Oid>>;

    /// Create an annotated tag.
    fn create_tag(&mut self, name: &str, target: Oid, message: &str) -> Result<()>;

    fn delete_tag(&mut self, name: &str) -> Result<()>;

    fn remote_exists(&self, name: &str) -> Result<bool>;

    fn create_remote(&mut self, name: &str, url: &str) -> Result<()>;

    /// Removing a remote which does not exist succeeds.
    fn delete_remote(&mut self, name: &str) -> Result<()>;

    fn push(&mut self, remote: &str, refspec: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef
{
    pub name: String,
    pub target: Oid,
}

impl TagRef
{
    pub fn reference(&self) -> String
    {
        format!("refs/tags/{}", self.name)
    }

    /// Force the tag onto the same tag on the remote. The tag on HEAD wins over an upstream one left
    /// on an older commit.
    pub fn refspec(&self) -> String
    {
        let reference = self.reference();
        format!("+{}:{}", reference, reference)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHandle
{
    pub name: String,
    /// A remote found in place is never removed.
    pub was_preexisting: bool,
    pub auto_remove: bool,
}

pub struct Git<B: GitBackend>
{
    backend: B,

    fetch_remote: String,

    // Upstream setup
    remote_name: Option<String>,
    protocol: Option<String>,
    host: Option<String>,
    repo_path: Option<String>,

    // Provisioned during this run
    remote: Option<RemoteHandle>,
    tag: Option<TagRef>,
}

impl Git<Git2Backend>
{
    /// Open the repository at `path`.
    pub fn open(path: &Path) -> Result<Git<Git2Backend>>
    {
        Ok(Git::new(Git2Backend::open(path)?))
    }
}

impl<B: GitBackend> Git<B>
{
    pub fn new(backend: B) -> Git<B>
    {
        Git {
            backend,
            fetch_remote: DEFAULT_FETCH_REMOTE.to_string(),
            remote_name: None,
            protocol: None,
            host: None,
            repo_path: None,
            remote: None,
            tag: None,
        }
    }

    /// Defaults for the upstream remote. Empty values are ignored.
    pub fn set_remote(&mut self, name: Option<&str>, protocol: Option<&str>, host: Option<&str>, repo_path: Option<&str>)
    {
        let set = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_string);
        self.remote_name = set(name);
        self.protocol = set(protocol);
        self.host = set(host);
        self.repo_path = set(repo_path);
    }

    /// Remote the tags are synchronized from before tagging.
    pub fn set_fetch_remote(&mut self, name: &str)
    {
        self.fetch_remote = name.to_string();
    }

    pub fn backend(&self) -> &B
    {
        &self.backend
    }

    pub fn tag(&self) -> Option<&TagRef>
    {
        self.tag.as_ref()
    }

    pub fn remote(&self) -> Option<&RemoteHandle>
    {
        self.remote.as_ref()
    }
}

#[test]
fn test_refspec()
{
    let tag = TagRef { name: "1.4.2".to_string(), target: Oid::zero() };
    assert_eq!(tag.reference(), "refs/tags/1.4.2");
    assert_eq!(tag.refspec(), "+refs/tags/1.4.2:refs/tags/1.4.2");
}

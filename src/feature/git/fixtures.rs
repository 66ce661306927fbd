//! Scratch repositories and an in memory backend for tests.

use std::{collections::HashMap, fs, path::Path};

use git2::{Repository, Signature};

use super::{GitBackend, Oid};
use crate::libs::error::{Error, Result};

pub fn init_repo(path: &Path) -> Repository
{
    let repo = Repository::init(path).unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Release Bot").unwrap();
        config.set_str("user.email", "release-bot@example.com").unwrap();
    }
    repo
}

/// Commit a change of `CHANGES.md` on HEAD.
pub fn commit(repo: &Repository, message: &str) -> Oid
{
    let workdir = repo.workdir().unwrap();
    let file = workdir.join("CHANGES.md");
    let mut content = fs::read_to_string(&file).unwrap_or_default();
    content.push_str(message);
    content.push('\n');
    fs::write(&file, content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new("CHANGES.md")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let signature = Signature::now("Release Bot", "release-bot@example.com").unwrap();
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents = parent.iter().collect::<Vec<_>>();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents).unwrap()
}

pub fn oid(byte: u8) -> Oid
{
    Oid::from_bytes(&[byte; 20]).unwrap()
}

/// In memory repository recording every mutation.
#[derive(Debug, Default)]
pub struct FakeBackend
{
    pub head: Option<Oid>,
    pub tags: HashMap<String, Oid>,
    pub remotes: HashMap<String, String>,
    /// Tags served by the fetch remote, when it exists.
    pub upstream_tags: Option<HashMap<String, Oid>>,
    pub pushed: Vec<(String, String)>,
    pub fail_push: bool,
    pub fail_delete_remote: bool,

    pub fetches: usize,
    pub tags_created: usize,
    pub tags_deleted: usize,
    pub remotes_created: usize,
    pub remotes_deleted: usize,
}

impl FakeBackend
{
    pub fn with_head(head: Oid) -> FakeBackend
    {
        FakeBackend { head: Some(head), ..Default::default() }
    }
}

impl GitBackend for FakeBackend
{
    fn fetch_tags(&mut self, _remote: &str) -> Result<bool>
    {
        let Some(upstream) = &self.upstream_tags else
        {
            return Ok(false);
        };
        self.fetches += 1;
        self.tags.extend(upstream.iter().map(|(name, oid)| (name.clone(), *oid)));
        Ok(true)
    }

    fn head_commit(&self) -> Result<Oid>
    {
        self.head.ok_or_else(|| Error::repository("Unable to resolve HEAD", git2::Error::from_str("no commit")))
    }

    fn tag_target(&self, name: &str) -> Result<Option<Oid>>
    {
        Ok(self.tags.get(name).copied())
    }

    fn create_tag(&mut self, name: &str, target: Oid, _message: &str) -> Result<()>
    {
        if self.tags.contains_key(name)
        {
            return Err(Error::repository("Unable to create tag", git2::Error::from_str("tag already exists")));
        }
        self.tags_created += 1;
        self.tags.insert(name.to_string(), target);
        Ok(())
    }

    fn delete_tag(&mut self, name: &str) -> Result<()>
    {
        self.tags_deleted += 1;
        self.tags.remove(name);
        Ok(())
    }

    fn remote_exists(&self, name: &str) -> Result<bool>
    {
        Ok(self.remotes.contains_key(name))
    }

    fn create_remote(&mut self, name: &str, url: &str) -> Result<()>
    {
        self.remotes_created += 1;
        self.remotes.insert(name.to_string(), url.to_string());
        Ok(())
    }

    fn delete_remote(&mut self, name: &str) -> Result<()>
    {
        if self.fail_delete_remote
        {
            return Err(Error::repository(format!("Unable to remove remote '{}'", name), git2::Error::from_str("config locked")));
        }
        self.remotes_deleted += 1;
        self.remotes.remove(name);
        Ok(())
    }

    fn push(&mut self, remote: &str, refspec: &str) -> Result<()>
    {
        if self.fail_push || !self.remotes.contains_key(remote)
        {
            return Err(Error::Push { remote: remote.to_string(), reason: "connection refused".to_string() });
        }
        self.pushed.push((remote.to_string(), refspec.to_string()));
        Ok(())
    }
}

use std::path::Path;

use git2::{Cred, CredentialType, ErrorCode, FetchOptions, ObjectType, PushOptions, RemoteCallbacks, Repository, Signature};
use log::{debug, trace};

use super::{GitBackend, Oid};
use crate::libs::error::{Error, Result};

const TAGS_REFSPEC: &str = "+refs/tags/*:refs/tags/*";
const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;

/// [`GitBackend`] on a libgit2 repository with a work tree.
pub struct Git2Backend
{
    repo: Repository,
}

impl Git2Backend
{
    pub fn open(path: &Path) -> Result<Git2Backend>
    {
        let repo = Repository::open(path)
            .map_err(|error| Error::repository(format!("{} is not a valid GIT repository", path.display()), error))?;

        if repo.is_bare()
        {
            return Err(Error::repository(format!("Unable to open {}", path.display()), git2::Error::from_str("repository is bare")));
        }

        debug!("Repository {} opened", path.display());
        Ok(Git2Backend { repo })
    }

    fn signature(&self) -> Result<Signature<'static>>
    {
        // Fall back to a tool identity on CI hosts without user.name/user.email.
        self.repo
            .signature()
            .or_else(|_| Signature::now("simple-relmgt", "simple-relmgt@localhost"))
            .map_err(|error| Error::repository("Unable to build the tagger signature", error))
    }
}

/// Credentials for ssh (agent, or the key at `GIT_SSH_KEY_PATH`) and http (git credential helpers).
fn remote_callbacks<'a>() -> RemoteCallbacks<'a>
{
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0;
    callbacks.credentials(move |url, username_from_url, allowed|
    {
        // libgit2 asks again as long as the credentials are refused.
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS
        {
            return Err(git2::Error::from_str("authentication failed"));
        }

        let user = username_from_url.unwrap_or("git");
        if allowed.contains(CredentialType::SSH_KEY)
        {
            if let Ok(key) = std::env::var("GIT_SSH_KEY_PATH")
            {
                return Cred::ssh_key(user, None, Path::new(&key), None);
            }
            return Cred::ssh_key_from_agent(user);
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT)
        {
            let config = git2::Config::open_default()?;
            return Cred::credential_helper(&config, url, username_from_url);
        }
        Cred::default()
    });
    callbacks
}

fn find_remote<'r>(repo: &'r Repository, name: &str) -> Result<Option<git2::Remote<'r>>>
{
    match repo.find_remote(name)
    {
        Ok(remote) => Ok(Some(remote)),
        Err(error) if error.code() == ErrorCode::NotFound => Ok(None),
        Err(error) => Err(Error::repository(format!("Unable to load remote '{}'", name), error)),
    }
}

impl GitBackend for Git2Backend
{
    fn fetch_tags(&mut self, remote: &str) -> Result<bool>
    {
        let Some(mut found) = find_remote(&self.repo, remote)? else
        {
            return Ok(false);
        };

        let mut options = FetchOptions::new();
        options.remote_callbacks(remote_callbacks());
        found
            .fetch(&[TAGS_REFSPEC], Some(&mut options), None)
            .map_err(|error| Error::repository(format!("Unable to fetch tags from '{}'", remote), error))?;
        Ok(true)
    }

    fn head_commit(&self) -> Result<Oid>
    {
        let commit = self.repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|error| Error::repository("Unable to resolve HEAD", error))?;
        Ok(commit.id())
    }

    fn tag_target(&self, name: &str) -> Result<Option<Oid>>
    {
        let reference = match self.repo.find_reference(&format!("refs/tags/{}", name))
        {
            Ok(reference) => reference,
            Err(error) if error.code() == ErrorCode::NotFound => return Ok(None),
            Err(error) => return Err(Error::repository(format!("Unable to read tag '{}'", name), error)),
        };

        let commit = reference
            .peel_to_commit()
            .map_err(|error| Error::repository(format!("Tag '{}' does not point to a commit", name), error))?;
        Ok(Some(commit.id()))
    }

    fn create_tag(&mut self, name: &str, target: Oid, message: &str) -> Result<()>
    {
        let object = self.repo
            .find_object(target, Some(ObjectType::Commit))
            .map_err(|error| Error::repository(format!("Unable to find commit {}", target), error))?;
        let tagger = self.signature()?;

        let tag_oid = self.repo
            .tag(name, &object, &tagger, message, false)
            .map_err(|error| Error::repository(format!("Unable to create tag '{}'", name), error))?;
        trace!("Tag object {} created for {}", tag_oid, name);
        Ok(())
    }

    fn delete_tag(&mut self, name: &str) -> Result<()>
    {
        self.repo
            .tag_delete(name)
            .map_err(|error| Error::repository(format!("Unable to delete tag '{}'", name), error))
    }

    fn remote_exists(&self, name: &str) -> Result<bool>
    {
        Ok(find_remote(&self.repo, name)?.is_some())
    }

    fn create_remote(&mut self, name: &str, url: &str) -> Result<()>
    {
        self.repo
            .remote(name, url)
            .map_err(|error| Error::repository(format!("Unable to create remote '{}'", name), error))?;
        Ok(())
    }

    fn delete_remote(&mut self, name: &str) -> Result<()>
    {
        match self.repo.remote_delete(name)
        {
            Ok(()) => Ok(()),
            Err(error) if error.code() == ErrorCode::NotFound => Ok(()),
            Err(error) => Err(Error::repository(format!("Unable to remove remote '{}'", name), error)),
        }
    }

    fn push(&mut self, remote: &str, refspec: &str) -> Result<()>
    {
        let push_error = |reason: String| Error::Push { remote: remote.to_string(), reason };

        let mut found = find_remote(&self.repo, remote)?
            .ok_or_else(|| push_error("Remote not found".to_string()))?;

        let mut rejected = Vec::<String>::new();
        {
            let mut callbacks = remote_callbacks();
            callbacks.push_update_reference(|reference, status|
            {
                if let Some(status) = status
                {
                    rejected.push(format!("{} rejected: {}", reference, status));
                }
                Ok(())
            });

            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);
            found
                .push(&[refspec], Some(&mut options))
                .map_err(|error| push_error(error.message().to_string()))?;
        }

        if !rejected.is_empty()
        {
            return Err(push_error(rejected.join(", ")));
        }
        Ok(())
    }
}

#[test]
fn test_open()
{
    let dir = tempfile::tempdir().unwrap();
    assert!(Git2Backend::open(dir.path()).is_err());

    let bare = dir.path().join("bare.git");
    Repository::init_bare(&bare).unwrap();
    assert!(Git2Backend::open(&bare).is_err());
}

#[test]
fn test_tags()
{
    use super::fixtures::{commit, init_repo};

    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(dir.path());
    let first = commit(&repo, "first");
    let mut backend = Git2Backend::open(dir.path()).unwrap();

    assert_eq!(backend.head_commit().unwrap(), first);
    assert_eq!(backend.tag_target("1.0.0").unwrap(), None);

    backend.create_tag("1.0.0", first, "Release: 1.0.0").unwrap();
    assert_eq!(backend.tag_target("1.0.0").unwrap(), Some(first));
    let tag = repo.revparse_single("refs/tags/1.0.0").unwrap();
    assert!(tag.as_tag().is_some(), "expected an annotated tag");

    // No silent overwrite.
    assert!(backend.create_tag("1.0.0", first, "Release: 1.0.0").is_err());

    backend.delete_tag("1.0.0").unwrap();
    assert_eq!(backend.tag_target("1.0.0").unwrap(), None);
}

#[test]
fn test_remotes()
{
    use super::fixtures::{commit, init_repo};

    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(dir.path());
    commit(&repo, "first");
    let mut backend = Git2Backend::open(dir.path()).unwrap();

    assert!(!backend.remote_exists("ci-upstream").unwrap());
    assert!(!backend.fetch_tags("origin").unwrap());

    backend.create_remote("ci-upstream", "https://github.com/org/repo").unwrap();
    assert!(backend.remote_exists("ci-upstream").unwrap());
    assert_eq!(repo.find_remote("ci-upstream").unwrap().url(), Some("https://github.com/org/repo"));

    backend.delete_remote("ci-upstream").unwrap();
    assert!(!backend.remote_exists("ci-upstream").unwrap());
    backend.delete_remote("ci-upstream").unwrap();
}

#[test]
fn test_fetch_and_push()
{
    use super::fixtures::{commit, init_repo};

    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let upstream = dir.path().join("upstream.git");
    let repo = init_repo(&work);
    let head = commit(&repo, "first");
    let upstream_repo = Repository::init_bare(&upstream).unwrap();
    repo.remote("origin", upstream.to_str().unwrap()).unwrap();

    let mut backend = Git2Backend::open(&work).unwrap();
    backend.create_tag("0.1.0", head, "Release: 0.1.0").unwrap();
    backend.push("origin", "refs/tags/0.1.0:refs/tags/0.1.0").unwrap();
    let pushed = upstream_repo.find_reference("refs/tags/0.1.0").unwrap();
    assert_eq!(pushed.peel_to_commit().unwrap().id(), head);

    // Tags only known upstream come back with a fetch.
    backend.delete_tag("0.1.0").unwrap();
    assert!(backend.fetch_tags("origin").unwrap());
    assert_eq!(backend.tag_target("0.1.0").unwrap(), Some(head));

    assert!(matches!(backend.push("missing", "refs/tags/0.1.0:refs/tags/0.1.0"), Err(Error::Push { .. })));
}

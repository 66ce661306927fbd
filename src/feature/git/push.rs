use log::{debug, info, trace};

use super::{Git, GitBackend};
use crate::libs::error::{Error, Result};

impl<B: GitBackend> Git<B>
{
    /// Push the tag created by this run to the provisioned remote.
    pub fn push_tag(&mut self) -> Result<()>
    {
        let remote = self.remote
            .as_ref()
            .ok_or_else(|| Error::Precondition("No remote provisioned. Unable to push the tag".to_string()))?;
        let tag = self.tag
            .as_ref()
            .ok_or_else(|| Error::Precondition("No tag created. Nothing to push".to_string()))?;

        let refspec = tag.refspec();
        debug!("Pushing {} to '{}'", refspec, remote.name);
        self.backend.push(&remote.name, &refspec)?;
        info!("Tag '{}' pushed to '{}'", tag.name, remote.name);
        Ok(())
    }

    /// Remove the remote provisioned by this run, unless it was found in place or kept on request.
    ///
    /// Safe to call at any point, and more than once.
    pub fn clean_remote(&mut self) -> Result<()>
    {
        let Some(remote) = self.remote.take() else
        {
            return Ok(());
        };

        if remote.was_preexisting || !remote.auto_remove
        {
            debug!("Remote '{}' kept.", remote.name);
            return Ok(());
        }

        self.backend.delete_remote(&remote.name)?;
        trace!("Remote '{}' removed.", remote.name);
        Ok(())
    }
}

#[cfg(test)]
fn provisioned(backend: super::fixtures::FakeBackend) -> Git<super::fixtures::FakeBackend>
{
    use crate::libs::remote::RemoteOptions;

    let mut git = Git::new(backend);
    git.set_remote(None, None, Some("github.com"), Some("/org/repo"));
    git.create_or_update_tag("1.0.0").unwrap();
    git.provision_remote(&RemoteOptions::new()).unwrap();
    git
}

#[test]
fn test_push_tag()
{
    use super::fixtures::{oid, FakeBackend};

    let mut git = provisioned(FakeBackend::with_head(oid(1)));
    git.push_tag().unwrap();

    assert_eq!(git.backend().pushed, vec![("ci-upstream".to_string(), "+refs/tags/1.0.0:refs/tags/1.0.0".to_string())]);
}

#[test]
fn test_push_requires_tag_and_remote()
{
    use super::fixtures::{oid, FakeBackend};

    let mut git = Git::new(FakeBackend::with_head(oid(1)));
    assert!(matches!(git.push_tag(), Err(Error::Precondition(_))));

    git.set_remote(None, None, Some("github.com"), Some("/org/repo"));
    git.provision_remote(&crate::libs::remote::RemoteOptions::new()).unwrap();
    assert!(matches!(git.push_tag(), Err(Error::Precondition(_))));
    assert!(git.backend().pushed.is_empty());
}

#[test]
fn test_clean_remote()
{
    use super::fixtures::{oid, FakeBackend};

    let mut backend = FakeBackend::with_head(oid(1));
    backend.fail_push = true;
    let mut git = provisioned(backend);

    assert!(matches!(git.push_tag(), Err(Error::Push { .. })));
    git.clean_remote().unwrap();
    assert!(git.backend().remotes.is_empty());
    assert_eq!(git.backend().remotes_deleted, 1);

    // Second call is a no-op.
    git.clean_remote().unwrap();
    assert_eq!(git.backend().remotes_deleted, 1);
}

#[test]
fn test_clean_remote_keeps_existing()
{
    use super::fixtures::{oid, FakeBackend};

    let mut backend = FakeBackend::with_head(oid(1));
    backend.remotes.insert("ci-upstream".to_string(), "https://github.com/org/repo".to_string());
    let mut git = provisioned(backend);
    assert!(git.remote().unwrap().was_preexisting);

    git.push_tag().unwrap();
    git.clean_remote().unwrap();
    git.clean_remote().unwrap();
    assert_eq!(git.backend().remotes_deleted, 0);
    assert!(git.backend().remotes.contains_key("ci-upstream"));

    // Nothing provisioned, nothing removed.
    let mut git = Git::new(FakeBackend::with_head(oid(1)));
    git.clean_remote().unwrap();
    assert_eq!(git.backend().remotes_deleted, 0);
}

#[test]
fn test_clean_remote_kept_on_request()
{
    use super::fixtures::{oid, FakeBackend};
    use crate::libs::remote::RemoteOptions;

    let mut git = Git::new(FakeBackend::with_head(oid(1)));
    git.set_remote(None, None, Some("github.com"), Some("/org/repo"));
    git.provision_remote(&RemoteOptions::new().auto_remove_remote(Some("false"))).unwrap();

    git.clean_remote().unwrap();
    assert!(git.backend().remotes.contains_key("ci-upstream"));
}

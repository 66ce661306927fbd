use log::{debug, info, trace, warn};

use super::{Git, GitBackend, TagRef};
use crate::libs::error::Result;

impl<B: GitBackend> Git<B>
{
    /// Create the annotated tag `name` on HEAD, or move it there.
    ///
    /// Tags are synchronized from the fetch remote first. A tag already on HEAD is left untouched.
    pub fn create_or_update_tag(&mut self, name: &str) -> Result<TagRef>
    {
        if self.backend.fetch_tags(&self.fetch_remote)?
        {
            debug!("Tags synchronized from '{}'", self.fetch_remote);
        }
        else
        {
            warn!("Remote '{}' not found. Tags not synchronized.", self.fetch_remote);
        }

        let head = self.backend.head_commit()?;
        trace!("HEAD is {}", head);

        let message = format!("Release: {}", name);
        match self.backend.tag_target(name)?
        {
            Some(target) if target == head =>
            {
                info!("Tag '{}' already set on {}. Nothing to do.", name, head);
            },
            Some(target) =>
            {
                info!("Tag '{}' moved from {} to {}", name, target, head);
                self.backend.delete_tag(name)?;
                self.backend.create_tag(name, head, &message)?;
            },
            None =>
            {
                self.backend.create_tag(name, head, &message)?;
                info!("Tag '{}' created on {}", name, head);
            },
        }

        let tag = TagRef { name: name.to_string(), target: head };
        self.tag = Some(tag.clone());
        Ok(tag)
    }
}

#[test]
fn test_create_tag()
{
    use super::fixtures::{oid, FakeBackend};

    let mut git = Git::new(FakeBackend::with_head(oid(1)));

    let tag = git.create_or_update_tag("1.0.0").unwrap();
    assert_eq!(tag, TagRef { name: "1.0.0".to_string(), target: oid(1) });
    assert_eq!(git.tag(), Some(&tag));
    assert_eq!(git.backend().tags.get("1.0.0"), Some(&oid(1)));
    assert_eq!(git.backend().tags_created, 1);
}

#[test]
fn test_create_tag_idempotent()
{
    use super::fixtures::{oid, FakeBackend};

    let mut git = Git::new(FakeBackend::with_head(oid(1)));
    git.create_or_update_tag("1.0.0").unwrap();
    git.create_or_update_tag("1.0.0").unwrap();

    assert_eq!(git.backend().tags_created, 1);
    assert_eq!(git.backend().tags_deleted, 0);
}

#[test]
fn test_update_tag()
{
    use super::fixtures::{oid, FakeBackend};

    let mut backend = FakeBackend::with_head(oid(2));
    // The upstream tag wins over the local one, then moves to HEAD.
    backend.tags.insert("1.0.0".to_string(), oid(9));
    backend.upstream_tags = Some([("1.0.0".to_string(), oid(1))].into_iter().collect());

    let mut git = Git::new(backend);
    let tag = git.create_or_update_tag("1.0.0").unwrap();

    assert_eq!(tag.target, oid(2));
    assert_eq!(git.backend().fetches, 1);
    assert_eq!(git.backend().tags_deleted, 1);
    assert_eq!(git.backend().tags_created, 1);
    assert_eq!(git.backend().tags.get("1.0.0"), Some(&oid(2)));
}

#[test]
fn test_create_tag_without_head()
{
    use super::fixtures::FakeBackend;

    let mut git = Git::new(FakeBackend::default());
    let error = git.create_or_update_tag("1.0.0").unwrap_err();
    assert_eq!(error.exit_code(), 1);
    assert!(git.tag().is_none());
}

#[test]
fn test_tag_follows_head()
{
    use super::fixtures::{commit, init_repo};

    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();

    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(dir.path());
    commit(&repo, "first");

    let mut git = Git::open(dir.path()).unwrap();
    let first = git.create_or_update_tag("1.0.0").unwrap();
    assert_eq!(first.target, repo.head().unwrap().peel_to_commit().unwrap().id());

    let second = commit(&repo, "second");
    let moved = git.create_or_update_tag("1.0.0").unwrap();
    assert_eq!(moved.target, second);
    let tagged = repo.find_reference("refs/tags/1.0.0").unwrap().peel_to_commit().unwrap();
    assert_eq!(tagged.id(), second);
}

use std::path::Path;

use log::{error, info};

use super::{check::check, git::{Git, GitBackend, TagRef, DEFAULT_FETCH_REMOTE}};
use crate::libs::{data::RelMgtData, error::Result, remote::RemoteOptions, version::VersionFile};

/// Tag a ready release and push the tag upstream.
///
/// Stops on the first failure. The push remote is cleaned up once the repository is opened, whatever happens.
pub fn tag_it(root: &Path, data: &RelMgtData, version_file: &VersionFile, options: &RemoteOptions) -> Result<TagRef>
{
    let version = check(root, version_file)?;

    let mut git = Git::open(root)?;
    let upstream = &data.upstream;
    git.set_remote(upstream.name.as_deref(), upstream.protocol.as_deref(), upstream.host.as_deref(), upstream.repo_path.as_deref());
    git.set_fetch_remote(data.fetch_remote.as_deref().unwrap_or(DEFAULT_FETCH_REMOTE));

    tag(&mut git, &version.to_string(), options)
}

/// Tag, provision, push, then always clean the remote.
///
/// A cleanup failure is reported but never replaces the result of the push.
pub fn tag<B: GitBackend>(git: &mut Git<B>, name: &str, options: &RemoteOptions) -> Result<TagRef>
{
    let result = publish(git, name, options);

    if let Err(cleanup) = git.clean_remote()
    {
        error!("Unable to clean the push remote. {}", cleanup);
    }
    result
}

fn publish<B: GitBackend>(git: &mut Git<B>, name: &str, options: &RemoteOptions) -> Result<TagRef>
{
    let tag = git.create_or_update_tag(name)?;
    let remote = git.provision_remote(options)?;
    git.push_tag()?;

    info!("Release {} tagged on {} and published to '{}'", tag.name, tag.target, remote.name);
    Ok(tag)
}

#[cfg(test)]
fn upstream(host: &str, repo_path: &str) -> RelMgtData
{
    let mut data = RelMgtData::default();
    data.upstream.host = Some(host.to_string());
    data.upstream.repo_path = Some(repo_path.to_string());
    data
}

#[test]
fn test_tag_it_existing_remote()
{
    use super::{check::write_project, git::fixtures::{commit, init_repo}};

    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();

    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let bare = dir.path().join("upstream.git");
    let repo = init_repo(&work);
    write_project(&work, "1.0.0", Some("2000/01/01"));
    let head = commit(&repo, "Release 1.0.0");
    let upstream_repo = git2::Repository::init_bare(&bare).unwrap();
    repo.remote("ci-upstream", bare.to_str().unwrap()).unwrap();

    let version_file = VersionFile::new(work.join("version.go")).unwrap();
    let data = upstream("github.com", "/org/repo");
    let tag = tag_it(&work, &data, &version_file, &RemoteOptions::new()).unwrap();

    assert_eq!(tag.name, "1.0.0");
    assert_eq!(tag.target, head);
    let pushed = upstream_repo.find_reference("refs/tags/1.0.0").unwrap().peel_to_commit().unwrap();
    assert_eq!(pushed.id(), head);
    // Found in place, so kept.
    assert!(repo.find_remote("ci-upstream").is_ok());
}

#[test]
fn test_tag_it_not_ready()
{
    use super::{check::write_project, git::fixtures::{commit, init_repo}};

    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(dir.path());
    write_project(dir.path(), "1.1.0", Some("2999/01/01"));
    commit(&repo, "Release 1.1.0");

    let version_file = VersionFile::new(dir.path().join("version.go")).unwrap();
    let data = upstream("github.com", "/org/repo");
    let error = tag_it(dir.path(), &data, &version_file, &RemoteOptions::new()).unwrap_err();

    assert_eq!(error.exit_code(), 1);
    assert!(repo.tag_names(None).unwrap().is_empty());
    assert!(repo.find_remote("ci-upstream").is_err());
}

#[test]
fn test_tag_it_push_failure_cleans_remote()
{
    use super::{check::write_project, git::fixtures::{commit, init_repo}};
    use crate::libs::error::Error;

    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(dir.path());
    write_project(dir.path(), "1.2.0", Some("2000/01/01"));
    commit(&repo, "Release 1.2.0");

    let version_file = VersionFile::new(dir.path().join("version.go")).unwrap();
    // Nothing listens on port 1.
    let data = upstream("127.0.0.1:1", "/org/repo");
    let options = RemoteOptions::new().protocol(Some("http"));
    let error = tag_it(dir.path(), &data, &version_file, &options).unwrap_err();

    assert!(matches!(error, Error::Push { .. }), "unexpected error: {}", error);
    assert!(repo.find_reference("refs/tags/1.2.0").is_ok());
    assert!(repo.find_remote("ci-upstream").is_err());
}

#[test]
fn test_tag_cleans_after_config_error()
{
    use super::git::fixtures::{oid, FakeBackend};

    let mut git = Git::new(FakeBackend::with_head(oid(3)));
    let error = tag(&mut git, "2.0.0", &RemoteOptions::new()).unwrap_err();

    assert_eq!(error.exit_code(), 1);
    assert!(git.remote().is_none());
    assert_eq!(git.backend().tags_created, 1);
    assert!(git.backend().pushed.is_empty());
}

#[test]
fn test_tag_it_moves_upstream_tag()
{
    use super::{check::write_project, git::fixtures::{commit, init_repo}};

    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let bare = dir.path().join("upstream.git");
    let repo = init_repo(&work);
    write_project(&work, "1.0.0", Some("2000/01/01"));
    let first = commit(&repo, "Release 1.0.0");
    let upstream_repo = git2::Repository::init_bare(&bare).unwrap();
    repo.remote("ci-upstream", bare.to_str().unwrap()).unwrap();

    let version_file = VersionFile::new(work.join("version.go")).unwrap();
    let data = upstream("github.com", "/org/repo");
    tag_it(&work, &data, &version_file, &RemoteOptions::new()).unwrap();
    let pushed = upstream_repo.find_reference("refs/tags/1.0.0").unwrap().peel_to_commit().unwrap();
    assert_eq!(pushed.id(), first);

    // Late fix on the same version. The old tag comes back through the fetch remote.
    repo.remote("origin", bare.to_str().unwrap()).unwrap();
    let head = commit(&repo, "Fix 1.0.0");
    let tag = tag_it(&work, &data, &version_file, &RemoteOptions::new()).unwrap();

    assert_eq!(tag.target, head);
    let local = repo.find_reference("refs/tags/1.0.0").unwrap().peel_to_commit().unwrap();
    assert_eq!(local.id(), head);
    let pushed = upstream_repo.find_reference("refs/tags/1.0.0").unwrap().peel_to_commit().unwrap();
    assert_eq!(pushed.id(), head);
}

#[test]
fn test_tag_ignores_cleanup_failure()
{
    use super::git::fixtures::{oid, FakeBackend};

    let mut backend = FakeBackend::with_head(oid(4));
    backend.fail_delete_remote = true;
    let mut git = Git::new(backend);
    git.set_remote(None, None, Some("github.com"), Some("/org/repo"));

    let tag = tag(&mut git, "2.1.0", &RemoteOptions::new()).unwrap();

    assert_eq!(tag.name, "2.1.0");
    assert_eq!(tag.target, oid(4));
    assert_eq!(git.backend().pushed.len(), 1);
    assert_eq!(git.backend().remotes_deleted, 0);
    assert!(git.remote().is_none());
}

#[test]
fn test_tag_keeps_push_error_over_cleanup_failure()
{
    use super::git::fixtures::{oid, FakeBackend};
    use crate::libs::error::Error;

    let mut backend = FakeBackend::with_head(oid(5));
    backend.fail_push = true;
    backend.fail_delete_remote = true;
    let mut git = Git::new(backend);
    git.set_remote(None, None, Some("github.com"), Some("/org/repo"));

    let error = tag(&mut git, "2.2.0", &RemoteOptions::new()).unwrap_err();

    assert!(matches!(error, Error::Push { ref remote, .. } if remote == "ci-upstream"), "unexpected error: {}", error);
    assert!(git.backend().pushed.is_empty());
    assert_eq!(git.backend().tags_created, 1);
}

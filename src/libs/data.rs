use std::{fs, io, path::Path};

use log::{info, warn};

use super::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "release-mgt.yaml";

#[derive(serde::Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct RelMgtDataUpstream
{
    pub name: Option<String>,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub repo_path: Option<String>,
}

#[derive(serde::Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct RelMgtData
{
    pub version_file: Option<String>,
    pub fetch_remote: Option<String>,
    pub upstream: RelMgtDataUpstream,
}

impl RelMgtData
{
    /// Load the configuration. A missing file falls back to the defaults.
    pub fn load(file: &Path) -> Result<RelMgtData>
    {
        let data = match fs::read_to_string(file)
        {
            Ok(data) => data,
            Err(error) if error.kind() == io::ErrorKind::NotFound =>
            {
                warn!("{} not loaded. {}", file.display(), error);
                return Ok(RelMgtData::default());
            },
            Err(error) => return Err(Error::Config(format!("Unable to load '{}'. {}", file.display(), error))),
        };

        let loaded = RelMgtData::parse(&data)
            .map_err(|error| Error::Config(format!("Unable to read yaml file '{}'. {}", file.display(), error)))?;
        info!("{} loaded.", file.display());
        Ok(loaded)
    }

    pub fn parse(data: &str) -> std::result::Result<RelMgtData, serde_yaml::Error>
    {
        // An empty document is a valid, empty configuration.
        if data.trim().is_empty()
        {
            return Ok(RelMgtData::default());
        }
        serde_yaml::from_str(data)
    }
}

#[test]
fn test_parse()
{
    let data = RelMgtData::parse(
        "version-file: src/version.go\nupstream:\n  name: upstream\n  protocol: ssh\n  host: github.com\n  repo-path: forj-oss/simple-relmgt\n",
    ).unwrap();

    assert_eq!(data.version_file.as_deref(), Some("src/version.go"));
    assert_eq!(data.fetch_remote, None);
    assert_eq!(data.upstream.name.as_deref(), Some("upstream"));
    assert_eq!(data.upstream.protocol.as_deref(), Some("ssh"));
    assert_eq!(data.upstream.host.as_deref(), Some("github.com"));
    assert_eq!(data.upstream.repo_path.as_deref(), Some("forj-oss/simple-relmgt"));

    assert_eq!(RelMgtData::parse("").unwrap(), RelMgtData::default());
}

#[test]
fn test_load()
{
    let dir = tempfile::tempdir().unwrap();

    let missing = RelMgtData::load(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
    assert_eq!(missing, RelMgtData::default());

    let file = dir.path().join(DEFAULT_CONFIG_FILE);
    fs::write(&file, "upstream: [not, a, map]\n").unwrap();
    assert!(matches!(RelMgtData::load(&file), Err(Error::Config(_))));
}

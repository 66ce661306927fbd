#![cfg_attr(feature = "strict", deny(warnings))]

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};

use simple_relmgt::{feature, libs::{data::{RelMgtData, DEFAULT_CONFIG_FILE}, error::Result, remote::RemoteOptions, version::{VersionFile, DEFAULT_VERSION_FILE}}};

/// Status of a command which is not implemented yet.
const NOT_IMPLEMENTED: i32 = 5;

#[derive(Parser, Debug)]
#[command(name = "simple-relmgt", version, about = "Simple release management tool.", long_about = None)]
struct Cli
{
    /// Configuration file. Defaults to `release-mgt.yaml` in the repository.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = ".", global = true)]
    repository: PathBuf,

    /// Source file declaring the version. Overrides `version-file` from the configuration.
    #[arg(long, global = true)]
    version_file: Option<PathBuf>,

    /// Verbose output, twice for trace.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command
{
    /// Provide a return code on the release status
    Check,
    /// Step to tag the code, before build
    TagIt(TagItArgs),
    /// Step to create a draft release
    DraftIt,
    /// Step to release the code after build success.
    ReleaseIt,
    /// Step to display release status
    Status,
}

#[derive(Args, Debug)]
struct TagItArgs
{
    #[arg(long, env = "RELMGT_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "RELMGT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// https, http or ssh
    #[arg(long)]
    protocol: Option<String>,

    #[arg(long)]
    remote_name: Option<String>,

    /// Remove the push remote once done, if created by this run.
    #[arg(long, value_parser = ["true", "false"])]
    auto_remove_remote: Option<String>,
}

impl TagItArgs
{
    fn remote_options(&self) -> RemoteOptions
    {
        RemoteOptions::new()
            .username(self.username.as_deref())
            .password(self.password.as_deref())
            .protocol(self.protocol.as_deref())
            .remote_name(self.remote_name.as_deref())
            .auto_remove_remote(self.auto_remove_remote.as_deref())
    }
}

fn init_logger(verbose: u8)
{
    // While in debug mode, log everything; otherwise, log only errors, warnings and info.
    let level = match verbose
    {
        0 if cfg!(debug_assertions) => log::LevelFilter::max(),
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn version_file(cli: &Cli, data: &RelMgtData) -> Result<VersionFile>
{
    let path = match (&cli.version_file, &data.version_file)
    {
        (Some(path), _) => path.clone(),
        (None, Some(path)) => cli.repository.join(path),
        (None, None) => cli.repository.join(DEFAULT_VERSION_FILE),
    };
    VersionFile::new(path)
}

fn load_data(cli: &Cli) -> Result<RelMgtData>
{
    let file = cli.config.clone().unwrap_or_else(|| cli.repository.join(DEFAULT_CONFIG_FILE));
    RelMgtData::load(&file)
}

/// Exit status of the command.
fn run(cli: &Cli) -> Result<i32>
{
    let root: &Path = &cli.repository;
    let data = load_data(cli)?;
    let version_file = version_file(cli, &data)?;

    match &cli.command
    {
        Command::Check =>
        {
            feature::check::check(root, &version_file)?;
        },
        Command::TagIt(args) =>
        {
            let tag = feature::tagging::tag_it(root, &data, &version_file, &args.remote_options())?;
            info!("Tag {} published.", tag.name);
        },
        Command::DraftIt | Command::ReleaseIt | Command::Status =>
        {
            warn!("{:?} is not implemented.", cli.command);
            return Ok(NOT_IMPLEMENTED);
        },
    }
    Ok(0)
}

fn main()
{
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let status = match run(&cli)
    {
        Ok(status) => status,
        Err(error) =>
        {
            error!("{}", error);
            error.exit_code()
        },
    };

    std::process::exit(status);
}

#[test]
fn test_cli()
{
    use clap::CommandFactory;
    Cli::command().debug_assert();

    let cli = Cli::try_parse_from([
        "simple-relmgt", "-r", "/src/project", "tag-it",
        "--protocol", "ssh", "--remote-name", "release", "--auto-remove-remote", "false",
    ]).unwrap();
    assert_eq!(cli.repository, PathBuf::from("/src/project"));

    let Command::TagIt(args) = &cli.command else { panic!("expected tag-it") };
    let options = args.remote_options();
    assert_eq!(options.resolve_protocol(None), "ssh");
    assert_eq!(options.resolve_remote_name(None), "release");
    assert!(!options.auto_remove());

    assert!(Cli::try_parse_from(["simple-relmgt", "tag-it", "--auto-remove-remote", "maybe"]).is_err());
}

#[test]
fn test_version_file_resolution()
{
    let cli = Cli::try_parse_from(["simple-relmgt", "-r", "/src/project", "check"]).unwrap();
    let mut data = RelMgtData::default();
    assert_eq!(version_file(&cli, &data).unwrap().path(), Path::new("/src/project/version.go"));

    data.version_file = Some("cmd/version.go".to_string());
    assert_eq!(version_file(&cli, &data).unwrap().path(), Path::new("/src/project/cmd/version.go"));

    let cli = Cli::try_parse_from(["simple-relmgt", "check", "--version-file", "/tmp/VERSION"]).unwrap();
    assert_eq!(version_file(&cli, &data).unwrap().path(), Path::new("/tmp/VERSION"));
}

use anyhow::{Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use quire::archetype::new_content;
use quire::build::build_site;
use quire::config::SiteConfig;
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};

fn main() {
    let matches = App::new("quire")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds a static blog from Markdown content, a TOML config and a theme")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the site into the publish directory")
                .arg(source_arg())
                .arg(verbose_arg())
                .arg(
                    Arg::with_name("destination")
                        .short("d")
                        .long("destination")
                        .takes_value(true)
                        .value_name("DIR")
                        .help("Output directory, overriding `publishDir`"),
                )
                .arg(
                    Arg::with_name("build-drafts")
                        .short("D")
                        .long("build-drafts")
                        .help("Includes content marked as draft"),
                ),
        )
        .subcommand(
            SubCommand::with_name("new")
                .about("Creates a content file from an archetype")
                .arg(source_arg())
                .arg(verbose_arg())
                .arg(
                    Arg::with_name("path")
                        .required(true)
                        .value_name("PATH")
                        .help("Path below the content directory, e.g. post/my-first-post.md"),
                ),
        )
        .get_matches();

    let (command, args) = matches.subcommand();
    let args = match args {
        Some(args) => args,
        None => std::process::exit(2),
    };

    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match args.is_present("verbose") {
            true => Level::DEBUG,
            false => Level::INFO,
        })
        .init();

    let result = match command {
        "build" => build(args),
        "new" => new(args),
        _ => unreachable!("clap only accepts declared subcommands"),
    };

    if let Err(e) = result {
        error!("Error: {}", e);
        for cause in e.chain().skip(1) {
            error!("Caused by: {}", cause);
        }
        std::process::exit(1);
    }
}

fn source_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("source")
        .short("s")
        .long("source")
        .takes_value(true)
        .value_name("DIR")
        .help("Project directory (or any directory below it)")
}

fn verbose_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("verbose")
        .short("v")
        .long("verbose")
        .help("Logs every file loaded and rendered")
}

fn load_config(args: &ArgMatches) -> Result<SiteConfig> {
    let dir = args.value_of("source").unwrap_or(".");
    SiteConfig::from_directory(Path::new(dir)).context("loading configuration")
}

fn build(args: &ArgMatches) -> Result<()> {
    let mut config = load_config(args)?.with_build_drafts(args.is_present("build-drafts"));
    if let Some(dir) = args.value_of("destination") {
        config = config.with_publish_directory(PathBuf::from(dir));
    }
    let report = build_site(&config).context("building site")?;
    info!(
        "built {} items ({} drafts skipped) into {} files",
        report.items, report.drafts_skipped, report.files
    );
    Ok(())
}

fn new(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    // `path` is required, so clap has already rejected its absence
    let path = args.value_of("path").unwrap_or_default();
    new_content(&config, Path::new(path)).context("creating content")?;
    Ok(())
}

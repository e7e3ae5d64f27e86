use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process;

use clap::{crate_description, crate_name, crate_version, value_parser, Arg, ArgMatches, Command};
use rankflow::pagerank::{self, PageRank};
use rankflow::{Configuration, Context, Error, LogLevel, Master, Result};

fn cli() -> Command {
    Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .arg(
            Arg::new("master")
                .required(true)
                .help("Execution target: local, local[N] or local[*]"),
        )
        .arg(
            Arg::new("file")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Edge list, one `<source> <target>` pair per line"),
        )
        .arg(
            Arg::new("number_of_iterations")
                .required(true)
                .help("Number of PageRank iterations, at least 1"),
        )
        .arg(
            Arg::new("partitions")
                .long("partitions")
                .short('p')
                .env("RANKFLOW_PARTITIONS")
                .value_parser(value_parser!(NonZeroUsize))
                .help("Partitions of every shuffle [default: number of worker threads]"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .env("RANKFLOW_CONFIG")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file; flags take precedence over its values"),
        )
        .arg(
            Arg::new("log_level")
                .long("log-level")
                .env("RANKFLOW_LOG_LEVEL")
                .value_parser(|s: &str| s.parse::<LogLevel>())
                .help("One of error, warn, info, debug or trace"),
        )
        .arg(
            Arg::new("local_dir")
                .long("local-dir")
                .env("RANKFLOW_LOCAL_DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding the per-run work dir and driver log"),
        )
}

fn configuration(matches: &ArgMatches) -> Result<Configuration> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => Configuration::from_file(path)?,
        None => Configuration::default(),
    };
    if let Some(master) = matches.get_one::<String>("master") {
        config.master = master.parse::<Master>()?;
    }
    if let Some(level) = matches.get_one::<LogLevel>("log_level") {
        config.log_level = *level;
    }
    if let Some(dir) = matches.get_one::<PathBuf>("local_dir") {
        config.local_dir = dir.clone();
    }
    if let Some(partitions) = matches.get_one::<NonZeroUsize>("partitions") {
        config.default_partitions = Some(partitions.get());
    }
    Ok(config)
}

fn run(matches: &ArgMatches) -> Result<()> {
    let config = configuration(matches)?;
    let iterations = matches
        .get_one::<String>("number_of_iterations")
        .map(String::as_str)
        .unwrap_or_default();
    let iterations = pagerank::parse_iterations(iterations)?;
    let partitions = config.default_parallelism();

    let context = Context::new(config)?;
    let file = matches
        .get_one::<PathBuf>("file")
        .cloned()
        .unwrap_or_default();
    log::info!(
        "ranking {} with {} iterations over {} partitions",
        file.display(),
        iterations,
        partitions
    );
    let lines = context.text_file(file, partitions)?;
    let ranks = PageRank::new(iterations, partitions)?.run(&lines)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (id, rank) in ranks {
        writeln!(out, "{}", pagerank::render(&id, rank)).map_err(Error::OutputWrite)?;
    }
    out.flush().map_err(Error::OutputWrite)
}

fn main() {
    let matches = cli().get_matches();
    if let Err(err) = run(&matches) {
        log::error!("pagerank failed: {}", err);
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(&format!(": {}", cause));
            source = cause.source();
        }
        eprintln!("error: {}", message);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn missing_positionals_are_rejected() {
        let err = cli()
            .try_get_matches_from(["pagerank", "local", "edges.txt"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn flags_override_defaults() {
        let matches = cli()
            .try_get_matches_from([
                "pagerank",
                "local[3]",
                "edges.txt",
                "5",
                "--partitions",
                "7",
                "--log-level",
                "debug",
            ])
            .unwrap();
        let config = configuration(&matches).unwrap();
        assert_eq!(config.master, Master::Local { threads: 3 });
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.default_parallelism(), 7);
    }

    #[test]
    fn unsupported_master_is_an_error() {
        let matches = cli()
            .try_get_matches_from(["pagerank", "spark://host:7077", "edges.txt", "1"])
            .unwrap();
        assert!(matches!(
            configuration(&matches),
            Err(Error::UnsupportedMaster(_))
        ));
    }
}

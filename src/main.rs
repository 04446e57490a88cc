use clap::{CommandFactory, Parser};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use netsegment_sync::config::CliArgs;
use netsegment_sync::output::{print_nothing_to_do, print_report};
use netsegment_sync::{sync_file, JamfClient, SyncOutcome};
use std::error::Error;

const LOG_CONFIG_FILE: &str = "log4rs.yml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    dotenv::dotenv().ok();
    let args = CliArgs::parse();
    init_logging(args.verbose)?;
    log::info!("#Start main()");

    let Some(input) = args.input.clone() else {
        CliArgs::command().print_help()?;
        return Ok(());
    };

    // all configuration is checked before the first remote call
    let options = args.sync_options(input)?;
    let directory = JamfClient::new(args.jamf_config()?)?;

    match sync_file(&options, &directory).await? {
        SyncOutcome::Unchanged => print_nothing_to_do(),
        SyncOutcome::Applied(report) => print_report(&report),
    }

    log::info!("#End main()");
    Ok(())
}

/// Use `log4rs.yml` when present, otherwise (and with `--verbose`) log to the console.
fn init_logging(verbose: bool) -> Result<(), Box<dyn Error>> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    if !verbose && std::path::Path::new(LOG_CONFIG_FILE).exists() {
        log4rs::init_file(LOG_CONFIG_FILE, Default::default())?;
        return Ok(());
    }

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S)} {h({l:5})} - {m}{n}",
        )))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .logger(Logger::builder().build("reqwest", LevelFilter::Warn))
        .logger(Logger::builder().build("hyper", LevelFilter::Warn))
        .build(Root::builder().appender("stdout").build(level))?;
    log4rs::init_config(config)?;
    Ok(())
}

mod cli;

use std::{
    fs::OpenOptions,
    io::{self, Write},
    process::ExitCode,
};

use clap::Parser;
use sv56::{
    config::{Settings, Verbosity},
    equalizer,
    error::{Error, Result},
    json::write_json,
    output::Output,
    report,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn open_log(settings: &Settings) -> Result<Box<dyn Write>> {
    let Some(path) = &settings.log else {
        return Ok(Box::new(io::stdout()));
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| Error::CreateOutput {
            path: path.clone(),
            source,
        })?;
    Ok(Box::new(file))
}

fn run(settings: &Settings) -> Result<()> {
    let mut log = open_log(settings)?;

    info!(
        input = %settings.input.display(),
        sample_rate = settings.sample_rate,
        resolution = settings.format.resolution(),
        block_size = settings.blocks.block_size,
        "starting"
    );

    let output = Output::new(settings.verbosity.shows_progress(), 0);
    let outcome = equalizer::run(settings, &output);
    output.finish();
    let outcome = outcome?;

    match settings.verbosity {
        Verbosity::Short => report::write_short(&mut log, settings, &outcome),
        Verbosity::Normal | Verbosity::Quiet => report::write_long(&mut log, settings, &outcome),
    }
    .and_then(|()| log.flush())
    .map_err(Error::Write)?;

    if let Some(path) = &settings.json {
        write_json(path, settings, &outcome)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sv56=warn")),
        )
        .init();

    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Usage errors exit 1; clap's own code 2 means "cannot open input" here.
            let code = if err.use_stderr() { 1 } else { 0 };
            if let Err(print_err) = err.print() {
                tracing::error!(%print_err, "cannot print usage message");
            }
            return ExitCode::from(code);
        }
    };

    let result = Settings::validate(args.into_raw()).and_then(|settings| run(&settings));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sv56: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

//! `argo-download`: fetch one Argo float, optionally keep its last N days,
//! and save it as NetCDF.
//!
//! ```text
//! argo-download 3902585
//! argo-download 3902585 --days 30
//! argo-download settings.py --days 90 --src gdac -o callao.nc
//! ```

mod code;
mod fetch;
mod store;

use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use argo_core::pipeline::format_sizes;
use argo_core::{run, DataMode, DataSource, RunOptions, TimeStatus};
use chrono::Utc;
use clap::{Parser, ValueEnum};

use crate::fetch::{Endpoints, RemoteSource};
use crate::store::NetcdfSink;

#[derive(Parser)]
#[command(
    name = "argo-download",
    version,
    about = "Download an Argo float and save it as NetCDF, optionally keeping only its last N days"
)]
struct Cli {
    /// WMO code of the float (e.g. 3902585), or a .py file defining
    /// FLOAT_ID, ARGO_CODE or ARGO_CODES
    code: String,

    /// Keep only the last N days, counted back from now (UTC)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    days: Option<u32>,

    /// Data service
    #[arg(long, value_enum, default_value_t = Source::Erddap)]
    src: Source,

    /// Variable set: everything, or core variables without QC and error fields
    #[arg(long, value_enum, default_value_t = Mode::Expert)]
    mode: Mode,

    /// Output file name; replaces the name derived from the time range
    #[arg(short, long, value_name = "NAME")]
    output: Option<String>,

    /// Print a JSON summary of the run on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Source {
    Erddap,
    Gdac,
}

impl From<Source> for DataSource {
    fn from(s: Source) -> Self {
        match s {
            Source::Erddap => DataSource::Erddap,
            Source::Gdac => DataSource::Gdac,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Expert,
    Standard,
}

impl From<Mode> for DataMode {
    fn from(m: Mode) -> Self {
        match m {
            Mode::Expert => DataMode::Expert,
            Mode::Standard => DataMode::Standard,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match try_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

fn try_main(cli: Cli) -> Result<()> {
    let float_id = code::resolve_float_code(&cli.code)?;

    let mut options = RunOptions::new(float_id, Utc::now());
    options.source = cli.src.into();
    options.mode = cli.mode.into();
    options.days_back = cli.days;
    options.output_override = cli.output;

    let source = RemoteSource::new(Endpoints::from_env())?;
    let report = run(&source, &NetcdfSink, &options)?;

    log::info!("Data saved to {}", report.filename);
    log::info!(
        "Dimensions {}, {} variables",
        format_sizes(&report.sizes),
        report.variables
    );
    if let TimeStatus::Undecodable { field, reason } = &report.time {
        log::warn!("Time variable {field} could not be decoded: {reason}");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

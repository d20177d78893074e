use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use osm_audit::report::{write_csv_reports, write_report, EXAMPLES_SHOWN};
use osm_audit::{audit_all, export_to_json_streaming, AuditTables, JsonFormat, Result};

/// Audit an OSM XML extract, then export it as JSON lines next to the input.
#[derive(Debug, Parser)]
#[command(name = "osm-audit", version)]
struct Args {
    /// OSM XML file to process
    #[arg(default_value = "lancaster.osm")]
    input: PathBuf,

    /// Indent each exported document instead of writing one per line
    #[arg(long)]
    pretty: bool,

    /// Only export, without printing the audit
    #[arg(long, conflicts_with = "skip_export")]
    skip_audit: bool,

    /// Only audit, without writing the JSON file
    #[arg(long)]
    skip_export: bool,

    /// Also write the audit tables as CSV files into this directory
    #[arg(long, value_name = "DIR", conflicts_with = "skip_audit")]
    report_dir: Option<PathBuf>,

    /// More logging (-v: info, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

fn setup_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("osm_audit={}", args.log_level())));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

fn main() {
    let args = Args::parse();
    setup_logging(&args);
    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let tables = AuditTables::new()?;

    if !args.skip_audit {
        let report = audit_all(&args.input, &tables, Some(EXAMPLES_SHOWN))?;
        let stdout = io::stdout();
        let mut out = stdout.lock();
        write_report(&mut out, &report)?;
        out.flush()?;
        if let Some(dir) = &args.report_dir {
            write_csv_reports(dir, &report, &tables.patterns)?;
            info!(dir = %dir.display(), "wrote CSV reports");
        }
    }

    if !args.skip_export {
        let format = if args.pretty {
            JsonFormat::Pretty
        } else {
            JsonFormat::Compact
        };
        export_to_json_streaming(&args.input, &tables, format)?;
    }

    Ok(())
}

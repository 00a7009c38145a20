mod logging;
mod report;

use clap::{Parser, Subcommand};
use fieldnote::{Pipeline, PipelineConfig, io};
use std::fs::File;
use std::io::{IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "fieldnote", version)]
#[command(about = "Extract species, location and date records from citizen-science posts")]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable ANSI color in reports.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a CSV of posts and write complete records as CSV.
    Run {
        /// Checklist CSV (common_name + genus/species or scientific_name).
        #[arg(long)]
        taxonomy: PathBuf,
        /// GeoNames-style TSV dump.
        #[arg(long)]
        gazetteer: PathBuf,
        /// Posts CSV with a post_text column.
        #[arg(long)]
        posts: PathBuf,
        /// TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Where to write records; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Where to write the rejection audit.
        #[arg(long)]
        audit: Option<PathBuf>,
    },
    /// Take one text through every stage and show what each one found.
    Inspect {
        #[arg(long)]
        taxonomy: PathBuf,
        #[arg(long)]
        gazetteer: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Post text; read from stdin when omitted.
        text: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() { ExitCode::from(2) } else { ExitCode::SUCCESS };
        }
    };

    logging::init_logging(cli.verbose);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::from(1)
        }
    }
}

fn execute(cli: Cli) -> fieldnote::Result<()> {
    match cli.command {
        Command::Run { taxonomy, gazetteer, posts, config, output, audit } => {
            let pipeline = build_pipeline(config.as_deref(), &taxonomy, &gazetteer)?;
            let posts = io::read_posts_csv(io::open(&posts)?)?;
            let report = pipeline.run(posts);

            match &output {
                Some(path) => io::write_records_csv(create(path)?, &report.records())?,
                None => io::write_records_csv(std::io::stdout().lock(), &report.records())?,
            }
            if let Some(path) = &audit {
                io::write_audit_csv(create(path)?, report.audit.entries())?;
                info!(path = %path.display(), entries = report.audit.len(), "audit written");
            }

            report::print_run_report(&report, !cli.no_color && std::io::stderr().is_terminal());
            Ok(())
        }
        Command::Inspect { taxonomy, gazetteer, config, text } => {
            let pipeline = build_pipeline(config.as_deref(), &taxonomy, &gazetteer)?;
            let text = if text.is_empty() { read_stdin()? } else { text.join(" ") };
            let inspection = pipeline.inspect(&text);

            report::print_inspection(&inspection, !cli.no_color && std::io::stdout().is_terminal());
            std::io::stdout().flush()?;
            Ok(())
        }
    }
}

fn build_pipeline(config: Option<&Path>, taxonomy: &Path, gazetteer: &Path) -> fieldnote::Result<Pipeline> {
    let config = match config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let normalizer = config.normalizer()?;
    let taxa = io::read_taxonomy_csv(io::open(taxonomy)?)?;
    let places = io::read_geonames_tsv(io::open(gazetteer)?, &normalizer)?;
    Pipeline::new(config, taxa, places)
}

fn create(path: &Path) -> fieldnote::Result<File> {
    File::create(path).map_err(|source| fieldnote::Error::Io { path: path.to_path_buf(), source })
}

fn read_stdin() -> fieldnote::Result<String> {
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

use fieldnote::{ExtractionResult, Inspection, RunReport, Stage, StageMetrics};
use std::fmt::Display;

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

/// Batch summary, written to stderr so it never mixes with CSV on stdout.
pub fn print_run_report(report: &RunReport, color: bool) {
    let palette = ansi::Palette::new(color);
    let metrics = &report.metrics;

    eprintln!("\n{}", palette.paint("━━━ Yield ━━━", ansi::GRAY));
    eprintln!(
        "  {} of {} records complete ({})  │  rejected: {}  │  empty text: {}",
        palette.bold(palette.paint(metrics.complete.to_string(), ansi::GREEN)),
        metrics.total,
        palette.paint(format!("{:.1}%", metrics.yield_ratio() * 100.0), ansi::CYAN),
        palette.paint(report.audit.len().to_string(), ansi::YELLOW),
        palette.dim(metrics.empty_text.to_string()),
    );

    eprintln!("\n{}", palette.paint("━━━ Stages ━━━", ansi::GRAY));
    for stage in Stage::ALL {
        eprintln!("  {}", fmt_stage(stage, metrics.stage(stage), &palette));
    }

    eprintln!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    eprintln!(
        "  Total: {}  │  Normalize: {}  │  Taxon: {}  │  Location: {}  │  Date: {}",
        palette.paint(format!("{:?}", metrics.elapsed), ansi::GREEN),
        palette.dim(format!("{:?}", metrics.normalize)),
        palette.dim(format!("{:?}", metrics.taxon.elapsed)),
        palette.dim(format!("{:?}", metrics.location.elapsed)),
        palette.dim(format!("{:?}", metrics.date.elapsed)),
    );
    eprintln!();
}

fn fmt_stage(stage: Stage, metrics: &StageMetrics, palette: &ansi::Palette) -> String {
    format!(
        "{:<9} {}  {}  {}",
        palette.paint(stage.as_str(), ansi::BLUE),
        palette.paint(format!("✓ {}", metrics.matched), ansi::GREEN),
        palette.paint(format!("≈ {}", metrics.ambiguous), ansi::YELLOW),
        palette.dim(format!("✗ {}", metrics.not_found)),
    )
}

/// One text through every stage.
pub fn print_inspection(inspection: &Inspection, color: bool) {
    let palette = ansi::Palette::new(color);
    let observation = &inspection.observation;

    println!("\n{}", palette.bold(palette.paint(format!("⚙  Inspecting: \"{}\"", observation.raw.post_text), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Normalized ━━━", ansi::GRAY));
    if observation.normalized.is_empty() {
        println!("{}", palette.dim("  (nothing left after normalization)"));
    } else {
        println!("  {} {}", palette.dim("display:"), observation.normalized.display());
        println!("  {} {}", palette.dim("canonical:"), palette.paint(observation.normalized.as_str(), ansi::YELLOW));
    }

    println!("\n{}", palette.paint("━━━ Date Rules ━━━", ansi::GRAY));
    if inspection.active_date_rules.is_empty() {
        println!("{}", palette.dim("  No rules passed the trigger scan"));
    } else {
        for name in &inspection.active_date_rules {
            println!("  {}", palette.paint(*name, ansi::BLUE));
        }
    }

    println!("\n{}", palette.paint("━━━ Results ━━━", ansi::GRAY));
    print_stage("taxon", &observation.taxon, |t| format!("{} ({})", t.common_name, t.scientific_name()), &palette);
    print_stage(
        "location",
        &observation.location,
        |p| format!("{} ({:.5}, {:.5})", p.canonical_name, p.latitude, p.longitude),
        &palette,
    );
    print_stage(
        "date",
        &observation.date,
        |d| match d.month {
            Some(month) => format!("{month:02}/{} [{}]", d.year, d.source.as_str()),
            None => format!("{} [{}]", d.year, d.source.as_str()),
        },
        &palette,
    );

    let verdict = if inspection.complete {
        palette.bold(palette.paint("complete", ansi::GREEN))
    } else {
        palette.bold(palette.paint("incomplete", ansi::RED))
    };
    println!("\n  {} {}\n", palette.dim("record:"), verdict);
}

fn print_stage<T>(label: &str, result: &ExtractionResult<T>, show: impl Fn(&T) -> String, palette: &ansi::Palette) {
    let label = palette.paint(format!("{label:<9}"), ansi::BLUE);
    match result {
        ExtractionResult::Matched { value, confidence } => {
            println!(
                "  {} {} {} {}",
                label,
                palette.bold(palette.paint(show(value), ansi::GREEN)),
                palette.dim("│"),
                palette.paint(fmt_confidence(confidence), ansi::CYAN)
            );
        }
        ExtractionResult::Ambiguous(candidates) => {
            println!("  {} {}", label, palette.paint(format!("ambiguous between {}", candidates.len()), ansi::YELLOW));
            for (idx, candidate) in candidates.iter().enumerate() {
                println!("      {} {}", palette.paint(format!("[{idx}]"), ansi::GRAY), show(candidate));
            }
        }
        ExtractionResult::NotFound => println!("  {} {}", label, palette.dim("not found")),
    }
}

fn fmt_confidence(confidence: impl Display) -> String {
    format!("confidence {confidence}")
}

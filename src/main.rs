use clap::Parser;
use dosealloc::prelude::*;
use eyre::Result;
use std::path::PathBuf;

/// Find the optimal combination of drugs below the toxicity limit.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// CSV file with protein intensities in healthy and diseased state
    #[arg(value_name = "PROTEIN_DATA", required_unless_present = "config")]
    protein_data: Option<PathBuf>,

    /// CSV file with the effect the drugs have on some proteins
    #[arg(value_name = "DRUG_EFFECTS", required_unless_present = "config")]
    drug_effects: Option<PathBuf>,

    /// Allow non-integer doses in the optimization
    #[arg(long)]
    allow_partial_doses: bool,

    /// TOML settings file; positional paths and flags override it
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Toxicity limit to solve for, repeat to sweep several
    #[arg(short, long = "limit", value_name = "LIMIT")]
    limits: Vec<f64>,

    /// Directory for sweep.csv and settings.json
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Log level filter (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn into_settings(self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::new(PathBuf::new(), PathBuf::new()),
        };
        if let Some(path) = self.protein_data {
            settings.paths.proteins = path;
        }
        if let Some(path) = self.drug_effects {
            settings.paths.drug_effects = path;
        }
        if self.allow_partial_doses {
            settings.config.allow_partial_doses = true;
        }
        if !self.limits.is_empty() {
            settings.toxicity.limits = self.limits;
        }
        if let Some(dir) = self.output {
            settings.paths.output = Some(dir);
        }
        if let Some(level) = self.log_level {
            settings.config.log_level = level;
        }
        Ok(settings)
    }
}

fn main() -> Result<()> {
    let settings = Cli::parse().into_settings()?;
    setup_log(&settings)?;

    let result = run(settings)?;
    print!("{result}");
    Ok(())
}

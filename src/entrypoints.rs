use eyre::{Result, WrapErr};
use std::time::Instant;

use crate::dosing::DoseProblem;
use crate::routines::data::{
    build_disease_effects, build_drug_effects, read_disease_file, read_drug_file,
};
use crate::routines::output::SweepResult;
use crate::routines::settings::Settings;

/// Run a complete dose allocation: read both tables, build the aligned effect
/// model once, sweep every configured toxicity limit and write the outputs.
///
/// Input errors abort the run. Failures of individual limits are kept in the
/// returned [`SweepResult`].
pub fn run(settings: Settings) -> Result<SweepResult> {
    let now = Instant::now();
    settings.validate()?;

    tracing::info!("Reading {}", settings.paths.proteins.display());
    let proteins = read_disease_file(&settings.paths.proteins)
        .wrap_err_with(|| format!("in {}", settings.paths.proteins.display()))?;
    tracing::info!("Reading {}", settings.paths.drug_effects.display());
    let drug_rows = read_drug_file(&settings.paths.drug_effects)
        .wrap_err_with(|| format!("in {}", settings.paths.drug_effects.display()))?;

    let catalog = settings.catalog();
    let (disease_effects, protein_index) = build_disease_effects(&proteins)
        .wrap_err_with(|| format!("in {}", settings.paths.proteins.display()))?;
    let drug_effects = build_drug_effects(
        &drug_rows,
        &protein_index,
        &catalog,
        settings.config.unknown_proteins,
    )
    .wrap_err_with(|| format!("in {}", settings.paths.drug_effects.display()))?;

    let toxicity = settings.toxicity()?;
    let mode = settings.mode();
    let problem = DoseProblem::with_options(
        &drug_effects,
        &disease_effects,
        &toxicity,
        mode,
        settings.solver,
    )?;

    tracing::info!(
        "Sweeping {} toxicity limit(s) with {} doses",
        settings.toxicity.limits.len(),
        mode
    );
    let entries = problem.sweep(&settings.toxicity.limits, settings.config.parallel);
    let result = SweepResult::new(catalog, mode, entries);

    if let Some(dir) = &settings.paths.output {
        std::fs::create_dir_all(dir)
            .wrap_err_with(|| format!("could not create {}", dir.display()))?;
        result.write_sweep(dir)?;
        settings.write(dir)?;
    }

    if result.n_failed() > 0 {
        tracing::warn!(
            "{} of {} toxicity limit(s) failed",
            result.n_failed(),
            result.entries.len()
        );
    }
    tracing::info!("Total time: {:.2?}", now.elapsed());
    Ok(result)
}

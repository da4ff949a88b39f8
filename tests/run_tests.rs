use dosealloc::prelude::*;
use eyre::Result;
use std::path::PathBuf;

const PROTEINS: &str = "\
Protein,Healthy,Diseased
P1,10,13
P2,5,3
";

const DRUGS: &str = "\
Drug,Protein,Effect
Drug1,P1,-1
Drug2,P2,1
Drug3,P9,4
";

fn workspace(name: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("dosealloc-run-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("protein_data.csv"), PROTEINS)?;
    std::fs::write(dir.join("drug_effects.csv"), DRUGS)?;
    Ok(dir)
}

#[test]
fn test_run_writes_sweep_and_settings() -> Result<()> {
    let dir = workspace("outputs")?;
    let output = dir.join("out");
    let settings = Settings::new(dir.join("protein_data.csv"), dir.join("drug_effects.csv"))
        .with_limits(vec![10.0, 3.0, -1.0])
        .with_output(&output);

    let result = run(settings)?;
    assert_eq!(result.entries.len(), 3);
    assert_eq!(result.n_failed(), 1);

    let best = result.entries[0].result().expect("limit 10 is feasible");
    assert_eq!(best.objective, 0.0);
    assert_eq!(best.dose(result.catalog.id(0).unwrap()), 3.0);
    assert_eq!(best.dose(result.catalog.id(1).unwrap()), 2.0);
    assert_eq!(best.doses.len(), 10);

    let sweep = std::fs::read_to_string(output.join("sweep.csv"))?;
    let lines: Vec<&str> = sweep.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("toxicity_limit,status,objective,Drug1,Drug2"));
    assert!(lines[1].starts_with("10,optimal,0,3,2,0"));
    assert!(lines[3].starts_with("-1,no dose vector"));
    assert!(output.join("settings.json").exists());

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn test_run_rejects_unknown_protein_when_asked() -> Result<()> {
    let dir = workspace("reject")?;
    let settings = Settings::new(dir.join("protein_data.csv"), dir.join("drug_effects.csv"))
        .with_unknown_proteins(UnknownProteinPolicy::Reject);

    let err = run(settings).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DoseError>(),
        Some(DoseError::UnknownProtein { .. })
    ));

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn test_run_with_partial_doses() -> Result<()> {
    let dir = workspace("partial")?;
    let settings = Settings::new(dir.join("protein_data.csv"), dir.join("drug_effects.csv"))
        .with_partial_doses(true)
        .with_parallel(false)
        .with_limits(vec![2.0]);

    let result = run(settings)?;
    assert_eq!(result.mode, DoseMode::Continuous);
    let entry = result.entries[0].result().expect("limit 2 is feasible");
    assert!(entry.toxicity_used <= 2.0 + 1e-6);
    assert!(entry.doses.as_continuous().is_some());
    assert!(result.to_string().contains("Optimal objective value:"));

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn test_run_missing_file() {
    let settings = Settings::new("does/not/exist.csv", "neither.csv");
    assert!(run(settings).is_err());
}

use dosealloc::prelude::*;
use eyre::Result;
use std::path::PathBuf;

fn write_toml(name: &str, contents: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("dosealloc-settings-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// A settings file with only the paths section falls back to the defaults
#[test]
fn test_settings_minimal_file() -> Result<()> {
    let path = write_toml(
        "minimal.toml",
        r#"
[paths]
proteins = "protein_data.csv"
drug_effects = "drug_effects.csv"
"#,
    )?;
    let settings = Settings::from_file(&path)?;

    assert_eq!(settings.paths.proteins, PathBuf::from("protein_data.csv"));
    assert_eq!(settings.paths.output, None);
    assert_eq!(settings.mode(), DoseMode::Integer);
    assert_eq!(settings.catalog().len(), 10);
    assert_eq!(settings.toxicity.limits, vec![10.0]);
    assert_eq!(settings.config.unknown_proteins, UnknownProteinPolicy::Drop);
    assert_eq!(settings.solver, SolverOptions::default());

    Ok(())
}

#[test]
fn test_settings_full_file() -> Result<()> {
    let path = write_toml(
        "full.toml",
        r#"
[paths]
proteins = "p.csv"
drug_effects = "d.csv"
output = "out"

[config]
allow_partial_doses = true
parallel = false
unknown_proteins = "reject"
catalog_size = 3

[toxicity]
costs = [0.5, 1.0, 2.0]
limits = [1.0, 2.0, 4.0]

[solver]
max_nodes = 500
time_limit = 2.5
"#,
    )?;
    let settings = Settings::from_file(&path)?;

    assert_eq!(settings.mode(), DoseMode::Continuous);
    assert!(!settings.config.parallel);
    assert_eq!(settings.config.unknown_proteins, UnknownProteinPolicy::Reject);
    assert_eq!(settings.catalog().names(), vec!["Drug1", "Drug2", "Drug3"]);
    assert_eq!(settings.toxicity()?.to_vec(), vec![0.5, 1.0, 2.0]);
    assert_eq!(settings.toxicity.limits, vec![1.0, 2.0, 4.0]);
    assert_eq!(settings.solver.max_nodes, 500);
    assert_eq!(settings.solver.time_limit, Some(2.5));
    assert_eq!(settings.solver.max_iter, 200);

    Ok(())
}

#[test]
fn test_settings_costs_must_match_catalog() -> Result<()> {
    let path = write_toml(
        "bad_costs.toml",
        r#"
[paths]
proteins = "p.csv"
drug_effects = "d.csv"

[toxicity]
costs = [1.0, -2.0]

[config]
catalog_size = 2
"#,
    )?;
    assert!(Settings::from_file(&path).is_err());
    Ok(())
}

#[test]
fn test_settings_environment_overrides_file() -> Result<()> {
    let path = write_toml(
        "env.toml",
        r#"
[paths]
proteins = "p.csv"
drug_effects = "d.csv"

[config]
log_level = "warn"
"#,
    )?;
    std::env::set_var("DOSEALLOC__CONFIG__LOG_LEVEL", "trace");
    let settings = Settings::from_file(&path);
    std::env::remove_var("DOSEALLOC__CONFIG__LOG_LEVEL");

    assert_eq!(settings?.config.log_level, "trace");
    Ok(())
}

#[test]
fn test_settings_written_as_json() -> Result<()> {
    let dir = std::env::temp_dir().join(format!("dosealloc-settings-json-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;

    let settings = Settings::new("p.csv", "d.csv")
        .with_partial_doses(true)
        .with_limits(vec![3.0, 6.0]);
    let path = settings.write(&dir)?;

    let back: Settings = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    assert_eq!(back, settings);

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

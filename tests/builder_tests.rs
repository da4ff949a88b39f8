use dosealloc::prelude::*;
use eyre::Result;

const PROTEINS: &str = "\
Protein,Healthy,Diseased
P1,10,13
P2,5,3
P3,7,7
";

const DRUGS: &str = "\
Drug,Protein,Effect
Drug1,P1,-1
Drug2,P2,1
Drug2,P1,0
Drug3,P4,5
";

/// Every protein of the disease table maps to one position and back
#[test]
fn protein_index_round_trips() -> Result<()> {
    let measurements = read_disease_table(PROTEINS.as_bytes())?;
    let (disease, index) = build_disease_effects(&measurements)?;

    assert_eq!(index.len(), 3);
    assert_eq!(disease.len(), index.len());
    for measurement in &measurements {
        let position = index.get(&measurement.protein).expect("protein is indexed");
        assert_eq!(index.name(position), Some(measurement.protein.as_str()));
    }
    assert_eq!(disease.vector().to_vec(), vec![3, -2, 0]);

    Ok(())
}

#[test]
fn building_twice_gives_the_same_model() -> Result<()> {
    let measurements = read_disease_table(PROTEINS.as_bytes())?;
    let records = read_drug_table(DRUGS.as_bytes())?;
    let catalog = DrugCatalog::new(3);

    let (disease_a, index_a) = build_disease_effects(&measurements)?;
    let (disease_b, index_b) = build_disease_effects(&measurements)?;
    assert_eq!(disease_a, disease_b);
    assert_eq!(index_a, index_b);

    let effects_a = build_drug_effects(&records, &index_a, &catalog, UnknownProteinPolicy::Drop)?;
    let effects_b = build_drug_effects(&records, &index_b, &catalog, UnknownProteinPolicy::Drop)?;
    assert_eq!(effects_a, effects_b);

    Ok(())
}

#[test]
fn drug_matrix_is_aligned_to_the_disease_table() -> Result<()> {
    let (disease, index) = build_disease_effects(&read_disease_table(PROTEINS.as_bytes())?)?;
    let records = read_drug_table(DRUGS.as_bytes())?;
    let catalog = DrugCatalog::new(3);
    let effects = build_drug_effects(&records, &index, &catalog, UnknownProteinPolicy::Drop)?;

    effects.check_aligned(&disease)?;
    assert_eq!(effects.n_drugs(), 3);
    assert_eq!(effects.n_proteins(), 3);
    assert_eq!(effects.row(catalog.id(0).unwrap()).to_vec(), vec![-1, 0, 0]);
    assert_eq!(effects.row(catalog.id(1).unwrap()).to_vec(), vec![0, 1, 0]);
    // Drug3 only touched P4, which the disease table does not list
    assert_eq!(effects.row(catalog.id(2).unwrap()).to_vec(), vec![0, 0, 0]);
    assert_eq!(effects.inert_drugs(), vec![catalog.id(2).unwrap()]);

    Ok(())
}

#[test]
fn unknown_protein_can_be_rejected() -> Result<()> {
    let (_, index) = build_disease_effects(&read_disease_table(PROTEINS.as_bytes())?)?;
    let records = read_drug_table(DRUGS.as_bytes())?;
    let err = build_drug_effects(
        &records,
        &index,
        &DrugCatalog::new(3),
        UnknownProteinPolicy::Reject,
    )
    .unwrap_err();

    match err {
        DoseError::UnknownProtein {
            protein,
            drug,
            line,
        } => {
            assert_eq!(protein, "P4");
            assert_eq!(drug, "Drug3");
            assert_eq!(line, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn drug_outside_the_catalog_is_rejected() -> Result<()> {
    let (_, index) = build_disease_effects(&read_disease_table(PROTEINS.as_bytes())?)?;
    let records = read_drug_table("Drug,Protein,Effect\nDrug11,P1,1\n".as_bytes())?;
    let err = build_drug_effects(
        &records,
        &index,
        &DrugCatalog::default(),
        UnknownProteinPolicy::Drop,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        DoseError::UnknownDrug { ref drug, catalog_size: 10, .. } if drug == "Drug11"
    ));
    Ok(())
}

#[test]
fn missing_measurement_names_the_protein() -> Result<()> {
    let measurements = read_disease_table("Protein,Healthy,Diseased\nP1,4,\n".as_bytes())?;
    let err = build_disease_effects(&measurements).unwrap_err();

    match err {
        DoseError::MalformedInput { field, reason, .. } => {
            assert_eq!(field, "Diseased");
            assert!(reason.contains("P1"));
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn non_integer_effect_is_malformed() {
    let err = read_drug_table("Drug,Protein,Effect\nDrug1,P1,abc\n".as_bytes()).unwrap_err();
    assert!(matches!(
        err,
        DoseError::MalformedInput { ref field, line: 2, .. } if field == "Effect"
    ));
}

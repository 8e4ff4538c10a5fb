use std::fs;
use std::path::Path;

use is_close::is_close;
use polars::prelude::DataFrame;

use carbon_policy_kit::analytics::{correlation, energy, ranking, StatOutcome, MIN_CORRELATION_PAIRS};
use carbon_policy_kit::frames::{f64_values, read_csv_as_strings};
use carbon_policy_kit::schema;

const OWID: &str = "\
iso_code,country,year,coal_consumption,oil_consumption,gas_consumption,solar_consumption,wind_consumption,hydro_consumption,biofuel_consumption,renewables_share_energy
SWE,Sweden,2019,50,30,20,10,20,20,,40.5
SWE,Sweden,2020,60,30,20,10,20,30,,42.0
NOR,Norway,2019,40,40,20,40,30,30,0,60.0
NOR,Norway,2020,20,20,10,60,40,50,0,66.0
";

const EDGAR: &str = "\
Country_code_A3,year,emissions_mtco2e
SWE,2019,30.0
SWE,2019,10.0
SWE,2020,38.5
NOR,2020,12.0
";

fn load(dir: &Path, name: &str, contents: &str) -> DataFrame {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    read_csv_as_strings(&path, None).unwrap()
}

#[test]
fn displacement_from_an_owid_file() {
    let dir = tempfile::tempdir().unwrap();
    let df = load(dir.path(), "owid.csv", OWID);

    let sweden = energy::displacement_scores(&df, "SWE").unwrap();
    assert_eq!(sweden.height(), 1);
    let score = f64_values(&sweden, schema::energy::DISPLACEMENT_SCORE).unwrap();
    assert!(is_close!(score[0].unwrap(), 10.0));

    let compared = energy::compare_displacement_scores(&df, true).unwrap();
    let scores = f64_values(&compared, schema::energy::DISPLACEMENT_SCORE).unwrap();
    assert_eq!(scores.len(), 2);
    assert!(is_close!(scores[0].unwrap(), 10.0));
    assert!(is_close!(scores[1].unwrap(), 100.0));

    let shares = energy::energy_shares(&df, "NOR").unwrap();
    let renewable = f64_values(&shares, schema::energy::RENEWABLE_SHARE).unwrap();
    assert!(is_close!(renewable[1].unwrap(), 75.0));
}

#[test]
fn short_series_do_not_correlate() {
    let dir = tempfile::tempdir().unwrap();
    let owid = load(dir.path(), "owid.csv", OWID);
    let edgar = load(dir.path(), "edgar.csv", EDGAR);

    let emitted = correlation::emission_series(&edgar, "SWE").unwrap();
    assert_eq!(emitted.get(&2019), Some(&40.0));

    let outcome =
        correlation::lag_correlation(&edgar, &owid, "SWE", 0, MIN_CORRELATION_PAIRS).unwrap();
    assert_eq!(
        outcome,
        StatOutcome::InsufficientData { required: 5, available: 2 }
    );

    let lagged =
        correlation::lag_correlation(&edgar, &owid, "SWE", 1, MIN_CORRELATION_PAIRS).unwrap();
    assert_eq!(
        lagged,
        StatOutcome::InsufficientData { required: 5, available: 1 }
    );
}

#[test]
fn ranking_a_csv_with_ties() {
    let dir = tempfile::tempdir().unwrap();
    let df = load(dir.path(), "scores.csv", "entity,value\nA,100\nB,80\nC,60\nC,40\nD,50\n");

    let ranked = ranking::rank_entities(&df, schema::long::ENTITY, schema::long::VALUE).unwrap();
    let ranks: Vec<(&str, u32)> = ranked.iter().map(|r| (r.entity.as_str(), r.rank)).collect();
    assert_eq!(ranks, vec![("A", 1), ("C", 1), ("B", 3), ("D", 4)]);

    assert_eq!(
        ranking::country_rank(&df, schema::long::ENTITY, schema::long::VALUE, "B").unwrap(),
        Some(3)
    );
    assert_eq!(ranking::ranked_frame(&ranked).unwrap().height(), 4);
}

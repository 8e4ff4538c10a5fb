/// Column-name constants for every table the kit reads or writes.
/// Single source of truth - exported to Python via PyO3.

// ── Activity emission-factor table ──────────────────────────────────────────
pub mod activity {
    pub const ACTIVITY_CLASS: &str = "Activity Class";
    pub const KEYWORDS: &str = "Keywords";
    pub const CO2E_IMPACT: &str = "CO₂e Impact";
    pub const UNIT: &str = "Unit";
    pub const REQUIRED_INPUT_TYPE: &str = "Required Input Type";
    pub const DEFAULT_UNIT_COST: &str = "Default Unit Cost";
    pub const USES_DISPLACEMENT: &str = "Uses Displacement";
    pub const INSTRUMENT_TYPE: &str = "Instrument Type";
    pub const SECTOR: &str = "Sector";

    pub const REQUIRED: [&str; 3] = [ACTIVITY_CLASS, KEYWORDS, CO2E_IMPACT];
}

// ── Country composite factors ───────────────────────────────────────────────
pub mod country {
    pub const COUNTRY: &str = "Country";
    pub const DISPLACEMENT_RATIO: &str = "Displacement Ratio";
    pub const EFFICIENCY: &str = "Efficiency";
}

// ── Carbon pricing policy metadata ("gen info") ─────────────────────────────
pub mod policy_meta {
    pub const JURISDICTION: &str = "Jurisdiction covered";
    pub const STATUS: &str = "Status";
    pub const PRICE: &str = "Price on 1 April";
    pub const TYPE: &str = "Type";
    pub const RELATION: &str = "Relation to other instruments";

    /// Sector presence columns, in vector order.
    pub const SECTORS: [&str; 5] = [
        "Transport",
        "Industry",
        "Buildings",
        "Agricultural emissions",
        "LULUCF",
    ];
}

// ── Policy vector output ────────────────────────────────────────────────────
pub mod vector {
    pub const JURISDICTION: &str = "jurisdiction";
    pub const DURATION_YEARS: &str = "duration_years";
    pub const IS_ACTIVE: &str = "is_active";
    pub const PRICE_SIGNAL: &str = "price_signal";
    pub const NUM_SECTORS_COVERED: &str = "num_sectors_covered";
    pub const COVERS_TRANSPORT: &str = "covers_transport";
    pub const COVERS_INDUSTRY: &str = "covers_industry";
    pub const COVERS_BUILDINGS: &str = "covers_buildings";
    pub const COVERS_AGRICULTURE: &str = "covers_agriculture";
    pub const COVERS_LULUCF: &str = "covers_lulucf";
    pub const SUBSIDY_OVERLAP: &str = "subsidy_overlap";
    pub const TAX_RELIEF_OVERLAP: &str = "tax_relief_overlap";
    pub const POLICY_TYPE_TAX: &str = "policy_type_tax";
    pub const POLICY_TYPE_ETS: &str = "policy_type_ets";
    pub const POLICY_TYPE_HYBRID: &str = "policy_type_hybrid";

    /// Numeric feature columns in CSV order (jurisdiction comes first).
    pub const FEATURES: [&str; 14] = [
        DURATION_YEARS,
        IS_ACTIVE,
        PRICE_SIGNAL,
        NUM_SECTORS_COVERED,
        COVERS_TRANSPORT,
        COVERS_INDUSTRY,
        COVERS_BUILDINGS,
        COVERS_AGRICULTURE,
        COVERS_LULUCF,
        SUBSIDY_OVERLAP,
        TAX_RELIEF_OVERLAP,
        POLICY_TYPE_TAX,
        POLICY_TYPE_ETS,
        POLICY_TYPE_HYBRID,
    ];
}

// ── OWID energy dataset ─────────────────────────────────────────────────────
pub mod energy {
    pub const ISO_CODE: &str = "iso_code";
    pub const COUNTRY: &str = "country";
    pub const YEAR: &str = "year";
    pub const RENEWABLES_SHARE: &str = "renewables_share_energy";

    pub const FOSSIL_SOURCES: [&str; 3] = ["coal_consumption", "oil_consumption", "gas_consumption"];
    pub const RENEWABLE_SOURCES: [&str; 4] = [
        "solar_consumption",
        "wind_consumption",
        "hydro_consumption",
        "biofuel_consumption",
    ];

    // Derived
    pub const FOSSIL_ENERGY: &str = "fossil_energy";
    pub const RENEWABLES_ENERGY: &str = "renewables_energy";
    pub const FOSSIL_GROWTH: &str = "fossil_growth";
    pub const RENEWABLE_GROWTH: &str = "renewable_growth";
    pub const FOSSIL_SHARE: &str = "fossil_share";
    pub const RENEWABLE_SHARE: &str = "renewable_share";
    pub const DISPLACEMENT_SCORE: &str = "displacement_score";
}

// ── EDGAR emissions (long format) ───────────────────────────────────────────
pub mod emissions {
    pub const COUNTRY_CODE: &str = "Country_code_A3";
    pub const NAME: &str = "Name";
    pub const YEAR: &str = "year";
    pub const EMISSIONS_MT: &str = "emissions_mtco2e";
    /// Prefix of the wide year columns (`Y_1970`, `Y_1971`, ...).
    pub const YEAR_PREFIX: &str = "Y_";
}

// ── Generic long-format columns produced by reshaping ───────────────────────
pub mod long {
    pub const ENTITY: &str = "entity";
    pub const YEAR: &str = "year";
    pub const VALUE: &str = "value";
    pub const RANK: &str = "rank";
    pub const DELTA: &str = "delta";
    pub const START_VALUE: &str = "start_value";
    pub const END_VALUE: &str = "end_value";
    pub const CHANGE_PCT: &str = "change_pct";
}

// ── Correlation and forecast outputs ────────────────────────────────────────
pub mod correlation {
    pub const YEAR: &str = "year";
    pub const FIRST: &str = "first";
    pub const SECOND: &str = "second";
    pub const LAG_YEARS: &str = "lag_years";
    pub const CORRELATION: &str = "correlation";
    pub const PAIRS: &str = "pairs";
}

pub mod forecast {
    pub const YEAR: &str = "year";
    pub const PROJECTED_EMISSIONS_MT: &str = "projected_emissions_mt";
}

// ── Policy graph edge export ────────────────────────────────────────────────
pub mod graph {
    pub const PARENT: &str = "parent";
    pub const CHILD: &str = "child";
    pub const TITLE: &str = "title";
    pub const COUNTRY: &str = "country";
    pub const SECTOR: &str = "sector";
    pub const IMPACT_MT: &str = "impact_mt";
    pub const NODE_SIZE: &str = "node_size";
    pub const NODE_COLOR: &str = "node_color";
}

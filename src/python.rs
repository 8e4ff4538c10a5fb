use std::path::PathBuf;

use chrono::NaiveDate;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyo3_polars::PyDataFrame;

use crate::analytics::energy;
use crate::cache::DatasetCache;
use crate::catalog::{ActivityCatalog, CountryFactors};
use crate::classifier::classify;
use crate::config::Config;
use crate::error::PolicyError;
use crate::graph::PolicyGraph;
use crate::node::{NodeBuilder, PolicyRecord};
use crate::schema;
use crate::store::{NodeFilter, NodeStore};
use crate::vectorizer::{self, Vectorizer};

/// Dashboard-facing handle: configuration, reference tables and a dataset
/// cache that lives as long as the Python object.
#[pyclass]
pub struct PolicyKit {
    config: Config,
    catalog: Option<ActivityCatalog>,
    countries: Option<CountryFactors>,
    cache: DatasetCache,
}

#[pymethods]
impl PolicyKit {
    #[new]
    #[pyo3(signature = (config_path=None))]
    fn new(config_path: Option<String>) -> PyResult<Self> {
        let path = config_path.map(PathBuf::from);
        let config = Config::load(path.as_deref())?;
        Ok(Self {
            config,
            catalog: None,
            countries: None,
            cache: DatasetCache::new(),
        })
    }

    // ── Reference data ──────────────────────────────────────────────────────

    /// Load the activity catalog and country factor table from the
    /// configured paths.
    fn load_reference_tables(&mut self) -> PyResult<(usize, usize)> {
        let catalog = ActivityCatalog::load(&self.config.paths.activity_table())?;
        let countries = CountryFactors::load(&self.config.paths.country_factors())?;
        let sizes = (catalog.len(), countries.len());
        self.catalog = Some(catalog);
        self.countries = Some(countries);
        Ok(sizes)
    }

    /// Any CSV, all columns as strings, memoized per `(dataset, path)`.
    fn load_csv(&mut self, dataset: &str, path: &str) -> PyResult<PyDataFrame> {
        let df = self.cache.get_or_load_csv(dataset, &PathBuf::from(path))?;
        Ok(PyDataFrame(df.clone()))
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }

    // ── Policy pipeline ─────────────────────────────────────────────────────

    /// `(matched, activity_class, score)` for a free-text description.
    fn classify(&self, text: &str) -> PyResult<(bool, Option<String>, usize)> {
        let result = classify(text, self.catalog()?);
        Ok((
            result.matched,
            result.activity_class().map(str::to_string),
            result.score,
        ))
    }

    /// Build a node and append it to the store. Returns the new node id.
    #[pyo3(signature = (text, country, user_input, date, graph_intent, title=None))]
    fn add_node(
        &self,
        text: String,
        country: String,
        user_input: f64,
        date: &str,
        graph_intent: String,
        title: Option<String>,
    ) -> PyResult<String> {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| PyValueError::new_err(format!("Invalid date '{date}': {e}")))?;
        let record = PolicyRecord {
            text,
            country,
            title: title.unwrap_or_default(),
            date,
            graph_intent,
        };

        let node = NodeBuilder::new(self.catalog()?, self.countries()?, &self.config.sectors)
            .with_estimator(self.config.estimator.estimator())
            .with_size_bounds(self.config.nodes.size)
            .build(&record, user_input)
            .map_err(|rejection| PyValueError::new_err(rejection.to_string()))?;

        let id = node.id.clone();
        self.store().append(node)?;
        Ok(id)
    }

    /// All stored nodes, newest first, as a JSON array string.
    fn list_nodes(&self) -> PyResult<String> {
        let nodes = self.store().list(&NodeFilter::default())?;
        Ok(serde_json::to_string(&nodes).map_err(PolicyError::from)?)
    }

    fn delete_node(&self, id: &str) -> PyResult<bool> {
        Ok(self.store().delete(id)?)
    }

    /// Edge table of the intent graph, optionally restricted to one country.
    #[pyo3(signature = (intent, country=None))]
    fn graph_edges(&self, intent: &str, country: Option<&str>) -> PyResult<PyDataFrame> {
        let nodes = self.store().load()?;
        let graph = PolicyGraph::build(&nodes, intent, country);
        Ok(PyDataFrame(graph.to_frame()?))
    }

    /// Vectorize a policy metadata CSV; cleaned rows only when `clean`.
    #[pyo3(signature = (path, clean=true))]
    fn vectorize(&mut self, path: &str, clean: bool) -> PyResult<PyDataFrame> {
        let df = self.cache.get_or_load_csv("policy_metadata", &PathBuf::from(path))?;
        let mut vectors = Vectorizer::default()
            .with_keywords(self.config.instruments.clone())
            .vectorize_frame(df)?;
        if clean {
            vectors = vectorizer::clean_vectors(vectors);
        }
        Ok(PyDataFrame(vectorizer::vectors_to_frame(&vectors)?))
    }

    // ── Analytics ───────────────────────────────────────────────────────────

    fn displacement_scores(&mut self, path: &str, iso_code: &str) -> PyResult<PyDataFrame> {
        let df = self.cache.get_or_load_csv("owid_energy", &PathBuf::from(path))?;
        Ok(PyDataFrame(energy::displacement_scores(df, iso_code)?))
    }

    #[pyo3(signature = (path, latest_only=true))]
    fn compare_displacement_scores(&mut self, path: &str, latest_only: bool) -> PyResult<PyDataFrame> {
        let df = self.cache.get_or_load_csv("owid_energy", &PathBuf::from(path))?;
        Ok(PyDataFrame(energy::compare_displacement_scores(df, latest_only)?))
    }
}

impl PolicyKit {
    fn catalog(&self) -> Result<&ActivityCatalog, PolicyError> {
        self.catalog
            .as_ref()
            .ok_or_else(|| PolicyError::NotLoaded("activity catalog".into()))
    }

    fn countries(&self) -> Result<&CountryFactors, PolicyError> {
        self.countries
            .as_ref()
            .ok_or_else(|| PolicyError::NotLoaded("country factors".into()))
    }

    fn store(&self) -> NodeStore {
        NodeStore::open(self.config.paths.node_store())
    }
}

/// Export column-name constants as Python submodules.
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let activity = PyModule::new(m.py(), "activity")?;
    activity.add("ACTIVITY_CLASS", schema::activity::ACTIVITY_CLASS)?;
    activity.add("KEYWORDS", schema::activity::KEYWORDS)?;
    activity.add("CO2E_IMPACT", schema::activity::CO2E_IMPACT)?;
    m.add_submodule(&activity)?;

    let vector = PyModule::new(m.py(), "vector")?;
    vector.add("JURISDICTION", schema::vector::JURISDICTION)?;
    vector.add("FEATURES", schema::vector::FEATURES.to_vec())?;
    m.add_submodule(&vector)?;

    let energy = PyModule::new(m.py(), "energy")?;
    energy.add("YEAR", schema::energy::YEAR)?;
    energy.add("DISPLACEMENT_SCORE", schema::energy::DISPLACEMENT_SCORE)?;
    energy.add("FOSSIL_SHARE", schema::energy::FOSSIL_SHARE)?;
    energy.add("RENEWABLE_SHARE", schema::energy::RENEWABLE_SHARE)?;
    m.add_submodule(&energy)?;

    let graph = PyModule::new(m.py(), "graph")?;
    graph.add("PARENT", schema::graph::PARENT)?;
    graph.add("CHILD", schema::graph::CHILD)?;
    graph.add("NODE_COLOR", schema::graph::NODE_COLOR)?;
    graph.add("NODE_SIZE", schema::graph::NODE_SIZE)?;
    m.add_submodule(&graph)?;

    Ok(())
}

#[pymodule]
#[pyo3(name = "carbon_policy_kit")]
fn carbon_policy_kit(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PolicyKit>()?;
    add_schema_exports(m)?;
    Ok(())
}

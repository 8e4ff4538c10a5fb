pub mod analytics;
pub mod cache;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod error;
pub mod estimator;
pub mod frames;
pub mod graph;
pub mod instrument;
pub mod logging;
pub mod node;
pub mod schema;
pub mod store;
pub mod vectorizer;

#[cfg(feature = "python")]
mod python;

pub use catalog::{ActivityCatalog, CountryFactors};
pub use classifier::{classify, Classification};
pub use config::Config;
pub use error::{PolicyError, Result};
pub use estimator::Estimator;
pub use graph::PolicyGraph;
pub use instrument::PolicyInstrument;
pub use node::{NodeBuilder, PolicyNode, PolicyRecord};
pub use store::{NodeFilter, NodeStore};
pub use vectorizer::{PolicyVector, Vectorizer};

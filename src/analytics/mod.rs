//! Tabular analytics over long-format frames.
//!
//! Every helper is a pure function: frames in, frames or numbers out.
//! Small samples are reported through [`StatOutcome`] instead of NaN.

pub mod correlation;
pub mod energy;
pub mod forecast;
pub mod ranking;
pub mod stats;
pub mod trend;

/// Minimum inner-joined pairs before a correlation is reported.
pub const MIN_CORRELATION_PAIRS: usize = 5;
/// Minimum observations on each side of a pre/post t-test.
pub const MIN_TTEST_SAMPLES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum StatOutcome<T> {
    Value(T),
    InsufficientData { required: usize, available: usize },
    /// Enough data, but the statistic is undefined (e.g. zero variance).
    Degenerate,
}

impl<T> StatOutcome<T> {
    pub fn value(self) -> Option<T> {
        match self {
            StatOutcome::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            StatOutcome::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, StatOutcome::Value(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StatOutcome<U> {
        match self {
            StatOutcome::Value(v) => StatOutcome::Value(f(v)),
            StatOutcome::InsufficientData { required, available } => {
                StatOutcome::InsufficientData { required, available }
            }
            StatOutcome::Degenerate => StatOutcome::Degenerate,
        }
    }

    /// `InsufficientData` when `available < required`.
    pub(crate) fn require(required: usize, available: usize) -> Option<Self> {
        (available < required).then_some(StatOutcome::InsufficientData { required, available })
    }
}

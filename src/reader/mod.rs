//! Reading gazetteer exports into place aggregates

pub mod fields;
mod place_reader;

pub use place_reader::{PlaceReader, GRAPH_KEY};

use serde::Serialize;
use thiserror::Error;

/// Fatal read errors. Per-field problems are never fatal; see [`ReadIssues`].
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document has no @graph array")]
    MissingGraph,
}

pub type ReadResult<T> = Result<T, ReadError>;

/// Counts of recoverable decode problems, each also logged when met.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReadIssues {
    /// `reprPoint` arrays not of length 2
    pub point_shape: usize,
    /// `bbox` arrays not of length 4
    pub bbox_shape: usize,
    /// Parallel value/URI arrays of different length
    pub pair_length: usize,
    /// URI/value pairs with only one side present
    pub half_pairs: usize,
    /// Fields present with an undecodable value
    pub bad_values: usize,
}

impl ReadIssues {
    pub fn total(&self) -> usize {
        self.point_shape + self.bbox_shape + self.pair_length + self.half_pairs + self.bad_values
    }
}

//! Vector index construction and nearest-neighbour search

mod distance;
mod index;

pub use distance::DistanceMetric;
pub use index::{SearchResult, VectorIndex, VectorSearch};

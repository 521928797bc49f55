//! Distance metrics for the vector index

use serde::{Deserialize, Serialize};
use simsimd::SpatialSimilarity;
use std::cmp::Ordering;

/// How query and chunk vectors are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// L2 distance, lower is closer
    #[default]
    Euclidean,
    /// Cosine similarity, higher is closer
    Cosine,
    /// Inner product, higher is closer
    DotProduct,
}

impl DistanceMetric {
    /// Score `b` against `a` under this metric.
    ///
    /// `None` when the vectors differ in length.
    pub fn score(&self, a: &[f32], b: &[f32]) -> Option<f32> {
        let score = match self {
            Self::Euclidean => f32::sqeuclidean(a, b)?.sqrt(),
            // simsimd returns cosine distance
            Self::Cosine => 1.0 - f32::cosine(a, b)?,
            Self::DotProduct => f32::dot(a, b)?,
        };
        Some(score as f32)
    }

    /// Whether lower scores are better
    pub fn lower_is_better(&self) -> bool {
        matches!(self, Self::Euclidean)
    }

    /// Order two scores best-first
    pub fn compare(&self, a: f32, b: f32) -> Ordering {
        if self.lower_is_better() {
            a.total_cmp(&b)
        } else {
            b.total_cmp(&a)
        }
    }
}

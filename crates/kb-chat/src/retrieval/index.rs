//! Flat in-memory vector index over document chunks

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::Chunk;

use super::DistanceMetric;

/// A chunk returned from a similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Matched chunk
    pub chunk: Chunk,
    /// Raw metric score
    pub score: f32,
}

/// Similarity search over embedded chunks
pub trait VectorSearch: Send + Sync {
    /// Return at most `k` chunks ordered best first
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Number of indexed vectors
    fn len(&self) -> usize;

    /// Whether the index holds no vectors
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimensions
    fn dimensions(&self) -> usize;
}

#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Exhaustive-search index with one vector per chunk.
///
/// Immutable once built; a new batch of documents gets a new index.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimensions: usize,
    metric: DistanceMetric,
}

impl VectorIndex {
    /// Embed every chunk and build the index.
    ///
    /// Chunks are sent to the embedding provider in batches of `batch_size`.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        batch_size: usize,
        metric: DistanceMetric,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::vector_index("cannot build an index from zero chunks"));
        }

        let batch_size = batch_size.max(1);
        let mut vectors = Vec::with_capacity(chunks.len());

        for (batch_number, batch) in chunks.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            tracing::debug!(
                "Embedding batch {} ({} chunks) with {}",
                batch_number + 1,
                texts.len(),
                embedder.name()
            );

            let embedded = embedder.embed_batch(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(Error::embedding(format!(
                    "Expected {} embeddings, got {}",
                    texts.len(),
                    embedded.len()
                )));
            }
            vectors.extend(embedded);
        }

        let index = Self::from_embeddings(chunks, vectors, metric)?;
        tracing::info!(
            "Built {:?} index with {} vectors of {} dimensions",
            index.metric,
            index.len(),
            index.dimensions
        );
        Ok(index)
    }

    /// Build an index from precomputed vectors, one per chunk
    pub fn from_embeddings(
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        metric: DistanceMetric,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::vector_index("cannot build an index from zero chunks"));
        }
        if chunks.len() != vectors.len() {
            return Err(Error::vector_index(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimensions = vectors[0].len();
        if dimensions == 0 {
            return Err(Error::vector_index("embeddings have zero dimensions"));
        }
        if let Some(bad) = vectors.iter().position(|v| v.len() != dimensions) {
            return Err(Error::vector_index(format!(
                "vector {} has {} dimensions, expected {}",
                bad,
                vectors[bad].len(),
                dimensions
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();

        Ok(Self {
            entries,
            dimensions,
            metric,
        })
    }

    /// Distance metric
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Indexed chunks in source order
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }
}

impl VectorSearch for VectorIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.dimensions {
            return Err(Error::vector_index(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                self.metric
                    .score(query, &e.vector)
                    .map(|score| (i, score))
                    .ok_or_else(|| {
                        Error::vector_index(format!("entry {} has mismatched dimensions", i))
                    })
            })
            .collect::<Result<_>>()?;

        // Stable sort keeps source order among equal scores
        scored.sort_by(|a, b| self.metric.compare(a.1, b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchResult {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n).map(|i| Chunk::new(i, format!("chunk {}", i))).collect()
    }

    /// Embeds "chunk N" as [N, 0]
    struct IndexEmbedder;

    #[async_trait]
    impl EmbeddingProvider for IndexEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let n: f32 = text
                .trim_start_matches("chunk ")
                .parse()
                .map_err(|_| Error::embedding("bad text"))?;
            Ok(vec![n, 0.0])
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "index"
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ShortEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0]; texts.len().saturating_sub(1)])
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    #[tokio::test]
    async fn test_build_and_search_nearest() {
        let index = VectorIndex::build(chunks(10), &IndexEmbedder, 3, DistanceMetric::Euclidean)
            .await
            .unwrap();

        assert_eq!(index.len(), 10);
        assert_eq!(index.dimensions(), 2);

        let results = index.search(&[6.2, 0.0], 4).unwrap();
        let order: Vec<usize> = results.iter().map(|r| r.chunk.index).collect();
        assert_eq!(order, vec![6, 7, 5, 8]);
        assert!(results[0].score < results[1].score);
    }

    #[tokio::test]
    async fn test_build_rejects_zero_chunks() {
        let result = VectorIndex::build(Vec::new(), &IndexEmbedder, 10, DistanceMetric::Euclidean).await;
        assert!(matches!(result, Err(Error::VectorIndex(_))));
    }

    #[tokio::test]
    async fn test_build_rejects_missing_embeddings() {
        let result = VectorIndex::build(chunks(3), &ShortEmbedder, 10, DistanceMetric::Euclidean).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_k_larger_than_index() {
        let index = VectorIndex::from_embeddings(
            chunks(2),
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            DistanceMetric::Cosine,
        )
        .unwrap();

        let results = index.search(&[1.0, 0.0], 4).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.index, 0);
    }

    #[test]
    fn test_ties_follow_source_order() {
        let index = VectorIndex::from_embeddings(
            chunks(3),
            vec![vec![1.0, 1.0]; 3],
            DistanceMetric::Euclidean,
        )
        .unwrap();

        let order: Vec<usize> = index
            .search(&[0.0, 0.0], 3)
            .unwrap()
            .iter()
            .map(|r| r.chunk.index)
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_dimension_checks() {
        let mismatch = VectorIndex::from_embeddings(
            chunks(2),
            vec![vec![1.0, 0.0], vec![1.0]],
            DistanceMetric::Euclidean,
        );
        assert!(matches!(mismatch, Err(Error::VectorIndex(_))));

        let index =
            VectorIndex::from_embeddings(chunks(1), vec![vec![1.0, 0.0]], DistanceMetric::DotProduct)
                .unwrap();
        assert!(matches!(index.search(&[1.0], 1), Err(Error::VectorIndex(_))));
    }
}

//! Flat squared-L2 similarity index
//!
//! Brute-force nearest-neighbor search over a contiguous array of vectors.
//! Append-only: vectors are never removed, and positions are stable, so the
//! ordinal position of a vector is the join key to its document.

use std::path::Path;

use crate::errors::OpsRagError;
use crate::errors::Result;

/// Magic bytes identifying an index artifact
const INDEX_MAGIC: [u8; 4] = *b"ORAG";
/// Artifact format version
const INDEX_VERSION: u32 = 1;

/// A flat index over fixed-dimension vectors, searched by squared L2 distance
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index sized to the embedding dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Number of vectors stored
    pub fn ntotal(&self) -> usize {
        if self.dimension == 0 {
            return 0;
        }
        self.data.len() / self.dimension
    }

    /// Vector dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Append vectors in order
    ///
    /// # Errors
    /// - Any vector whose length differs from the index dimension
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(OpsRagError::Embedding(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.dimension,
                    vector.len()
                )));
            }
        }
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Return the k nearest vectors as (position, squared distance) pairs,
    /// ordered by ascending distance. Returns fewer than k when the index
    /// holds fewer vectors.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let ntotal = self.ntotal();
        if ntotal == 0 || k == 0 || query.len() != self.dimension {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = (0..ntotal)
            .map(|i| {
                let start = i * self.dimension;
                let vector = &self.data[start..start + self.dimension];
                let distance: f32 = vector
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (i, distance)
            })
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Serialize the index to its binary artifact format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(16 + self.data.len() * 4);
        bytes.extend_from_slice(&INDEX_MAGIC);
        bytes.extend_from_slice(&INDEX_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.ntotal() as u32).to_le_bytes());
        for value in &self.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Deserialize an index from its binary artifact format
    ///
    /// # Errors
    /// - Truncated or malformed artifact
    /// - Unknown magic or unsupported version
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 16 {
            return Err(OpsRagError::Persistence(
                "Index artifact is truncated".to_string(),
            ));
        }
        if bytes[0..4] != INDEX_MAGIC {
            return Err(OpsRagError::Persistence(
                "Index artifact has unknown magic bytes".to_string(),
            ));
        }
        let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        if version != INDEX_VERSION {
            return Err(OpsRagError::Persistence(format!(
                "Unsupported index artifact version: {version}"
            )));
        }
        let dimension = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        let count = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;

        let expected_len = 16 + count * dimension * 4;
        if bytes.len() != expected_len {
            return Err(OpsRagError::Persistence(format!(
                "Index artifact length mismatch: expected {expected_len} bytes, got {}",
                bytes.len()
            )));
        }

        let mut data = Vec::with_capacity(count * dimension);
        for chunk in bytes[16..].chunks_exact(4) {
            data.push(f32::from_le_bytes(chunk.try_into().unwrap()));
        }

        Ok(Self { dimension, data })
    }

    /// Write the index artifact to disk
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Read an index artifact from disk
    ///
    /// # Errors
    /// - Missing or unreadable file
    /// - Malformed artifact contents
    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            OpsRagError::Persistence(format!(
                "Failed to read index artifact {}: {e}",
                path.display()
            ))
        })?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_index_returns_no_results() {
        let index = FlatIndex::new(4);
        assert_eq!(index.ntotal(), 0);
        assert!(index.search(&[0.0, 0.0, 0.0, 0.0], 4).is_empty());
    }

    #[test]
    fn test_add_rejects_dimension_mismatch() {
        let mut index = FlatIndex::new(4);
        let result = index.add(&[vec![1.0, 2.0]]);
        assert!(result.is_err());
        assert_eq!(index.ntotal(), 0);
    }

    #[test]
    fn test_search_orders_by_ascending_distance() {
        let mut index = FlatIndex::new(2);
        index
            .add(&[vec![0.0, 0.0], vec![3.0, 4.0], vec![1.0, 0.0]])
            .unwrap();

        let results = index.search(&[0.0, 0.0], 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, 0);
        assert_eq!(results[1].0, 2);
        assert_eq!(results[2].0, 1);
        assert!((results[2].1 - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_returns_at_most_k() {
        let mut index = FlatIndex::new(2);
        index
            .add(&[vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 2.0]])
            .unwrap();

        assert_eq!(index.search(&[0.0, 0.0], 2).len(), 2);
        // k larger than the index returns everything available
        assert_eq!(index.search(&[0.0, 0.0], 10).len(), 3);
    }

    #[test]
    fn test_round_trip_through_bytes() {
        let mut index = FlatIndex::new(3);
        index
            .add(&[vec![1.0, 2.0, 3.0], vec![-1.0, 0.5, 0.25]])
            .unwrap();

        let restored = FlatIndex::from_bytes(&index.to_bytes()).unwrap();
        assert_eq!(restored.dimension(), 3);
        assert_eq!(restored.ntotal(), 2);
        assert_eq!(restored.search(&[1.0, 2.0, 3.0], 1)[0].0, 0);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(FlatIndex::from_bytes(b"not an index").is_err());
        assert!(FlatIndex::from_bytes(&[]).is_err());

        // Valid header but truncated payload
        let mut index = FlatIndex::new(2);
        index.add(&[vec![1.0, 2.0]]).unwrap();
        let mut bytes = index.to_bytes();
        bytes.truncate(bytes.len() - 2);
        assert!(FlatIndex::from_bytes(&bytes).is_err());
    }
}

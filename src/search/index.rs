//! Exact nearest-neighbor index read from a FAISS flat index file.
//!
//! # File Format
//!
//! Only the flat (brute force) FAISS layouts are understood:
//! - fourcc: `IxF2` (L2), `IxFI` (inner product) or `IxFl` (metric from header)
//! - header: `d: i32`, `ntotal: i64`, two reserved `i64`, `is_trained: u8`,
//!   `metric_type: i32`, plus `metric_arg: f32` when `metric_type > 1`
//! - payload: `u64` float count followed by `ntotal * d` little-endian `f32`
//!
//! All integers are little-endian.

use std::path::Path;

use thiserror::Error;

/// Position reported for result slots that have no vector behind them.
pub const EMPTY_SLOT: i64 = -1;

const FOURCC_L2: &[u8; 4] = b"IxF2";
const FOURCC_IP: &[u8; 4] = b"IxFI";
const FOURCC_GENERIC: &[u8; 4] = b"IxFl";

/// Value FAISS writes into the two reserved header fields.
const RESERVED_HEADER_VALUE: i64 = 1 << 20;

#[derive(Error, Debug)]
pub enum IndexFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported index type {0:?}: only flat indexes can be loaded")]
    UnsupportedType(String),

    #[error("Unsupported metric type {0}")]
    UnsupportedMetric(i32),

    #[error("Invalid index file: {0}")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Larger is closer.
    InnerProduct,
    /// Squared euclidean distance, smaller is closer.
    L2,
}

impl Metric {
    fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Metric::InnerProduct),
            1 => Some(Metric::L2),
            _ => None,
        }
    }

    fn code(self) -> i32 {
        match self {
            Metric::InnerProduct => 0,
            Metric::L2 => 1,
        }
    }

    /// Distance reported for padded slots.
    fn worst(self) -> f32 {
        match self {
            Metric::InnerProduct => f32::NEG_INFINITY,
            Metric::L2 => f32::INFINITY,
        }
    }
}

/// One result slot: a vector position (or [`EMPTY_SLOT`]) and its distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: i64,
    pub distance: f32,
}

/// Flat vector index held in memory. Read-only after construction.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    metric: Metric,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from `vectors`, a row-major buffer of `dimension`-wide rows.
    pub fn new(dimension: usize, metric: Metric, vectors: Vec<f32>) -> Result<Self, IndexFileError> {
        if dimension == 0 {
            return Err(IndexFileError::InvalidFormat(
                "dimension must be positive".to_string(),
            ));
        }
        if vectors.len() % dimension != 0 {
            return Err(IndexFileError::InvalidFormat(format!(
                "{} floats is not a multiple of dimension {dimension}",
                vectors.len()
            )));
        }
        Ok(Self {
            dimension,
            metric,
            vectors,
        })
    }

    pub fn open(path: &Path) -> Result<Self, IndexFileError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IndexFileError> {
        let mut r = ByteReader::new(bytes);

        let fourcc = r.take(4)?;
        let implied = match fourcc {
            f if f == FOURCC_L2 => Some(Metric::L2),
            f if f == FOURCC_IP => Some(Metric::InnerProduct),
            f if f == FOURCC_GENERIC => None,
            other => {
                return Err(IndexFileError::UnsupportedType(
                    String::from_utf8_lossy(other).into_owned(),
                ))
            }
        };

        let d = r.i32()?;
        let ntotal = r.i64()?;
        let _reserved = (r.i64()?, r.i64()?);
        let _is_trained = r.u8()?;
        let metric_code = r.i32()?;
        if metric_code > 1 {
            let _metric_arg = r.f32()?;
        }

        let metric = Metric::from_code(metric_code)
            .ok_or(IndexFileError::UnsupportedMetric(metric_code))?;
        if let Some(implied) = implied {
            if implied != metric {
                return Err(IndexFileError::InvalidFormat(format!(
                    "fourcc says {implied:?} but header says {metric:?}"
                )));
            }
        }
        if d <= 0 {
            return Err(IndexFileError::InvalidFormat(format!("bad dimension {d}")));
        }
        if ntotal < 0 {
            return Err(IndexFileError::InvalidFormat(format!("bad vector count {ntotal}")));
        }

        let dimension = d as usize;
        let float_count = r.u64()?;
        let expected = (dimension as u64)
            .checked_mul(ntotal as u64)
            .ok_or_else(|| {
                IndexFileError::InvalidFormat(format!(
                    "{ntotal} vectors of dimension {dimension} is too large"
                ))
            })?;
        if float_count != expected {
            return Err(IndexFileError::InvalidFormat(format!(
                "payload holds {float_count} floats, header implies {expected}"
            )));
        }

        let byte_len = usize::try_from(float_count)
            .ok()
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| IndexFileError::InvalidFormat("payload too large".to_string()))?;
        let vectors = r
            .take(byte_len)?
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Self::new(dimension, metric, vectors)
    }

    /// Serialize in the FAISS flat layout accepted by [`FlatIndex::from_bytes`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let fourcc = match self.metric {
            Metric::L2 => FOURCC_L2,
            Metric::InnerProduct => FOURCC_IP,
        };
        let mut out = Vec::with_capacity(45 + self.vectors.len() * 4);
        out.extend_from_slice(fourcc);
        out.extend_from_slice(&(self.dimension as i32).to_le_bytes());
        out.extend_from_slice(&(self.len() as i64).to_le_bytes());
        out.extend_from_slice(&RESERVED_HEADER_VALUE.to_le_bytes());
        out.extend_from_slice(&RESERVED_HEADER_VALUE.to_le_bytes());
        out.push(1);
        out.extend_from_slice(&self.metric.code().to_le_bytes());
        out.extend_from_slice(&(self.vectors.len() as u64).to_le_bytes());
        for v in &self.vectors {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Number of vectors in the index.
    pub fn len(&self) -> usize {
        self.vectors.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Return exactly `k` slots ordered best-first. Slots past the number of
    /// stored vectors carry [`EMPTY_SLOT`]. `query` must have `dimension()`
    /// components.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        debug_assert_eq!(query.len(), self.dimension);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(i, row)| (i, self.distance(query, row)))
            .collect();

        // Stable sort keeps insertion order among ties
        match self.metric {
            Metric::L2 => scored.sort_by(|a, b| {
                a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
            }),
            Metric::InnerProduct => scored.sort_by(|a, b| {
                b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
            }),
        }
        scored.truncate(k);

        let mut neighbors: Vec<Neighbor> = scored
            .into_iter()
            .map(|(i, distance)| Neighbor {
                position: i as i64,
                distance,
            })
            .collect();
        neighbors.resize(
            k,
            Neighbor {
                position: EMPTY_SLOT,
                distance: self.metric.worst(),
            },
        );
        neighbors
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            Metric::InnerProduct => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            Metric::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = x - y;
                    d * d
                })
                .sum(),
        }
    }
}

/// Little-endian cursor over an in-memory file.
struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], IndexFileError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                IndexFileError::InvalidFormat(format!(
                    "unexpected end of file at byte {} (wanted {n} more)",
                    self.pos
                ))
            })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], IndexFileError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, IndexFileError> {
        Ok(self.take(1)?[0])
    }

    fn i32(&mut self) -> Result<i32, IndexFileError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, IndexFileError> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, IndexFileError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32, IndexFileError> {
        Ok(f32::from_le_bytes(self.array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l2_index() -> FlatIndex {
        FlatIndex::new(
            2,
            Metric::L2,
            vec![
                0.0, 0.0, // 0
                1.0, 0.0, // 1
                0.0, 5.0, // 2
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_l2_orders_by_ascending_distance() {
        let index = l2_index();
        let hits = index.search(&[0.9, 0.1], 3);
        let positions: Vec<i64> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![1, 0, 2]);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[test]
    fn test_inner_product_orders_by_descending_similarity() {
        let index =
            FlatIndex::new(2, Metric::InnerProduct, vec![0.1, 0.9, 0.9, 0.1, 0.5, 0.5]).unwrap();
        let hits = index.search(&[1.0, 0.0], 2);
        assert_eq!(hits[0].position, 1);
        assert_eq!(hits[1].position, 2);
        assert!(hits[0].distance > hits[1].distance);
    }

    #[test]
    fn test_short_index_pads_with_empty_slots() {
        let index = l2_index();
        let hits = index.search(&[0.0, 0.0], 5);
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[3].position, EMPTY_SLOT);
        assert_eq!(hits[4].position, EMPTY_SLOT);
        assert!(hits[4].distance.is_infinite());
    }

    #[test]
    fn test_empty_index_leads_with_sentinel() {
        let index = FlatIndex::new(3, Metric::L2, Vec::new()).unwrap();
        assert!(index.is_empty());
        let hits = index.search(&[1.0, 2.0, 3.0], 5);
        assert_eq!(hits[0].position, EMPTY_SLOT);
    }

    #[test]
    fn test_ties_keep_index_order() {
        let index = FlatIndex::new(1, Metric::L2, vec![2.0, 0.0, 2.0]).unwrap();
        let hits = index.search(&[1.0], 3);
        let positions: Vec<i64> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_file_layout_survives_reload() {
        let index = l2_index();
        let loaded = FlatIndex::from_bytes(&index.to_bytes()).unwrap();
        assert_eq!(loaded.dimension(), 2);
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.metric(), Metric::L2);
        assert_eq!(loaded.search(&[0.0, 4.0], 1)[0].position, 2);
    }

    #[test]
    fn test_generic_flat_reads_metric_from_header() {
        let mut bytes = FlatIndex::new(1, Metric::InnerProduct, vec![1.0])
            .unwrap()
            .to_bytes();
        bytes[..4].copy_from_slice(FOURCC_GENERIC);
        let loaded = FlatIndex::from_bytes(&bytes).unwrap();
        assert_eq!(loaded.metric(), Metric::InnerProduct);
    }

    #[test]
    fn test_rejects_non_flat_index() {
        let mut bytes = l2_index().to_bytes();
        bytes[..4].copy_from_slice(b"IHNf");
        match FlatIndex::from_bytes(&bytes) {
            Err(IndexFileError::UnsupportedType(t)) => assert_eq!(t, "IHNf"),
            other => panic!("expected UnsupportedType, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let bytes = l2_index().to_bytes();
        let err = FlatIndex::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, IndexFileError::InvalidFormat(_)));
    }

    #[test]
    fn test_rejects_metric_disagreement() {
        let mut bytes = l2_index().to_bytes();
        // metric_type sits after fourcc(4) + d(4) + ntotal(8) + reserved(16) + is_trained(1)
        bytes[33..37].copy_from_slice(&0i32.to_le_bytes());
        assert!(matches!(
            FlatIndex::from_bytes(&bytes),
            Err(IndexFileError::InvalidFormat(_))
        ));
    }

    /// Header of a generic flat index with every field supplied by the caller.
    fn raw_header(d: i32, ntotal: i64, metric_code: i32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(FOURCC_GENERIC);
        out.extend_from_slice(&d.to_le_bytes());
        out.extend_from_slice(&ntotal.to_le_bytes());
        out.extend_from_slice(&RESERVED_HEADER_VALUE.to_le_bytes());
        out.extend_from_slice(&RESERVED_HEADER_VALUE.to_le_bytes());
        out.push(1);
        out.extend_from_slice(&metric_code.to_le_bytes());
        out
    }

    #[test]
    fn test_rejects_oversized_header_counts() {
        let mut bytes = raw_header(i32::MAX, i64::MAX, 1);
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        match FlatIndex::from_bytes(&bytes) {
            Err(IndexFileError::InvalidFormat(msg)) => assert!(msg.contains("too large")),
            other => panic!("expected InvalidFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_metric_with_argument_is_unsupported() {
        // metric_type 2 and above carry a trailing f32 argument
        let mut bytes = raw_header(1, 1, 2);
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        assert!(matches!(
            FlatIndex::from_bytes(&bytes),
            Err(IndexFileError::UnsupportedMetric(2))
        ));
    }

    #[test]
    fn test_rejects_ragged_vectors() {
        assert!(FlatIndex::new(3, Metric::L2, vec![1.0, 2.0]).is_err());
        assert!(FlatIndex::new(0, Metric::L2, vec![]).is_err());
    }
}

//! HNSW index with a NodeId mapping layer
//!
//! The HNSW graph cannot remove points, so the mapping layer owns
//! liveness: `upsert` retires the old internal index and registers a new
//! one, `delete` drops the mapping, and `search` over-fetches and
//! filters dead hits. Vectors are L2-normalized on insert so cosine
//! distance turns into `1 - dot`.

use crate::{VectorError, VectorResult};
use dashmap::DashMap;
use hnsw_rs::prelude::*;
use parking_lot::{Mutex, RwLock};
use rdf_model::NodeId;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// HNSW construction and search parameters
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct HnswParams {
    /// Max connections per node per layer (`M`)
    pub m: usize,
    /// Candidate list size during construction
    pub ef_construction: usize,
    /// Candidate list size during search
    pub ef_search: usize,
    /// Capacity hint for layer sizing
    pub capacity: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 64,
            capacity: 100_000,
        }
    }
}

/// Origin of an embedded node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorKind {
    /// The node is an IRI resource
    Iri,
    /// The node is a literal
    Literal,
}

/// Payload stored alongside each vector
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorPayload {
    /// IRI or lexical form of the owning node
    pub uri: String,
    /// Optional content snippet
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub snippet: Option<String>,
    /// Origin tag
    pub kind: VectorKind,
}

/// One search result
#[derive(Clone, Debug)]
pub struct SearchHit {
    /// Owning node
    pub node_id: NodeId,
    /// Cosine similarity mapped into [0, 1]
    pub score: f32,
    /// Stored payload
    pub payload: VectorPayload,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum VectorRecord {
    Add {
        node_id: NodeId,
        vector: Vec<f32>,
        payload: VectorPayload,
    },
    Del {
        node_id: NodeId,
    },
}

struct Index {
    dimension: usize,
    hnsw: Hnsw<'static, f32, DistCosine>,
    ids: DashMap<NodeId, usize>,
    live: DashMap<usize, NodeId>,
    payloads: DashMap<NodeId, VectorPayload>,
    vectors: DashMap<NodeId, Vec<f32>>,
    next_internal: AtomicUsize,
    dead: AtomicUsize,
    ef_search: usize,
}

impl Index {
    fn new(dimension: usize, params: &HnswParams) -> Self {
        let hnsw = Hnsw::new(
            params.m,
            params.capacity,
            16,
            params.ef_construction,
            DistCosine {},
        );
        Self {
            dimension,
            hnsw,
            ids: DashMap::new(),
            live: DashMap::new(),
            payloads: DashMap::new(),
            vectors: DashMap::new(),
            next_internal: AtomicUsize::new(0),
            dead: AtomicUsize::new(0),
            ef_search: params.ef_search,
        }
    }

    fn upsert(&self, node_id: NodeId, vector: Vec<f32>, payload: VectorPayload) {
        let internal = self.next_internal.fetch_add(1, Ordering::SeqCst);
        self.hnsw.insert((&vector, internal));
        if let Some(old) = self.ids.insert(node_id, internal) {
            self.live.remove(&old);
            self.dead.fetch_add(1, Ordering::Relaxed);
        }
        self.live.insert(internal, node_id);
        self.payloads.insert(node_id, payload);
        self.vectors.insert(node_id, vector);
    }

    fn delete(&self, node_id: NodeId) -> bool {
        let Some((_, internal)) = self.ids.remove(&node_id) else {
            return false;
        };
        self.live.remove(&internal);
        self.payloads.remove(&node_id);
        self.vectors.remove(&node_id);
        self.dead.fetch_add(1, Ordering::Relaxed);
        true
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        if self.ids.is_empty() || k == 0 {
            return Vec::new();
        }
        // over-fetch to ride out tombstoned points
        let fetch = k + self.dead.load(Ordering::Relaxed);
        let ef = self.ef_search.max(fetch);
        let mut hits = Vec::with_capacity(k);
        for neighbour in self.hnsw.search(query, fetch, ef) {
            let Some(node_id) = self.live.get(&neighbour.d_id).map(|e| *e.value()) else {
                continue;
            };
            let Some(payload) = self.payloads.get(&node_id).map(|e| e.value().clone()) else {
                continue;
            };
            hits.push(SearchHit {
                node_id,
                score: (1.0 - neighbour.distance).clamp(0.0, 1.0),
                payload,
            });
            if hits.len() == k {
                break;
            }
        }
        hits
    }
}

/// Per-namespace vector store.
///
/// The dimension is unset until the first upsert; every later vector
/// must match it or fails with [`VectorError::DimensionMismatch`].
/// Records are appended to `index/vectors.log` under the namespace
/// directory when one is configured, and replayed on open.
pub struct VectorStore {
    params: HnswParams,
    inner: RwLock<Option<Arc<Index>>>,
    log: Mutex<Option<BufWriter<File>>>,
}

impl VectorStore {
    /// Create an in-memory store (tests, ephemeral namespaces)
    pub fn in_memory(params: HnswParams) -> Self {
        Self {
            params,
            inner: RwLock::new(None),
            log: Mutex::new(None),
        }
    }

    /// Open a store backed by `dir/vectors.log`, replaying existing records
    pub fn open(dir: &Path, params: HnswParams) -> VectorResult<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("vectors.log");
        let store = Self {
            params,
            inner: RwLock::new(None),
            log: Mutex::new(None),
        };

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str(&line)? {
                    VectorRecord::Add {
                        node_id,
                        vector,
                        payload,
                    } => {
                        store.apply_upsert(node_id, vector, payload)?;
                    }
                    VectorRecord::Del { node_id } => {
                        store.apply_delete(node_id);
                    }
                }
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        *store.log.lock() = Some(BufWriter::new(file));
        Ok(store)
    }

    /// Fixed dimension, if any vector was ever inserted
    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().as_ref().map(|i| i.dimension)
    }

    /// Number of live vector records
    pub fn len(&self) -> usize {
        self.inner.read().as_ref().map_or(0, |i| i.ids.len())
    }

    /// Check whether the store holds no vectors
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or replace the vector for a node
    pub fn upsert(
        &self,
        node_id: NodeId,
        vector: Vec<f32>,
        payload: VectorPayload,
    ) -> VectorResult<()> {
        let vector = l2_normalize(vector)?;
        self.append_log(&VectorRecord::Add {
            node_id,
            vector: vector.clone(),
            payload: payload.clone(),
        })?;
        self.apply_upsert(node_id, vector, payload)
    }

    fn apply_upsert(
        &self,
        node_id: NodeId,
        vector: Vec<f32>,
        payload: VectorPayload,
    ) -> VectorResult<()> {
        {
            let guard = self.inner.read();
            if let Some(index) = guard.as_ref() {
                if vector.len() != index.dimension {
                    return Err(VectorError::DimensionMismatch {
                        expected: index.dimension,
                        actual: vector.len(),
                    });
                }
                index.upsert(node_id, vector, payload);
                return Ok(());
            }
        }
        let mut guard = self.inner.write();
        let index = guard
            .get_or_insert_with(|| Arc::new(Index::new(vector.len(), &self.params)))
            .clone();
        if vector.len() != index.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: index.dimension,
                actual: vector.len(),
            });
        }
        index.upsert(node_id, vector, payload);
        Ok(())
    }

    /// Remove a node's vector; returns whether it existed
    pub fn delete(&self, node_id: NodeId) -> VectorResult<bool> {
        let removed = self.apply_delete(node_id);
        if removed {
            self.append_log(&VectorRecord::Del { node_id })?;
        }
        Ok(removed)
    }

    fn apply_delete(&self, node_id: NodeId) -> bool {
        self.inner
            .read()
            .as_ref()
            .map_or(false, |index| index.delete(node_id))
    }

    /// k-nearest-neighbor search; scores in [0, 1]
    pub fn search(&self, query: &[f32], k: usize) -> VectorResult<Vec<SearchHit>> {
        let Some(index) = self.inner.read().as_ref().cloned() else {
            return Ok(Vec::new());
        };
        if query.len() != index.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: index.dimension,
                actual: query.len(),
            });
        }
        let query = l2_normalize(query.to_vec())?;
        Ok(index.search(&query, k))
    }

    /// Flush the record log
    pub fn flush(&self) -> VectorResult<()> {
        if let Some(writer) = self.log.lock().as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn append_log(&self, record: &VectorRecord) -> VectorResult<()> {
        let mut guard = self.log.lock();
        if let Some(writer) = guard.as_mut() {
            let line = serde_json::to_string(record)?;
            writeln!(writer, "{line}")?;
        }
        Ok(())
    }
}

fn l2_normalize(mut v: Vec<f32>) -> VectorResult<Vec<f32>> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() || norm == 0.0 {
        return Err(VectorError::InvalidVector(
            "vector has zero or non-finite norm".to_string(),
        ));
    }
    for x in &mut v {
        *x /= norm;
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(uri: &str) -> VectorPayload {
        VectorPayload {
            uri: uri.to_string(),
            snippet: None,
            kind: VectorKind::Iri,
        }
    }

    #[test]
    fn test_insert_and_exact_search() {
        let store = VectorStore::in_memory(HnswParams::default());
        store
            .upsert(NodeId::new(1), vec![1.0, 0.0, 0.0], payload("http://ex/a"))
            .unwrap();
        store
            .upsert(NodeId::new(2), vec![0.0, 1.0, 0.0], payload("http://ex/b"))
            .unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node_id, NodeId::new(1));
        assert!(hits[0].score >= 0.999);
    }

    #[test]
    fn test_dimension_fixed_at_first_insert() {
        let store = VectorStore::in_memory(HnswParams::default());
        store
            .upsert(NodeId::new(1), vec![1.0, 0.0], payload("a"))
            .unwrap();
        let err = store
            .upsert(NodeId::new(2), vec![1.0, 0.0, 0.0], payload("b"))
            .unwrap_err();
        assert!(matches!(err, VectorError::DimensionMismatch { expected: 2, actual: 3 }));
        assert_eq!(store.dimension(), Some(2));
    }

    #[test]
    fn test_upsert_replaces() {
        let store = VectorStore::in_memory(HnswParams::default());
        store
            .upsert(NodeId::new(1), vec![1.0, 0.0], payload("old"))
            .unwrap();
        store
            .upsert(NodeId::new(1), vec![0.0, 1.0], payload("new"))
            .unwrap();
        assert_eq!(store.len(), 1);

        let hits = store.search(&[0.0, 1.0], 1).unwrap();
        assert_eq!(hits[0].node_id, NodeId::new(1));
        assert_eq!(hits[0].payload.uri, "new");
        assert!(hits[0].score >= 0.999);
    }

    #[test]
    fn test_delete_hides_from_search() {
        let store = VectorStore::in_memory(HnswParams::default());
        store
            .upsert(NodeId::new(1), vec![1.0, 0.0], payload("a"))
            .unwrap();
        store
            .upsert(NodeId::new(2), vec![0.9, 0.1], payload("b"))
            .unwrap();
        assert!(store.delete(NodeId::new(1)).unwrap());
        assert!(!store.delete(NodeId::new(1)).unwrap());

        let hits = store.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node_id, NodeId::new(2));
    }

    #[test]
    fn test_zero_vector_rejected() {
        let store = VectorStore::in_memory(HnswParams::default());
        let err = store
            .upsert(NodeId::new(1), vec![0.0, 0.0], payload("a"))
            .unwrap_err();
        assert!(matches!(err, VectorError::InvalidVector(_)));
    }

    #[test]
    fn test_scores_are_normalized() {
        let store = VectorStore::in_memory(HnswParams::default());
        // same direction, different magnitude: cosine must treat as equal
        store
            .upsert(NodeId::new(1), vec![10.0, 0.0], payload("a"))
            .unwrap();
        let hits = store.search(&[0.1, 0.0], 1).unwrap();
        assert!(hits[0].score >= 0.999);
        assert!(hits[0].score <= 1.0);
    }

    #[test]
    fn test_log_replay_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("index");
        {
            let store = VectorStore::open(&dir, HnswParams::default()).unwrap();
            store
                .upsert(NodeId::new(1), vec![1.0, 0.0], payload("keep"))
                .unwrap();
            store
                .upsert(NodeId::new(2), vec![0.0, 1.0], payload("gone"))
                .unwrap();
            store.delete(NodeId::new(2)).unwrap();
            store.flush().unwrap();
        }

        let store = VectorStore::open(&dir, HnswParams::default()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.dimension(), Some(2));
        let hits = store.search(&[1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload.uri, "keep");
    }
}

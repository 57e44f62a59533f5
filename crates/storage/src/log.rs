//! Append-only persistence for one namespace
//!
//! Layout under the namespace directory:
//!
//! ```text
//! dict.log           append-only id↔term records
//! quads.log          append-only quad+provenance records
//! index/             vector index shards (owned by the vector layer)
//! manifest.json      {dimension?, triple_count, vector_count}
//! ```
//!
//! Startup replays `dict.log` then `quads.log` to rebuild the in-memory
//! structures; writes append to the logs as they hit the in-memory
//! indexes; compaction rewrites both files dropping tombstoned rows.

use crate::provenance::Provenance;
use crate::triple_store::{IdTriple, TripleStore};
use crate::{StorageError, StorageResult};
use rdf_model::{Dictionary, NodeId, Term, TripleId};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const DICT_LOG: &str = "dict.log";
const QUAD_LOG: &str = "quads.log";
const MANIFEST: &str = "manifest.json";

/// Snapshot of namespace counters persisted next to the logs
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Vector dimension, fixed at first vector insert
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dimension: Option<usize>,
    /// Number of live quads
    pub triple_count: u64,
    /// Number of live vector records
    pub vector_count: u64,
}

#[derive(Serialize, Deserialize)]
struct DictRecord {
    id: NodeId,
    term: Term,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum QuadRecord {
    Add {
        id: TripleId,
        s: NodeId,
        p: NodeId,
        o: NodeId,
        prov: Provenance,
    },
    Del {
        id: TripleId,
    },
}

/// Open log writers for one namespace directory
pub struct NamespaceLog {
    dir: PathBuf,
    dict: BufWriter<File>,
    quads: BufWriter<File>,
}

impl NamespaceLog {
    /// Open (creating if needed) the log files under `dir`
    pub fn open(dir: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(dir.join("index"))?;
        let dict = append_writer(&dir.join(DICT_LOG))?;
        let quads = append_writer(&dir.join(QUAD_LOG))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            dict,
            quads,
        })
    }

    /// Namespace directory this log writes into
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record a freshly allocated dictionary entry
    pub fn append_term(&mut self, id: NodeId, term: &Term) -> StorageResult<()> {
        let line = serde_json::to_string(&DictRecord {
            id,
            term: term.clone(),
        })?;
        writeln!(self.dict, "{line}")?;
        Ok(())
    }

    /// Record a stored quad
    pub fn append_quad(
        &mut self,
        id: TripleId,
        triple: &IdTriple,
        prov: &Provenance,
    ) -> StorageResult<()> {
        let line = serde_json::to_string(&QuadRecord::Add {
            id,
            s: triple.s,
            p: triple.p,
            o: triple.o,
            prov: prov.clone(),
        })?;
        writeln!(self.quads, "{line}")?;
        Ok(())
    }

    /// Record a deletion
    pub fn append_tombstone(&mut self, id: TripleId) -> StorageResult<()> {
        let line = serde_json::to_string(&QuadRecord::Del { id })?;
        writeln!(self.quads, "{line}")?;
        Ok(())
    }

    /// Flush buffered records to disk
    pub fn flush(&mut self) -> StorageResult<()> {
        self.dict.flush()?;
        self.quads.flush()?;
        Ok(())
    }

    /// Rewrite both logs from live state, dropping tombstoned rows.
    ///
    /// Writes to temporary files first and renames over the originals, so
    /// a crash mid-compaction leaves the previous logs intact.
    pub fn compact(
        &mut self,
        dictionary: &Dictionary,
        store: &TripleStore,
    ) -> StorageResult<()> {
        self.flush()?;

        let dict_tmp = self.dir.join("dict.log.tmp");
        {
            let mut w = BufWriter::new(File::create(&dict_tmp)?);
            for (id, term) in dictionary.iter() {
                let line = serde_json::to_string(&DictRecord {
                    id,
                    term: term.clone(),
                })?;
                writeln!(w, "{line}")?;
            }
            w.flush()?;
        }

        let quad_tmp = self.dir.join("quads.log.tmp");
        {
            let mut w = BufWriter::new(File::create(&quad_tmp)?);
            let mut live: Vec<_> = store.iter().collect();
            live.sort_by_key(|(id, _)| *id);
            for (id, t) in live {
                let prov = store
                    .provenance(id)
                    .cloned()
                    .ok_or_else(|| StorageError::Corrupt(format!("quad {id} has no ledger row")))?;
                let line = serde_json::to_string(&QuadRecord::Add {
                    id,
                    s: t.s,
                    p: t.p,
                    o: t.o,
                    prov,
                })?;
                writeln!(w, "{line}")?;
            }
            w.flush()?;
        }

        std::fs::rename(&dict_tmp, self.dir.join(DICT_LOG))?;
        std::fs::rename(&quad_tmp, self.dir.join(QUAD_LOG))?;

        self.dict = append_writer(&self.dir.join(DICT_LOG))?;
        self.quads = append_writer(&self.dir.join(QUAD_LOG))?;
        tracing::debug!(dir = %self.dir.display(), "compacted namespace logs");
        Ok(())
    }

    /// Persist the manifest
    pub fn write_manifest(&self, manifest: &Manifest) -> StorageResult<()> {
        let path = self.dir.join(MANIFEST);
        let tmp = self.dir.join("manifest.json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(manifest)?)?;
        std::fs::rename(tmp, path)?;
        Ok(())
    }

    /// Read the manifest, if one was ever written
    pub fn read_manifest(dir: &Path) -> StorageResult<Option<Manifest>> {
        let path = dir.join(MANIFEST);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

fn append_writer(path: &Path) -> StorageResult<BufWriter<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

/// Rebuild a namespace from its logs.
///
/// Replays `dict.log`, then `quads.log` (honoring tombstones), verifies
/// the permutation indexes, and hands back open log writers.
pub fn load_namespace(
    dir: &Path,
) -> StorageResult<(Dictionary, TripleStore, NamespaceLog)> {
    let mut dictionary = Dictionary::new();
    let mut store = TripleStore::new();

    let dict_path = dir.join(DICT_LOG);
    if dict_path.exists() {
        let reader = BufReader::new(File::open(&dict_path)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: DictRecord = serde_json::from_str(&line)?;
            if !dictionary.restore(record.id, record.term) {
                return Err(StorageError::Corrupt(format!(
                    "dict.log out of order at id {}",
                    record.id
                )));
            }
        }
    }

    let quad_path = dir.join(QUAD_LOG);
    if quad_path.exists() {
        let reader = BufReader::new(File::open(&quad_path)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line)? {
                QuadRecord::Add { id, s, p, o, prov } => {
                    store.restore(id, IdTriple::new(s, p, o), prov)?;
                }
                QuadRecord::Del { id } => {
                    // cascaded deletions also wrote tombstones
                    let _ = store.delete(id);
                }
            }
        }
    }

    store.verify_and_repair();
    let log = NamespaceLog::open(dir)?;
    Ok((dictionary, store, log))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_model::Term;

    fn intern3(dict: &mut Dictionary, log: &mut NamespaceLog, terms: [&Term; 3]) -> IdTriple {
        let ids: Vec<NodeId> = terms
            .iter()
            .map(|t| {
                let before = dict.len();
                let id = dict.intern(t);
                if dict.len() > before {
                    log.append_term(id, t).unwrap();
                }
                id
            })
            .collect();
        IdTriple::new(ids[0], ids[1], ids[2])
    }

    #[test]
    fn test_replay_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("ns1");

        {
            let mut log = NamespaceLog::open(&dir).unwrap();
            let mut dict = Dictionary::new();
            let mut store = TripleStore::new();

            let s = Term::iri("http://ex.org/A");
            let p = Term::iri("http://ex.org/p");
            let o = Term::literal("v");
            let triple = intern3(&mut dict, &mut log, [&s, &p, &o]);

            let outcome = store.insert(triple, Provenance::ingested("test", "unit"));
            log.append_quad(outcome.id, &triple, store.provenance(outcome.id).unwrap())
                .unwrap();
            log.flush().unwrap();
        }

        let (dict, store, _log) = load_namespace(&dir).unwrap();
        assert_eq!(dict.len(), 3);
        assert_eq!(store.len(), 1);
        assert_eq!(dict.resolve(NodeId::new(3)), Some(&Term::literal("v")));
    }

    #[test]
    fn test_tombstone_replay() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("ns1");

        {
            let mut log = NamespaceLog::open(&dir).unwrap();
            let mut dict = Dictionary::new();
            let mut store = TripleStore::new();

            let terms = [
                Term::iri("http://ex.org/A"),
                Term::iri("http://ex.org/p"),
                Term::iri("http://ex.org/B"),
            ];
            let triple = intern3(&mut dict, &mut log, [&terms[0], &terms[1], &terms[2]]);
            let outcome = store.insert(triple, Provenance::ingested("test", "unit"));
            log.append_quad(outcome.id, &triple, store.provenance(outcome.id).unwrap())
                .unwrap();
            log.append_tombstone(outcome.id).unwrap();
            log.flush().unwrap();
        }

        let (dict, store, _log) = load_namespace(&dir).unwrap();
        assert_eq!(store.len(), 0);
        // dictionary entries survive quad deletion
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn test_compaction_drops_tombstones() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("ns1");

        let mut log = NamespaceLog::open(&dir).unwrap();
        let mut dict = Dictionary::new();
        let mut store = TripleStore::new();

        let keep = intern3(
            &mut dict,
            &mut log,
            [
                &Term::iri("http://ex.org/A"),
                &Term::iri("http://ex.org/p"),
                &Term::iri("http://ex.org/B"),
            ],
        );
        let gone = intern3(
            &mut dict,
            &mut log,
            [
                &Term::iri("http://ex.org/C"),
                &Term::iri("http://ex.org/p"),
                &Term::iri("http://ex.org/D"),
            ],
        );

        let keep_out = store.insert(keep, Provenance::ingested("test", "unit"));
        log.append_quad(keep_out.id, &keep, store.provenance(keep_out.id).unwrap())
            .unwrap();
        let gone_out = store.insert(gone, Provenance::ingested("test", "unit"));
        log.append_quad(gone_out.id, &gone, store.provenance(gone_out.id).unwrap())
            .unwrap();
        store.delete(gone_out.id).unwrap();
        log.append_tombstone(gone_out.id).unwrap();

        log.compact(&dict, &store).unwrap();

        let quad_lines = std::fs::read_to_string(dir.join("quads.log")).unwrap();
        assert_eq!(quad_lines.lines().count(), 1);

        let (_, store2, _) = load_namespace(&dir).unwrap();
        assert_eq!(store2.len(), 1);
        assert!(store2.contains(&keep));
    }

    #[test]
    fn test_manifest_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("ns1");
        let log = NamespaceLog::open(&dir).unwrap();

        assert_eq!(NamespaceLog::read_manifest(&dir).unwrap(), None);
        let manifest = Manifest {
            dimension: Some(384),
            triple_count: 10,
            vector_count: 4,
        };
        log.write_manifest(&manifest).unwrap();
        assert_eq!(NamespaceLog::read_manifest(&dir).unwrap(), Some(manifest));
    }
}

//! Provenance ledger: origin attribution and inference chains
//!
//! Append-only per namespace. Every stored quad carries one row; rows for
//! materialized quads reference the premise quads and the rule that
//! produced them, which is what makes cascade retraction possible.

use chrono::{DateTime, Utc};
use rdf_model::TripleId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Rule name and ordered premise set behind an inferred quad
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceChain {
    /// Name of the rule that fired
    pub rule: String,
    /// Ids of the premise quads, in rule-body order
    pub premises: Vec<TripleId>,
}

/// One provenance row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Origin of the quad (file, caller, tool name)
    pub source: String,
    /// Insertion time
    pub timestamp: DateTime<Utc>,
    /// Extraction method tag
    pub method: String,
    /// Present only on materialized quads
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub inferred_from: Option<InferenceChain>,
}

impl Provenance {
    /// Row for an ingested quad
    pub fn ingested(source: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            timestamp: Utc::now(),
            method: method.into(),
            inferred_from: None,
        }
    }

    /// Row for a quad materialized by the reasoner
    pub fn inferred(rule: impl Into<String>, premises: Vec<TripleId>) -> Self {
        let rule = rule.into();
        Self {
            source: "reasoner".to_string(),
            timestamp: Utc::now(),
            method: rule.clone(),
            inferred_from: Some(InferenceChain { rule, premises }),
        }
    }

    /// Check whether this row marks a materialized quad
    pub fn is_inferred(&self) -> bool {
        self.inferred_from.is_some()
    }
}

/// In-memory ledger for one namespace.
///
/// Besides the rows themselves it maintains the reverse premise index
/// that drives cascade deletion: premise id → ids inferred from it.
#[derive(Debug, Default)]
pub struct ProvenanceLedger {
    rows: FxHashMap<TripleId, Provenance>,
    dependents: FxHashMap<TripleId, Vec<TripleId>>,
}

impl ProvenanceLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row for a newly stored quad
    pub fn append(&mut self, id: TripleId, provenance: Provenance) {
        if let Some(chain) = &provenance.inferred_from {
            for premise in &chain.premises {
                self.dependents.entry(*premise).or_default().push(id);
            }
        }
        self.rows.insert(id, provenance);
    }

    /// Remove a row, returning the ids that were inferred from it.
    ///
    /// Dependent ids may already be gone when a quad was reachable from
    /// several premises; callers skip those.
    pub fn remove(&mut self, id: TripleId) -> Vec<TripleId> {
        self.rows.remove(&id);
        self.dependents.remove(&id).unwrap_or_default()
    }

    /// Row lookup
    pub fn get(&self, id: TripleId) -> Option<&Provenance> {
        self.rows.get(&id)
    }

    /// Ids directly inferred from the given quad
    pub fn dependents_of(&self, id: TripleId) -> &[TripleId] {
        self.dependents.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingested_row() {
        let row = Provenance::ingested("file.ttl", "turtle");
        assert!(!row.is_inferred());
        assert_eq!(row.source, "file.ttl");
    }

    #[test]
    fn test_dependents_tracking() {
        let mut ledger = ProvenanceLedger::new();
        let premise = TripleId::new(1);
        ledger.append(premise, Provenance::ingested("x", "manual"));
        ledger.append(
            TripleId::new(2),
            Provenance::inferred("symmetric", vec![premise]),
        );
        ledger.append(
            TripleId::new(3),
            Provenance::inferred("transitive", vec![premise]),
        );

        assert_eq!(
            ledger.dependents_of(premise),
            &[TripleId::new(2), TripleId::new(3)]
        );

        let deps = ledger.remove(premise);
        assert_eq!(deps.len(), 2);
        assert!(ledger.get(premise).is_none());
    }

    #[test]
    fn test_serde_round_trip() {
        let row = Provenance::inferred("owl-rl:sameAs", vec![TripleId::new(7)]);
        let json = serde_json::to_string(&row).unwrap();
        let back: Provenance = serde_json::from_str(&json).unwrap();
        assert_eq!(row.inferred_from, back.inferred_from);
    }
}

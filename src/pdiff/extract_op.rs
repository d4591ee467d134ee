use crate::error::ConsistencyError;
use crate::ordered_map::FastHashSet;
use crate::types::{DeltaRecord, Document, SchemaDiff};
use smol_str::SmolStr;
use tracing::debug;

/// Per-diff delta records carved out of one document, in diff order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedDeltas {
    records: Vec<(String, DeltaRecord)>,
}

impl ExtractedDeltas {
    /// The record extracted for `fingerprint`.
    pub fn get(&self, fingerprint: &str) -> Option<&DeltaRecord> {
        self.records
            .iter()
            .find(|(fp, _)| fp == fingerprint)
            .map(|(_, record)| record)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeltaRecord)> {
        self.records.iter().map(|(fp, record)| (fp.as_str(), record))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(String, DeltaRecord)> for ExtractedDeltas {
    fn from_iter<I: IntoIterator<Item = (String, DeltaRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ExtractedDeltas {
    type Item = (String, DeltaRecord);
    type IntoIter = std::vec::IntoIter<(String, DeltaRecord)>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Split a document decoded under the effective schema into one delta per diff.
///
/// Each diff receives exactly the members its fragment declares, copied from
/// `document`. A declared member missing from the document is a consistency
/// fault. When two diffs declare the same member, only the first gets it.
/// The document itself is not modified and no baseline is derived here.
pub fn extract(document: &Document, diffs: &[SchemaDiff]) -> Result<ExtractedDeltas, ConsistencyError> {
    let mut claimed: FastHashSet<SmolStr> = FastHashSet::default();
    let mut records = Vec::with_capacity(diffs.len());

    for diff in diffs {
        let mut record = DeltaRecord::new();
        for member in diff.fragment.members.iter() {
            let field = document
                .get(&member.name)
                .ok_or_else(|| ConsistencyError::MissingMember(member.name.clone()))?;
            if !claimed.insert(member.name.clone()) {
                debug!(
                    fingerprint = %diff.fingerprint,
                    member = %member.name,
                    "member already claimed by an earlier pdiff, skipping"
                );
                continue;
            }
            record.insert(member.name.clone(), field.value.clone());
        }
        debug!(
            fingerprint = %diff.fingerprint,
            members = record.len(),
            "extracted pdiff delta"
        );
        records.push((diff.fingerprint.clone(), record));
    }

    Ok(ExtractedDeltas { records })
}

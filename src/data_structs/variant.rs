use std::ops::Index;

use serde::{
    Deserialize,
    Serialize,
};

/// One row of the variant list: locus, alleles and identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub chr:        String,
    pub pos:        u64,
    pub ref_allele: String,
    pub alt_allele: String,
    pub variant_id: String,
}

impl VariantRecord {
    pub fn new(
        chr: impl Into<String>,
        pos: u64,
        ref_allele: impl Into<String>,
        alt_allele: impl Into<String>,
        variant_id: impl Into<String>,
    ) -> Self {
        Self {
            chr: chr.into(),
            pos,
            ref_allele: ref_allele.into(),
            alt_allele: alt_allele.into(),
            variant_id: variant_id.into(),
        }
    }
}

/// Variants in canonical order. Row `i` of every tensor corresponds to
/// `self[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantList {
    records: Vec<VariantRecord>,
}

impl VariantList {
    pub fn new(records: Vec<VariantRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(
        &self,
        idx: usize,
    ) -> Option<&VariantRecord> {
        self.records.get(idx)
    }

    /// Records paired with their row index in the tensors.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &VariantRecord)> {
        self.records.iter().enumerate()
    }

    pub fn records(&self) -> &[VariantRecord] {
        &self.records
    }
}

impl Index<usize> for VariantList {
    type Output = VariantRecord;

    fn index(
        &self,
        index: usize,
    ) -> &Self::Output {
        &self.records[index]
    }
}

impl FromIterator<VariantRecord> for VariantList {
    fn from_iter<T: IntoIterator<Item = VariantRecord>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

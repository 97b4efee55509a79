use crate::types::{EducationRecord, Fips};
use std::collections::HashMap;

/// Lookup from county identifier to its education record.
///
/// Duplicate identifiers keep the last record seen.
#[derive(Debug, Clone, Default)]
pub struct JoinIndex {
    by_fips: HashMap<Fips, EducationRecord>,
}

impl JoinIndex {
    pub fn build(records: Vec<EducationRecord>) -> Self {
        records.into_iter().collect()
    }

    pub fn get(&self, fips: Fips) -> Option<&EducationRecord> {
        self.by_fips.get(&fips)
    }

    pub fn len(&self) -> usize {
        self.by_fips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_fips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EducationRecord> {
        self.by_fips.values()
    }
}

impl FromIterator<EducationRecord> for JoinIndex {
    fn from_iter<I: IntoIterator<Item = EducationRecord>>(iter: I) -> Self {
        let by_fips = iter.into_iter().map(|r| (r.fips, r)).collect();
        Self { by_fips }
    }
}

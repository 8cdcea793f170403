//! Best-effort presence checks on assembled records.
//!
//! Nothing here rejects a record. [`FieldCoverage`] counts how many records
//! carry each canonical field so the pre-transfer plan can show what a
//! source actually provides, and flags sources that look unusable.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{CanonicalField, CanonicalRecord};

/// Fields that make a listing identifiable. A source where none of them
/// ever appears is almost certainly mis-mapped.
pub const IDENTITY_FIELDS: [CanonicalField; 3] = [
    CanonicalField::Company,
    CanonicalField::ContactName,
    CanonicalField::Phone,
];

/// Per-field record counts over a set of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldCoverage {
    pub records: usize,
    pub fields: BTreeMap<CanonicalField, usize>,
}

impl FieldCoverage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: &[CanonicalRecord]) -> Self {
        let mut coverage = Self::new();
        coverage.add_all(records);
        coverage
    }

    pub fn add(&mut self, record: &CanonicalRecord) {
        self.records += 1;
        for (field, _) in record.iter() {
            *self.fields.entry(field).or_insert(0) += 1;
        }
    }

    pub fn add_all(&mut self, records: &[CanonicalRecord]) {
        for record in records {
            self.add(record);
        }
    }

    pub fn count(&self, field: CanonicalField) -> usize {
        self.fields.get(&field).copied().unwrap_or(0)
    }

    /// Share of records carrying `field`, 0.0 when there are no records.
    pub fn ratio(&self, field: CanonicalField) -> f64 {
        if self.records == 0 {
            return 0.0;
        }
        self.count(field) as f64 / self.records as f64
    }

    /// Warnings worth printing before transfer.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.records == 0 {
            return warnings;
        }

        if IDENTITY_FIELDS.iter().all(|f| self.count(*f) == 0) {
            warnings.push(format!(
                "No record has any of {}; check the header mapping",
                IDENTITY_FIELDS
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        warnings
    }

    /// One line per present field, most populated first.
    pub fn lines(&self) -> Vec<String> {
        let mut present: Vec<(CanonicalField, usize)> =
            self.fields.iter().map(|(f, n)| (*f, *n)).collect();
        present.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        present
            .into_iter()
            .map(|(field, n)| format!("{:<14} {:>8} ({:.0}%)", field.as_str(), n, self.ratio(field) * 100.0))
            .collect()
    }
}

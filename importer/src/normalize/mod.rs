//! Vendor header normalization.
//!
//! Maps arbitrary column spellings ("Company Name", "ZIP-CODE", "SicCode")
//! onto the [`CanonicalField`] vocabulary. The synonym table is supplied by
//! the caller so each pipeline can carry its own vendor quirks.
//!
//! ```rust,ignore
//! use bizimport::normalize::{HeaderNormalizer, SynonymTable};
//!
//! let map = HeaderNormalizer::new(SynonymTable::single_file())
//!     .build(&["Company Name", "Zip Code", "Fax"]);
//! assert_eq!(map.unmapped(), vec!["Fax"]);
//! ```

use std::collections::HashMap;

use crate::models::CanonicalField;

use CanonicalField::*;

/// Synonyms shared by every pipeline.
const BASE_SYNONYMS: &[(&str, CanonicalField)] = &[
    ("company_name", Company),
    ("business_name", Company),
    ("business", Company),
    ("street_address", Address),
    ("address_1", Address),
    ("address1", Address),
    ("zip_code", Zip),
    ("zipcode", Zip),
    ("postal_code", Zip),
    ("zip5", Zip),
    ("county_name", County),
    ("phone_number", Phone),
    ("cell_phone", Mobile),
    ("cell", Mobile),
    ("mobile_phone", Mobile),
    ("email_address", Email),
    ("e_mail", Email),
    ("website_url", Website),
    ("web_address", Website),
    ("url", Website),
    ("contact", ContactName),
    ("contact_person", ContactName),
    ("firstname", FirstName),
    ("contact_first_name", FirstName),
    ("lastname", LastName),
    ("contact_last_name", LastName),
    ("job_title", Title),
    ("contact_title", Title),
    ("direct_dial", DirectPhone),
    ("employees", EmployeeCount),
    ("number_of_employees", EmployeeCount),
    ("employee_size", EmployeeCount),
    ("num_employees", EmployeeCount),
    ("annual_sales", Revenue),
    ("annual_revenue", Revenue),
    ("sales_volume", Revenue),
    ("sales", Revenue),
    ("siccode", SicCode),
    ("sic", SicCode),
    ("primary_sic", SicCode),
    ("sic_desc", SicDescription),
    ("sic_code_description", SicDescription),
];

/// Extra synonyms seen in the pre-chunked block exports.
const BLOCK_SYNONYMS: &[(&str, CanonicalField)] = &[
    ("street", Address),
    ("mailing_address", Address),
    ("telephone", Phone),
    ("tel", Phone),
    ("phone_1", Phone),
    ("owner", ContactName),
    ("owner_name", ContactName),
    ("full_name", ContactName),
    ("state_code", State),
    ("st", State),
    ("city_name", City),
];

/// Normalize a raw header: trim, drop wrapping quotes, lowercase, and turn
/// runs of spaces, underscores or hyphens into a single underscore.
pub fn normalize_header(raw: &str) -> String {
    let lowered = raw.trim().trim_matches('"').trim().to_lowercase();

    let mut out = String::with_capacity(lowered.len());
    let mut pending_sep = false;
    for c in lowered.chars() {
        if c == ' ' || c == '-' || c == '_' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.push(c);
    }
    out
}

// =============================================================================
// Synonym Table
// =============================================================================

/// Normalized vendor spelling → canonical field.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    entries: HashMap<String, CanonicalField>,
}

impl SynonymTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table for single large CSV exports.
    pub fn single_file() -> Self {
        Self::from_pairs(BASE_SYNONYMS)
    }

    /// Table for header file + block exports.
    pub fn block() -> Self {
        Self::from_pairs(BASE_SYNONYMS).extend_pairs(BLOCK_SYNONYMS)
    }

    fn from_pairs(pairs: &[(&str, CanonicalField)]) -> Self {
        Self::empty().extend_pairs(pairs)
    }

    fn extend_pairs(mut self, pairs: &[(&str, CanonicalField)]) -> Self {
        for (raw, field) in pairs {
            self.entries.insert(normalize_header(raw), *field);
        }
        self
    }

    /// Add or override one synonym. The key is normalized first.
    pub fn with_entry(mut self, raw: &str, field: CanonicalField) -> Self {
        self.entries.insert(normalize_header(raw), field);
        self
    }

    /// Look up an already-normalized header.
    pub fn lookup(&self, normalized: &str) -> Option<CanonicalField> {
        self.entries.get(normalized).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, CanonicalField)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Header Map
// =============================================================================

/// Where a source column ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnTarget {
    /// Carried into the record under this field.
    Canonical(CanonicalField),
    /// Not part of the vocabulary; holds the normalized name for reporting.
    Unmapped(String),
}

impl ColumnTarget {
    pub fn field(&self) -> Option<CanonicalField> {
        match self {
            Self::Canonical(field) => Some(*field),
            Self::Unmapped(_) => None,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Canonical(field) => field.as_str(),
            Self::Unmapped(name) => name,
        }
    }
}

/// One source column and its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub original: String,
    pub target: ColumnTarget,
}

/// Positional column mapping for one source, built once and reused per row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    columns: Vec<Column>,
}

impl HeaderMap {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Target of the column at `index`.
    pub fn target(&self, index: usize) -> Option<&ColumnTarget> {
        self.columns.get(index).map(|c| &c.target)
    }

    /// Target of a column by its verbatim source name.
    pub fn get(&self, original: &str) -> Option<&ColumnTarget> {
        self.columns
            .iter()
            .find(|c| c.original == original)
            .map(|c| &c.target)
    }

    /// The first source label, used to spot repeated header rows.
    pub fn first_label(&self) -> Option<&str> {
        self.columns.first().map(|c| c.original.as_str())
    }

    /// Source columns that will not be carried into records.
    pub fn unmapped(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.target.field().is_none())
            .map(|c| c.original.as_str())
            .collect()
    }

    pub fn mapped_count(&self) -> usize {
        self.columns.len() - self.unmapped().len()
    }
}

// =============================================================================
// Normalizer
// =============================================================================

/// Builds [`HeaderMap`]s with a caller-chosen synonym table.
#[derive(Debug, Clone, Default)]
pub struct HeaderNormalizer {
    table: SynonymTable,
}

impl HeaderNormalizer {
    pub fn new(table: SynonymTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &SynonymTable {
        &self.table
    }

    /// Resolve one header. Never fails: unknown names fall back to their
    /// normalized spelling.
    pub fn resolve(&self, raw: &str) -> ColumnTarget {
        let normalized = normalize_header(raw);
        self.table
            .lookup(&normalized)
            .or_else(|| CanonicalField::from_key(&normalized))
            .map(ColumnTarget::Canonical)
            .unwrap_or(ColumnTarget::Unmapped(normalized))
    }

    pub fn build<S: AsRef<str>>(&self, headers: &[S]) -> HeaderMap {
        let columns = headers
            .iter()
            .map(|h| Column {
                original: h.as_ref().to_string(),
                target: self.resolve(h.as_ref()),
            })
            .collect();
        HeaderMap { columns }
    }
}

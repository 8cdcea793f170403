//! Domain models for the import pipelines.
//!
//! - [`CanonicalField`] - Closed vocabulary of record field names
//! - [`CanonicalRecord`] - One normalized business listing
//! - [`Sector`] - Known dataset categories on the receiving side

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

// =============================================================================
// Canonical Field
// =============================================================================

/// A field name from the canonical record vocabulary.
///
/// Serialized as its snake_case name, which is also the JSON key sent to
/// the ingestion API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Company,
    Address,
    City,
    State,
    Zip,
    County,
    Phone,
    Mobile,
    Email,
    Website,
    ContactName,
    FirstName,
    LastName,
    Title,
    DirectPhone,
    EmployeeCount,
    Revenue,
    SicCode,
    SicDescription,
}

impl CanonicalField {
    /// Every field, in serialization order.
    pub const ALL: [CanonicalField; 19] = [
        Self::Company,
        Self::Address,
        Self::City,
        Self::State,
        Self::Zip,
        Self::County,
        Self::Phone,
        Self::Mobile,
        Self::Email,
        Self::Website,
        Self::ContactName,
        Self::FirstName,
        Self::LastName,
        Self::Title,
        Self::DirectPhone,
        Self::EmployeeCount,
        Self::Revenue,
        Self::SicCode,
        Self::SicDescription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Address => "address",
            Self::City => "city",
            Self::State => "state",
            Self::Zip => "zip",
            Self::County => "county",
            Self::Phone => "phone",
            Self::Mobile => "mobile",
            Self::Email => "email",
            Self::Website => "website",
            Self::ContactName => "contact_name",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Title => "title",
            Self::DirectPhone => "direct_phone",
            Self::EmployeeCount => "employee_count",
            Self::Revenue => "revenue",
            Self::SicCode => "sic_code",
            Self::SicDescription => "sic_description",
        }
    }

    /// Look up a field by its exact canonical key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == key)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Canonical Record
// =============================================================================

/// A normalized business listing.
///
/// Only populated fields are stored: setting an empty (or whitespace-only)
/// value is a no-op, so "absent" and "empty" never get confused on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalRecord {
    fields: BTreeMap<CanonicalField, String>,
}

impl CanonicalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a trimmed value. Returns `false` when the value was empty or the
    /// field already held a value (the first non-empty column wins).
    pub fn set(&mut self, field: CanonicalField, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() || self.fields.contains_key(&field) {
            return false;
        }
        self.fields.insert(field, value.to_string());
        true
    }

    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn remove(&mut self, field: CanonicalField) -> Option<String> {
        self.fields.remove(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Synthesize `contact_name` from `first_name` + `last_name`.
    ///
    /// Only applies when `contact_name` is absent and at least one name part
    /// is present. When `keep_name_parts` is false the parts are removed
    /// after a successful derivation. Returns whether a name was derived.
    pub fn derive_contact_name(&mut self, keep_name_parts: bool) -> bool {
        if self.contains(CanonicalField::ContactName) {
            return false;
        }

        let first = self.get(CanonicalField::FirstName).unwrap_or("");
        let last = self.get(CanonicalField::LastName).unwrap_or("");
        let name = format!("{} {}", first, last);

        if !self.set(CanonicalField::ContactName, &name) {
            return false;
        }

        if !keep_name_parts {
            self.remove(CanonicalField::FirstName);
            self.remove(CanonicalField::LastName);
        }
        true
    }
}

// =============================================================================
// Sector
// =============================================================================

/// A named business-listing dataset, used as partition key by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    PlumbersHvac,
    BusinessConsultants,
    Realtors,
    HotelsMotels,
    CampgroundsRv,
    Restaurants,
    Trucking,
}

impl Sector {
    pub const ALL: [Sector; 7] = [
        Self::PlumbersHvac,
        Self::BusinessConsultants,
        Self::Realtors,
        Self::HotelsMotels,
        Self::CampgroundsRv,
        Self::Restaurants,
        Self::Trucking,
    ];

    /// Identifier expected by the remote endpoints.
    pub fn id(&self) -> &'static str {
        match self {
            Self::PlumbersHvac => "plumbers_hvac",
            Self::BusinessConsultants => "business_consultants",
            Self::Realtors => "realtors",
            Self::HotelsMotels => "hotels_motels",
            Self::CampgroundsRv => "campgrounds_rv",
            Self::Restaurants => "restaurants",
            Self::Trucking => "trucking",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PlumbersHvac => "US Plumbing, Heating & AC Contractors",
            Self::BusinessConsultants => "US Business Management & Consultants",
            Self::Realtors => "US Realtors",
            Self::HotelsMotels => "Hotels & Motels",
            Self::CampgroundsRv => "Campgrounds & RV Parks",
            Self::Restaurants => "Restaurants & Food Service",
            Self::Trucking => "Trucking Companies",
        }
    }

    pub fn sic_codes(&self) -> &'static [&'static str] {
        match self {
            Self::PlumbersHvac => &["1711"],
            Self::BusinessConsultants => &["8742", "8748"],
            Self::Realtors => &["6531"],
            Self::HotelsMotels => &["7011"],
            Self::CampgroundsRv => &["7033"],
            Self::Restaurants => &["5812"],
            Self::Trucking => &["4212", "4213"],
        }
    }
}

impl FromStr for Sector {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|sector| sector.id() == wanted)
            .ok_or_else(|| ConfigError::UnknownSector(s.to_string()))
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

//! Record selectors.
//!
//! A [`Selector`] names which stored records a repository operation targets.
//! Builders return `None` rather than an empty [`Selectors`]: an absent
//! selector set means "match nothing" to the deduplicators, while the
//! repository reads `None` as "every record in the data set".

use super::datum::Datum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origin criterion: a device-assigned id and the time it was last modified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectorOrigin {
    /// Origin id.
    pub id: String,
    /// Origin time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl SelectorOrigin {
    /// Creates an origin criterion.
    #[must_use]
    pub fn new(id: impl Into<String>, time: Option<DateTime<Utc>>) -> Self {
        Self {
            id: id.into(),
            time,
        }
    }

    /// Returns true if this origin is strictly newer than `other`.
    ///
    /// Equal times are not newer. An origin without a time is never newer;
    /// an origin with a time is newer than one without.
    #[must_use]
    pub fn newer_than(&self, other: &Self) -> bool {
        match (self.time, other.time) {
            (Some(time), Some(other_time)) => time > other_time,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// One record criterion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Selector {
    /// Server-assigned record id.
    Id {
        /// Record id.
        id: String,
        /// Record time.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<DateTime<Utc>>,
    },
    /// Identity hash.
    Deduplicator {
        /// Hash value.
        hash: String,
    },
    /// Device origin.
    Origin(SelectorOrigin),
}

impl Selector {
    /// Creates an id selector.
    #[must_use]
    pub fn id(id: impl Into<String>, time: Option<DateTime<Utc>>) -> Self {
        Self::Id {
            id: id.into(),
            time,
        }
    }

    /// Creates a hash selector.
    #[must_use]
    pub fn hash(hash: impl Into<String>) -> Self {
        Self::Deduplicator { hash: hash.into() }
    }

    /// Creates an origin selector.
    #[must_use]
    pub fn origin(id: impl Into<String>, time: Option<DateTime<Utc>>) -> Self {
        Self::Origin(SelectorOrigin::new(id, time))
    }

    /// Returns true if the record satisfies this criterion.
    #[must_use]
    pub fn matches(&self, datum: &dyn Datum) -> bool {
        match self {
            Self::Id { id, .. } => datum.base().id.as_deref() == Some(id.as_str()),
            Self::Deduplicator { hash } => datum.deduplicator_hash() == Some(hash.as_str()),
            Self::Origin(origin) => {
                datum.origin().and_then(super::Origin::id) == Some(origin.id.as_str())
            },
        }
    }
}

/// Ordered selector collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selectors(Vec<Selector>);

impl Selectors {
    /// Creates a selector set.
    #[must_use]
    pub const fn new(selectors: Vec<Selector>) -> Self {
        Self(selectors)
    }

    /// Builds hash selectors for every record that carries a hash.
    ///
    /// Returns `None` when no record carries one.
    #[must_use]
    pub fn from_hashes(data: &[Box<dyn Datum>]) -> Option<Self> {
        Self::from_selectors(
            data.iter()
                .filter_map(|datum| datum.deduplicator_hash().map(Selector::hash))
                .collect(),
        )
    }

    /// Builds origin selectors for every record that carries an origin id.
    ///
    /// Returns `None` when no record carries one.
    #[must_use]
    pub fn from_origins(data: &[Box<dyn Datum>]) -> Option<Self> {
        Self::from_selectors(
            data.iter()
                .filter_map(|datum| {
                    let origin = datum.origin()?;
                    Some(Selector::origin(origin.id()?, origin.time))
                })
                .collect(),
        )
    }

    fn from_selectors(selectors: Vec<Selector>) -> Option<Self> {
        if selectors.is_empty() {
            None
        } else {
            Some(Self(selectors))
        }
    }

    /// Returns the number of selectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no selectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends a selector.
    pub fn push(&mut self, selector: Selector) {
        self.0.push(selector);
    }

    /// Iterates over the selectors.
    pub fn iter(&self) -> std::slice::Iter<'_, Selector> {
        self.0.iter()
    }

    /// Iterates over the hashes of hash selectors.
    pub fn hashes(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|selector| match selector {
            Selector::Deduplicator { hash } => Some(hash.as_str()),
            _ => None,
        })
    }

    /// Iterates over origin criteria.
    pub fn origins(&self) -> impl Iterator<Item = &SelectorOrigin> {
        self.0.iter().filter_map(|selector| match selector {
            Selector::Origin(origin) => Some(origin),
            _ => None,
        })
    }

    /// Returns true if any selector matches the record.
    #[must_use]
    pub fn matches(&self, datum: &dyn Datum) -> bool {
        self.0.iter().any(|selector| selector.matches(datum))
    }
}

impl FromIterator<Selector> for Selectors {
    fn from_iter<T: IntoIterator<Item = Selector>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Selectors {
    type Item = &'a Selector;
    type IntoIter = std::slice::Iter<'a, Selector>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

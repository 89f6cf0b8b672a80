use std::collections::HashMap;

use thiserror::Error;

use crate::model::ids::StitchId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StitchError {
    #[error("stitch abbreviation cannot be empty")]
    EmptyAbbreviation,

    #[error("stitch name cannot be empty")]
    EmptyName,
}

/// A stitch from the library, e.g. `sc` / "single crochet".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stitch {
    id: StitchId,
    abbreviation: String,
    name: String,
}

impl Stitch {
    /// # Errors
    ///
    /// Returns `StitchError` if the abbreviation or name is blank.
    pub fn new(
        id: StitchId,
        abbreviation: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, StitchError> {
        let abbreviation = abbreviation.into().trim().to_owned();
        let name = name.into().trim().to_owned();
        if abbreviation.is_empty() {
            return Err(StitchError::EmptyAbbreviation);
        }
        if name.is_empty() {
            return Err(StitchError::EmptyName);
        }
        Ok(Self {
            id,
            abbreviation,
            name,
        })
    }

    #[must_use]
    pub fn id(&self) -> StitchId {
        self.id
    }

    #[must_use]
    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Resolves stitch identities to library entries for display.
///
/// Passed explicitly into the progress calculator so callers control where
/// names come from (a repository snapshot, a fixture map in tests).
pub trait StitchLookup {
    fn stitch(&self, id: StitchId) -> Option<&Stitch>;
}

impl StitchLookup for HashMap<StitchId, Stitch> {
    fn stitch(&self, id: StitchId) -> Option<&Stitch> {
        self.get(&id)
    }
}

impl StitchLookup for [Stitch] {
    fn stitch(&self, id: StitchId) -> Option<&Stitch> {
        self.iter().find(|s| s.id == id)
    }
}

impl StitchLookup for Vec<Stitch> {
    fn stitch(&self, id: StitchId) -> Option<&Stitch> {
        self.as_slice().stitch(id)
    }
}

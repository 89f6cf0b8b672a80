use std::collections::HashSet;

use thiserror::Error;

use crate::model::ids::{PatternId, StitchId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PatternError {
    #[error("pattern name cannot be empty")]
    EmptyName,

    #[error("stitch count must be > 0")]
    ZeroCount,

    #[error("repeat count must be > 0")]
    ZeroRepeat,

    #[error("group must contain at least one entry")]
    EmptyGroup,
}

//
// ─── ENTRY ─────────────────────────────────────────────────────────────────────
//

/// One stitch instruction: `count` stitches of one kind, worked `repeat_count` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternEntry {
    stitch_id: StitchId,
    count: u32,
    repeat_count: u32,
}

impl PatternEntry {
    /// # Errors
    ///
    /// Returns `PatternError::ZeroCount` or `PatternError::ZeroRepeat` for zero values.
    pub fn new(stitch_id: StitchId, count: u32, repeat_count: u32) -> Result<Self, PatternError> {
        if count == 0 {
            return Err(PatternError::ZeroCount);
        }
        if repeat_count == 0 {
            return Err(PatternError::ZeroRepeat);
        }
        Ok(Self {
            stitch_id,
            count,
            repeat_count,
        })
    }

    #[must_use]
    pub fn stitch_id(&self) -> StitchId {
        self.stitch_id
    }

    /// Stitches produced by a single repeat of this entry.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    /// Stitches produced by this entry across all of its repeats.
    #[must_use]
    pub fn total_stitches(&self) -> u64 {
        u64::from(self.count) * u64::from(self.repeat_count)
    }
}

//
// ─── GROUP ─────────────────────────────────────────────────────────────────────
//

/// An ordered block of entries, itself worked `repeat_count` times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternGroup {
    name: Option<String>,
    repeat_count: u32,
    entries: Vec<PatternEntry>,
}

impl PatternGroup {
    /// Creates a group. Blank names are treated as unnamed.
    ///
    /// # Errors
    ///
    /// Returns `PatternError::ZeroRepeat` if `repeat_count` is zero and
    /// `PatternError::EmptyGroup` if there are no entries.
    pub fn new(
        name: Option<String>,
        repeat_count: u32,
        entries: Vec<PatternEntry>,
    ) -> Result<Self, PatternError> {
        if repeat_count == 0 {
            return Err(PatternError::ZeroRepeat);
        }
        if entries.is_empty() {
            return Err(PatternError::EmptyGroup);
        }
        let name = name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty());
        Ok(Self {
            name,
            repeat_count,
            entries,
        })
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Display label for the group at `index` (zero-based) within its pattern.
    #[must_use]
    pub fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Group {}", index + 1),
        }
    }

    #[must_use]
    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    #[must_use]
    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, index: u32) -> Option<&PatternEntry> {
        self.entries.get(usize::try_from(index).ok()?)
    }

    /// Stitches produced by one pass over the entries.
    #[must_use]
    pub fn stitches_per_repeat(&self) -> u64 {
        self.entries
            .iter()
            .map(PatternEntry::total_stitches)
            .fold(0, u64::saturating_add)
    }

    #[must_use]
    pub fn total_stitches(&self) -> u64 {
        self.stitches_per_repeat()
            .saturating_mul(u64::from(self.repeat_count))
    }
}

//
// ─── PATTERN ───────────────────────────────────────────────────────────────────
//

/// Read-only pattern structure as supplied by the authoring side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    id: PatternId,
    owner: UserId,
    name: String,
    groups: Vec<PatternGroup>,
}

impl Pattern {
    /// # Errors
    ///
    /// Returns `PatternError::EmptyName` if the name is blank.
    pub fn new(
        id: PatternId,
        owner: UserId,
        name: impl Into<String>,
        groups: Vec<PatternGroup>,
    ) -> Result<Self, PatternError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(PatternError::EmptyName);
        }
        Ok(Self {
            id,
            owner,
            name,
            groups,
        })
    }

    #[must_use]
    pub fn id(&self) -> PatternId {
        self.id
    }

    #[must_use]
    pub fn owner(&self) -> UserId {
        self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn groups(&self) -> &[PatternGroup] {
        &self.groups
    }

    #[must_use]
    pub fn group(&self, index: u32) -> Option<&PatternGroup> {
        self.groups.get(usize::try_from(index).ok()?)
    }

    /// Sum over groups of `repeat_count × Σ(entry.repeat_count × entry.count)`.
    #[must_use]
    pub fn total_stitches(&self) -> u64 {
        self.groups
            .iter()
            .map(PatternGroup::total_stitches)
            .fold(0, u64::saturating_add)
    }

    /// Every stitch referenced by the pattern, in first-use order, without duplicates.
    #[must_use]
    pub fn stitch_ids(&self) -> Vec<StitchId> {
        let mut seen = HashSet::new();
        self.groups
            .iter()
            .flat_map(|g| g.entries.iter())
            .map(|entry| entry.stitch_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

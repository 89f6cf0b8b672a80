use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::pattern::{Pattern, PatternEntry, PatternGroup};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PositionError {
    #[error("position {0} does not fit the pattern")]
    OutOfBounds(Position),
}

/// Outcome of stepping forward by one stitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Moved(Position),
    /// The position was already on the last stitch of the pattern.
    Exhausted,
}

/// Five-level counter locating one stitch inside a pattern.
///
/// Field order is significant: the derived `Ord` compares lexicographically
/// from group down to stitch, which is exactly the order stitches are worked.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub group_index: u32,
    pub group_repeat: u32,
    pub entry_index: u32,
    pub entry_repeat: u32,
    pub stitch_ordinal: u32,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "g{}r{}/e{}r{}/s{}",
            self.group_index,
            self.group_repeat,
            self.entry_index,
            self.entry_repeat,
            self.stitch_ordinal
        )
    }
}

impl Position {
    /// The first stitch of any pattern.
    #[must_use]
    pub fn start() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_start(&self) -> bool {
        *self == Self::start()
    }

    /// The last stitch of `pattern`, or `None` if it has no groups.
    #[must_use]
    pub fn last(pattern: &Pattern) -> Option<Self> {
        let group_index = u32::try_from(pattern.groups().len().checked_sub(1)?).ok()?;
        let group = pattern.group(group_index)?;
        let (entry_index, entry) = last_entry(group)?;
        Some(Self {
            group_index,
            group_repeat: group.repeat_count() - 1,
            entry_index,
            entry_repeat: entry.repeat_count() - 1,
            stitch_ordinal: entry.count() - 1,
        })
    }

    /// Resolves the group and entry this position points into.
    ///
    /// # Errors
    ///
    /// Returns `PositionError::OutOfBounds` if any level exceeds the pattern's radix.
    pub fn resolve<'p>(
        &self,
        pattern: &'p Pattern,
    ) -> Result<(&'p PatternGroup, &'p PatternEntry), PositionError> {
        let out_of_bounds = || PositionError::OutOfBounds(*self);
        let group = pattern.group(self.group_index).ok_or_else(out_of_bounds)?;
        let entry = group.entry(self.entry_index).ok_or_else(out_of_bounds)?;
        if self.group_repeat >= group.repeat_count()
            || self.entry_repeat >= entry.repeat_count()
            || self.stitch_ordinal >= entry.count()
        {
            return Err(out_of_bounds());
        }
        Ok((group, entry))
    }

    /// # Errors
    ///
    /// Returns `PositionError::OutOfBounds` if the position does not fit `pattern`.
    pub fn validate(&self, pattern: &Pattern) -> Result<(), PositionError> {
        self.resolve(pattern).map(|_| ())
    }

    /// Moves one stitch forward, carrying into outer levels on overflow.
    ///
    /// # Errors
    ///
    /// Returns `PositionError::OutOfBounds` if `self` does not fit `pattern`.
    pub fn advance(self, pattern: &Pattern) -> Result<Step, PositionError> {
        let (group, entry) = self.resolve(pattern)?;
        let mut next = self;

        next.stitch_ordinal += 1;
        if next.stitch_ordinal < entry.count() {
            return Ok(Step::Moved(next));
        }
        next.stitch_ordinal = 0;

        next.entry_repeat += 1;
        if next.entry_repeat < entry.repeat_count() {
            return Ok(Step::Moved(next));
        }
        next.entry_repeat = 0;

        next.entry_index += 1;
        if group.entry(next.entry_index).is_some() {
            return Ok(Step::Moved(next));
        }
        next.entry_index = 0;

        next.group_repeat += 1;
        if next.group_repeat < group.repeat_count() {
            return Ok(Step::Moved(next));
        }
        next.group_repeat = 0;

        next.group_index += 1;
        if pattern.group(next.group_index).is_some() {
            return Ok(Step::Moved(next));
        }

        Ok(Step::Exhausted)
    }

    /// Moves one stitch back, borrowing from outer levels on underflow.
    ///
    /// At the first stitch of the pattern this returns `self` unchanged.
    ///
    /// # Errors
    ///
    /// Returns `PositionError::OutOfBounds` if `self` does not fit `pattern`.
    pub fn retreat(self, pattern: &Pattern) -> Result<Self, PositionError> {
        let (group, entry) = self.resolve(pattern)?;
        if self.is_start() {
            return Ok(self);
        }
        let mut prev = self;

        if prev.stitch_ordinal > 0 {
            prev.stitch_ordinal -= 1;
            return Ok(prev);
        }

        if prev.entry_repeat > 0 {
            prev.entry_repeat -= 1;
            prev.stitch_ordinal = entry.count() - 1;
            return Ok(prev);
        }

        if prev.entry_index > 0 {
            prev.entry_index -= 1;
            let entry = group
                .entry(prev.entry_index)
                .ok_or(PositionError::OutOfBounds(self))?;
            prev.entry_repeat = entry.repeat_count() - 1;
            prev.stitch_ordinal = entry.count() - 1;
            return Ok(prev);
        }

        let group = if prev.group_repeat > 0 {
            prev.group_repeat -= 1;
            group
        } else {
            // Not at the origin, so an earlier group exists.
            prev.group_index -= 1;
            let group = pattern
                .group(prev.group_index)
                .ok_or(PositionError::OutOfBounds(self))?;
            prev.group_repeat = group.repeat_count() - 1;
            group
        };

        let (entry_index, entry) = last_entry(group).ok_or(PositionError::OutOfBounds(self))?;
        prev.entry_index = entry_index;
        prev.entry_repeat = entry.repeat_count() - 1;
        prev.stitch_ordinal = entry.count() - 1;
        Ok(prev)
    }

    /// Number of stitches strictly before this position.
    ///
    /// Levels beyond the pattern's bounds are clamped rather than rejected so the
    /// result is always `<= pattern.total_stitches()`.
    #[must_use]
    pub fn rank(&self, pattern: &Pattern) -> u64 {
        let group_index = usize::try_from(self.group_index).unwrap_or(usize::MAX);
        let before: u64 = pattern
            .groups()
            .iter()
            .take(group_index)
            .map(PatternGroup::total_stitches)
            .fold(0, u64::saturating_add);

        let within = pattern
            .group(self.group_index)
            .map_or(0, |group| self.rank_within(group));

        before
            .saturating_add(within)
            .min(pattern.total_stitches())
    }

    /// Number of stitches of the current group already worked, including
    /// completed repeats of that group.
    #[must_use]
    pub fn rank_in_group(&self, pattern: &Pattern) -> u64 {
        pattern
            .group(self.group_index)
            .map_or(0, |group| self.rank_within(group))
    }

    fn rank_within(&self, group: &PatternGroup) -> u64 {
        let repeats = u64::from(self.group_repeat.min(group.repeat_count()));
        let entry_index = usize::try_from(self.entry_index).unwrap_or(usize::MAX);
        let entries_before: u64 = group
            .entries()
            .iter()
            .take(entry_index)
            .map(PatternEntry::total_stitches)
            .fold(0, u64::saturating_add);
        let in_entry = group.entry(self.entry_index).map_or(0, |entry| {
            u64::from(self.entry_repeat.min(entry.repeat_count())) * u64::from(entry.count())
                + u64::from(self.stitch_ordinal.min(entry.count()))
        });

        repeats
            .saturating_mul(group.stitches_per_repeat())
            .saturating_add(entries_before)
            .saturating_add(in_entry)
            .min(group.total_stitches())
    }
}

fn last_entry(group: &PatternGroup) -> Option<(u32, &PatternEntry)> {
    let index = group.entries().len().checked_sub(1)?;
    Some((u32::try_from(index).ok()?, group.entries().get(index)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::{PatternId, StitchId, UserId};
    use crate::model::pattern::{PatternEntry, PatternGroup};

    fn entry(count: u32, repeat: u32) -> PatternEntry {
        PatternEntry::new(StitchId::new(1), count, repeat).unwrap()
    }

    fn pattern(groups: Vec<PatternGroup>) -> Pattern {
        Pattern::new(PatternId::new(1), UserId::new(1), "Test", groups).unwrap()
    }

    /// Two groups exercising every radix: group 0 repeats twice over
    /// `[2 st ×2, 1 st ×1]`, group 1 is a single 3-stitch entry.
    fn mixed() -> Pattern {
        pattern(vec![
            PatternGroup::new(None, 2, vec![entry(2, 2), entry(1, 1)]).unwrap(),
            PatternGroup::new(None, 1, vec![entry(3, 1)]).unwrap(),
        ])
    }

    fn walk(pattern: &Pattern) -> Vec<Position> {
        let mut out = vec![Position::start()];
        let mut pos = Position::start();
        while let Step::Moved(next) = pos.advance(pattern).unwrap() {
            out.push(next);
            pos = next;
        }
        out
    }

    fn pos(g: u32, gr: u32, e: u32, er: u32, s: u32) -> Position {
        Position {
            group_index: g,
            group_repeat: gr,
            entry_index: e,
            entry_repeat: er,
            stitch_ordinal: s,
        }
    }

    #[test]
    fn advance_visits_every_stitch_in_order() {
        let pattern = mixed();
        let visited = walk(&pattern);

        assert_eq!(visited.len() as u64, pattern.total_stitches());
        assert!(visited.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(visited[4], pos(0, 0, 1, 0, 0));
        assert_eq!(visited[5], pos(0, 1, 0, 0, 0));
        assert_eq!(visited[10], pos(1, 0, 0, 0, 0));
        assert_eq!(visited.last().copied(), Position::last(&pattern));
    }

    #[test]
    fn advance_from_last_stitch_is_exhausted() {
        let pattern = mixed();
        let last = Position::last(&pattern).unwrap();
        assert_eq!(last.advance(&pattern), Ok(Step::Exhausted));
    }

    #[test]
    fn retreat_at_origin_is_a_no_op() {
        let pattern = mixed();
        let start = Position::start();
        assert_eq!(start.retreat(&pattern), Ok(start));
        assert_eq!(start.retreat(&pattern).unwrap().retreat(&pattern), Ok(start));
    }

    #[test]
    fn retreat_inverts_advance_everywhere() {
        let pattern = mixed();
        let visited = walk(&pattern);
        for pair in visited.windows(2) {
            assert_eq!(pair[1].retreat(&pattern), Ok(pair[0]), "from {}", pair[1]);
        }
    }

    #[test]
    fn rank_matches_walk_order() {
        let pattern = mixed();
        for (i, p) in walk(&pattern).iter().enumerate() {
            assert_eq!(p.rank(&pattern), i as u64);
        }
    }

    #[test]
    fn rank_in_group_counts_completed_repeats() {
        let pattern = mixed();
        assert_eq!(pos(0, 1, 0, 1, 0).rank_in_group(&pattern), 5 + 2);
        assert_eq!(pos(1, 0, 0, 0, 2).rank_in_group(&pattern), 2);
    }

    #[test]
    fn out_of_bounds_positions_are_rejected() {
        let pattern = mixed();
        let bad = pos(0, 0, 0, 0, 5);
        assert_eq!(bad.advance(&pattern), Err(PositionError::OutOfBounds(bad)));
        assert_eq!(bad.retreat(&pattern), Err(PositionError::OutOfBounds(bad)));
        assert!(pos(2, 0, 0, 0, 0).validate(&pattern).is_err());
        assert!(pos(9, 0, 0, 0, 0).rank(&pattern) <= pattern.total_stitches());
    }

    #[test]
    fn empty_pattern_has_no_last_position() {
        assert_eq!(Position::last(&pattern(Vec::new())), None);
    }
}

//! Read-only progress report derived from a session's position.

use serde::Serialize;
use std::fmt;

use crate::model::{
    Pattern, PatternEntry, Position, SessionStatus, StitchId, StitchLookup, Step, WorkSession,
};

//
// ─── STITCH SLOTS ──────────────────────────────────────────────────────────────
//

/// What to show for the previous, current or next stitch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StitchSlot {
    Stitch { abbreviation: String, name: String },
    /// The entry references a stitch the lookup does not know.
    Unresolved { stitch_id: StitchId },
    /// Nothing to show, e.g. no previous stitch before the first one.
    None,
    /// Past the last stitch of the pattern.
    Finished,
}

impl StitchSlot {
    fn resolve(entry: &PatternEntry, stitches: &(impl StitchLookup + ?Sized)) -> Self {
        match stitches.stitch(entry.stitch_id()) {
            Some(stitch) => Self::Stitch {
                abbreviation: stitch.abbreviation().to_owned(),
                name: stitch.name().to_owned(),
            },
            None => Self::Unresolved {
                stitch_id: entry.stitch_id(),
            },
        }
    }

    fn at(
        position: Position,
        pattern: &Pattern,
        stitches: &(impl StitchLookup + ?Sized),
    ) -> Self {
        match position.resolve(pattern) {
            Ok((_, entry)) => Self::resolve(entry, stitches),
            Err(_) => Self::None,
        }
    }

    #[must_use]
    pub fn abbreviation(&self) -> Option<&str> {
        match self {
            Self::Stitch { abbreviation, .. } => Some(abbreviation),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for StitchSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stitch { abbreviation, .. } => f.write_str(abbreviation),
            Self::Unresolved { stitch_id } => write!(f, "?{stitch_id}"),
            Self::None => Ok(()),
            Self::Finished => f.write_str("finished"),
        }
    }
}

//
// ─── REPORT ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupProgress {
    pub label: String,
    pub repeat_count: u32,
    /// 1-based repeat being worked; `repeat_count` once done, 0 before starting.
    pub current_repeat: u32,
    pub status: GroupStatus,
    pub completed_in_group: u64,
    pub total_in_group: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub status: SessionStatus,
    pub completed_stitches: u64,
    pub total_stitches: u64,
    pub percentage: f64,
    pub current_group_label: String,
    /// "repeat i of n" for the current group, empty when it is worked once.
    pub group_repeat_info: String,
    /// "repeat i of n" for the current entry, empty when it is worked once.
    pub entry_repeat_info: String,
    /// 1-based stitch within the current entry repeat and that repeat's size.
    pub stitch_in_entry: Option<(u32, u32)>,
    pub current: StitchSlot,
    pub previous: StitchSlot,
    pub next: StitchSlot,
    pub groups: Vec<GroupProgress>,
}

impl ProgressReport {
    /// Percentage rounded to whole numbers for compact display.
    #[must_use]
    pub fn rounded_percentage(&self) -> u8 {
        // Always within 0..=100.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = self.percentage.round().clamp(0.0, 100.0) as u8;
        pct
    }
}

fn repeat_info(current: u32, total: u32) -> String {
    if total > 1 {
        format!("repeat {} of {total}", current + 1)
    } else {
        String::new()
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(done: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        done as f64 / total as f64 * 100.0
    }
}

/// Builds the progress report for `session` over `pattern`.
///
/// Pure: the session is never modified, and a stored position that no longer
/// fits the pattern still yields a report with clamped counts.
#[must_use]
pub fn compute_progress(
    session: &WorkSession,
    pattern: &Pattern,
    stitches: &(impl StitchLookup + ?Sized),
) -> ProgressReport {
    let position = session.position();
    let completed = session.is_complete();
    let total_stitches = pattern.total_stitches();
    let completed_stitches = if completed {
        total_stitches
    } else {
        position.rank(pattern)
    };

    let current_group = pattern.group(position.group_index);
    let current_group_label = current_group
        .map(|g| g.label(position.group_index as usize))
        .unwrap_or_default();
    let group_repeat_info = current_group
        .map(|g| repeat_info(position.group_repeat, g.repeat_count()))
        .unwrap_or_default();

    let resolved = position.resolve(pattern).ok();
    let entry_repeat_info = resolved
        .map(|(_, e)| repeat_info(position.entry_repeat, e.repeat_count()))
        .unwrap_or_default();

    let (current, previous, next, stitch_in_entry) = if completed {
        (
            StitchSlot::Finished,
            StitchSlot::at(position, pattern, stitches),
            StitchSlot::Finished,
            None,
        )
    } else {
        match resolved {
            Some((_, entry)) => {
                let previous = if position.is_start() {
                    StitchSlot::None
                } else {
                    position
                        .retreat(pattern)
                        .map_or(StitchSlot::None, |p| StitchSlot::at(p, pattern, stitches))
                };
                let next = match position.advance(pattern) {
                    Ok(Step::Moved(p)) => StitchSlot::at(p, pattern, stitches),
                    Ok(Step::Exhausted) => StitchSlot::Finished,
                    Err(_) => StitchSlot::None,
                };
                (
                    StitchSlot::resolve(entry, stitches),
                    previous,
                    next,
                    Some((position.stitch_ordinal + 1, entry.count())),
                )
            }
            None => (StitchSlot::None, StitchSlot::None, StitchSlot::None, None),
        }
    };

    let groups = pattern
        .groups()
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let total_in_group = group.total_stitches();
            let (status, current_repeat, completed_in_group) = match index
                .cmp(&(position.group_index as usize))
            {
                _ if completed => (GroupStatus::Completed, group.repeat_count(), total_in_group),
                std::cmp::Ordering::Less => {
                    (GroupStatus::Completed, group.repeat_count(), total_in_group)
                }
                std::cmp::Ordering::Equal => (
                    GroupStatus::InProgress,
                    position.group_repeat.saturating_add(1).min(group.repeat_count()),
                    position.rank_in_group(pattern),
                ),
                std::cmp::Ordering::Greater => (GroupStatus::NotStarted, 0, 0),
            };
            GroupProgress {
                label: group.label(index),
                repeat_count: group.repeat_count(),
                current_repeat,
                status,
                completed_in_group,
                total_in_group,
            }
        })
        .collect();

    ProgressReport {
        status: session.status(),
        completed_stitches,
        total_stitches,
        percentage: percentage(completed_stitches, total_stitches),
        current_group_label,
        group_repeat_info,
        entry_repeat_info,
        stitch_in_entry,
        current,
        previous,
        next,
        groups,
    }
}

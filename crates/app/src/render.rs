use std::fmt::Write as _;

use services::{ActiveSessionItem, WorkSessionView};
use stitch_core::{GroupStatus, ProgressReport, StitchSlot};

fn slot_text(slot: &StitchSlot) -> String {
    match slot {
        StitchSlot::Stitch { abbreviation, name } => format!("{abbreviation} ({name})"),
        StitchSlot::None => "-".to_owned(),
        other => other.to_string(),
    }
}

fn status_mark(status: GroupStatus) -> &'static str {
    match status {
        GroupStatus::NotStarted => "[ ]",
        GroupStatus::InProgress => "[>]",
        GroupStatus::Completed => "[x]",
    }
}

pub fn report(view: &WorkSessionView) -> String {
    let p: &ProgressReport = &view.progress;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "session {} · {} · {}",
        view.session.id(),
        view.pattern_name,
        p.status
    );
    let _ = writeln!(
        out,
        "progress: {}/{} stitches ({}%)",
        p.completed_stitches,
        p.total_stitches,
        p.rounded_percentage()
    );

    let mut where_line = p.current_group_label.clone();
    for extra in [&p.group_repeat_info, &p.entry_repeat_info] {
        if !extra.is_empty() {
            where_line.push_str(", ");
            where_line.push_str(extra);
        }
    }
    if let Some((n, of)) = p.stitch_in_entry {
        let _ = write!(where_line, ", stitch {n} of {of}");
    }
    let _ = writeln!(out, "at: {where_line}");

    let _ = writeln!(out, "previous: {}", slot_text(&p.previous));
    let _ = writeln!(out, "current:  {}", slot_text(&p.current));
    let _ = writeln!(out, "next:     {}", slot_text(&p.next));

    for group in &p.groups {
        let _ = writeln!(
            out,
            "  {} {} ({}/{} stitches, repeat {}/{})",
            status_mark(group.status),
            group.label,
            group.completed_in_group,
            group.total_in_group,
            group.current_repeat,
            group.repeat_count
        );
    }
    out
}

pub fn active_list(items: &[ActiveSessionItem]) -> String {
    if items.is_empty() {
        return "no active sessions\n".to_owned();
    }
    let mut out = String::new();
    for item in items {
        let _ = writeln!(
            out,
            "{}\tpattern {}\t{}\tlast activity {}",
            item.id,
            item.pattern_id,
            item.status,
            item.last_activity_at.to_rfc3339()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_core::compute_progress;
    use stitch_core::model::{
        Pattern, PatternEntry, PatternGroup, PatternId, Stitch, StitchId, UserId,
        WorkSessionDraft, WorkSessionId,
    };
    use stitch_core::time::fixed_now;

    fn view(steps: usize) -> WorkSessionView {
        let entry = PatternEntry::new(StitchId::new(1), 2, 1).unwrap();
        let group = PatternGroup::new(Some("Round 1".into()), 2, vec![entry]).unwrap();
        let pattern = Pattern::new(PatternId::new(3), UserId::new(1), "Coaster", vec![group]).unwrap();
        let stitches = vec![Stitch::new(StitchId::new(1), "sc", "single crochet").unwrap()];

        let mut session = WorkSessionDraft::start(UserId::new(1), &pattern, fixed_now())
            .unwrap()
            .into_session(WorkSessionId::new(9));
        for _ in 0..steps {
            session = session.advance(&pattern, fixed_now()).unwrap();
        }
        let progress = compute_progress(&session, &pattern, &stitches);
        WorkSessionView {
            session,
            pattern_name: pattern.name().to_owned(),
            progress,
        }
    }

    #[test]
    fn report_shows_position_and_neighbours() {
        let text = report(&view(2));
        assert!(text.contains("session 9 · Coaster · active"));
        assert!(text.contains("progress: 2/4 stitches (50%)"));
        assert!(text.contains("at: Round 1, repeat 2 of 2, stitch 1 of 2"));
        assert!(text.contains("previous: sc (single crochet)"));
        assert!(text.contains("[>] Round 1 (2/4 stitches, repeat 2/2)"));
    }

    #[test]
    fn completed_report_uses_finished_marker() {
        let text = report(&view(4));
        assert!(text.contains("current:  finished"));
        assert!(text.contains("next:     finished"));
        assert!(text.contains("[x] Round 1"));
    }

    #[test]
    fn empty_list_says_so() {
        assert_eq!(active_list(&[]), "no active sessions\n");
    }
}

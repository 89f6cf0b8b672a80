use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use services::{AppServices, Clock, ErrorKind, WorkSessionService};
use stitch_core::GroupStatus;
use stitch_core::model::{
    Pattern, PatternEntry, PatternGroup, PatternId, SessionStatus, Stitch, StitchId, UserId,
    WorkSession, WorkSessionDraft, WorkSessionId,
};
use stitch_core::time::fixed_now;
use storage::repository::{
    InMemoryRepository, PatternRepository, StitchRepository, StorageError, WorkSessionRepository,
};

const USER: UserId = UserId::new(1);

fn entry(stitch: u64, count: u32, repeat: u32) -> PatternEntry {
    PatternEntry::new(StitchId::new(stitch), count, repeat).unwrap()
}

fn group(repeat: u32, entries: Vec<PatternEntry>) -> PatternGroup {
    PatternGroup::new(None, repeat, entries).unwrap()
}

async fn services_with(groups: Vec<PatternGroup>) -> (WorkSessionService, PatternId) {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    let pattern = Pattern::new(PatternId::new(1), USER, "Test", groups).unwrap();
    app.storage().patterns.upsert_pattern(&pattern).await.unwrap();
    for (id, abbr, name) in [(1, "sc", "single crochet"), (2, "dc", "double crochet")] {
        let stitch = Stitch::new(StitchId::new(id), abbr, name).unwrap();
        app.storage().stitches.upsert_stitch(&stitch).await.unwrap();
    }
    (app.work_sessions().as_ref().clone(), pattern.id())
}

/// Mixed radices at every level: 2 × (2 sc ×2, 1 dc) then 3 sc = 13 stitches.
fn mixed_groups() -> Vec<PatternGroup> {
    vec![
        group(2, vec![entry(1, 2, 2), entry(2, 1, 1)]),
        group(1, vec![entry(1, 3, 1)]),
    ]
}

#[tokio::test]
async fn scenario_single_group_completes_after_three_stitches() {
    let (svc, pattern_id) = services_with(vec![group(1, vec![entry(1, 3, 1)])]).await;
    let id = svc.start(USER, pattern_id).await.unwrap().session.id();

    let mut view = svc.progress(USER, id).await.unwrap();
    for _ in 0..3 {
        view = svc.advance(USER, id).await.unwrap();
    }

    assert_eq!(view.session.status(), SessionStatus::Completed);
    assert_eq!(view.session.completed_at(), Some(fixed_now()));
    assert_eq!(view.progress.completed_stitches, 3);
    assert_eq!(view.progress.total_stitches, 3);
}

#[tokio::test]
async fn scenario_two_groups_moves_into_second_group() {
    let (svc, pattern_id) = services_with(vec![
        group(1, vec![entry(1, 3, 1)]),
        group(1, vec![entry(2, 3, 1)]),
    ])
    .await;
    let id = svc.start(USER, pattern_id).await.unwrap().session.id();

    let mut view = svc.progress(USER, id).await.unwrap();
    for _ in 0..3 {
        view = svc.advance(USER, id).await.unwrap();
    }
    assert_eq!(view.session.status(), SessionStatus::Active);
    assert_eq!(view.progress.current_group_label, "Group 2");
    assert_eq!(view.progress.completed_stitches, 3);
    assert_eq!(view.progress.groups[0].status, GroupStatus::Completed);
    assert_eq!(view.progress.groups[1].status, GroupStatus::InProgress);
    assert_eq!(view.progress.current.abbreviation(), Some("dc"));
    assert_eq!(view.progress.previous.abbreviation(), Some("sc"));

    for _ in 0..3 {
        view = svc.advance(USER, id).await.unwrap();
    }
    assert_eq!(view.session.status(), SessionStatus::Completed);
    assert_eq!(view.progress.completed_stitches, 6);
}

#[tokio::test]
async fn scenario_backward_navigation() {
    let (svc, pattern_id) = services_with(vec![
        group(1, vec![entry(1, 3, 1)]),
        group(1, vec![entry(2, 3, 1)]),
    ])
    .await;
    let id = svc.start(USER, pattern_id).await.unwrap().session.id();

    svc.advance(USER, id).await.unwrap();
    svc.advance(USER, id).await.unwrap();
    let view = svc.retreat(USER, id).await.unwrap();

    assert_eq!(view.progress.completed_stitches, 1);
    assert_eq!(view.session.status(), SessionStatus::Active);
}

#[tokio::test]
async fn scenario_group_repeat_is_announced() {
    let (svc, pattern_id) = services_with(vec![group(2, vec![entry(1, 2, 1)])]).await;
    let id = svc.start(USER, pattern_id).await.unwrap().session.id();

    let first = svc.progress(USER, id).await.unwrap();
    assert_eq!(first.progress.group_repeat_info, "repeat 1 of 2");

    svc.advance(USER, id).await.unwrap();
    let view = svc.advance(USER, id).await.unwrap();
    assert_eq!(view.progress.group_repeat_info, "repeat 2 of 2");
    assert_eq!(view.progress.groups[0].current_repeat, 2);

    svc.advance(USER, id).await.unwrap();
    let view = svc.advance(USER, id).await.unwrap();
    assert_eq!(view.session.status(), SessionStatus::Completed);
}

#[tokio::test]
async fn single_repeat_groups_have_no_repeat_text() {
    let (svc, pattern_id) = services_with(vec![group(1, vec![entry(1, 2, 1)])]).await;
    let view = svc.start(USER, pattern_id).await.unwrap();
    assert_eq!(view.progress.group_repeat_info, "");
}

#[tokio::test]
async fn advancing_n_times_completes_and_further_advance_is_rejected() {
    let (svc, pattern_id) = services_with(mixed_groups()).await;
    let view = svc.start(USER, pattern_id).await.unwrap();
    let id = view.session.id();
    let total = view.progress.total_stitches;
    assert_eq!(total, 13);

    let mut last = view;
    for step in 1..=total {
        last = svc.advance(USER, id).await.unwrap();
        let expect_done = step == total;
        assert_eq!(last.session.is_complete(), expect_done, "after {step} steps");
    }
    assert_eq!(last.progress.completed_stitches, total);
    assert_eq!(last.progress.percentage, 100.0);
    assert!(last.progress.current.is_finished());

    let err = svc.advance(USER, id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let err = svc.retreat(USER, id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    // Rejected operations leave state unchanged.
    let after = svc.progress(USER, id).await.unwrap();
    assert_eq!(after.session, last.session);
}

#[tokio::test]
async fn retreat_on_fresh_session_is_a_no_op() {
    let (svc, pattern_id) = services_with(mixed_groups()).await;
    let started = svc.start(USER, pattern_id).await.unwrap();
    let id = started.session.id();

    let once = svc.retreat(USER, id).await.unwrap();
    let twice = svc.retreat(USER, id).await.unwrap();

    for view in [&once, &twice] {
        assert_eq!(view.session.position(), started.session.position());
        assert_eq!(view.session.status(), SessionStatus::Active);
        assert_eq!(view.progress.completed_stitches, 0);
        assert_eq!(view.progress.previous, stitch_core::StitchSlot::None);
    }
}

#[tokio::test]
async fn advance_then_retreat_round_trips_every_position() {
    let (svc, pattern_id) = services_with(mixed_groups()).await;
    let id = svc.start(USER, pattern_id).await.unwrap().session.id();

    for _ in 0..12 {
        let before = svc.progress(USER, id).await.unwrap().session.position();
        svc.advance(USER, id).await.unwrap();
        let back = svc.retreat(USER, id).await.unwrap();
        assert_eq!(back.session.position(), before);
        svc.advance(USER, id).await.unwrap();
    }
}

#[tokio::test]
async fn percentage_is_monotonic_in_both_directions() {
    let (svc, pattern_id) = services_with(mixed_groups()).await;
    let id = svc.start(USER, pattern_id).await.unwrap().session.id();

    let mut prev = 0.0;
    for _ in 0..12 {
        let pct = svc.advance(USER, id).await.unwrap().progress.percentage;
        assert!(pct >= prev);
        prev = pct;
    }
    for _ in 0..15 {
        let pct = svc.retreat(USER, id).await.unwrap().progress.percentage;
        assert!(pct <= prev);
        prev = pct;
    }
    assert_eq!(prev, 0.0);
}

#[tokio::test]
async fn pause_and_resume_preserve_progress() {
    let (svc, pattern_id) = services_with(mixed_groups()).await;
    let id = svc.start(USER, pattern_id).await.unwrap().session.id();
    for _ in 0..5 {
        svc.advance(USER, id).await.unwrap();
    }
    let before = svc.progress(USER, id).await.unwrap();

    let paused = svc.pause(USER, id).await.unwrap();
    assert_eq!(paused.session.status(), SessionStatus::Paused);
    assert_eq!(
        svc.advance(USER, id).await.unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    assert_eq!(
        svc.retreat(USER, id).await.unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    let still_paused = svc.progress(USER, id).await.unwrap();
    assert_eq!(still_paused.session.position(), before.session.position());
    assert_eq!(still_paused.session.status(), SessionStatus::Paused);
    assert_eq!(
        svc.pause(USER, id).await.unwrap_err().kind(),
        ErrorKind::InvalidInput
    );

    let resumed = svc.resume(USER, id).await.unwrap();
    assert_eq!(resumed.session.status(), SessionStatus::Active);
    assert_eq!(resumed.session.position(), before.session.position());
    assert_eq!(
        resumed.progress.completed_stitches,
        before.progress.completed_stitches
    );
    assert_eq!(resumed.progress.percentage, before.progress.percentage);
    assert_eq!(
        svc.resume(USER, id).await.unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
}

#[tokio::test]
async fn completed_session_cannot_be_paused_or_resumed() {
    let (svc, pattern_id) = services_with(vec![group(1, vec![entry(1, 1, 1)])]).await;
    let id = svc.start(USER, pattern_id).await.unwrap().session.id();
    svc.advance(USER, id).await.unwrap();

    assert_eq!(
        svc.pause(USER, id).await.unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    assert_eq!(
        svc.resume(USER, id).await.unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    svc.abandon(USER, id).await.unwrap();
}

#[tokio::test]
async fn timestamps_follow_the_clock() {
    let repo = InMemoryRepository::new();
    let pattern = Pattern::new(
        PatternId::new(1),
        USER,
        "Test",
        vec![group(1, vec![entry(1, 2, 1)])],
    )
    .unwrap();
    repo.upsert_pattern(&pattern).await.unwrap();

    let mut clock = Clock::fixed(fixed_now());
    let svc = |clock: Clock| {
        WorkSessionService::new(
            clock,
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    };
    let id = svc(clock).start(USER, pattern.id()).await.unwrap().session.id();

    clock.advance(Duration::minutes(10));
    let view = svc(clock).advance(USER, id).await.unwrap();
    assert_eq!(view.session.started_at(), fixed_now());
    assert_eq!(
        view.session.last_activity_at(),
        fixed_now() + Duration::minutes(10)
    );

    clock.advance(Duration::minutes(5));
    let done = svc(clock).advance(USER, id).await.unwrap();
    assert_eq!(
        done.session.completed_at(),
        Some(fixed_now() + Duration::minutes(15))
    );
    // Stitches missing from the library render as unresolved, not finished.
    assert!(matches!(
        done.progress.previous,
        stitch_core::StitchSlot::Unresolved { .. }
    ));
}

/// Session store where another writer always sneaks in between load and update.
struct RacingStore {
    inner: InMemoryRepository,
}

#[async_trait]
impl WorkSessionRepository for RacingStore {
    async fn create_session(&self, draft: &WorkSessionDraft) -> Result<WorkSession, StorageError> {
        self.inner.create_session(draft).await
    }

    async fn get_session(&self, id: WorkSessionId) -> Result<WorkSession, StorageError> {
        let loaded = self.inner.get_session(id).await?;
        self.inner.update_session(&loaded).await?;
        Ok(loaded)
    }

    async fn update_session(&self, session: &WorkSession) -> Result<WorkSession, StorageError> {
        self.inner.update_session(session).await
    }

    async fn delete_session(&self, id: WorkSessionId) -> Result<(), StorageError> {
        self.inner.delete_session(id).await
    }

    async fn list_active_by_user(&self, owner: UserId) -> Result<Vec<WorkSession>, StorageError> {
        self.inner.list_active_by_user(owner).await
    }
}

#[tokio::test]
async fn concurrent_writer_surfaces_as_conflict() {
    let repo = InMemoryRepository::new();
    let pattern = Pattern::new(PatternId::new(1), USER, "Test", mixed_groups()).unwrap();
    repo.upsert_pattern(&pattern).await.unwrap();

    let svc = WorkSessionService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(RacingStore {
            inner: repo.clone(),
        }),
    );

    let id = svc.start(USER, pattern.id()).await.unwrap().session.id();
    let err = svc.advance(USER, id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // The losing write did not move the session.
    let stored = repo.get_session(id).await.unwrap();
    assert!(stored.position().is_start());
}

struct UnreachableLibrary;

#[async_trait]
impl StitchRepository for UnreachableLibrary {
    async fn upsert_stitch(&self, _stitch: &Stitch) -> Result<(), StorageError> {
        Err(StorageError::Connection("library offline".into()))
    }

    async fn get_stitches(&self, _ids: &[StitchId]) -> Result<Vec<Stitch>, StorageError> {
        Err(StorageError::Connection("library offline".into()))
    }
}

#[tokio::test]
async fn failed_stitch_lookup_leaves_sessions_untouched() {
    let repo = InMemoryRepository::new();
    let pattern = Pattern::new(PatternId::new(1), USER, "Test", mixed_groups()).unwrap();
    repo.upsert_pattern(&pattern).await.unwrap();

    let svc = WorkSessionService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(UnreachableLibrary),
        Arc::new(repo.clone()),
    );

    let err = svc.start(USER, pattern.id()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(repo.list_active_by_user(USER).await.unwrap().is_empty());

    let draft = WorkSessionDraft::start(USER, &pattern, fixed_now()).unwrap();
    let existing = repo.create_session(&draft).await.unwrap();
    let err = svc.advance(USER, existing.id()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    let stored = repo.get_session(existing.id()).await.unwrap();
    assert!(stored.position().is_start());
    assert_eq!(stored.version(), existing.version());
}

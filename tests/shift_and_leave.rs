mod common;

use chrono::NaiveDate;
use serde_json::json;

use common::{harness, interleaving_harness, MANAGER, OTHER_STAFF, STAFF, SUPERVIZOR};
use fieldops_be::engine::error::EngineError;
use fieldops_be::engine::status::LeaveStatus;
use fieldops_be::models::audit::AuditKind;
use fieldops_be::models::leave::{CreateLeaveRequest, LeaveDecision, LeaveType, LeaveWarning};
use fieldops_be::models::shift::{ExpectedWindow, OffReason, Schedule, ScheduleWarning, ToggleAction};
use fieldops_be::store::LeaveStore;

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, m, d).unwrap()
}

fn leave(start: NaiveDate, end: NaiveDate) -> CreateLeaveRequest {
    CreateLeaveRequest {
        start,
        end,
        leave_type: LeaveType::Annual,
        description: "Family visit".to_string(),
    }
}

#[tokio::test]
async fn shift_toggle_guards_the_active_record() {
    let h = harness();

    assert!(matches!(
        h.engine.shifts.toggle(&STAFF, ToggleAction::End).await,
        Err(EngineError::NotActive(10))
    ));

    let started = h.engine.shifts.toggle(&STAFF, ToggleAction::Start).await.unwrap();
    assert!(started.is_active);
    assert!(matches!(
        h.engine.shifts.toggle(&STAFF, ToggleAction::Start).await,
        Err(EngineError::AlreadyActive(10))
    ));

    let current = h.engine.shifts.current(&STAFF, STAFF.id).await.unwrap();
    assert_eq!(current.active.map(|r| r.id), Some(started.id));
    assert_eq!(current.today, ExpectedWindow::Unscheduled);

    let ended = h.engine.shifts.toggle(&STAFF, ToggleAction::End).await.unwrap();
    assert_eq!(ended.id, started.id);
    assert!(!ended.is_active);
    assert!(ended.clock_out.is_some());

    // Another staff member's shift is independent.
    h.engine.shifts.toggle(&OTHER_STAFF, ToggleAction::Start).await.unwrap();
    assert!(h.engine.shifts.current(&STAFF, STAFF.id).await.unwrap().active.is_none());

    let kinds: Vec<AuditKind> = h.store.audit_events().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![AuditKind::ShiftStarted, AuditKind::ShiftEnded, AuditKind::ShiftStarted]
    );
}

#[tokio::test]
async fn shift_records_are_private_to_the_reporting_line() {
    let h = harness();
    assert!(matches!(
        h.engine.shifts.current(&OTHER_STAFF, STAFF.id).await,
        Err(EngineError::AuthorityDenied)
    ));
    assert!(h.engine.shifts.current(&MANAGER, STAFF.id).await.is_ok());
}

#[tokio::test]
async fn rotating_schedule_warnings() {
    let h = harness();
    let schedule: Schedule = serde_json::from_value(json!({
        "kind": "ROTATING",
        "days": {
            "Pazartesi": "09:00-17:00",
            "tuesday": "09:00-17:00",
            "wednesday": "off",
            "thursday": "22:00-06:00",
            "friday": "09:00-17:00",
            "saturday": "off",
            "sunday": "09:00-13:00"
        }
    }))
    .unwrap();

    let saved = h.engine.shifts.save_schedule(&MANAGER, STAFF.id, schedule).await.unwrap();
    assert_eq!(saved.warnings, vec![ScheduleWarning::Understaffing { off_days: 2 }]);

    // 2026-10-22 is a Thursday.
    let window = h
        .engine
        .shifts
        .expected_window(&STAFF, STAFF.id, date(10, 22))
        .await
        .unwrap();
    let (start, end) = window.bounds().unwrap();
    assert_eq!(start, date(10, 22).and_hms_opt(22, 0, 0).unwrap());
    assert_eq!(end, date(10, 23).and_hms_opt(6, 0, 0).unwrap());

    assert!(matches!(
        h.engine.shifts.save_schedule(&STAFF, STAFF.id, saved.assignment.schedule).await,
        Err(EngineError::AuthorityDenied)
    ));
}

#[tokio::test]
async fn approved_leave_turns_the_day_off() {
    let h = harness();
    let fixed: Schedule = serde_json::from_value(json!({
        "kind": "FIXED",
        "start_time": "09:00:00",
        "end_time": "18:00:00",
        "off_day": "Sun"
    }))
    .unwrap();
    h.engine.shifts.save_schedule(&SUPERVIZOR, STAFF.id, fixed).await.unwrap();

    let filed = h.engine.leaves.request(&STAFF, leave(date(11, 2), date(11, 4))).await.unwrap();
    assert!(filed.warnings.is_empty());
    assert_eq!(filed.request.status, LeaveStatus::Pending);
    assert_eq!(h.notifier.sent_to(MANAGER.id).len(), 1);

    let before = h.engine.shifts.expected_window(&STAFF, STAFF.id, date(11, 3)).await.unwrap();
    assert!(matches!(before, ExpectedWindow::Scheduled { .. }));

    let approved = h
        .engine
        .leaves
        .review(&MANAGER, filed.request.id, LeaveDecision::Approved, "")
        .await
        .unwrap();
    assert_eq!(approved.status, LeaveStatus::Approved);

    let after = h.engine.shifts.expected_window(&STAFF, STAFF.id, date(11, 3)).await.unwrap();
    assert_eq!(
        after,
        ExpectedWindow::Off {
            reason: OffReason::Leave,
            leave_id: Some(filed.request.id)
        }
    );
    let day_after = h.engine.shifts.expected_window(&STAFF, STAFF.id, date(11, 5)).await.unwrap();
    assert!(!day_after.is_off());
}

#[tokio::test]
async fn leave_review_rules() {
    let h = harness();
    let filed = h.engine.leaves.request(&STAFF, leave(date(12, 1), date(12, 2))).await.unwrap();
    let id = filed.request.id;

    assert!(matches!(
        h.engine.leaves.review(&STAFF, id, LeaveDecision::Approved, "").await,
        Err(EngineError::AuthorityDenied)
    ));
    assert!(matches!(
        h.engine.leaves.review(&MANAGER, id, LeaveDecision::Rejected, "").await,
        Err(EngineError::Validation(_))
    ));

    let rejected = h
        .engine
        .leaves
        .review(&MANAGER, id, LeaveDecision::Rejected, "Inventory week")
        .await
        .unwrap();
    assert_eq!(rejected.review_message.as_deref(), Some("Inventory week"));

    assert!(matches!(
        h.engine.leaves.review(&SUPERVIZOR, id, LeaveDecision::Approved, "").await,
        Err(EngineError::StateConflict { .. })
    ));
}

#[tokio::test]
async fn stale_leave_decision_is_a_conflict() {
    let h = harness();
    let filed = h.engine.leaves.request(&STAFF, leave(date(12, 3), date(12, 4))).await.unwrap();

    let mut stale = filed.request.clone();
    stale.status = LeaveStatus::Approved;
    stale.reviewer_id = Some(SUPERVIZOR.id);

    h.engine
        .leaves
        .review(&MANAGER, filed.request.id, LeaveDecision::Rejected, "Inventory week")
        .await
        .unwrap();

    assert!(matches!(
        h.store.swap_leave(LeaveStatus::Pending, &stale).await,
        Err(EngineError::StateConflict { .. })
    ));
    let stored = h.store.find_leave(filed.request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, LeaveStatus::Rejected);
    assert_eq!(stored.reviewer_id, Some(MANAGER.id));
}

#[tokio::test]
async fn concurrent_leave_reviews_let_exactly_one_win() {
    let h = interleaving_harness();
    let filed = h.engine.leaves.request(&STAFF, leave(date(12, 21), date(12, 22))).await.unwrap();
    let id = filed.request.id;

    let (approved, rejected) = tokio::join!(
        h.engine.leaves.review(&MANAGER, id, LeaveDecision::Approved, ""),
        h.engine.leaves.review(&SUPERVIZOR, id, LeaveDecision::Rejected, "Year-end count"),
    );

    let outcomes = [approved, rejected];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(EngineError::StateConflict { .. }))));

    let decisions = h
        .store
        .audit_events()
        .into_iter()
        .filter(|e| matches!(e.kind, AuditKind::LeaveApproved | AuditKind::LeaveRejected))
        .count();
    assert_eq!(decisions, 1);
}

#[tokio::test]
async fn managers_do_not_review_their_own_leave() {
    let h = harness();
    let filed = h.engine.leaves.request(&MANAGER, leave(date(12, 7), date(12, 8))).await.unwrap();

    assert!(matches!(
        h.engine
            .leaves
            .review(&MANAGER, filed.request.id, LeaveDecision::Approved, "")
            .await,
        Err(EngineError::AuthorityDenied)
    ));
    assert!(h
        .engine
        .leaves
        .review(&SUPERVIZOR, filed.request.id, LeaveDecision::Approved, "")
        .await
        .is_ok());
}

#[tokio::test]
async fn overlapping_requests_are_flagged_not_blocked() {
    let h = harness();
    let first = h.engine.leaves.request(&STAFF, leave(date(12, 10), date(12, 14))).await.unwrap();
    let second = h.engine.leaves.request(&STAFF, leave(date(12, 13), date(12, 15))).await.unwrap();

    assert_eq!(
        second.warnings,
        vec![LeaveWarning::OverlapsLeave {
            leave_id: first.request.id
        }]
    );
    assert_eq!(h.engine.leaves.list(&STAFF, None).await.unwrap().len(), 2);

    assert!(matches!(
        h.engine.leaves.request(&STAFF, leave(date(12, 20), date(12, 18))).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn staff_list_only_their_own_leave() {
    let h = harness();
    h.engine.leaves.request(&STAFF, leave(date(12, 1), date(12, 1))).await.unwrap();
    h.engine.leaves.request(&OTHER_STAFF, leave(date(12, 2), date(12, 2))).await.unwrap();

    assert_eq!(h.engine.leaves.list(&STAFF, None).await.unwrap().len(), 1);
    assert!(matches!(
        h.engine.leaves.list(&STAFF, Some(OTHER_STAFF.id)).await,
        Err(EngineError::AuthorityDenied)
    ));
    assert_eq!(h.engine.leaves.list(&MANAGER, None).await.unwrap().len(), 2);
    assert_eq!(h.engine.leaves.list(&MANAGER, Some(OTHER_STAFF.id)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rejection_notice_until_acknowledged() {
    let h = harness();
    let older = h.engine.leaves.request(&STAFF, leave(date(11, 9), date(11, 9))).await.unwrap();
    let newer = h.engine.leaves.request(&STAFF, leave(date(11, 16), date(11, 16))).await.unwrap();

    assert!(h.engine.leaves.rejection_notice(&STAFF).await.unwrap().is_none());

    h.engine
        .leaves
        .review(&MANAGER, older.request.id, LeaveDecision::Rejected, "Short staffed")
        .await
        .unwrap();
    h.engine
        .leaves
        .review(&MANAGER, newer.request.id, LeaveDecision::Rejected, "Audit day")
        .await
        .unwrap();

    let notice = h.engine.leaves.rejection_notice(&STAFF).await.unwrap().unwrap();
    assert_eq!(notice.id, newer.request.id);

    assert!(matches!(
        h.engine.leaves.acknowledge(&OTHER_STAFF, newer.request.id).await,
        Err(EngineError::AuthorityDenied)
    ));

    let marked = h.engine.leaves.acknowledge(&STAFF, newer.request.id).await.unwrap();
    assert_eq!(marked, 2);
    assert!(h.engine.leaves.rejection_notice(&STAFF).await.unwrap().is_none());
}

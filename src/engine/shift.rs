//! Shift scheduling: expected working windows, clock-in/out, and advisory
//! checks on rotating schedules.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::json;

use crate::config::EnginePolicy;
use crate::engine::audit::AuditEmitter;
use crate::engine::authority::{can_manage, can_view_staff};
use crate::engine::error::EngineError;
use crate::engine::status::{LeaveStatus, ShiftStatus};
use crate::models::audit::{AuditEvent, AuditKind, AuditSubject};
use crate::models::auth::{Actor, StaffMember};
use crate::models::leave::LeaveRequest;
use crate::models::shift::{
    weekday_key, CurrentShift, DayEntry, ExpectedWindow, OffReason, Rotation, Schedule, ScheduleSaved,
    ScheduleWarning, ShiftAssignment, ShiftRecord, TimeRange, ToggleAction,
};
use crate::store::{LeaveStore, NewShiftRecord, ShiftStore, StaffDirectory};

fn window(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> ExpectedWindow {
    let start_at = date.and_time(start);
    let mut end_at: NaiveDateTime = date.and_time(end);
    // Overnight shifts end on the following day.
    if end <= start {
        end_at += Duration::days(1);
    }
    ExpectedWindow::Scheduled {
        start: start_at,
        end: end_at,
    }
}

/// The working window `assignment` prescribes for `date`, ignoring leave.
pub fn expected_window(assignment: &ShiftAssignment, date: NaiveDate) -> ExpectedWindow {
    match &assignment.schedule {
        Schedule::Fixed {
            start_time,
            end_time,
            off_day,
        } => {
            if *off_day == Some(date.weekday()) {
                ExpectedWindow::Off {
                    reason: OffReason::RestDay,
                    leave_id: None,
                }
            } else {
                window(date, *start_time, *end_time)
            }
        }
        Schedule::Rotating { days } => match days.get(date.weekday()) {
            Some(DayEntry::Shift(TimeRange { start, end })) => window(date, start, end),
            Some(DayEntry::Off) => ExpectedWindow::Off {
                reason: OffReason::RestDay,
                leave_id: None,
            },
            None => ExpectedWindow::Unscheduled,
        },
    }
}

/// Like [`expected_window`], but an approved leave covering `date` wins
/// over whatever the schedule says.
pub fn effective_window(
    assignment: Option<&ShiftAssignment>,
    date: NaiveDate,
    leaves: &[LeaveRequest],
) -> ExpectedWindow {
    let on_leave = leaves
        .iter()
        .find(|leave| leave.status == LeaveStatus::Approved && leave.range.contains(date));

    match (on_leave, assignment) {
        (Some(leave), _) => ExpectedWindow::Off {
            reason: OffReason::Leave,
            leave_id: Some(leave.id),
        },
        (None, Some(assignment)) => expected_window(assignment, date),
        (None, None) => ExpectedWindow::Unscheduled,
    }
}

/// Non-blocking observations about a schedule. Only rotations produce any.
pub fn check_schedule(schedule: &Schedule) -> Vec<ScheduleWarning> {
    let Schedule::Rotating { days } = schedule else {
        return vec![];
    };
    check_rotation(days)
}

pub fn check_rotation(days: &Rotation) -> Vec<ScheduleWarning> {
    let mut warnings = vec![];
    let (mut working, mut off) = (0, 0);
    for (_, entry) in days.assigned() {
        match entry {
            DayEntry::Shift(_) => working += 1,
            DayEntry::Off => off += 1,
        }
    }

    if working == 7 {
        warnings.push(ScheduleWarning::Overtime);
    }
    if off >= 2 {
        warnings.push(ScheduleWarning::Understaffing { off_days: off });
    }

    let missing = days.missing();
    if !missing.is_empty() {
        warnings.push(ScheduleWarning::IncompleteRotation {
            missing: missing.into_iter().map(|d| weekday_key(d).to_string()).collect(),
        });
    }
    warnings
}

fn validate_schedule(schedule: &Schedule) -> Result<(), EngineError> {
    if let Schedule::Fixed {
        start_time, end_time, ..
    } = schedule
    {
        if start_time == end_time {
            return Err(EngineError::invalid("schedule.end_time", "shift must not be empty"));
        }
    }
    if let Schedule::Rotating { days } = schedule {
        for (day, entry) in days.assigned() {
            if let DayEntry::Shift(range) = entry {
                if range.start == range.end {
                    return Err(EngineError::invalid(
                        &format!("schedule.days.{}", weekday_key(day)),
                        "shift must not be empty",
                    ));
                }
            }
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct ShiftScheduler {
    shifts: Arc<dyn ShiftStore>,
    leaves: Arc<dyn LeaveStore>,
    staff: Arc<dyn StaffDirectory>,
    audit: AuditEmitter,
    policy: EnginePolicy,
}

impl ShiftScheduler {
    pub fn new(
        shifts: Arc<dyn ShiftStore>,
        leaves: Arc<dyn LeaveStore>,
        staff: Arc<dyn StaffDirectory>,
        audit: AuditEmitter,
        policy: EnginePolicy,
    ) -> Self {
        Self {
            shifts,
            leaves,
            staff,
            audit,
            policy,
        }
    }

    async fn staff_member(&self, staff_id: i32) -> Result<StaffMember, EngineError> {
        self.staff
            .find_staff(staff_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("staff {}", staff_id)))
    }

    pub async fn save_schedule(
        &self,
        actor: &Actor,
        staff_id: i32,
        schedule: Schedule,
    ) -> Result<ScheduleSaved, EngineError> {
        let member = self.staff_member(staff_id).await?;
        if !can_manage(actor, &member) {
            return Err(EngineError::AuthorityDenied);
        }
        validate_schedule(&schedule)?;

        let warnings = check_schedule(&schedule);
        let assignment = ShiftAssignment {
            staff_id,
            schedule,
            updated_by: actor.id,
            updated_at: Utc::now(),
        };
        self.shifts.save_assignment(&assignment).await?;

        for warning in &warnings {
            log::warn!("Schedule for staff {} saved with warning {:?}", staff_id, warning);
        }
        self.audit
            .emit(
                AuditEvent::new(AuditKind::ScheduleSaved, AuditSubject::Schedule, staff_id, actor.id)
                    .detail(json!({ "schedule": &assignment.schedule, "warnings": &warnings })),
            )
            .await;

        Ok(ScheduleSaved { assignment, warnings })
    }

    /// Leave-aware window for `staff_id` on `date`, without an access check.
    pub async fn window_for(&self, staff_id: i32, date: NaiveDate) -> Result<ExpectedWindow, EngineError> {
        let assignment = self.shifts.find_assignment(staff_id).await?;
        let leaves = self.leaves.list_leaves(Some(staff_id)).await?;
        Ok(effective_window(assignment.as_ref(), date, &leaves))
    }

    pub async fn expected_window(
        &self,
        actor: &Actor,
        staff_id: i32,
        date: NaiveDate,
    ) -> Result<ExpectedWindow, EngineError> {
        let member = self.staff_member(staff_id).await?;
        if !can_view_staff(actor, &member) {
            return Err(EngineError::AuthorityDenied);
        }
        self.window_for(staff_id, date).await
    }

    /// Clock in or out. Only the staff member themselves writes these fields.
    pub async fn toggle(&self, actor: &Actor, action: ToggleAction) -> Result<ShiftRecord, EngineError> {
        let now = Utc::now();

        let (record, kind) = match action {
            ToggleAction::Start => {
                let work_date = self.policy.local_date(now);
                let today = self.window_for(actor.id, work_date).await?;
                let bounds = today.bounds();
                let record = self
                    .shifts
                    .open_shift(NewShiftRecord {
                        staff_id: actor.id,
                        work_date,
                        scheduled_start: bounds.map(|(start, _)| start),
                        scheduled_end: bounds.map(|(_, end)| end),
                        clock_in: now,
                    })
                    .await?;
                (record, AuditKind::ShiftStarted)
            }
            ToggleAction::End => (self.shifts.close_shift(actor.id, now).await?, AuditKind::ShiftEnded),
        };

        let (from, to) = match kind {
            AuditKind::ShiftStarted => (ShiftStatus::Ended, ShiftStatus::Active),
            _ => (ShiftStatus::Active, ShiftStatus::Ended),
        };
        self.audit
            .emit(
                AuditEvent::new(kind, AuditSubject::Shift, record.id, actor.id)
                    .statuses(Some(from.as_str()), to.as_str())
                    .detail(json!({ "work_date": record.work_date, "at": now })),
            )
            .await;

        log::info!("Staff {} shift {:?} recorded (record {})", actor.id, action, record.id);
        Ok(record)
    }

    pub async fn current(&self, actor: &Actor, staff_id: i32) -> Result<CurrentShift, EngineError> {
        let member = self.staff_member(staff_id).await?;
        if !can_view_staff(actor, &member) {
            return Err(EngineError::AuthorityDenied);
        }

        let active = self.shifts.active_shift(staff_id).await?;
        let today = self.window_for(staff_id, self.policy.local_date(Utc::now())).await?;
        Ok(CurrentShift {
            staff_id,
            active,
            today,
            poll_interval_secs: self.policy.poll_interval_secs,
        })
    }

    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        self.policy.local_date(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::leave::{DateRange, LeaveType, NewLeaveRequest};
    use chrono::Weekday;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assignment(schedule: Schedule) -> ShiftAssignment {
        ShiftAssignment {
            staff_id: 10,
            schedule,
            updated_by: 2,
            updated_at: Utc::now(),
        }
    }

    fn rotation(entries: &[(&str, &str)]) -> Rotation {
        let raw = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<std::collections::BTreeMap<_, _>>();
        Rotation::try_from(raw).unwrap()
    }

    #[test]
    fn fixed_schedule_respects_off_day() {
        let fixed = assignment(Schedule::Fixed {
            start_time: hm(9, 0),
            end_time: hm(18, 0),
            off_day: Some(Weekday::Sun),
        });

        // 2026-10-18 is a Sunday.
        assert!(expected_window(&fixed, date(2026, 10, 18)).is_off());
        assert_eq!(
            expected_window(&fixed, date(2026, 10, 19)),
            ExpectedWindow::Scheduled {
                start: date(2026, 10, 19).and_time(hm(9, 0)),
                end: date(2026, 10, 19).and_time(hm(18, 0)),
            }
        );
    }

    #[test]
    fn rotating_schedule_distinguishes_off_from_missing() {
        let rotating = assignment(Schedule::Rotating {
            days: rotation(&[("monday", "08:00-16:00"), ("Salı", "off")]),
        });

        assert!(matches!(
            expected_window(&rotating, date(2026, 10, 19)),
            ExpectedWindow::Scheduled { .. }
        ));
        assert_eq!(
            expected_window(&rotating, date(2026, 10, 20)),
            ExpectedWindow::Off {
                reason: OffReason::RestDay,
                leave_id: None
            }
        );
        assert_eq!(expected_window(&rotating, date(2026, 10, 21)), ExpectedWindow::Unscheduled);
    }

    #[test]
    fn overnight_shift_ends_next_day() {
        let rotating = assignment(Schedule::Rotating {
            days: rotation(&[("friday", "22:00-06:00")]),
        });

        let (start, end) = expected_window(&rotating, date(2026, 10, 23)).bounds().unwrap();
        assert_eq!(start, date(2026, 10, 23).and_time(hm(22, 0)));
        assert_eq!(end, date(2026, 10, 24).and_time(hm(6, 0)));
    }

    #[test]
    fn approved_leave_overrides_schedule() {
        let fixed = assignment(Schedule::Fixed {
            start_time: hm(9, 0),
            end_time: hm(17, 0),
            off_day: None,
        });
        let mut leave = NewLeaveRequest {
            staff_id: 10,
            range: DateRange {
                start: date(2026, 10, 19),
                end: date(2026, 10, 21),
            },
            leave_type: LeaveType::Annual,
            description: String::new(),
            created_at: Utc::now(),
        }
        .into_request(4);

        let pending = [leave.clone()];
        assert!(!effective_window(Some(&fixed), date(2026, 10, 20), &pending).is_off());

        leave.status = LeaveStatus::Approved;
        let approved = [leave];
        assert_eq!(
            effective_window(Some(&fixed), date(2026, 10, 20), &approved),
            ExpectedWindow::Off {
                reason: OffReason::Leave,
                leave_id: Some(4)
            }
        );
        assert!(!effective_window(Some(&fixed), date(2026, 10, 22), &approved).is_off());
        assert_eq!(effective_window(None, date(2026, 10, 22), &approved), ExpectedWindow::Unscheduled);
    }

    const FULL_WEEK: [&str; 7] = [
        "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
    ];

    fn week_with_off(off: usize) -> Rotation {
        let entries: Vec<(&str, &str)> = FULL_WEEK
            .iter()
            .enumerate()
            .map(|(i, day)| (*day, if i < off { "off" } else { "09:00-17:00" }))
            .collect();
        rotation(&entries)
    }

    #[test]
    fn seven_working_days_warn_overtime() {
        assert_eq!(check_rotation(&week_with_off(0)), vec![ScheduleWarning::Overtime]);
    }

    #[test]
    fn two_off_days_warn_understaffing() {
        assert_eq!(
            check_rotation(&week_with_off(2)),
            vec![ScheduleWarning::Understaffing { off_days: 2 }]
        );
    }

    #[test]
    fn one_off_day_is_fine() {
        assert!(check_rotation(&week_with_off(1)).is_empty());
    }

    #[test]
    fn partial_rotation_is_allowed_but_flagged() {
        let warnings = check_rotation(&rotation(&[("monday", "09:00-17:00")]));
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            ScheduleWarning::IncompleteRotation { missing } if missing.len() == 6
        ));
    }

    #[test]
    fn bad_rotation_entries_are_rejected() {
        let mut raw = std::collections::BTreeMap::new();
        raw.insert("monday".to_string(), "9 to 5".to_string());
        assert!(Rotation::try_from(raw).is_err());

        let mut raw = std::collections::BTreeMap::new();
        raw.insert("funday".to_string(), "off".to_string());
        assert!(Rotation::try_from(raw).is_err());
    }
}

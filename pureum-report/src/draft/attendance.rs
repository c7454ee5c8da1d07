//! Attendance mirror
//!
//! Save assembly runs after awaiting uploads, long after the event handler
//! that scheduled it. Anything it reads must therefore come from a plain,
//! synchronously updated cell rather than a snapshot captured earlier. The
//! mirror holds that cell; the EventBus carries the matching change
//! notifications for rendering, and nothing read from the bus ever feeds a
//! save.

use pureum_common::api::{AttendanceRecord, AttendanceStatus, Member};
use pureum_common::events::{CompanionEvent, EventBus};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Authoritative, never-stale attendance roster for one draft
pub struct AttendanceMirror {
    cell: Mutex<Vec<AttendanceRecord>>,
    bus: EventBus,
}

impl AttendanceMirror {
    pub fn new(bus: EventBus) -> Self {
        Self {
            cell: Mutex::new(Vec::new()),
            bus,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AttendanceRecord>> {
        // the cell holds plain data; a poisoned lock still carries a
        // consistent roster
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the roster from a server draft that already has attendance
    pub fn hydrate(&self, records: Vec<AttendanceRecord>) {
        let deduped = dedupe_by_user(records);
        {
            let mut cell = self.lock();
            *cell = deduped;
        }
        self.emit_roster_replaced();
    }

    /// Seed the roster from the council membership list, defaulting every
    /// member to present and unconfirmed
    pub fn seed_from_members(&self, members: &[Member]) {
        let seeded = dedupe_by_user(members.iter().map(Member::default_attendance).collect());
        tracing::debug!(count = seeded.len(), "Seeding attendance from council roster");
        {
            let mut cell = self.lock();
            *cell = seeded;
        }
        self.emit_roster_replaced();
    }

    /// Set one member's status. The cell is updated synchronously, with no
    /// suspension point between mutation and notification.
    ///
    /// Returns false when the member is not on the roster.
    pub fn toggle(&self, user_id: i64, status: AttendanceStatus) -> bool {
        let changed = {
            let mut cell = self.lock();
            match cell.iter_mut().find(|record| record.user_id == user_id) {
                Some(record) => {
                    record.status = status;
                    true
                }
                None => false,
            }
        };

        if changed {
            self.bus.emit_lossy(CompanionEvent::AttendanceChanged {
                user_id: Some(user_id),
                status: Some(status),
                timestamp: chrono::Utc::now(),
            });
        } else {
            tracing::warn!(user_id, "Attendance toggle for unknown member ignored");
        }
        changed
    }

    /// Read the roster as of this very moment. Asynchronous callers (the
    /// sync controller in particular) must use this, never a value they
    /// captured before an await.
    pub fn read_latest(&self) -> Vec<AttendanceRecord> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn emit_roster_replaced(&self) {
        self.bus.emit_lossy(CompanionEvent::AttendanceChanged {
            user_id: None,
            status: None,
            timestamp: chrono::Utc::now(),
        });
    }
}

/// `user_id` is unique within a draft; keep the first occurrence
fn dedupe_by_user(records: Vec<AttendanceRecord>) -> Vec<AttendanceRecord> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.user_id) {
            out.push(record);
        } else {
            tracing::warn!(user_id = record.user_id, "Duplicate attendance row dropped");
        }
    }
    out
}

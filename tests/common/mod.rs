#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fieldops_be::config::EnginePolicy;
use fieldops_be::engine::audit::AuditSink;
use fieldops_be::engine::error::EngineError;
use fieldops_be::engine::status::LeaveStatus;
use fieldops_be::engine::{Engine, Store};
use fieldops_be::models::auth::{Actor, Role, StaffMember};
use fieldops_be::models::leave::{LeaveRequest, NewLeaveRequest};
use fieldops_be::models::shift::{ShiftAssignment, ShiftRecord};
use fieldops_be::models::task::{NewTask, Task, TaskRevision};
use fieldops_be::notify::Notifier;
use fieldops_be::store::{
    LeaveStore, MemoryStore, NewShiftRecord, ShiftStore, StaffDirectory, TaskFilter, TaskStore,
};

pub const SUPERVIZOR: Actor = Actor { id: 1, role: Role::Supervizor, branch_id: 1 };
pub const MANAGER: Actor = Actor { id: 2, role: Role::Manager, branch_id: 1 };
pub const OTHER_MANAGER: Actor = Actor { id: 3, role: Role::Manager, branch_id: 1 };
pub const STAFF: Actor = Actor { id: 10, role: Role::Staff, branch_id: 1 };
pub const OTHER_STAFF: Actor = Actor { id: 11, role: Role::Staff, branch_id: 1 };

/// Keeps every notification so tests can assert on who was told what.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(i32, String)>>,
}

impl RecordingNotifier {
    pub fn sent_to(&self, staff_id: i32) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == staff_id)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, staff_id: i32, message: &str) {
        self.sent.lock().unwrap().push((staff_id, message.to_string()));
    }
}

pub struct Harness {
    pub engine: Engine,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

fn member(id: i32, role: Role, manager_id: Option<i32>) -> StaffMember {
    StaffMember {
        id,
        name: format!("member-{id}"),
        role,
        branch_id: 1,
        manager_id,
        phone: None,
    }
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_staff(member(1, Role::Supervizor, None));
    store.add_staff(member(2, Role::Manager, Some(1)));
    store.add_staff(member(3, Role::Manager, Some(1)));
    store.add_staff(member(10, Role::Staff, Some(2)));
    store.add_staff(member(11, Role::Staff, Some(3)));
    store
}

fn assemble<S: Store + 'static>(store: Arc<MemoryStore>, backing: Arc<S>, policy: EnginePolicy) -> Harness {
    let notifier = Arc::new(RecordingNotifier::default());
    let store_sink: Arc<dyn AuditSink> = store.clone();
    let engine = Engine::new(backing, vec![store_sink], notifier.clone(), policy);

    Harness { engine, store, notifier }
}

pub fn harness_with(policy: EnginePolicy) -> Harness {
    let store = seeded_store();
    assemble(store.clone(), store, policy)
}

pub fn harness() -> Harness {
    harness_with(EnginePolicy::default())
}

/// Engine over an [`InterleavingStore`], for workflows that must both read
/// a record before either of them writes it.
pub fn interleaving_harness() -> Harness {
    let store = seeded_store();
    let backing = Arc::new(InterleavingStore(store.clone()));
    assemble(store, backing, EnginePolicy::default())
}

/// Delegates to a `MemoryStore` but yields to the scheduler after every task
/// and leave read. Two workflows joined on one runtime task therefore both
/// see the record before either swaps it.
pub struct InterleavingStore(pub Arc<MemoryStore>);

#[async_trait]
impl StaffDirectory for InterleavingStore {
    async fn find_staff(&self, id: i32) -> Result<Option<StaffMember>, EngineError> {
        self.0.find_staff(id).await
    }
}

#[async_trait]
impl TaskStore for InterleavingStore {
    async fn insert_task(&self, task: NewTask) -> Result<Task, EngineError> {
        self.0.insert_task(task).await
    }

    async fn find_task(&self, id: i32) -> Result<Option<Task>, EngineError> {
        let found = self.0.find_task(id).await;
        tokio::task::yield_now().await;
        found
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, EngineError> {
        self.0.list_tasks(filter).await
    }

    async fn swap_task(&self, expected: TaskRevision, task: &Task) -> Result<(), EngineError> {
        self.0.swap_task(expected, task).await
    }
}

#[async_trait]
impl ShiftStore for InterleavingStore {
    async fn find_assignment(&self, staff_id: i32) -> Result<Option<ShiftAssignment>, EngineError> {
        self.0.find_assignment(staff_id).await
    }

    async fn save_assignment(&self, assignment: &ShiftAssignment) -> Result<(), EngineError> {
        self.0.save_assignment(assignment).await
    }

    async fn active_shift(&self, staff_id: i32) -> Result<Option<ShiftRecord>, EngineError> {
        self.0.active_shift(staff_id).await
    }

    async fn open_shift(&self, record: NewShiftRecord) -> Result<ShiftRecord, EngineError> {
        self.0.open_shift(record).await
    }

    async fn close_shift(&self, staff_id: i32, clock_out: DateTime<Utc>) -> Result<ShiftRecord, EngineError> {
        self.0.close_shift(staff_id, clock_out).await
    }
}

#[async_trait]
impl LeaveStore for InterleavingStore {
    async fn insert_leave(&self, request: NewLeaveRequest) -> Result<LeaveRequest, EngineError> {
        self.0.insert_leave(request).await
    }

    async fn find_leave(&self, id: i32) -> Result<Option<LeaveRequest>, EngineError> {
        let found = self.0.find_leave(id).await;
        tokio::task::yield_now().await;
        found
    }

    async fn list_leaves(&self, staff_id: Option<i32>) -> Result<Vec<LeaveRequest>, EngineError> {
        self.0.list_leaves(staff_id).await
    }

    async fn swap_leave(&self, expected: LeaveStatus, request: &LeaveRequest) -> Result<(), EngineError> {
        self.0.swap_leave(expected, request).await
    }

    async fn acknowledge_rejections(
        &self,
        staff_id: i32,
        up_to: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<u64, EngineError> {
        self.0.acknowledge_rejections(staff_id, up_to, at).await
    }
}

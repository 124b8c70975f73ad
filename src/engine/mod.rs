//! The field-operations engine: pure rules plus the workflows that apply
//! them through the store traits.

pub mod approval;
pub mod audit;
pub mod authority;
pub mod error;
pub mod leave;
pub mod margin;
pub mod router;
pub mod shift;
pub mod state_machine;
pub mod status;
pub mod tasks;

use std::sync::Arc;

use crate::config::EnginePolicy;
use crate::notify::Notifier;
use crate::store::{LeaveStore, ShiftStore, StaffDirectory, TaskStore};

use self::approval::ApprovalWorkflow;
use self::audit::{AuditEmitter, AuditSink};
use self::authority::Authority;
use self::leave::LeaveWorkflow;
use self::shift::ShiftScheduler;
use self::state_machine::TaskStateMachine;
use self::tasks::TaskService;

/// Anything that can back every engine component at once.
pub trait Store: StaffDirectory + TaskStore + ShiftStore + LeaveStore {}

impl<T> Store for T where T: StaffDirectory + TaskStore + ShiftStore + LeaveStore {}

/// All workflows wired to one store, shared as actix `web::Data`.
#[derive(Clone)]
pub struct Engine {
    pub tasks: TaskService,
    pub approvals: ApprovalWorkflow,
    pub shifts: ShiftScheduler,
    pub leaves: LeaveWorkflow,
    pub staff: Arc<dyn StaffDirectory>,
    pub policy: EnginePolicy,
}

impl Engine {
    pub fn new<S>(
        store: Arc<S>,
        audit_sinks: Vec<Arc<dyn AuditSink>>,
        notifier: Arc<dyn Notifier>,
        policy: EnginePolicy,
    ) -> Self
    where
        S: Store + 'static,
    {
        let staff: Arc<dyn StaffDirectory> = store.clone();
        let task_store: Arc<dyn TaskStore> = store.clone();
        let shift_store: Arc<dyn ShiftStore> = store.clone();
        let leave_store: Arc<dyn LeaveStore> = store;

        let audit = AuditEmitter::new(audit_sinks);
        let authority = Authority::new(policy.allow_override_of_approved);
        let machine = TaskStateMachine::new(authority);

        let shifts = ShiftScheduler::new(
            shift_store,
            leave_store.clone(),
            staff.clone(),
            audit.clone(),
            policy.clone(),
        );
        let tasks = TaskService::new(
            task_store.clone(),
            staff.clone(),
            shifts.clone(),
            machine,
            audit.clone(),
            notifier.clone(),
            policy.clone(),
        );
        let approvals = ApprovalWorkflow::new(task_store, staff.clone(), machine, audit.clone(), notifier.clone());
        let leaves = LeaveWorkflow::new(leave_store, staff.clone(), authority, audit, notifier);

        Self {
            tasks,
            approvals,
            shifts,
            leaves,
            staff,
            policy,
        }
    }
}

//! Domain model (ids, statuses, confirmations, policy, delegation, messages, events).
//!
//! このモジュールは I/O を持ちません。時刻はすべて呼び出し側が渡す `now` です。

pub mod confirmation;
pub mod delegation;
pub mod duration_ms;
pub mod errors;
pub mod events;
pub mod ids;
pub mod messages;
pub mod period;
pub mod policy;
pub mod stagger;
pub mod status;

pub use confirmation::{Confirmation, Transition, advance};
pub use delegation::{ConfirmationSolution, DelegationEntry, DelegationState, StopOutcome};
pub use errors::{CoreError, ErrorKind};
pub use events::{ConfirmationEvent, EventKind};
pub use ids::{ConfirmationId, EventId, PeriodId};
pub use messages::{
    Actor, ActorKind, Answer, DelegationAction, DelegationMessage, PeriodMessage,
    SubmissionMessage, Submitted,
};
pub use period::PeriodInfo;
pub use policy::{ConfirmationSet, ReconcileContext, Reconciled, reconcile};
pub use stagger::{StaggerMap, StaggerMapError, WeekParity};
pub use status::{ConfirmationStatus, StatusKind, StatusLog, StatusRegression};

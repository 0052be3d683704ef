// ==========================================
// 医院值班排班系统 - 领域层
// ==========================================
// 职责: 领域实体与类型,不含业务规则
// ==========================================

pub mod quota;
pub mod schedule;
pub mod slot;
pub mod staff;
pub mod types;

pub use quota::{BandTable, FairnessBand, QuotaConfig, QuotaOverride};
pub use schedule::{DaySchedule, Schedule, ScheduleViolation, SlotRef};
pub use slot::{ConcreteSlot, PreAssignment, SlotTypeDef};
pub use staff::{Desiderata, StaffMember};
pub use types::{
    AllocPhase, AssigneeClass, DayPeriod, DayType, DesiderataPriority, SlotKind, StaffClass,
};

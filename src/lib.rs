// ==========================================
// 医院值班排班系统 - 核心库
// ==========================================
// 系统定位: 决策支持引擎 (排班结果由展示层最终确认)
// 技术栈: Rust + serde + chrono + tracing
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 配置层 - 日历/班型目录/引擎参数
pub mod config;

// 引擎层 - 额度/约束/分配/优化/回溯
pub mod engine;

// 错误类型
pub mod error;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AllocPhase, AssigneeClass, DayPeriod, DayType, DesiderataPriority, SlotKind, StaffClass,
};

// 领域实体
pub use domain::{
    ConcreteSlot, DaySchedule, Desiderata, FairnessBand, PreAssignment, QuotaConfig,
    QuotaOverride, Schedule, ScheduleViolation, SlotRef, SlotTypeDef, StaffMember,
};

// 配置
pub use config::{
    standard_catalog, DayClassifier, EngineParams, HolidayOracle, SetHolidayOracle, SlotCatalog,
};

// 引擎
pub use engine::{
    BacktrackSolver, BacktrackSummary, ConstraintEngine, DeficitReport, ExchangeOptimizer,
    OptimizerSummary, PhaseReport, QuotaEngine, QuotaOutcome, RosterOrchestrator, RosterRun,
    SlotAllocator,
};

// 错误
pub use error::{RosterError, RosterResult};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "医院值班排班系统";

// ==========================================
// 预编译检查
// ==========================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

// ==========================================
// 医院值班排班系统 - 引擎层
// ==========================================
// 执行顺序: 额度引擎 → 班次分配器 → 交换优化器 → 回溯求解器
// 约束引擎为无状态规则集,被各环节按需调用
// ==========================================

pub mod allocator;
pub mod backtrack;
pub mod constraint;
pub mod optimizer;
pub mod orchestrator;
pub mod quota;
pub mod report;

pub use allocator::SlotAllocator;
pub use backtrack::{BacktrackSolver, BacktrackSummary};
pub use constraint::ConstraintEngine;
pub use optimizer::{ExchangeOptimizer, OptimizerSummary};
pub use orchestrator::{RosterOrchestrator, RosterRun};
pub use quota::{QuotaEngine, QuotaOutcome};
pub use report::{DeficitReport, PhaseReport, PreAssignDiagnostic, UnmetRequirement};

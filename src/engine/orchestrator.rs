// ==========================================
// 医院值班排班系统 - 排班编排器
// ==========================================
// 职责: 对外协调一次完整排班运行: 额度 → 分配 → 交换优化 → 回溯 → 复核
// 红线: 调用方永远拿到"尽力完成"的班表 + 结构化报告; 是否判失败由展示层决定
// ==========================================

use crate::config::calendar::HolidayOracle;
use crate::config::catalog::SlotCatalog;
use crate::config::params::EngineParams;
use crate::domain::quota::QuotaConfig;
use crate::domain::schedule::Schedule;
use crate::domain::slot::PreAssignment;
use crate::domain::staff::StaffMember;
use crate::engine::allocator::SlotAllocator;
use crate::engine::backtrack::{BacktrackSolver, BacktrackSummary};
use crate::engine::optimizer::{ExchangeOptimizer, OptimizerSummary};
use crate::engine::quota::{QuotaEngine, QuotaOutcome};
use crate::engine::report::{DeficitReport, PreAssignDiagnostic};
use crate::error::RosterResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

// ==========================================
// RosterRun - 一次完整运行的结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterRun {
    /// 额度与公平区间
    pub outcome: QuotaOutcome,

    /// 尽力完成的班表
    pub schedule: Schedule,

    /// 各阶段缺口与诊断
    pub deficit: DeficitReport,

    /// 交换优化摘要
    pub optimizer: OptimizerSummary,

    /// 回溯求解摘要
    pub backtrack: BacktrackSummary,
}

// ==========================================
// RosterOrchestrator - 排班编排器
// ==========================================
pub struct RosterOrchestrator {
    params: EngineParams,
}

impl RosterOrchestrator {
    pub fn new(params: EngineParams) -> Self {
        Self { params }
    }

    /// 仅计算公平区间(展示层预览用)
    pub fn compute_fairness_bands<O: HolidayOracle + ?Sized>(
        &self,
        staff: &[StaffMember],
        catalog: &SlotCatalog,
        quota_cfg: &QuotaConfig,
        oracle: &O,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RosterResult<QuotaOutcome> {
        QuotaEngine::new(self.params.clone()).compute(staff, catalog, quota_cfg, oracle, start, end)
    }

    /// 阶段 1-6 分配,返回班表 + 额度 + 缺口报告
    pub fn build_schedule<O: HolidayOracle + ?Sized>(
        &self,
        staff: &[StaffMember],
        catalog: &SlotCatalog,
        quota_cfg: &QuotaConfig,
        oracle: &O,
        pre_assignments: &[PreAssignment],
        start: NaiveDate,
        end: NaiveDate,
    ) -> RosterResult<(Schedule, QuotaOutcome, DeficitReport)> {
        let outcome = self.compute_fairness_bands(staff, catalog, quota_cfg, oracle, start, end)?;
        let (schedule, deficit) =
            SlotAllocator::new(staff, catalog, quota_cfg, &outcome, self.params.clone())
                .build(oracle, pre_assignments, start, end)?;
        Ok((schedule, outcome, deficit))
    }

    /// 交换优化(原地改写班表)
    pub fn optimize(
        &self,
        schedule: &mut Schedule,
        staff: &[StaffMember],
        catalog: &SlotCatalog,
        outcome: &QuotaOutcome,
    ) -> OptimizerSummary {
        ExchangeOptimizer::new(staff, catalog, &outcome.bands, self.params.clone())
            .optimize(schedule)
    }

    /// 残留空位回溯求解(原地改写班表)
    pub fn solve_residual(
        &self,
        schedule: &mut Schedule,
        staff: &[StaffMember],
        catalog: &SlotCatalog,
        depth_budget: Option<u32>,
    ) -> BacktrackSummary {
        BacktrackSolver::new(staff, catalog, self.params.clone()).solve(schedule, depth_budget)
    }

    /// 完整流水线: 额度 → 分配 → 优化 → 回溯 → 预分配复核 → 终检
    #[instrument(skip_all, fields(start = %start, end = %end, staff_count = staff.len()))]
    pub fn run<O: HolidayOracle + ?Sized>(
        &self,
        staff: &[StaffMember],
        catalog: &SlotCatalog,
        quota_cfg: &QuotaConfig,
        oracle: &O,
        pre_assignments: &[PreAssignment],
        start: NaiveDate,
        end: NaiveDate,
    ) -> RosterResult<RosterRun> {
        let (mut schedule, outcome, mut deficit) = self.build_schedule(
            staff,
            catalog,
            quota_cfg,
            oracle,
            pre_assignments,
            start,
            end,
        )?;

        let optimizer = self.optimize(&mut schedule, staff, catalog, &outcome);
        let backtrack = self.solve_residual(&mut schedule, staff, catalog, None);

        // 生成后复核: 每条预分配应恰好实体化为一个匹配班次
        let extra = revalidate_pre_assignments(&schedule, catalog, pre_assignments, &deficit);
        deficit.pre_assign_diagnostics.extend(extra);

        // 终检: 双重占用在正确实现中应为空
        deficit.rejected_mutations.extend(schedule.scan_overlaps());

        info!(
            unassigned = schedule.unassigned_count(),
            deficit = deficit.total_deficit(),
            optimizer_committed = optimizer.committed,
            backtrack_placed = backtrack.placed,
            "排班运行完成"
        );
        Ok(RosterRun {
            outcome,
            schedule,
            deficit,
            optimizer,
            backtrack,
        })
    }
}

/// 预分配复核: 返回新增诊断(阶段2已诊断过的条目不再重复)
fn revalidate_pre_assignments(
    schedule: &Schedule,
    catalog: &SlotCatalog,
    pre_assignments: &[PreAssignment],
    deficit: &DeficitReport,
) -> Vec<PreAssignDiagnostic> {
    let mut out = Vec::new();
    for pa in pre_assignments {
        let already = deficit
            .pre_assign_diagnostics
            .iter()
            .any(|d| d.person == pa.person && d.date == pa.date && d.abbrev == pa.abbrev);
        if already {
            continue;
        }
        let matching = schedule
            .day(pa.date)
            .map(|day| {
                day.slots
                    .iter()
                    .filter(|s| s.abbrev == pa.abbrev && s.assigned_to(&pa.person) && s.fixed)
                    .count()
            })
            .unwrap_or(0);
        let period_ok = catalog
            .def(&pa.abbrev)
            .map(|d| d.period == pa.period)
            .unwrap_or(false);

        if matching != 1 || !period_ok {
            out.push(PreAssignDiagnostic {
                person: pa.person.clone(),
                date: pa.date,
                abbrev: pa.abbrev.clone(),
                reason: format!(
                    "POST_VALIDATION: materialized={} period_ok={}",
                    matching, period_ok
                ),
            });
        }
    }
    out
}

// ==========================================
// 医院值班排班系统 - 回溯求解器
// ==========================================
// 职责: 对小规模残留空位做深度受限的穷举搜索
// 排序: 最难先行 —— 合法候选最少,其次同日已分配邻居最多
// 红线: 仅检查硬约束; 软性心愿作为违反集计分,不作拒绝
// 红线: 节点预算耗尽属结果而非错误; 无完整解时班表保持原样
// ==========================================

use crate::config::catalog::SlotCatalog;
use crate::config::params::EngineParams;
use crate::domain::schedule::{Schedule, SlotRef};
use crate::domain::staff::StaffMember;
use crate::domain::types::StaffClass;
use crate::engine::constraint::ConstraintEngine;
use crate::engine::optimizer::scoring;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

// ==========================================
// BacktrackSummary - 求解摘要
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktrackSummary {
    /// 消耗的搜索节点数
    pub nodes: u32,

    /// 最终落位的班次数
    pub placed: u32,

    /// 被纳入搜索的残留班次数(受深度预算截断)
    pub attempted: usize,

    /// 最优完整解评分(未找到为 None)
    pub best_score: Option<i64>,
}

// ==========================================
// BacktrackSolver - 回溯求解器
// ==========================================
pub struct BacktrackSolver<'a> {
    staff: &'a [StaffMember],
    catalog: &'a SlotCatalog,
    params: EngineParams,
    constraint: ConstraintEngine,
}

impl<'a> BacktrackSolver<'a> {
    pub fn new(staff: &'a [StaffMember], catalog: &'a SlotCatalog, params: EngineParams) -> Self {
        let constraint = ConstraintEngine::new(params.clone());
        Self {
            staff,
            catalog,
            params,
            constraint,
        }
    }

    /// 对残留空位搜索最优完整填充; depth_budget 缺省取引擎参数
    #[instrument(skip_all, fields(unassigned = schedule.unassigned_count()))]
    pub fn solve(&self, schedule: &mut Schedule, depth_budget: Option<u32>) -> BacktrackSummary {
        let depth = depth_budget.unwrap_or(self.params.backtrack_depth) as usize;
        let mut summary = BacktrackSummary::default();

        // 最难先行排序,深度预算截断
        let mut residual: Vec<SlotRef> = schedule.unassigned_slots();
        residual.sort_by_key(|r| {
            let eligible = self.eligible_count(schedule, *r);
            let neighbors = self.same_day_assigned(schedule, *r);
            (eligible, std::cmp::Reverse(neighbors))
        });
        residual.truncate(depth);
        summary.attempted = residual.len();
        if residual.is_empty() {
            return summary;
        }

        let mut best: Option<(i64, Vec<(SlotRef, String)>)> = None;
        let mut current: Vec<(SlotRef, String)> = Vec::new();
        self.dfs(schedule, &residual, 0, &mut summary.nodes, &mut current, &mut best);

        if let Some((score, moves)) = best {
            for (r, person) in &moves {
                if schedule.assign(*r, person).is_ok() {
                    summary.placed += 1;
                }
            }
            summary.best_score = Some(score);
        }
        info!(
            nodes = summary.nodes,
            placed = summary.placed,
            best = ?summary.best_score,
            "回溯求解完成"
        );
        summary
    }

    fn dfs(
        &self,
        schedule: &mut Schedule,
        slots: &[SlotRef],
        idx: usize,
        nodes: &mut u32,
        current: &mut Vec<(SlotRef, String)>,
        best: &mut Option<(i64, Vec<(SlotRef, String)>)>,
    ) {
        if idx == slots.len() {
            let score = self.complete_score(schedule);
            if best.as_ref().map(|(s, _)| score > *s).unwrap_or(true) {
                debug!(score, depth = idx, "更优完整解");
                *best = Some((score, current.clone()));
            }
            return;
        }

        let r = slots[idx];
        let abbrev = schedule.slot(r).abbrev.clone();
        for member in self.staff {
            if *nodes >= self.params.backtrack_node_budget {
                return;
            }
            let Some(def) = self.catalog.def(&abbrev) else {
                return;
            };
            if !def.eligibility.accepts(member.class) {
                continue;
            }
            // 硬约束: 软性心愿放行,由评分计罚
            if !self
                .constraint
                .is_legal(member, r, schedule, self.catalog, true)
            {
                continue;
            }
            *nodes += 1;
            if schedule.assign(r, &member.name).is_err() {
                continue;
            }
            current.push((r, member.name.clone()));
            self.dfs(schedule, slots, idx + 1, nodes, current, best);
            current.pop();
            // 回撤本层落位
            let _ = schedule.unassign(r);
        }
    }

    /// 完整解评分: 1000 - 软违反×10 - (最大负载 - 最小负载)×5
    fn complete_score(&self, schedule: &Schedule) -> i64 {
        let secondary =
            scoring::secondary_violations(schedule, self.staff, self.catalog).len() as i64;
        let loads: Vec<u32> = self
            .staff
            .iter()
            .filter(|m| m.class == StaffClass::Doctor)
            .map(|m| schedule.total_of(&m.name))
            .collect();
        let spread = match (loads.iter().max(), loads.iter().min()) {
            (Some(max), Some(min)) => (max - min) as i64,
            _ => 0,
        };
        1000 - secondary * 10 - spread * 5
    }

    /// 该班次的硬合法候选人数(排序用)
    fn eligible_count(&self, schedule: &Schedule, r: SlotRef) -> usize {
        let abbrev = &schedule.slot(r).abbrev;
        self.staff
            .iter()
            .filter(|m| {
                self.catalog
                    .def(abbrev)
                    .map(|d| d.eligibility.accepts(m.class))
                    .unwrap_or(false)
                    && self
                        .constraint
                        .is_legal(m, r, schedule, self.catalog, true)
            })
            .count()
    }

    /// 同日已分配班次数(排序用)
    fn same_day_assigned(&self, schedule: &Schedule, r: SlotRef) -> usize {
        schedule.days[r.day_idx]
            .slots
            .iter()
            .filter(|s| s.is_assigned())
            .count()
    }
}

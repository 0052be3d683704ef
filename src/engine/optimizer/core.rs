// ==========================================
// 医院值班排班系统 - 交换优化器主干
// ==========================================
// 职责: 抽签选组 → 选参与者 → 构造循环交换 → 草稿试算 → 采纳或丢弃
// 红线: 只在严格改善,或持平且重点成员入区数上升时采纳
// 红线: 参与人数仅在小规模停滞后升档; 每档迭代预算固定
// ==========================================

use crate::config::catalog::SlotCatalog;
use crate::config::params::EngineParams;
use crate::domain::quota::BandTable;
use crate::domain::schedule::Schedule;
use crate::domain::staff::StaffMember;
use crate::domain::types::{DesiderataPriority, StaffClass};
use crate::engine::constraint::ConstraintEngine;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::exchange::ExchangeProposal;
use super::scoring;

// ==========================================
// OptimizerSummary - 优化运行摘要
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizerSummary {
    pub iterations: u32,
    pub committed: u32,
    pub initial_score: i64,
    pub final_score: i64,
}

// ==========================================
// ExchangeOptimizer - 交换优化器
// ==========================================
pub struct ExchangeOptimizer<'a> {
    staff: &'a [StaffMember],
    catalog: &'a SlotCatalog,
    bands: &'a BandTable,
    params: EngineParams,
    constraint: ConstraintEngine,
    rng: StdRng,
}

impl<'a> ExchangeOptimizer<'a> {
    pub fn new(
        staff: &'a [StaffMember],
        catalog: &'a SlotCatalog,
        bands: &'a BandTable,
        params: EngineParams,
    ) -> Self {
        let rng = StdRng::seed_from_u64(params.rng_seed.wrapping_add(1));
        let constraint = ConstraintEngine::new(params.clone());
        Self {
            staff,
            catalog,
            bands,
            params,
            constraint,
            rng,
        }
    }

    #[instrument(skip_all)]
    pub fn optimize(&mut self, schedule: &mut Schedule) -> OptimizerSummary {
        let mut summary = OptimizerSummary::default();
        let mut current = scoring::violation_score(schedule, self.staff, self.bands, self.catalog);
        summary.initial_score = current;

        let mut participants = 2usize;
        while participants <= self.params.optimizer_max_participants {
            let budget = self.params.optimizer_budget(participants);
            let before_tier = current;
            let mut tier_committed = 0u32;

            for _ in 0..budget {
                summary.iterations += 1;
                if let Some(new_score) = self.attempt_exchange(schedule, participants, current) {
                    current = new_score;
                    summary.committed += 1;
                    tier_committed += 1;
                }
            }

            debug!(participants, tier_committed, score = current, "优化档位结束");
            // 本档仍有严格改善则继续同档; 停滞才升档
            if current <= before_tier || tier_committed == 0 {
                participants += 1;
            }
        }

        summary.final_score = current;
        info!(
            iterations = summary.iterations,
            committed = summary.committed,
            initial = summary.initial_score,
            fin = summary.final_score,
            "交换优化完成"
        );
        summary
    }

    /// 单次尝试: 采纳时返回新评分
    fn attempt_exchange(
        &mut self,
        schedule: &mut Schedule,
        participants: usize,
        current: i64,
    ) -> Option<i64> {
        let group = self.pick_group(schedule)?;
        let names = self.pick_participants(schedule, &group, participants);
        if names.len() < 2 {
            return None;
        }

        let proposal = {
            let rng = &mut self.rng;
            ExchangeProposal::cycle(schedule, self.catalog, &group, &names, |held| {
                held.choose(rng).copied()
            })?
        };
        debug_assert!(proposal.is_balanced());

        // 事务试算: 草稿副本应用,失败即丢弃
        let mut scratch = schedule.clone();
        if !proposal.apply(&mut scratch, self.staff, &self.constraint, self.catalog) {
            return None;
        }

        let new_score = scoring::violation_score(&scratch, self.staff, self.bands, self.catalog);
        let neutral_gain = new_score == current
            && scoring::priority_in_band(&scratch, self.staff, self.bands, self.catalog)
                > scoring::priority_in_band(schedule, self.staff, self.bands, self.catalog);

        if new_score > current || neutral_gain {
            *schedule = scratch;
            Some(new_score)
        } else {
            None
        }
    }

    /// 按权重抽签选统计组; 全部权重为零返回 None
    fn pick_group(&mut self, schedule: &Schedule) -> Option<String> {
        let weighted: Vec<(String, f64)> = self
            .catalog
            .groups()
            .into_iter()
            .map(|g| {
                let w = scoring::group_weight(schedule, self.staff, self.bands, self.catalog, &g);
                (g, w)
            })
            .filter(|(_, w)| *w > 0.0)
            .collect();

        let total: f64 = weighted.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = self.rng.gen_range(0.0..total);
        for (group, w) in weighted {
            if roll < w {
                return Some(group);
            }
            roll -= w;
        }
        None
    }

    /// 候选参与者: 组内持有人 ∪ 有软性心愿的医生 ∪ 出区医生
    ///
    /// 70% 概率偏向心愿最少者,30% 均匀随机
    fn pick_participants(&mut self, schedule: &Schedule, group: &str, n: usize) -> Vec<String> {
        let abbrevs = self.catalog.types_in_group(group);
        let mut candidates: Vec<&StaffMember> = self
            .staff
            .iter()
            .filter(|m| {
                let holds = schedule
                    .days
                    .iter()
                    .flat_map(|d| d.slots_of(&m.name))
                    .any(|s| abbrevs.contains(&s.abbrev));
                let has_secondary = m
                    .desiderata
                    .iter()
                    .any(|d| d.priority == DesiderataPriority::Secondary);
                let out_of_band = m.class == StaffClass::Doctor
                    && !self
                        .bands
                        .for_group(&m.name, group)
                        .contains(scoring::group_count(schedule, self.catalog, &m.name, group));
                holds || has_secondary || out_of_band
            })
            .collect();

        if self.rng.gen_bool(0.7) {
            candidates.sort_by_key(|m| m.desiderata_count());
        } else {
            candidates.shuffle(&mut self.rng);
        }
        candidates
            .into_iter()
            .take(n)
            .map(|m| m.name.clone())
            .collect()
    }
}

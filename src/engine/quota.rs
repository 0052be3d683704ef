// ==========================================
// 医院值班排班系统 - 公平额度引擎
// ==========================================
// 职责: 周期内逐日分类日型,累计班型需求量,扣除 CAT 保留量,
//       计算每名医生按份额的 {min, max, target} 公平区间
// 红线: 本引擎绝不硬失败; 非法日期范围/份额总量为零属调用方错误,
//       在任何计算开始之前即上报
// ==========================================

use crate::config::calendar::{DayClassifier, HolidayOracle};
use crate::config::catalog::{SlotCatalog, WEEKEND_NIGHT_GROUP};
use crate::config::params::EngineParams;
use crate::domain::quota::{BandTable, FairnessBand, QuotaConfig};
use crate::domain::staff::StaffMember;
use crate::domain::types::{DayType, StaffClass};
use crate::error::{RosterError, RosterResult};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

// ==========================================
// QuotaOutcome - 额度计算结果
// ==========================================
// 每次运行计算一次,之后对分配器/优化器只读
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotaOutcome {
    /// 周期内 (日型, 班型) 需求总量
    #[serde(with = "crate::domain::quota::pair_entries")]
    pub per_day_type: HashMap<(DayType, String), u32>,

    /// 周期内班型需求总量(毛值)
    pub totals_by_type: HashMap<String, u32>,

    /// 周期内统计组需求总量(毛值,含 WEEKEND_NIGHT 组)
    pub totals_by_group: HashMap<String, u32>,

    /// CAT 保留量: 班型 → 人头配额 × CAT 人数(已按毛值封顶)
    pub cat_reserved_by_type: HashMap<String, u32>,

    /// 医生可分配余量(毛值 - CAT 保留)
    pub residual_by_type: HashMap<String, u32>,

    /// 统计组医生可分配余量
    pub residual_by_group: HashMap<String, u32>,

    /// 医生公平区间表
    pub bands: BandTable,
}

impl QuotaOutcome {
    /// 班型毛需求量
    pub fn total_of(&self, abbrev: &str) -> u32 {
        self.totals_by_type.get(abbrev).copied().unwrap_or(0)
    }

    /// 班型医生余量
    pub fn residual_of(&self, abbrev: &str) -> u32 {
        self.residual_by_type.get(abbrev).copied().unwrap_or(0)
    }
}

// ==========================================
// QuotaEngine - 公平额度引擎
// ==========================================
pub struct QuotaEngine {
    params: EngineParams,
}

impl QuotaEngine {
    pub fn new(params: EngineParams) -> Self {
        Self { params }
    }

    /// 计算整周期额度与公平区间
    ///
    /// 步骤:
    /// 1. 入参校验(配置错误即刻上报)
    /// 2. 逐日分类日型(桥日归入 SUNDAY_HOLIDAY),累计需求量
    /// 3. 周五夜班额外计入 WEEKEND_NIGHT 统计组
    /// 4. 扣除 CAT 人头保留量得到医生余量
    /// 5. 按 round_ideal 规则为每名医生计算班型与统计组区间
    #[instrument(skip_all, fields(start = %start, end = %end, staff_count = staff.len()))]
    pub fn compute<O: HolidayOracle + ?Sized>(
        &self,
        staff: &[StaffMember],
        catalog: &SlotCatalog,
        quota_cfg: &QuotaConfig,
        oracle: &O,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RosterResult<QuotaOutcome> {
        // === 步骤 1: 入参校验 ===
        if start > end {
            return Err(RosterError::InvalidPeriod(format!(
                "start={} > end={}",
                start, end
            )));
        }
        quota_cfg
            .validate_overrides()
            .map_err(RosterError::QuotaConfigError)?;

        let total_shares: u32 = staff
            .iter()
            .filter(|m| m.class == StaffClass::Doctor)
            .map(|m| m.share)
            .sum();
        if total_shares == 0 {
            return Err(RosterError::ZeroTotalShares);
        }

        let cat_count = staff
            .iter()
            .filter(|m| m.class == StaffClass::Cat)
            .count() as u32;

        let classifier = DayClassifier::new(oracle);
        let mut outcome = QuotaOutcome::default();

        // === 步骤 2/3: 逐日累计 ===
        let mut date = start;
        while date <= end {
            let day_type = classifier.classify(date);
            for abbrev in catalog.abbrevs() {
                let Some(def) = catalog.def(&abbrev) else {
                    continue;
                };
                if !def.applies_to(day_type) || def.force_zero {
                    continue;
                }
                let count = quota_cfg.quota_for(date, day_type, &abbrev);
                if count == 0 {
                    continue;
                }

                *outcome
                    .per_day_type
                    .entry((day_type, abbrev.clone()))
                    .or_insert(0) += count;
                *outcome.totals_by_type.entry(abbrev.clone()).or_insert(0) += count;
                if let Some(group) = def.stat_group.clone() {
                    *outcome.totals_by_group.entry(group).or_insert(0) += count;
                }
                // 周五夜班跨越工作周/周末边界,额外计入周末夜统计组
                if def.kind.is_night() && date.weekday() == Weekday::Fri {
                    *outcome
                        .totals_by_group
                        .entry(WEEKEND_NIGHT_GROUP.to_string())
                        .or_insert(0) += count;
                }
            }
            date += Duration::days(1);
        }

        // === 步骤 4: CAT 保留量扣除 ===
        for (abbrev, total) in &outcome.totals_by_type {
            let reserved = quota_cfg
                .cat_per_head
                .get(abbrev)
                .copied()
                .unwrap_or(0)
                .saturating_mul(cat_count)
                .min(*total);
            if reserved > 0 {
                outcome
                    .cat_reserved_by_type
                    .insert(abbrev.clone(), reserved);
            }
            outcome
                .residual_by_type
                .insert(abbrev.clone(), total - reserved);
        }

        // 组余量 = 组内班型余量之和; WEEKEND_NIGHT 组按夜班保留比例折减
        for group in catalog.groups() {
            let residual: u32 = catalog
                .types_in_group(&group)
                .iter()
                .map(|a| outcome.residual_of(a))
                .sum();
            outcome.residual_by_group.insert(group, residual);
        }
        if let Some(&wn_total) = outcome.totals_by_group.get(WEEKEND_NIGHT_GROUP) {
            // 周末夜组的 CAT 保留按夜班型逐一扣除后无法精确拆分,
            // 取组毛值减去夜班型保留量总和的下界
            let night_reserved: u32 = catalog
                .abbrevs()
                .iter()
                .filter(|a| catalog.def(a).map(|d| d.kind.is_night()).unwrap_or(false))
                .map(|a| outcome.cat_reserved_by_type.get(a).copied().unwrap_or(0))
                .sum();
            outcome.residual_by_group.insert(
                WEEKEND_NIGHT_GROUP.to_string(),
                wn_total.saturating_sub(night_reserved),
            );
        }

        // === 步骤 5: 公平区间 ===
        let doctors: Vec<&StaffMember> = staff
            .iter()
            .filter(|m| m.class == StaffClass::Doctor)
            .collect();

        for doctor in &doctors {
            for abbrev in catalog.abbrevs() {
                let total = outcome.residual_of(&abbrev);
                let band = Self::round_ideal(
                    total as f64 * doctor.share as f64 / total_shares as f64,
                    doctor.share,
                    &self.params,
                );
                outcome
                    .bands
                    .per_type
                    .insert((doctor.name.clone(), abbrev.clone()), band);
            }
            let mut groups = catalog.groups();
            groups.push(WEEKEND_NIGHT_GROUP.to_string());
            for group in groups {
                let total = outcome
                    .residual_by_group
                    .get(&group)
                    .copied()
                    .unwrap_or(0);
                let band = Self::round_ideal(
                    total as f64 * doctor.share as f64 / total_shares as f64,
                    doctor.share,
                    &self.params,
                );
                outcome
                    .bands
                    .per_group
                    .insert((doctor.name.clone(), group), band);
            }
        }

        info!(
            types = outcome.totals_by_type.len(),
            groups = outcome.totals_by_group.len(),
            total_shares,
            cat_count,
            "额度计算完成"
        );
        debug!(?outcome.totals_by_type, "班型需求总量");

        Ok(outcome)
    }

    /// round_ideal 取整规则
    ///
    /// 全职(share=2): 小数部分低于取整点 → {floor, floor+1};
    ///   否则以四舍五入值为中心的 ±1 区间:
    ///   target 低于取整值 → {round-1, round}, 不低于 → {round, round+1}
    /// 半职(share=1): 小数部分低于 0.3 → 区间塌缩为 {floor, floor};
    ///   否则 → {floor, ceil}
    ///
    /// 该不对称规则有意给全职更宽容差,并在半职目标未显著高出
    /// 下界时拒绝其"向上取整"余量
    pub fn round_ideal(target: f64, share: u32, params: &EngineParams) -> FairnessBand {
        debug_assert!(target >= 0.0);
        let floor = target.floor();
        let fract = target - floor;

        let (min, max) = if share >= 2 {
            if fract < params.full_share_round_point {
                (floor, floor + 1.0)
            } else {
                let rounded = target.round();
                if target < rounded {
                    (rounded - 1.0, rounded)
                } else {
                    (rounded, rounded + 1.0)
                }
            }
        } else if fract < params.half_share_round_point {
            (floor, floor)
        } else {
            (floor, target.ceil())
        };

        FairnessBand {
            min: min.max(0.0) as u32,
            max: max.max(0.0) as u32,
            target,
        }
    }
}

// ==========================================
// 医院值班排班系统 - 分配器主干
// ==========================================
// 职责: 阶段编排、跨阶段共用判定、不变式防御收集
// 红线: 任何阶段不得硬失败; 放不下的班次进入缺口报告,后续阶段照常执行
// 红线: 随机源为注入的种子化 StdRng,禁止隐式全局随机状态
// ==========================================

use crate::config::calendar::HolidayOracle;
use crate::config::catalog::SlotCatalog;
use crate::config::params::EngineParams;
use crate::domain::quota::{FairnessBand, QuotaConfig};
use crate::domain::schedule::{Schedule, ScheduleViolation, SlotRef};
use crate::domain::slot::PreAssignment;
use crate::domain::staff::StaffMember;
use crate::domain::types::{SlotKind, StaffClass};
use crate::engine::quota::{QuotaEngine, QuotaOutcome};
use crate::engine::constraint::ConstraintEngine;
use crate::engine::report::{DeficitReport, PhaseReport};
use crate::error::RosterResult;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, instrument};

// ==========================================
// SlotAllocator - 班次分配器
// ==========================================
pub struct SlotAllocator<'a> {
    pub(crate) staff: &'a [StaffMember],
    pub(crate) catalog: &'a SlotCatalog,
    pub(crate) quota_cfg: &'a QuotaConfig,
    pub(crate) outcome: &'a QuotaOutcome,
    pub(crate) params: EngineParams,
    pub(crate) constraint: ConstraintEngine,
    pub(crate) rng: StdRng,

    /// 运行期间检出并拒绝的不变式违规(收尾并入缺口报告)
    pub(crate) rejected: Vec<ScheduleViolation>,
}

impl<'a> SlotAllocator<'a> {
    pub fn new(
        staff: &'a [StaffMember],
        catalog: &'a SlotCatalog,
        quota_cfg: &'a QuotaConfig,
        outcome: &'a QuotaOutcome,
        params: EngineParams,
    ) -> Self {
        let rng = StdRng::seed_from_u64(params.rng_seed);
        let constraint = ConstraintEngine::new(params.clone());
        Self {
            staff,
            catalog,
            quota_cfg,
            outcome,
            params,
            constraint,
            rng,
            rejected: Vec::new(),
        }
    }

    /// 执行阶段 1-6,返回尽力完成的班表与缺口报告
    #[instrument(skip_all, fields(start = %start, end = %end))]
    pub fn build<O: HolidayOracle + ?Sized>(
        &mut self,
        oracle: &O,
        pre_assignments: &[PreAssignment],
        start: NaiveDate,
        end: NaiveDate,
    ) -> RosterResult<(Schedule, DeficitReport)> {
        let mut report = DeficitReport::default();

        // 阶段 1: 实体化
        let (mut schedule, init_report) =
            self.materialize(oracle, pre_assignments, start, end)?;
        report.phases.push(init_report);

        // 阶段 2: 固定预分配
        let pre_report = self.apply_pre_assignments(&mut schedule, pre_assignments, &mut report);
        report.phases.push(pre_report);

        // 阶段 3-6
        report.phases.push(self.distribute_long_nights(&mut schedule));
        report.phases.push(self.distribute_short_nights(&mut schedule));
        report.phases.push(self.distribute_combinations(&mut schedule));
        report.phases.push(self.distribute_remaining(&mut schedule));

        report.rejected_mutations.append(&mut self.rejected);

        info!(
            unassigned = schedule.unassigned_count(),
            total_deficit = report.total_deficit(),
            soft_violations = report.total_soft_violations(),
            "分配完成"
        );
        Ok((schedule, report))
    }

    // ==========================================
    // 跨阶段共用判定
    // ==========================================

    pub(crate) fn doctors(&self) -> Vec<&'a StaffMember> {
        self.staff
            .iter()
            .filter(|m| m.class == StaffClass::Doctor)
            .collect()
    }

    pub(crate) fn cats(&self) -> Vec<&'a StaffMember> {
        self.staff
            .iter()
            .filter(|m| m.class == StaffClass::Cat)
            .collect()
    }

    pub(crate) fn total_shares(&self) -> u32 {
        self.doctors().iter().map(|m| m.share).sum()
    }

    /// 某种类班次的医生余量总和
    pub(crate) fn kind_residual(&self, kind: SlotKind) -> u32 {
        self.kind_abbrevs(kind)
            .iter()
            .map(|a| self.outcome.residual_of(a))
            .sum()
    }

    pub(crate) fn kind_abbrevs(&self, kind: SlotKind) -> Vec<String> {
        match kind {
            SlotKind::LongNight => self.catalog.long_night_abbrevs(),
            SlotKind::ShortNight => self.catalog.short_night_abbrevs(),
            SlotKind::Regular => self
                .catalog
                .abbrevs()
                .into_iter()
                .filter(|a| {
                    self.catalog.def(a).map(|d| d.kind) == Some(SlotKind::Regular)
                })
                .collect(),
        }
    }

    /// 医生在某种类班次上的聚合公平区间
    pub(crate) fn kind_band(&self, member: &StaffMember, kind: SlotKind) -> FairnessBand {
        let total_shares = self.total_shares();
        if total_shares == 0 {
            return FairnessBand::zero();
        }
        let total = self.kind_residual(kind);
        QuotaEngine::round_ideal(
            total as f64 * member.share as f64 / total_shares as f64,
            member.share,
            &self.params,
        )
    }

    /// 某人在某种类班次上的当前持有数
    pub(crate) fn kind_count(&self, schedule: &Schedule, person: &str, kind: SlotKind) -> u32 {
        self.kind_abbrevs(kind)
            .iter()
            .map(|a| schedule.count_of(person, a))
            .sum()
    }

    /// 某人在某统计组上的当前持有数
    pub(crate) fn group_count(&self, schedule: &Schedule, person: &str, group: &str) -> u32 {
        self.catalog
            .types_in_group(group)
            .iter()
            .map(|a| schedule.count_of(person, a))
            .sum()
    }

    /// CAT 人员在某班型上的剩余人头额度
    pub(crate) fn cat_room(&self, schedule: &Schedule, cat: &str, abbrev: &str) -> u32 {
        let per_head = self
            .quota_cfg
            .cat_per_head
            .get(abbrev)
            .copied()
            .unwrap_or(0);
        per_head.saturating_sub(schedule.count_of(cat, abbrev))
    }

    /// 医生是否已达某班型的公平上限
    pub(crate) fn at_type_max(&self, schedule: &Schedule, person: &StaffMember, abbrev: &str) -> bool {
        if person.class != StaffClass::Doctor {
            return false;
        }
        let band = self.outcome.bands.for_type(&person.name, abbrev);
        schedule.count_of(&person.name, abbrev) >= band.max
    }

    /// 医生是否已达某班型所属统计组的公平上限
    pub(crate) fn at_group_max(&self, schedule: &Schedule, person: &StaffMember, abbrev: &str) -> bool {
        if person.class != StaffClass::Doctor {
            return false;
        }
        let Some(group) = self.catalog.group_of(abbrev) else {
            return false;
        };
        let band = self.outcome.bands.for_group(&person.name, group);
        self.group_count(schedule, &person.name, group) >= band.max
    }

    /// 人员类别是否可承接该班型,且未越过类别相应的数量护栏
    pub(crate) fn class_eligible(&self, schedule: &Schedule, member: &StaffMember, abbrev: &str) -> bool {
        let Some(def) = self.catalog.def(abbrev) else {
            return false;
        };
        if !def.eligibility.accepts(member.class) {
            return false;
        }
        match member.class {
            StaffClass::Doctor => !self.at_type_max(schedule, member, abbrev),
            StaffClass::Cat => self.cat_room(schedule, &member.name, abbrev) > 0,
        }
    }

    /// 约束合法性检查 + 落位; 违规拒绝并收集
    pub(crate) fn try_assign(
        &mut self,
        schedule: &mut Schedule,
        r: SlotRef,
        member: &StaffMember,
        relax_secondary: bool,
    ) -> bool {
        if !self
            .constraint
            .is_legal(member, r, schedule, self.catalog, relax_secondary)
        {
            return false;
        }
        match schedule.assign(r, &member.name) {
            Ok(()) => true,
            Err(violation) => {
                self.rejected.push(violation);
                false
            }
        }
    }

    /// 某种类班次的全部未分配句柄(日期升序)
    pub(crate) fn unassigned_of_kind(&self, schedule: &Schedule, kind: SlotKind) -> Vec<SlotRef> {
        let abbrevs = self.kind_abbrevs(kind);
        schedule
            .unassigned_slots()
            .into_iter()
            .filter(|r| abbrevs.contains(&schedule.slot(*r).abbrev))
            .collect()
    }

    // ==========================================
    // CAT 人头额度前置分配(阶段 3/4 共用)
    // ==========================================
    // CAT 的固定人头份额先于医生分配,彼此独立
    pub(crate) fn fill_cat_per_head(
        &mut self,
        schedule: &mut Schedule,
        kind: SlotKind,
        report: &mut PhaseReport,
    ) {
        let cats = self.cats();
        for abbrev in self.kind_abbrevs(kind) {
            let Some(def) = self.catalog.def(&abbrev) else {
                continue;
            };
            if !def.eligibility.accepts(StaffClass::Cat) {
                continue;
            }
            for cat in &cats {
                while self.cat_room(schedule, &cat.name, &abbrev) > 0 {
                    let candidate = self
                        .unassigned_of_kind(schedule, kind)
                        .into_iter()
                        .find(|r| {
                            schedule.slot(*r).abbrev == abbrev
                                && self.constraint.is_legal(
                                    cat,
                                    *r,
                                    schedule,
                                    self.catalog,
                                    false,
                                )
                        });
                    let Some(r) = candidate else {
                        break;
                    };
                    if !self.try_assign(schedule, r, cat, false) {
                        break;
                    }
                    report.placed += 1;
                }
            }
        }
    }
}

// ==========================================
// 医院值班排班系统 - 阶段6: 剩余班次分配
// ==========================================
// 职责: 四道递进扫描 —— 下限补足(紧缺日期优先) → 均衡 → 放宽软性心愿 → 强制再平衡
// 红线: "填上胜过空着" —— 再平衡换位失败时保留强制分配,缺口如实上报
// ==========================================

use crate::domain::schedule::{Schedule, SlotRef};
use crate::domain::staff::StaffMember;
use crate::domain::types::{AllocPhase, DesiderataPriority, StaffClass};
use crate::engine::report::PhaseReport;
use chrono::NaiveDate;
use tracing::debug;

use super::core::SlotAllocator;

impl<'a> SlotAllocator<'a> {
    pub(crate) fn distribute_remaining(&mut self, schedule: &mut Schedule) -> PhaseReport {
        let mut report = PhaseReport::new(AllocPhase::Remaining);

        self.minimum_pass(schedule, &mut report);
        self.balanced_pass(schedule, false, &mut report);
        self.balanced_pass(schedule, true, &mut report);
        self.rebalancing_pass(schedule, &mut report);

        for r in schedule.unassigned_slots() {
            let slot = schedule.slot(r);
            report.record_unmet(&slot.abbrev, Some(slot.date), 1, "NO_LEGAL_ASSIGNEE");
        }
        debug!(
            placed = report.placed,
            deficit = report.total_deficit(),
            "剩余班次分配结束"
        );
        report
    }

    // ==========================================
    // 扫描 (a): 下限补足,紧缺日期优先
    // ==========================================
    // 紧缺度 = 该班次的合法候选人数; 候选最少的班次最先服务
    fn minimum_pass(&mut self, schedule: &mut Schedule, report: &mut PhaseReport) {
        let mut slots: Vec<(usize, SlotRef)> = schedule
            .unassigned_slots()
            .into_iter()
            .map(|r| (self.eligible_names(schedule, r, false).len(), r))
            .collect();
        slots.sort_by_key(|(n, _)| *n);

        for (_, r) in slots {
            if schedule.slot(r).is_assigned() {
                continue;
            }
            let abbrev = schedule.slot(r).abbrev.clone();
            // 仅服务尚未达到下限的成员,取距下限最远者
            let candidate = self
                .eligible_names(schedule, r, false)
                .into_iter()
                .filter_map(|name| {
                    let member = self.staff.iter().find(|m| m.name == name)?;
                    let gap = self.below_minimum_gap(schedule, member, &abbrev)?;
                    Some((gap, member.clone()))
                })
                .max_by_key(|(gap, _)| *gap);

            if let Some((_, member)) = candidate {
                if self.try_assign(schedule, r, &member, false) {
                    report.placed += 1;
                }
            }
        }
    }

    // ==========================================
    // 扫描 (b)/(c): 均衡分配(c 放宽软性心愿)
    // ==========================================
    // 每个空位交给当前负载最低(按份额折算)的合法候选人
    fn balanced_pass(
        &mut self,
        schedule: &mut Schedule,
        relax_secondary: bool,
        report: &mut PhaseReport,
    ) {
        for r in schedule.unassigned_slots() {
            if schedule.slot(r).is_assigned() {
                continue;
            }
            let candidate = self
                .eligible_names(schedule, r, relax_secondary)
                .into_iter()
                .filter_map(|name| {
                    let member = self.staff.iter().find(|m| m.name == name)?;
                    Some((self.load_ratio(schedule, member), member.clone()))
                })
                .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            if let Some((_, member)) = candidate {
                let date = schedule.slot(r).date;
                let abbrev = schedule.slot(r).abbrev.clone();
                if self.try_assign(schedule, r, &member, relax_secondary) {
                    report.placed += 1;
                    if relax_secondary {
                        self.record_if_soft_violation(&member, date, &abbrev, report);
                    }
                }
            }
        }
    }

    // ==========================================
    // 扫描 (d): 强制再平衡
    // ==========================================
    // 允许越过统计组上限强制落位,随后尝试把该人同组的既有班次
    // 换给他人以恢复平衡; 换不动则保留强制分配并上报
    fn rebalancing_pass(&mut self, schedule: &mut Schedule, report: &mut PhaseReport) {
        for r in schedule.unassigned_slots() {
            if schedule.slot(r).is_assigned() {
                continue;
            }
            let candidate = self
                .forced_candidates(schedule, r)
                .into_iter()
                .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let Some((_, member)) = candidate else {
                continue;
            };
            let date = schedule.slot(r).date;
            let abbrev = schedule.slot(r).abbrev.clone();
            if !self.try_assign(schedule, r, &member, true) {
                continue;
            }
            report.placed += 1;
            self.record_if_soft_violation(&member, date, &abbrev, report);

            if member.class == StaffClass::Doctor && self.at_group_max_exceeded(schedule, &member, &abbrev)
            {
                if !self.swap_back(schedule, &member, &abbrev, r, report) {
                    report.soft_violations.push((
                        member.name.clone(),
                        date,
                        format!("GROUP_MAX_KEPT:{}", abbrev),
                    ));
                }
            }
        }
    }

    /// 换位恢复: 把该人同组的一个非固定班次转给另一名仍有余量的成员
    fn swap_back(
        &mut self,
        schedule: &mut Schedule,
        member: &StaffMember,
        abbrev: &str,
        forced: SlotRef,
        report: &mut PhaseReport,
    ) -> bool {
        let Some(group) = self.catalog.group_of(abbrev).map(str::to_string) else {
            return false;
        };
        let group_abbrevs = self.catalog.types_in_group(&group);

        let held: Vec<SlotRef> = schedule
            .days
            .iter()
            .enumerate()
            .flat_map(|(day_idx, day)| {
                day.slots
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| {
                        s.assigned_to(&member.name)
                            && !s.fixed
                            && group_abbrevs.contains(&s.abbrev)
                    })
                    .map(move |(slot_idx, _)| SlotRef { day_idx, slot_idx })
            })
            .filter(|r| *r != forced)
            .collect();

        let others: Vec<StaffMember> = self
            .staff
            .iter()
            .filter(|m| m.name != member.name)
            .cloned()
            .collect();

        for s in held {
            let s_abbrev = schedule.slot(s).abbrev.clone();
            if schedule.unassign(s).is_err() {
                continue;
            }
            for other in &others {
                if !self.class_eligible(schedule, other, &s_abbrev)
                    || self.at_group_max(schedule, other, &s_abbrev)
                {
                    continue;
                }
                if self.try_assign(schedule, s, other, false) {
                    report.placed += 1;
                    return true;
                }
            }
            // 换不出去,原样还回
            if let Err(violation) = schedule.assign(s, &member.name) {
                self.rejected.push(violation);
            }
        }
        false
    }

    // ==========================================
    // 候选与负载判定
    // ==========================================

    /// 常规候选: 类别合格 + 未越组上限 + 约束合法
    fn eligible_names(&self, schedule: &Schedule, r: SlotRef, relax_secondary: bool) -> Vec<String> {
        let abbrev = &schedule.slot(r).abbrev;
        self.staff
            .iter()
            .filter(|m| self.class_eligible(schedule, m, abbrev))
            .filter(|m| !self.at_group_max(schedule, m, abbrev))
            .filter(|m| {
                self.constraint
                    .is_legal(m, r, schedule, self.catalog, relax_secondary)
            })
            .map(|m| m.name.clone())
            .collect()
    }

    /// 强制候选: 放开组上限护栏,保留班型上限与硬约束
    fn forced_candidates(&self, schedule: &Schedule, r: SlotRef) -> Vec<(f64, StaffMember)> {
        let abbrev = &schedule.slot(r).abbrev;
        self.staff
            .iter()
            .filter(|m| self.class_eligible(schedule, m, abbrev))
            .filter(|m| {
                self.constraint
                    .is_legal(m, r, schedule, self.catalog, true)
            })
            .map(|m| (self.load_ratio(schedule, m), m.clone()))
            .collect()
    }

    /// 份额折算负载(低者优先承接)
    fn load_ratio(&self, schedule: &Schedule, member: &StaffMember) -> f64 {
        let load = schedule.total_of(&member.name) as f64;
        load / member.share.max(1) as f64
    }

    /// 距下限的缺口: 已达下限返回 None
    ///
    /// 医生按统计组下限(无组则按班型下限); CAT 按人头余量
    fn below_minimum_gap(
        &self,
        schedule: &Schedule,
        member: &StaffMember,
        abbrev: &str,
    ) -> Option<u32> {
        match member.class {
            StaffClass::Cat => {
                let room = self.cat_room(schedule, &member.name, abbrev);
                (room > 0).then_some(room)
            }
            StaffClass::Doctor => {
                let (min, held) = match self.catalog.group_of(abbrev) {
                    Some(group) => (
                        self.outcome.bands.for_group(&member.name, group).min,
                        self.group_count(schedule, &member.name, group),
                    ),
                    None => (
                        self.outcome.bands.for_type(&member.name, abbrev).min,
                        schedule.count_of(&member.name, abbrev),
                    ),
                };
                (held < min).then(|| min - held)
            }
        }
    }

    fn at_group_max_exceeded(&self, schedule: &Schedule, member: &StaffMember, abbrev: &str) -> bool {
        let Some(group) = self.catalog.group_of(abbrev) else {
            return false;
        };
        let band = self.outcome.bands.for_group(&member.name, group);
        self.group_count(schedule, &member.name, group) > band.max
    }

    fn record_if_soft_violation(
        &self,
        member: &StaffMember,
        date: NaiveDate,
        abbrev: &str,
        report: &mut PhaseReport,
    ) {
        let Some(def) = self.catalog.def(abbrev) else {
            return;
        };
        if member.has_desiderata(date, def.period, DesiderataPriority::Secondary) {
            report
                .soft_violations
                .push((member.name.clone(), date, abbrev.to_string()));
        }
    }
}

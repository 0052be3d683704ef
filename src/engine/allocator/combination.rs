// ==========================================
// 医院值班排班系统 - 阶段5: 组合班分配
// ==========================================
// 职责: 按优先级顺序成对放置组合班(同日同人两腿)
// 红线: 两腿各自通过约束引擎且不越统计组上限,否则整对放弃 —— 不留单腿
// 顺序: CAT 优先,医生按加权评分(区间贴近度/新颖度/心愿密度/份额/扰动)
// ==========================================

use crate::domain::schedule::Schedule;
use crate::domain::staff::StaffMember;
use crate::domain::types::{AllocPhase, StaffClass};
use crate::engine::report::PhaseReport;
use chrono::NaiveDate;
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

use super::core::SlotAllocator;

impl<'a> SlotAllocator<'a> {
    pub(crate) fn distribute_combinations(&mut self, schedule: &mut Schedule) -> PhaseReport {
        let mut report = PhaseReport::new(AllocPhase::Combination);

        let pairs = self.catalog.combination_priority.clone();
        for (a, b) in pairs {
            if !self.catalog.combinable(&a, &b) {
                continue;
            }
            let dates: Vec<NaiveDate> = schedule.days.iter().map(|d| d.date).collect();
            for date in dates {
                // 同日两腿都有空位才继续配对
                while schedule.find_unassigned(date, &a).is_some()
                    && schedule.find_unassigned(date, &b).is_some()
                {
                    if !self.place_pair(schedule, date, &a, &b, &mut report) {
                        break;
                    }
                }
            }
        }
        debug!(placed = report.placed, "组合班分配结束");
        report
    }

    /// 为 (日期, 组合对) 挑选一名成员并落位两腿; 全员失败返回 false
    fn place_pair(
        &mut self,
        schedule: &mut Schedule,
        date: NaiveDate,
        a: &str,
        b: &str,
        report: &mut PhaseReport,
    ) -> bool {
        let candidates = self.rank_pair_candidates(schedule, a, b);
        for name in candidates {
            let Some(member) = self.staff.iter().find(|m| m.name == name) else {
                continue;
            };
            let member = member.clone();
            let Some(ra) = schedule.find_unassigned(date, a) else {
                return false;
            };
            if !self.try_assign(schedule, ra, &member, false) {
                continue;
            }
            // 第一腿就位后检查第二腿; 失败则整对回退
            let Some(rb) = schedule.find_unassigned(date, b) else {
                let _ = schedule.unassign(ra);
                return false;
            };
            if self.try_assign(schedule, rb, &member, false) {
                report.placed += 2;
                return true;
            }
            let _ = schedule.unassign(ra);
        }
        false
    }

    /// 候选人排序: CAT 整体先于医生; 各层内按加权评分降序
    fn rank_pair_candidates(&mut self, schedule: &Schedule, a: &str, b: &str) -> Vec<String> {
        let mut cats: Vec<(f64, String)> = Vec::new();
        let mut doctors: Vec<(f64, String)> = Vec::new();

        let staff: Vec<StaffMember> = self.staff.to_vec();
        for member in &staff {
            if !self.class_eligible(schedule, member, a)
                || !self.class_eligible(schedule, member, b)
            {
                continue;
            }
            if member.class == StaffClass::Doctor
                && !self.pair_within_group_max(schedule, member, a, b)
            {
                continue;
            }
            let score = self.pair_score(schedule, member, a, b);
            match member.class {
                StaffClass::Cat => cats.push((score, member.name.clone())),
                StaffClass::Doctor => doctors.push((score, member.name.clone())),
            }
        }

        let desc = |x: &(f64, String), y: &(f64, String)| {
            y.0.partial_cmp(&x.0).unwrap_or(std::cmp::Ordering::Equal)
        };
        cats.sort_by(desc);
        doctors.sort_by(desc);
        cats.into_iter()
            .chain(doctors)
            .map(|(_, name)| name)
            .collect()
    }

    /// 加权评分: 组区间贴近度 ×10 + 组合新颖度 +5 + 心愿密度 ×2 + 份额 + 随机扰动
    ///
    /// 心愿密集的成员可用日少,组合班机会先给他们
    fn pair_score(&mut self, schedule: &Schedule, member: &StaffMember, a: &str, b: &str) -> f64 {
        let mut score = 0.0;
        if let Some(group) = self.catalog.group_of(a) {
            let band = self.outcome.bands.for_group(&member.name, group);
            let held = self.group_count(schedule, &member.name, group) as f64;
            score += (band.target - held) * 10.0;
        }
        if self.pair_days_held(schedule, &member.name, a, b) == 0 {
            score += 5.0;
        }
        score += member.desiderata_count() as f64 * 2.0;
        score += member.share as f64;
        score += self.rng.gen_range(0.0..1.0);
        score
    }

    /// 某人已持有该组合(同日两腿)的天数
    fn pair_days_held(&self, schedule: &Schedule, person: &str, a: &str, b: &str) -> u32 {
        schedule
            .days
            .iter()
            .filter(|day| {
                day.slots_of(person).any(|s| s.abbrev == a)
                    && day.slots_of(person).any(|s| s.abbrev == b)
            })
            .count() as u32
    }

    /// 两腿落位后不得将任一腿所属统计组推过其比例上限
    fn pair_within_group_max(
        &self,
        schedule: &Schedule,
        doctor: &StaffMember,
        a: &str,
        b: &str,
    ) -> bool {
        let mut increments: HashMap<String, u32> = HashMap::new();
        for abbrev in [a, b] {
            if let Some(group) = self.catalog.group_of(abbrev) {
                *increments.entry(group.to_string()).or_insert(0) += 1;
            }
        }
        increments.into_iter().all(|(group, add)| {
            let band = self.outcome.bands.for_group(&doctor.name, &group);
            self.group_count(schedule, &doctor.name, &group) + add <= band.max
        })
    }
}

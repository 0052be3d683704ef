// ==========================================
// 医院值班排班系统 - 优化器评分
// ==========================================
// 职责: 班表违规评分(越高越好)与统计组抽签权重
// 评分 = 空位 × -100 + 软性心愿违反 × -10 + 重点成员入区 × +5
// 重点成员 = 心愿单条目最多的三人
// ==========================================

use crate::config::catalog::SlotCatalog;
use crate::domain::quota::BandTable;
use crate::domain::schedule::Schedule;
use crate::domain::staff::StaffMember;
use crate::domain::types::{DesiderataPriority, StaffClass};
use chrono::NaiveDate;

/// 全班表违规评分(越高越好)
pub fn violation_score(
    schedule: &Schedule,
    staff: &[StaffMember],
    bands: &BandTable,
    catalog: &SlotCatalog,
) -> i64 {
    let unfilled = schedule.unassigned_count() as i64;
    let secondary = secondary_violations(schedule, staff, catalog).len() as i64;
    let bonus = priority_in_band(schedule, staff, bands, catalog) as i64;
    unfilled * -100 + secondary * -10 + bonus * 5
}

/// 全部软性心愿违反: (人员, 日期, 班型)
pub fn secondary_violations(
    schedule: &Schedule,
    staff: &[StaffMember],
    catalog: &SlotCatalog,
) -> Vec<(String, NaiveDate, String)> {
    let mut out = Vec::new();
    for day in &schedule.days {
        for slot in &day.slots {
            let Some(holder) = &slot.assignee else {
                continue;
            };
            let Some(member) = staff.iter().find(|m| &m.name == holder) else {
                continue;
            };
            let Some(def) = catalog.def(&slot.abbrev) else {
                continue;
            };
            if member.has_desiderata(slot.date, def.period, DesiderataPriority::Secondary) {
                out.push((holder.clone(), slot.date, slot.abbrev.clone()));
            }
        }
    }
    out
}

/// 心愿单条目最多的三名成员
pub fn priority_members(staff: &[StaffMember]) -> Vec<&StaffMember> {
    let mut sorted: Vec<&StaffMember> = staff.iter().collect();
    sorted.sort_by(|a, b| b.desiderata_count().cmp(&a.desiderata_count()));
    sorted.into_iter().take(3).collect()
}

/// 重点成员在各统计组内处于公平区间的计数
pub fn priority_in_band(
    schedule: &Schedule,
    staff: &[StaffMember],
    bands: &BandTable,
    catalog: &SlotCatalog,
) -> u32 {
    let mut count = 0;
    for member in priority_members(staff) {
        if member.class != StaffClass::Doctor {
            continue;
        }
        for group in catalog.groups() {
            let held = group_count(schedule, catalog, &member.name, &group);
            if bands.for_group(&member.name, &group).contains(held) {
                count += 1;
            }
        }
    }
    count
}

/// 统计组抽签权重: 组内空位 × 2 + 组内软违反 × 0.5 + 出区成员数
pub fn group_weight(
    schedule: &Schedule,
    staff: &[StaffMember],
    bands: &BandTable,
    catalog: &SlotCatalog,
    group: &str,
) -> f64 {
    let abbrevs = catalog.types_in_group(group);

    let unfilled = schedule
        .days
        .iter()
        .flat_map(|d| d.slots.iter())
        .filter(|s| !s.is_assigned() && abbrevs.contains(&s.abbrev))
        .count() as f64;

    let secondary = secondary_violations(schedule, staff, catalog)
        .into_iter()
        .filter(|(_, _, abbrev)| abbrevs.contains(abbrev))
        .count() as f64;

    let out_of_band = staff
        .iter()
        .filter(|m| m.class == StaffClass::Doctor)
        .filter(|m| {
            let held = group_count(schedule, catalog, &m.name, group);
            !bands.for_group(&m.name, group).contains(held)
        })
        .count() as f64;

    unfilled * 2.0 + secondary * 0.5 + out_of_band
}

/// 某人在某统计组的持有计数
pub fn group_count(schedule: &Schedule, catalog: &SlotCatalog, person: &str, group: &str) -> u32 {
    catalog
        .types_in_group(group)
        .iter()
        .map(|a| schedule.count_of(person, a))
        .sum()
}

// ==========================================
// 医院值班排班系统 - 约束引擎
// ==========================================
// 职责: 判定"某人某日承接某班次"是否合法的纯规则集
// 红线: 无状态、无副作用; 所有规则必须输出 reason
// 红线: 固定班次(预分配)短路为合法 —— 预分配是系统必须绕行的既定事实
// ==========================================

use crate::config::catalog::SlotCatalog;
use crate::config::params::EngineParams;
use crate::domain::schedule::{Schedule, SlotRef};
use crate::domain::slot::SlotTypeDef;
use crate::domain::staff::StaffMember;
use crate::domain::types::{DayPeriod, DesiderataPriority, SlotKind};
use chrono::{Duration, NaiveDate};

// ==========================================
// ConstraintEngine - 约束引擎
// ==========================================
pub struct ConstraintEngine {
    params: EngineParams,
}

impl ConstraintEngine {
    pub fn new(params: EngineParams) -> Self {
        Self { params }
    }

    /// 合法性判定(全部规则通过才合法)
    pub fn is_legal(
        &self,
        person: &StaffMember,
        r: SlotRef,
        schedule: &Schedule,
        catalog: &SlotCatalog,
        relax_secondary: bool,
    ) -> bool {
        self.check(person, r, schedule, catalog, relax_secondary)
            .is_empty()
    }

    /// 逐规则检查,返回全部违反原因(空 = 合法)
    ///
    /// 规则清单:
    /// 1. 固定班次短路为合法
    /// 2. 长夜班隔离规则
    /// 3. 中/短夜班排他规则
    /// 4. 绝对时间重叠(含跨午夜与时间窗覆写)
    /// 5. 单日班次上限
    /// 6. 心愿单(PRIMARY 恒拒; SECONDARY 可放宽)
    /// 7. 夜班次日早班邻接(含"9点组合"例外,双向)
    /// 8. 连续夜班上限
    /// 9. 连续工作日上限
    pub fn check(
        &self,
        person: &StaffMember,
        r: SlotRef,
        schedule: &Schedule,
        catalog: &SlotCatalog,
        relax_secondary: bool,
    ) -> Vec<String> {
        let slot = schedule.slot(r);

        // 规则 1: 固定班次短路
        if slot.fixed {
            return Vec::new();
        }

        let Some(def) = catalog.effective_def(&slot.abbrev) else {
            return vec![format!("UNKNOWN_SLOT_TYPE: abbrev={}", slot.abbrev)];
        };
        let date = slot.date;
        let mut reasons = Vec::new();

        self.check_long_night_isolation(person, date, &def, schedule, catalog, &mut reasons);
        self.check_short_night_exclusivity(person, date, &def, schedule, catalog, &mut reasons);

        // 规则 4: 时间重叠
        if let Some(conflict) = schedule.find_overlap(r, &person.name) {
            reasons.push(format!(
                "TIME_OVERLAP: abbrev={} conflicts_with={}",
                def.abbrev, conflict
            ));
        }

        // 规则 5: 单日上限
        let held_today = schedule
            .day(date)
            .map(|d| d.slots_of(&person.name).count() as u32)
            .unwrap_or(0);
        if held_today >= self.params.max_slots_per_day {
            reasons.push(format!(
                "MAX_PER_DAY: held={} limit={}",
                held_today, self.params.max_slots_per_day
            ));
        }

        // 规则 6: 心愿单
        if person.has_desiderata(date, def.period, DesiderataPriority::Primary) {
            reasons.push(format!(
                "PRIMARY_DESIDERATA: date={} period={}",
                date, def.period
            ));
        }
        if !relax_secondary
            && person.has_desiderata(date, def.period, DesiderataPriority::Secondary)
        {
            reasons.push(format!(
                "SECONDARY_DESIDERATA: date={} period={}",
                date, def.period
            ));
        }

        self.check_morning_night_adjacency(person, date, &def, schedule, catalog, &mut reasons);

        // 规则 8: 连续夜班上限
        let night_streak = self.night_streak_before(person, date, schedule, catalog);
        if night_streak >= self.params.night_streak_limit {
            reasons.push(format!(
                "NIGHT_STREAK: preceding_nights={} limit={}",
                night_streak, self.params.night_streak_limit
            ));
        }

        // 规则 9: 连续工作日上限
        let work_streak = self.work_streak_before(person, date, schedule);
        if work_streak >= self.params.work_streak_limit {
            reasons.push(format!(
                "WORK_STREAK: preceding_days={} limit={}",
                work_streak, self.params.work_streak_limit
            ));
        }

        reasons
    }

    /// 预分配专用的收窄检查: 仅时间重叠
    ///
    /// 预分配被视为既定事实,其余规则不适用
    pub fn can_pre_assign(&self, person: &str, r: SlotRef, schedule: &Schedule) -> bool {
        schedule.find_overlap(r, person).is_none()
    }

    // ==========================================
    // 规则 2: 长夜班隔离
    // ==========================================
    // 长夜班当日独占; 前一日不得有长夜班; 次日不得有任何班
    // 反向: 前一日持长夜班者,当日不得承接任何班
    fn check_long_night_isolation(
        &self,
        person: &StaffMember,
        date: NaiveDate,
        def: &SlotTypeDef,
        schedule: &Schedule,
        catalog: &SlotCatalog,
        reasons: &mut Vec<String>,
    ) {
        let prev = date - Duration::days(1);
        let next = date + Duration::days(1);

        if def.kind == SlotKind::LongNight {
            if schedule.works_on(&person.name, date) {
                reasons.push("LONG_NIGHT_NOT_ALONE: other slot same day".to_string());
            }
            if self.holds_kind_on(person, prev, SlotKind::LongNight, schedule, catalog) {
                reasons.push("LONG_NIGHT_CONSECUTIVE: long night day before".to_string());
            }
            if schedule.works_on(&person.name, next) {
                reasons.push("LONG_NIGHT_NEXT_DAY_BUSY: slot on following day".to_string());
            }
        } else if self.holds_kind_on(person, prev, SlotKind::LongNight, schedule, catalog) {
            // 任意班次: 前一日为长夜班 → 当日全休
            reasons.push("DAY_AFTER_LONG_NIGHT: rest day required".to_string());
        } else if self.holds_kind_on(person, date, SlotKind::LongNight, schedule, catalog) {
            // 当日已持长夜班 → 不得再接任何班
            reasons.push("LONG_NIGHT_HELD_TODAY: isolation".to_string());
        }
    }

    // ==========================================
    // 规则 3: 中/短夜班排他
    // ==========================================
    // 持中/短夜班者当日不得有其他班,反之亦然
    fn check_short_night_exclusivity(
        &self,
        person: &StaffMember,
        date: NaiveDate,
        def: &SlotTypeDef,
        schedule: &Schedule,
        catalog: &SlotCatalog,
        reasons: &mut Vec<String>,
    ) {
        if def.kind == SlotKind::ShortNight {
            if schedule.works_on(&person.name, date) {
                reasons.push("SHORT_NIGHT_NOT_ALONE: other slot same day".to_string());
            }
        } else if self.holds_kind_on(person, date, SlotKind::ShortNight, schedule, catalog) {
            reasons.push("SHORT_NIGHT_HELD_TODAY: exclusivity".to_string());
        }
    }

    // ==========================================
    // 规则 7: 夜班/早班邻接(双向)
    // ==========================================
    // 前一日深夜/夜班 → 当日早班拒绝,除非早班属"9点开工"清单
    // 且与该人当日已持班次构成认可组合
    // 反向: 次日已排早班 → 当日深夜/夜班拒绝,同一例外
    fn check_morning_night_adjacency(
        &self,
        person: &StaffMember,
        date: NaiveDate,
        def: &SlotTypeDef,
        schedule: &Schedule,
        catalog: &SlotCatalog,
        reasons: &mut Vec<String>,
    ) {
        let prev = date - Duration::days(1);
        let next = date + Duration::days(1);

        if def.period == DayPeriod::Morning
            && self.holds_night_class_on(person, prev, schedule, catalog)
            && !self.nine_oclock_exception(person, date, &def.abbrev, schedule, catalog)
        {
            reasons.push("MORNING_AFTER_NIGHT: night slot previous day".to_string());
        }

        if is_night_class(def) {
            // 找出次日已持的早班,检查是否全部满足例外
            if let Some(day) = schedule.day(next) {
                for held in day.slots_of(&person.name) {
                    let Some(held_def) = catalog.def(&held.abbrev) else {
                        continue;
                    };
                    if held_def.period == DayPeriod::Morning
                        && !self.nine_oclock_exception(
                            person,
                            next,
                            &held.abbrev,
                            schedule,
                            catalog,
                        )
                    {
                        reasons.push(format!(
                            "NIGHT_BEFORE_MORNING: morning slot {} next day",
                            held.abbrev
                        ));
                        break;
                    }
                }
            }
        }
    }

    /// "9点组合"例外: 早班属9点开工清单,且与该人同日已持的
    /// 另一班次构成认可组合
    fn nine_oclock_exception(
        &self,
        person: &StaffMember,
        date: NaiveDate,
        morning_abbrev: &str,
        schedule: &Schedule,
        catalog: &SlotCatalog,
    ) -> bool {
        if !catalog
            .nine_oclock_types
            .iter()
            .any(|t| t == morning_abbrev)
        {
            return false;
        }
        let Some(day) = schedule.day(date) else {
            return false;
        };
        day.slots_of(&person.name)
            .any(|s| s.abbrev != morning_abbrev && catalog.is_nine_oclock_pair(morning_abbrev, &s.abbrev))
    }

    // ==========================================
    // 连续性统计
    // ==========================================

    /// date 之前连续持夜班类班次的天数(遇首个空档即止)
    fn night_streak_before(
        &self,
        person: &StaffMember,
        date: NaiveDate,
        schedule: &Schedule,
        catalog: &SlotCatalog,
    ) -> u32 {
        let mut streak = 0;
        let mut cursor = date - Duration::days(1);
        while cursor >= schedule.start_date {
            if !self.holds_night_class_on(person, cursor, schedule, catalog) {
                break;
            }
            streak += 1;
            cursor -= Duration::days(1);
        }
        streak
    }

    /// date 之前连续有班(任意班次)的天数(遇首个空档即止)
    fn work_streak_before(&self, person: &StaffMember, date: NaiveDate, schedule: &Schedule) -> u32 {
        let mut streak = 0;
        let mut cursor = date - Duration::days(1);
        while cursor >= schedule.start_date {
            if !schedule.works_on(&person.name, cursor) {
                break;
            }
            streak += 1;
            cursor -= Duration::days(1);
        }
        streak
    }

    /// 某人某日是否持有指定种类的班次
    fn holds_kind_on(
        &self,
        person: &StaffMember,
        date: NaiveDate,
        kind: SlotKind,
        schedule: &Schedule,
        catalog: &SlotCatalog,
    ) -> bool {
        let Some(day) = schedule.day(date) else {
            return false;
        };
        day.slots_of(&person.name)
            .any(|s| catalog.def(&s.abbrev).map(|d| d.kind) == Some(kind))
    }

    /// 某人某日是否持有夜班类(长夜/中短夜/晚间)班次
    fn holds_night_class_on(
        &self,
        person: &StaffMember,
        date: NaiveDate,
        schedule: &Schedule,
        catalog: &SlotCatalog,
    ) -> bool {
        let Some(day) = schedule.day(date) else {
            return false;
        };
        day.slots_of(&person.name).any(|s| {
            catalog
                .def(&s.abbrev)
                .map(|d| is_night_class(d))
                .unwrap_or(false)
        })
    }
}

/// 深夜/夜班类判定: 夜班种类或晚间日段
fn is_night_class(def: &SlotTypeDef) -> bool {
    def.kind.is_night() || def.period == DayPeriod::Evening
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::catalog::standard_catalog;
    use crate::domain::schedule::{DaySchedule, Schedule};
    use crate::domain::slot::ConcreteSlot;
    use crate::domain::staff::{Desiderata, StaffMember};
    use crate::domain::types::DayType;
    use chrono::Duration;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    /// 构建 2026-03-02(周一) 起 days 天的空班表,每日每班型一个班次
    fn build_schedule(days: u32, abbrevs: &[&str]) -> Schedule {
        let catalog = standard_catalog();
        let start = d(2);
        let mut day_schedules = Vec::new();
        for offset in 0..days {
            let date = start + Duration::days(offset as i64);
            let slots = abbrevs
                .iter()
                .filter_map(|a| catalog.def(a))
                .map(|def| ConcreteSlot::from_def(def, date))
                .collect();
            day_schedules.push(DaySchedule {
                date,
                day_type: DayType::Weekday,
                is_weekend: false,
                is_holiday_or_bridge: false,
                slots,
            });
        }
        Schedule::new(start, start + Duration::days(days as i64 - 1), day_schedules)
    }

    fn assign(schedule: &mut Schedule, date: NaiveDate, abbrev: &str, person: &str) {
        let r = schedule.find_unassigned(date, abbrev).expect("slot exists");
        schedule.assign(r, person).expect("assign ok");
    }

    fn engine() -> ConstraintEngine {
        ConstraintEngine::new(EngineParams::default())
    }

    #[test]
    fn test_scenario_01_long_night_isolates_next_day() {
        let catalog = standard_catalog();
        let mut schedule = build_schedule(7, &["LN", "AM", "PM"]);
        let dr = StaffMember::doctor("dr_a", 2);
        assign(&mut schedule, d(2), "LN", "dr_a");

        // 次日任何班型均拒绝
        for abbrev in ["LN", "AM", "PM"] {
            let r = schedule.find_unassigned(d(3), abbrev).unwrap();
            let reasons = engine().check(&dr, r, &schedule, &catalog, false);
            assert!(
                reasons.iter().any(|s| s.contains("LONG_NIGHT")
                    || s.contains("DAY_AFTER_LONG_NIGHT")),
                "abbrev {} should be rejected: {:?}",
                abbrev,
                reasons
            );
        }
        // 隔一日合法
        let r = schedule.find_unassigned(d(4), "AM").unwrap();
        assert!(engine().is_legal(&dr, r, &schedule, &catalog, false));
    }

    #[test]
    fn test_long_night_rejected_when_next_day_busy() {
        let catalog = standard_catalog();
        let mut schedule = build_schedule(7, &["LN", "AM"]);
        let dr = StaffMember::doctor("dr_a", 2);
        assign(&mut schedule, d(3), "AM", "dr_a");

        // 次日已有班 → 当日长夜班拒绝
        let r = schedule.find_unassigned(d(2), "LN").unwrap();
        let reasons = engine().check(&dr, r, &schedule, &catalog, false);
        assert!(reasons.iter().any(|s| s.contains("LONG_NIGHT_NEXT_DAY_BUSY")));
    }

    #[test]
    fn test_short_night_exclusive_same_day() {
        let catalog = standard_catalog();
        let mut schedule = build_schedule(7, &["NS", "AM"]);
        let dr = StaffMember::doctor("dr_a", 2);
        assign(&mut schedule, d(2), "AM", "dr_a");

        let r = schedule.find_unassigned(d(2), "NS").unwrap();
        let reasons = engine().check(&dr, r, &schedule, &catalog, false);
        assert!(reasons.iter().any(|s| s.contains("SHORT_NIGHT_NOT_ALONE")));

        // 反向: 已持 NS 再接 AM 亦拒绝
        let mut schedule2 = build_schedule(7, &["NS", "AM"]);
        assign(&mut schedule2, d(2), "NS", "dr_a");
        let r2 = schedule2.find_unassigned(d(2), "AM").unwrap();
        let reasons2 = engine().check(&dr, r2, &schedule2, &catalog, false);
        assert!(reasons2.iter().any(|s| s.contains("SHORT_NIGHT_HELD_TODAY")));
    }

    #[test]
    fn test_primary_desiderata_always_rejects() {
        let catalog = standard_catalog();
        let schedule = build_schedule(7, &["AM"]);
        let dr = StaffMember::doctor("dr_a", 2).with_desiderata(Desiderata {
            start_date: d(2),
            end_date: d(2),
            period: DayPeriod::Morning,
            priority: DesiderataPriority::Primary,
        });

        let r = schedule.find_unassigned(d(2), "AM").unwrap();
        // 即便放宽软性心愿,PRIMARY 仍拒绝
        let reasons = engine().check(&dr, r, &schedule, &catalog, true);
        assert!(reasons.iter().any(|s| s.contains("PRIMARY_DESIDERATA")));
    }

    #[test]
    fn test_secondary_desiderata_relaxable() {
        let catalog = standard_catalog();
        let schedule = build_schedule(7, &["AM"]);
        let dr = StaffMember::doctor("dr_a", 2).with_desiderata(Desiderata {
            start_date: d(2),
            end_date: d(2),
            period: DayPeriod::Morning,
            priority: DesiderataPriority::Secondary,
        });

        let r = schedule.find_unassigned(d(2), "AM").unwrap();
        assert!(!engine().is_legal(&dr, r, &schedule, &catalog, false));
        assert!(engine().is_legal(&dr, r, &schedule, &catalog, true)); // 放宽后合法
    }

    #[test]
    fn test_morning_after_night_with_nine_oclock_exception() {
        let catalog = standard_catalog();
        let mut schedule = build_schedule(7, &["NS", "AM", "AM9", "PMC"]);
        let dr = StaffMember::doctor("dr_a", 2);
        assign(&mut schedule, d(2), "NS", "dr_a");

        // 次日普通早班拒绝
        let r = schedule.find_unassigned(d(3), "AM").unwrap();
        let reasons = engine().check(&dr, r, &schedule, &catalog, false);
        assert!(reasons.iter().any(|s| s.contains("MORNING_AFTER_NIGHT")));

        // AM9 单独也拒绝(尚无同日组合)
        let r9 = schedule.find_unassigned(d(3), "AM9").unwrap();
        assert!(!engine().is_legal(&dr, r9, &schedule, &catalog, false));

        // 先持同日 PMC 后,AM9 例外成立
        assign(&mut schedule, d(3), "PMC", "dr_a");
        let r9 = schedule.find_unassigned(d(3), "AM9").unwrap();
        let reasons = engine().check(&dr, r9, &schedule, &catalog, false);
        assert!(
            !reasons.iter().any(|s| s.contains("MORNING_AFTER_NIGHT")),
            "nine oclock exception should apply: {:?}",
            reasons
        );
    }

    #[test]
    fn test_night_before_scheduled_morning_blocked() {
        let catalog = standard_catalog();
        let mut schedule = build_schedule(7, &["NS", "AM"]);
        let dr = StaffMember::doctor("dr_a", 2);
        assign(&mut schedule, d(3), "AM", "dr_a");

        // 次日已排早班 → 当日夜班拒绝
        let r = schedule.find_unassigned(d(2), "NS").unwrap();
        let reasons = engine().check(&dr, r, &schedule, &catalog, false);
        assert!(reasons.iter().any(|s| s.contains("NIGHT_BEFORE_MORNING")));
    }

    #[test]
    fn test_night_streak_limit() {
        let catalog = standard_catalog();
        let mut schedule = build_schedule(8, &["NS"]);
        let dr = StaffMember::doctor("dr_a", 2);
        // 连续4日夜班: 03-02..03-05
        for day in 2..=5 {
            assign(&mut schedule, d(day), "NS", "dr_a");
        }

        let r = schedule.find_unassigned(d(6), "NS").unwrap();
        let reasons = engine().check(&dr, r, &schedule, &catalog, false);
        assert!(reasons.iter().any(|s| s.contains("NIGHT_STREAK")));

        // 有空档则计数归零: 03-06 空,03-07 合法
        let r = schedule.find_unassigned(d(7), "NS").unwrap();
        assert!(engine().is_legal(&dr, r, &schedule, &catalog, false));
    }

    #[test]
    fn test_work_streak_limit() {
        let catalog = standard_catalog();
        let mut schedule = build_schedule(9, &["AM"]);
        let dr = StaffMember::doctor("dr_a", 2);
        // 连续6日有班: 03-02..03-07
        for day in 2..=7 {
            assign(&mut schedule, d(day), "AM", "dr_a");
        }

        let r = schedule.find_unassigned(d(8), "AM").unwrap();
        let reasons = engine().check(&dr, r, &schedule, &catalog, false);
        assert!(reasons.iter().any(|s| s.contains("WORK_STREAK")));
    }

    #[test]
    fn test_max_two_slots_per_day() {
        let catalog = standard_catalog();
        let mut schedule = build_schedule(3, &["AM", "PM", "PMC"]);
        let dr = StaffMember::doctor("dr_a", 2);
        assign(&mut schedule, d(2), "AM", "dr_a");
        assign(&mut schedule, d(2), "PM", "dr_a");

        let r = schedule.find_unassigned(d(2), "PMC").unwrap();
        let reasons = engine().check(&dr, r, &schedule, &catalog, false);
        assert!(reasons.iter().any(|s| s.contains("MAX_PER_DAY")));
    }

    #[test]
    fn test_fixed_slot_short_circuits_to_legal() {
        let catalog = standard_catalog();
        let mut schedule = build_schedule(3, &["AM", "NS"]);
        let dr = StaffMember::doctor("dr_a", 2).with_desiderata(Desiderata {
            start_date: d(2),
            end_date: d(2),
            period: DayPeriod::Morning,
            priority: DesiderataPriority::Primary,
        });
        // 将班次标记为固定
        let r = schedule.find_unassigned(d(2), "AM").unwrap();
        schedule.days[r.day_idx].slots[r.slot_idx].fixed = true;

        assert!(engine().is_legal(&dr, r, &schedule, &catalog, false));
    }

    #[test]
    fn test_can_pre_assign_checks_overlap_only() {
        let mut schedule = build_schedule(3, &["AM", "PM", "PMC"]);
        assign(&mut schedule, d(2), "PM", "dr_a"); // 14:00-20:00

        // PMC 14:30-20:00 与 PM 重叠 → 预分配亦拒绝
        let r = schedule.find_unassigned(d(2), "PMC").unwrap();
        assert!(!engine().can_pre_assign("dr_a", r, &schedule));

        // AM 08:00-14:00 不重叠 → 允许(即使其他规则会拒绝)
        let r = schedule.find_unassigned(d(2), "AM").unwrap();
        assert!(engine().can_pre_assign("dr_a", r, &schedule));
    }
}

// ==========================================
// 医院值班排班系统 - 阶段1/2: 实体化与固定预分配
// ==========================================
// 职责: 按配额实体化空班表; 落位外部预分配并加固定标记
// 红线: 预分配仅做时间重叠检查 —— 它是系统必须绕行的既定事实
// 红线: 配额为0但带保留标记的班型,按预分配条目数实体化,而非按配额数
// ==========================================

use crate::config::calendar::{DayClassifier, HolidayOracle};
use crate::domain::schedule::{DaySchedule, Schedule, SlotRef};
use crate::domain::slot::{ConcreteSlot, PreAssignment};
use crate::domain::types::AllocPhase;
use crate::engine::report::{DeficitReport, PhaseReport, PreAssignDiagnostic};
use crate::error::{RosterError, RosterResult};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::{debug, warn};

use super::core::SlotAllocator;

impl<'a> SlotAllocator<'a> {
    // ==========================================
    // 阶段 1: 实体化
    // ==========================================
    pub(crate) fn materialize<O: HolidayOracle + ?Sized>(
        &mut self,
        oracle: &O,
        pre_assignments: &[PreAssignment],
        start: NaiveDate,
        end: NaiveDate,
    ) -> RosterResult<(Schedule, PhaseReport)> {
        if start > end {
            return Err(RosterError::InvalidPeriod(format!(
                "start={} > end={}",
                start, end
            )));
        }

        let classifier = DayClassifier::new(oracle);
        let mut report = PhaseReport::new(AllocPhase::Init);
        let mut days = Vec::new();

        let mut date = start;
        while date <= end {
            let day_type = classifier.classify(date);
            let is_weekend =
                matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
            let mut slots = Vec::new();

            for abbrev in self.catalog.abbrevs() {
                let Some(def) = self.catalog.effective_def(&abbrev) else {
                    continue;
                };
                if !def.applies_to(day_type) {
                    continue;
                }
                let mut quota = if def.force_zero {
                    0
                } else {
                    self.quota_cfg.quota_for(date, day_type, &abbrev)
                };
                // 零配额 + 保留标记: 每条命中的预分配恰实体化一个班次
                if quota == 0 && def.preserve {
                    quota = pre_assignments
                        .iter()
                        .filter(|p| p.date == date && p.abbrev == abbrev)
                        .count() as u32;
                }
                for _ in 0..quota {
                    slots.push(ConcreteSlot::from_def(&def, date));
                    report.placed += 1;
                }
            }

            days.push(DaySchedule {
                date,
                day_type,
                is_weekend,
                is_holiday_or_bridge: classifier.is_holiday_or_bridge(date),
                slots,
            });
            date += Duration::days(1);
        }

        debug!(days = days.len(), slots = report.placed, "班表实体化完成");
        Ok((Schedule::new(start, end, days), report))
    }

    // ==========================================
    // 阶段 2: 固定预分配
    // ==========================================
    pub(crate) fn apply_pre_assignments(
        &mut self,
        schedule: &mut Schedule,
        pre_assignments: &[PreAssignment],
        deficit: &mut DeficitReport,
    ) -> PhaseReport {
        let mut report = PhaseReport::new(AllocPhase::PreAssign);

        for pa in pre_assignments {
            match self.place_pre_assignment(schedule, pa) {
                Ok(()) => report.placed += 1,
                Err(reason) => {
                    warn!(person = %pa.person, date = %pa.date, abbrev = %pa.abbrev,
                          reason = %reason, "预分配落位失败");
                    deficit.pre_assign_diagnostics.push(PreAssignDiagnostic {
                        person: pa.person.clone(),
                        date: pa.date,
                        abbrev: pa.abbrev.clone(),
                        reason,
                    });
                }
            }
        }
        report
    }

    fn place_pre_assignment(
        &mut self,
        schedule: &mut Schedule,
        pa: &PreAssignment,
    ) -> Result<(), String> {
        let Some(day_idx) = schedule.day_index(pa.date) else {
            return Err(format!("DATE_OUT_OF_PERIOD: date={}", pa.date));
        };
        let Some(def) = self.catalog.effective_def(&pa.abbrev) else {
            return Err(format!("UNKNOWN_SLOT_TYPE: abbrev={}", pa.abbrev));
        };
        if def.period != pa.period {
            return Err(format!(
                "PERIOD_MISMATCH: expected={} actual={}",
                pa.period, def.period
            ));
        }

        // 定位未分配班次; 不存在则补建
        let r = match schedule.find_unassigned(pa.date, pa.abbrev.as_str()) {
            Some(r) => r,
            None => {
                let slot = ConcreteSlot::from_def(&def, pa.date);
                schedule.days[day_idx].slots.push(slot);
                SlotRef {
                    day_idx,
                    slot_idx: schedule.days[day_idx].slots.len() - 1,
                }
            }
        };

        if !self.constraint.can_pre_assign(&pa.person, r, schedule) {
            return Err("OVERLAP: conflicts with existing assignment".to_string());
        }
        schedule
            .assign_fixed(r, &pa.person)
            .map_err(|v| v.to_string())
    }
}

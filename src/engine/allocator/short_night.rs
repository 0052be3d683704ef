// ==========================================
// 医院值班排班系统 - 阶段4: 中/短夜班分配
// ==========================================
// 职责: 中短夜班在夜班聚合组上的两级分配(先下限后上限)
// 与阶段3的区别: 无周五专属子阶段
// ==========================================

use crate::domain::schedule::{Schedule, SlotRef};
use crate::domain::staff::StaffMember;
use crate::domain::types::{AllocPhase, SlotKind};
use crate::engine::report::PhaseReport;
use rand::seq::SliceRandom;
use tracing::debug;

use super::core::SlotAllocator;

impl<'a> SlotAllocator<'a> {
    pub(crate) fn distribute_short_nights(&mut self, schedule: &mut Schedule) -> PhaseReport {
        let mut report = PhaseReport::new(AllocPhase::ShortNight);

        // CAT 人头额度先行
        self.fill_cat_per_head(schedule, SlotKind::ShortNight, &mut report);

        if self.total_shares() > 0 {
            // 第一级: 每名医生补足聚合下限
            let mut doctors = self.doctors();
            doctors.shuffle(&mut self.rng);
            for doctor in doctors {
                let band = self.kind_band(doctor, SlotKind::ShortNight);
                while self.kind_count(schedule, &doctor.name, SlotKind::ShortNight) < band.min {
                    let Some(r) = self.find_short_night_slot(schedule, doctor) else {
                        break;
                    };
                    if !self.try_assign(schedule, r, doctor, false) {
                        break;
                    }
                    report.placed += 1;
                }
            }

            // 第二级: 轮转放置直至各自上限或无可放
            loop {
                let mut progress = false;
                let mut doctors = self.doctors();
                doctors.shuffle(&mut self.rng);
                for doctor in doctors {
                    let band = self.kind_band(doctor, SlotKind::ShortNight);
                    if self.kind_count(schedule, &doctor.name, SlotKind::ShortNight) >= band.max {
                        continue;
                    }
                    if let Some(r) = self.find_short_night_slot(schedule, doctor) {
                        if self.try_assign(schedule, r, doctor, false) {
                            report.placed += 1;
                            progress = true;
                        }
                    }
                }
                if !progress {
                    break;
                }
            }
        }

        for r in self.unassigned_of_kind(schedule, SlotKind::ShortNight) {
            let slot = schedule.slot(r);
            report.record_unmet(&slot.abbrev, Some(slot.date), 1, "NO_LEGAL_ASSIGNEE");
        }
        debug!(placed = report.placed, deficit = report.total_deficit(), "中短夜班分配结束");
        report
    }

    /// 日期升序取首个合法的未分配中短夜班
    fn find_short_night_slot(
        &self,
        schedule: &Schedule,
        member: &StaffMember,
    ) -> Option<SlotRef> {
        self.unassigned_of_kind(schedule, SlotKind::ShortNight)
            .into_iter()
            .find(|r| {
                self.class_eligible(schedule, member, &schedule.slot(*r).abbrev)
                    && self
                        .constraint
                        .is_legal(member, *r, schedule, self.catalog, false)
            })
    }
}

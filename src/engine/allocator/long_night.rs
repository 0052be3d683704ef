// ==========================================
// 医院值班排班系统 - 阶段3: 长夜班分配
// ==========================================
// 职责: 长夜班按 周五/周六/周日节假日 三桶两级分配 + 随机分散
// 顺序: CAT 人头额度 → 周五桶下限 → 聚合下限 → 随机分散至上限
// 红线: 分散阶段的桶选择带随机扰动,避免固定偏置; 随机源必须是注入的种子化 RNG
// ==========================================

use crate::domain::schedule::{Schedule, SlotRef};
use crate::domain::staff::StaffMember;
use crate::domain::types::{AllocPhase, DayType, SlotKind};
use crate::engine::quota::QuotaEngine;
use crate::engine::report::PhaseReport;
use chrono::{Datelike, Weekday};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::core::SlotAllocator;

/// 长夜班分桶
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NightBucket {
    Friday,
    Saturday,
    SundayHoliday,
    Other,
}

/// 聚合下限补位时的取桶偏好顺序
const FILL_PREFERENCE: [NightBucket; 4] = [
    NightBucket::SundayHoliday,
    NightBucket::Saturday,
    NightBucket::Friday,
    NightBucket::Other,
];

impl<'a> SlotAllocator<'a> {
    pub(crate) fn distribute_long_nights(&mut self, schedule: &mut Schedule) -> PhaseReport {
        let mut report = PhaseReport::new(AllocPhase::LongNight);

        // CAT 人头额度先行,独立于医生分配
        self.fill_cat_per_head(schedule, SlotKind::LongNight, &mut report);

        let total_shares = self.total_shares();
        if total_shares > 0 {
            self.fill_friday_minimums(schedule, total_shares, &mut report);
            self.fill_group_minimums(schedule, &mut report);
            self.disperse_to_maximum(schedule, &mut report);
        }

        // 剩余未分配进入缺口报告
        for r in self.unassigned_of_kind(schedule, SlotKind::LongNight) {
            let slot = schedule.slot(r);
            report.record_unmet(&slot.abbrev, Some(slot.date), 1, "NO_LEGAL_ASSIGNEE");
        }
        debug!(placed = report.placed, deficit = report.total_deficit(), "长夜班分配结束");
        report
    }

    /// 子阶段 A: 保证每名医生达到周五桶下限
    fn fill_friday_minimums(
        &mut self,
        schedule: &mut Schedule,
        total_shares: u32,
        report: &mut PhaseReport,
    ) {
        let friday_total = self.bucket_slot_total(schedule, NightBucket::Friday);
        let mut doctors = self.doctors();
        doctors.shuffle(&mut self.rng);

        for doctor in doctors {
            let fri_band = QuotaEngine::round_ideal(
                friday_total as f64 * doctor.share as f64 / total_shares as f64,
                doctor.share,
                &self.params,
            );
            while self.bucket_count(schedule, &doctor.name, NightBucket::Friday) < fri_band.min {
                let Some(r) = self.find_night_slot(schedule, doctor, NightBucket::Friday) else {
                    break;
                };
                if !self.try_assign(schedule, r, doctor, false) {
                    break;
                }
                report.placed += 1;
            }
        }
    }

    /// 子阶段 B: 保证每名医生达到长夜班聚合下限
    /// 补位偏好: 周日/节假日 → 周六 → 周五 → 其他
    fn fill_group_minimums(&mut self, schedule: &mut Schedule, report: &mut PhaseReport) {
        let mut doctors = self.doctors();
        doctors.shuffle(&mut self.rng);

        for doctor in doctors {
            let band = self.kind_band(doctor, SlotKind::LongNight);
            'fill: while self.kind_count(schedule, &doctor.name, SlotKind::LongNight) < band.min {
                for bucket in FILL_PREFERENCE {
                    if let Some(r) = self.find_night_slot(schedule, doctor, bucket) {
                        if self.try_assign(schedule, r, doctor, false) {
                            report.placed += 1;
                            continue 'fill;
                        }
                    }
                }
                break;
            }
        }
    }

    /// 子阶段 C: 随机分散剩余长夜班至各医生上限
    ///
    /// 每轮为每名未达上限的医生放置一个班次,桶选择取
    /// "理想占比 - 实际占比 + 随机扰动" 最大者
    fn disperse_to_maximum(&mut self, schedule: &mut Schedule, report: &mut PhaseReport) {
        loop {
            let mut progress = false;
            let mut doctors = self.doctors();
            doctors.shuffle(&mut self.rng);

            for doctor in doctors {
                let band = self.kind_band(doctor, SlotKind::LongNight);
                if self.kind_count(schedule, &doctor.name, SlotKind::LongNight) >= band.max {
                    continue;
                }
                if let Some(r) = self.pick_dispersal_slot(schedule, doctor) {
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

    /// 按偏离度(含扰动)降序尝试各桶,返回首个可用班次
    fn pick_dispersal_slot(
        &mut self,
        schedule: &Schedule,
        doctor: &StaffMember,
    ) -> Option<SlotRef> {
        let total = self.kind_count(schedule, &doctor.name, SlotKind::LongNight) as f64;
        let [ideal_fri, ideal_sat, ideal_sun] = self.params.long_night_ideal_split;

        let mut scored: Vec<(f64, NightBucket)> = [
            (ideal_fri, NightBucket::Friday),
            (ideal_sat, NightBucket::Saturday),
            (ideal_sun, NightBucket::SundayHoliday),
            (0.0, NightBucket::Other),
        ]
        .into_iter()
        .map(|(ideal, bucket)| {
            let actual = if total > 0.0 {
                self.bucket_count(schedule, &doctor.name, bucket) as f64 / total
            } else {
                0.0
            };
            let jitter: f64 = self.rng.gen_range(-0.05..0.05);
            (ideal - actual + jitter, bucket)
        })
        .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .find_map(|(_, bucket)| self.find_night_slot(schedule, doctor, bucket))
    }

    // ==========================================
    // 分桶统计
    // ==========================================

    pub(crate) fn bucket_of(schedule: &Schedule, r: SlotRef) -> NightBucket {
        let day = &schedule.days[r.day_idx];
        if day.day_type == DayType::SundayHoliday {
            NightBucket::SundayHoliday
        } else if day.date.weekday() == Weekday::Fri {
            NightBucket::Friday
        } else if day.day_type == DayType::Saturday {
            NightBucket::Saturday
        } else {
            NightBucket::Other
        }
    }

    /// 某桶内长夜班总量(含已分配)
    fn bucket_slot_total(&self, schedule: &Schedule, bucket: NightBucket) -> u32 {
        let abbrevs = self.kind_abbrevs(SlotKind::LongNight);
        let mut total = 0;
        for (day_idx, day) in schedule.days.iter().enumerate() {
            for (slot_idx, slot) in day.slots.iter().enumerate() {
                let r = SlotRef { day_idx, slot_idx };
                if abbrevs.contains(&slot.abbrev) && Self::bucket_of(schedule, r) == bucket {
                    total += 1;
                }
            }
        }
        total
    }

    /// 某人在某桶内持有的长夜班数
    fn bucket_count(&self, schedule: &Schedule, person: &str, bucket: NightBucket) -> u32 {
        let abbrevs = self.kind_abbrevs(SlotKind::LongNight);
        let mut count = 0;
        for (day_idx, day) in schedule.days.iter().enumerate() {
            for (slot_idx, slot) in day.slots.iter().enumerate() {
                let r = SlotRef { day_idx, slot_idx };
                if slot.assigned_to(person)
                    && abbrevs.contains(&slot.abbrev)
                    && Self::bucket_of(schedule, r) == bucket
                {
                    count += 1;
                }
            }
        }
        count
    }

    /// 某桶内首个对该人合法的未分配长夜班
    fn find_night_slot(
        &self,
        schedule: &Schedule,
        member: &StaffMember,
        bucket: NightBucket,
    ) -> Option<SlotRef> {
        self.unassigned_of_kind(schedule, SlotKind::LongNight)
            .into_iter()
            .find(|r| {
                Self::bucket_of(schedule, *r) == bucket
                    && self.class_eligible(schedule, member, &schedule.slot(*r).abbrev)
                    && self
                        .constraint
                        .is_legal(member, *r, schedule, self.catalog, false)
            })
    }
}

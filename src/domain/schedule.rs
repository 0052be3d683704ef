// ==========================================
// 医院值班排班系统 - 班表实体
// ==========================================
// 职责: 整周期班表(逐日班次序列)与只读统计访问器
// 红线: 不变式防御 —— 同人同时段重叠、固定班次改动,一律拒绝而非静默接受
// 红线: 单线程批处理对象,跨运行并行须各自深拷贝
// ==========================================

use crate::domain::slot::ConcreteSlot;
use crate::domain::types::DayType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ==========================================
// ScheduleViolation - 不变式违规
// ==========================================
// 编程契约错误: 正确实现中不应出现,出现时拒绝该次变更并上报
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleViolation {
    /// 时间重叠: 同人两个班次绝对时间区间相交
    Overlap {
        person: String,
        date: NaiveDate,
        abbrev: String,
        conflicting_abbrev: String,
    },
    /// 改动固定班次
    FixedSlotMutation { date: NaiveDate, abbrev: String },
    /// 对已分配班次重复分配
    AlreadyAssigned {
        date: NaiveDate,
        abbrev: String,
        holder: String,
    },
    /// 引用了不存在的班次
    NoSuchSlot { date: NaiveDate, abbrev: String },
}

impl fmt::Display for ScheduleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleViolation::Overlap {
                person,
                date,
                abbrev,
                conflicting_abbrev,
            } => write!(
                f,
                "OVERLAP: person={} date={} abbrev={} conflicts_with={}",
                person, date, abbrev, conflicting_abbrev
            ),
            ScheduleViolation::FixedSlotMutation { date, abbrev } => {
                write!(f, "FIXED_SLOT_MUTATION: date={} abbrev={}", date, abbrev)
            }
            ScheduleViolation::AlreadyAssigned {
                date,
                abbrev,
                holder,
            } => write!(
                f,
                "ALREADY_ASSIGNED: date={} abbrev={} holder={}",
                date, abbrev, holder
            ),
            ScheduleViolation::NoSuchSlot { date, abbrev } => {
                write!(f, "NO_SUCH_SLOT: date={} abbrev={}", date, abbrev)
            }
        }
    }
}

// ==========================================
// SlotRef - 班次定位句柄
// ==========================================
// (日索引, 班次索引),仅在同一 Schedule 实例内有效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub day_idx: usize,
    pub slot_idx: usize,
}

// ==========================================
// DaySchedule - 单日班表
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    /// 日期
    pub date: NaiveDate,

    /// 日型(桥日已归入 SUNDAY_HOLIDAY)
    pub day_type: DayType,

    /// 是否周末(周六或周日)
    pub is_weekend: bool,

    /// 是否节假日或桥日
    pub is_holiday_or_bridge: bool,

    /// 当日全部班次
    pub slots: Vec<ConcreteSlot>,
}

impl DaySchedule {
    /// 指定人员当日持有的班次
    ///
    /// 迭代器同时借用单日班表与人名,两者取较短寿命
    pub fn slots_of<'a>(&'a self, person: &'a str) -> impl Iterator<Item = &'a ConcreteSlot> + 'a {
        self.slots.iter().filter(move |s| s.assigned_to(person))
    }

    /// 当日未分配班次数量
    pub fn unassigned_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_assigned()).count()
    }
}

// ==========================================
// Schedule - 整周期班表
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    /// 周期起始日期(含)
    pub start_date: NaiveDate,

    /// 周期结束日期(含)
    pub end_date: NaiveDate,

    /// 逐日班表(按日期升序,连续无缺)
    pub days: Vec<DaySchedule>,
}

impl Schedule {
    /// 从已分类的逐日班表构造
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, days: Vec<DaySchedule>) -> Self {
        debug_assert!(days.windows(2).all(|w| w[0].date < w[1].date));
        Self {
            start_date,
            end_date,
            days,
        }
    }

    // ==========================================
    // 定位
    // ==========================================

    /// 日期 → 日索引
    pub fn day_index(&self, date: NaiveDate) -> Option<usize> {
        if date < self.start_date || date > self.end_date {
            return None;
        }
        let idx = (date - self.start_date).num_days() as usize;
        debug_assert_eq!(self.days.get(idx).map(|d| d.date), Some(date));
        Some(idx)
    }

    /// 按日期取单日班表
    pub fn day(&self, date: NaiveDate) -> Option<&DaySchedule> {
        self.day_index(date).map(|i| &self.days[i])
    }

    /// 解引用班次句柄
    pub fn slot(&self, r: SlotRef) -> &ConcreteSlot {
        &self.days[r.day_idx].slots[r.slot_idx]
    }

    /// 查找指定日期上某班型的一个未分配班次
    pub fn find_unassigned(&self, date: NaiveDate, abbrev: &str) -> Option<SlotRef> {
        let day_idx = self.day_index(date)?;
        self.days[day_idx]
            .slots
            .iter()
            .position(|s| s.abbrev == abbrev && !s.is_assigned())
            .map(|slot_idx| SlotRef { day_idx, slot_idx })
    }

    /// 查找指定人员在指定日期上持有的某班型班次
    pub fn find_assigned(&self, date: NaiveDate, abbrev: &str, person: &str) -> Option<SlotRef> {
        let day_idx = self.day_index(date)?;
        self.days[day_idx]
            .slots
            .iter()
            .position(|s| s.abbrev == abbrev && s.assigned_to(person))
            .map(|slot_idx| SlotRef { day_idx, slot_idx })
    }

    // ==========================================
    // 变更(带不变式防御)
    // ==========================================

    /// 分配班次
    ///
    /// 拒绝条件:
    /// 1. 班次已分配
    /// 2. 与该人员相邻日期(跨午夜)任一已持班次时间重叠
    pub fn assign(&mut self, r: SlotRef, person: &str) -> Result<(), ScheduleViolation> {
        {
            let slot = &self.days[r.day_idx].slots[r.slot_idx];
            if let Some(holder) = &slot.assignee {
                return Err(ScheduleViolation::AlreadyAssigned {
                    date: slot.date,
                    abbrev: slot.abbrev.clone(),
                    holder: holder.clone(),
                });
            }
            if let Some(conflict) = self.find_overlap(r, person) {
                return Err(ScheduleViolation::Overlap {
                    person: person.to_string(),
                    date: slot.date,
                    abbrev: slot.abbrev.clone(),
                    conflicting_abbrev: conflict,
                });
            }
        }
        self.days[r.day_idx].slots[r.slot_idx].assignee = Some(person.to_string());
        Ok(())
    }

    /// 分配并加固定标记(仅预分配阶段使用)
    pub fn assign_fixed(&mut self, r: SlotRef, person: &str) -> Result<(), ScheduleViolation> {
        self.assign(r, person)?;
        self.days[r.day_idx].slots[r.slot_idx].fixed = true;
        Ok(())
    }

    /// 清除班次的承接人(固定班次拒绝)
    pub fn unassign(&mut self, r: SlotRef) -> Result<(), ScheduleViolation> {
        let slot = &mut self.days[r.day_idx].slots[r.slot_idx];
        if slot.fixed {
            return Err(ScheduleViolation::FixedSlotMutation {
                date: slot.date,
                abbrev: slot.abbrev.clone(),
            });
        }
        slot.assignee = None;
        Ok(())
    }

    /// 检查将班次交给某人是否产生时间重叠,返回冲突班型
    ///
    /// 跨午夜班次只可能与相邻一日冲突,故仅检查前后各一日
    pub fn find_overlap(&self, r: SlotRef, person: &str) -> Option<String> {
        let candidate = &self.days[r.day_idx].slots[r.slot_idx];
        let lo = r.day_idx.saturating_sub(1);
        let hi = (r.day_idx + 1).min(self.days.len().saturating_sub(1));
        for day in &self.days[lo..=hi] {
            for held in day.slots_of(person) {
                if std::ptr::eq(held, candidate) {
                    continue;
                }
                if held.overlaps(candidate) {
                    return Some(held.abbrev.clone());
                }
            }
        }
        None
    }

    // ==========================================
    // 只读统计访问器(展示层消费)
    // ==========================================

    /// 全周期未分配班次数
    pub fn unassigned_count(&self) -> usize {
        self.days.iter().map(|d| d.unassigned_count()).sum()
    }

    /// 全周期未分配班次句柄列表
    pub fn unassigned_slots(&self) -> Vec<SlotRef> {
        let mut out = Vec::new();
        for (day_idx, day) in self.days.iter().enumerate() {
            for (slot_idx, slot) in day.slots.iter().enumerate() {
                if !slot.is_assigned() {
                    out.push(SlotRef { day_idx, slot_idx });
                }
            }
        }
        out
    }

    /// 指定人员按班型的持有计数
    pub fn counts_of(&self, person: &str) -> HashMap<String, u32> {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for day in &self.days {
            for slot in day.slots_of(person) {
                *counts.entry(slot.abbrev.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// 指定人员某一班型的持有计数
    pub fn count_of(&self, person: &str, abbrev: &str) -> u32 {
        self.days
            .iter()
            .flat_map(|d| d.slots_of(person))
            .filter(|s| s.abbrev == abbrev)
            .count() as u32
    }

    /// 指定人员全周期总班次数
    pub fn total_of(&self, person: &str) -> u32 {
        self.days
            .iter()
            .map(|d| d.slots_of(person).count() as u32)
            .sum()
    }

    /// 指定人员在某日是否持有任意班次
    pub fn works_on(&self, person: &str, date: NaiveDate) -> bool {
        self.day(date)
            .map(|d| d.slots_of(person).next().is_some())
            .unwrap_or(false)
    }

    /// 全量扫描双重占用(测试与收尾自检用)
    ///
    /// 返回全部检出的重叠违规; 正确实现中应为空
    pub fn scan_overlaps(&self) -> Vec<ScheduleViolation> {
        let mut violations = Vec::new();
        for (day_idx, day) in self.days.iter().enumerate() {
            for (slot_idx, slot) in day.slots.iter().enumerate() {
                let Some(person) = &slot.assignee else {
                    continue;
                };
                let r = SlotRef { day_idx, slot_idx };
                // 只向后比较,避免重复上报
                let lo = day_idx;
                let hi = (day_idx + 1).min(self.days.len() - 1);
                for (d_idx, other_day) in self.days[lo..=hi].iter().enumerate() {
                    for (s_idx, other) in other_day.slots.iter().enumerate() {
                        if lo + d_idx == day_idx && s_idx <= slot_idx {
                            continue;
                        }
                        if other.assigned_to(person) && other.overlaps(self.slot(r)) {
                            violations.push(ScheduleViolation::Overlap {
                                person: person.clone(),
                                date: slot.date,
                                abbrev: slot.abbrev.clone(),
                                conflicting_abbrev: other.abbrev.clone(),
                            });
                        }
                    }
                }
            }
        }
        violations
    }
}

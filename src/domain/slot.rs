// ==========================================
// 医院值班排班系统 - 班型与班次实体
// ==========================================
// 职责: 班型定义(目录供给) + 具体班次(排班对象)
// 红线: 班型定义对核心引擎只读; 具体班次的 fixed 标记一经设置不可被后续阶段改动
// ==========================================

use crate::domain::types::{AssigneeClass, DayPeriod, DayType, SlotKind};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ==========================================
// SlotTypeDef - 班型定义
// ==========================================
// 由班型目录(标准目录 + 用户自定义)供给,加载时校验
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotTypeDef {
    /// 班型缩写(2-4位,字母数字下划线)
    pub abbrev: String,

    /// 起始时刻
    pub start: NaiveTime,

    /// 结束时刻(早于起始时刻表示跨午夜,次日结束)
    pub end: NaiveTime,

    /// 适用日型集合
    pub day_types: BTreeSet<DayType>,

    /// 可分配人员类别
    pub eligibility: AssigneeClass,

    /// 统计组标签(聚合公平区间用)
    pub stat_group: Option<String>,

    /// 班型种类(长夜/中短夜/普通)
    pub kind: SlotKind,

    /// 所属日段(心愿单匹配与早晚邻接规则用)
    pub period: DayPeriod,

    /// 可与之组成组合班的班型缩写
    pub combinations: Vec<String>,

    /// 保留标记: 配额为0时仍需为预分配实体化班次
    pub preserve: bool,

    /// 强制零配额标记: 覆盖标准配额为0
    pub force_zero: bool,
}

impl SlotTypeDef {
    /// 是否跨午夜(结束时刻早于起始时刻)
    pub fn crosses_midnight(&self) -> bool {
        self.end < self.start
    }

    /// 在给定日期上展开为绝对时间区间
    pub fn absolute_window(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = date.and_time(self.start);
        let end = if self.crosses_midnight() {
            (date + Duration::days(1)).and_time(self.end)
        } else {
            date.and_time(self.end)
        };
        (start, end)
    }

    /// 是否适用于给定日型
    pub fn applies_to(&self, day_type: DayType) -> bool {
        self.day_types.contains(&day_type)
    }
}

// ==========================================
// ConcreteSlot - 具体班次
// ==========================================
// 一次排班运行中可变的最小单元: 仅 assignee 与 fixed 可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcreteSlot {
    /// 归属日期
    pub date: NaiveDate,

    /// 班型缩写
    pub abbrev: String,

    /// 绝对起始时间
    pub start: NaiveDateTime,

    /// 绝对结束时间(跨午夜时为次日)
    pub end: NaiveDateTime,

    /// 承接人(未分配为 None)
    pub assignee: Option<String>,

    /// 固定标记: 预分配产生,任何后续阶段不得改动
    pub fixed: bool,
}

impl ConcreteSlot {
    /// 从班型定义实体化一个未分配班次
    pub fn from_def(def: &SlotTypeDef, date: NaiveDate) -> Self {
        let (start, end) = def.absolute_window(date);
        Self {
            date,
            abbrev: def.abbrev.clone(),
            start,
            end,
            assignee: None,
            fixed: false,
        }
    }

    /// 判断两个班次的绝对时间区间是否重叠
    pub fn overlaps(&self, other: &ConcreteSlot) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// 是否已分配
    pub fn is_assigned(&self) -> bool {
        self.assignee.is_some()
    }

    /// 是否分配给指定人员
    pub fn assigned_to(&self, name: &str) -> bool {
        self.assignee.as_deref() == Some(name)
    }
}

// ==========================================
// PreAssignment - 固定预分配条目
// ==========================================
// 由外部预分配源供给,初始化阶段消费,生成后复核
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreAssignment {
    /// 人员姓名
    pub person: String,

    /// 日期
    pub date: NaiveDate,

    /// 日段
    pub period: DayPeriod,

    /// 班型缩写
    pub abbrev: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{AssigneeClass, DayPeriod, DayType, SlotKind};

    fn def(abbrev: &str, start: (u32, u32), end: (u32, u32)) -> SlotTypeDef {
        SlotTypeDef {
            abbrev: abbrev.to_string(),
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            day_types: [DayType::Weekday].into_iter().collect(),
            eligibility: AssigneeClass::Both,
            stat_group: None,
            kind: SlotKind::Regular,
            period: DayPeriod::Morning,
            combinations: Vec::new(),
            preserve: false,
            force_zero: false,
        }
    }

    #[test]
    fn test_midnight_crossing_window() {
        let night = def("LN", (22, 0), (8, 0));
        assert!(night.crosses_midnight());

        let date = NaiveDate::from_ymd_opt(2026, 3, 6).unwrap();
        let (start, end) = night.absolute_window(date);
        assert_eq!(start.date(), date);
        assert_eq!(end.date(), date + Duration::days(1)); // 次日结束
        assert!(start < end);
    }

    #[test]
    fn test_overlap_including_midnight_cross() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 6).unwrap();
        let night = ConcreteSlot::from_def(&def("LN", (22, 0), (8, 0)), date);
        // 次日早班 07:00-13:00 与跨午夜夜班重叠
        let morning =
            ConcreteSlot::from_def(&def("AM", (7, 0), (13, 0)), date + Duration::days(1));
        assert!(night.overlaps(&morning));

        // 次日 09:00 开始的班不重叠
        let late_morning =
            ConcreteSlot::from_def(&def("AM9", (9, 0), (13, 0)), date + Duration::days(1));
        assert!(!night.overlaps(&late_morning));
    }

    #[test]
    fn test_back_to_back_is_not_overlap() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 6).unwrap();
        let a = ConcreteSlot::from_def(&def("AM", (8, 0), (14, 0)), date);
        let b = ConcreteSlot::from_def(&def("PM", (14, 0), (20, 0)), date);
        assert!(!a.overlaps(&b)); // 首尾相接不算重叠
    }
}

// ==========================================
// 医院值班排班系统 - 领域类型定义
// ==========================================
// 红线: 所有标记均为显式字段,禁止用缺失属性表达状态
// 序列化格式: SCREAMING_SNAKE_CASE (与展示层一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 日型 (Day Type)
// ==========================================
// 红线: 桥日(含桥周六)一律按 SUNDAY_HOLIDAY 计算配额
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayType {
    Weekday,       // 工作日
    Saturday,      // 周六
    SundayHoliday, // 周日/节假日/桥日
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayType::Weekday => write!(f, "WEEKDAY"),
            DayType::Saturday => write!(f, "SATURDAY"),
            DayType::SundayHoliday => write!(f, "SUNDAY_HOLIDAY"),
        }
    }
}

// ==========================================
// 日段 (Day Period)
// ==========================================
// 用于心愿单匹配与班次归类
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayPeriod {
    Morning,   // 上午
    Afternoon, // 下午
    Evening,   // 晚间/夜间
}

impl fmt::Display for DayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayPeriod::Morning => write!(f, "MORNING"),
            DayPeriod::Afternoon => write!(f, "AFTERNOON"),
            DayPeriod::Evening => write!(f, "EVENING"),
        }
    }
}

// ==========================================
// 心愿单优先级 (Desiderata Priority)
// ==========================================
// 红线: PRIMARY 为硬约束,分配器绝不可违反
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesiderataPriority {
    Primary,   // 硬约束
    Secondary, // 软偏好,可违反但计入罚分
}

impl fmt::Display for DesiderataPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiderataPriority::Primary => write!(f, "PRIMARY"),
            DesiderataPriority::Secondary => write!(f, "SECONDARY"),
        }
    }
}

// ==========================================
// 人员类别 (Staff Class)
// ==========================================
// Doctor 参与比例公平目标; Cat 为替补池,按人头固定配额
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffClass {
    Doctor, // 医生(高可用池)
    Cat,    // CAT 替补池
}

impl fmt::Display for StaffClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaffClass::Doctor => write!(f, "DOCTOR"),
            StaffClass::Cat => write!(f, "CAT"),
        }
    }
}

// ==========================================
// 班型可分配人员类别 (Assignee Class)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssigneeClass {
    DoctorOnly, // 仅医生
    CatOnly,    // 仅 CAT
    Both,       // 均可
}

impl AssigneeClass {
    /// 判断某人员类别是否可承接该班型
    pub fn accepts(&self, class: StaffClass) -> bool {
        match self {
            AssigneeClass::DoctorOnly => class == StaffClass::Doctor,
            AssigneeClass::CatOnly => class == StaffClass::Cat,
            AssigneeClass::Both => true,
        }
    }
}

impl fmt::Display for AssigneeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssigneeClass::DoctorOnly => write!(f, "DOCTOR_ONLY"),
            AssigneeClass::CatOnly => write!(f, "CAT_ONLY"),
            AssigneeClass::Both => write!(f, "BOTH"),
        }
    }
}

// ==========================================
// 班型种类 (Slot Kind)
// ==========================================
// 约束引擎按种类应用隔离/排他规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotKind {
    LongNight,  // 长夜班(隔离规则: 当日独占,次日全休)
    ShortNight, // 中/短夜班(排他规则: 当日独占)
    Regular,    // 普通班次(门诊/会诊等)
}

impl SlotKind {
    /// 是否属于夜班类(用于连续夜班规则)
    pub fn is_night(&self) -> bool {
        matches!(self, SlotKind::LongNight | SlotKind::ShortNight)
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::LongNight => write!(f, "LONG_NIGHT"),
            SlotKind::ShortNight => write!(f, "SHORT_NIGHT"),
            SlotKind::Regular => write!(f, "REGULAR"),
        }
    }
}

// ==========================================
// 分配阶段 (Allocation Phase)
// ==========================================
// 固定阶段顺序,报告中用于定位缺口来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocPhase {
    Init,        // 阶段1: 实体化空班表
    PreAssign,   // 阶段2: 固定预分配
    LongNight,   // 阶段3: 长夜班分配
    ShortNight,  // 阶段4: 中/短夜班分配
    Combination, // 阶段5: 组合班分配
    Remaining,   // 阶段6: 剩余班次分配
    Optimize,    // 交换优化
    Backtrack,   // 回溯求解
}

impl fmt::Display for AllocPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocPhase::Init => write!(f, "INIT"),
            AllocPhase::PreAssign => write!(f, "PRE_ASSIGN"),
            AllocPhase::LongNight => write!(f, "LONG_NIGHT"),
            AllocPhase::ShortNight => write!(f, "SHORT_NIGHT"),
            AllocPhase::Combination => write!(f, "COMBINATION"),
            AllocPhase::Remaining => write!(f, "REMAINING"),
            AllocPhase::Optimize => write!(f, "OPTIMIZE"),
            AllocPhase::Backtrack => write!(f, "BACKTRACK"),
        }
    }
}

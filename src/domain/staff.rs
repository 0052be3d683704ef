// ==========================================
// 医院值班排班系统 - 人员实体
// ==========================================
// 职责: 人员主数据与心愿单(不可用时段申请)
// 红线: 一次排班运行期间人员主数据不可变,仅心愿单列表可在运行前补充
// ==========================================

use crate::domain::types::{DayPeriod, DesiderataPriority, StaffClass};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Desiderata - 心愿单条目
// ==========================================
// 一条心愿 = 日期范围 + 日段 + 优先级
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Desiderata {
    /// 起始日期(含)
    pub start_date: NaiveDate,

    /// 结束日期(含)
    pub end_date: NaiveDate,

    /// 申请不可用的日段
    pub period: DayPeriod,

    /// 优先级(PRIMARY=硬约束 / SECONDARY=软偏好)
    pub priority: DesiderataPriority,
}

impl Desiderata {
    /// 判断该心愿是否覆盖给定 (日期, 日段)
    pub fn covers(&self, date: NaiveDate, period: DayPeriod) -> bool {
        date >= self.start_date && date <= self.end_date && self.period == period
    }
}

// ==========================================
// StaffMember - 人员主数据
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    /// 姓名(全局唯一标识)
    pub name: String,

    /// 工作量份额(整数 FTE 单位: 1=半职, 2=全职)
    pub share: u32,

    /// 人员类别
    pub class: StaffClass,

    /// 心愿单(有序)
    pub desiderata: Vec<Desiderata>,
}

impl StaffMember {
    /// 创建医生
    pub fn doctor(name: &str, share: u32) -> Self {
        Self {
            name: name.to_string(),
            share,
            class: StaffClass::Doctor,
            desiderata: Vec::new(),
        }
    }

    /// 创建 CAT 替补人员
    pub fn cat(name: &str) -> Self {
        Self {
            name: name.to_string(),
            share: 0, // CAT 不参与比例份额
            class: StaffClass::Cat,
            desiderata: Vec::new(),
        }
    }

    /// 追加心愿单条目
    pub fn with_desiderata(mut self, d: Desiderata) -> Self {
        self.desiderata.push(d);
        self
    }

    /// 判断 (日期, 日段) 是否命中指定优先级的心愿
    pub fn has_desiderata(
        &self,
        date: NaiveDate,
        period: DayPeriod,
        priority: DesiderataPriority,
    ) -> bool {
        self.desiderata
            .iter()
            .any(|d| d.priority == priority && d.covers(date, period))
    }

    /// 心愿单条目总数(优化器据此判定"高心愿"成员)
    pub fn desiderata_count(&self) -> usize {
        self.desiderata.len()
    }
}

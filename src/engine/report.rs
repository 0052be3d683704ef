// ==========================================
// 医院值班排班系统 - 阶段报告与缺口结构
// ==========================================
// 职责: 以结构化结果承载"尽力而为"的完成情况
// 红线: 配额缺口不是错误 —— 每阶段上报缺口后,后续阶段照常执行
// ==========================================

use crate::domain::schedule::ScheduleViolation;
use crate::domain::types::AllocPhase;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// UnmetRequirement - 未满足需求
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmetRequirement {
    /// 班型缩写
    pub abbrev: String,

    /// 具体日期(聚合类缺口为 None)
    pub date: Option<NaiveDate>,

    /// 缺口数量
    pub deficit: u32,

    /// 机器可读原因
    pub reason: String,
}

// ==========================================
// PhaseReport - 单阶段完成报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseReport {
    /// 所属阶段
    pub phase: AllocPhase,

    /// 本阶段成功放置的班次数
    pub placed: u32,

    /// 未能放置的缺口明细
    pub unmet: Vec<UnmetRequirement>,

    /// 被迫违反的软性心愿: (人员, 日期, 班型)
    pub soft_violations: Vec<(String, NaiveDate, String)>,
}

impl PhaseReport {
    pub fn new(phase: AllocPhase) -> Self {
        Self {
            phase,
            placed: 0,
            unmet: Vec::new(),
            soft_violations: Vec::new(),
        }
    }

    pub fn record_unmet(&mut self, abbrev: &str, date: Option<NaiveDate>, deficit: u32, reason: &str) {
        self.unmet.push(UnmetRequirement {
            abbrev: abbrev.to_string(),
            date,
            deficit,
            reason: reason.to_string(),
        });
    }

    /// 缺口总量
    pub fn total_deficit(&self) -> u32 {
        self.unmet.iter().map(|u| u.deficit).sum()
    }
}

// ==========================================
// PreAssignDiagnostic - 预分配复核诊断
// ==========================================
// 生成后逐条复核预分配: 每条应恰好实体化为一个匹配班次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreAssignDiagnostic {
    pub person: String,
    pub date: NaiveDate,
    pub abbrev: String,
    pub reason: String,
}

// ==========================================
// DeficitReport - 全程缺口汇总
// ==========================================
// 调用方总能拿到"尽力完成"的班表 + 本报告; 是否视为失败由展示层决定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeficitReport {
    /// 各阶段报告(按执行顺序)
    pub phases: Vec<PhaseReport>,

    /// 预分配复核诊断
    pub pre_assign_diagnostics: Vec<PreAssignDiagnostic>,

    /// 运行期间检出并拒绝的不变式违规
    pub rejected_mutations: Vec<ScheduleViolation>,
}

impl DeficitReport {
    /// 全程缺口总量
    pub fn total_deficit(&self) -> u32 {
        self.phases.iter().map(|p| p.total_deficit()).sum()
    }

    /// 全程软性心愿违反总数
    pub fn total_soft_violations(&self) -> usize {
        self.phases.iter().map(|p| p.soft_violations.len()).sum()
    }
}

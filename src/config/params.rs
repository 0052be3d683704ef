// ==========================================
// 医院值班排班系统 - 引擎参数
// ==========================================
// 职责: 一次运行的全部可调参数,运行起点传入,只读
// 红线: 随机源种子必须显式携带,禁止隐式全局随机状态
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// EngineParams - 引擎参数
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineParams {
    /// 半职成员取整点: 目标小数部分低于该值时区间塌缩为 {floor, floor}
    pub half_share_round_point: f64,

    /// 全职成员取整点(区间分支判定用)
    pub full_share_round_point: f64,

    /// 单人单日班次上限
    pub max_slots_per_day: u32,

    /// 连续夜班上限: 此前连续 N 日均有夜班类班次则拒绝
    pub night_streak_limit: u32,

    /// 连续工作日上限: 此前连续 N 日均有班则拒绝
    pub work_streak_limit: u32,

    /// 回溯求解默认深度预算
    pub backtrack_depth: u32,

    /// 回溯求解节点预算
    pub backtrack_node_budget: u32,

    /// 优化器按参与人数的迭代预算: [2人, 3人, 4人, ≥5人]
    pub optimizer_iteration_tiers: [u32; 4],

    /// 优化器参与人数上限
    pub optimizer_max_participants: usize,

    /// 长夜班分散阶段的理想日型占比: [周五, 周六, 周日/节假日]
    pub long_night_ideal_split: [f64; 3],

    /// 随机源种子(相同输入 + 相同种子 ⇒ 相同班表)
    pub rng_seed: u64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            half_share_round_point: 0.3,
            full_share_round_point: 0.5,
            max_slots_per_day: 2,
            night_streak_limit: 4,
            work_streak_limit: 6,
            backtrack_depth: 5,
            backtrack_node_budget: 20_000,
            optimizer_iteration_tiers: [100, 75, 50, 25],
            optimizer_max_participants: 5,
            long_night_ideal_split: [0.34, 0.33, 0.33],
            rng_seed: 0,
        }
    }
}

impl EngineParams {
    /// 按参与人数取优化器迭代预算
    pub fn optimizer_budget(&self, participants: usize) -> u32 {
        match participants {
            0..=2 => self.optimizer_iteration_tiers[0],
            3 => self.optimizer_iteration_tiers[1],
            4 => self.optimizer_iteration_tiers[2],
            _ => self.optimizer_iteration_tiers[3],
        }
    }
}

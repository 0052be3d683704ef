// ==========================================
// 医院值班排班系统 - 平衡循环交换
// ==========================================
// 职责: 构造与应用"人人给出一个、得到一个"的组内循环交换
// 红线: 固定班次绝不进入交换; 应用失败时调用方丢弃草稿副本(事务回退)
// ==========================================

use crate::config::catalog::SlotCatalog;
use crate::domain::schedule::{Schedule, SlotRef};
use crate::domain::staff::StaffMember;
use crate::engine::constraint::ConstraintEngine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// ExchangeMove - 单笔转移
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeMove {
    /// 被转移的班次句柄
    pub slot: SlotRef,

    /// 让出方
    pub giver: String,

    /// 接收方
    pub receiver: String,
}

// ==========================================
// ExchangeProposal - 循环交换提案
// ==========================================
// 生命周期: 构造 → 草稿副本试算 → 采纳或丢弃
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeProposal {
    /// 作用统计组
    pub group: String,

    /// 循环转移集(按参与者环序)
    pub moves: Vec<ExchangeMove>,
}

impl ExchangeProposal {
    /// 按环序构造: participants[i] 让出一个组内班次给 participants[i+1]
    ///
    /// 任一参与者无可让班次(组内非固定持有为空)则返回 None
    pub fn cycle(
        schedule: &Schedule,
        catalog: &SlotCatalog,
        group: &str,
        participants: &[String],
        mut pick: impl FnMut(&[SlotRef]) -> Option<SlotRef>,
    ) -> Option<Self> {
        if participants.len() < 2 {
            return None;
        }
        let abbrevs = catalog.types_in_group(group);
        let mut moves = Vec::with_capacity(participants.len());
        let mut taken: Vec<SlotRef> = Vec::new();

        for (i, giver) in participants.iter().enumerate() {
            let receiver = &participants[(i + 1) % participants.len()];
            let held: Vec<SlotRef> = holdings(schedule, giver, &abbrevs)
                .into_iter()
                .filter(|r| !taken.contains(r))
                .collect();
            let slot = pick(&held)?;
            taken.push(slot);
            moves.push(ExchangeMove {
                slot,
                giver: giver.clone(),
                receiver: receiver.clone(),
            });
        }
        Some(Self {
            group: group.to_string(),
            moves,
        })
    }

    /// 平衡性: 每名参与者给出数等于得到数
    pub fn is_balanced(&self) -> bool {
        let mut balance: HashMap<&str, i32> = HashMap::new();
        for m in &self.moves {
            *balance.entry(m.giver.as_str()).or_insert(0) -= 1;
            *balance.entry(m.receiver.as_str()).or_insert(0) += 1;
        }
        balance.values().all(|&b| b == 0)
    }

    /// 在草稿班表上应用全部转移; 任一接收不合法则整体失败
    ///
    /// 先全部解除再逐一落位,保证环内互换不受"班次已占用"干扰
    pub fn apply(
        &self,
        scratch: &mut Schedule,
        staff: &[StaffMember],
        constraint: &ConstraintEngine,
        catalog: &SlotCatalog,
    ) -> bool {
        for m in &self.moves {
            if scratch.slot(m.slot).fixed || !scratch.slot(m.slot).assigned_to(&m.giver) {
                return false;
            }
            if scratch.unassign(m.slot).is_err() {
                return false;
            }
        }
        for m in &self.moves {
            let Some(receiver) = staff.iter().find(|s| s.name == m.receiver) else {
                return false;
            };
            if !constraint.is_legal(receiver, m.slot, scratch, catalog, true) {
                return false;
            }
            if scratch.assign(m.slot, &m.receiver).is_err() {
                return false;
            }
        }
        true
    }
}

/// 某人在组内的非固定持有班次
fn holdings(schedule: &Schedule, person: &str, abbrevs: &[String]) -> Vec<SlotRef> {
    let mut out = Vec::new();
    for (day_idx, day) in schedule.days.iter().enumerate() {
        for (slot_idx, slot) in day.slots.iter().enumerate() {
            if slot.assigned_to(person) && !slot.fixed && abbrevs.contains(&slot.abbrev) {
                out.push(SlotRef { day_idx, slot_idx });
            }
        }
    }
    out
}

// ==========================================
// 医院值班排班系统 - 班次分配器(模块声明)
// ==========================================
// 固定阶段顺序: 实体化 → 预分配 → 长夜班 → 中短夜班 → 组合班 → 剩余班次
// ==========================================

pub mod core;
mod combination;
mod init;
mod long_night;
mod remaining;
mod short_night;

#[cfg(test)]
mod tests;

pub use core::SlotAllocator;

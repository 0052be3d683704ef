// ==========================================
// 医院值班排班系统 - 交换优化器(模块声明)
// ==========================================

pub mod core;
pub mod exchange;
pub mod scoring;

#[cfg(test)]
mod tests;

pub use core::{ExchangeOptimizer, OptimizerSummary};
pub use exchange::{ExchangeMove, ExchangeProposal};

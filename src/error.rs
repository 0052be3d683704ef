// ==========================================
// 医院值班排班系统 - 错误类型
// ==========================================
// 红线: 仅配置错误是致命错误; 配额缺口/搜索预算耗尽属结果,不走错误通道
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 排班核心错误类型
#[derive(Error, Debug)]
pub enum RosterError {
    // ===== 配置错误(计算开始前即上报) =====
    #[error("日期范围非法: {0}")]
    InvalidPeriod(String),

    #[error("班型目录错误: {0}")]
    CatalogError(String),

    #[error("配额配置错误: {0}")]
    QuotaConfigError(String),

    #[error("份额总量为零: 无医生参与比例分配")]
    ZeroTotalShares,

    #[error("人员配置错误: {0}")]
    StaffConfigError(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type RosterResult<T> = Result<T, RosterError>;

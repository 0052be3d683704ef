// ==========================================
// 医院值班排班系统 - 配置层
// ==========================================
// 职责: 日历判定、班型目录、引擎参数
// 红线: 全部配置在运行起点装载为只读快照,引擎内不再变更
// ==========================================

pub mod calendar;
pub mod catalog;
pub mod params;

pub use calendar::{DayClassifier, HolidayOracle, SetHolidayOracle};
pub use catalog::{
    standard_catalog, CatalogValidationReport, SlotCatalog, NIGHT_GROUP, WEEKEND_NIGHT_GROUP,
};
pub use params::EngineParams;

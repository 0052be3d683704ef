// ==========================================
// 医院值班排班系统 - 班型目录
// ==========================================
// 职责: 标准班型目录 + 用户自定义班型,加载时一次性校验
// 红线: 目录是运行起点传入的只读快照,消费方不做清理
// 红线: 无效自定义条目在装载处拒绝并给出 reason,不静默丢弃
// ==========================================

use crate::domain::slot::SlotTypeDef;
use crate::domain::types::{AssigneeClass, DayPeriod, DayType, SlotKind};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// 夜班统计组(长夜 + 中短夜聚合公平计量)
pub const NIGHT_GROUP: &str = "NIGHT";

/// 周末夜统计组(周五长夜额外计入)
pub const WEEKEND_NIGHT_GROUP: &str = "WEEKEND_NIGHT";

// ==========================================
// CatalogValidationReport - 目录装载报告
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogValidationReport {
    /// 接受的自定义班型缩写
    pub accepted: Vec<String>,

    /// 拒绝的条目: (缩写, reason)
    pub rejected: Vec<(String, String)>,
}

// ==========================================
// SlotCatalog - 班型目录
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotCatalog {
    /// 班型定义: 缩写 → 定义
    defs: HashMap<String, SlotTypeDef>,

    /// 组合班优先级列表(阶段5按序尝试)
    pub combination_priority: Vec<(String, String)>,

    /// 特定班型的时间窗覆写(重叠判定前生效)
    pub window_overrides: HashMap<String, (NaiveTime, NaiveTime)>,

    /// "9点开工"早班例外: 允许夜班次日承接的早班类型
    ///
    /// 策略缺口: 来源清单是否穷尽未知,故作为外部配置而非硬编码
    pub nine_oclock_types: Vec<String>,

    /// "9点组合"白名单: 构成例外所需的同日组合对
    pub nine_oclock_pairs: Vec<(String, String)>,
}

impl SlotCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 按缩写取班型定义
    pub fn def(&self, abbrev: &str) -> Option<&SlotTypeDef> {
        self.defs.get(abbrev)
    }

    /// 班型在给定日型下的时间窗; 未定义或不适用返回 None
    pub fn window_for(&self, abbrev: &str, day_type: DayType) -> Option<(NaiveTime, NaiveTime)> {
        let def = self.defs.get(abbrev)?;
        if !def.applies_to(day_type) {
            return None;
        }
        if let Some(&(start, end)) = self.window_overrides.get(abbrev) {
            return Some((start, end));
        }
        Some((def.start, def.end))
    }

    /// 班型的有效定义(时间窗覆写已生效)
    pub fn effective_def(&self, abbrev: &str) -> Option<SlotTypeDef> {
        let mut def = self.defs.get(abbrev)?.clone();
        if let Some(&(start, end)) = self.window_overrides.get(abbrev) {
            def.start = start;
            def.end = end;
        }
        Some(def)
    }

    /// 全部班型缩写(确定序)
    pub fn abbrevs(&self) -> Vec<String> {
        let mut out: Vec<String> = self.defs.keys().cloned().collect();
        out.sort();
        out
    }

    /// 班型所属统计组
    pub fn group_of(&self, abbrev: &str) -> Option<&str> {
        self.defs.get(abbrev)?.stat_group.as_deref()
    }

    /// 统计组内全部班型缩写(确定序)
    pub fn types_in_group(&self, group: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .defs
            .values()
            .filter(|d| d.stat_group.as_deref() == Some(group))
            .map(|d| d.abbrev.clone())
            .collect();
        out.sort();
        out
    }

    /// 全部统计组标签(确定序)
    pub fn groups(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .defs
            .values()
            .filter_map(|d| d.stat_group.clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// 长夜班型缩写(隔离规则作用对象)
    pub fn long_night_abbrevs(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .defs
            .values()
            .filter(|d| d.kind == SlotKind::LongNight)
            .map(|d| d.abbrev.clone())
            .collect();
        out.sort();
        out
    }

    /// 中/短夜班型缩写(排他规则作用对象)
    pub fn short_night_abbrevs(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .defs
            .values()
            .filter(|d| d.kind == SlotKind::ShortNight)
            .map(|d| d.abbrev.clone())
            .collect();
        out.sort();
        out
    }

    /// 两个班型是否构成认可的"9点组合"(双向)
    pub fn is_nine_oclock_pair(&self, a: &str, b: &str) -> bool {
        self.nine_oclock_pairs
            .iter()
            .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }

    /// 两个班型是否互为组合候选(双向声明任一即可)
    pub fn combinable(&self, a: &str, b: &str) -> bool {
        let decl = |x: &str, y: &str| {
            self.defs
                .get(x)
                .map(|d| d.combinations.iter().any(|c| c == y))
                .unwrap_or(false)
        };
        decl(a, b) || decl(b, a)
    }

    // ==========================================
    // 装载接口
    // ==========================================

    /// 加入标准班型(内部构造,视为可信)
    pub fn add_standard(&mut self, def: SlotTypeDef) {
        debug_assert!(validate_def(&def, true).is_ok());
        self.defs.insert(def.abbrev.clone(), def);
    }

    /// 批量装载用户自定义班型,逐条校验
    ///
    /// 无效条目拒绝并记录 reason; 有效条目覆盖同名标准班型
    pub fn load_custom(&mut self, customs: Vec<SlotTypeDef>) -> CatalogValidationReport {
        let mut report = CatalogValidationReport::default();
        for def in customs {
            match validate_def(&def, false) {
                Ok(()) => {
                    info!(abbrev = %def.abbrev, "custom slot type accepted");
                    report.accepted.push(def.abbrev.clone());
                    self.defs.insert(def.abbrev.clone(), def);
                }
                Err(reason) => {
                    warn!(abbrev = %def.abbrev, reason = %reason, "custom slot type rejected");
                    report.rejected.push((def.abbrev.clone(), reason));
                }
            }
        }
        report
    }
}

/// 班型定义校验
///
/// 规则:
/// 1. 缩写长度 2-4
/// 2. 缩写仅含字母/数字/下划线
/// 3. 日型集合非空
/// 4. 自定义班型要求 start 严格早于 end(标准目录允许跨午夜)
fn validate_def(def: &SlotTypeDef, allow_midnight_cross: bool) -> Result<(), String> {
    let len = def.abbrev.chars().count();
    if !(2..=4).contains(&len) {
        return Err(format!("abbrev length {} out of range 2-4", len));
    }
    if !def
        .abbrev
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err("abbrev contains invalid character".to_string());
    }
    if def.day_types.is_empty() {
        return Err("day type set empty".to_string());
    }
    if !allow_midnight_cross && def.start >= def.end {
        return Err(format!(
            "start {} not strictly before end {}",
            def.start, def.end
        ));
    }
    Ok(())
}

// ==========================================
// 标准目录
// ==========================================

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("valid time literal")
}

fn all_day_types() -> std::collections::BTreeSet<DayType> {
    [DayType::Weekday, DayType::Saturday, DayType::SundayHoliday]
        .into_iter()
        .collect()
}

fn weekday_only() -> std::collections::BTreeSet<DayType> {
    [DayType::Weekday].into_iter().collect()
}

/// 构建标准班型目录
///
/// - LN : 长夜班 22:00-08:00(跨午夜),仅医生,NIGHT 组
/// - NS : 中夜班 20:00-01:00(跨午夜),医生/CAT 均可,NIGHT 组
/// - AM : 上午病房班 08:00-14:00,均可,DAY 组
/// - PM : 下午病房班 14:00-20:00,均可,DAY 组
/// - AM9: 9点门诊班 09:00-14:00,仅医生,CONSULT 组,与 PMC 组合
/// - PMC: 下午门诊班 14:30-20:00,仅医生,CONSULT 组,与 AM9 组合
pub fn standard_catalog() -> SlotCatalog {
    let mut catalog = SlotCatalog::new();

    catalog.add_standard(SlotTypeDef {
        abbrev: "LN".to_string(),
        start: t(22, 0),
        end: t(8, 0),
        day_types: all_day_types(),
        eligibility: AssigneeClass::DoctorOnly,
        stat_group: Some(NIGHT_GROUP.to_string()),
        kind: SlotKind::LongNight,
        period: DayPeriod::Evening,
        combinations: Vec::new(),
        preserve: false,
        force_zero: false,
    });

    catalog.add_standard(SlotTypeDef {
        abbrev: "NS".to_string(),
        start: t(20, 0),
        end: t(1, 0),
        day_types: all_day_types(),
        eligibility: AssigneeClass::Both,
        stat_group: Some(NIGHT_GROUP.to_string()),
        kind: SlotKind::ShortNight,
        period: DayPeriod::Evening,
        combinations: Vec::new(),
        preserve: false,
        force_zero: false,
    });

    catalog.add_standard(SlotTypeDef {
        abbrev: "AM".to_string(),
        start: t(8, 0),
        end: t(14, 0),
        day_types: all_day_types(),
        eligibility: AssigneeClass::Both,
        stat_group: Some("DAY".to_string()),
        kind: SlotKind::Regular,
        period: DayPeriod::Morning,
        combinations: vec!["PM".to_string()],
        preserve: false,
        force_zero: false,
    });

    catalog.add_standard(SlotTypeDef {
        abbrev: "PM".to_string(),
        start: t(14, 0),
        end: t(20, 0),
        day_types: all_day_types(),
        eligibility: AssigneeClass::Both,
        stat_group: Some("DAY".to_string()),
        kind: SlotKind::Regular,
        period: DayPeriod::Afternoon,
        combinations: vec!["AM".to_string()],
        preserve: false,
        force_zero: false,
    });

    catalog.add_standard(SlotTypeDef {
        abbrev: "AM9".to_string(),
        start: t(9, 0),
        end: t(14, 0),
        day_types: weekday_only(),
        eligibility: AssigneeClass::DoctorOnly,
        stat_group: Some("CONSULT".to_string()),
        kind: SlotKind::Regular,
        period: DayPeriod::Morning,
        combinations: vec!["PMC".to_string()],
        preserve: false,
        force_zero: false,
    });

    catalog.add_standard(SlotTypeDef {
        abbrev: "PMC".to_string(),
        start: t(14, 30),
        end: t(20, 0),
        day_types: weekday_only(),
        eligibility: AssigneeClass::DoctorOnly,
        stat_group: Some("CONSULT".to_string()),
        kind: SlotKind::Regular,
        period: DayPeriod::Afternoon,
        combinations: vec!["AM9".to_string()],
        preserve: false,
        force_zero: false,
    });

    catalog.combination_priority = vec![
        ("AM9".to_string(), "PMC".to_string()),
        ("AM".to_string(), "PM".to_string()),
    ];
    catalog.nine_oclock_types = vec!["AM9".to_string()];
    catalog.nine_oclock_pairs = vec![("AM9".to_string(), "PMC".to_string())];

    catalog
}

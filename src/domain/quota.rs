// ==========================================
// 医院值班排班系统 - 配额与公平区间实体
// ==========================================
// 职责: 配额表(标准 + 日期范围覆写)与公平区间 {min, max, target}
// 红线: 公平区间每次运行计算一次,之后对分配器/优化器只读
// ==========================================

use crate::domain::types::DayType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// 元组键映射的序列化
// ==========================================
// JSON 的映射键必须是字符串,元组键映射改以条目序列外发;
// 条目按键升序排列,同一内容的映射序列化结果恒定
pub(crate) mod pair_entries {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;
    use std::hash::Hash;

    pub fn serialize<K, V, S>(map: &HashMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize + Ord,
        V: Serialize,
        S: Serializer,
    {
        let mut entries: Vec<(&K, &V)> = map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<HashMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Eq + Hash,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let entries = Vec::<(K, V)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

// ==========================================
// QuotaOverride - 日期范围配额覆写
// ==========================================
// 覆写窗口内取代标准配额
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaOverride {
    /// 覆写窗口起始(含)
    pub start_date: NaiveDate,

    /// 覆写窗口结束(含)
    pub end_date: NaiveDate,

    /// 班型缩写
    pub abbrev: String,

    /// 覆写后的单日需求量
    pub count: u32,
}

impl QuotaOverride {
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

// ==========================================
// QuotaConfig - 配额配置
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// 标准配额: (日型, 班型) → 单日需求量
    #[serde(with = "pair_entries")]
    pub base: HashMap<(DayType, String), u32>,

    /// 日期范围覆写(优先于标准配额)
    pub overrides: Vec<QuotaOverride>,

    /// CAT 人头配额: 班型 → 每名 CAT 人员整周期固定承担量
    pub cat_per_head: HashMap<String, u32>,
}

impl QuotaConfig {
    /// 设置标准配额
    pub fn set(&mut self, day_type: DayType, abbrev: &str, count: u32) {
        self.base.insert((day_type, abbrev.to_string()), count);
    }

    /// 查询某日某班型的需求量(覆写优先)
    pub fn quota_for(&self, date: NaiveDate, day_type: DayType, abbrev: &str) -> u32 {
        if let Some(ov) = self
            .overrides
            .iter()
            .find(|ov| ov.abbrev == abbrev && ov.covers(date))
        {
            return ov.count;
        }
        self.base
            .get(&(day_type, abbrev.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// 校验覆写配置: 同一班型的覆写窗口不得互相重叠
    pub fn validate_overrides(&self) -> Result<(), String> {
        for (i, a) in self.overrides.iter().enumerate() {
            if a.start_date > a.end_date {
                return Err(format!(
                    "override window invalid: abbrev={} start={} > end={}",
                    a.abbrev, a.start_date, a.end_date
                ));
            }
            for b in &self.overrides[i + 1..] {
                if a.abbrev == b.abbrev
                    && a.start_date <= b.end_date
                    && b.start_date <= a.end_date
                {
                    return Err(format!(
                        "override windows overlap: abbrev={} [{}..{}] vs [{}..{}]",
                        a.abbrev, a.start_date, a.end_date, b.start_date, b.end_date
                    ));
                }
            }
        }
        Ok(())
    }
}

// ==========================================
// FairnessBand - 公平区间
// ==========================================
// target 为精确比例份额, min/max 由 round_ideal 取整规则导出
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FairnessBand {
    pub min: u32,
    pub max: u32,
    pub target: f64,
}

impl FairnessBand {
    /// 计数是否落在区间内
    pub fn contains(&self, count: u32) -> bool {
        count >= self.min && count <= self.max
    }

    /// 零区间(无可分配量)
    pub fn zero() -> Self {
        Self {
            min: 0,
            max: 0,
            target: 0.0,
        }
    }
}

// ==========================================
// BandTable - 公平区间表
// ==========================================
// 按 (人员, 班型) 与 (人员, 统计组) 双维度索引
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BandTable {
    /// (人员, 班型缩写) → 区间
    #[serde(with = "pair_entries")]
    pub per_type: HashMap<(String, String), FairnessBand>,

    /// (人员, 统计组) → 区间
    #[serde(with = "pair_entries")]
    pub per_group: HashMap<(String, String), FairnessBand>,
}

impl BandTable {
    /// 查询班型区间(缺省为零区间)
    pub fn for_type(&self, person: &str, abbrev: &str) -> FairnessBand {
        self.per_type
            .get(&(person.to_string(), abbrev.to_string()))
            .copied()
            .unwrap_or_else(FairnessBand::zero)
    }

    /// 查询统计组区间(缺省为零区间)
    pub fn for_group(&self, person: &str, group: &str) -> FairnessBand {
        self.per_group
            .get(&(person.to_string(), group.to_string()))
            .copied()
            .unwrap_or_else(FairnessBand::zero)
    }
}

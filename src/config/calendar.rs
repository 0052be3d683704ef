// ==========================================
// 医院值班排班系统 - 日历判定
// ==========================================
// 职责: 节假日预言机(外部供给) + 桥日推导 + 日型分类
// 红线: 核心只消费 is_holiday 原语,桥日由固定规则推导,不另行配置
// ==========================================

use crate::domain::types::DayType;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeSet;

// ==========================================
// HolidayOracle - 节假日预言机
// ==========================================
// 由宿主应用实现,核心不关心节假日来源
pub trait HolidayOracle {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

// ==========================================
// SetHolidayOracle - 基于日期集合的实现
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct SetHolidayOracle {
    holidays: BTreeSet<NaiveDate>,
}

impl SetHolidayOracle {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }
}

impl HolidayOracle for SetHolidayOracle {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }
}

// ==========================================
// DayClassifier - 日型分类器
// ==========================================
pub struct DayClassifier<'a, O: HolidayOracle + ?Sized> {
    oracle: &'a O,
}

impl<'a, O: HolidayOracle + ?Sized> DayClassifier<'a, O> {
    pub fn new(oracle: &'a O) -> Self {
        Self { oracle }
    }

    /// 桥日推导
    ///
    /// 固定规则:
    /// 1. 节假日周二之前的周一
    /// 2. 节假日周四之后的周五、周六
    /// 3. 节假日周五之后的周六
    /// 4. 被两个节假日夹住的任意工作日
    pub fn is_bridge(&self, date: NaiveDate) -> bool {
        if self.oracle.is_holiday(date) {
            return false; // 节假日本身不是桥日
        }

        let prev = date - Duration::days(1);
        let next = date + Duration::days(1);

        match date.weekday() {
            // 规则1: 周一 + 周二为节假日
            Weekday::Mon => self.oracle.is_holiday(next),
            // 规则2(前半): 周五 + 周四为节假日
            Weekday::Fri => self.oracle.is_holiday(prev),
            // 规则2(后半)+规则3: 周六 + 周四或周五为节假日
            Weekday::Sat => {
                self.oracle.is_holiday(prev) || self.oracle.is_holiday(date - Duration::days(2))
            }
            Weekday::Sun => false,
            // 规则4: 工作日被两个节假日夹住
            _ => self.oracle.is_holiday(prev) && self.oracle.is_holiday(next),
        }
    }

    /// 是否节假日或桥日
    pub fn is_holiday_or_bridge(&self, date: NaiveDate) -> bool {
        self.oracle.is_holiday(date) || self.is_bridge(date)
    }

    /// 日型分类
    ///
    /// 桥日(含桥周六)一律归入 SUNDAY_HOLIDAY
    pub fn classify(&self, date: NaiveDate) -> DayType {
        if date.weekday() == Weekday::Sun || self.is_holiday_or_bridge(date) {
            return DayType::SundayHoliday;
        }
        if date.weekday() == Weekday::Sat {
            return DayType::Saturday;
        }
        DayType::Weekday
    }
}

// ==========================================
// 交换优化器场景测试
// ==========================================

use crate::config::catalog::standard_catalog;
use crate::config::params::EngineParams;
use crate::domain::quota::BandTable;
use crate::domain::schedule::{DaySchedule, Schedule};
use crate::domain::slot::ConcreteSlot;
use crate::domain::staff::{Desiderata, StaffMember};
use crate::domain::types::{DayPeriod, DayType, DesiderataPriority};
use chrono::{Duration, NaiveDate};

use super::core::ExchangeOptimizer;
use super::exchange::ExchangeProposal;
use super::scoring;

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

/// 2026-03-02 起 days 天,每日 AM + PM 各一个
fn create_test_schedule(days: u32) -> Schedule {
    let catalog = standard_catalog();
    let start = d(2);
    let day_schedules = (0..days)
        .map(|offset| {
            let date = start + Duration::days(offset as i64);
            DaySchedule {
                date,
                day_type: DayType::Weekday,
                is_weekend: false,
                is_holiday_or_bridge: false,
                slots: ["AM", "PM"]
                    .iter()
                    .filter_map(|a| catalog.def(a))
                    .map(|def| ConcreteSlot::from_def(def, date))
                    .collect(),
            }
        })
        .collect();
    Schedule::new(start, start + Duration::days(days as i64 - 1), day_schedules)
}

fn assign(schedule: &mut Schedule, date: NaiveDate, abbrev: &str, person: &str) {
    let r = schedule.find_unassigned(date, abbrev).expect("slot exists");
    schedule.assign(r, person).expect("assign ok");
}

#[test]
fn test_scenario_01_exchange_clears_secondary_violation() {
    let catalog = standard_catalog();
    let mut schedule = create_test_schedule(2);
    // dr_a 在 03-02 上午有软性心愿,却持有当日 AM → 1 次软违反
    let staff = vec![
        StaffMember::doctor("dr_a", 2).with_desiderata(Desiderata {
            start_date: d(2),
            end_date: d(2),
            period: DayPeriod::Morning,
            priority: DesiderataPriority::Secondary,
        }),
        StaffMember::doctor("dr_b", 2),
    ];
    assign(&mut schedule, d(2), "AM", "dr_a");
    assign(&mut schedule, d(3), "PM", "dr_b");

    let bands = BandTable::default();
    assert_eq!(scoring::secondary_violations(&schedule, &staff, &catalog).len(), 1);
    let before = scoring::violation_score(&schedule, &staff, &bands, &catalog);

    let params = EngineParams::default();
    let summary = ExchangeOptimizer::new(&staff, &catalog, &bands, params)
        .optimize(&mut schedule);

    // 互换后软违反清零,评分不降
    assert!(summary.committed >= 1);
    assert!(scoring::secondary_violations(&schedule, &staff, &catalog).is_empty());
    assert!(summary.final_score > before);

    // 交换平衡: 双方总持有量不变
    assert_eq!(schedule.total_of("dr_a"), 1);
    assert_eq!(schedule.total_of("dr_b"), 1);
    assert!(schedule.find_assigned(d(2), "AM", "dr_b").is_some());
    assert!(schedule.find_assigned(d(3), "PM", "dr_a").is_some());
}

#[test]
fn test_scenario_02_no_violation_means_no_commit() {
    let catalog = standard_catalog();
    let mut schedule = create_test_schedule(2);
    let staff = vec![
        StaffMember::doctor("dr_a", 2),
        StaffMember::doctor("dr_b", 2),
    ];
    for date in [d(2), d(3)] {
        assign(&mut schedule, date, "AM", "dr_a");
        assign(&mut schedule, date, "PM", "dr_b");
    }

    let bands = BandTable::default();
    let frozen = serde_json::to_string(&schedule).unwrap();
    let summary = ExchangeOptimizer::new(&staff, &catalog, &bands, EngineParams::default())
        .optimize(&mut schedule);

    // 无可改善 → 零采纳,班表原样
    assert_eq!(summary.committed, 0);
    assert_eq!(serde_json::to_string(&schedule).unwrap(), frozen);
}

#[test]
fn test_scenario_03_fixed_slots_never_exchanged() {
    let catalog = standard_catalog();
    let mut schedule = create_test_schedule(2);
    let staff = vec![
        StaffMember::doctor("dr_a", 2).with_desiderata(Desiderata {
            start_date: d(2),
            end_date: d(2),
            period: DayPeriod::Morning,
            priority: DesiderataPriority::Secondary,
        }),
        StaffMember::doctor("dr_b", 2),
    ];
    // dr_a 的违规班次为固定预分配 → 优化器不得移动
    let r = schedule.find_unassigned(d(2), "AM").unwrap();
    schedule.assign_fixed(r, "dr_a").unwrap();
    assign(&mut schedule, d(3), "PM", "dr_b");

    let bands = BandTable::default();
    ExchangeOptimizer::new(&staff, &catalog, &bands, EngineParams::default())
        .optimize(&mut schedule);

    assert!(schedule.find_assigned(d(2), "AM", "dr_a").is_some());
    assert!(schedule.slot(r).fixed);
}

#[test]
fn test_cycle_proposal_is_balanced() {
    let catalog = standard_catalog();
    let mut schedule = create_test_schedule(3);
    assign(&mut schedule, d(2), "AM", "dr_a");
    assign(&mut schedule, d(3), "AM", "dr_b");
    assign(&mut schedule, d(4), "AM", "dr_c");

    let names = vec![
        "dr_a".to_string(),
        "dr_b".to_string(),
        "dr_c".to_string(),
    ];
    let proposal = ExchangeProposal::cycle(&schedule, &catalog, "DAY", &names, |held| {
        held.first().copied()
    })
    .expect("cycle built");

    assert_eq!(proposal.moves.len(), 3);
    assert!(proposal.is_balanced());
}

#[test]
fn test_cycle_fails_without_holdings() {
    let catalog = standard_catalog();
    let schedule = create_test_schedule(2);
    let names = vec!["dr_a".to_string(), "dr_b".to_string()];
    // 无人持有组内班次 → 无法构环
    assert!(
        ExchangeProposal::cycle(&schedule, &catalog, "DAY", &names, |held| held
            .first()
            .copied())
        .is_none()
    );
}

// ==========================================
// 分配器场景测试
// ==========================================

use crate::config::calendar::SetHolidayOracle;
use crate::config::catalog::standard_catalog;
use crate::config::params::EngineParams;
use crate::domain::quota::QuotaConfig;
use crate::domain::schedule::Schedule;
use crate::domain::slot::PreAssignment;
use crate::domain::staff::{Desiderata, StaffMember};
use crate::domain::types::{DayPeriod, DayType, DesiderataPriority};
use crate::engine::quota::{QuotaEngine, QuotaOutcome};
use crate::engine::report::DeficitReport;
use chrono::{Duration, NaiveDate};

use super::SlotAllocator;

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

fn create_test_staff() -> Vec<StaffMember> {
    vec![
        StaffMember::doctor("dr_a", 2),
        StaffMember::doctor("dr_b", 2),
        StaffMember::doctor("dr_c", 1),
        StaffMember::cat("cat_x"),
    ]
}

fn create_test_quota() -> QuotaConfig {
    let mut cfg = QuotaConfig::default();
    for day_type in [DayType::Weekday, DayType::Saturday, DayType::SundayHoliday] {
        cfg.set(day_type, "LN", 1);
        cfg.set(day_type, "NS", 1);
    }
    cfg.set(DayType::Weekday, "AM", 1);
    cfg.set(DayType::Weekday, "PM", 1);
    cfg.cat_per_head.insert("NS".to_string(), 2);
    cfg
}

fn run_build(
    staff: &[StaffMember],
    cfg: &QuotaConfig,
    pre: &[PreAssignment],
    start: NaiveDate,
    end: NaiveDate,
    seed: u64,
) -> (Schedule, DeficitReport, QuotaOutcome) {
    let catalog = standard_catalog();
    let params = EngineParams {
        rng_seed: seed,
        ..EngineParams::default()
    };
    let oracle = SetHolidayOracle::default();
    let outcome = QuotaEngine::new(params.clone())
        .compute(staff, &catalog, cfg, &oracle, start, end)
        .expect("quota computation");
    let (schedule, report) = {
        let mut allocator = SlotAllocator::new(staff, &catalog, cfg, &outcome, params);
        allocator
            .build(&oracle, pre, start, end)
            .expect("allocator build")
    };
    (schedule, report, outcome)
}

/// 隔离不变式: 长夜班当日独占,且不与次日任何班或前日长夜班共存
fn assert_long_night_isolation(schedule: &Schedule, staff: &[StaffMember]) {
    let catalog = standard_catalog();
    let ln: Vec<String> = catalog.long_night_abbrevs();
    for member in staff {
        for window in schedule.days.windows(2) {
            let holds_ln_today = window[0]
                .slots_of(&member.name)
                .any(|s| ln.contains(&s.abbrev));
            if !holds_ln_today {
                continue;
            }
            assert_eq!(
                window[0].slots_of(&member.name).count(),
                1,
                "{} holds another slot besides long night on {}",
                member.name,
                window[0].date
            );
            assert_eq!(
                window[1].slots_of(&member.name).count(),
                0,
                "{} works the day after a long night ({})",
                member.name,
                window[1].date
            );
        }
    }
}

#[test]
fn test_scenario_01_week_build_respects_invariants() {
    let staff = create_test_staff();
    let (schedule, report, _) =
        run_build(&staff, &create_test_quota(), &[], d(2), d(8), 7);

    // 双重占用为零
    assert!(schedule.scan_overlaps().is_empty());
    assert_long_night_isolation(&schedule, &staff);

    // 最终缺口与班表未分配数一致(剩余阶段逐一上报)
    let remaining_unmet: u32 = report
        .phases
        .last()
        .map(|p| p.total_deficit())
        .unwrap_or(0);
    assert_eq!(schedule.unassigned_count() as u32, remaining_unmet);
}

#[test]
fn test_scenario_02_fixed_pre_assignment_is_stable() {
    let staff = create_test_staff();
    let pre = vec![PreAssignment {
        person: "dr_a".to_string(),
        date: d(4),
        period: DayPeriod::Morning,
        abbrev: "AM".to_string(),
    }];
    let (schedule, report, _) =
        run_build(&staff, &create_test_quota(), &pre, d(2), d(8), 7);

    assert!(report.pre_assign_diagnostics.is_empty());
    // 恰好一个匹配班次,且带固定标记
    let matching: Vec<_> = schedule
        .day(d(4))
        .unwrap()
        .slots
        .iter()
        .filter(|s| s.abbrev == "AM" && s.assigned_to("dr_a"))
        .collect();
    assert_eq!(matching.len(), 1);
    assert!(matching[0].fixed);
}

#[test]
fn test_scenario_03_preserve_materializes_per_pre_assignment() {
    let staff = create_test_staff();
    let mut catalog = standard_catalog();
    // 自定义保留班型: 配额为零,仅因预分配而实体化
    let mut def = catalog.effective_def("AM").unwrap();
    def.abbrev = "SPC".to_string();
    def.stat_group = None;
    def.combinations.clear();
    def.preserve = true;
    let load = catalog.load_custom(vec![def]);
    assert_eq!(load.accepted, vec!["SPC".to_string()]);

    let pre = vec![PreAssignment {
        person: "dr_b".to_string(),
        date: d(3),
        period: DayPeriod::Morning,
        abbrev: "SPC".to_string(),
    }];
    let params = EngineParams::default();
    let oracle = SetHolidayOracle::default();
    let cfg = create_test_quota();
    let outcome = QuotaEngine::new(params.clone())
        .compute(&staff, &catalog, &cfg, &oracle, d(2), d(8))
        .unwrap();
    let mut allocator = SlotAllocator::new(&staff, &catalog, &cfg, &outcome, params);
    let (schedule, report) = allocator.build(&oracle, &pre, d(2), d(8)).unwrap();

    assert!(report.pre_assign_diagnostics.is_empty());
    // 全周期恰好一个 SPC 班次: 预分配命中日
    let spc_total: usize = schedule
        .days
        .iter()
        .map(|day| day.slots.iter().filter(|s| s.abbrev == "SPC").count())
        .sum();
    assert_eq!(spc_total, 1);
    assert!(schedule
        .day(d(3))
        .unwrap()
        .slots
        .iter()
        .any(|s| s.abbrev == "SPC" && s.assigned_to("dr_b") && s.fixed));
}

#[test]
fn test_scenario_04_half_share_type_cap_never_exceeded() {
    // AM 每日 1 个,9 天 → 总量 9; 半职 dr_b 目标 3.0,区间塌缩为 {3,3}
    let staff = vec![StaffMember::doctor("dr_a", 2), StaffMember::doctor("dr_b", 1)];
    let mut cfg = QuotaConfig::default();
    cfg.set(DayType::Weekday, "AM", 1);
    cfg.set(DayType::Saturday, "AM", 1);
    cfg.set(DayType::SundayHoliday, "AM", 1);

    let (schedule, _, outcome) = run_build(&staff, &cfg, &[], d(2), d(10), 11);

    let band = outcome.bands.for_type("dr_b", "AM");
    assert_eq!((band.min, band.max), (3, 3));
    // 即便仍有空位,也绝不超过半职上限
    assert!(schedule.count_of("dr_b", "AM") <= 3);
}

#[test]
fn test_scenario_05_cat_receives_exact_per_head_quota() {
    let staff = create_test_staff();
    let (schedule, _, _) = run_build(&staff, &create_test_quota(), &[], d(2), d(8), 3);

    // 人头配额 2,既不多也不少(本场景夜班充足)
    assert_eq!(schedule.count_of("cat_x", "NS"), 2);
    // CAT 不承接无人头配额的班型
    assert_eq!(schedule.count_of("cat_x", "AM"), 0);
}

#[test]
fn test_scenario_06_overlapping_pre_assignment_diagnosed() {
    let staff = create_test_staff();
    let mut cfg = create_test_quota();
    cfg.set(DayType::Weekday, "PMC", 1);
    cfg.set(DayType::Weekday, "AM9", 1);

    // PM 14:00-20:00 与 PMC 14:30-20:00 重叠
    let pre = vec![
        PreAssignment {
            person: "dr_a".to_string(),
            date: d(4),
            period: DayPeriod::Afternoon,
            abbrev: "PM".to_string(),
        },
        PreAssignment {
            person: "dr_a".to_string(),
            date: d(4),
            period: DayPeriod::Afternoon,
            abbrev: "PMC".to_string(),
        },
    ];
    let (schedule, report, _) = run_build(&staff, &cfg, &pre, d(2), d(8), 5);

    assert_eq!(report.pre_assign_diagnostics.len(), 1);
    assert!(report.pre_assign_diagnostics[0].reason.contains("OVERLAP"));
    assert!(schedule.find_assigned(d(4), "PM", "dr_a").is_some());
    assert!(schedule.find_assigned(d(4), "PMC", "dr_a").is_none());
}

#[test]
fn test_scenario_07_same_seed_same_roster() {
    let staff = create_test_staff();
    let cfg = create_test_quota();
    let (first, _, _) = run_build(&staff, &cfg, &[], d(2), d(8), 42);
    let (second, _, _) = run_build(&staff, &cfg, &[], d(2), d(8), 42);

    let a = serde_json::to_string(&first).unwrap();
    let b = serde_json::to_string(&second).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_scenario_08_night_kinds_respect_group_structure() {
    let staff = create_test_staff();
    let (schedule, _, outcome) = run_build(&staff, &create_test_quota(), &[], d(2), d(8), 9);

    // 医生长夜班持有量不超过其种类聚合上限
    let catalog = standard_catalog();
    let params = EngineParams::default();
    let total_shares = 5; // 2 + 2 + 1
    let ln_residual = outcome.residual_of("LN");
    for member in staff.iter().filter(|m| m.share > 0) {
        let band = QuotaEngine::round_ideal(
            ln_residual as f64 * member.share as f64 / total_shares as f64,
            member.share,
            &params,
        );
        let held: u32 = catalog
            .long_night_abbrevs()
            .iter()
            .map(|a| schedule.count_of(&member.name, a))
            .sum();
        assert!(
            held <= band.max,
            "{} holds {} long nights, max {}",
            member.name,
            held,
            band.max
        );
    }
}

#[test]
fn test_scenario_09_pair_goes_to_desiderata_heavy_member() {
    // 单个工作日仅一对 AM9+PMC; dr_b 心愿密集(全在周期之外,不拦腿),
    // 其余评分项两人相同 → 任意种子下组合班都应落给 dr_b
    let wish = |day: u32| Desiderata {
        start_date: d(day),
        end_date: d(day),
        period: DayPeriod::Evening,
        priority: DesiderataPriority::Secondary,
    };
    let staff = vec![
        StaffMember::doctor("dr_a", 2),
        StaffMember::doctor("dr_b", 2)
            .with_desiderata(wish(9))
            .with_desiderata(wish(10))
            .with_desiderata(wish(11)),
    ];
    let mut cfg = QuotaConfig::default();
    cfg.set(DayType::Weekday, "AM9", 1);
    cfg.set(DayType::Weekday, "PMC", 1);

    for seed in [1, 7, 42] {
        let (schedule, _, _) = run_build(&staff, &cfg, &[], d(2), d(2), seed);
        assert!(
            schedule.find_assigned(d(2), "AM9", "dr_b").is_some(),
            "seed {}: AM9 not given to dr_b",
            seed
        );
        assert!(
            schedule.find_assigned(d(2), "PMC", "dr_b").is_some(),
            "seed {}: PMC not given to dr_b",
            seed
        );
    }
}

// ==========================================
// 排班全流程集成测试
// ==========================================
// 职责: 额度 → 分配 → 优化 → 回溯 → 复核的完整流水线验证
// ==========================================

use chrono::NaiveDate;
use duty_roster_aps::{
    standard_catalog, DayPeriod, DayType, Desiderata, DesiderataPriority, EngineParams,
    PreAssignment, QuotaConfig, RosterOrchestrator, RosterRun, SetHolidayOracle, StaffMember,
};

// ==========================================
// 测试辅助函数
// ==========================================

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

fn create_test_staff() -> Vec<StaffMember> {
    vec![
        StaffMember::doctor("dr_a", 2).with_desiderata(Desiderata {
            start_date: d(9),
            end_date: d(11),
            period: DayPeriod::Evening,
            priority: DesiderataPriority::Primary,
        }),
        StaffMember::doctor("dr_b", 2).with_desiderata(Desiderata {
            start_date: d(4),
            end_date: d(5),
            period: DayPeriod::Morning,
            priority: DesiderataPriority::Secondary,
        }),
        StaffMember::doctor("dr_c", 2),
        StaffMember::doctor("dr_d", 1),
        StaffMember::cat("cat_x"),
    ]
}

fn create_test_quota() -> QuotaConfig {
    let mut cfg = QuotaConfig::default();
    for day_type in [DayType::Weekday, DayType::Saturday, DayType::SundayHoliday] {
        cfg.set(day_type, "LN", 1);
        cfg.set(day_type, "NS", 1);
        cfg.set(day_type, "AM", 1);
        cfg.set(day_type, "PM", 1);
    }
    cfg.cat_per_head.insert("NS".to_string(), 2);
    cfg
}

fn create_pre_assignments() -> Vec<PreAssignment> {
    vec![PreAssignment {
        person: "dr_c".to_string(),
        date: d(6),
        period: DayPeriod::Evening,
        abbrev: "LN".to_string(),
    }]
}

fn run_full(seed: u64) -> RosterRun {
    duty_roster_aps::logging::init_test();
    let catalog = standard_catalog();
    // 2026-03-05(周四)为节假日: 周期内含桥日
    let oracle = SetHolidayOracle::new([d(5)]);
    RosterOrchestrator::new(EngineParams {
        rng_seed: seed,
        ..EngineParams::default()
    })
    .run(
        &create_test_staff(),
        &catalog,
        &create_test_quota(),
        &oracle,
        &create_pre_assignments(),
        d(2),
        d(15),
    )
    .unwrap()
}

// ==========================================
// 全流程性质
// ==========================================

#[test]
fn test_full_run_final_roster_is_clean() {
    let run = run_full(42);

    // 终检: 无双重占用,预分配复核无新增诊断
    assert!(run.schedule.scan_overlaps().is_empty());
    assert!(run.deficit.pre_assign_diagnostics.is_empty());
    assert!(run.deficit.rejected_mutations.is_empty());
}

#[test]
fn test_full_run_primary_desiderata_respected_end_to_end() {
    let run = run_full(42);

    // dr_a 03-09 至 03-11 晚间硬不可用: 优化与回溯之后仍不得排夜班
    for day in &run.schedule.days {
        if day.date >= d(9) && day.date <= d(11) {
            for slot in day.slots_of("dr_a") {
                assert!(
                    !matches!(slot.abbrev.as_str(), "LN" | "NS"),
                    "dr_a assigned {} on {}",
                    slot.abbrev,
                    day.date
                );
            }
        }
    }
}

#[test]
fn test_full_run_fixed_slot_survives_optimize_and_backtrack() {
    let run = run_full(42);

    let day = run.schedule.day(d(6)).unwrap();
    let fixed = day
        .slots
        .iter()
        .filter(|s| s.abbrev == "LN" && s.fixed && s.assigned_to("dr_c"))
        .count();
    assert_eq!(fixed, 1);
}

#[test]
fn test_full_run_optimizer_never_degrades_score() {
    let run = run_full(42);
    assert!(run.optimizer.final_score >= run.optimizer.initial_score);
}

#[test]
fn test_full_run_is_deterministic_per_seed() {
    let a = run_full(99);
    let b = run_full(99);
    assert_eq!(
        serde_json::to_string(&a.schedule).unwrap(),
        serde_json::to_string(&b.schedule).unwrap()
    );
    assert_eq!(a.optimizer.committed, b.optimizer.committed);
    assert_eq!(a.backtrack.placed, b.backtrack.placed);
}

#[test]
fn test_full_run_round_trips_through_json() {
    let run = run_full(42);

    // 展示层以 JSON 消费整个运行结果,含元组键的区间表与日型需求表
    let json = serde_json::to_string(&run).unwrap();
    let back: RosterRun = serde_json::from_str(&json).unwrap();

    assert_eq!(
        serde_json::to_string(&back.schedule).unwrap(),
        serde_json::to_string(&run.schedule).unwrap()
    );
    assert_eq!(
        back.outcome.bands.for_type("dr_a", "LN"),
        run.outcome.bands.for_type("dr_a", "LN")
    );
    assert_eq!(back.outcome.per_day_type, run.outcome.per_day_type);
    assert_eq!(back.deficit.total_deficit(), run.deficit.total_deficit());
    assert_eq!(back.optimizer.committed, run.optimizer.committed);
    assert_eq!(back.backtrack.placed, run.backtrack.placed);
}

#[test]
fn test_full_run_backtrack_only_adds_assignments() {
    let catalog = standard_catalog();
    let oracle = SetHolidayOracle::new([d(5)]);
    let orchestrator = RosterOrchestrator::new(EngineParams {
        rng_seed: 7,
        ..EngineParams::default()
    });
    let staff = create_test_staff();
    let quota = create_test_quota();

    let (mut schedule, outcome, _) = orchestrator
        .build_schedule(&staff, &catalog, &quota, &oracle, &[], d(2), d(15))
        .unwrap();
    orchestrator.optimize(&mut schedule, &staff, &catalog, &outcome);
    let before = schedule.unassigned_count();

    let summary = orchestrator.solve_residual(&mut schedule, &staff, &catalog, None);
    let after = schedule.unassigned_count();

    assert_eq!(before - after, summary.placed as usize);
    assert!(after <= before);
}

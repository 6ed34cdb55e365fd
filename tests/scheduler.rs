use std::path::PathBuf;

use tinycity::{
    building::BuildingKind,
    engine::{Engine, EngineBuilder, EngineSettings, TickOutcome, ROLLOVER_STEP},
    power::FrozenPower,
    scenario::{ScenarioGoals, ScenarioLoader},
    world::Mode,
    World,
};

const TICKS_PER_MONTH: u64 = ROLLOVER_STEP as u64 + 1;

fn engine(goals: Option<ScenarioGoals>) -> Engine {
    EngineBuilder::new(EngineSettings {
        scenario_name: "scheduler".into(),
        goals,
        snapshot_interval_months: 0,
        snapshot_dir: PathBuf::from("unused"),
    })
    .with_power(FrozenPower)
    .build()
}

#[test]
fn a_month_takes_one_full_cursor_sweep() {
    let mut engine = engine(None);
    let mut world = World::default();
    for _ in 1..TICKS_PER_MONTH {
        let outcome = engine.tick(&mut world);
        assert!(!matches!(outcome, TickOutcome::MonthRollover { .. }));
    }
    assert_eq!(world.cursor, ROLLOVER_STEP);
    assert_eq!(
        engine.tick(&mut world),
        TickOutcome::MonthRollover { year_end: false }
    );
    assert_eq!((world.cursor, world.month), (0, 1));
}

#[test]
fn fast_forward_shortens_the_month() {
    let mut engine = engine(None);
    let mut world = World::default();
    world.set_fast(true);
    let mut rollovers = 0;
    for _ in 0..133 * 3 {
        if let TickOutcome::MonthRollover { .. } = engine.tick(&mut world) {
            rollovers += 1;
        }
    }
    assert_eq!(rollovers, 3);
    assert_eq!(world.month, 3);
}

#[test]
fn pause_freezes_everything() {
    let mut engine = engine(None);
    let mut world = World::default();
    world.insert_building(BuildingKind::Industrial, 5, 5).unwrap();
    world.buildings.get_mut(0).unwrap().on_fire = 2;
    world.set_paused(true);
    let before = world.clone();
    for _ in 0..1_000 {
        assert_eq!(engine.tick(&mut world), TickOutcome::Paused);
    }
    assert_eq!(world, before);
}

#[test]
fn rubble_clears_after_its_countdown() {
    let mut engine = engine(None);
    let mut world = World::default();
    let slot = world.insert_building(BuildingKind::Stadium, 20, 20).unwrap();
    world.buildings.get_mut(slot).unwrap().destroy();
    world.buildings.get_mut(slot).unwrap().on_fire = 3;

    for _ in 0..3 * TICKS_PER_MONTH {
        engine.tick(&mut world);
    }
    let ruin = world.building(slot).unwrap();
    assert_eq!((ruin.kind, ruin.on_fire), (BuildingKind::RubbleLarge, 0));

    for _ in 0..TICKS_PER_MONTH {
        engine.tick(&mut world);
    }
    assert!(!world.building(slot).unwrap().exists());
}

#[test]
fn scenario_is_judged_once_at_the_goal_year_end() {
    let scenario = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/rural_growth.yaml")
        .expect("scenario should load");
    let mut world = scenario.build_world().expect("world builds");
    let goals = ScenarioGoals {
        year: world.year,
        funds: 0,
        residential: 0,
        commercial: 0,
        industrial: 0,
        buildings: Vec::new(),
    };
    let mut engine = engine(Some(goals));

    for _ in 1..12 * TICKS_PER_MONTH {
        engine.tick(&mut world);
        assert!(!world.scenario.decided());
    }
    assert_eq!(
        engine.tick(&mut world),
        TickOutcome::MonthRollover { year_end: true }
    );
    assert!(world.scenario.won);
    assert_eq!(world.mode, Mode::ScenarioWon);
    assert_eq!(engine.tick(&mut world), TickOutcome::Blocked);

    assert!(world.acknowledge());
    for _ in 0..12 * TICKS_PER_MONTH {
        engine.tick(&mut world);
        if world.mode.blocks_simulation() {
            assert!(matches!(world.mode, Mode::BudgetReview { .. }));
            break;
        }
    }
    assert!(world.scenario.won && !world.scenario.lost);
}

use grid_lib::{Cell, Direction, NoiseSettings};
use std::cell::RefCell;
use std::rc::Rc;
use tactics_lib::*;
use turn_lib::{CombatantTemplate, Team, TurnEvent};

const SKIRMISH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/skirmish.toml");

// 地圖（y 為列）：
// K . . . . . L
// . . # . . . .
// . . # . . O .
// . . . . . . .
// A . . F F . G
fn skirmish() -> Session {
    let mut session = Session::load(SKIRMISH).unwrap();
    session.start();
    session
}

fn record_session(session: &mut Session) -> Rc<RefCell<Vec<SessionEvent>>> {
    let log = Rc::new(RefCell::new(vec![]));
    let sink = log.clone();
    session
        .events_mut()
        .subscribe(move |event: &SessionEvent| sink.borrow_mut().push(event.clone()));
    log
}

fn record_turns(session: &mut Session) -> Rc<RefCell<Vec<TurnEvent>>> {
    let log = Rc::new(RefCell::new(vec![]));
    let sink = log.clone();
    session
        .scheduler_mut()
        .events_mut()
        .subscribe(move |event: &TurnEvent| sink.borrow_mut().push(event.clone()));
    log
}

#[test]
fn test_load_skirmish() {
    let session = skirmish();
    let test_data = [
        (1, Cell::new(0, 0)),
        (2, Cell::new(0, 4)),
        (3, Cell::new(5, 2)),
        (4, Cell::new(6, 4)),
    ];
    for (id, cell) in test_data {
        assert_eq!(session.position_of(id), Some(cell), "{id}");
    }

    // CTB：archer 速度最快
    assert_eq!(session.scheduler().active_id(), Some(2));
    let registry = session.registry();
    assert!(registry.has(1, Capability::Selectable));
    assert!(!registry.has(3, Capability::Selectable));
    assert!(registry.has(3, Capability::NoiseListener));
    assert!(registry.has(100, Capability::NoiseListener));
    assert!(!registry.has(100, Capability::Combatant));
    assert_eq!(session.noise().position_of(100), Some(Cell::new(6, 0)));
    for cell in [Cell::new(3, 4), Cell::new(4, 4)] {
        assert_eq!(
            session.tile_effect_at(cell).map(|e| e.name.as_str()),
            Some("fire"),
            "{cell:?}"
        );
    }
    assert!(session.tile_effect_at(Cell::new(5, 4)).is_none());
}

#[test]
fn test_walkable() {
    let session = skirmish();
    let test_data = [
        (Cell::new(0, 4), true),
        (Cell::new(0, 0), false),
        (Cell::new(2, 1), false),
        (Cell::new(7, 0), false),
        (Cell::new(1, 1), true),
        (Cell::new(5, 2), false),
    ];
    for (cell, expected) in test_data {
        assert_eq!(session.walkable(cell), expected, "{cell:?}");
    }
}

#[test]
fn test_move_onto_fire() {
    let mut session = skirmish();
    let log = record_session(&mut session);

    let area = session.moveable_area().unwrap();
    assert!(area.can_move_to(Cell::new(3, 4)));
    let path = session.move_active(Cell::new(3, 4)).unwrap();
    assert_eq!(path, vec![Cell::new(1, 4), Cell::new(2, 4), Cell::new(3, 4)]);
    assert_eq!(session.position_of(2), Some(Cell::new(3, 4)));
    assert_eq!(
        log.borrow().last(),
        Some(&SessionEvent::CombatantMoved {
            combatant: 2,
            from: Cell::new(0, 4),
            to: Cell::new(3, 4),
            path: path.clone(),
            sprinted: false,
        })
    );

    let err = session.move_active(Cell::new(3, 3)).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Session(SessionError::AlreadyMoved { id: 2 })
    ));

    session.end_turn();
    let archer = session.scheduler().combatant(2).unwrap();
    assert!(archer.effects.iter().any(|e| e.name == "fire"));
    assert_ne!(session.scheduler().active_id(), Some(2));
}

#[test]
fn test_sprint_and_reach() {
    let mut session = skirmish();
    let log = record_session(&mut session);

    assert_eq!(session.move_active(Cell::new(0, 4)).unwrap(), vec![]);
    for cell in [Cell::new(0, 0), Cell::new(6, 0), Cell::new(2, 2)] {
        let err = session.move_active(cell).unwrap_err();
        assert!(
            matches!(err.kind(), ErrorKind::Session(SessionError::OutOfReach { .. })),
            "{cell:?}"
        );
    }

    session.move_active(Cell::new(5, 3)).unwrap();
    match log.borrow().last() {
        Some(SessionEvent::CombatantMoved { sprinted, .. }) => assert!(*sprinted),
        other => panic!("unexpected {other:?}"),
    }
    let (walk, sprint) = {
        let area = session.moveable_area().unwrap();
        (area.walkable.len(), area.sprintable.len())
    };
    assert!(walk < sprint);
    let (walk_edges, sprint_edges) = session.moveable_outline().unwrap();
    assert!(!walk_edges.is_empty());
    assert!(!sprint_edges.is_empty());
}

#[test]
fn test_arrow_and_cooldown() {
    let mut session = skirmish();
    let report = session.cast_ability_at("arrow", Cell::new(5, 2)).unwrap();
    assert_eq!(report.targets, vec![3]);
    assert_eq!(session.scheduler().combatant(3).unwrap().hp, 12);
    assert_eq!(session.scheduler().combatant(2).unwrap().mp, 8);

    let err = session.cast_ability_at("arrow", Cell::new(5, 2)).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Turn(turn_lib::Error::AbilityOnCooldown { .. })
    ));
}

#[test]
fn test_range_and_line_of_sight() {
    let mut session = skirmish();
    let err = session.cast_ability_at("mend", Cell::new(0, 0)).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Session(SessionError::OutOfRange { .. })
    ));

    // (0,4) -> (3,1) 的斜線被 (2,2) 的牆擋住
    let err = session.cast_ability_at("arrow", Cell::new(3, 1)).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Session(SessionError::NoLineOfSight { x: 3, y: 1 })
    ));
    assert!(session.scheduler().usable_ability("arrow").is_ok());
    assert_eq!(session.scheduler().combatant(2).unwrap().mp, 10);

    let report = session.cast_ability_at("mend", Cell::new(0, 4)).unwrap();
    assert_eq!(report.targets, vec![2]);
}

#[test]
fn test_fireball_area() {
    let mut session = skirmish();
    let fireball = session
        .scheduler()
        .usable_ability("fireball")
        .unwrap();
    let cells = session.affected_cells(&fireball, Cell::new(4, 2)).unwrap();
    let expected = [
        Cell::new(3, 2),
        Cell::new(4, 1),
        Cell::new(4, 2),
        Cell::new(4, 3),
        Cell::new(5, 2),
    ];
    assert_eq!(cells.into_iter().collect::<Vec<_>>(), expected);

    assert!(session.cast_ability_at("fireball", Cell::new(5, 3)).is_err());
    let report = session.cast_ability_at("fireball", Cell::new(4, 2)).unwrap();
    assert_eq!(report.targets, vec![3]);
    let orc = session.scheduler().combatant(3).unwrap();
    assert_eq!(orc.hp, 11);
    assert!(orc.effects.iter().any(|e| e.name == "burn"));
}

#[test]
fn test_noise_reaches_listeners() {
    let mut session = skirmish();
    let log = record_session(&mut session);

    let heard = session
        .emit_noise(Cell::new(6, 2), NoiseSettings::default())
        .unwrap();
    let listeners: Vec<_> = heard.iter().map(|h| (h.listener, h.volume)).collect();
    assert_eq!(listeners, vec![(3, 9.0), (100, 8.0)]);
    assert_eq!(log.borrow().len(), 2);

    let quiet = NoiseSettings {
        initial: 3.0,
        ..Default::default()
    };
    let heard = session.emit_noise(Cell::new(6, 2), quiet).unwrap();
    assert_eq!(heard.iter().map(|h| h.listener).collect::<Vec<_>>(), vec![100]);

    let heard = session.emit_default_noise(Cell::new(6, 2)).unwrap();
    assert_eq!(heard.len(), 2);

    // 音量不衰減時拒絕擴散
    let endless = NoiseSettings {
        decay: 0.0,
        ..Default::default()
    };
    let err = session.emit_noise(Cell::new(6, 2), endless).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Grid(grid_lib::Error::InvalidParameter { .. })
    ));
    assert_eq!(log.borrow().len(), 5);
}

#[test]
fn test_defeated_listener_stops_hearing() {
    let mut session = skirmish();
    session.scheduler_mut().combatant_mut(3).unwrap().hp = 1;
    let report = session.cast_ability_at("arrow", Cell::new(5, 2)).unwrap();
    assert_eq!(report.defeated, vec![3]);

    let registry = session.registry();
    assert!(registry.has(3, Capability::Combatant));
    assert!(!registry.has(3, Capability::NoiseListener));
    assert!(!registry.has(3, Capability::Selectable));
    assert_eq!(session.noise().position_of(3), None);
    assert!(session.noise().listener_at(Cell::new(5, 2)).is_none());
    assert!(session.walkable(Cell::new(5, 2)));

    let heard = session
        .emit_noise(Cell::new(6, 2), NoiseSettings::default())
        .unwrap();
    assert_eq!(heard.iter().map(|h| h.listener).collect::<Vec<_>>(), vec![100]);
}

#[test]
fn test_listener_follows_combatant() {
    let mut session = skirmish();
    for _ in 0..10 {
        if session.scheduler().active_id() == Some(3) {
            break;
        }
        session.end_turn();
    }
    assert_eq!(session.scheduler().active_id(), Some(3));

    session.move_active(Cell::new(5, 3)).unwrap();
    assert_eq!(session.noise().position_of(3), Some(Cell::new(5, 3)));
    assert!(session.noise().listener_at(Cell::new(5, 2)).is_none());
}

#[test]
fn test_spawn_waits_for_tick() {
    let mut session = skirmish();
    let session_log = record_session(&mut session);
    let turn_log = record_turns(&mut session);

    let stats = CombatantTemplate {
        name: "squire".to_string(),
        speed: 7,
        ..Default::default()
    };
    let id = session.spawn_combatant(&stats, Cell::new(0, 0)).unwrap();
    assert_eq!(id, 101);
    assert_eq!(session.position_of(id), Some(Cell::new(0, 1)));
    assert_eq!(session.scheduler().combatant(id).unwrap().team, Team::A);
    assert!(session.registry().has(id, Capability::Selectable));
    assert_eq!(session.scheduler().active_id(), Some(2));
    assert!(session_log.borrow().is_empty());
    assert!(turn_log.borrow().is_empty());

    assert_eq!(session.tick(), 2);
    assert_eq!(
        session_log.borrow().as_slice(),
        &[SessionEvent::CombatantSpawned {
            combatant: id,
            cell: Cell::new(0, 1)
        }]
    );
    assert!(matches!(turn_log.borrow()[0], TurnEvent::TurnOrderSet(ref ids) if ids.contains(&id)));
    assert_eq!(session.tick(), 0);
}

#[test]
fn test_unexplored_and_cover() {
    let session = skirmish();
    let target = session.unexplored_target(&[Cell::new(0, 4)]).unwrap();
    assert_eq!(target, Some(Cell::new(0, 1)));

    let cover = session.cover_around_active(2).unwrap();
    assert_eq!(cover.len(), 1);
    assert_eq!(cover[0].cell, Cell::new(1, 2));
    assert_eq!(cover[0].direction, Direction::Right);
}

#[test]
fn test_load_errors() {
    let err = Session::load(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/unknown_ability.toml"
    ))
    .unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Turn(turn_lib::Error::AbilityNotFound { .. })
    ));
    let message = err.to_string();
    assert!(message.contains("建立戰鬥者 1"));
    assert!(message.contains("載入場景"));

    let test_data = [
        // 標記不存在
        ("[grid]\nmap = \". .\"\n[[combatants]]\nid = 1\nteam = \"A\"\nmarker = \"K\"", "marker"),
        // 放在牆上
        ("[grid]\nmap = \". #\"\n[[combatants]]\nid = 1\nteam = \"A\"\ncell = { x = 1, y = 0 }", "wall"),
        // 編號重複
        (
            "[grid]\nmap = \". .\"\n[[combatants]]\nid = 1\nteam = \"A\"\ncell = { x = 0, y = 0 }\n[[noise_listeners]]\nid = 1\n[[noise_listeners]]\nid = 1",
            "duplicate",
        ),
        // 跟隨戰鬥者的監聽者不能指定位置
        (
            "[grid]\nmap = \". .\"\n[[combatants]]\nid = 1\nteam = \"A\"\ncell = { x = 0, y = 0 }\n[[noise_listeners]]\nid = 1\ncell = { x = 1, y = 0 }",
            "follow",
        ),
    ];
    for (content, case) in test_data {
        let config = SessionConfig::from_toml_str(content, case).unwrap();
        let err = Session::from_config(&config).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Load(_)), "{case}: {err}");
    }

    let config =
        SessionConfig::from_toml_str("[grid]\nmap = \". .\"\n[noise]\ndecay = 0.0", "silent").unwrap();
    let err = Session::from_config(&config).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Grid(_)));
    assert!(err.to_string().contains("場景預設噪音參數"));
}

use proptest::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use seabattle::{BoardError, Cell, Direction, GameEngine, ShipType, BOARD_SIZE};

fn touching(a: (usize, usize), b: (usize, usize)) -> bool {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1) <= 1
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_fleets_never_touch(seed in any::<u64>()) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let engine = GameEngine::with_random_fleet(&mut rng).unwrap();
        prop_assert!(engine.all_ships_placed());
        let ships: Vec<Vec<(usize, usize)>> = engine.ships().map(|s| s.cells().collect()).collect();
        for (i, a) in ships.iter().enumerate() {
            for b in ships.iter().skip(i + 1) {
                for &ca in a {
                    for &cb in b {
                        prop_assert!(!touching(ca, cb), "{:?} touches {:?}", ca, cb);
                    }
                }
            }
        }
    }

    #[test]
    fn arbitrary_placements_keep_the_fleet_legal(
        attempts in proptest::collection::vec((0..BOARD_SIZE, 0..BOARD_SIZE, 0..4usize, 0..4usize), 1..60)
    ) {
        let mut engine = GameEngine::new();
        for (x, y, t, d) in attempts {
            let ship_type = ShipType::ALL[t];
            let before = engine.available(ship_type);
            match engine.place_ship(x, y, ship_type, Direction::ALL[d]) {
                Ok(()) => prop_assert_eq!(engine.available(ship_type), before - 1),
                Err(BoardError::AlreadyPlaced) => prop_assert_eq!(before, 0),
                Err(e) => prop_assert_eq!(e, BoardError::Overlap),
            }
        }
        let ships: Vec<Vec<(usize, usize)>> = engine.ships().map(|s| s.cells().collect()).collect();
        for (i, a) in ships.iter().enumerate() {
            for b in ships.iter().skip(i + 1) {
                for &ca in a {
                    for &cb in b {
                        prop_assert!(!touching(ca, cb));
                    }
                }
            }
        }
    }

    #[test]
    fn second_attack_on_a_cell_changes_nothing(seed in any::<u64>(), x in 0..BOARD_SIZE, y in 0..BOARD_SIZE) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut engine = GameEngine::with_random_fleet(&mut rng).unwrap();
        for _ in 0..rng.random_range(0..30) {
            let _ = engine.receive_attack(rng.random_range(0..BOARD_SIZE), rng.random_range(0..BOARD_SIZE));
        }
        let _ = engine.receive_attack(x, y);
        let after = engine.own_board().clone();
        prop_assert_eq!(engine.receive_attack(x, y), Err(BoardError::AlreadyAttacked));
        prop_assert_eq!(engine.own_board(), &after);
    }

    #[test]
    fn every_ship_cell_hit_sinks_the_fleet(seed in any::<u64>()) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut engine = GameEngine::with_random_fleet(&mut rng).unwrap();
        let cells: Vec<(usize, usize)> = engine.ships().flat_map(|s| s.cells().collect::<Vec<_>>()).collect();
        let mut destroyed = 0;
        for (x, y) in cells {
            prop_assert!(!engine.all_ships_destroyed());
            if engine.receive_attack(x, y).unwrap().destroy {
                destroyed += 1;
            }
        }
        prop_assert_eq!(destroyed, 10);
        prop_assert!(engine.all_ships_destroyed());
        prop_assert_eq!(engine.own_board().count(Cell::Hit), 20);
    }
}

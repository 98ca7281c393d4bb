#![allow(clippy::float_cmp)]

use reparto_highs::HighsSolver;
use reparto_seats::{ElectionConfig, NationalModel, Outcome};

fn config(json: serde_json::Value) -> ElectionConfig {
    serde_json::from_value(json).unwrap()
}

fn solve(config: &ElectionConfig) -> Outcome {
    let national = NationalModel::build(config).expect("Failed to build model");
    let mut solver = HighsSolver::new();
    let outcome = national.solve_with(&mut solver).expect("Failed to solve");
    assert!(outcome.status.is_optimal(), "status: {}", outcome.status);
    outcome
}

/// The classic four-party district: a=100, b=80, c=50, d=20 with five
/// seats allocates a:2, b:2, c:1, d:0.
fn classic_district() -> serde_json::Value {
    serde_json::json!({
        "num_seats": 5,
        "parties": {
            "a": { "votes": 100.0, "wing": "left" },
            "b": { "votes": 80.0, "wing": "right" },
            "c": { "votes": 50.0, "wing": "left" },
            "d": { "votes": 20.0, "wing": "right" }
        }
    })
}

#[test]
fn zero_permeability_reproduces_the_observed_allocation() {
    let outcome = solve(&config(serde_json::json!({
        "districts": { "capital": classic_district() }
    })));

    let district = outcome.district("capital").unwrap();
    assert_eq!(district.parties["a"].final_seats, 2);
    assert_eq!(district.parties["b"].final_seats, 2);
    assert_eq!(district.parties["c"].final_seats, 1);
    assert_eq!(district.parties["d"].final_seats, 0);

    for party in district.parties.values() {
        assert_eq!(party.initial_seats, party.final_seats);
        assert!((party.final_votes - party.initial_votes).abs() < 1e-6);
        for &moved in party.outflow.values() {
            assert!(moved.abs() < 1e-6);
        }
    }

    let total_votes: f64 = district.parties.values().map(|p| p.final_votes).sum();
    assert!((total_votes - 250.0).abs() < 1e-6);
    assert_eq!(outcome.total_final_seats(), 5);
}

#[test]
fn wing_seats_equal_the_sum_of_member_party_seats() {
    let outcome = solve(&config(serde_json::json!({
        "districts": { "capital": classic_district() }
    })));

    let district = outcome.district("capital").unwrap();
    assert_eq!(district.wings["left"].final_seats, 3);
    assert_eq!(district.wings["right"].final_seats, 2);

    let left_votes =
        district.parties["a"].final_votes + district.parties["c"].final_votes;
    assert!((district.wings["left"].final_votes - left_votes).abs() < 1e-6);
}

#[test]
fn permeability_lets_the_solver_shift_a_seat() {
    // With up to half of b's votes allowed to flow to a, and a's seats
    // heavily rewarded, the cheapest way to a third seat for a is a
    // transfer of 35 votes. The cap is 0.5 * 80 = 40.
    let outcome = solve(&config(serde_json::json!({
        "districts": { "capital": classic_district() },
        "settings": {
            "default": {
                "party_permeability": { "b": { "a": 0.5 } },
                "weights": {
                    "party_seats": { "a": 10.0 },
                    "default_party_movements": -0.001,
                    "default_wing_movements": -0.001
                }
            }
        }
    })));

    let district = outcome.district("capital").unwrap();
    assert_eq!(district.parties["a"].final_seats, 3);

    let moved = district.parties["b"].outflow["a"];
    assert!(
        (34.9..=40.01).contains(&moved),
        "expected a transfer near 35, got {}",
        moved
    );
    assert!((district.parties["a"].final_votes - (100.0 + moved)).abs() < 1e-6);
    assert!((district.parties["b"].final_votes - (80.0 - moved)).abs() < 1e-6);

    // Conservation holds after the shift.
    let total_votes: f64 = district.parties.values().map(|p| p.final_votes).sum();
    assert!((total_votes - 250.0).abs() < 1e-6);

    // The wing-level flow mirrors the party-level one.
    let wing_moved = district.wings["right"].outflow["left"];
    assert!((wing_moved - moved).abs() < 1e-6);
}

#[test]
fn permeability_caps_are_respected() {
    let outcome = solve(&config(serde_json::json!({
        "districts": { "capital": classic_district() },
        "settings": {
            "default": {
                "party_permeability": { "b": { "a": 0.2 } },
                "weights": {
                    "party_seats": { "a": 10.0 },
                    "default_party_movements": -0.001,
                    "default_wing_movements": -0.001
                }
            }
        }
    })));

    // 0.2 * 80 = 16 votes may move, not enough for a's third seat
    // (35 needed), so the allocation stays put.
    let district = outcome.district("capital").unwrap();
    assert_eq!(district.parties["a"].final_seats, 2);
    assert!(district.parties["b"].outflow["a"] <= 16.0 + 1e-6);
}

#[test]
fn fixed_history_rounds_keep_their_winners() {
    // Rounds 1 and 2 are treated as already decided (a, then b); only
    // rounds 3..=5 are modeled with full disjunctions. Under zero
    // permeability the result still matches the plain replay.
    let outcome = solve(&config(serde_json::json!({
        "districts": { "capital": classic_district() },
        "settings": {
            "default": { "first_contested_seat": 3 }
        }
    })));

    let district = outcome.district("capital").unwrap();
    assert_eq!(district.parties["a"].final_seats, 2);
    assert_eq!(district.parties["b"].final_seats, 2);
    assert_eq!(district.parties["c"].final_seats, 1);
    assert_eq!(district.parties["d"].final_seats, 0);
}

#[test]
fn national_aggregates_sum_over_districts() {
    let outcome = solve(&config(serde_json::json!({
        "districts": {
            "north": classic_district(),
            "south": {
                "num_seats": 3,
                "parties": {
                    "a": { "votes": 60.0, "wing": "left" },
                    "b": { "votes": 40.0, "wing": "right" }
                }
            }
        }
    })));

    // south replays to a:2, b:1.
    let south = outcome.district("south").unwrap();
    assert_eq!(south.parties["a"].final_seats, 2);
    assert_eq!(south.parties["b"].final_seats, 1);

    assert_eq!(outcome.parties["a"].final_seats, 4);
    assert_eq!(outcome.parties["b"].final_seats, 3);
    assert!((outcome.parties["a"].final_votes - 160.0).abs() < 1e-6);
    assert_eq!(outcome.wings["left"].final_seats, 5);
    assert_eq!(outcome.total_final_seats(), 8);

    // c and d only stand in the north; their national lines still
    // exist and match that single district.
    assert_eq!(outcome.parties["c"].final_seats, 1);
    assert!((outcome.parties["d"].final_votes - 20.0).abs() < 1e-6);
}

#[test]
fn global_caps_override_local_permeability() {
    // Locally the b -> a transfer is allowed, but the national cap of
    // zero pins the cumulative flow, so no seat can move.
    let outcome = solve(&config(serde_json::json!({
        "districts": { "capital": classic_district() },
        "settings": {
            "default": {
                "party_permeability": { "b": { "a": 0.5 } },
                "weights": {
                    "party_seats": { "a": 10.0 },
                    "default_party_movements": -0.001,
                    "default_wing_movements": -0.001
                }
            },
            "global": {
                "parties": { "default": 0.0 },
                "wings": { "default": 0.0 }
            }
        }
    })));

    let district = outcome.district("capital").unwrap();
    assert_eq!(district.parties["a"].final_seats, 2);
    assert!(district.parties["b"].outflow["a"].abs() < 1e-6);
    assert!(outcome.parties["b"].outflow["a"].abs() < 1e-6);
}

#[test]
fn repeat_solves_are_deterministic() {
    let config = config(serde_json::json!({
        "districts": { "capital": classic_district() },
        "settings": {
            "default": {
                "party_permeability": { "b": { "a": 0.5 } },
                "weights": {
                    "party_seats": { "a": 10.0 },
                    "default_party_movements": -0.001,
                    "default_wing_movements": -0.001
                }
            }
        }
    }));

    let national = NationalModel::build(&config).unwrap();
    let mut solver = HighsSolver::new();
    let first = national.solve_with(&mut solver).unwrap();
    let second = national.solve_with(&mut solver).unwrap();
    assert!((first.objective_value - second.objective_value).abs() < 1e-6);
    assert_eq!(first.total_final_seats(), second.total_final_seats());
}

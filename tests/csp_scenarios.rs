//! CSP solver scenarios run through the [`Session`] facade: an
//! over-constrained seating problem with no solution, and an all-different
//! assignment problem enumerated exhaustively in deterministic order.

use hdcore::csp::{Constraint, CspSpec, Domain, SolveOptions, VariableSelection};
use hdcore::{Config, Session};

fn session() -> Session {
    Session::new(Config { dimensions: 512, ..Config::default() }).unwrap()
}

#[test]
fn three_guests_two_tables_all_different_is_unsat() {
    let mut s = session();
    let mut spec = CspSpec::default();
    for guest in ["Guest1", "Guest2", "Guest3"] {
        spec.domains.declare(Domain::explicit(guest, vec!["Table1".into(), "Table2".into()]));
    }
    spec.constraints.push(Constraint::AllDifferent(vec![
        "Guest1".into(),
        "Guest2".into(),
        "Guest3".into(),
    ]));

    let (result, _vectors) = s.solve(spec, SolveOptions::default()).unwrap();
    assert!(result.solutions.is_empty());
    assert!(!result.timed_out);
}

#[test]
fn four_guests_four_rooms_enumerates_24_solutions_in_declaration_order() {
    let mut s = session();
    let mut spec = CspSpec::default();
    let guests = ["Guest1", "Guest2", "Guest3", "Guest4"];
    let rooms = vec!["Room1".to_string(), "Room2".to_string(), "Room3".to_string(), "Room4".to_string()];
    for guest in guests {
        spec.domains.declare(Domain::explicit(guest, rooms.clone()));
    }
    spec.constraints.push(Constraint::AllDifferent(guests.iter().map(|g| g.to_string()).collect()));

    let options = SolveOptions {
        variable_selection: VariableSelection::MinimumRemainingValues,
        forward_checking: true,
        max_solutions: 24,
        ..SolveOptions::default()
    };
    let (result, vectors) = s.solve(spec, options).unwrap();

    assert_eq!(result.solutions.len(), 24);
    assert!(!result.truncated);
    assert_eq!(vectors.len(), 24);

    let first = &result.solutions[0];
    assert_eq!(first.get("Guest1").map(String::as_str), Some("Room1"));
    assert_eq!(first.get("Guest2").map(String::as_str), Some("Room2"));
    assert_eq!(first.get("Guest3").map(String::as_str), Some("Room3"));
    assert_eq!(first.get("Guest4").map(String::as_str), Some("Room4"));
}

#[test]
fn repeated_solve_with_same_inputs_is_deterministic() {
    let build_spec = || {
        let mut spec = CspSpec::default();
        for guest in ["Guest1", "Guest2", "Guest3"] {
            spec.domains.declare(Domain::explicit(guest, vec!["A".into(), "B".into(), "C".into()]));
        }
        spec.constraints.push(Constraint::AllDifferent(vec![
            "Guest1".into(),
            "Guest2".into(),
            "Guest3".into(),
        ]));
        spec
    };

    let mut s1 = session();
    let mut s2 = session();
    let (r1, _) = s1.solve(build_spec(), SolveOptions::default()).unwrap();
    let (r2, _) = s2.solve(build_spec(), SolveOptions::default()).unwrap();

    assert_eq!(r1.solutions, r2.solutions);
}

#[test]
fn solutions_satisfy_all_different_when_rechecked() {
    let mut s = session();
    let mut spec = CspSpec::default();
    for guest in ["Guest1", "Guest2", "Guest3"] {
        spec.domains.declare(Domain::explicit(guest, vec!["A".into(), "B".into(), "C".into()]));
    }
    spec.constraints.push(Constraint::AllDifferent(vec![
        "Guest1".into(),
        "Guest2".into(),
        "Guest3".into(),
    ]));

    let (result, _) = s.solve(spec, SolveOptions::default()).unwrap();
    for solution in &result.solutions {
        let mut values: Vec<&String> = solution.values().collect();
        let before = values.len();
        values.sort();
        values.dedup();
        assert_eq!(values.len(), before);
    }
}

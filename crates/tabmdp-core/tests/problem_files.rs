//! Loading the bundled demo problems from disk

use std::path::PathBuf;

use tabmdp_core::{ProblemFile, TransitionSource};

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

#[test]
fn test_three_state_demo_is_a_learning_problem() {
    let problem = ProblemFile::load(&demo("three_state.toml"))
        .unwrap()
        .into_problem(0.5)
        .unwrap();

    assert_eq!(problem.states.labels(), ["0", "1", "2"]);
    assert_eq!(problem.actions.labels(), ["a", "b"]);
    assert_eq!(problem.gamma.value(), 0.9);
    assert_eq!(problem.rewards.get(&"0".into(), &"a".into()), Some(10.0));
    assert_eq!(problem.rewards.get(&"1".into(), &"a".into()), Some(-1.0));

    match problem.source {
        TransitionSource::Trials(trials) => assert_eq!(trials.len(), 9),
        TransitionSource::Known(_) => panic!("expected trials"),
    }
}

#[test]
fn test_gridworld_demo_is_a_known_model() {
    let problem = ProblemFile::load(&demo("gridworld.json"))
        .unwrap()
        .into_problem(0.5)
        .unwrap();

    assert_eq!(problem.states.len(), 4);
    assert_eq!(problem.gamma.value(), 0.95);

    let TransitionSource::Known(model) = problem.source else {
        panic!("expected a known model");
    };
    assert!(model.max_row_error() <= 1e-9);
    assert_eq!(
        model.probability(&"door".into(), &"right".into(), &"goal".into()),
        Some(0.8)
    );
    // absent from the file, so zero
    assert_eq!(
        model.probability(&"start".into(), &"left".into(), &"goal".into()),
        Some(0.0)
    );
}

#[test]
fn test_unknown_extension_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("problem.yaml");
    std::fs::write(&path, "states: [0]").unwrap();

    let err = ProblemFile::load(&path).unwrap_err();
    assert!(err.is_invalid_input());
}

#[test]
fn test_unknown_field_rejected() {
    let result = ProblemFile::from_toml_str(
        r#"
states = [0]
actions = [0]
rewards = [{ state = 0, action = 0, reward = 1.0 }]
discount = 0.9
"#,
    );
    assert!(result.is_err());
}

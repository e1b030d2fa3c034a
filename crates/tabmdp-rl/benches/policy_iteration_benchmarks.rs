//! Policy Iteration Benchmarks
//!
//! Benchmarks for the tabular planning pipeline:
//! - Transition estimation from trial logs
//! - Policy evaluation sweeps
//! - Greedy improvement
//! - Full policy iteration solves
//!
//! ## Hot Paths Identified
//! 1. evaluate() - Runs once per outer iteration, dominated by sweeps
//! 2. improve() - Full Q table per outer iteration
//! 3. estimate() - Once per learning solve, linear in the log length

#![allow(clippy::cast_precision_loss)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tabmdp_core::{Discount, Policy, RewardModel, Space, TransitionModel, TrialLog};
use tabmdp_rl::{
    estimate, evaluate, improve, InitialPolicy, PolicyIteration, SolverConfig, DEFAULT_TOLERANCE,
};

// ============================================================================
// Fixtures
// ============================================================================

const SEED: u64 = 0x5eed;

fn gamma() -> Discount {
    Discount::new(0.95).unwrap()
}

fn random_mdp(n_s: usize, n_a: usize) -> (TransitionModel<usize, usize>, RewardModel<usize, usize>) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let states = Space::shared("state", 0..n_s).unwrap();
    let actions = Space::shared("action", 0..n_a).unwrap();

    let mut probabilities = Array3::<f64>::zeros((n_s, n_a, n_s));
    for s in 0..n_s {
        for a in 0..n_a {
            let weights: Vec<f64> = (0..n_s).map(|_| rng.gen::<f64>() + 1e-3).collect();
            let total: f64 = weights.iter().sum();
            for (n, w) in weights.into_iter().enumerate() {
                probabilities[[s, a, n]] = w / total;
            }
        }
    }

    let model = TransitionModel::from_dense(states.clone(), actions.clone(), probabilities).unwrap();
    let table: Vec<f64> = (0..n_s * n_a).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let rewards = RewardModel::from_fn(states, actions, |s, a| table[s * n_a + a]).unwrap();
    (model, rewards)
}

fn random_trials(n_s: usize, n_a: usize, count: usize) -> TrialLog<usize, usize> {
    let mut rng = StdRng::seed_from_u64(SEED);
    (0..count)
        .map(|_| (rng.gen_range(0..n_s), rng.gen_range(0..n_a), rng.gen_range(0..n_s)))
        .collect()
}

// ============================================================================
// Estimation Benchmarks
// ============================================================================

fn bench_estimate_log_length(c: &mut Criterion) {
    let lengths = [100, 1_000, 10_000, 100_000];
    let states: Vec<usize> = (0..20).collect();
    let actions: Vec<usize> = (0..4).collect();

    let mut group = c.benchmark_group("estimate/log_length");
    for length in lengths {
        let trials = random_trials(states.len(), actions.len(), length);

        group.throughput(Throughput::Elements(length as u64));
        group.bench_with_input(BenchmarkId::from_parameter(length), &trials, |b, trials| {
            b.iter(|| estimate(&states, &actions, black_box(trials)).unwrap());
        });
    }
    group.finish();
}

// ============================================================================
// Evaluation / Improvement Benchmarks
// ============================================================================

fn bench_evaluate_states(c: &mut Criterion) {
    let sizes = [10, 50, 100, 200];

    let mut group = c.benchmark_group("evaluate/states");
    for size in sizes {
        let (model, rewards) = random_mdp(size, 4);
        let policy = Policy::constant(model.states().clone(), model.actions().clone(), 0).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &policy, |b, policy| {
            b.iter(|| {
                evaluate(black_box(policy), &model, &rewards, gamma(), 10_000, DEFAULT_TOLERANCE)
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_improve_states(c: &mut Criterion) {
    let sizes = [10, 50, 100, 200];

    let mut group = c.benchmark_group("improve/states");
    for size in sizes {
        let (model, rewards) = random_mdp(size, 4);
        let policy = Policy::constant(model.states().clone(), model.actions().clone(), 0).unwrap();
        let values = evaluate(&policy, &model, &rewards, gamma(), 10_000, DEFAULT_TOLERANCE)
            .unwrap()
            .values;

        group.bench_with_input(BenchmarkId::from_parameter(size), &values, |b, values| {
            b.iter(|| improve(black_box(values), &model, &rewards, gamma()).unwrap());
        });
    }
    group.finish();
}

// ============================================================================
// Full Solve Benchmarks
// ============================================================================

fn bench_solve_states(c: &mut Criterion) {
    let sizes = [10, 50, 100];
    let config = SolverConfig {
        initial_policy: InitialPolicy::FirstAction,
        ..SolverConfig::default()
    };

    let mut group = c.benchmark_group("solve/states");
    for size in sizes {
        let (model, rewards) = random_mdp(size, 4);
        let solver = PolicyIteration::new(model, rewards, gamma(), config.clone()).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &solver, |b, solver| {
            b.iter(|| solver.solve().unwrap());
        });
    }
    group.finish();
}

fn bench_solve_learned(c: &mut Criterion) {
    let (n_s, n_a) = (30, 4);
    let (_, rewards) = random_mdp(n_s, n_a);
    let trials = random_trials(n_s, n_a, 5_000);
    let config = SolverConfig {
        seed: Some(SEED),
        ..SolverConfig::default()
    };

    c.bench_function("solve/learned_30x4", |b| {
        b.iter(|| {
            PolicyIteration::from_trials(rewards.clone(), black_box(&trials), gamma(), config.clone())
                .unwrap()
                .solve_learned()
                .unwrap()
        });
    });
}

// ============================================================================
// Criterion Groups
// ============================================================================

criterion_group!(
    name = estimation_benchmarks;
    config = Criterion::default();
    targets = bench_estimate_log_length,
);

criterion_group!(
    name = planning_benchmarks;
    config = Criterion::default();
    targets =
        bench_evaluate_states,
        bench_improve_states,
);

criterion_group!(
    name = solve_benchmarks;
    config = Criterion::default().sample_size(20);
    targets =
        bench_solve_states,
        bench_solve_learned,
);

criterion_main!(estimation_benchmarks, planning_benchmarks, solve_benchmarks);

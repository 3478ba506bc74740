use anyhow::Result;
use gridrl::util::trajectory;
use gridrl_core::{
    record::BufferedRecorder,
    stats::{window_mean, EpisodeStats},
    Configurable, Env, EpsilonGreedy, NullEvaluator, Policy, Trainer, TrainerConfig,
};
use gridrl_grid_env::{GridEnv, GridEnvConfig, GridModel, GridPos};
use gridrl_tabular::{
    MonteCarlo, MonteCarloConfig, PolicyIteration, PolicyIterationConfig, QLearning,
    QLearningConfig, ValueIteration, ValueIterationConfig,
};

const MAX_STEPS: usize = 100;
const N_EPISODES: usize = 1000;

fn train<A: gridrl_core::Agent<GridEnv>>(agent: &mut A, seed: i64) -> Result<Vec<EpisodeStats>> {
    let mut env: GridEnv = GridEnv::build(&GridEnvConfig::penalty_grid(), seed)?;
    let mut trainer = Trainer::build(
        TrainerConfig::default()
            .n_episodes(N_EPISODES)
            .max_steps_per_episode(MAX_STEPS)
            .log_interval(0),
    );
    trainer.train(&mut env, agent, &mut BufferedRecorder::new(), &mut NullEvaluator)
}

fn returns(history: &[EpisodeStats]) -> Vec<f64> {
    history.iter().map(|s| s.reward).collect()
}

fn steps(history: &[EpisodeStats]) -> Vec<f64> {
    history.iter().map(|s| s.steps as f64).collect()
}

#[test]
fn value_iteration_avoids_penalty_cells() -> Result<()> {
    let config = GridEnvConfig::penalty_grid();
    let vi_config = ValueIterationConfig::default().gamma(0.9).theta(1e-6);
    let mut vi = ValueIteration::new(GridModel::new(&config)?, vi_config)?;
    assert!(vi.bellman_residual() < 1e-6);

    let mut env: GridEnv = GridEnv::build(&config, 0)?;
    let tr = trajectory(&mut env, &mut vi, MAX_STEPS)?;
    assert!(tr.terminated);
    assert_eq!(tr.actions.len(), 6);
    assert_eq!(tr.cells.first(), Some(&GridPos::new(0, 0)));
    assert_eq!(tr.cells.last(), Some(&GridPos::new(3, 3)));
    assert!(!tr.visits(&GridPos::new(1, 1)));
    assert!(!tr.visits(&GridPos::new(2, 2)));
    assert_eq!(tr.reward, 1.0);

    // The goal is worth 1 one step before it and discounted once per step further
    let v = vi.value(&GridPos::new(0, 0));
    assert!((v - 0.9f64.powi(5)).abs() < 1e-4);
    Ok(())
}

#[test]
fn policy_iteration_agrees_with_value_iteration() -> Result<()> {
    let config = GridEnvConfig::penalty_grid();
    let vi = ValueIteration::new(GridModel::new(&config)?, ValueIterationConfig::default())?;
    let mut pi = PolicyIteration::new(
        GridModel::new(&config)?,
        PolicyIterationConfig::default().seed(7),
    )?;

    for (state, v) in vi.values().iter() {
        assert!((pi.value(state) - v).abs() < 1e-4, "{}", state);
    }

    let mut env: GridEnv = GridEnv::build(&config, 0)?;
    let tr = trajectory(&mut env, &mut pi, MAX_STEPS)?;
    assert!(tr.terminated);
    assert_eq!(tr.actions.len(), 6);
    assert!(!tr.visits(&GridPos::new(1, 1)));
    assert!(!tr.visits(&GridPos::new(2, 2)));

    // Planners act the same way whatever they were given before
    let obs = GridPos::new(0, 0);
    let a = Policy::<GridEnv>::act(&mut pi, &obs);
    assert_eq!(Policy::<GridEnv>::act(&mut pi, &obs), a);
    Ok(())
}

#[test]
fn q_learning_improves_over_training() -> Result<()> {
    let config = QLearningConfig::default()
        .alpha(0.1)
        .gamma(0.9)
        .explorer(EpsilonGreedy::decay_over(1.0, 0.01, N_EPISODES))
        .seed(42);
    let mut agent = QLearning::<GridPos>::build(config)?;
    let history = train(&mut agent, 42)?;

    assert_eq!(history.len(), N_EPISODES);
    assert!(history.iter().all(|s| s.steps <= MAX_STEPS));
    let first = &history[..100];
    assert!(window_mean(&returns(&history), 100) > window_mean(&returns(first), 100));
    assert!(window_mean(&steps(&history), 100) < window_mean(&steps(first), 100));
    assert!((agent.epsilon() - 0.01).abs() < 1e-6);
    Ok(())
}

#[test]
fn monte_carlo_improves_over_training() -> Result<()> {
    let config = MonteCarloConfig::default()
        .gamma(0.9)
        .explorer(EpsilonGreedy::decay_over(1.0, 0.01, N_EPISODES))
        .seed(42);
    let mut agent = MonteCarlo::<GridPos>::build(config)?;
    let history = train(&mut agent, 42)?;

    let first = &history[..100];
    assert!(window_mean(&steps(&history), 100) < window_mean(&steps(first), 100));
    assert!(agent.q_table().max(&GridPos::new(0, 0)) > 0.0);
    Ok(())
}

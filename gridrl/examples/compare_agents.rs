use anyhow::Result;
use clap::Parser;
use csv::WriterBuilder;
use gridrl::util::trajectory;
use gridrl_core::{
    record::LogRecorder,
    stats::{EpisodeStats, Summary},
    Agent, Configurable, Env as _, EpsilonGreedy, NullEvaluator, Trainer, TrainerConfig,
};
use gridrl_grid_env::{GridEnv, GridEnvConfig, GridModel, GridPos};
use gridrl_tabular::{
    MonteCarlo, MonteCarloConfig, PolicyIteration, PolicyIterationConfig, QLearning,
    QLearningConfig, RandomAgent, RandomAgentConfig, ValueIteration, ValueIterationConfig,
};
use log::info;
use serde::Serialize;
use std::path::Path;

const N_EPISODES: usize = 1000;
const MAX_STEPS: usize = 100;
const N_TEST_EPISODES: usize = 100;
const LOG_INTERVAL: usize = 100;
const EPSILON_START: f64 = 1.0;
const EPSILON_MIN: f64 = 0.01;

type Env = GridEnv;

/// One line of the comparison table.
struct Row {
    agent: &'static str,
    phase: &'static str,
    summary: Summary,
}

#[derive(Serialize)]
struct SummaryRecord {
    agent: String,
    phase: String,
    mean_reward: f64,
    std_reward: f64,
    mean_steps: f64,
    std_steps: f64,
    success_rate: f64,
}

impl From<&Row> for SummaryRecord {
    fn from(row: &Row) -> Self {
        Self {
            agent: row.agent.to_string(),
            phase: row.phase.to_string(),
            mean_reward: row.summary.mean_reward,
            std_reward: row.summary.std_reward,
            mean_steps: row.summary.mean_steps,
            std_steps: row.summary.std_steps,
            success_rate: row.summary.success_rate,
        }
    }
}

/// Compare planners, tabular learners and a random baseline on a grid world
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of training episodes of the learners
    #[arg(long, default_value_t = N_EPISODES)]
    n_episodes: usize,

    /// Maximum number of steps per episode
    #[arg(long, default_value_t = MAX_STEPS)]
    max_steps: usize,

    /// Number of test episodes of every agent
    #[arg(long, default_value_t = N_TEST_EPISODES)]
    test_episodes: usize,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// YAML file of the grid, the 4x4 grid with two penalty cells if not given
    #[arg(long)]
    config: Option<String>,

    /// Write the summary table to this CSV file
    #[arg(long)]
    csv: Option<String>,
}

fn env_config(args: &Args) -> Result<GridEnvConfig> {
    match &args.config {
        Some(path) => GridEnvConfig::load(path),
        None => Ok(GridEnvConfig::penalty_grid()),
    }
}

fn trainer_config(args: &Args) -> TrainerConfig {
    TrainerConfig::default()
        .n_episodes(args.n_episodes)
        .max_steps_per_episode(args.max_steps)
        .log_interval(LOG_INTERVAL)
}

fn explorer(args: &Args) -> EpsilonGreedy {
    EpsilonGreedy::decay_over(EPSILON_START, EPSILON_MIN, args.n_episodes)
}

fn train<A: Agent<Env>>(
    args: &Args,
    env_config: &GridEnvConfig,
    agent: &mut A,
    name: &str,
) -> Result<Vec<EpisodeStats>> {
    let mut env = Env::build(env_config, args.seed as i64)?;
    let mut trainer = Trainer::build(trainer_config(args));
    let mut recorder = LogRecorder::new(name);
    trainer.train(&mut env, agent, &mut recorder, &mut NullEvaluator)
}

fn test<A: Agent<Env>>(
    args: &Args,
    env_config: &GridEnvConfig,
    agent: &mut A,
) -> Result<Vec<EpisodeStats>> {
    let mut env = Env::build(env_config, args.seed as i64 + 1)?;
    agent.eval();
    Trainer::build(trainer_config(args)).evaluate_only(&mut env, agent, args.test_episodes)
}

fn log_path<A: Agent<Env>>(
    args: &Args,
    env_config: &GridEnvConfig,
    agent: &mut A,
    name: &str,
) -> Result<()> {
    let mut env = Env::build(env_config, args.seed as i64)?;
    let tr = trajectory(&mut env, agent, args.max_steps)?;
    let cells: Vec<String> = tr.cells.iter().map(GridPos::to_string).collect();
    info!("Path of {}: {}", name, cells.join(" -> "));
    Ok(())
}

fn compare(args: &Args) -> Result<Vec<Row>> {
    let env_config = env_config(args)?;
    let mut rows = vec![];
    let mut push = |agent, phase, history: &[EpisodeStats]| {
        rows.push(Row {
            agent,
            phase,
            summary: Summary::from_stats(history),
        })
    };

    let mut random = RandomAgent::build(RandomAgentConfig { seed: args.seed })?;
    push("random", "test", &test(args, &env_config, &mut random)?);

    let mut vi = ValueIteration::new(GridModel::new(&env_config)?, ValueIterationConfig::default())?;
    log_path(args, &env_config, &mut vi, "value iteration")?;
    push("value_iteration", "test", &test(args, &env_config, &mut vi)?);

    let config = PolicyIterationConfig::default().seed(args.seed);
    let mut pi = PolicyIteration::new(GridModel::new(&env_config)?, config)?;
    log_path(args, &env_config, &mut pi, "policy iteration")?;
    push("policy_iteration", "test", &test(args, &env_config, &mut pi)?);

    let config = MonteCarloConfig::default()
        .explorer(explorer(args))
        .seed(args.seed);
    let mut mc = MonteCarlo::<GridPos>::build(config)?;
    push("monte_carlo", "train", &train(args, &env_config, &mut mc, "monte_carlo")?);
    push("monte_carlo", "test", &test(args, &env_config, &mut mc)?);

    let config = QLearningConfig::default()
        .explorer(explorer(args))
        .seed(args.seed);
    let mut q = QLearning::<GridPos>::build(config)?;
    push("q_learning", "train", &train(args, &env_config, &mut q, "q_learning")?);
    push("q_learning", "test", &test(args, &env_config, &mut q)?);

    Ok(rows)
}

fn print_table(rows: &[Row]) {
    for row in rows.iter() {
        println!("{:<18} {:<6} {}", row.agent, row.phase, row.summary);
    }
}

fn write_csv(path: impl AsRef<Path>, rows: &[Row]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_path(path)?;
    for row in rows.iter() {
        wtr.serialize(SummaryRecord::from(row))?;
    }
    wtr.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let rows = compare(&args)?;
    print_table(&rows);
    if let Some(path) = &args.csv {
        write_csv(path, &rows)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_compare_agents() -> Result<()> {
        let tmp_dir = TempDir::new("compare_agents")?;
        let csv = tmp_dir.path().join("summary.csv");
        let args = Args {
            n_episodes: 50,
            max_steps: MAX_STEPS,
            test_episodes: 5,
            seed: 0,
            config: None,
            csv: None,
        };

        let rows = compare(&args)?;
        assert_eq!(rows.len(), 7);
        for row in rows.iter().filter(|r| r.agent.ends_with("iteration")) {
            assert_eq!(row.summary.success_rate, 1.0);
            assert_eq!(row.summary.mean_steps, 6.0);
        }

        write_csv(&csv, &rows)?;
        let text = std::fs::read_to_string(&csv)?;
        assert_eq!(text.lines().count(), 8);
        assert!(text.starts_with("agent,phase,mean_reward"));
        Ok(())
    }
}

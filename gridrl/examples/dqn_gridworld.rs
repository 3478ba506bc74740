use anyhow::Result;
use clap::Parser;
use gridrl_candle_agent::{
    dqn::{Dqn, DqnConfig},
    mlp::MlpConfig,
    opt::OptimizerConfig,
};
use gridrl_core::{
    record::LogRecorder, stats::Summary, Agent, Configurable, DefaultEvaluator, Env as _,
    ReplayMemoryConfig, Trainer, TrainerConfig,
};
use gridrl_grid_env::{FeatureFilter, GridEnv, GridEnvConfig};
use log::{info, warn};
use std::path::{Path, PathBuf};

const GRID_SIZE: usize = 5;
const N_EPISODES: usize = 500;
const MAX_STEPS: usize = 100;
const N_TEST_EPISODES: usize = 100;
const N_EVAL_EPISODES: usize = 10;
const EVAL_INTERVAL: usize = 50;
const LOG_INTERVAL: usize = 10;
const LR: f64 = 0.001;
const DISCOUNT_FACTOR: f64 = 0.95;
const BATCH_SIZE: usize = 32;
const REPLAY_CAPACITY: usize = 2000;
const MODEL_DIR: &str = "./models/dqn_gridworld";

type Env = GridEnv<FeatureFilter>;
type Evaluator = DefaultEvaluator<Env>;

mod config {
    use super::*;

    pub fn create_env_config(size: usize) -> GridEnvConfig {
        GridEnvConfig::random_goal(size)
    }

    pub fn create_agent_config(replay: bool, seed: u64) -> DqnConfig {
        let config = DqnConfig::default()
            .q_config(MlpConfig::new(4, vec![64, 64], 4))
            .opt_config(OptimizerConfig::default().learning_rate(LR))
            .discount_factor(DISCOUNT_FACTOR)
            .batch_size(BATCH_SIZE)
            .seed(seed);
        match replay {
            true => config.replay(
                ReplayMemoryConfig::default()
                    .capacity(REPLAY_CAPACITY)
                    .seed(seed),
            ),
            false => config.direct(),
        }
    }

    pub fn create_trainer_config(args: &Args, model_dir: &Path) -> TrainerConfig {
        TrainerConfig::default()
            .n_episodes(args.n_episodes)
            .max_steps_per_episode(args.max_steps)
            .log_interval(LOG_INTERVAL)
            .eval_interval(EVAL_INTERVAL)
            .model_dir(model_dir.to_string_lossy())
    }
}

use config::{create_agent_config, create_env_config, create_trainer_config};

/// Train/test the value-network agent on grids with a random goal
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Train the agents, not test
    #[arg(short, long, default_value_t = false)]
    train: bool,

    /// Test saved agents, not train
    #[arg(short, long, default_value_t = false)]
    eval: bool,

    /// Number of training episodes
    #[arg(long, default_value_t = N_EPISODES)]
    n_episodes: usize,

    /// Maximum number of steps per episode
    #[arg(long, default_value_t = MAX_STEPS)]
    max_steps: usize,

    /// Number of test episodes
    #[arg(long, default_value_t = N_TEST_EPISODES)]
    test_episodes: usize,

    /// Height and width of the grid
    #[arg(long, default_value_t = GRID_SIZE)]
    size: usize,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Directory of the checkpoints
    #[arg(long, default_value_t = MODEL_DIR.to_string())]
    model_dir: String,
}

fn variant(replay: bool) -> &'static str {
    match replay {
        true => "replay",
        false => "direct",
    }
}

fn model_dir(args: &Args, replay: bool) -> PathBuf {
    Path::new(&args.model_dir).join(variant(replay))
}

fn train(args: &Args, replay: bool) -> Result<()> {
    let model_dir = model_dir(args, replay);
    let env_config = create_env_config(args.size);
    let mut trainer = Trainer::build(create_trainer_config(args, &model_dir));
    let mut env = Env::build(&env_config, args.seed as i64)?;
    let mut agent = Dqn::build(create_agent_config(replay, args.seed))?;
    let mut recorder = LogRecorder::new(variant(replay));
    let mut evaluator =
        Evaluator::new(&env_config, args.seed as i64 + 1, N_EVAL_EPISODES)?.max_steps(args.max_steps);

    let history = trainer.train(&mut env, &mut agent, &mut recorder, &mut evaluator)?;
    info!("Training ({}): {}", variant(replay), Summary::from_stats(&history));
    Agent::<Env>::save_params(&agent, &model_dir)?;

    Ok(())
}

fn test(args: &Args, replay: bool) -> Result<Summary> {
    let model_dir = model_dir(args, replay);
    let env_config = create_env_config(args.size);
    let mut agent = Dqn::build(create_agent_config(replay, args.seed))?;
    if !Agent::<Env>::load_params(&mut agent, &model_dir)? {
        warn!("No checkpoint in {:?}, testing an untrained agent", model_dir);
    }
    Agent::<Env>::eval(&mut agent);

    let mut evaluator = Evaluator::new(&env_config, args.seed as i64 + 2, args.test_episodes)?
        .max_steps(args.max_steps);
    let summary = Summary::from_stats(&evaluator.run(&mut agent)?);
    println!(
        "{:<6} success rate {:>5.1}%, mean steps {:.2}",
        variant(replay),
        100.0 * summary.success_rate,
        summary.mean_steps
    );

    Ok(summary)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    for replay in [false, true] {
        if args.train {
            train(&args, replay)?;
        } else if args.eval {
            test(&args, replay)?;
        } else {
            train(&args, replay)?;
            test(&args, replay)?;
        }
    }

    Ok(())
}

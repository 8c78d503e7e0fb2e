use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::warn;

use crate::action::Action;
use crate::controller::Controller;
use crate::env::GameEnv;
use crate::episode_observer::EpisodeObserver;
use crate::error::Result;

/// Steps slower than this get a warning.
const SLOW_STEP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub steps: usize,
    pub total_reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub duration: Duration,
}

/// Plays episodes with a uniformly random policy.
pub struct Runner<C: Controller> {
    env: GameEnv<C>,
    observer: Box<dyn EpisodeObserver>,
    rng: StdRng,
    episodes_run: usize,
}

impl<C: Controller> Runner<C> {
    pub fn new(env: GameEnv<C>, observer: impl EpisodeObserver + 'static, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            env,
            observer: Box::new(observer),
            rng,
            episodes_run: 0,
        }
    }

    pub fn env(&self) -> &GameEnv<C> {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut GameEnv<C> {
        &mut self.env
    }

    pub fn into_env(self) -> GameEnv<C> {
        self.env
    }

    pub async fn run(&mut self, episodes: usize) -> Result<Vec<EpisodeSummary>> {
        let mut summaries = Vec::with_capacity(episodes);
        for _ in 0..episodes {
            summaries.push(self.run_episode().await?);
        }
        Ok(summaries)
    }

    pub async fn run_episode(&mut self) -> Result<EpisodeSummary> {
        let episode = self.episodes_run;
        self.episodes_run += 1;
        let started = Instant::now();

        let (observation, info) = self.env.reset().await?;
        self.observer.on_episode_start(episode, &observation, &info);

        let mut total_reward = 0.0;
        loop {
            let step_start = Instant::now();
            let action_index = self.rng.random_range(0..Action::COUNT);

            let result = self.env.step(action_index).await?;
            total_reward += result.reward;
            self.observer.on_step(episode, action_index, &result);

            let step_duration = step_start.elapsed();
            if step_duration > SLOW_STEP {
                warn!(
                    "Step {} took {:.2}ms (episode {}, action index: {})",
                    result.info.steps,
                    step_duration.as_secs_f64() * 1000.0,
                    episode,
                    action_index
                );
            }

            if result.terminated || result.truncated {
                let summary = EpisodeSummary {
                    episode,
                    steps: result.info.steps,
                    total_reward,
                    terminated: result.terminated,
                    truncated: result.truncated,
                    duration: started.elapsed(),
                };
                self.observer.on_episode_finished(&summary);
                return Ok(summary);
            }
        }
    }
}

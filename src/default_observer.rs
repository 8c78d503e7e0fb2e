use crate::action::Action;
use crate::env::{StepInfo, StepResult};
use crate::episode_observer::EpisodeObserver;
use crate::runner::EpisodeSummary;
use crate::screen::Observation;
use tracing::{debug, info};

pub struct DefaultObserver;

impl EpisodeObserver for DefaultObserver {
    fn on_episode_start(&mut self, episode: usize, observation: &Observation, info: &StepInfo) {
        info!("Episode {} started", episode);
        info!("- frame: {:?}", observation.shape());
        info!("- phase: {}", info.state.current_state);
    }

    fn on_step(&mut self, episode: usize, action_index: usize, result: &StepResult) {
        let action = Action::from_index(action_index)
            .map(Action::as_str)
            .unwrap_or("none");
        debug!(
            "episode: {}, step: {}, action: {}, reward: {}, phase: {}",
            episode, result.info.steps, action, result.reward, result.info.state.current_state,
        );
    }

    fn on_episode_finished(&mut self, summary: &EpisodeSummary) {
        info!(
            "Episode {} finished after {} steps ({})",
            summary.episode,
            summary.steps,
            if summary.terminated {
                "terminated"
            } else {
                "truncated"
            }
        );
        info!("- total reward: {}", summary.total_reward);
        info!("- duration: {:.2}s", summary.duration.as_secs_f64());
    }
}

use crate::env::{StepInfo, StepResult};
use crate::runner::EpisodeSummary;
use crate::screen::Observation;

/// Trait for observing episode events during a run
pub trait EpisodeObserver {
    /// Called after `reset` returned the first observation
    fn on_episode_start(&mut self, episode: usize, observation: &Observation, info: &StepInfo);

    /// Called after every step
    fn on_step(&mut self, episode: usize, action_index: usize, result: &StepResult);

    /// Called when the episode is terminated or truncated
    fn on_episode_finished(&mut self, summary: &EpisodeSummary);
}

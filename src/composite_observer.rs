use crate::env::{StepInfo, StepResult};
use crate::episode_observer::EpisodeObserver;
use crate::runner::EpisodeSummary;
use crate::screen::Observation;

pub struct CompositeObserver {
    observers: Vec<Box<dyn EpisodeObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Box<dyn EpisodeObserver>>) -> Self {
        Self { observers }
    }
}

impl EpisodeObserver for CompositeObserver {
    fn on_episode_start(&mut self, episode: usize, observation: &Observation, info: &StepInfo) {
        for observer in &mut self.observers {
            observer.on_episode_start(episode, observation, info);
        }
    }

    fn on_step(&mut self, episode: usize, action_index: usize, result: &StepResult) {
        for observer in &mut self.observers {
            observer.on_step(episode, action_index, result);
        }
    }

    fn on_episode_finished(&mut self, summary: &EpisodeSummary) {
        for observer in &mut self.observers {
            observer.on_episode_finished(summary);
        }
    }
}

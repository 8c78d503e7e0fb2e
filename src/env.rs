//! RL Environment - gym-like interface over the emulator
//!
//! `reset` and `step` follow the usual contract:
//!
//! ```text
//! reset()       -> (observation, info)
//! step(action)  -> (observation, reward, terminated, truncated, info)
//! ```
//!
//! Reward is always 0.0 and episodes never terminate on their own; they are
//! only truncated at `EnvConfig::max_steps`.

use serde::Serialize;

use crate::action::Action;
use crate::config::EnvConfig;
use crate::controller::Controller;
use crate::error::Result;
use crate::screen::{self, Observation, SCREEN_CHANNELS, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::state_tracker::{StateSnapshot, StateTracker};

/// Step result from the environment
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Next observation
    pub observation: Observation,
    pub reward: f32,
    /// Episode ended inside the game
    pub terminated: bool,
    /// Episode hit max steps
    pub truncated: bool,
    pub info: StepInfo,
}

/// Additional information from a step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepInfo {
    /// Steps taken this episode
    pub steps: usize,
    /// Phase and auxiliary data recorded so far
    pub state: StateSnapshot,
}

/// Episode loop over a running emulator.
///
/// The controller outlives episodes: `reset` only clears the episode state.
pub struct GameEnv<C: Controller> {
    controller: C,
    config: EnvConfig,
    tracker: StateTracker,
    steps: usize,
    current_screen: Option<Observation>,
    closed: bool,
}

impl<C: Controller> GameEnv<C> {
    pub fn new(controller: C, config: EnvConfig) -> Self {
        Self {
            controller,
            config,
            tracker: StateTracker::new(),
            steps: 0,
            current_screen: None,
            closed: false,
        }
    }

    pub fn action_space_size() -> usize {
        Action::COUNT
    }

    /// (height, width, channels)
    pub fn observation_shape() -> (usize, usize, usize) {
        (
            SCREEN_HEIGHT as usize,
            SCREEN_WIDTH as usize,
            SCREEN_CHANNELS,
        )
    }

    pub async fn reset(&mut self) -> Result<(Observation, StepInfo)> {
        self.steps = 0;
        self.tracker = StateTracker::new();
        self.current_screen = None;

        let observation = self.get_observation().await?;
        self.current_screen = Some(observation.clone());

        Ok((observation, self.info()))
    }

    /// Presses the button for `action_index`, if there is one, then observes.
    ///
    /// Out-of-range indices press nothing but still count as a step.
    pub async fn step(&mut self, action_index: usize) -> Result<StepResult> {
        if let Some(action) = Action::from_index(action_index) {
            self.controller
                .press_button(action, self.config.press_duration)
                .await?;
        } else {
            tracing::debug!("Ignoring out-of-range action index {}", action_index);
        }

        let observation = self.get_observation().await?;
        self.current_screen = Some(observation.clone());

        let reward = self.calculate_reward();

        self.steps += 1;
        let terminated = false;
        let truncated = self.steps >= self.config.max_steps;

        Ok(StepResult {
            observation,
            reward,
            terminated,
            truncated,
            info: self.info(),
        })
    }

    /// Closes the controller. Later calls do nothing.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.controller.close().await
    }

    /// Most recent observation
    pub fn render(&self) -> Option<&Observation> {
        self.current_screen.as_ref()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn state_tracker(&self) -> &StateTracker {
        &self.tracker
    }

    pub fn state_tracker_mut(&mut self) -> &mut StateTracker {
        &mut self.tracker
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    async fn get_observation(&mut self) -> Result<Observation> {
        let raw = self.controller.get_screen().await?;
        let grid = screen::decode(&raw)?;
        Ok(screen::normalize(grid))
    }

    fn calculate_reward(&self) -> f32 {
        0.0
    }

    fn info(&self) -> StepInfo {
        StepInfo {
            steps: self.steps,
            state: self.tracker.snapshot(),
        }
    }
}

pub mod action;
pub mod composite_observer;
pub mod config;
pub mod controller;
pub mod default_observer;
pub mod emulator;
pub mod env;
pub mod episode_observer;
pub mod error;
pub mod runner;
pub mod screen;
pub mod screenshot_observer;
pub mod state_tracker;

// Re-export commonly used types for convenience
pub use action::Action;
pub use config::{EmulatorConfig, EnvConfig, RunConfig};
pub use controller::Controller;
pub use emulator::{Command, EmulatorChannel};
pub use env::{GameEnv, StepInfo, StepResult};
pub use error::{Error, Result};
pub use screen::Observation;
pub use state_tracker::{GamePhase, StateSnapshot, StateTracker};

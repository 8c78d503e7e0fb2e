use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use time::{OffsetDateTime, format_description};
use tracing::warn;

use crate::env::{StepInfo, StepResult};
use crate::episode_observer::EpisodeObserver;
use crate::runner::EpisodeSummary;
use crate::screen::{self, Observation};

/// Writes every observation of a run as a PNG.
///
/// Frames land in `<folder>/<run timestamp>/<episode>-<step>.png`, with step
/// 0 being the frame returned by `reset`.
pub struct ScreenshotObserver {
    run_folder: PathBuf,
}

impl ScreenshotObserver {
    pub fn new(screenshots_folder: impl AsRef<Path>) -> Result<Self, io::Error> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let format = format_description::parse("[year][month][day]-[hour][minute][second]")
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let date_time_str = now
            .format(&format)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let run_folder = screenshots_folder.as_ref().join(date_time_str);
        fs::create_dir_all(&run_folder)?;
        Ok(Self { run_folder })
    }

    pub fn run_folder(&self) -> &Path {
        &self.run_folder
    }

    pub fn frame_path(&self, episode: usize, step: usize) -> PathBuf {
        self.run_folder.join(format!("{:03}-{:05}.png", episode, step))
    }

    fn save(&self, episode: usize, step: usize, observation: &Observation) {
        let path = self.frame_path(episode, step);
        if let Err(e) = screen::save_screenshot(observation.image(), &path) {
            warn!("Skipping frame {}: {}", path.display(), e);
        }
    }
}

impl EpisodeObserver for ScreenshotObserver {
    fn on_episode_start(&mut self, episode: usize, observation: &Observation, info: &StepInfo) {
        self.save(episode, info.steps, observation);
    }

    fn on_step(&mut self, episode: usize, _action_index: usize, result: &StepResult) {
        self.save(episode, result.info.steps, &result.observation);
    }

    fn on_episode_finished(&mut self, _summary: &EpisodeSummary) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_tracker::StateTracker;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_saves_frames_per_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut observer = ScreenshotObserver::new(dir.path()).unwrap();
        assert!(observer.run_folder().starts_with(dir.path()));
        assert!(observer.run_folder().is_dir());

        let observation = screen::normalize(RgbImage::from_pixel(240, 160, Rgb([9, 9, 9])));
        let info = StepInfo {
            steps: 0,
            state: StateTracker::new().snapshot(),
        };
        observer.on_episode_start(2, &observation, &info);

        let result = StepResult {
            observation: observation.clone(),
            reward: 0.0,
            terminated: false,
            truncated: false,
            info: StepInfo { steps: 1, ..info },
        };
        observer.on_step(2, 0, &result);

        for step in [0, 1] {
            let path = observer.frame_path(2, step);
            assert!(path.ends_with(format!("002-{:05}.png", step)));
            let bytes = fs::read(&path).unwrap();
            assert_eq!(screen::decode(&bytes).unwrap(), *observation.image());
        }
    }
}

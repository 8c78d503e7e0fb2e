use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::action::Action;
use crate::error::Result;

/// What the episode loop needs from an emulator connection.
#[async_trait]
pub trait Controller: Send {
    /// Hold `action` for `duration`. Returns once the hold is over.
    async fn press_button(&mut self, action: Action, duration: Duration) -> Result<()>;

    /// Fetch the current frame as encoded image bytes.
    async fn get_screen(&mut self) -> Result<Vec<u8>>;

    async fn load_state(&mut self, path: &Path) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

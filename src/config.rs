use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 65432;

/// Largest payload a single UDP datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Everything needed to launch and talk to the emulator.
#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    pub binary_path: PathBuf,
    pub rom_path: PathBuf,
    pub script_path: PathBuf,
    pub save_state: Option<PathBuf>,
    pub host: IpAddr,
    pub port: u16,
    /// How long to wait for the control script's `ready`
    pub startup_timeout: Duration,
    /// How long to wait for any single response after startup
    pub command_timeout: Duration,
    /// How long the emulator gets to exit on close
    pub close_grace: Duration,
    pub max_datagram_size: usize,
}

impl EmulatorConfig {
    pub fn new(
        binary_path: impl Into<PathBuf>,
        rom_path: impl Into<PathBuf>,
        script_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            binary_path: binary_path.into(),
            rom_path: rom_path.into(),
            script_path: script_path.into(),
            save_state: None,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            startup_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(1),
            close_grace: Duration::from_secs(5),
            max_datagram_size: MAX_DATAGRAM_SIZE,
        }
    }

    pub fn with_save_state(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_state = Some(path.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    /// Builds the config from `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::new(
            required(&lookup, "BIZHAWK_PATH")?,
            required(&lookup, "ROM_PATH")?,
            required(&lookup, "LUA_PATH")?,
        );
        config.save_state = lookup("SAVE_STATE").map(PathBuf::from);
        if let Some(port) = parse(&lookup, "REDBOT_PORT")? {
            config.port = port;
        }
        Ok(config)
    }
}

/// Episode loop settings
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Steps after which an episode is truncated
    pub max_steps: usize,
    /// How long each button is held
    pub press_duration: Duration,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            press_duration: Duration::from_millis(100),
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(max_steps) = parse(&lookup, "REDBOT_MAX_STEPS")? {
            config.max_steps = max_steps;
        }
        if let Some(seconds) = parse::<f64>(&lookup, "REDBOT_PRESS_DURATION")? {
            config.press_duration =
                Duration::try_from_secs_f64(seconds).map_err(|_| Error::InvalidSetting {
                    name: "REDBOT_PRESS_DURATION",
                    value: seconds.to_string(),
                })?;
        }
        Ok(config)
    }
}

/// Settings for the `redbot` binary itself.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub episodes: usize,
    pub seed: Option<u64>,
    pub screenshots_folder: Option<PathBuf>,
}

impl RunConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            episodes: parse(&lookup, "REDBOT_EPISODES")?.unwrap_or(1),
            seed: parse(&lookup, "REDBOT_SEED")?,
            screenshots_folder: lookup("REDBOT_SCREENSHOTS_FOLDER").map(PathBuf::from),
        })
    }
}

fn env_lookup(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn required(lookup: impl Fn(&str) -> Option<String>, name: &'static str) -> Result<PathBuf> {
    lookup(name)
        .map(PathBuf::from)
        .ok_or(Error::MissingSetting(name))
}

fn parse<T: FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::InvalidSetting { name, value }),
        None => Ok(None),
    }
}

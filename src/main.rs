use dotenv::dotenv;
use redbot::composite_observer::CompositeObserver;
use redbot::default_observer::DefaultObserver;
use redbot::episode_observer::EpisodeObserver;
use redbot::runner::Runner;
use redbot::screenshot_observer::ScreenshotObserver;
use redbot::{EmulatorChannel, EmulatorConfig, EnvConfig, GameEnv, RunConfig};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("redbot=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();

    let emulator_config = EmulatorConfig::from_env()?;
    let env_config = EnvConfig::from_env()?;
    let run_config = RunConfig::from_env()?;

    tracing::info!("ROM: {}", emulator_config.rom_path.display());
    if let Some(save_state) = &emulator_config.save_state {
        tracing::info!("Save state: {}", save_state.display());
    }

    let mut observers: Vec<Box<dyn EpisodeObserver>> = vec![Box::new(DefaultObserver)];
    if let Some(folder) = &run_config.screenshots_folder {
        let screenshots = ScreenshotObserver::new(folder)?;
        tracing::info!("Saving frames to {}", screenshots.run_folder().display());
        observers.push(Box::new(screenshots));
    }

    let channel = EmulatorChannel::new(emulator_config).await?;
    let env = GameEnv::new(channel, env_config);
    let mut runner = Runner::new(env, CompositeObserver::new(observers), run_config.seed);

    let outcome = runner.run(run_config.episodes).await;
    let close = runner.env_mut().close().await;

    let summaries = outcome?;
    close?;

    let total_steps: usize = summaries.iter().map(|s| s.steps).sum();
    tracing::info!("Ran {} episodes, {} steps", summaries.len(), total_steps);

    Ok(())
}

//! Control channel to a BizHawk process running the Lua control script.
//!
//! The script talks plain-text UDP datagrams:
//!
//! ```text
//! script     -> controller  ready
//! controller -> script      press <button> <seconds>    (no reply)
//! controller -> script      loadstate <path>            (reply: ok | error text)
//! controller -> script      screen                      (reply: encoded image)
//! controller -> script      exit                        (no reply)
//! ```
//!
//! Only one request is ever outstanding. A late or missing reply leaves the
//! channel out of step with the script; close it and start a new one.

use async_trait::async_trait;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::process::{Child, Command as ProcessCommand};
use tokio::time::{Instant, sleep, timeout, timeout_at};
use tracing::{debug, error, info, warn};

use crate::action::Action;
use crate::config::EmulatorConfig;
use crate::controller::Controller;
use crate::error::{Error, Result};

const HANDSHAKE: &[u8] = b"ready";
const LOAD_STATE_OK: &[u8] = b"ok";

/// Extra wait after a press so the script can finish applying it.
pub const PRESS_BUFFER: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Press { action: Action, duration: Duration },
    LoadState(PathBuf),
    Screen,
    Exit,
}

impl Command {
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Press { .. } => "press",
            Command::LoadState(_) => "loadstate",
            Command::Screen => "screen",
            Command::Exit => "exit",
        }
    }

    pub fn expects_response(&self) -> bool {
        matches!(self, Command::LoadState(_) | Command::Screen)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Press { action, duration } => {
                write!(f, "press {} {}", action, duration.as_secs_f64())
            }
            Command::LoadState(path) => write!(f, "loadstate {}", path.display()),
            Command::Screen | Command::Exit => f.write_str(self.verb()),
        }
    }
}

/// The live emulator process and the socket bound for it.
struct ChannelHandle {
    socket: UdpSocket,
    child: Child,
    peer: SocketAddr,
}

impl ChannelHandle {
    async fn send(&self, command: &Command) -> Result<()> {
        let text = command.to_string();
        debug!("-> {}", text);
        self.socket
            .send(text.as_bytes())
            .await
            .map_err(|e| Error::transport(format!("sending `{}`", text), e))?;
        Ok(())
    }

    async fn receive(&self, command: &Command, wait: Duration, max_size: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_size];
        match timeout(wait, self.socket.recv(&mut buf)).await {
            Ok(Ok(len)) => {
                buf.truncate(len);
                debug!("<- {} bytes for `{}`", len, command.verb());
                Ok(buf)
            }
            Ok(Err(e)) => Err(Error::transport(format!("awaiting reply to `{}`", command), e)),
            Err(_) => {
                error!("Timeout while sending command: {}", command);
                Err(Error::CommandTimeout(command.to_string()))
            }
        }
    }

    async fn shutdown(self, grace: Duration) -> Result<()> {
        if let Err(e) = self.send(&Command::Exit).await {
            warn!("Ignoring failed exit notification: {}", e);
        }
        drop(self.socket);
        terminate(self.child, grace).await
    }
}

/// Synchronous command/response client for the emulator's control script.
pub struct EmulatorChannel {
    config: EmulatorConfig,
    handle: Option<ChannelHandle>,
}

impl EmulatorChannel {
    /// Launches the emulator and waits for its control script to report in.
    ///
    /// On error nothing is left running: the socket is released and the
    /// process, if it was started, is killed and reaped.
    pub async fn new(config: EmulatorConfig) -> Result<Self> {
        validate_paths(&config)?;

        let bind_addr = SocketAddr::new(config.host, config.port);
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| Error::transport(format!("binding {}", bind_addr), e))?;
        info!("Socket bound to {}", bind_addr);

        let child = launch(&config)?;

        let peer = match await_handshake(&socket, &config).await {
            Ok(peer) => peer,
            Err(e) => {
                error!("Failed to start emulator: {}", e);
                drop(socket);
                if let Err(close_err) = terminate(child, config.close_grace).await {
                    error!("Error while stopping emulator: {}", close_err);
                }
                return Err(e);
            }
        };
        info!("Lua script connected from {}", peer);

        if let Err(e) = socket.connect(peer).await {
            drop(socket);
            if let Err(close_err) = terminate(child, config.close_grace).await {
                error!("Error while stopping emulator: {}", close_err);
            }
            return Err(Error::transport(format!("connecting to {}", peer), e));
        }

        let mut channel = Self {
            config,
            handle: Some(ChannelHandle {
                socket,
                child,
                peer,
            }),
        };

        if let Some(save_state) = channel.config.save_state.clone()
            && let Err(e) = channel.load_state(&save_state).await
        {
            error!("Failed to start emulator: {}", e);
            if let Err(close_err) = channel.close().await {
                error!("Error while closing emulator: {}", close_err);
            }
            return Err(e);
        }

        Ok(channel)
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.handle.as_ref().map(|h| h.peer)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.handle.as_ref().and_then(|h| h.socket.local_addr().ok())
    }

    fn handle(&self) -> Result<&ChannelHandle> {
        self.handle.as_ref().ok_or(Error::ChannelClosed)
    }

    /// Sends one command and, if the command has a reply, waits for it.
    /// Returns `None` for fire-and-forget commands. Never retries.
    pub async fn send_command(&mut self, command: &Command) -> Result<Option<Vec<u8>>> {
        let handle = self.handle()?;
        handle.send(command).await?;
        if !command.expects_response() {
            return Ok(None);
        }
        let reply = handle
            .receive(
                command,
                self.config.command_timeout,
                self.config.max_datagram_size,
            )
            .await?;
        Ok(Some(reply))
    }

    async fn request(&mut self, command: Command) -> Result<Vec<u8>> {
        Ok(self.send_command(&command).await?.unwrap_or_default())
    }

    /// Holds a button, then sleeps for the hold plus [`PRESS_BUFFER`].
    ///
    /// The script never reports a release, so the sleep is what keeps
    /// consecutive presses from overlapping.
    pub async fn press_button(&mut self, action: Action, duration: Duration) -> Result<()> {
        self.send_command(&Command::Press { action, duration })
            .await
            .inspect_err(|e| error!("Failed to press button {}: {}", action, e))?;
        sleep(duration + PRESS_BUFFER).await;
        Ok(())
    }

    /// Loads a save state. Anything other than a literal `ok` reply is a failure.
    pub async fn load_state(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.handle()?;
        let path = path.as_ref();
        if !path.exists() {
            error!("Save state not found: {}", path.display());
            return Err(Error::PathNotFound(path.to_path_buf()));
        }
        let path = std::path::absolute(path)?;

        let reply = self.request(Command::LoadState(path.clone())).await?;
        if reply != LOAD_STATE_OK {
            let reply = String::from_utf8_lossy(&reply).into_owned();
            error!("Failed to load save state: {:?}", reply);
            return Err(Error::LoadStateFailed(reply));
        }

        info!("Successfully loaded save state: {}", path.display());
        Ok(())
    }

    /// Raw reply to `screen`; decoding is up to the caller.
    pub async fn get_screen(&mut self) -> Result<Vec<u8>> {
        self.request(Command::Screen)
            .await
            .inspect_err(|e| error!("Failed to get screen content: {}", e))
    }

    /// Tells the script to exit, releases the socket and stops the emulator.
    ///
    /// The channel is unusable afterwards, even if stopping the process failed.
    pub async fn close(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(Error::ChannelClosed)?;
        handle
            .shutdown(self.config.close_grace)
            .await
            .inspect_err(|e| error!("Error while closing emulator: {}", e))?;
        info!("Emulator closed successfully");
        Ok(())
    }
}

impl Drop for EmulatorChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            warn!("Emulator channel dropped without close, killing emulator");
            let _ = handle.child.start_kill();
        }
    }
}

#[async_trait]
impl Controller for EmulatorChannel {
    async fn press_button(&mut self, action: Action, duration: Duration) -> Result<()> {
        EmulatorChannel::press_button(self, action, duration).await
    }

    async fn get_screen(&mut self) -> Result<Vec<u8>> {
        EmulatorChannel::get_screen(self).await
    }

    async fn load_state(&mut self, path: &Path) -> Result<()> {
        EmulatorChannel::load_state(self, path).await
    }

    async fn close(&mut self) -> Result<()> {
        EmulatorChannel::close(self).await
    }
}

fn validate_paths(config: &EmulatorConfig) -> Result<()> {
    let required = [&config.binary_path, &config.rom_path, &config.script_path];
    for path in required.into_iter().chain(config.save_state.as_ref()) {
        if !path.exists() {
            error!("Required file not found: {}", path.display());
            return Err(Error::PathNotFound(path.clone()));
        }
    }
    Ok(())
}

fn launch(config: &EmulatorConfig) -> Result<Child> {
    let mut command = ProcessCommand::new(&config.binary_path);
    command
        .arg(&config.rom_path)
        .arg(format!("--lua={}", config.script_path.display()))
        .stdin(Stdio::null())
        .kill_on_drop(true);

    info!(
        "Starting BizHawk with command: {} {} --lua={}",
        config.binary_path.display(),
        config.rom_path.display(),
        config.script_path.display()
    );
    command.spawn().map_err(|source| {
        error!("Failed to launch {}: {}", config.binary_path.display(), source);
        Error::ProcessLaunchFailed {
            binary: config.binary_path.clone(),
            source,
        }
    })
}

async fn await_handshake(socket: &UdpSocket, config: &EmulatorConfig) -> Result<SocketAddr> {
    let deadline = Instant::now() + config.startup_timeout;
    let mut buf = vec![0u8; config.max_datagram_size];
    loop {
        let (len, from) = timeout_at(deadline, socket.recv_from(&mut buf))
            .await
            .map_err(|_| Error::StartupTimeout(config.startup_timeout))?
            .map_err(|e| Error::transport("awaiting handshake", e))?;
        if &buf[..len] == HANDSHAKE {
            return Ok(from);
        }
        warn!("Ignoring {} byte datagram from {} before handshake", len, from);
    }
}

/// Kills the emulator and reaps it, giving up after `grace`.
async fn terminate(mut child: Child, grace: Duration) -> Result<()> {
    if let Some(status) = child.try_wait()? {
        debug!("Emulator already exited ({})", status);
        return Ok(());
    }
    if let Err(e) = child.start_kill() {
        // It may have exited between the check and the kill.
        debug!("Kill signal not delivered: {}", e);
    }
    match timeout(grace, child.wait()).await {
        Ok(status) => {
            let status = status?;
            debug!("Emulator exited ({})", status);
            Ok(())
        }
        Err(_) => Err(Error::ShutdownTimeout(grace)),
    }
}

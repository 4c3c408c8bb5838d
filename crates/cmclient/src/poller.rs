//! Bounded polling for async commands and other remote conditions.

use crate::error::{Error, Result};
use crate::gateway::ApiGateway;
use crate::types::{ApiCommand, CommandStatus, Reply};
use std::thread;
use std::time::Duration;

/// Budget for a poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Maximum number of checks.
    pub max_attempts: u32,
    /// Pause between two checks.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(10),
        }
    }
}

impl PollConfig {
    /// Create a poll budget.
    #[must_use]
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Budget with no pause between checks.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

/// Callback trait for poll progress notifications.
pub trait PollCallback: Send + Sync {
    /// Called before each check.
    ///
    /// # Arguments
    /// * `label` - What is being waited for
    /// * `attempt` - Current attempt number (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    fn on_poll(&self, label: &str, attempt: u32, max_attempts: u32);

    /// Called once the loop ends, whatever the outcome.
    fn on_finish(&self, _label: &str) {}
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl PollCallback for NoCallback {
    fn on_poll(&self, _label: &str, _attempt: u32, _max_attempts: u32) {}
}

/// Run `check` until it yields a value or the budget runs out.
///
/// Returns `Ok(None)` when every attempt came back empty. Errors from `check`
/// end the loop immediately.
pub fn poll_until<T, F>(
    config: &PollConfig,
    callback: Option<&dyn PollCallback>,
    label: &str,
    mut check: F,
) -> Result<Option<T>>
where
    F: FnMut(u32) -> Result<Option<T>>,
{
    let outcome = run_attempts(config, callback, label, &mut check);

    if let Some(cb) = callback {
        cb.on_finish(label);
    }
    outcome
}

fn run_attempts<T, F>(
    config: &PollConfig,
    callback: Option<&dyn PollCallback>,
    label: &str,
    check: &mut F,
) -> Result<Option<T>>
where
    F: FnMut(u32) -> Result<Option<T>>,
{
    for attempt in 1..=config.max_attempts {
        if let Some(cb) = callback {
            cb.on_poll(label, attempt, config.max_attempts);
        }

        if let Some(value) = check(attempt)? {
            return Ok(Some(value));
        }

        log::debug!(
            "{}: not ready (attempt {}/{})",
            label,
            attempt,
            config.max_attempts
        );

        if attempt < config.max_attempts && !config.interval.is_zero() {
            thread::sleep(config.interval);
        }
    }
    Ok(None)
}

/// Waits for async commands to reach a terminal state.
pub struct CommandPoller {
    config: PollConfig,
    callback: Box<dyn PollCallback>,
}

impl CommandPoller {
    /// Create a poller with no progress reporting.
    #[must_use]
    pub fn new(config: PollConfig) -> Self {
        Self::with_callback(config, Box::new(NoCallback))
    }

    /// Create a poller reporting progress to `callback`.
    #[must_use]
    pub fn with_callback(config: PollConfig, callback: Box<dyn PollCallback>) -> Self {
        Self { config, callback }
    }

    /// Poll budget in use.
    #[must_use]
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Progress callback in use, for loops that share it.
    #[must_use]
    pub fn callback(&self) -> &dyn PollCallback {
        self.callback.as_ref()
    }

    /// Block until command `id` succeeds, fails, or the budget runs out.
    ///
    /// Returns the command's result message on success.
    pub fn wait(&self, gateway: &ApiGateway, id: u64) -> Result<String> {
        let path = format!("/commands/{}", id);
        let label = format!("command {}", id);

        let terminal = poll_until(&self.config, Some(self.callback()), &label, |_| {
            let command = gateway
                .get(&path)?
                .json::<ApiCommand>(&path)?
                .unwrap_or_else(|| ApiCommand {
                    id: Some(id),
                    success: Some(true),
                    result_message: Some("simulated".to_string()),
                    ..Default::default()
                });
            match command.status() {
                CommandStatus::Pending => Ok(None),
                _ => Ok(Some(command)),
            }
        })?;

        match terminal {
            Some(command) if command.status() == CommandStatus::Succeeded => {
                log::info!("command {} succeeded: {}", id, command.message());
                Ok(command.message())
            }
            Some(command) => Err(Error::CommandFailed {
                id,
                message: command.message(),
            }),
            None => Err(Error::CommandTimeout {
                id,
                attempts: self.config.max_attempts,
            }),
        }
    }

    /// Wait for the command a submission reply refers to.
    ///
    /// Simulated replies were never sent, so there is nothing to poll: they
    /// count as immediate success. A real reply must carry a command id.
    pub fn wait_for_reply(
        &self,
        gateway: &ApiGateway,
        endpoint: &str,
        reply: &Reply,
    ) -> Result<String> {
        match reply.command(endpoint)? {
            Some(handle) => {
                log::info!(
                    "{} submitted command {} {}",
                    endpoint,
                    handle.id,
                    handle.name
                );
                self.wait(gateway, handle.id)
            }
            None => {
                log::info!("{} simulated, skipping command poll", endpoint);
                Ok(String::new())
            }
        }
    }
}

//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI and link state machine
//! - [`Driver`]: Platform-specific I/O

use houston_core::LinkConfig;

use crate::{App, AppAction, Driver};

/// Generic runtime that orchestrates App and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
pub struct Runtime<D>
where
    D: Driver,
{
    driver: D,
    app: App<D::Instant>,
}

impl<D> Runtime<D>
where
    D: Driver,
{
    /// Create a new runtime with the given driver and link configuration.
    pub fn new(driver: D, config: LinkConfig) -> Self {
        Self { driver, app: App::new(config) }
    }

    /// Run the main event loop.
    ///
    /// This is the core orchestration loop that:
    /// 1. Polls for input events from the driver
    /// 2. Feeds them to the App along with the driver's clock
    /// 3. Executes the resulting actions through the driver
    ///
    /// Returns when the App quits or the driver runs out of events.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(&mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;

        while let Some(event) = self.driver.poll_event().await? {
            let now = self.driver.now();
            let actions = self.app.handle(event, now);
            if self.process_actions(actions).await? {
                break;
            }
        }

        self.driver.stop();
        Ok(())
    }

    /// Execute actions returned by the App.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, actions: Vec<AppAction>) -> Result<bool, D::Error> {
        for action in actions {
            match action {
                AppAction::Render => self.driver.render(&self.app)?,
                AppAction::Quit => return Ok(true),
                AppAction::Transport(command) => {
                    tracing::trace!(?command, "transport command");
                    self.driver.execute(command).await?;
                },
                AppAction::ScheduleRetry { after, token } => {
                    tracing::debug!(?after, ?token, "arming retry timer");
                    self.driver.schedule_retry(after, token);
                },
                AppAction::CancelRetry { token } => self.driver.cancel_retry(token),
            }
        }
        Ok(false)
    }

    /// Consume the runtime, returning the App and Driver.
    pub fn into_parts(self) -> (App<D::Instant>, D) {
        (self.app, self.driver)
    }
}

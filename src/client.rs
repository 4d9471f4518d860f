//! Async dashboard driver.
//!
//! Each user action runs as one busy episode: the trigger is disabled, the
//! busy overlay is shown and advanced once per second while the request is in
//! flight, and both are undone when the episode ends, whichever way it ends.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use crate::api::{ApiClient, CourseId, ReqwestTransport, Transport};
use crate::busy::{BusyOptions, Feedback, NoFeedback, StatusMessage};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::modal::CloseReason;
use crate::registry::{MemoryRegistry, ObjectRegistry};
use crate::session::{Dispatch, SessionController, Trigger};

/// Drives a [`SessionController`] against the extraction service.
pub struct Dashboard<T: Transport = ReqwestTransport, R: ObjectRegistry = MemoryRegistry> {
    api: ApiClient<T>,
    controller: SessionController<R>,
    feedback: Arc<dyn Feedback>,
    extract_estimate_secs: u64,
    extract_all_estimate_secs: u64,
    tick: Duration,
}

impl Dashboard {
    /// Creates a dashboard from configuration with the default transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig, feedback: Arc<dyn Feedback>) -> Result<Self> {
        let api = ApiClient::from_config(config)?;
        Ok(Self::new(api, SessionController::default(), feedback)
            .with_estimates(config.extract_estimate_secs, config.extract_all_estimate_secs))
    }
}

impl<T: Transport, R: ObjectRegistry> Dashboard<T, R> {
    #[must_use]
    pub fn new(
        api: ApiClient<T>,
        controller: SessionController<R>,
        feedback: Arc<dyn Feedback>,
    ) -> Self {
        let defaults = ClientConfig::default();
        Self {
            api,
            controller,
            feedback,
            extract_estimate_secs: defaults.extract_estimate_secs,
            extract_all_estimate_secs: defaults.extract_all_estimate_secs,
            tick: Duration::from_secs(1),
        }
    }

    /// Creates a dashboard that reports nothing.
    #[must_use]
    pub fn headless(api: ApiClient<T>, controller: SessionController<R>) -> Self {
        Self::new(api, controller, Arc::new(NoFeedback))
    }

    /// Sets the countdown estimates for single-course and bulk extraction.
    #[must_use]
    pub fn with_estimates(mut self, extract_secs: u64, extract_all_secs: u64) -> Self {
        self.extract_estimate_secs = extract_secs;
        self.extract_all_estimate_secs = extract_all_secs;
        self
    }

    #[must_use]
    pub const fn controller(&self) -> &SessionController<R> {
        &self.controller
    }

    pub const fn controller_mut(&mut self) -> &mut SessionController<R> {
        &mut self.controller
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient<T> {
        &self.api
    }

    fn report_status(&self) {
        if let Some(status) = self.controller.status() {
            self.feedback.on_status(status);
        }
    }

    fn report_login_error(&self) {
        if let Some(error) = self.controller.login_error() {
            self.feedback.on_status(&StatusMessage::error(error));
        }
    }

    /// Logs in and loads the course list.
    ///
    /// # Errors
    ///
    /// Configuration and credential problems fail before any request.
    /// Otherwise see [`SessionController::apply_login`].
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let checked = self
            .controller
            .validate_credentials(username, password)
            .and_then(|()| {
                self.api
                    .ensure_configured()
                    .map_err(|e| self.controller.reject_login(e))
            });
        if let Err(e) = checked {
            self.report_login_error();
            return Err(e);
        }

        let dispatch =
            self.controller
                .begin(Trigger::Login, "Signing in…", BusyOptions::indeterminate())?;
        let outcome = run_episode(
            &mut self.controller,
            self.feedback.as_ref(),
            &dispatch,
            self.tick,
            self.api.login(username, password),
        )
        .await;
        let applied = self.controller.apply_login(dispatch.epoch, outcome);
        if applied.is_err() {
            self.report_login_error();
        }
        applied
    }

    /// Reloads the course list.
    ///
    /// # Errors
    ///
    /// See [`SessionController::apply_courses`].
    pub async fn refresh_courses(&mut self) -> Result<()> {
        let dispatch = self.controller.begin(
            Trigger::Refresh,
            "Refreshing courses…",
            BusyOptions::indeterminate(),
        )?;
        let api = &self.api;
        let outcome = run_episode(
            &mut self.controller,
            self.feedback.as_ref(),
            &dispatch,
            self.tick,
            async { api.courses(dispatch.token()?).await },
        )
        .await;
        let applied = self.controller.apply_courses(dispatch.epoch, outcome);
        self.report_status();
        applied
    }

    /// Exports one course's roster and email list.
    ///
    /// # Errors
    ///
    /// See [`SessionController::apply_extract`].
    pub async fn extract_course(&mut self, id: &CourseId) -> Result<()> {
        let name = self
            .controller
            .courses()
            .iter()
            .find(|c| c.id == *id)
            .map_or_else(|| id.to_string(), |c| c.name.clone());
        let dispatch = self.controller.begin(
            Trigger::Extract(id.clone()),
            &format!("Extracting {name}…"),
            BusyOptions::countdown(self.extract_estimate_secs),
        )?;
        let api = &self.api;
        let outcome = run_episode(
            &mut self.controller,
            self.feedback.as_ref(),
            &dispatch,
            self.tick,
            async { api.extract_course(dispatch.token()?, id).await },
        )
        .await;
        let applied = self.controller.apply_extract(dispatch.epoch, id, outcome);
        self.report_status();
        applied
    }

    /// Exports every course as one archive, shown in the dialog.
    ///
    /// # Errors
    ///
    /// See [`SessionController::apply_extract_all`].
    pub async fn extract_all(&mut self) -> Result<()> {
        let dispatch = self.controller.begin(
            Trigger::ExtractAll,
            "Exporting all courses…",
            BusyOptions::countdown(self.extract_all_estimate_secs),
        )?;
        let api = &self.api;
        let outcome = run_episode(
            &mut self.controller,
            self.feedback.as_ref(),
            &dispatch,
            self.tick,
            async { api.extract_all(dispatch.token()?).await },
        )
        .await;
        let applied = self.controller.apply_extract_all(dispatch.epoch, outcome);
        self.report_status();
        applied
    }

    /// Closes the download dialog. Returns the control to refocus.
    pub fn close_modal(&mut self, reason: CloseReason) -> Option<Trigger> {
        self.controller.close_modal(reason)
    }

    /// Ends the session and releases every download.
    pub fn logout(&mut self) {
        self.controller.logout();
        self.feedback.on_idle();
    }
}

/// Ends a busy episode when dropped.
struct Episode<'a, R: ObjectRegistry> {
    controller: &'a mut SessionController<R>,
    feedback: &'a dyn Feedback,
    trigger: &'a Trigger,
}

impl<R: ObjectRegistry> Drop for Episode<'_, R> {
    fn drop(&mut self) {
        self.controller.finish(self.trigger);
        self.feedback.on_idle();
    }
}

/// Awaits `request` while ticking the busy timer every `tick`.
async fn run_episode<R, F, O>(
    controller: &mut SessionController<R>,
    feedback: &dyn Feedback,
    dispatch: &Dispatch,
    tick: Duration,
    request: F,
) -> Result<O>
where
    R: ObjectRegistry,
    F: Future<Output = Result<O>>,
{
    let episode = Episode {
        controller,
        feedback,
        trigger: &dispatch.trigger,
    };
    feedback.on_busy(episode.controller.busy());

    let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(request);

    loop {
        tokio::select! {
            outcome = &mut request => return outcome,
            _ = ticker.tick() => {
                if episode.controller.tick().is_timed() {
                    feedback.on_tick(episode.controller.busy());
                }
            }
        }
    }
}

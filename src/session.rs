//! Session controller: authentication state, courses and per-course downloads.
//!
//! The controller is a synchronous state machine. Network effects reach it in
//! two steps: [`SessionController::begin`] starts a busy episode and captures
//! the session epoch, and one of the `apply_*` methods commits the response.
//! A response whose epoch no longer matches (the user logged out or in again
//! in the meantime) is discarded untouched.

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use crate::api::{Course, CourseId, ExtractAllResponse, ExtractResponse, LoginResponse};
use crate::artifact::{DownloadManager, DownloadSet, MIME_CSV, MIME_TEXT, MIME_ZIP};
use crate::busy::{BusyIndicator, BusyOptions, BusyState, StatusMessage};
use crate::error::{Error, Result};
use crate::modal::{ArchiveExport, CloseReason, Modal, ModalContent};
use crate::registry::{MemoryRegistry, ObjectRegistry, ObjectUrl};

/// Which screen is shown. Derived from the session, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiMode {
    LoggedOut,
    Dashboard,
}

/// A control that starts a network action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Trigger {
    Login,
    Refresh,
    Extract(CourseId),
    ExtractAll,
}

impl Trigger {
    const fn needs_session(&self) -> bool {
        !matches!(self, Self::Login)
    }
}

/// Ticket for an in-flight request.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub trigger: Trigger,
    /// Session epoch when the request was issued.
    pub epoch: u64,
    /// Token to authenticate the request with (absent for login).
    pub token: Option<String>,
}

impl Dispatch {
    /// Token for an authenticated request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthenticated`] for a ticket issued without a session.
    pub fn token(&self) -> Result<&str> {
        self.token.as_deref().ok_or(Error::NotAuthenticated)
    }
}

#[derive(Debug, Default)]
struct Session {
    token: Option<String>,
    epoch: u64,
    expires_at: Option<Instant>,
}

pub struct SessionController<R: ObjectRegistry = MemoryRegistry> {
    session: Session,
    courses: Vec<Course>,
    downloads: BTreeMap<CourseId, DownloadSet>,
    manager: DownloadManager<R>,
    disabled: HashSet<Trigger>,
    busy: BusyIndicator,
    modal: Modal,
    status: Option<StatusMessage>,
    login_error: Option<String>,
}

impl Default for SessionController<MemoryRegistry> {
    fn default() -> Self {
        Self::new(DownloadManager::default())
    }
}

impl<R: ObjectRegistry> SessionController<R> {
    #[must_use]
    pub fn new(manager: DownloadManager<R>) -> Self {
        Self {
            session: Session::default(),
            courses: Vec::new(),
            downloads: BTreeMap::new(),
            manager,
            disabled: HashSet::new(),
            busy: BusyIndicator::new(),
            modal: Modal::new(),
            status: None,
            login_error: None,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> UiMode {
        if self.session.token.is_some() {
            UiMode::Dashboard
        } else {
            UiMode::LoggedOut
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.session.token.is_some()
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.session.token.as_deref()
    }

    /// Counter that advances on every login and logout.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.session.epoch
    }

    /// Time left before the service expires the session, if it told us.
    #[must_use]
    pub fn expires_in(&self) -> Option<Duration> {
        self.session
            .expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    #[must_use]
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    #[must_use]
    pub fn downloads(&self, id: &CourseId) -> Option<&DownloadSet> {
        self.downloads.get(id)
    }

    /// Every live download set, including those of courses no longer listed.
    pub fn download_sets(&self) -> impl Iterator<Item = (&CourseId, &DownloadSet)> {
        self.downloads.iter()
    }

    #[must_use]
    pub const fn busy(&self) -> &BusyIndicator {
        &self.busy
    }

    #[must_use]
    pub const fn modal(&self) -> &Modal {
        &self.modal
    }

    #[must_use]
    pub const fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    #[must_use]
    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    #[must_use]
    pub fn is_enabled(&self, trigger: &Trigger) -> bool {
        !self.disabled.contains(trigger)
    }

    #[must_use]
    pub const fn manager(&self) -> &DownloadManager<R> {
        &self.manager
    }

    pub fn set_status(&mut self, status: StatusMessage) {
        self.status = Some(status);
    }

    // ------------------------------------------------------------------
    // Busy episodes
    // ------------------------------------------------------------------

    /// Starts a busy episode for `trigger`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] while another episode is running and
    /// [`Error::NotAuthenticated`] if the action needs a session and there is
    /// none. Neither starts an episode.
    pub fn begin(
        &mut self,
        trigger: Trigger,
        message: &str,
        options: BusyOptions,
    ) -> Result<Dispatch> {
        if !self.disabled.is_empty() || self.busy.state().is_busy() {
            return Err(Error::Busy);
        }
        if trigger.needs_session() && self.session.token.is_none() {
            return Err(Error::NotAuthenticated);
        }
        self.disabled.insert(trigger.clone());
        self.busy.show(message, options);
        Ok(Dispatch {
            trigger,
            epoch: self.session.epoch,
            token: self.session.token.clone(),
        })
    }

    /// Advances the busy timer by one second.
    pub fn tick(&mut self) -> BusyState {
        self.busy.tick()
    }

    /// Ends the busy episode for `trigger` and re-enables it. Idempotent.
    pub fn finish(&mut self, trigger: &Trigger) {
        self.disabled.remove(trigger);
        self.busy.hide();
    }

    fn check_epoch(&self, epoch: u64) -> Result<()> {
        if epoch == self.session.epoch {
            Ok(())
        } else {
            log::warn!(
                "Discarding response for session epoch {epoch} (current {})",
                self.session.epoch
            );
            Err(Error::StaleResponse)
        }
    }

    // ------------------------------------------------------------------
    // Login / logout
    // ------------------------------------------------------------------

    /// Checks credentials locally before any request is made.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] when either field is blank; the
    /// message is also stored as the login error.
    pub fn validate_credentials(&mut self, username: &str, password: &str) -> Result<()> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(self.reject_login(Error::Authentication(
                "Username and password are required.".to_string(),
            )));
        }
        Ok(())
    }

    /// Records a login failure for display and returns the error to surface.
    ///
    /// A rejected request (any HTTP status) becomes [`Error::Authentication`].
    pub fn reject_login(&mut self, err: Error) -> Error {
        let err = match err {
            Error::Transport {
                message,
                status: Some(_),
            } => Error::Authentication(message),
            other => other,
        };
        log::warn!("Login failed: {err}");
        self.login_error = Some(err.to_string());
        err
    }

    /// Commits the outcome of a login request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleResponse`] for an outdated epoch, otherwise the
    /// login failure (see [`SessionController::reject_login`]).
    pub fn apply_login(&mut self, epoch: u64, outcome: Result<LoginResponse>) -> Result<()> {
        self.check_epoch(epoch)?;
        let response = outcome.map_err(|e| self.reject_login(e))?;

        self.clear_downloads();
        self.session.token = Some(response.token);
        self.session.epoch += 1;
        self.session.expires_at = response
            .expires_in
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        self.courses = response.courses;
        self.login_error = None;
        self.status = None;
        log::info!("Logged in, {} course(s) available", self.courses.len());
        Ok(())
    }

    /// Ends the session, releasing every download. Safe to call repeatedly.
    pub fn logout(&mut self) {
        if self.session.token.is_some() {
            log::info!("Logging out");
        }
        self.clear_downloads();
        self.courses.clear();
        self.session.token = None;
        self.session.expires_at = None;
        self.session.epoch += 1;
        self.disabled.clear();
        self.busy.hide();
        self.status = None;
        self.login_error = None;
    }

    /// Releases every download set and any archive held by the dialog.
    fn clear_downloads(&mut self) {
        let sets = std::mem::take(&mut self.downloads);
        self.manager.release_all(sets.into_values());
        if let Some(closed) = self.modal.close(CloseReason::CloseButton)
            && let Some(mut archive) = closed.archive
        {
            self.manager.release(&mut archive.artifact);
        }
    }

    // ------------------------------------------------------------------
    // Authenticated actions
    // ------------------------------------------------------------------

    fn fail_action(&mut self, err: Error) -> Error {
        log::warn!("Request failed: {err}");
        self.status = Some(StatusMessage::error(err.to_string()));
        err
    }

    /// Commits a refreshed course list. Download sets are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleResponse`] for an outdated epoch, otherwise the
    /// request failure, which is also posted as a status message.
    pub fn apply_courses(&mut self, epoch: u64, outcome: Result<Vec<Course>>) -> Result<()> {
        self.check_epoch(epoch)?;
        let courses = outcome.map_err(|e| self.fail_action(e))?;
        self.courses = courses;
        self.status = Some(StatusMessage::info(format!(
            "Loaded {} course(s).",
            self.courses.len()
        )));
        Ok(())
    }

    /// Commits an extraction for `id`, replacing the course's previous set.
    ///
    /// Both payloads are decoded before anything is replaced, so a broken
    /// payload leaves the previous set live.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleResponse`] for an outdated epoch, otherwise the
    /// request or decoding failure, which is also posted as a status message.
    pub fn apply_extract(
        &mut self,
        epoch: u64,
        id: &CourseId,
        outcome: Result<ExtractResponse>,
    ) -> Result<()> {
        self.check_epoch(epoch)?;
        let response = outcome.map_err(|e| self.fail_action(e))?;

        let roster = self
            .manager
            .materialize(
                &response.csv_filename,
                &response.csv_base64,
                MIME_CSV,
                "Roster (CSV)",
            )
            .map_err(|e| self.fail_action(e))?;
        let emails = self
            .manager
            .materialize(
                &response.email_list_filename,
                &response.email_list_base64,
                MIME_TEXT,
                "Email list (TXT)",
            )
            .map_err(|e| self.fail_action(e))?;

        if let Some(previous) = self.downloads.remove(id) {
            log::debug!("Releasing previous downloads for course {id}");
            self.manager.release_set(previous);
        }
        let set = DownloadSet {
            course_name: response.course_name,
            participant_count: response.participant_count,
            artifacts: vec![roster, emails],
        };

        let text = match set.participant_count {
            Some(count) => format!("{} is ready ({count} participants).", set.course_name),
            None => format!("{} is ready.", set.course_name),
        };
        log::info!("Extracted course {id}: {text}");
        self.downloads.insert(id.clone(), set);
        self.show_modal(
            ModalContent::Course(id.clone()),
            Trigger::Extract(id.clone()),
        );
        self.status = Some(StatusMessage::success(text));
        Ok(())
    }

    /// Commits a bulk export. The archive lives only as long as the dialog.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleResponse`] for an outdated epoch, otherwise the
    /// request or decoding failure, which is also posted as a status message.
    pub fn apply_extract_all(
        &mut self,
        epoch: u64,
        outcome: Result<ExtractAllResponse>,
    ) -> Result<()> {
        self.check_epoch(epoch)?;
        let response = outcome.map_err(|e| self.fail_action(e))?;
        let artifact = self
            .manager
            .materialize(
                &response.filename,
                &response.base64,
                MIME_ZIP,
                "All courses (ZIP)",
            )
            .map_err(|e| self.fail_action(e))?;

        let text = match response.course_count {
            Some(count) => format!("Exported {count} course(s)."),
            None => "Export ready.".to_string(),
        };
        log::info!("Bulk export ready: {}", response.filename);
        self.show_modal(
            ModalContent::Archive(ArchiveExport {
                artifact,
                course_count: response.course_count,
            }),
            Trigger::ExtractAll,
        );
        self.status = Some(StatusMessage::success(text));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Dialog and links
    // ------------------------------------------------------------------

    fn show_modal(&mut self, content: ModalContent, focused: Trigger) {
        if let Some(mut replaced) = self.modal.open(content, Some(focused)) {
            self.manager.release(&mut replaced.artifact);
        }
    }

    /// Closes the dialog, releasing a bulk archive it held.
    ///
    /// Returns the control that should regain focus; `None` if the dialog
    /// was already closed.
    pub fn close_modal(&mut self, reason: CloseReason) -> Option<Trigger> {
        let closed = self.modal.close(reason)?;
        if let Some(mut archive) = closed.archive {
            self.manager.release(&mut archive.artifact);
        }
        closed.restore_focus
    }

    /// Returns the link for artifact `index` of course `id`, creating it lazily.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Released`] if the course has no such live artifact.
    pub fn link(&mut self, id: &CourseId, index: usize) -> Result<ObjectUrl> {
        let artifact = self
            .downloads
            .get_mut(id)
            .and_then(|set| set.artifacts.get_mut(index))
            .ok_or_else(|| Error::Released(format!("{id}#{index}")))?;
        self.manager.link(artifact)
    }

    /// Returns the link for the archive shown in the dialog, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Released`] if the archive was already released.
    pub fn link_archive(&mut self) -> Result<Option<ObjectUrl>> {
        match self.modal.content_mut() {
            Some(ModalContent::Archive(archive)) => {
                self.manager.link(&mut archive.artifact).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// The archive currently shown in the dialog.
    #[must_use]
    pub const fn archive(&self) -> Option<&ArchiveExport> {
        match self.modal.content() {
            Some(ModalContent::Archive(archive)) => Some(archive),
            _ => None,
        }
    }
}

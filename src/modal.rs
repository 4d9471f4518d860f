//! The download-ready dialog.

use crate::api::CourseId;
use crate::artifact::DownloadArtifact;
use crate::session::Trigger;

/// Result of a bulk export, owned by the dialog that presents it.
#[derive(Debug)]
pub struct ArchiveExport {
    /// The ZIP archive.
    pub artifact: DownloadArtifact,
    /// Number of courses the service exported, when reported.
    pub course_count: Option<u64>,
}

/// What the dialog is showing.
#[derive(Debug)]
pub enum ModalContent {
    /// The live download set of a course (owned by the session).
    Course(CourseId),
    /// A bulk archive, discarded when the dialog closes.
    Archive(ArchiveExport),
}

/// How the user dismissed the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    CloseButton,
    Backdrop,
    Escape,
}

/// What the caller must do after the dialog closed.
#[derive(Debug)]
pub struct ModalClosed {
    /// Control to give focus back to.
    pub restore_focus: Option<Trigger>,
    /// Archive that must now be released.
    pub archive: Option<ArchiveExport>,
}

#[derive(Debug, Default)]
pub struct Modal {
    content: Option<ModalContent>,
    return_focus: Option<Trigger>,
}

impl Modal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.content.is_some()
    }

    #[must_use]
    pub const fn content(&self) -> Option<&ModalContent> {
        self.content.as_ref()
    }

    pub const fn content_mut(&mut self) -> Option<&mut ModalContent> {
        self.content.as_mut()
    }

    /// Shows `content`, remembering which control had focus.
    ///
    /// When the dialog is already open its content is replaced and the
    /// originally recorded focus is kept. A replaced archive is returned so the
    /// caller can release it.
    pub fn open(
        &mut self,
        content: ModalContent,
        focused: Option<Trigger>,
    ) -> Option<ArchiveExport> {
        if self.content.is_none() {
            self.return_focus = focused;
        }
        match self.content.replace(content) {
            Some(ModalContent::Archive(archive)) => Some(archive),
            _ => None,
        }
    }

    /// Closes the dialog. Returns `None` if it was not open.
    pub fn close(&mut self, reason: CloseReason) -> Option<ModalClosed> {
        let content = self.content.take()?;
        log::debug!("Dialog closed ({reason:?})");
        let archive = match content {
            ModalContent::Archive(archive) => Some(archive),
            ModalContent::Course(_) => None,
        };
        Some(ModalClosed {
            restore_focus: self.return_focus.take(),
            archive,
        })
    }
}

//! View model rendered from controller state.

use std::fmt;

use crate::api::CourseId;
use crate::artifact::DownloadArtifact;
use crate::busy::{StatusKind, StatusMessage};
use crate::error::Result;
use crate::format::format_bytes;
use crate::modal::ModalContent;
use crate::registry::{ObjectRegistry, ObjectUrl};
use crate::session::{SessionController, Trigger, UiMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub label: String,
    pub filename: String,
    pub size: u64,
    pub url: ObjectUrl,
}

impl DownloadLink {
    fn new(artifact: &DownloadArtifact, url: ObjectUrl) -> Self {
        Self {
            label: artifact.label().to_string(),
            filename: artifact.filename().to_string(),
            size: artifact.size(),
            url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRow {
    pub id: CourseId,
    pub name: String,
    pub extract_enabled: bool,
    pub participant_count: Option<u64>,
    pub downloads: Vec<DownloadLink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusyView {
    pub message: String,
    pub timer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalView {
    Course {
        course_name: String,
        links: Vec<DownloadLink>,
    },
    Archive {
        link: DownloadLink,
        course_count: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Login {
        error: Option<String>,
        login_enabled: bool,
        busy: Option<BusyView>,
    },
    Dashboard {
        courses: Vec<CourseRow>,
        refresh_enabled: bool,
        extract_all_enabled: bool,
        status: Option<StatusMessage>,
        busy: Option<BusyView>,
        modal: Option<ModalView>,
    },
}

/// Links every live artifact of course `id`.
fn course_links<R: ObjectRegistry>(
    controller: &mut SessionController<R>,
    id: &CourseId,
) -> Result<Vec<DownloadLink>> {
    let count = controller.downloads(id).map_or(0, |set| set.artifacts.len());
    let mut links = Vec::with_capacity(count);
    for index in 0..count {
        let url = controller.link(id, index)?;
        if let Some(artifact) = controller
            .downloads(id)
            .and_then(|set| set.artifacts.get(index))
        {
            links.push(DownloadLink::new(artifact, url));
        }
    }
    Ok(links)
}

/// Renders the current state.
///
/// Download links are created on demand here, so artifacts that are never
/// rendered never occupy the registry. Downloads are shown only for courses
/// in the current list.
///
/// # Errors
///
/// Returns [`crate::Error::Released`] if an artifact vanished mid-render.
pub fn render<R: ObjectRegistry>(controller: &mut SessionController<R>) -> Result<View> {
    let busy = controller.busy().message().map(|message| BusyView {
        message: message.to_string(),
        timer: controller.busy().timer_text(),
    });

    if controller.mode() == UiMode::LoggedOut {
        return Ok(View::Login {
            error: controller.login_error().map(str::to_string),
            login_enabled: controller.is_enabled(&Trigger::Login),
            busy,
        });
    }

    let listed: Vec<(CourseId, String)> = controller
        .courses()
        .iter()
        .map(|c| (c.id.clone(), c.name.clone()))
        .collect();
    let mut courses = Vec::with_capacity(listed.len());
    for (id, name) in listed {
        let downloads = course_links(controller, &id)?;
        courses.push(CourseRow {
            extract_enabled: controller.is_enabled(&Trigger::Extract(id.clone())),
            participant_count: controller.downloads(&id).and_then(|s| s.participant_count),
            downloads,
            id,
            name,
        });
    }

    let modal_course = match controller.modal().content() {
        Some(ModalContent::Course(id)) => Some(id.clone()),
        _ => None,
    };
    let modal = if let Some(id) = modal_course {
        let course_name = controller
            .downloads(&id)
            .map_or_else(|| id.to_string(), |s| s.course_name.clone());
        Some(ModalView::Course {
            links: course_links(controller, &id)?,
            course_name,
        })
    } else if let Some(url) = controller.link_archive()? {
        controller.archive().map(|archive| ModalView::Archive {
            link: DownloadLink::new(&archive.artifact, url),
            course_count: archive.course_count,
        })
    } else {
        None
    };

    Ok(View::Dashboard {
        courses,
        refresh_enabled: controller.is_enabled(&Trigger::Refresh),
        extract_all_enabled: controller.is_enabled(&Trigger::ExtractAll),
        status: controller.status().cloned(),
        busy,
        modal,
    })
}

fn write_link(f: &mut fmt::Formatter<'_>, link: &DownloadLink) -> fmt::Result {
    writeln!(
        f,
        "    {} - {} ({}) <{}>",
        link.label,
        link.filename,
        format_bytes(link.size),
        link.url
    )
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login { error, busy, .. } => {
                writeln!(f, "Sign in")?;
                if let Some(busy) = busy {
                    writeln!(f, "  {}", busy.message)?;
                }
                if let Some(error) = error {
                    writeln!(f, "  Error: {error}")?;
                }
                Ok(())
            }
            Self::Dashboard {
                courses,
                status,
                busy,
                modal,
                ..
            } => {
                writeln!(f, "Courses ({})", courses.len())?;
                for row in courses {
                    match row.participant_count {
                        Some(n) => writeln!(f, "  [{}] {} - {n} participants", row.id, row.name)?,
                        None => writeln!(f, "  [{}] {}", row.id, row.name)?,
                    }
                    for link in &row.downloads {
                        write_link(f, link)?;
                    }
                }
                if let Some(busy) = busy {
                    match &busy.timer {
                        Some(timer) => writeln!(f, "{} {timer}", busy.message)?,
                        None => writeln!(f, "{}", busy.message)?,
                    }
                }
                if let Some(status) = status {
                    let prefix = match status.kind {
                        StatusKind::Info => "",
                        StatusKind::Success => "✓ ",
                        StatusKind::Error => "Error: ",
                    };
                    writeln!(f, "{prefix}{}", status.text)?;
                }
                match modal {
                    Some(ModalView::Course { course_name, links }) => {
                        writeln!(f, "Downloads ready: {course_name}")?;
                        for link in links {
                            write_link(f, link)?;
                        }
                    }
                    Some(ModalView::Archive { link, .. }) => {
                        writeln!(f, "Export ready")?;
                        write_link(f, link)?;
                    }
                    None => {}
                }
                Ok(())
            }
        }
    }
}

//! roster-dl - A client for a course roster extraction service.
//!
//! This library drives the extraction workflow (login, course listing,
//! per-course and bulk extraction) and owns the downloadable artifacts it
//! produces, abstracted from any specific UI or display framework.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use roster_dl::{ClientConfig, CourseId, Dashboard, NoFeedback};
//!
//! # async fn example() -> roster_dl::Result<()> {
//! let config = ClientConfig::new().with_api_base("https://roster.example.edu");
//! let mut dashboard = Dashboard::from_config(&config, Arc::new(NoFeedback))?;
//!
//! dashboard.login("jdoe", "hunter2").await?;
//! dashboard.extract_course(&CourseId::from("4567")).await?;
//!
//! let view = roster_dl::render(dashboard.controller_mut())?;
//! println!("{view}");
//!
//! dashboard.logout();
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod api;
pub mod artifact;
pub mod busy;
#[cfg(feature = "cli")]
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod fs;
pub mod modal;
pub mod registry;
pub mod session;
pub mod view;

// Re-export main types for convenience
pub use api::{ApiClient, Course, CourseId, ReqwestTransport, Transport};
pub use artifact::{DownloadArtifact, DownloadManager, DownloadSet};
pub use busy::{
    BusyIndicator, BusyOptions, BusyState, Feedback, NoFeedback, StatusKind, StatusMessage,
};
pub use client::Dashboard;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use format::{format_bytes, format_clock};
pub use fs::{FileSystem, TokioFileSystem, save_download};
pub use modal::{ArchiveExport, CloseReason, Modal, ModalContent};
pub use registry::{MemoryRegistry, ObjectRegistry, ObjectUrl};
pub use session::{SessionController, Trigger, UiMode};
pub use view::{View, render};

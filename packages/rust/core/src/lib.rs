//! Core pipeline logic for CourseLens.
//!
//! This crate ties mutation detection, row parsing, the data gateway, and
//! badge presentation together around one shared page (e.g.,
//! [`Enricher::enrich_on_load`] and [`Enricher::watch`]).

pub mod chart;
pub mod detect;
pub mod enrich;
pub mod parse;
pub mod popup;
pub mod render;
pub mod tasks;

pub use enrich::{ClickOutcome, CourseState, Enricher, SessionState, TitlePhase};
pub use parse::{RowEntry, SectionBatch};
pub use popup::{PopupManager, PopupShell};
pub use render::{BadgePresenter, Presenter};
pub use tasks::TaskSet;

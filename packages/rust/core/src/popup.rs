//! The single data popup opened from a badge click.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use courselens_page::{NodeId, Page};

/// Class of the popup container appended to the page body.
pub const POPUP_CLASS: &str = "enrichment-popup";
/// Class of the popup's title element.
pub const POPUP_TITLE_CLASS: &str = "popup-graph-title";
/// Class of the instructor popup's totals line, filled when data arrives.
pub const POPUP_SUBTITLE_CLASS: &str = "popup-graph-subtitle";
/// Class of the element the chart renders into.
pub const CHART_AREA_CLASS: &str = "chart-area";
/// Class of the instructor popup's review block.
pub const REVIEW_CONTAINER_CLASS: &str = "professor-review-container";

/// Skeleton nodes of a freshly opened popup. The title is set at open
/// time; the subtitle and chart area are filled when the fetch lands.
#[derive(Debug, Clone, Copy)]
pub struct PopupShell {
    pub popup: NodeId,
    pub title: NodeId,
    pub subtitle: Option<NodeId>,
    pub area: NodeId,
}

/// Tracks the one popup allowed on the page.
///
/// Opening from a new trigger closes the old popup first; opening from the
/// trigger of the current popup closes it and opens nothing.
#[derive(Debug, Default)]
pub struct PopupManager {
    active: Mutex<Option<ActivePopup>>,
}

#[derive(Debug, Clone, Copy)]
struct ActivePopup {
    popup: NodeId,
    trigger: NodeId,
}

impl PopupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the popup for `trigger`. Returns the new popup's shell, or
    /// `None` when the click closed the popup this trigger had open.
    pub fn toggle(
        &self,
        page: &mut Page,
        trigger: NodeId,
        subject: &str,
        with_subtitle: bool,
    ) -> Option<PopupShell> {
        let mut active = self.lock();
        if let Some(current) = active.take() {
            page.detach(current.popup);
            if current.trigger == trigger {
                debug!(subject, "popup toggled closed");
                return None;
            }
        }

        let shell = build_shell(page, subject, with_subtitle);
        let body = page.body();
        page.append_child(body, shell.popup);
        *active = Some(ActivePopup {
            popup: shell.popup,
            trigger,
        });
        debug!(subject, "popup opened");
        Some(shell)
    }

    /// Close the popup when a click at `target` lands outside both the
    /// popup and the trigger that opened it.
    pub fn dismiss_outside(&self, page: &mut Page, target: NodeId) -> bool {
        let mut active = self.lock();
        let Some(current) = *active else {
            return false;
        };
        if page.contains(current.popup, target) || page.contains(current.trigger, target) {
            return false;
        }
        page.detach(current.popup);
        *active = None;
        debug!("popup dismissed by outside click");
        true
    }

    /// Close whatever popup is open, if any.
    pub fn close_active(&self, page: &mut Page) -> bool {
        let mut active = self.lock();
        let Some(current) = active.take() else {
            return false;
        };
        page.detach(current.popup);
        debug!("popup closed");
        true
    }

    /// The open popup's container, if any.
    pub fn active(&self) -> Option<NodeId> {
        (*self.lock()).map(|current| current.popup)
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActivePopup>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Build the detached popup skeleton: title, optional subtitle line, chart
/// area.
fn build_shell(page: &mut Page, subject: &str, with_subtitle: bool) -> PopupShell {
    let popup = page.create_element("div");
    page.add_class(popup, POPUP_CLASS);

    let title = page.create_element("b");
    page.add_class(title, POPUP_TITLE_CLASS);
    page.append_text(title, subject);
    page.append_child(popup, title);

    let subtitle = with_subtitle.then(|| {
        let line = page.create_element("div");
        page.add_class(line, POPUP_SUBTITLE_CLASS);
        page.append_child(popup, line);
        line
    });

    let area = page.create_element("div");
    page.add_class(area, CHART_AREA_CLASS);
    page.append_child(popup, area);

    PopupShell {
        popup,
        title,
        subtitle,
        area,
    }
}

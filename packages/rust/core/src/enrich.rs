//! The enrichment orchestrator: one object wiring the shared page, the
//! data gateway, and the presenter into the catalog flow.
//!
//! On page load every course container gets a GPA placeholder and a fetch.
//! After that the watch loop consumes mutation batches; freshly expanded
//! section rows get rating placeholders and fetches. Placeholders for a
//! batch all land under one page lock before any of its fetches spawn, so
//! the page never shows a gap where a value is about to appear. Badge
//! clicks route through [`Enricher::on_click`], which opens the grade
//! distribution popup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use courselens_gateway::Gateway;
use courselens_page::{MutationRecord, NodeId, SharedPage};
use courselens_shared::{CourseRecord, EnrichmentKind, EnrichmentResult, PageContract};

use crate::chart;
use crate::detect;
use crate::parse;
use crate::popup::{self, PopupManager, PopupShell};
use crate::render::{self, BadgePresenter, Presenter};
use crate::tasks::TaskSet;

/// Chart-area text when a distribution lookup comes back empty.
const NO_GRADE_DATA: &str = "No grade data available.";

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Progress of a course's load-time GPA annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitlePhase {
    /// Course registered, nothing inserted yet.
    Discovered,
    /// Placeholder on the page, fetch in flight.
    Pending,
    /// Badge rendered, value or sentinel.
    Complete,
    /// No title element to annotate; left alone.
    Skipped,
}

/// What the pipeline knows about one course.
#[derive(Debug, Clone)]
pub struct CourseState {
    pub record: CourseRecord,
    pub title_phase: TitlePhase,
    /// Section batches seen for this course.
    pub batches_seen: usize,
    /// Rating fetches issued; TBA rows never issue one.
    pub ratings_issued: usize,
    /// Rating fetches that have come back, rendered or dropped.
    pub ratings_resolved: usize,
}

impl CourseState {
    fn new(id: &str) -> Self {
        Self {
            record: CourseRecord::new(id),
            title_phase: TitlePhase::Discovered,
            batches_seen: 0,
            ratings_issued: 0,
            ratings_resolved: 0,
        }
    }
}

/// Accounting across every course the pipeline has touched this session.
#[derive(Debug, Default)]
pub struct SessionState {
    courses: HashMap<String, CourseState>,
}

impl SessionState {
    fn course_mut(&mut self, id: &str) -> &mut CourseState {
        self.courses
            .entry(id.to_string())
            .or_insert_with(|| CourseState::new(id))
    }

    pub fn course(&self, id: &str) -> Option<&CourseState> {
        self.courses.get(id)
    }

    /// Course states sorted by course id.
    pub fn snapshot(&self) -> Vec<CourseState> {
        let mut all: Vec<CourseState> = self.courses.values().cloned().collect();
        all.sort_by(|a, b| a.record.id.cmp(&b.record.id));
        all
    }
}

/// What a routed click did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A badge popup opened; its data fetch is in flight.
    PopupOpened,
    /// The clicked badge owned the open popup, which is now closed.
    PopupClosed,
    /// The click landed outside the open popup and dismissed it.
    PopupDismissed,
    /// Nothing for the pipeline to do.
    Ignored,
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Handle to the enrichment pipeline for one page. Cheap to clone; the
/// watch loop and every in-flight task share one state.
#[derive(Clone)]
pub struct Enricher {
    inner: Arc<EnricherInner>,
}

struct EnricherInner {
    page: SharedPage,
    gateway: Gateway,
    contract: PageContract,
    presenter: Arc<dyn Presenter>,
    popups: PopupManager,
    state: Mutex<SessionState>,
    tasks: TaskSet,
}

struct RatingJob {
    instructor: String,
    placeholder: NodeId,
}

impl Enricher {
    /// Build the pipeline with the shipping badge presenter.
    pub fn new(page: SharedPage, gateway: Gateway, contract: PageContract) -> Self {
        Self::with_presenter(page, gateway, contract, Arc::new(BadgePresenter))
    }

    /// Build the pipeline around a custom presenter.
    pub fn with_presenter(
        page: SharedPage,
        gateway: Gateway,
        contract: PageContract,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        page.with(render::install_page_styles);
        Self {
            inner: Arc::new(EnricherInner {
                page,
                gateway,
                contract,
                presenter,
                popups: PopupManager::new(),
                state: Mutex::new(SessionState::default()),
                tasks: TaskSet::new(),
            }),
        }
    }

    pub fn page(&self) -> &SharedPage {
        &self.inner.page
    }

    /// Wait for every outstanding fetch-and-render task to land.
    pub async fn quiesce(&self) {
        self.inner.tasks.quiesce().await;
    }

    /// Course states sorted by course id.
    pub fn session(&self) -> Vec<CourseState> {
        self.lock_state().snapshot()
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Load pass
    // -----------------------------------------------------------------------

    /// One pass over the courses already on the page: register each in
    /// session state, put a GPA placeholder next to its title, then fetch
    /// and render its average GPA. Every placeholder is on the page before
    /// the first fetch spawns.
    #[instrument(skip_all)]
    pub fn enrich_on_load(&self) {
        let jobs = self.inner.page.with(|page| {
            let contract = &self.inner.contract;
            let mut state = self.lock_state();
            let mut jobs = Vec::new();

            for course in page.elements_with_class(page.root(), &contract.course) {
                let Some(id) = page.id_attr(course).map(str::to_string) else {
                    warn!("course container without an id attribute, skipping");
                    continue;
                };
                let entry = state.course_mut(&id);
                if entry.title_phase != TitlePhase::Discovered {
                    continue;
                }
                let Some(title) = page.first_with_class(course, &contract.course_title) else {
                    warn!(course = %id, "course has no title element, skipping GPA badge");
                    entry.title_phase = TitlePhase::Skipped;
                    continue;
                };
                // The placeholder sits next to the title, not inside it.
                let Some(target) = page.parent(title) else {
                    entry.title_phase = TitlePhase::Skipped;
                    continue;
                };
                let placeholder =
                    self.inner
                        .presenter
                        .insert_placeholder(page, target, EnrichmentKind::Gpa);
                entry.title_phase = TitlePhase::Pending;
                jobs.push((id, placeholder));
            }
            jobs
        });

        info!(courses = jobs.len(), "course GPA pass started");
        for (course_id, placeholder) in jobs {
            let enricher = self.clone();
            self.inner.tasks.spawn(async move {
                let value = enricher.inner.gateway.course_gpa(&course_id).await;
                let result = EnrichmentResult::new(EnrichmentKind::Gpa, &course_id, value);
                enricher.finish_title(&course_id, placeholder, &result);
            });
        }
    }

    fn finish_title(&self, course_id: &str, placeholder: NodeId, result: &EnrichmentResult) {
        let rendered = self
            .inner
            .page
            .with(|page| self.inner.presenter.render(page, placeholder, result));
        self.lock_state().course_mut(course_id).title_phase = TitlePhase::Complete;
        if rendered {
            debug!(course = course_id, value = %result.value, "GPA badge rendered");
        }
    }

    // -----------------------------------------------------------------------
    // Watch loop
    // -----------------------------------------------------------------------

    /// Register a child-list observer on the contract's watch root. The
    /// returned receiver feeds [`Enricher::watch`]. `None` when the page
    /// has no watch root; the load pass still works without one.
    pub fn observe_sections(&self) -> Option<UnboundedReceiver<Vec<MutationRecord>>> {
        self.inner.page.with(|page| {
            let Some(root) = page.first_with_class(page.root(), &self.inner.contract.observe_root)
            else {
                warn!(
                    class = %self.inner.contract.observe_root,
                    "page has no watch root, section expansions will not be seen"
                );
                return None;
            };
            let (_, rx) = page.observe(root);
            Some(rx)
        })
    }

    /// Consume delivered mutation batches until the channel closes. Each
    /// batch is handled synchronously; fetch-and-render work is spawned and
    /// never awaited here.
    pub async fn watch(&self, mut batches: UnboundedReceiver<Vec<MutationRecord>>) {
        while let Some(records) = batches.recv().await {
            self.process_batch(&records);
        }
        debug!("mutation channel closed, watch loop done");
    }

    /// Handle one delivered mutation batch: detect freshly inserted section
    /// rows, parse them, insert a rating placeholder for every named
    /// instructor, then spawn the rating fetches. A batch that violates the
    /// page contract is logged and dropped whole.
    pub fn process_batch(&self, records: &[MutationRecord]) {
        let batch_id = Uuid::now_v7();

        let prepared = self.inner.page.with(|page| {
            let contract = &self.inner.contract;
            let rows = detect::section_rows(page, records, contract);
            if rows.is_empty() {
                return None;
            }
            let batch = match parse::parse_rows(page, &rows, contract) {
                Ok(batch) => batch,
                Err(e) => {
                    error!(%batch_id, error = %e, "dropping section batch");
                    return None;
                }
            };
            debug!(
                %batch_id,
                course = %batch.course_id,
                rows = rows.len(),
                instructors = batch.entries.len(),
                "section batch parsed"
            );

            let mut jobs = Vec::new();
            for entry in batch.lookups() {
                let placeholder = self.inner.presenter.insert_placeholder(
                    page,
                    entry.anchor,
                    EnrichmentKind::Rating,
                );
                jobs.push(RatingJob {
                    instructor: entry.instructor.clone(),
                    placeholder,
                });
            }
            let tba = batch.entries.len() - jobs.len();
            if tba > 0 {
                debug!(%batch_id, course = %batch.course_id, tba, "sentinel entries left unannotated");
            }
            Some((batch.course_id, jobs))
        });

        let Some((course_id, jobs)) = prepared else {
            return;
        };

        {
            let mut state = self.lock_state();
            let entry = state.course_mut(&course_id);
            entry.batches_seen += 1;
            entry.ratings_issued += jobs.len();
        }

        for job in jobs {
            let enricher = self.clone();
            let course_id = course_id.clone();
            self.inner.tasks.spawn(async move {
                let value = enricher
                    .inner
                    .gateway
                    .instructor_rating(&job.instructor)
                    .await;
                let result = EnrichmentResult::new(EnrichmentKind::Rating, &job.instructor, value);
                enricher.finish_rating(&course_id, job.placeholder, &result);
            });
        }
    }

    fn finish_rating(&self, course_id: &str, placeholder: NodeId, result: &EnrichmentResult) {
        let rendered = self
            .inner
            .page
            .with(|page| self.inner.presenter.render(page, placeholder, result));
        self.lock_state().course_mut(course_id).ratings_resolved += 1;
        if rendered {
            debug!(instructor = %result.subject, value = %result.value, "rating badge rendered");
        }
    }

    // -----------------------------------------------------------------------
    // Clicks and popups
    // -----------------------------------------------------------------------

    /// Route a click at `target`: badge clicks toggle their popup, any
    /// other click dismisses an open popup it lands outside of.
    pub fn on_click(&self, target: NodeId) -> ClickOutcome {
        let limit = self.inner.contract.ancestor_walk_limit;

        enum Opened {
            Course { course_id: String, shell: PopupShell },
            Instructor { name: String, shell: PopupShell },
        }

        let (outcome, opened) = self.inner.page.with(|page| {
            if let Some(badge) = page.ancestor_with_class(target, render::GPA_BADGE_CLASS, limit) {
                let Some(course_id) = page.attr(badge, render::SUBJECT_ATTR).map(str::to_string)
                else {
                    warn!("GPA badge without a subject attribute");
                    return (ClickOutcome::Ignored, None);
                };
                match self.inner.popups.toggle(page, badge, &course_id, false) {
                    Some(shell) => (
                        ClickOutcome::PopupOpened,
                        Some(Opened::Course { course_id, shell }),
                    ),
                    None => (ClickOutcome::PopupClosed, None),
                }
            } else if let Some(badge) =
                page.ancestor_with_class(target, render::RATING_BADGE_CLASS, limit)
            {
                let Some(name) = page.attr(badge, render::SUBJECT_ATTR).map(str::to_string) else {
                    warn!("rating badge without a subject attribute");
                    return (ClickOutcome::Ignored, None);
                };
                match self.inner.popups.toggle(page, badge, &name, true) {
                    Some(shell) => (
                        ClickOutcome::PopupOpened,
                        Some(Opened::Instructor { name, shell }),
                    ),
                    None => (ClickOutcome::PopupClosed, None),
                }
            } else if self.inner.popups.dismiss_outside(page, target) {
                (ClickOutcome::PopupDismissed, None)
            } else {
                (ClickOutcome::Ignored, None)
            }
        });

        match opened {
            Some(Opened::Course { course_id, shell }) => self.spawn_course_chart(course_id, shell),
            Some(Opened::Instructor { name, shell }) => self.spawn_instructor_chart(name, shell),
            None => {}
        }
        outcome
    }

    /// Fill a course popup: title gains the grade total, the chart renders
    /// into the shell's area. A popup closed before the data lands keeps
    /// nothing.
    fn spawn_course_chart(&self, course_id: String, shell: PopupShell) {
        let enricher = self.clone();
        self.inner.tasks.spawn(async move {
            let dist = enricher.inner.gateway.course_distribution(&course_id).await;
            enricher.inner.page.with(|page| {
                if !page.is_attached(shell.area) {
                    debug!(course = %course_id, "popup closed before its chart arrived");
                    return;
                }
                match dist {
                    Some(dist) => {
                        page.set_text(
                            shell.title,
                            &format!("{course_id}: Total Grades: {}", dist.total_grades()),
                        );
                        chart::render_chart(page, shell.area, &dist, false);
                    }
                    None => page.set_text(shell.area, NO_GRADE_DATA),
                }
            });
        });
    }

    /// Fill an instructor popup: subtitle gains totals and GPA, the chart
    /// renders with the reviews caption, and a review block with its own
    /// spinner is appended. The review payload is fetched afterwards and
    /// logged; nothing renders it yet.
    fn spawn_instructor_chart(&self, name: String, shell: PopupShell) {
        let enricher = self.clone();
        self.inner.tasks.spawn(async move {
            let dist = enricher.inner.gateway.instructor_distribution(&name).await;

            let review_block = enricher.inner.page.with(|page| {
                if !page.is_attached(shell.area) {
                    debug!(instructor = %name, "popup closed before its chart arrived");
                    return None;
                }
                let Some(dist) = dist else {
                    page.set_text(shell.area, NO_GRADE_DATA);
                    return None;
                };
                if let Some(subtitle) = shell.subtitle {
                    page.set_text(
                        subtitle,
                        &format!(
                            "Total Grades: {} GPA: {}",
                            dist.total_grades(),
                            dist.gpa_metric()
                        ),
                    );
                }
                chart::render_chart(page, shell.area, &dist, true);

                let container = page.create_element("div");
                page.add_class(container, popup::REVIEW_CONTAINER_CLASS);
                let spinner = page.create_element("span");
                page.add_class(spinner, render::SPINNER_CLASS);
                page.append_child(container, spinner);
                page.append_child(shell.popup, container);
                Some((container, spinner))
            });

            let Some((container, spinner)) = review_block else {
                return;
            };

            let reviews = enricher.inner.gateway.instructor_reviews(&name).await;
            enricher.inner.page.with(|page| {
                if page.is_attached(container) {
                    page.detach(spinner);
                }
            });
            if let Some(reviews) = reviews {
                debug!(instructor = %name, reviews = %reviews, "instructor reviews received, not rendered");
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

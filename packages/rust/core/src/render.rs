//! Presentation: spinner placeholders, result badges, and the injected
//! stylesheet.

use tracing::debug;

use courselens_page::{NodeId, Page};
use courselens_shared::{EnrichmentKind, EnrichmentResult, Metric};

/// Class of the course GPA badge.
pub const GPA_BADGE_CLASS: &str = "class-gpa-span";
/// Class of the instructor rating badge.
pub const RATING_BADGE_CLASS: &str = "professor-ratings-span";
/// Class of a loading spinner.
pub const SPINNER_CLASS: &str = "gpa-spinner";
/// Attribute on a badge naming what it annotates: the course id on GPA
/// badges, the instructor name on rating badges. Click routing reads it
/// back instead of re-walking the page structure.
pub const SUBJECT_ATTR: &str = "data-subject";

/// Marker attribute on the injected stylesheet.
const STYLE_MARKER_ATTR: &str = "data-courselens";

/// Stylesheet injected once per page: spinner animation, badge affordances,
/// the popup box, and chart geometry. Per-node styles only carry computed
/// values (bar heights, segment colors).
const PAGE_STYLE: &str = r#"
.gpa-spinner{display:inline-block;width:10px;height:10px;border:2px solid #ccc;border-top-color:#333;border-radius:50%;animation:gpa-spin 0.8s linear infinite}
@keyframes gpa-spin{to{transform:rotate(360deg)}}
.class-gpa-span,.professor-ratings-span{cursor:pointer;text-decoration:underline}
.class-gpa-span:hover,.professor-ratings-span:hover{color:#1a0dab}
.enrichment-popup{position:absolute;z-index:9999;background:#fff;border:1px solid #bbb;border-radius:4px;box-shadow:0 2px 8px rgba(0,0,0,0.25);padding:10px;width:20rem;font-size:13px}
.popup-graph-subtitle{margin:4px 0;font-size:12px}
.chart-area{margin-top:6px}
.grade-chart{position:relative;display:flex;align-items:flex-end;gap:4px;height:120px;padding-left:30px}
.grade-chart-axis-y{position:absolute;left:0;top:0;bottom:14px;width:26px;border-right:1px solid #999}
.grade-chart-tick{position:absolute;left:0;font-size:9px;color:#666}
.grade-chart-bar{flex:1;display:flex;flex-direction:column-reverse;position:relative}
.grade-chart-segment{position:relative}
.grade-chart-segment:hover .grade-chart-tip{display:block}
.grade-chart-tip{display:none;position:absolute;top:-18px;left:0;background:#222;color:#fff;padding:1px 4px;border-radius:2px;font-size:9px;white-space:nowrap}
.grade-chart-letter{text-align:center;font-size:10px}
.grade-chart-axis-x{border-top:1px solid #999;margin-top:2px;padding-top:2px}
.grade-chart-reviews-caption{font-size:10px;color:#444}
.professor-review-container{margin-top:6px}
"#;

// ---------------------------------------------------------------------------
// Presenter
// ---------------------------------------------------------------------------

/// Seam between the orchestrator and the page markup it produces. Tests
/// can substitute a recording presenter to watch enrichment land without
/// parsing badge text.
pub trait Presenter: Send + Sync {
    /// Append the loading placeholder for `kind` under `target`. Returns
    /// the placeholder node the matching [`Presenter::render`] will swap
    /// out.
    fn insert_placeholder(&self, page: &mut Page, target: NodeId, kind: EnrichmentKind) -> NodeId;

    /// Swap `placeholder` for the finished badge. Returns `false` when the
    /// placeholder has already left the page; the result is dropped.
    fn render(&self, page: &mut Page, placeholder: NodeId, result: &EnrichmentResult) -> bool;
}

/// The shipping presenter: parenthesized spinner placeholders swapped for
/// clickable badge spans.
#[derive(Debug, Default, Clone, Copy)]
pub struct BadgePresenter;

impl Presenter for BadgePresenter {
    fn insert_placeholder(&self, page: &mut Page, target: NodeId, kind: EnrichmentKind) -> NodeId {
        let placeholder = page.create_element("span");
        page.append_text(placeholder, &format!("({}: ", label(kind)));
        let strong = page.create_element("b");
        let spinner = page.create_element("span");
        page.add_class(spinner, SPINNER_CLASS);
        page.append_child(strong, spinner);
        page.append_child(placeholder, strong);
        page.append_text(placeholder, ")");
        page.append_child(target, placeholder);
        placeholder
    }

    fn render(&self, page: &mut Page, placeholder: NodeId, result: &EnrichmentResult) -> bool {
        if !page.is_attached(placeholder) {
            debug!(
                kind = %result.kind,
                subject = %result.subject,
                "placeholder left the page before its result, dropping"
            );
            return false;
        }

        let badge = page.create_element("span");
        page.add_class(badge, badge_class(result.kind));
        page.set_attr(badge, SUBJECT_ATTR, &result.subject);
        page.append_text(badge, &format!("({}: ", label(result.kind)));
        let strong = page.create_element("b");
        page.append_text(strong, &value_text(result));
        page.append_child(badge, strong);
        page.append_text(badge, ")");
        page.replace_node(placeholder, badge)
    }
}

fn label(kind: EnrichmentKind) -> &'static str {
    match kind {
        EnrichmentKind::Gpa => "Avg GPA",
        EnrichmentKind::Rating => "Rating",
    }
}

fn badge_class(kind: EnrichmentKind) -> &'static str {
    match kind {
        EnrichmentKind::Gpa => GPA_BADGE_CLASS,
        EnrichmentKind::Rating => RATING_BADGE_CLASS,
    }
}

/// Badge value text. Ratings carry their scale; the sentinel never does.
fn value_text(result: &EnrichmentResult) -> String {
    match (result.kind, result.value) {
        (_, Metric::NoData) => Metric::NoData.to_string(),
        (EnrichmentKind::Gpa, value) => value.to_string(),
        (EnrichmentKind::Rating, value) => format!("{value}/5"),
    }
}

// ---------------------------------------------------------------------------
// Page styles
// ---------------------------------------------------------------------------

/// Inject the pipeline's stylesheet into the page head, once. Pages
/// without a head get it on the body.
pub fn install_page_styles(page: &mut Page) {
    let head = page
        .first_with_tag(page.root(), "head")
        .unwrap_or_else(|| page.body());
    let already_installed = page
        .children(head)
        .iter()
        .any(|&child| page.attr(child, STYLE_MARKER_ATTR).is_some());
    if already_installed {
        return;
    }

    let style = page.create_element("style");
    page.set_attr(style, STYLE_MARKER_ATTR, env!("CARGO_PKG_VERSION"));
    page.append_text(style, PAGE_STYLE);
    page.append_child(head, style);
    debug!("page styles installed");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchored_page() -> (Page, NodeId) {
        let mut page = Page::from_document(
            r#"<html><head></head><body>
                <div class="row"><div class="section-instructors">
                    <span class="section-instructor">Dr. Lee</span>
                </div></div>
            </body></html>"#,
        );
        let anchor = page
            .first_with_class(page.root(), "section-instructors")
            .expect("anchor");
        (page, anchor)
    }

    #[test]
    fn placeholder_is_a_parenthesized_spinner() {
        let (mut page, anchor) = anchored_page();
        let placeholder = BadgePresenter.insert_placeholder(&mut page, anchor, EnrichmentKind::Gpa);

        assert!(page.is_attached(placeholder));
        assert_eq!(page.text_content(placeholder), "(Avg GPA: )");
        assert!(page.first_with_class(placeholder, SPINNER_CLASS).is_some());
    }

    #[test]
    fn gpa_badge_replaces_placeholder_with_value() {
        let (mut page, anchor) = anchored_page();
        let placeholder = BadgePresenter.insert_placeholder(&mut page, anchor, EnrichmentKind::Gpa);

        let result = EnrichmentResult::new(EnrichmentKind::Gpa, "CMSC131", Metric::Value(3.452));
        assert!(BadgePresenter.render(&mut page, placeholder, &result));

        assert!(!page.is_attached(placeholder));
        let badge = page.first_with_class(anchor, GPA_BADGE_CLASS).expect("badge");
        assert_eq!(page.text_content(badge), "(Avg GPA: 3.45)");
        assert_eq!(page.attr(badge, SUBJECT_ATTR), Some("CMSC131"));
    }

    #[test]
    fn rating_badge_carries_scale_only_for_values() {
        let (mut page, anchor) = anchored_page();

        let placeholder =
            BadgePresenter.insert_placeholder(&mut page, anchor, EnrichmentKind::Rating);
        let rated = EnrichmentResult::new(EnrichmentKind::Rating, "Dr. Lee", Metric::Value(4.214));
        assert!(BadgePresenter.render(&mut page, placeholder, &rated));

        let placeholder =
            BadgePresenter.insert_placeholder(&mut page, anchor, EnrichmentKind::Rating);
        let unrated = EnrichmentResult::new(EnrichmentKind::Rating, "Dr. Park", Metric::NoData);
        assert!(BadgePresenter.render(&mut page, placeholder, &unrated));

        let badges = page.elements_with_class(anchor, RATING_BADGE_CLASS);
        assert_eq!(page.text_content(badges[0]), "(Rating: 4.21/5)");
        assert_eq!(page.text_content(badges[1]), "(Rating: None)");
    }

    #[test]
    fn stale_placeholder_drops_the_result() {
        let (mut page, anchor) = anchored_page();
        let placeholder = BadgePresenter.insert_placeholder(&mut page, anchor, EnrichmentKind::Gpa);

        let row = page.first_with_class(page.root(), "row").expect("row");
        page.detach(row);

        let result = EnrichmentResult::new(EnrichmentKind::Gpa, "CMSC131", Metric::Value(3.0));
        assert!(!BadgePresenter.render(&mut page, placeholder, &result));
        assert!(page.elements_with_class(page.root(), GPA_BADGE_CLASS).is_empty());
    }

    #[test]
    fn styles_install_into_head_exactly_once() {
        let (mut page, _) = anchored_page();
        install_page_styles(&mut page);
        install_page_styles(&mut page);

        let head = page.first_with_tag(page.root(), "head").expect("head");
        let styles: Vec<_> = page
            .children(head)
            .iter()
            .filter(|&&child| page.tag(child) == Some("style"))
            .collect();
        assert_eq!(styles.len(), 1);
        assert!(page.text_content(*styles[0]).contains(".gpa-spinner"));
    }
}

//! Stacked bar chart for grade distributions, rendered into the page model.
//!
//! Grade labels fold into per-letter bars: `B-`, `B`, and `B+` stack inside
//! the `B` bar, sign encoded as lightness. Bar heights are normalized
//! against the largest letter total, segment heights against their own bar.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use courselens_gateway::GradesPayload;
use courselens_page::{NodeId, Page};

/// Class of the chart frame element, one per popup.
pub const CHART_FRAME_CLASS: &str = "grade-chart";
/// Class of a per-letter bar.
pub const CHART_BAR_CLASS: &str = "grade-chart-bar";
/// Class of one stacked sign segment inside a bar.
pub const CHART_SEGMENT_CLASS: &str = "grade-chart-segment";
/// Class of a segment's hover tooltip.
pub const CHART_TIP_CLASS: &str = "grade-chart-tip";
/// Class of the letter caption under a bar.
pub const CHART_LETTER_CLASS: &str = "grade-chart-letter";
/// Class of the vertical axis with its percentage ticks.
pub const CHART_AXIS_Y_CLASS: &str = "grade-chart-axis-y";
/// Class of the horizontal axis.
pub const CHART_AXIS_X_CLASS: &str = "grade-chart-axis-x";
/// Class of one tick mark on the vertical axis.
pub const CHART_TICK_CLASS: &str = "grade-chart-tick";
/// Class of the reviews caption shown on instructor charts.
pub const CHART_REVIEWS_CAPTION_CLASS: &str = "grade-chart-reviews-caption";

/// Tick positions on the vertical axis, percent of the tallest bar.
const TICK_STEPS: [u8; 4] = [0, 25, 50, 75];

static GRADE_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z])([+-])?$").expect("grade label regex"));

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Sign modifier on a letter grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Sign {
    Minus,
    Plain,
    Plus,
}

impl Sign {
    /// Suffix as printed on the page.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Minus => "-",
            Self::Plain => "",
            Self::Plus => "+",
        }
    }

    /// Lightness rises across the stacking order: minus, plain, plus.
    fn lightness_factor(self) -> f64 {
        match self {
            Self::Minus => 0.5,
            Self::Plain => 1.0,
            Self::Plus => 1.5,
        }
    }
}

/// One stacked segment of a letter bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub sign: Sign,
    pub count: u32,
}

/// All counts for one grade letter, segments in stacking order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterGroup {
    pub letter: char,
    pub segments: Vec<Segment>,
}

impl LetterGroup {
    pub fn total(&self) -> u64 {
        self.segments.iter().map(|s| u64::from(s.count)).sum()
    }
}

/// Fold raw grade labels into per-letter groups, letters ascending.
/// Zero counts and labels that are not a letter grade are not charted;
/// they still count toward the popup's grade total.
pub fn group_counts(counts: &BTreeMap<String, u32>) -> Vec<LetterGroup> {
    let mut letters: BTreeMap<char, BTreeMap<Sign, u32>> = BTreeMap::new();

    for (label, &count) in counts {
        if count == 0 {
            continue;
        }
        let Some(caps) = GRADE_LABEL_RE.captures(label) else {
            debug!(label, "unrecognized grade label, not charted");
            continue;
        };
        let Some(letter) = caps[1].chars().next() else {
            continue;
        };
        let sign = match caps.get(2).map(|m| m.as_str()) {
            Some("+") => Sign::Plus,
            Some("-") => Sign::Minus,
            _ => Sign::Plain,
        };
        *letters
            .entry(letter.to_ascii_uppercase())
            .or_default()
            .entry(sign)
            .or_default() += count;
    }

    letters
        .into_iter()
        .map(|(letter, signs)| LetterGroup {
            letter,
            segments: signs
                .into_iter()
                .map(|(sign, count)| Segment { sign, count })
                .collect(),
        })
        .collect()
}

/// Base hue per letter; letters outside the A-F scale share a neutral hue.
fn base_hue(letter: char) -> u16 {
    match letter {
        'A' => 220,
        'B' => 150,
        'C' => 35,
        'D' => 285,
        'F' => 0,
        _ => 200,
    }
}

fn segment_color(letter: char, sign: Sign) -> String {
    format!(
        "hsl({} 65% {}%)",
        base_hue(letter),
        50.0 * sign.lightness_factor()
    )
}

fn percent(part: u64, whole: u64) -> String {
    if whole == 0 {
        return "0".into();
    }
    format!("{:.1}", (part as f64 / whole as f64) * 100.0)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the distribution as a stacked bar chart under `parent`. With
/// `with_reviews_caption` the horizontal axis carries the caption shown on
/// instructor charts.
pub fn render_chart(
    page: &mut Page,
    parent: NodeId,
    payload: &GradesPayload,
    with_reviews_caption: bool,
) {
    let groups = group_counts(&payload.counts);
    let max_total = groups.iter().map(LetterGroup::total).max().unwrap_or(0);

    let frame = page.create_element("div");
    page.add_class(frame, CHART_FRAME_CLASS);

    let axis_y = page.create_element("div");
    page.add_class(axis_y, CHART_AXIS_Y_CLASS);
    for step in TICK_STEPS {
        let tick = page.create_element("div");
        page.add_class(tick, CHART_TICK_CLASS);
        page.set_attr(tick, "style", &format!("bottom:{step}%"));
        page.append_text(tick, &format!("{step}%"));
        page.append_child(axis_y, tick);
    }
    page.append_child(frame, axis_y);

    for group in &groups {
        let bar = page.create_element("div");
        page.add_class(bar, CHART_BAR_CLASS);
        page.set_attr(bar, "data-letter", &group.letter.to_string());
        page.set_attr(
            bar,
            "style",
            &format!("height:{}%", percent(group.total(), max_total)),
        );

        for segment in &group.segments {
            let grade = format!("{}{}", group.letter, segment.sign.suffix());

            let block = page.create_element("div");
            page.add_class(block, CHART_SEGMENT_CLASS);
            page.set_attr(block, "data-grade", &grade);
            page.set_attr(
                block,
                "style",
                &format!(
                    "height:{}%;background:{}",
                    percent(u64::from(segment.count), group.total()),
                    segment_color(group.letter, segment.sign)
                ),
            );

            let tip = page.create_element("span");
            page.add_class(tip, CHART_TIP_CLASS);
            page.append_text(tip, &format!("{grade}: {}", segment.count));
            page.append_child(block, tip);

            page.append_child(bar, block);
        }

        let letter = page.create_element("span");
        page.add_class(letter, CHART_LETTER_CLASS);
        page.append_text(letter, &group.letter.to_string());
        page.append_child(bar, letter);

        page.append_child(frame, bar);
    }

    let axis_x = page.create_element("div");
    page.add_class(axis_x, CHART_AXIS_X_CLASS);
    if with_reviews_caption {
        let caption = page.create_element("span");
        page.add_class(caption, CHART_REVIEWS_CAPTION_CLASS);
        page.append_text(caption, "Professor Reviews:");
        page.append_child(axis_x, caption);
    }
    page.append_child(frame, axis_x);

    page.append_child(parent, frame);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn groups_fold_signs_under_one_letter() {
        let groups = group_counts(&counts(&[
            ("B+", 9),
            ("A", 40),
            ("B-", 4),
            ("A-", 11),
            ("B", 20),
        ]));

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].letter, 'A');
        assert_eq!(groups[0].total(), 51);

        let b = &groups[1];
        assert_eq!(b.letter, 'B');
        let stacked: Vec<(Sign, u32)> = b.segments.iter().map(|s| (s.sign, s.count)).collect();
        assert_eq!(
            stacked,
            [(Sign::Minus, 4), (Sign::Plain, 20), (Sign::Plus, 9)]
        );
    }

    #[test]
    fn lowercase_labels_are_normalized() {
        let groups = group_counts(&counts(&[("a+", 3), ("A", 2)]));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].letter, 'A');
        assert_eq!(groups[0].total(), 5);
    }

    #[test]
    fn zero_counts_and_odd_labels_are_not_charted() {
        let groups = group_counts(&counts(&[("A", 0), ("Other", 12), ("W", 3)]));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].letter, 'W');
    }

    #[test]
    fn withdrawals_use_the_neutral_hue() {
        assert_eq!(segment_color('W', Sign::Plain), "hsl(200 65% 50%)");
        assert_eq!(segment_color('A', Sign::Minus), "hsl(220 65% 25%)");
        assert_eq!(segment_color('F', Sign::Plain), "hsl(0 65% 50%)");
    }

    #[test]
    fn rendered_chart_scales_bars_against_the_tallest() {
        let mut page = Page::new();
        let root = page.root();
        let payload = GradesPayload {
            gpa: Some(3.2),
            counts: counts(&[("A", 30), ("B+", 10), ("B", 5)]),
        };

        render_chart(&mut page, root, &payload, false);

        let bars = page.elements_with_class(root, CHART_BAR_CLASS);
        assert_eq!(bars.len(), 2);
        // A is the tallest bar; B holds half its total.
        assert_eq!(page.attr(bars[0], "style"), Some("height:100.0%"));
        assert_eq!(page.attr(bars[1], "style"), Some("height:50.0%"));

        let segments = page.elements_with_class(bars[1], CHART_SEGMENT_CLASS);
        assert_eq!(page.attr(segments[0], "data-grade"), Some("B"));
        assert_eq!(
            page.attr(segments[0], "style"),
            Some("height:33.3%;background:hsl(150 65% 50%)")
        );
        assert_eq!(page.attr(segments[1], "data-grade"), Some("B+"));

        let tips = page.elements_with_class(bars[1], CHART_TIP_CLASS);
        assert_eq!(page.text_content(tips[1]), "B+: 10");
    }

    #[test]
    fn axis_carries_ticks_and_optional_reviews_caption() {
        let mut page = Page::new();
        let root = page.root();
        let payload = GradesPayload {
            gpa: None,
            counts: counts(&[("A", 1)]),
        };

        render_chart(&mut page, root, &payload, true);

        let ticks = page.elements_with_class(root, CHART_TICK_CLASS);
        assert_eq!(ticks.len(), 4);
        assert_eq!(page.text_content(ticks[3]), "75%");

        let caption = page
            .first_with_class(root, CHART_REVIEWS_CAPTION_CLASS)
            .expect("caption");
        assert_eq!(page.text_content(caption), "Professor Reviews:");
    }

    #[test]
    fn empty_distribution_renders_a_bare_frame() {
        let mut page = Page::new();
        let root = page.root();
        let payload = GradesPayload {
            gpa: None,
            counts: BTreeMap::new(),
        };

        render_chart(&mut page, root, &payload, false);

        assert!(page.first_with_class(root, CHART_FRAME_CLASS).is_some());
        assert!(page.elements_with_class(root, CHART_BAR_CLASS).is_empty());
    }
}

//! Parsing detected section rows into an enrichment work order.

use courselens_page::{NodeId, Page};
use courselens_shared::{CourseLensError, PageContract, Result};

/// One instructor cell from a section row: the display name plus the row's
/// anchor element its rating annotation attaches to. Rows listing several
/// co-instructors produce one entry per name, all sharing the row anchor.
/// `tba` marks the not-yet-assigned sentinel, which is kept for accounting
/// but never looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowEntry {
    pub instructor: String,
    pub anchor: NodeId,
    pub tba: bool,
}

/// Everything the orchestrator needs to enrich one batch of section rows.
#[derive(Debug, Clone)]
pub struct SectionBatch {
    /// Course id from the owning course container.
    pub course_id: String,
    /// Instructor entries in document order.
    pub entries: Vec<RowEntry>,
}

impl SectionBatch {
    /// Entries that name a real instructor.
    pub fn lookups(&self) -> impl Iterator<Item = &RowEntry> {
        self.entries.iter().filter(|entry| !entry.tba)
    }
}

/// Resolve a batch of rows against the page contract.
///
/// All rows in one batch belong to one course: the walk up from the first
/// row finds the owning course container, whose `id` attribute is the
/// course id. Any structural assumption that does not hold is a
/// [`CourseLensError::DomContract`]; the caller decides whether to drop the
/// batch, but nothing gets half-parsed.
pub fn parse_rows(page: &Page, rows: &[NodeId], contract: &PageContract) -> Result<SectionBatch> {
    let first = rows
        .first()
        .copied()
        .ok_or_else(|| CourseLensError::dom_contract("empty section row batch"))?;

    let course = page
        .ancestor_with_class(first, &contract.course, contract.ancestor_walk_limit)
        .ok_or_else(|| {
            CourseLensError::dom_contract(format!(
                "no .{} ancestor within {} levels of a section row",
                contract.course, contract.ancestor_walk_limit
            ))
        })?;
    let course_id = page
        .id_attr(course)
        .ok_or_else(|| {
            CourseLensError::dom_contract(format!(".{} element has no id attribute", contract.course))
        })?
        .to_string();

    let mut entries = Vec::new();
    for &row in rows {
        let anchor = page
            .first_with_class(row, &contract.instructor_anchor)
            .ok_or_else(|| {
                CourseLensError::dom_contract(format!(
                    "section row of {course_id} has no .{} anchor",
                    contract.instructor_anchor
                ))
            })?;

        for name_el in page.elements_with_class(row, &contract.instructor) {
            let name = page.text_content(name_el).trim().to_string();
            if name.is_empty() {
                continue;
            }
            let tba = name == contract.tba_sentinel;
            entries.push(RowEntry {
                instructor: name,
                anchor,
                tba,
            });
        }
    }

    Ok(SectionBatch { course_id, entries })
}

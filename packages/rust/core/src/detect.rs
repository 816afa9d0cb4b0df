//! Detection of freshly inserted section rows in a mutation batch.

use courselens_page::{MutationRecord, NodeId, Page};
use courselens_shared::PageContract;

/// Pull the section rows out of one delivered mutation batch, in document
/// order. Only added nodes that are themselves section containers count;
/// everything else in the batch is skipped. That filter is what keeps the
/// pipeline's own badge and popup insertions from feeding back into it.
pub fn section_rows(page: &Page, records: &[MutationRecord], contract: &PageContract) -> Vec<NodeId> {
    let mut rows = Vec::new();
    for record in records {
        for &added in &record.added {
            if !page.has_class(added, &contract.sections_container) {
                continue;
            }
            for info in page.elements_with_class(added, &contract.section_info) {
                rows.extend(page.elements_with_class(info, &contract.section_row));
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTIONS_FRAGMENT: &str = r#"
        <div class="sections-container">
            <div class="section-info-container">
                <div class="row"><span class="section-instructor">Dr. Smith</span></div>
                <div class="row"><span class="section-instructor">Dr. Lee</span></div>
            </div>
        </div>"#;

    fn page_with_course() -> (Page, NodeId) {
        let mut page = Page::from_document(
            r#"<html><body>
                <div class="course-prefix-container">
                    <div class="course" id="CMSC131"></div>
                </div>
            </body></html>"#,
        );
        let course = page.first_with_class(page.root(), "course").expect("course");
        (page, course)
    }

    #[test]
    fn rows_found_in_inserted_container() {
        let (mut page, course) = page_with_course();
        let added = page.insert_fragment(course, SECTIONS_FRAGMENT);
        let records = vec![MutationRecord { added }];

        let rows = section_rows(&page, &records, &PageContract::default());
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|&row| page.has_class(row, "row")));

        // Document order: Dr. Smith's row first.
        let first = page.first_with_class(rows[0], "section-instructor").expect("name");
        assert_eq!(page.text_content(first), "Dr. Smith");
    }

    #[test]
    fn additions_that_are_not_section_containers_are_skipped() {
        let (mut page, course) = page_with_course();
        let added = page.insert_fragment(
            course,
            r#"<span class="class-gpa-span">(Avg GPA: 3.45)</span>"#,
        );
        let records = vec![MutationRecord { added }];

        assert!(section_rows(&page, &records, &PageContract::default()).is_empty());
    }

    #[test]
    fn rows_outside_a_section_info_wrapper_are_ignored() {
        let (mut page, course) = page_with_course();
        let added = page.insert_fragment(
            course,
            r#"<div class="sections-container"><div class="row">stray</div></div>"#,
        );
        let records = vec![MutationRecord { added }];

        assert!(section_rows(&page, &records, &PageContract::default()).is_empty());
    }

    #[test]
    fn batch_spanning_multiple_records_keeps_order() {
        let (mut page, course) = page_with_course();
        let first = page.insert_fragment(course, SECTIONS_FRAGMENT);
        let second = page.insert_fragment(
            course,
            r#"<div class="sections-container">
                <div class="section-info-container">
                    <div class="row"><span class="section-instructor">Dr. Patel</span></div>
                </div>
            </div>"#,
        );
        let records = vec![
            MutationRecord { added: first },
            MutationRecord { added: second },
        ];

        let rows = section_rows(&page, &records, &PageContract::default());
        assert_eq!(rows.len(), 3);
        let last = page.first_with_class(rows[2], "section-instructor").expect("name");
        assert_eq!(page.text_content(last), "Dr. Patel");
    }
}

use pretty_assertions::assert_eq;

use sectioner_pdf::{SectionAggregator, SectionBlock};

fn summary(blocks: &[SectionBlock]) -> Vec<(usize, &str, &str, Option<&str>, u32, u32)> {
    blocks
        .iter()
        .map(|b| {
            (
                b.level,
                b.number.as_str(),
                b.title.as_str(),
                b.parent_number.as_deref(),
                b.page_start,
                b.page_end,
            )
        })
        .collect()
}

fn assert_stack_increasing(aggregator: &SectionAggregator) {
    let levels = aggregator.active_levels();
    assert!(
        levels.windows(2).all(|pair| pair[0] < pair[1]),
        "stack levels not strictly increasing: {levels:?}"
    );
}

#[test]
fn test_nested_chapters_on_one_page() {
    let mut agg = SectionAggregator::new();
    assert!(agg.start_section(1, "1", "Introduction", 1));
    agg.add_text("Some body.", 1);
    assert!(agg.start_section(2, "1.1", "Scope", 1));
    agg.add_text("More body.", 1);
    assert!(agg.start_section(1, "2", "Design", 1));

    let sections = agg.finalize();
    assert_eq!(
        summary(&sections),
        vec![
            (1, "1", "Introduction", None, 1, 1),
            (1, "2", "Design", None, 1, 1),
            (2, "1.1", "Scope", Some("1"), 1, 1),
        ]
    );
    let intro = &sections[0];
    assert_eq!(intro.lines, vec!["1 Introduction", "Some body."]);
    assert!(sections.iter().all(|block| block.closed));
}

#[test]
fn test_deepest_level_increment_is_accepted() {
    let mut agg = SectionAggregator::new();
    assert!(agg.start_section(3, "8.6.2", "Real-time", 5));
    agg.add_text("text", 5);
    assert!(agg.start_section(3, "8.6.3", "Other", 6));
    agg.add_text("text2", 6);

    let sections = agg.finalize();
    assert_eq!(
        summary(&sections),
        vec![
            (3, "8.6.2", "Real-time", None, 5, 5),
            (3, "8.6.3", "Other", None, 6, 6),
        ]
    );
}

#[test]
fn test_regressing_number_stays_body_text() {
    let mut agg = SectionAggregator::new();
    assert!(agg.start_section(3, "8.6.2", "X", 1));
    agg.add_text("text", 1);
    assert!(!agg.start_section(1, "2", "Y", 1));
    agg.add_text("2 Y", 1);

    let sections = agg.finalize();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].lines, vec!["8.6.2 X", "text", "2 Y"]);
}

#[test]
fn test_numbering_rules() {
    let cases: &[(&[&str], &[bool])] = &[
        (&["3", "2"], &[true, false]),
        (&["1", "1.1", "1.2", "2", "2.1"], &[true, true, true, true, true]),
        (&["1.2", "1.2"], &[true, false]),
        (&["1.2.3", "1.2"], &[true, false]),
        (&["1.2.3", "1.3"], &[true, true]),
        (&["8.6.2", "9"], &[true, true]),
        (&["2", "1.9"], &[true, false]),
        (&["1", "x.1", "2"], &[true, false, true]),
    ];
    for (numbers, expected) in cases {
        let mut agg = SectionAggregator::new();
        let accepted: Vec<bool> = numbers
            .iter()
            .map(|number| {
                let level = number.split('.').count();
                agg.start_section(level, number, "Title", 1)
            })
            .collect();
        assert_eq!(&accepted, expected, "sequence {numbers:?}");
    }
}

#[test]
fn test_accepted_numbers_never_regress() {
    let mut agg = SectionAggregator::new();
    let offered = ["1", "1.1", "3", "2", "2.5", "3", "3.1", "3.1.1", "3.0", "4", "1"];
    let mut accepted: Vec<Vec<u64>> = Vec::new();
    for number in offered {
        let level = number.split('.').count();
        if agg.start_section(level, number, "Title", 1) {
            let parts: Vec<u64> = number.split('.').map(|p| p.parse().unwrap()).collect();
            if let Some(previous) = accepted.last() {
                assert!(parts > *previous, "{parts:?} does not advance past {previous:?}");
            }
            accepted.push(parts);
        }
    }
    assert_eq!(
        accepted,
        vec![vec![1], vec![1, 1], vec![3], vec![3, 1], vec![3, 1, 1], vec![4]]
    );
}

#[test]
fn test_stack_stays_strictly_increasing() {
    let mut agg = SectionAggregator::new();
    agg.add_text("preamble", 1);
    assert_stack_increasing(&agg);
    assert_eq!(agg.active_levels(), vec![0]);

    let steps: &[(usize, &str)] = &[(1, "1"), (2, "1.1"), (3, "1.1.1"), (2, "1.2"), (1, "")];
    for &(level, number) in steps {
        agg.start_section(level, number, "Title", 1);
        assert_stack_increasing(&agg);
    }
    assert_eq!(agg.active_levels(), vec![0, 1]);

    agg.start_section(3, "2.1.1", "Deep", 2);
    agg.begin_ignored_section(2);
    assert_stack_increasing(&agg);
    assert_eq!(agg.active_levels(), vec![0, 1]);
}

#[test]
fn test_parent_skips_unnumbered_and_root() {
    let mut agg = SectionAggregator::new();
    agg.add_text("preamble", 1);
    agg.start_section(1, "", "OVERVIEW", 1);
    agg.start_section(2, "1.1", "Nested", 2);
    agg.start_section(1, "2", "Chapter", 3);
    agg.start_section(2, "2.1", "Child", 3);

    let sections = agg.finalize();
    let parents: Vec<(&str, Option<&str>)> = sections
        .iter()
        .map(|b| (b.number.as_str(), b.parent_number.as_deref()))
        .collect();
    assert_eq!(
        parents,
        vec![("", None), ("1.1", None), ("2", None), ("2.1", Some("2"))]
    );
}

#[test]
fn test_page_end_follows_text_and_children() {
    let mut agg = SectionAggregator::new();
    agg.start_section(1, "1", "Intro", 1);
    agg.add_text("page one", 1);
    agg.start_section(2, "1.1", "Child", 2);
    agg.add_text("page three", 3);
    agg.start_section(1, "2", "Next", 4);

    let sections = agg.finalize();
    let intro = sections.iter().find(|b| b.number == "1").unwrap();
    let child = sections.iter().find(|b| b.number == "1.1").unwrap();
    assert_eq!((intro.page_start, intro.page_end), (1, 3));
    assert_eq!((child.page_start, child.page_end), (2, 3));
}

#[test]
fn test_ignored_span_drops_text() {
    let mut agg = SectionAggregator::new();
    agg.start_section(1, "1", "Intro", 1);
    agg.add_text("kept", 1);
    agg.begin_ignored_section(1);
    assert!(agg.is_ignoring());
    assert_eq!(agg.ignore_level(), Some(1));
    agg.add_text("dropped", 1);
    agg.end_ignored_section();
    assert!(!agg.is_ignoring());
    agg.start_section(1, "2", "Next", 2);
    agg.add_text("also kept", 2);

    let sections = agg.finalize();
    let lines: Vec<&str> = sections
        .iter()
        .flat_map(|b| b.lines.iter().map(String::as_str))
        .collect();
    assert_eq!(lines, vec!["1 Intro", "kept", "2 Next", "also kept"]);
}

#[test]
fn test_root_only_returned_when_alone() {
    let mut agg = SectionAggregator::new();
    agg.add_text("just text", 1);
    agg.add_text("more text", 2);
    let sections = agg.finalize();
    assert_eq!(summary(&sections), vec![(0, "0", "Document", None, 1, 2)]);
    assert_eq!(sections[0].lines, vec!["just text", "more text"]);

    let mut agg = SectionAggregator::new();
    agg.add_text("preamble", 1);
    agg.start_section(1, "1", "Intro", 1);
    let sections = agg.finalize();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].number, "1");

    assert!(SectionAggregator::new().finalize().is_empty());
}

#[test]
fn test_finalize_is_repeatable() {
    let mut agg = SectionAggregator::new();
    agg.start_section(1, "1", "Intro", 1);
    agg.add_text("body", 1);
    agg.start_section(2, "1.1", "Child", 2);
    agg.begin_ignored_section(1);

    let first = agg.finalize();
    let second = agg.finalize();
    assert_eq!(first, second);
    assert!(!agg.is_ignoring());
}

#[test]
fn test_blank_text_is_ignored() {
    let mut agg = SectionAggregator::new();
    agg.add_text("   ", 1);
    assert!(agg.active_levels().is_empty());
    assert!(agg.finalize().is_empty());
}

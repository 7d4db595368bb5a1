use pretty_assertions::assert_eq;

use sectioner_pdf::config::FurnitureConfig;
use sectioner_pdf::furniture::PagePreprocessor;

#[test]
fn test_recurring_footer_removed_from_second_occurrence() {
    let mut pre = PagePreprocessor::default();
    let outputs: Vec<String> = (1..=5)
        .map(|page| {
            let text = format!("Body of page {page}\nDetails for page {page}\nPage 3 von 42");
            pre.clean_page(&text, page)
        })
        .collect();

    assert_eq!(outputs[0], "Body of page 1\nDetails for page 1\nPage 3 von 42");
    for (idx, output) in outputs.iter().enumerate().skip(1) {
        let page = idx + 1;
        assert_eq!(*output, format!("Body of page {page}\nDetails for page {page}"));
    }
    assert!(pre.known_footers().any(|line| line == "page 3 von 42"));
}

#[test]
fn test_running_header_only_removed_near_the_edge() {
    let mut pre = PagePreprocessor::default();
    pre.clean_page("ACME Manual Rev 2\nfirst page body", 8);
    let long_page = [
        "ACME  Manual Rev 2",
        "one",
        "two",
        "three",
        "four",
        "ACME Manual Rev 2",
        "five",
        "six",
        "seven",
        "eight",
    ]
    .join("\n");

    assert_eq!(
        pre.clean_page(&long_page, 9),
        "one\ntwo\nthree\nfour\nACME Manual Rev 2\nfive\nsix\nseven\neight"
    );
    assert!(pre.known_headers().any(|line| line == "acme manual rev 2"));
}

#[test]
fn test_minimum_repeats_is_configurable() {
    let config = FurnitureConfig {
        min_repeats: 3,
        ..FurnitureConfig::default()
    };
    let mut pre = PagePreprocessor::new(config).unwrap();
    let page = |n: u32| format!("Confidential draft\nbody {n}");

    assert_eq!(pre.clean_page(&page(6), 6), "Confidential draft\nbody 6");
    assert_eq!(pre.clean_page(&page(7), 7), "Confidential draft\nbody 7");
    assert_eq!(pre.clean_page(&page(8), 8), "body 8");
}

#[test]
fn test_table_of_contents_title_drops_page() {
    let mut pre = PagePreprocessor::default();
    let page = "Table of Contents\n1 Introduction 3\n2 Design 7";
    assert_eq!(pre.clean_page(page, 2), "");
    assert_eq!(pre.clean_page("Table des matières\nIntroduction", 12), "");
}

#[test]
fn test_numbered_listing_drops_early_pages_only() {
    let page = [
        "1 Introduction 3",
        "1.1 Scope 3",
        "2 Requirements 5",
        "2.1 Functional 6",
        "3 Design 9",
        "3.1 Interfaces 12",
        "4 Testing 15",
    ]
    .join("\n");

    let mut pre = PagePreprocessor::default();
    assert_eq!(pre.clean_page(&page, 3), "");

    let mut late = PagePreprocessor::default();
    assert!(!late.clean_page(&page, 6).is_empty());
}

#[test]
fn test_date_and_version_stamps_are_boilerplate() {
    let mut pre = PagePreprocessor::default();
    let page = "2023-11-30\nVersion 4 final\nSeite 12\nReal text stays";
    assert_eq!(pre.clean_page(page, 20), "Real text stays");
}

use pretty_assertions::assert_eq;

use sectioner_pdf::records::{
    category_chain, index_by_number, read_jsonl, write_jsonl, SectionRecord, MAX_CATEGORY_DEPTH,
};

fn record(number: Option<&str>, title: &str, parent: Option<&str>) -> SectionRecord {
    SectionRecord {
        pdf: "manual.pdf".to_string(),
        section_number: number.map(str::to_string),
        title: title.to_string(),
        level: number.map_or(1, |n| n.split('.').count()),
        parent_number: parent.map(str::to_string),
        page_start: 1,
        page_end: 2,
        heading: title.to_string(),
        text: format!("{title} body"),
    }
}

#[test]
fn test_jsonl_keeps_null_fields() {
    let records = vec![
        record(Some("8"), "Process", None),
        record(None, "GLOSSARY", None),
    ];
    let mut buffer = Vec::new();
    write_jsonl(&mut buffer, &records).unwrap();

    let written = String::from_utf8(buffer.clone()).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("\"section_number\":null"));
    assert!(lines[1].contains("\"parent_number\":null"));

    let padded = format!("\n{written}\n\n");
    assert_eq!(read_jsonl(padded.as_bytes()).unwrap(), records);
}

#[test]
fn test_incomplete_record_is_rejected() {
    let line = r#"{"pdf": "a.pdf", "title": "x"}"#;
    assert!(read_jsonl(line.as_bytes()).is_err());
}

#[test]
fn test_category_chain_walks_parents() {
    let records = vec![
        record(Some("8"), "Process", None),
        record(Some("8.6"), "Timing", Some("8")),
        record(Some("8.6.2"), "Real-time", Some("8.6")),
        record(None, "GLOSSARY", None),
        record(Some("9.9"), "Orphan", Some("9")),
    ];
    let index = index_by_number(&records);

    assert_eq!(
        category_chain(&records[2], &index),
        vec!["8.6.2 Real-time", "8.6 Timing", "8 Process"]
    );
    assert_eq!(category_chain(&records[3], &index), vec!["GLOSSARY"]);
    assert_eq!(category_chain(&records[4], &index), vec!["9.9 Orphan"]);
}

#[test]
fn test_category_chain_stops_on_cycles() {
    let records = vec![
        record(Some("1"), "One", Some("2")),
        record(Some("2"), "Two", Some("1")),
    ];
    let index = index_by_number(&records);
    let chain = category_chain(&records[0], &index);
    assert_eq!(chain.len(), MAX_CATEGORY_DEPTH);
    assert_eq!(chain[..3], ["1 One", "2 Two", "1 One"]);
}

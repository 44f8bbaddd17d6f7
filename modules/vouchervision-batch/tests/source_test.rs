use std::fs;

use vouchervision_batch::source::{
    load_url_list, parse_delimited, parse_line_list, scan_image_dir, select_image_files,
};
use vouchervision_batch::{BatchError, ItemSource, WorkItem};

fn keys(items: &[WorkItem]) -> Vec<&str> {
    items.iter().map(WorkItem::key).collect()
}

#[test]
fn detects_url_column_when_hint_is_absent() {
    let csv = "image_link,notes\nhttp://a/1.jpg,first\nhttp://a/2.jpg,second\n";

    let parsed = parse_delimited(csv, "url").unwrap();

    assert_eq!(parsed.detected_column, "image_link");
    assert_eq!(keys(&parsed.items), vec!["http://a/1.jpg", "http://a/2.jpg"]);

    let row = parsed.items[0].original_row.as_ref().unwrap();
    assert_eq!(row["notes"], "first");
    assert_eq!(row["image_link"], "http://a/1.jpg");
}

#[test]
fn missing_url_column_lists_what_is_there() {
    let err = parse_delimited("id,notes\n1,x\n", "url").unwrap_err();
    match err {
        BatchError::ColumnNotFound { column, available } => {
            assert_eq!(column, "url");
            assert_eq!(available, vec!["id", "notes"]);
        }
        other => panic!("expected ColumnNotFound, got {other:?}"),
    }
}

#[test]
fn header_only_csv_is_empty_input() {
    assert!(matches!(
        parse_delimited("url,notes\n", "url"),
        Err(BatchError::EmptyInput)
    ));
    assert!(matches!(
        parse_delimited("url\n,\n   \n", "url"),
        Err(BatchError::EmptyInput)
    ));
}

#[test]
fn rows_with_blank_urls_are_dropped() {
    let csv = "url,notes\nhttp://a/1.jpg,keep\n  ,no url here\nhttp://a/3.jpg,keep\n";

    let parsed = parse_delimited(csv, "url").unwrap();

    assert_eq!(keys(&parsed.items), vec!["http://a/1.jpg", "http://a/3.jpg"]);
}

#[test]
fn quoted_fields_and_short_rows_parse() {
    let csv = "url,notes\n\"http://a/1.jpg\",\"a, b\"\nhttp://a/2.jpg\n";

    let parsed = parse_delimited(csv, "url").unwrap();

    assert_eq!(parsed.items.len(), 2);
    assert_eq!(parsed.items[0].original_row.as_ref().unwrap()["notes"], "a, b");
    assert!(!parsed.items[1].original_row.as_ref().unwrap().contains_key("notes"));
}

#[test]
fn line_list_skips_blank_lines() {
    let text = "http://a/1.jpg\nhttp://a/2.jpg\n\nhttp://a/3.jpg\n  http://a/4.jpg  \n";

    let items = parse_line_list(text);

    assert_eq!(
        keys(&items),
        vec!["http://a/1.jpg", "http://a/2.jpg", "http://a/3.jpg", "http://a/4.jpg"]
    );
    assert!(items.iter().all(|i| i.original_row.is_none()));
}

#[test]
fn load_url_list_dispatches_on_extension() {
    let dir = tempfile::tempdir().unwrap();

    let csv = dir.path().join("batch.CSV");
    fs::write(&csv, "Link,id\nhttp://a/1.jpg,1\n").unwrap();
    assert_eq!(keys(&load_url_list(&csv, "url").unwrap()), vec!["http://a/1.jpg"]);

    let txt = dir.path().join("batch.txt");
    fs::write(&txt, "http://a/1.jpg\nhttp://a/2.jpg\n").unwrap();
    assert_eq!(load_url_list(&txt, "url").unwrap().len(), 2);

    let json = dir.path().join("batch.json");
    fs::write(&json, "[]").unwrap();
    assert!(matches!(
        load_url_list(&json, "url"),
        Err(BatchError::UnsupportedInput(_))
    ));
}

#[test]
fn scan_then_select_keeps_images_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b.png"), [0u8; 2048]).unwrap();
    fs::write(dir.path().join("a.JPG"), [0u8; 10]).unwrap();
    fs::write(dir.path().join("notes.txt"), "x").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested").join("c.tif"), [0u8; 1]).unwrap();

    let files = scan_image_dir(dir.path()).unwrap();
    assert_eq!(files.len(), 4);

    let items = select_image_files(files);
    assert_eq!(keys(&items), vec!["a.JPG", "b.png", "c.tif"]);

    match &items[1].source {
        ItemSource::File(file) => {
            assert_eq!(file.size, 2048);
            assert_eq!(file.media_type, "image/png");
            assert!(file.path.ends_with("b.png"));
        }
        other => panic!("expected a file item, got {other:?}"),
    }
}

#[test]
fn scan_rejects_non_directories() {
    let file = tempfile::NamedTempFile::new().unwrap();
    assert!(matches!(
        scan_image_dir(file.path()),
        Err(BatchError::UnsupportedInput(_))
    ));
}

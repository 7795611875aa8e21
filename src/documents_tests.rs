use super::*;

fn store() -> (tempfile::TempDir, DocumentStore) {
    let tmp = tempfile::tempdir().unwrap();
    let store = DocumentStore::open(tmp.path().join("data")).unwrap();
    (tmp, store)
}

#[test]
fn kind_follows_first_extension_token() {
    assert_eq!(Kind::from_name("about.md"), Kind::Markdown);
    assert_eq!(Kind::from_name("changes.txt"), Kind::PlainText);
    assert_eq!(Kind::from_name("README"), Kind::PlainText);
    assert_eq!(Kind::from_name("notes.markdown"), Kind::PlainText);
    assert_eq!(Kind::from_name("draft.md.bak"), Kind::Markdown);
}

#[test]
fn markdown_heading_becomes_h1() {
    let out = render(b"# Ruby is...\n\nSome text.", Kind::Markdown);
    match out {
        Rendered::Html(html) => {
            assert!(html.contains("<h1>Ruby is...</h1>"), "got {html}");
            assert!(html.contains("<p>Some text.</p>"));
        }
        other => panic!("expected html, got {:?}", other),
    }
}

#[test]
fn plain_text_is_returned_verbatim() {
    let (_tmp, store) = store();
    let text = "1993 - Yukihiro Matsumoto dreams up Ruby.\n  # not a heading <b>raw</b>\n";
    store.create("history.txt", text).unwrap();
    let doc = store.read("history.txt").unwrap();
    assert_eq!(doc.kind, Kind::PlainText);
    assert_eq!(render(&doc.content, doc.kind), Rendered::PlainText(text.as_bytes().to_vec()));
}

#[test]
fn create_then_list_then_delete() {
    let (_tmp, store) = store();
    store.create("x", "").unwrap();
    assert!(store.list().unwrap().contains(&"x".to_string()));
    assert!(store.exists("x").unwrap());
    store.delete("x").unwrap();
    assert!(!store.list().unwrap().contains(&"x".to_string()));
}

#[test]
fn list_is_sorted() {
    let (_tmp, store) = store();
    store.create("changes.txt", "").unwrap();
    store.create("about.md", "").unwrap();
    store.create("history.txt", "").unwrap();
    assert_eq!(store.list().unwrap(), vec!["about.md", "changes.txt", "history.txt"]);
}

#[test]
fn create_overwrites_existing_document() {
    let (_tmp, store) = store();
    store.create("a.txt", "first").unwrap();
    store.create("a.txt", "").unwrap();
    assert!(store.read("a.txt").unwrap().content.is_empty());
}

#[test]
fn update_missing_is_not_found_and_leaves_directory_alone() {
    let (_tmp, store) = store();
    store.create("keep.txt", "v1").unwrap();
    let before = store.list().unwrap();
    let err = store.update("missing.txt", "v2").unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref n) if n == "missing.txt"));
    assert_eq!(store.list().unwrap(), before);
    assert_eq!(store.read("keep.txt").unwrap().content, b"v1");
}

#[test]
fn update_replaces_content() {
    let (_tmp, store) = store();
    store.create("changes.txt", "v1").unwrap();
    store.update("changes.txt", "v2").unwrap();
    assert_eq!(store.read("changes.txt").unwrap().content, b"v2");
}

#[test]
fn read_and_delete_missing_are_not_found() {
    let (_tmp, store) = store();
    assert!(matches!(store.read("nope.md"), Err(AppError::NotFound(_))));
    assert!(matches!(store.delete("nope.md"), Err(AppError::NotFound(_))));
}

#[test]
fn names_outside_the_directory_are_rejected() {
    let (tmp, store) = store();
    for bad in ["../escape.txt", "a/b.txt", "..\\win.txt", ".", ".."] {
        let err = store.create(bad, "x").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "{bad} accepted");
    }
    assert!(!tmp.path().join("escape.txt").exists());
    // read goes through list membership, so traversal cannot reach a sibling file
    std::fs::write(tmp.path().join("secret.txt"), "s").unwrap();
    assert!(matches!(store.read("../secret.txt"), Err(AppError::NotFound(_))));
}

#[test]
fn empty_name_is_required() {
    let (_tmp, store) = store();
    let err = store.create("", "").unwrap_err();
    assert_eq!(err.to_string(), NAME_REQUIRED);
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn whitespace_only_name_is_a_valid_name() {
    let (_tmp, store) = store();
    store.create(" ", "").unwrap();
    assert_eq!(store.list().unwrap(), vec![" "]);
}

#[test]
fn non_utf8_content_is_kept_byte_for_byte() {
    let (_tmp, store) = store();
    let bytes = [0x47u8, 0x49, 0x46, 0xff, 0xfe, 0x00];
    store.create("logo.bin", bytes).unwrap();
    let doc = store.read("logo.bin").unwrap();
    assert_eq!(doc.content, bytes);
    assert_eq!(render(&doc.content, doc.kind), Rendered::PlainText(bytes.to_vec()));
    assert_eq!(doc.text(), "GIF\u{fffd}\u{fffd}\0");
}

#[test]
fn markdown_with_invalid_utf8_still_renders() {
    let (_tmp, store) = store();
    store.create("notes.md", b"# Title\n\n\xffbroken".as_slice()).unwrap();
    let doc = store.read("notes.md").unwrap();
    match render(&doc.content, doc.kind) {
        Rendered::Html(html) => assert!(html.contains("<h1>Title</h1>")),
        other => panic!("expected html, got {:?}", other),
    }
}

use super::*;

#[test]
fn empty_book_outlines_nothing() {
    let book = FontBook::empty();
    assert!(book.is_empty());
    assert!(book.path().is_none());
    assert!(book.outline("abc").is_none());
}

#[test]
fn missing_file_is_an_io_error() {
    let err = FontBook::from_file(Path::new("/nonexistent/pipedview/font.ttf")).expect_err("missing");
    assert!(matches!(err, FontError::Io { .. }));
}

#[test]
fn garbage_file_is_a_parse_error() {
    let path = std::env::temp_dir().join(format!("pipedview-font-{}.ttf", std::process::id()));
    fs::write(&path, b"not a font").expect("write");
    let err = FontBook::from_file(&path).expect_err("garbage");
    fs::remove_file(&path).expect("cleanup");
    assert!(matches!(err, FontError::Parse { .. }));
}

#[test]
fn unusable_explicit_font_falls_back() {
    let book = FontBook::discover(Some(Path::new("/nonexistent/pipedview/font.ttf")));
    assert_ne!(book.path(), Some(Path::new("/nonexistent/pipedview/font.ttf")));
}

#[test]
fn loaded_font_outlines_text() {
    let Some(path) = SYSTEM_FONT_PATHS.iter().map(Path::new).find(|path| path.is_file()) else {
        return;
    };
    let Ok(book) = FontBook::from_file(path) else { return };
    let outline = book.outline("Hi").expect("outline");
    assert!(outline.advance > 0.0);
    assert!(outline.path.is_some());
}

mod common;

use common::{pdf_with_content_streams, pdf_with_pages};
use ultron_core::{
    DocumentTextExtractor, DocumentUpload, ExtractionError, SessionController, UploadOutcome,
};

#[test]
fn three_pages_join_with_trailing_newlines() {
    let bytes = pdf_with_pages(&[&["a"], &["b"], &["c"]]);
    let text = DocumentTextExtractor::extract(&bytes).unwrap();
    assert_eq!(text, "a\nb\nc\n");
}

#[test]
fn items_in_one_text_object_join_with_single_spaces() {
    let bytes = pdf_with_pages(&[&["Line one", "Line two"], &["Second", "page", "here"]]);
    let text = DocumentTextExtractor::extract(&bytes).unwrap();
    assert_eq!(text, "Line one Line two\nSecond page here\n");
}

#[test]
fn every_show_operator_is_an_item() {
    let content = br#"BT /F1 12 Tf 50 700 Td
(Line one) Tj
0 -20 Td (Line two) Tj
(Line three) '
1 2 (Line four) "
[(Ker) -20 (ned) -300 (words)] TJ
ET"#;
    let bytes = pdf_with_content_streams(&[content.to_vec()]);
    let text = DocumentTextExtractor::extract(&bytes).unwrap();
    assert_eq!(text, "Line one Line two Line three Line four Kerned words\n");
}

#[test]
fn separate_text_objects_are_separate_items() {
    let content = b"BT /F1 12 Tf (first) Tj ET BT /F1 12 Tf (second) Tj ET".to_vec();
    let bytes = pdf_with_content_streams(&[content]);
    assert_eq!(DocumentTextExtractor::extract(&bytes).unwrap(), "first second\n");
}

#[test]
fn page_without_text_contributes_an_empty_line() {
    let bytes = pdf_with_pages(&[&["first"], &[], &["third"]]);
    let text = DocumentTextExtractor::extract(&bytes).unwrap();
    assert_eq!(text, "first\n\nthird\n");
}

#[test]
fn unparseable_content_stream_is_a_page_decode_error() {
    let bytes = pdf_with_content_streams(&[b"(unterminated".to_vec()]);
    let err = DocumentTextExtractor::extract(&bytes).unwrap_err();
    assert!(matches!(err, ExtractionError::PageDecode { page: 1, .. }), "{:?}", err);
}

#[test]
fn decode_failure_names_the_failing_page() {
    let good = b"BT /F1 12 Tf (fine) Tj ET".to_vec();
    let bytes = pdf_with_content_streams(&[good, b"(broken".to_vec()]);
    let err = DocumentTextExtractor::extract(&bytes).unwrap_err();
    assert!(matches!(err, ExtractionError::PageDecode { page: 2, .. }), "{:?}", err);
}

#[tokio::test]
async fn page_decode_failure_leaves_session_untouched() {
    let mut session = SessionController::new();
    let upload = DocumentUpload::new(
        "broken.pdf",
        "application/pdf",
        pdf_with_content_streams(&[b"(unterminated".to_vec()]),
    );

    let outcome = session.upload_document(upload).await;
    assert!(matches!(
        outcome,
        UploadOutcome::Failed(ExtractionError::PageDecode { page: 1, .. })
    ));
    assert!(session.messages().is_empty());
    assert!(session.pending_document().is_none());
    assert!(!session.busy());
}

#[tokio::test]
async fn upload_carries_file_name_into_context() {
    let upload = DocumentUpload::new(
        "paper.pdf",
        "application/pdf",
        pdf_with_pages(&[&["abstract"]]),
    );
    let doc = DocumentTextExtractor::extract_upload(upload).await.unwrap();
    assert_eq!(doc.file_name, "paper.pdf");
    assert_eq!(doc.raw_text, "abstract\n");
}

#[tokio::test]
async fn upload_with_wrong_type_is_not_parsed() {
    // valid PDF bytes, but declared as something else
    let upload = DocumentUpload::new("paper.bin", "application/octet-stream", pdf_with_pages(&[&["x"]]));
    let err = DocumentTextExtractor::extract_upload(upload).await.unwrap_err();
    assert!(matches!(err, ExtractionError::UnsupportedType(_)));
}

//! Integration tests for redaction, redacted output and sealing.

mod common;

use casestream::redact::{self, mark_redacted, redacted_text, RedactionTarget};
use casestream::render::{self, RenderConfig};
use casestream::{Error, Format, RedactionKey, Volume};

use common::{build_volume, page_12};

fn redact_court_block() -> Volume {
    let mut volume = build_volume();
    let page = volume.pages.iter_mut().find(|p| p.id == "page_12").unwrap();
    mark_redacted(page, &[RedactionTarget::Block("BL_12.2".to_string())]).unwrap();
    volume
}

fn render_page_12(volume: &Volume, redacted: bool) -> String {
    let index = volume.index().unwrap();
    let config = RenderConfig::new(&index, &volume.fonts).with_redacted(redacted);
    render::render_page(volume.page("page_12").unwrap(), &config).unwrap()
}

#[test]
fn test_redact_one_of_three_blocks() {
    let volume = redact_court_block();

    let redacted = render_page_12(&volume, true);
    assert!(!redacted.contains("<TextBlock ID=\"BL_12.2\""));
    assert!(!redacted.contains("CONTENT=\"court\""));
    assert!(redacted.contains("CONTENT=\"Roe\""));
    assert!(redacted.contains("CONTENT=\"pro-\""));

    // Unredacted output is untouched
    assert_eq!(render_page_12(&volume, false), page_12());
}

#[test]
fn test_redacted_case_output() {
    let volume = redact_court_block();
    let index = volume.index().unwrap();
    let config = RenderConfig::new(&index, &volume.fonts)
        .with_format(Format::Html)
        .with_redacted(true);

    let out = render::render_case(&volume.cases[0], &config).unwrap();
    assert!(!out.contains("court held"));
    assert!(out.contains("Doe v. Roe"));
    assert!(out.contains("proceeded."));
}

#[test]
fn test_redacted_span_in_layout() {
    let mut volume = build_volume();
    let page = volume.pages.iter_mut().find(|p| p.id == "page_12").unwrap();
    // "Doe v. Roe": redact "Roe"
    mark_redacted(
        page,
        &[RedactionTarget::Span {
            block_id: "BL_12.1".to_string(),
            start: 7,
            end: 10,
        }],
    )
    .unwrap();

    let text = redacted_text(volume.page("page_12").unwrap());
    let pieces: Vec<&str> = text.fragments.iter().map(|f| f.text.as_str()).collect();
    assert_eq!(pieces, vec!["Roe"]);

    let redacted = render_page_12(&volume, true);
    assert!(!redacted.contains("CONTENT=\"Roe\""));
    assert!(redacted.contains("CONTENT=\"Doe\""));
    assert_eq!(render_page_12(&volume, false), page_12());
}

#[test]
fn test_seal_and_unseal_volume_page() {
    let mut volume = redact_court_block();
    let key = RedactionKey::generate();
    let page = volume.pages.iter_mut().find(|p| p.id == "page_12").unwrap();

    assert!(redact::seal_page(page, &key).unwrap());
    assert!(page.sealed.is_some());
    assert!(!render_page_12(&volume, false).contains("CONTENT=\"court\""));

    // Sealing twice is refused
    let page = volume.pages.iter_mut().find(|p| p.id == "page_12").unwrap();
    assert!(redact::seal_page(page, &key).is_err());

    let wrong = RedactionKey::generate();
    assert!(matches!(
        redact::unseal_page(page, &wrong),
        Err(Error::DecryptionFailure)
    ));
    assert!(page.sealed.is_some());

    let restored = redact::unseal_page(page, &key).unwrap();
    let pieces: Vec<&str> = restored.fragments.iter().map(|f| f.text.as_str()).collect();
    assert!(pieces.contains(&"court"));
    assert!(restored.fragments.iter().all(|f| f.block_id == "BL_12.2"));
    assert!(page.sealed.is_none());
    assert_eq!(render_page_12(&volume, false), page_12());
}

#[test]
fn test_open_with_wrong_key() {
    let volume = redact_court_block();
    let page = volume.page("page_12").unwrap();
    let key = RedactionKey::from_bytes([7u8; 32]);

    let mut sealed_page = page.clone();
    sealed_page.sealed = redact::seal(page, &key).unwrap();
    assert!(sealed_page.sealed.is_some());

    let opened = redact::open(&sealed_page, &key).unwrap();
    assert_eq!(opened, redacted_text(page));
    assert!(matches!(
        redact::open(&sealed_page, &RedactionKey::from_bytes([8u8; 32])),
        Err(Error::DecryptionFailure)
    ));
}

//! Integration tests for the extract, render and validate flow of a volume.

mod common;

use casestream::render::{self, paragraph_texts, RenderConfig};
use casestream::{Error, ExtractOptions, Format, Token, VolumeBuilder, VolumeMetadata};

use common::{build_volume, page_12, page_13, CASE};

fn render_case(format: Format) -> String {
    let volume = build_volume();
    let index = volume.index().unwrap();
    let config = RenderConfig::new(&index, &volume.fonts).with_format(format);
    render::render_case(&volume.cases[0], &config).unwrap()
}

#[test]
fn test_layout_round_trip() {
    let volume = build_volume();
    let index = volume.index().unwrap();
    let config = RenderConfig::new(&index, &volume.fonts);

    let rendered = render::render_page(volume.page("page_12").unwrap(), &config).unwrap();
    assert_eq!(rendered, page_12());
    let rendered = render::render_page(volume.page("page_13").unwrap(), &config).unwrap();
    assert_eq!(rendered, page_13());
}

#[test]
fn test_canonical_round_trip() {
    let volume = build_volume();
    let index = volume.index().unwrap();
    let config = RenderConfig::new(&index, &volume.fonts).with_format(Format::OriginalCanonical);

    let rendered = render::render_case(&volume.cases[0], &config).unwrap();
    assert!(rendered.contains("<p id=\"b12-2\">The court held.<footnotemark>1</footnotemark></p>"));
    render::validate_case(&volume.cases[0], CASE, &config).unwrap();
}

#[test]
fn test_corrections_keep_ocr_text() {
    let volume = build_volume();
    let block = volume.page("page_12").unwrap().block("BL_12.2").unwrap();
    assert_eq!(block.text(), "The court held.1");
    assert!(block.tokens().contains(&Token::edit("b")));
}

#[test]
fn test_hyphen_across_page_break() {
    let volume = build_volume();
    let first = volume.page("page_12").unwrap().block("BL_12.3").unwrap();
    let second = volume.page("page_13").unwrap().block("BL_13.1").unwrap();

    assert_eq!(first.text(), "pro");
    assert!(first.tokens().contains(&Token::edit("-")));
    assert_eq!(second.text(), "ceeded.");

    let text = render_case(Format::Text);
    assert!(text.contains("\nproceeded.\n"));
}

#[test]
fn test_page_label_marker() {
    let enriched = render_case(Format::EnrichedCanonical);
    assert_eq!(enriched.matches("<page-number ").count(), 1);
    assert!(enriched.contains("label=\"13\">*13</page-number>"));

    let html = render_case(Format::Html);
    assert_eq!(html.matches("class=\"page-label\"").count(), 1);

    let canonical = render_case(Format::OriginalCanonical);
    assert!(!canonical.contains("page-number"));
}

#[test]
fn test_enriched_and_html_paragraphs_agree() {
    let enriched = paragraph_texts(&render_case(Format::EnrichedCanonical), Format::EnrichedCanonical).unwrap();
    let html = paragraph_texts(&render_case(Format::Html), Format::Html).unwrap();

    assert_eq!(enriched.len(), 4);
    assert_eq!(enriched[0], "Doe v. Roe");
    assert_eq!(enriched, html);
}

#[test]
fn test_parallel_rendering_keeps_case_order() {
    let mut volume = build_volume();
    let mut second = volume.cases[0].clone();
    second.id = "case_2".to_string();
    volume.cases.push(second);

    let parallel = volume.render_cases(Format::Html, false, true).unwrap();
    let sequential = volume.render_cases(Format::Html, false, false).unwrap();
    assert_eq!(parallel.len(), 2);
    assert_eq!(parallel, sequential);
}

#[test]
fn test_layout_mismatch_is_reported() {
    let mut builder = VolumeBuilder::new(VolumeMetadata::new("32044057891234"))
        .with_options(ExtractOptions::new().with_validation(true).sequential());
    builder.add_page(&page_12()).unwrap();
    builder
        .add_page(&page_13().replace("DESKEW=\"0.00\"", "DESKEW=\"0\""))
        .unwrap();

    match builder.build() {
        Err(Error::ValidationMismatch(msg)) => assert!(msg.contains("page_13")),
        other => panic!("expected a mismatch, got {:?}", other.map(|v| v.pages.len())),
    }
}

#[test]
fn test_case_before_its_pages() {
    let mut builder = VolumeBuilder::new(VolumeMetadata::new("32044057891234"));
    builder.add_page(&page_12()).unwrap();
    assert!(matches!(
        builder.add_case(CASE, "case_1"),
        Err(Error::MissingReference(_))
    ));
}

#[test]
fn test_layout_round_trip_with_apostrophe() {
    let raw = common::layout(12, "12", &[("BL_12.1", &["court's", "ruling"])]);
    let mut builder = VolumeBuilder::new(VolumeMetadata::new("32044057891234"))
        .with_options(ExtractOptions::new().with_validation(true));
    builder.add_page(&raw).unwrap();
    let volume = builder.build().unwrap();

    let index = volume.index().unwrap();
    let config = RenderConfig::new(&index, &volume.fonts);
    assert_eq!(render::render_page(&volume.pages[0], &config).unwrap(), raw);
}

#[test]
fn test_rejected_case_keeps_pages() {
    let mut builder = VolumeBuilder::new(VolumeMetadata::new("32044057891234"))
        .with_options(ExtractOptions::new().with_validation(true));
    builder.add_page(&page_12()).unwrap();
    builder.add_page(&page_13()).unwrap();

    // The footnote gains a word after the majority paragraphs were corrected
    let raw = CASE.replace("See above.", "See the above.");
    assert!(matches!(
        builder.add_case(&raw, "case_1"),
        Err(Error::UnsupportedEdit(_))
    ));
    assert_eq!(builder.case_count(), 0);

    let volume = builder.build().unwrap();
    let block = volume.page("page_12").unwrap().block("BL_12.2").unwrap();
    assert_eq!(block.text(), "Tbe court held.1");
    assert!(!block.tokens().contains(&Token::edit("b")));
    assert_eq!(volume.page("page_12").unwrap().block("BL_12.3").unwrap().text(), "pro-");
}

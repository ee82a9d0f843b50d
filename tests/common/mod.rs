//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use casestream::{ExtractOptions, Volume, VolumeBuilder, VolumeMetadata};

/// A layout document with one single-line text block per entry.
pub fn layout(page: u32, label: &str, blocks: &[(&str, &[&str])]) -> String {
    let mut tags = String::new();
    let mut body = String::new();
    for (id, words) in blocks {
        tags.push_str(&format!(
            "    <StructureTag ID=\"{id}\" TYPE=\"structural\" LABEL=\"p\"/>\n"
        ));
        body.push_str(&format!(
            "        <TextBlock ID=\"{id}\" HPOS=\"0\" VPOS=\"0\" WIDTH=\"100\" HEIGHT=\"10\" TAGREFS=\"{id}\">\n          <TextLine HPOS=\"0\" VPOS=\"0\" WIDTH=\"100\" HEIGHT=\"10\">\n"
        ));
        for word in *words {
            body.push_str(&format!(
                "            <String HPOS=\"0\" VPOS=\"0\" WIDTH=\"10\" HEIGHT=\"10\" CONTENT=\"{word}\" WC=\"1.00\" CC=\"0\" STYLEREFS=\"Style_1\"/>\n"
            ));
        }
        body.push_str("          </TextLine>\n        </TextBlock>\n");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<alto xmlns="http://www.loc.gov/standards/alto/ns-v3#">
  <Description>
    <sourceImageInformation>
      <fileName>img_{page}.tif</fileName>
    </sourceImageInformation>
  </Description>
  <Styles>
    <TextStyle ID="Style_1" FONTFAMILY="Times" FONTSIZE="9.00"/>
  </Styles>
  <Tags>
{tags}  </Tags>
  <Layout>
    <Page ID="page_{page}" PHYSICAL_IMG_NR="{page}" PRINTED_IMG_NR="{label}" WIDTH="100" HEIGHT="100" DESKEW="0.00" PC="1.00">
      <PrintSpace HPOS="0" VPOS="0" WIDTH="100" HEIGHT="100">
{body}      </PrintSpace>
    </Page>
  </Layout>
</alto>
"#
    )
}

pub fn page_12() -> String {
    layout(
        12,
        "12",
        &[
            ("BL_12.1", &["Doe", "v.", "Roe"]),
            ("BL_12.2", &["Tbe", "court", "held.1"]),
            ("BL_12.3", &["pro-"]),
        ],
    )
}

pub fn page_13() -> String {
    layout(
        13,
        "13",
        &[("BL_13.1", &["ceeded."]), ("BL_13.2", &["See", "above."])],
    )
}

/// A case spanning pages 12 and 13, with an OCR error, a footnote marker and
/// a word hyphenated across the page break.
pub const CASE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<case>
  <court abbreviation="Ill.">Supreme Court of Illinois</court>
  <name abbreviation="Doe v. Roe">John Doe versus Richard Roe</name>
  <decisiondate>1850-12</decisiondate>
  <casebody firstpage="12" lastpage="13">
    <parties id="b12-1">Doe v. Roe</parties>
    <opinion type="majority">
      <p id="b12-2">The court held.<footnotemark>1</footnotemark></p>
      <p id="b12-3">proceeded.</p>
      <footnote label="1"><p id="b13-2">See above.</p></footnote>
    </opinion>
  </casebody>
  <blockmap>
    <par id="b12-1" blocks="BL_12.1"/>
    <par id="b12-2" blocks="BL_12.2"/>
    <par id="b12-3" blocks="BL_12.3 BL_13.1"/>
    <par id="b13-2" blocks="BL_13.2"/>
  </blockmap>
</case>
"#;

/// The fixture volume, validated against its sources.
pub fn build_volume() -> Volume {
    let mut builder = VolumeBuilder::new(VolumeMetadata::new("32044057891234"))
        .with_options(ExtractOptions::new().with_validation(true));
    builder.add_page(&page_12()).unwrap();
    builder.add_page(&page_13()).unwrap();
    builder.add_case(CASE, "case_1").unwrap();
    builder.build().unwrap()
}

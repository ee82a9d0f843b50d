//! Case-level types: opinions, paragraphs and footnotes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::is_false;

/// Structural role of a paragraph.
///
/// The set is closed; the element name of each kind in canonical markup comes
/// from a static table (see [`ParagraphKind::tag`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParagraphKind {
    Author,
    Parties,
    DocketNumber,
    Court,
    DecisionDate,
    OtherDate,
    Judges,
    Attorneys,
    Syllabus,
    Headnotes,
    Summary,
    Disposition,
    History,
    SeeAlso,
    Correction,
    P,
    Blockquote,
}

const PARAGRAPH_TAGS: &[(ParagraphKind, &str)] = &[
    (ParagraphKind::Author, "author"),
    (ParagraphKind::Parties, "parties"),
    (ParagraphKind::DocketNumber, "docketnumber"),
    (ParagraphKind::Court, "court"),
    (ParagraphKind::DecisionDate, "decisiondate"),
    (ParagraphKind::OtherDate, "otherdate"),
    (ParagraphKind::Judges, "judges"),
    (ParagraphKind::Attorneys, "attorneys"),
    (ParagraphKind::Syllabus, "syllabus"),
    (ParagraphKind::Headnotes, "headnotes"),
    (ParagraphKind::Summary, "summary"),
    (ParagraphKind::Disposition, "disposition"),
    (ParagraphKind::History, "history"),
    (ParagraphKind::SeeAlso, "seealso"),
    (ParagraphKind::Correction, "correction"),
    (ParagraphKind::P, "p"),
    (ParagraphKind::Blockquote, "blockquote"),
];

impl ParagraphKind {
    /// Element name in canonical markup.
    pub fn tag(self) -> &'static str {
        PARAGRAPH_TAGS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, tag)| *tag)
            .unwrap_or("p")
    }

    /// Parse a canonical element name.
    pub fn from_tag(tag: &str) -> Option<Self> {
        PARAGRAPH_TAGS
            .iter()
            .find(|(_, t)| *t == tag)
            .map(|(kind, _)| *kind)
    }

    /// All kinds, in table order.
    pub fn all() -> impl Iterator<Item = ParagraphKind> {
        PARAGRAPH_TAGS.iter().map(|(kind, _)| *kind)
    }

    /// HTML element used for this kind.
    pub fn html_tag(self) -> &'static str {
        match self {
            ParagraphKind::Blockquote => "blockquote",
            _ => "p",
        }
    }

    /// HTML class attribute; plain paragraphs and blockquotes carry none.
    pub fn html_class(self) -> Option<&'static str> {
        match self {
            ParagraphKind::P | ParagraphKind::Blockquote => None,
            other => Some(other.tag()),
        }
    }
}

impl fmt::Display for ParagraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Kind of opinion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpinionKind {
    /// Synthetic opinion holding the head matter before the first real opinion
    HeadMatter,
    Majority,
    Plurality,
    Concurrence,
    Dissent,
    ConcurringInPartAndDissentingInPart,
    Remittitur,
    Rehearing,
    OnTheMerits,
    OnMotion,
}

const OPINION_TAGS: &[(OpinionKind, &str)] = &[
    (OpinionKind::HeadMatter, "head-matter"),
    (OpinionKind::Majority, "majority"),
    (OpinionKind::Plurality, "plurality"),
    (OpinionKind::Concurrence, "concurrence"),
    (OpinionKind::Dissent, "dissent"),
    (
        OpinionKind::ConcurringInPartAndDissentingInPart,
        "concurring-in-part-and-dissenting-in-part",
    ),
    (OpinionKind::Remittitur, "remittitur"),
    (OpinionKind::Rehearing, "rehearing"),
    (OpinionKind::OnTheMerits, "on-the-merits"),
    (OpinionKind::OnMotion, "on-motion"),
];

impl OpinionKind {
    /// Value of the `type` attribute in canonical markup.
    pub fn tag(self) -> &'static str {
        OPINION_TAGS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, tag)| *tag)
            .unwrap_or("majority")
    }

    /// Parse an opinion `type` attribute. The head-matter tag is not accepted
    /// since head matter never appears as an element.
    pub fn from_tag(tag: &str) -> Option<Self> {
        OPINION_TAGS
            .iter()
            .find(|(kind, t)| *t == tag && *kind != OpinionKind::HeadMatter)
            .map(|(kind, _)| *kind)
    }

    /// Check if this is the synthetic head-matter opinion.
    pub fn is_head_matter(self) -> bool {
        self == OpinionKind::HeadMatter
    }
}

impl fmt::Display for OpinionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A paragraph of canonical text, referring to its blocks by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Paragraph identifier (e.g., "b12-5")
    pub id: String,

    /// Structural role
    pub kind: ParagraphKind,

    /// Ids of the blocks holding this paragraph's text, in reading order
    pub block_ids: Vec<String>,

    /// Whether the whole paragraph is redacted
    #[serde(default, skip_serializing_if = "is_false")]
    pub redacted: bool,
}

impl Paragraph {
    /// Create a paragraph.
    pub fn new(id: impl Into<String>, kind: ParagraphKind, block_ids: Vec<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            block_ids,
            redacted: false,
        }
    }
}

/// A footnote attached to an opinion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footnote {
    /// Synthetic id (`footnote_{opinion}_{n}`)
    pub id: String,

    /// Printed footnote label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Footnote has no mark in the text
    #[serde(default, skip_serializing_if = "is_false")]
    pub orphan: bool,

    /// Whether the whole footnote is redacted
    #[serde(default, skip_serializing_if = "is_false")]
    pub redacted: bool,

    /// Footnote body
    pub paragraphs: Vec<Paragraph>,
}

impl Footnote {
    /// Build the synthetic id for footnote `n` (1-based) of opinion `opinion`
    /// (head matter is opinion 0).
    pub fn make_id(opinion: usize, n: usize) -> String {
        format!("footnote_{}_{}", opinion, n)
    }
}

/// One opinion of a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opinion {
    /// Opinion kind
    pub kind: OpinionKind,

    /// Paragraphs in reading order
    pub paragraphs: Vec<Paragraph>,

    /// Footnotes, following the paragraphs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub footnotes: Vec<Footnote>,
}

impl Opinion {
    /// Create an empty opinion.
    pub fn new(kind: OpinionKind) -> Self {
        Self {
            kind,
            paragraphs: Vec::new(),
            footnotes: Vec::new(),
        }
    }

    /// Iterate over paragraphs followed by footnote paragraphs.
    pub fn all_paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.paragraphs
            .iter()
            .chain(self.footnotes.iter().flat_map(|f| f.paragraphs.iter()))
    }

    /// Check if the opinion has no paragraphs and no footnotes.
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty() && self.footnotes.is_empty()
    }
}

/// Court that decided a case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Court {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
}

/// A citation of a case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Citation category (e.g., "official")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Citation type (e.g., "bluebook")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Citation text (e.g., "1 Ill. 1")
    pub text: String,
}

/// Case metadata carried by the canonical document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseMetadata {
    pub court: Court,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,

    /// Full case name
    pub name: String,

    /// Abbreviated case name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_abbreviation: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docket_numbers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,

    /// Decision date as written in the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_date: Option<String>,
}

impl CaseMetadata {
    /// Parse the decision date.
    ///
    /// Partial dates are accepted: `YYYY-MM` maps to the first of the month and
    /// `YYYY` to January 1st.
    pub fn decision_date_parsed(&self) -> Option<NaiveDate> {
        let raw = self.decision_date.as_deref()?.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date);
        }
        let mut parts = raw.splitn(3, '-');
        let year: i32 = parts.next()?.parse().ok()?;
        let month: u32 = match parts.next() {
            Some(m) => m.parse().ok()?,
            None => 1,
        };
        if parts.next().is_some() {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, 1)
    }
}

/// A case: metadata plus opinions whose paragraphs point into page blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    /// Case identifier
    pub id: String,

    /// Printed label of the first page
    pub first_page: String,

    /// Printed label of the last page
    pub last_page: String,

    pub metadata: CaseMetadata,

    /// Opinions; the first one is always the head matter
    pub opinions: Vec<Opinion>,
}

impl Case {
    /// Create a case with an empty head-matter opinion.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_page: String::new(),
            last_page: String::new(),
            metadata: CaseMetadata::default(),
            opinions: vec![Opinion::new(OpinionKind::HeadMatter)],
        }
    }

    /// Iterate over every paragraph of the case, footnotes included.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.opinions.iter().flat_map(Opinion::all_paragraphs)
    }

    /// Iterate over every referenced block id.
    pub fn block_ids(&self) -> impl Iterator<Item = &str> {
        self.paragraphs()
            .flat_map(|p| p.block_ids.iter().map(String::as_str))
    }

    /// Number of footnotes.
    pub fn footnote_count(&self) -> usize {
        self.opinions.iter().map(|o| o.footnotes.len()).sum()
    }
}

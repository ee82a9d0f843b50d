//! Canonical document → [`Case`].

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::model::{
    Case, CaseMetadata, Citation, Court, Footnote, MarkKind, Opinion, OpinionKind, Page,
    Paragraph, ParagraphKind, Token,
};
use crate::sync::{self, InlineMark, ParagraphContent};
use crate::xml::{Element, Node};

/// Location of a block: (page index, block index).
type BlockLocations = HashMap<String, (usize, usize)>;

/// A paragraph waiting for its content to be reconciled into the blocks.
struct Pending {
    paragraph_id: String,
    block_ids: Vec<String>,
    content: ParagraphContent,
    redacted: bool,
}

/// Saved state of the blocks a case rewrites.
pub(super) struct Snapshot(Vec<((usize, usize), Option<Vec<Token>>, bool)>);

impl Snapshot {
    fn take(pages: &[Page], locations: &BlockLocations, pending: &[Pending]) -> Self {
        let mut saved = Vec::new();
        for block_id in pending.iter().flat_map(|p| p.block_ids.iter()) {
            if let Some(&(p, b)) = locations.get(block_id) {
                let block = &pages[p].blocks[b];
                saved.push(((p, b), block.tokens.clone(), block.redacted));
            }
        }
        Self(saved)
    }

    /// Put the saved tokens and redaction flags back.
    pub(super) fn restore(self, pages: &mut [Page]) {
        for ((p, b), tokens, redacted) in self.0 {
            let block = &mut pages[p].blocks[b];
            block.tokens = tokens;
            block.redacted = redacted;
        }
    }
}

/// Extract a case and reconcile its paragraphs into `pages`.
///
/// Either every paragraph is reconciled or `pages` is left untouched. The
/// returned snapshot undoes a successful reconciliation.
pub(super) fn extract_case(
    root: &Element,
    case_id: &str,
    pages: &mut [Page],
) -> Result<(Case, Snapshot)> {
    if root.name != "case" {
        return Err(Error::Malformed(format!(
            "expected <case> root, found <{}>",
            root.name
        )));
    }

    let locations = locate_blocks(pages)?;
    let blockmap = read_blockmap(root)?;
    let casebody = root
        .child("casebody")
        .ok_or_else(|| Error::Malformed(format!("case {} has no <casebody>", case_id)))?;

    let mut case = Case::new(case_id);
    case.metadata = read_metadata(root)?;
    case.first_page = casebody.attr("firstpage").unwrap_or_default().to_string();
    case.last_page = casebody.attr("lastpage").unwrap_or_default().to_string();

    let mut builder = CaseBuilder {
        pages: &*pages,
        locations: &locations,
        blockmap: &blockmap,
        used: HashSet::new(),
        pending: Vec::new(),
    };

    // Head matter: everything before the first <opinion>
    let mut head_matter = Opinion::new(OpinionKind::HeadMatter);
    let mut head_nodes = Vec::new();
    let mut opinion_nodes = Vec::new();
    for node in &casebody.children {
        match node {
            Node::Element(el) if el.name == "opinion" => opinion_nodes.push(el),
            Node::Element(el) if opinion_nodes.is_empty() => head_nodes.push(el),
            Node::Element(el) => {
                return Err(Error::Malformed(format!(
                    "<{}> follows the first opinion of case {}",
                    el.name, case_id
                )))
            }
            Node::Text(_) if node.is_blank() => {}
            Node::Text(text) => {
                return Err(Error::Malformed(format!(
                    "stray text {:?} in casebody of case {}",
                    text.trim(),
                    case_id
                )))
            }
        }
    }
    builder.fill_opinion(&mut head_matter, head_nodes.into_iter(), 0)?;
    case.opinions[0] = head_matter;

    for (i, el) in opinion_nodes.into_iter().enumerate() {
        let tag = el.require("type")?;
        let kind = OpinionKind::from_tag(tag)
            .ok_or_else(|| Error::Malformed(format!("unknown opinion type {:?}", tag)))?;
        let mut opinion = Opinion::new(kind);
        let children = structural_children(el)?;
        builder.fill_opinion(&mut opinion, children.into_iter(), i + 1)?;
        case.opinions.push(opinion);
    }

    let pending = builder.pending;
    let snapshot = Snapshot::take(pages, &locations, &pending);
    for paragraph in &pending {
        if let Err(e) = reconcile(pages, &locations, paragraph) {
            snapshot.restore(pages);
            return Err(e);
        }
    }

    log::debug!(
        "Extracted case {}: {} opinions, {} paragraphs, {} footnotes",
        case.id,
        case.opinions.len(),
        pending.len(),
        case.footnote_count()
    );

    Ok((case, snapshot))
}

fn structural_children(el: &Element) -> Result<Vec<&Element>> {
    let mut out = Vec::new();
    for node in &el.children {
        match node {
            Node::Element(child) => out.push(child),
            Node::Text(_) if node.is_blank() => {}
            Node::Text(text) => {
                return Err(Error::Malformed(format!(
                    "stray text {:?} in <{}>",
                    text.trim(),
                    el.name
                )))
            }
        }
    }
    Ok(out)
}

fn locate_blocks(pages: &[Page]) -> Result<BlockLocations> {
    let mut locations = HashMap::new();
    for (p, page) in pages.iter().enumerate() {
        for (b, block) in page.blocks.iter().enumerate() {
            if locations.insert(block.id.clone(), (p, b)).is_some() {
                return Err(Error::Malformed(format!("duplicate block id {}", block.id)));
            }
        }
    }
    Ok(locations)
}

fn read_blockmap(root: &Element) -> Result<HashMap<String, Vec<String>>> {
    let mut map = HashMap::new();
    if let Some(blockmap) = root.child("blockmap") {
        for par in blockmap.children_named("par") {
            let blocks = par
                .require("blocks")?
                .split_whitespace()
                .map(str::to_string)
                .collect();
            map.insert(par.require("id")?.to_string(), blocks);
        }
    }
    Ok(map)
}

fn read_metadata(root: &Element) -> Result<CaseMetadata> {
    let mut meta = CaseMetadata::default();
    for el in root.elements() {
        match el.name.as_str() {
            "court" => {
                meta.court = Court {
                    name: el.text(),
                    abbreviation: el.attr("abbreviation").map(str::to_string),
                }
            }
            "district" => meta.district = Some(el.text()),
            "name" => {
                meta.name = el.text();
                meta.name_abbreviation = el.attr("abbreviation").map(str::to_string);
            }
            "docketnumber" => meta.docket_numbers.push(el.text()),
            "citation" => meta.citations.push(Citation {
                category: el.attr("category").map(str::to_string),
                kind: el.attr("type").map(str::to_string),
                text: el.text(),
            }),
            "decisiondate" => meta.decision_date = Some(el.text()),
            "casebody" | "blockmap" => {}
            other => {
                return Err(Error::Malformed(format!(
                    "unexpected <{}> in case metadata",
                    other
                )))
            }
        }
    }
    Ok(meta)
}

struct CaseBuilder<'a> {
    pages: &'a [Page],
    locations: &'a BlockLocations,
    blockmap: &'a HashMap<String, Vec<String>>,
    used: HashSet<String>,
    pending: Vec<Pending>,
}

impl CaseBuilder<'_> {
    fn fill_opinion<'e>(
        &mut self,
        opinion: &mut Opinion,
        children: impl Iterator<Item = &'e Element>,
        opinion_index: usize,
    ) -> Result<()> {
        for el in children {
            if el.name == "footnote" {
                let id = Footnote::make_id(opinion_index, opinion.footnotes.len() + 1);
                let footnote = self.footnote(el, id)?;
                opinion.footnotes.push(footnote);
            } else if !opinion.footnotes.is_empty() {
                return Err(Error::Malformed(format!(
                    "<{}> follows a footnote in {} opinion",
                    el.name, opinion.kind
                )));
            } else {
                let paragraph = self.paragraph(el, false)?;
                opinion.paragraphs.push(paragraph);
            }
        }
        Ok(())
    }

    fn footnote(&mut self, el: &Element, id: String) -> Result<Footnote> {
        let redacted = el.attr("redact") == Some("true");
        let mut paragraphs = Vec::new();
        for child in structural_children(el)? {
            paragraphs.push(self.paragraph(child, redacted)?);
        }
        Ok(Footnote {
            id,
            label: el.attr("label").map(str::to_string),
            orphan: el.attr("orphan") == Some("true"),
            redacted,
            paragraphs,
        })
    }

    fn paragraph(&mut self, el: &Element, inherited_redaction: bool) -> Result<Paragraph> {
        let kind = ParagraphKind::from_tag(&el.name)
            .ok_or_else(|| Error::Malformed(format!("<{}> is not a paragraph", el.name)))?;
        let id = el.require("id")?.to_string();

        let block_ids = self
            .blockmap
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::MissingReference(format!("blockmap entry for paragraph {}", id)))?;
        for block_id in &block_ids {
            if !self.locations.contains_key(block_id) {
                return Err(Error::MissingReference(format!(
                    "block {} of paragraph {}",
                    block_id, id
                )));
            }
            if !self.used.insert(block_id.clone()) {
                return Err(Error::Malformed(format!(
                    "block {} belongs to more than one paragraph",
                    block_id
                )));
            }
        }

        let content = self.paragraph_content(el, &id, &block_ids)?;
        let mut paragraph = Paragraph::new(id, kind, block_ids);
        paragraph.redacted = el.attr("redact") == Some("true");

        self.pending.push(Pending {
            paragraph_id: paragraph.id.clone(),
            block_ids: paragraph.block_ids.clone(),
            content,
            redacted: paragraph.redacted || inherited_redaction,
        });

        Ok(paragraph)
    }

    fn paragraph_content(
        &self,
        el: &Element,
        id: &str,
        block_ids: &[String],
    ) -> Result<ParagraphContent> {
        let mut content = ParagraphContent::default();
        let mut len = 0;

        for node in &el.children {
            match node {
                Node::Text(text) => {
                    content.text.push_str(text);
                    len += text.chars().count();
                }
                Node::Element(child) => {
                    if let Some(kind) = MarkKind::from_tag(&child.name) {
                        let text = child.text();
                        let start = len;
                        len += text.chars().count();
                        content.text.push_str(&text);
                        content.marks.push(InlineMark {
                            kind,
                            range: start..len,
                        });
                    } else if child.name == "img" {
                        let block = child.require("block")?;
                        let is_illustration = block_ids.iter().any(|b| b == block)
                            && self.block(block).is_some_and(|b| b.is_illustration());
                        if !is_illustration {
                            return Err(Error::MissingReference(format!(
                                "illustration {} of paragraph {}",
                                block, id
                            )));
                        }
                    } else {
                        return Err(Error::Malformed(format!(
                            "unexpected <{}> in paragraph {}",
                            child.name, id
                        )));
                    }
                }
            }
        }

        Ok(content)
    }

    fn block(&self, id: &str) -> Option<&crate::model::Block> {
        let (p, b) = self.locations.get(id)?;
        self.pages.get(*p)?.blocks.get(*b)
    }
}

/// Move the paragraph's text blocks out of their pages, synchronize them with
/// the canonical content, and put them back.
fn reconcile(pages: &mut [Page], locations: &BlockLocations, pending: &Pending) -> Result<()> {
    let mut slots: Vec<(usize, usize)> = Vec::new();
    let mut streams: Vec<Vec<Token>> = Vec::new();

    for block_id in &pending.block_ids {
        let Some(&(p, b)) = locations.get(block_id) else {
            continue;
        };
        let block = &mut pages[p].blocks[b];
        if pending.redacted {
            block.redacted = true;
        }
        if let Some(tokens) = block.tokens.take() {
            slots.push((p, b));
            streams.push(tokens);
        }
    }

    sync::join_blocks(&mut streams);
    let result = sync::sync_content(&mut streams, &pending.content);

    for ((p, b), tokens) in slots.into_iter().zip(streams) {
        pages[p].blocks[b].tokens = Some(tokens);
    }

    match result {
        Ok(report) => {
            if !report.is_noop() {
                log::debug!(
                    "Paragraph {}: {} edits, {} marks",
                    pending.paragraph_id,
                    report.edits,
                    report.marks
                );
            }
            Ok(())
        }
        Err(Error::UnsupportedEdit(msg)) => Err(Error::UnsupportedEdit(format!(
            "paragraph {}: {}",
            pending.paragraph_id, msg
        ))),
        Err(e) => Err(e),
    }
}

//! Token-stream archive of a processed volume.
//!
//! An archive is a gzip stream holding four newline-terminated JSON documents
//! in order: volume metadata, pages, cases and the font registry. Binary
//! fields are base64 strings.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{validate_tokens, Token, Volume, VolumeIndex};

/// Write a volume archive.
pub fn write_archive<W: Write>(volume: &Volume, writer: W) -> Result<()> {
    let mut encoder = GzEncoder::new(writer, Compression::default());
    write_document(&mut encoder, &volume.metadata)?;
    write_document(&mut encoder, &volume.pages)?;
    write_document(&mut encoder, &volume.cases)?;
    write_document(&mut encoder, &volume.fonts)?;
    encoder.finish()?;

    log::debug!(
        "Archived volume {}: {} pages, {} cases, {} fonts",
        volume.metadata.barcode,
        volume.pages.len(),
        volume.cases.len(),
        volume.fonts.len()
    );
    Ok(())
}

fn write_document<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Read a volume archive.
///
/// Token streams are checked for balance and every page style must resolve in
/// the archived font registry.
pub fn read_archive<R: Read>(reader: R) -> Result<Volume> {
    let mut lines = BufReader::new(GzDecoder::new(reader)).lines();
    let mut next = |name: &str| -> Result<String> {
        match lines.next() {
            Some(line) => Ok(line?),
            None => Err(Error::Archive(format!("missing {} document", name))),
        }
    };

    let metadata = parse_document(&next("metadata")?, "metadata")?;
    let pages = parse_document(&next("pages")?, "pages")?;
    let cases = parse_document(&next("cases")?, "cases")?;
    let fonts = parse_document(&next("fonts")?, "fonts")?;

    for line in lines {
        if !line?.trim().is_empty() {
            return Err(Error::Archive("trailing data after fonts document".to_string()));
        }
    }

    let volume = Volume {
        metadata,
        pages,
        cases,
        fonts,
    };
    check(&volume)?;
    Ok(volume)
}

fn parse_document<T: DeserializeOwned>(line: &str, name: &str) -> Result<T> {
    serde_json::from_str(line).map_err(|e| Error::Archive(format!("{} document: {}", name, e)))
}

fn check(volume: &Volume) -> Result<()> {
    let index = VolumeIndex::new(&volume.pages)?;
    for page in &volume.pages {
        for style in &page.styles {
            volume.fonts.resolve(style.font)?;
        }
        for block in &page.blocks {
            let Some(tokens) = &block.tokens else {
                continue;
            };
            let invalid = |e: Error| Error::Archive(format!("block {}: {}", block.id, e));
            validate_tokens(tokens).map_err(invalid)?;
            for token in tokens {
                if let Token::FontStart(font) = token {
                    volume.fonts.resolve(*font).map_err(invalid)?;
                }
            }
        }
    }
    for case in &volume.cases {
        for id in case.block_ids() {
            index
                .resolve(id)
                .map_err(|e| Error::Archive(format!("case {}: {}", case.id, e)))?;
        }
    }
    Ok(())
}

/// Write a volume archive to a file.
pub fn save_archive<P: AsRef<Path>>(volume: &Volume, path: P) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_archive(volume, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Read a volume archive from a file.
pub fn load_archive<P: AsRef<Path>>(path: P) -> Result<Volume> {
    let file = File::open(path)?;
    read_archive(BufReader::new(file))
}

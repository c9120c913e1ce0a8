//! Listing, symbol dump and hex image writers.

use std::io::{self, Write};

use crate::assembler::{ListingRecord, ListingSink};
use crate::memory::MemoryImage;
use crate::symbols::SymbolTable;

/// `aaaa  wwww wwww            text`
pub fn format_listing_line(addr: u32, words: &[u16], text: &str) -> String {
    let words = words
        .iter()
        .map(|w| format!("{w:04x}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{:04x}  {:<20}  {}", addr & 0xFFFF, words, text.trim_end())
}

/// Streams formatted listing lines to a writer.
pub struct ListingWriter<W: Write> {
    out: W,
}

impl<W: Write> ListingWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ListingSink for ListingWriter<W> {
    fn record(&mut self, rec: &ListingRecord<'_>) -> io::Result<()> {
        writeln!(
            self.out,
            "{}",
            format_listing_line(rec.addr, rec.words, &rec.line.text)
        )
    }
}

/// Owned copy of a listing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLine {
    pub addr: u16,
    pub words: Vec<u16>,
    pub number: usize,
    pub text: String,
}

impl ListingSink for Vec<ListingLine> {
    fn record(&mut self, rec: &ListingRecord<'_>) -> io::Result<()> {
        self.push(ListingLine {
            addr: (rec.addr & 0xFFFF) as u16,
            words: rec.words.to_vec(),
            number: rec.line.number,
            text: rec.line.text.clone(),
        });
        Ok(())
    }
}

pub fn write_symbol_table<W: Write>(out: &mut W, symbols: &SymbolTable) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Symbol Table:")?;
    for (name, value) in symbols.listed() {
        writeln!(out, "{name:<20} {value:04x}")?;
    }
    Ok(())
}

/// Whole image as hex text, `words_per_line` words per line.
pub fn write_image<W: Write>(
    out: &mut W,
    image: &MemoryImage,
    words_per_line: usize,
) -> io::Result<()> {
    for chunk in image.words().chunks(words_per_line.max(1)) {
        let line = chunk
            .iter()
            .map(|w| format!("{w:04x}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{line}")?;
    }
    Ok(())
}

pub fn write_symbols_json<W: Write>(out: W, symbols: &SymbolTable) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(out, &symbols.export())
}

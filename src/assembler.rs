//! Two-pass directive and instruction processing.
//!
//! Pass A (`Pass::Sizing`) walks the macro-expanded stream binding labels and
//! advancing the location counter. Pass B (`Pass::Emit`) walks it again with
//! the symbol table from pass A, evaluates operands, writes words into the
//! image and reports one listing record per line.

use tracing::{debug, trace};

use crate::config::{AsmConfig, SizingMode};
use crate::encoder::{encode, encoded_len, opcode_slot};
use crate::error::AsmError;
use crate::expr::{eval_word, is_identifier, EvalError};
use crate::line::{parse_line, ParsedLine};
use crate::macros::{preprocess, SourceLine};
use crate::memory::MemoryImage;
use crate::symbols::SymbolTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Sizing,
    Emit,
}

/// One line of pass B output.
#[derive(Debug, Clone, Copy)]
pub struct ListingRecord<'a> {
    /// Location counter before the line.
    pub addr: u32,
    pub words: &'a [u16],
    pub line: &'a SourceLine,
}

/// Receives listing records as pass B produces them.
pub trait ListingSink {
    fn record(&mut self, rec: &ListingRecord<'_>) -> std::io::Result<()>;
}

/// Drops every record.
pub struct NoListing;

impl ListingSink for NoListing {
    fn record(&mut self, _rec: &ListingRecord<'_>) -> std::io::Result<()> {
        Ok(())
    }
}

/// Result of a successful run.
#[derive(Debug)]
pub struct Assembly {
    pub symbols: SymbolTable,
    pub image: MemoryImage,
}

pub struct Assembler {
    config: AsmConfig,
    symbols: SymbolTable,
    image: MemoryImage,
    /// Location counter. Unbounded here, masked when written or bound.
    lc: u32,
}

impl Assembler {
    pub fn new(config: AsmConfig) -> Self {
        Self {
            config,
            symbols: SymbolTable::new(),
            image: MemoryImage::new(),
            lc: 0,
        }
    }

    pub fn assemble<S: ListingSink>(
        mut self,
        source: &str,
        sink: &mut S,
    ) -> Result<Assembly, AsmError> {
        let (stream, macros) = preprocess(source)?;
        debug!(lines = stream.len(), macros = macros.len(), "preprocessed");

        for pass in [Pass::Sizing, Pass::Emit] {
            self.run_pass(pass, &stream, sink)?;
        }
        Ok(Assembly {
            symbols: self.symbols,
            image: self.image,
        })
    }

    fn run_pass<S: ListingSink>(
        &mut self,
        pass: Pass,
        stream: &[SourceLine],
        sink: &mut S,
    ) -> Result<(), AsmError> {
        self.lc = 0;
        for line in stream {
            let addr = self.lc;
            let words = self.process(pass, line)?;
            if pass == Pass::Emit {
                sink.record(&ListingRecord { addr, words: &words, line })?;
            }
        }
        debug!(
            ?pass,
            end = self.lc,
            symbols = self.symbols.user_symbols().count(),
            "pass complete"
        );
        Ok(())
    }

    /// Handle one line; returns the words it emitted (always empty in pass A).
    fn process(&mut self, pass: Pass, line: &SourceLine) -> Result<Vec<u16>, AsmError> {
        let parsed = parse_line(&line.text);
        trace!(line = line.number, lc = self.lc, text = %line.text, "processing");

        if let Some(label) = parsed.label {
            self.symbols.define(label, self.lc);
        }
        let Some(mnemonic) = parsed.mnemonic else {
            return Ok(Vec::new());
        };

        match mnemonic {
            "EQU" => {
                // With a label only the label binding above happens.
                if parsed.label.is_none() {
                    let name = parsed.operands[0];
                    let expr = parsed.operands.get(1).copied().unwrap_or("");
                    self.define_constant(line, name, expr)?;
                }
                Ok(Vec::new())
            }
            "ORG" => {
                self.lc = u32::from(self.eval(line, parsed.operand_text)?);
                Ok(Vec::new())
            }
            "WORD" => match pass {
                Pass::Sizing => {
                    self.lc += parsed.operands.len() as u32;
                    Ok(Vec::new())
                }
                Pass::Emit => {
                    let words = parsed
                        .operands
                        .iter()
                        .map(|op| self.eval(line, op))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(self.emit(words))
                }
            },
            "STRING" | "BSTRING" => {
                let words = string_words(parsed.operand_text, mnemonic == "BSTRING");
                match pass {
                    Pass::Sizing => {
                        self.lc += words.len() as u32;
                        Ok(Vec::new())
                    }
                    Pass::Emit => Ok(self.emit(words)),
                }
            }
            _ => {
                if let Some(slot) = opcode_slot(mnemonic) {
                    return self.instruction(pass, line, &parsed, slot);
                }
                // `name EQU expr`; like `EQU name, expr`, a label takes the
                // binding instead.
                if let Some(expr) = equ_suffix(parsed.operand_text) {
                    if parsed.label.is_none() {
                        self.define_constant(line, mnemonic, expr)?;
                    }
                    return Ok(Vec::new());
                }
                Err(AsmError::UnknownInstruction {
                    line: line.number,
                    mnemonic: mnemonic.to_string(),
                })
            }
        }
    }

    fn instruction(
        &mut self,
        pass: Pass,
        line: &SourceLine,
        parsed: &ParsedLine<'_>,
        slot: usize,
    ) -> Result<Vec<u16>, AsmError> {
        let count = parsed.operands.len();
        if count > 3 {
            return Err(AsmError::OperandCount {
                line: line.number,
                mnemonic: parsed.mnemonic.unwrap_or_default().to_string(),
                count,
            });
        }
        match pass {
            Pass::Sizing => {
                let size = match self.config.sizing {
                    SizingMode::Compatible => count - 1,
                    SizingMode::Exact => encoded_len(count),
                };
                self.lc += size as u32;
                Ok(Vec::new())
            }
            Pass::Emit => {
                let values = parsed
                    .operands
                    .iter()
                    .map(|op| self.eval(line, op))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.emit(encode(parsed.predicate, slot, &values)))
            }
        }
    }

    fn define_constant(&mut self, line: &SourceLine, name: &str, expr: &str) -> Result<(), AsmError> {
        if !is_identifier(name) {
            return Err(eval_error(line, EvalError::NotAName(name.to_string())));
        }
        let value = self.eval(line, expr)?;
        self.symbols.define(name, u32::from(value));
        Ok(())
    }

    fn eval(&self, line: &SourceLine, expr: &str) -> Result<u16, AsmError> {
        eval_word(expr, &self.symbols).map_err(|e| eval_error(line, e))
    }

    fn emit(&mut self, words: Vec<u16>) -> Vec<u16> {
        self.image.write(self.lc, &words);
        self.lc += words.len() as u32;
        words
    }
}

fn eval_error(line: &SourceLine, source: EvalError) -> AsmError {
    AsmError::Eval {
        line: line.number,
        text: line.text.trim_end().to_string(),
        source,
    }
}

/// `EQU expr` with `EQU` as a whole word.
fn equ_suffix(operand_text: &str) -> Option<&str> {
    let rest = operand_text.strip_prefix("EQU")?;
    rest.starts_with(char::is_whitespace).then(|| rest.trim())
}

/// Words for `STRING` (one char per word, low byte) or `BSTRING` (two chars
/// per word, first in the low byte). Both end with a NUL; `BSTRING` pads the
/// NUL-terminated text to an even length.
pub fn string_words(operand_text: &str, packed: bool) -> Vec<u16> {
    let text = operand_text.trim().trim_matches('"');
    let mut bytes: Vec<u16> = text.chars().map(|c| (c as u32 & 0xFF) as u16).collect();
    bytes.push(0);
    if !packed {
        return bytes;
    }
    if bytes.len() % 2 == 1 {
        bytes.push(0);
    }
    bytes.chunks(2).map(|pair| pair[0] | (pair[1] << 8)).collect()
}

/// Assemble `source` without a listing.
pub fn assemble(source: &str, config: AsmConfig) -> Result<Assembly, AsmError> {
    Assembler::new(config).assemble(source, &mut NoListing)
}

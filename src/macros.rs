//! Macro collection and textual expansion.
//!
//! Definitions look like
//!
//! ```text
//! MACRO push(reg, sp)
//!     sto reg, sp
//!     sub sp, r0, 1
//! ENDMACRO
//! ```
//!
//! and are invoked as `[label:] push(r3, r14)`. Parameters are replaced by
//! plain substring substitution, so a parameter named `a` also rewrites the
//! `a` inside `add`. Keep parameter names distinctive.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::AsmError;
use crate::line::{split_label, strip_comment, word_len};

/// Invocations nested deeper than this are reported as runaway recursion.
pub const MAX_EXPANSION_DEPTH: usize = 64;

/// A line of the expansion stream and the source line it came from (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<String>,
}

pub type MacroTable = HashMap<String, MacroDef>;

struct Invocation<'a> {
    label: Option<&'a str>,
    name: &'a str,
    args: &'a str,
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',').map(|x| x.trim().to_string()).collect()
}

/// `name (` ... last `)`; returns the name and the text between the parens.
fn name_and_parens(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    let n = word_len(s);
    let rest = s[n..].trim_start().strip_prefix('(')?;
    let close = rest.rfind(')')?;
    Some((&s[..n], &rest[..close]))
}

fn match_invocation(line: &str) -> Option<Invocation<'_>> {
    let (label, rest) = split_label(strip_comment(line));
    let (name, args) = name_and_parens(rest)?;
    if name.is_empty() {
        return None;
    }
    Some(Invocation { label, name, args })
}

/// Case-insensitive `keyword` at the start of the line, after optional
/// whitespace. Returns the remainder.
fn keyword<'a>(line: &'a str, kw: &str) -> Option<&'a str> {
    let t = line.trim_start();
    let head = t.get(..kw.len())?;
    head.eq_ignore_ascii_case(kw).then(|| &t[kw.len()..])
}

/// `MACRO name(params)`.
fn match_definition(line: &str) -> Option<(String, Vec<String>)> {
    let rest = keyword(line, "MACRO")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (name, params) = name_and_parens(rest)?;
    Some((name.to_string(), split_list(params)))
}

fn is_definition_end(line: &str) -> bool {
    keyword(line, "ENDMACRO").is_some()
}

/// Expand one line. Lines that are not invocations of a known macro come
/// back unchanged as a single entry.
pub fn expand_line(line: &str, macros: &MacroTable) -> Result<Vec<String>, AsmError> {
    let mut out = Vec::new();
    expand_into(line, macros, 0, &mut out)?;
    Ok(out)
}

fn expand_into(
    line: &str,
    macros: &MacroTable,
    depth: usize,
    out: &mut Vec<String>,
) -> Result<(), AsmError> {
    let Some((inv, def)) = match_invocation(line).and_then(|inv| {
        let def = macros.get(inv.name)?;
        Some((inv, def))
    }) else {
        out.push(line.to_string());
        return Ok(());
    };
    if depth >= MAX_EXPANSION_DEPTH {
        return Err(AsmError::MacroRecursion {
            name: def.name.clone(),
            depth: MAX_EXPANSION_DEPTH,
        });
    }
    trace!(macro_name = %def.name, depth, "expanding");

    out.push(format!("#{line}"));
    if let Some(label) = inv.label {
        out.push(format!("{label}:"));
    }
    let args = split_list(inv.args);
    for body_line in &def.body {
        let mut text = body_line.clone();
        for (param, arg) in def.params.iter().zip(&args) {
            if !param.is_empty() {
                text = text.replace(param.as_str(), arg);
            }
        }
        expand_into(&text, macros, depth + 1, out)?;
    }
    Ok(())
}

/// Collect macro definitions and expand invocations in a single sweep.
///
/// Definition lines and bodies are turned into `#` comments in the returned
/// stream, so they only ever run through an invocation. A macro is visible
/// from its `MACRO` line onwards; redefining a name replaces it.
pub fn preprocess(source: &str) -> Result<(Vec<SourceLine>, MacroTable), AsmError> {
    let mut macros = MacroTable::new();
    let mut open: Option<String> = None;
    let mut stream = Vec::new();

    for (idx, line) in source.lines().enumerate() {
        let number = idx + 1;
        if let Some((name, params)) = match_definition(line) {
            macros.insert(
                name.clone(),
                MacroDef { name: name.clone(), params, body: Vec::new() },
            );
            open = Some(name);
            stream.push(SourceLine { number, text: format!("# {line}") });
        } else if is_definition_end(line) {
            if let Some(def) = open.take().and_then(|name| macros.get(&name)) {
                debug!(macro_name = %def.name, params = ?def.params, lines = def.body.len(), "macro defined");
            }
            stream.push(SourceLine { number, text: format!("# {line}") });
        } else if let Some(def) = open.as_ref().and_then(|name| macros.get_mut(name)) {
            def.body.push(line.to_string());
            stream.push(SourceLine { number, text: format!("# {line}") });
        } else {
            for text in expand_line(line, &macros)? {
                stream.push(SourceLine { number, text });
            }
        }
    }
    Ok((stream, macros))
}

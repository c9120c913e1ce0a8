use crate::encoder::Predicate;

/// One assembled line split into its fields. Operand texts are trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine<'a> {
    pub label: Option<&'a str>,
    pub predicate: Predicate,
    pub mnemonic: Option<&'a str>,
    /// Everything after the mnemonic, trimmed.
    pub operand_text: &'a str,
    /// `operand_text` split on `,`. Never empty: no operands is `[""]`.
    pub operands: Vec<&'a str>,
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Length in bytes of the leading run of word characters.
pub(crate) fn word_len(s: &str) -> usize {
    s.find(|c: char| !is_word_char(c)).unwrap_or(s.len())
}

/// Drop a trailing `#` comment. A `#` inside double quotes is kept.
pub fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Split a leading `name:` off `s` (after optional whitespace).
pub(crate) fn split_label(s: &str) -> (Option<&str>, &str) {
    let t = s.trim_start();
    let n = word_len(t);
    if n > 0 && t[n..].starts_with(':') {
        (Some(&t[..n]), &t[n + 1..])
    } else {
        (None, s)
    }
}

pub fn parse_line(line: &str) -> ParsedLine<'_> {
    let code = strip_comment(line);
    let (label, rest) = split_label(code);
    let rest = rest.trim_start();

    // `pred.` prefix; an empty predicate before the dot also means always.
    let (predicate, rest) = match rest.find('.') {
        Some(dot) => match Predicate::from_token(&rest[..dot]) {
            Some(p) => (p, &rest[dot + 1..]),
            None => (Predicate::Always, rest),
        },
        None => (Predicate::Always, rest),
    };

    let n = word_len(rest);
    let mnemonic = (n > 0).then(|| &rest[..n]);
    let operand_text = rest[n..].trim();
    let operands = operand_text.split(',').map(str::trim).collect();

    ParsedLine { label, predicate, mnemonic, operand_text, operands }
}

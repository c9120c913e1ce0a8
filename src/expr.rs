//! Operand expression evaluator.
//!
//! Integer-only recursive descent over `i64` with checked arithmetic.
//! Precedence (lowest to highest):
//!  1. `|`
//!  2. `^`
//!  3. `&`
//!  4. `<<` `>>`
//!  5. `+` `-`
//!  6. `*` `//` `%`     (division and modulo round toward negative infinity;
//!                        a lone `/` is rejected)
//!  7. unary `-` `+` `~`
//!  8. `**`              (right-associative; `-2**2 == -4`)
//!  9. literals, symbols, `(expr)`

use crate::symbols::SymbolTable;

/// Nested unary operators and parentheses allowed in one expression.
pub const MAX_NESTING: usize = 200;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("bad numeric literal {0:?}")]
    BadLiteral(String),
    #[error("undefined symbol {0}")]
    UnknownSymbol(String),
    #[error("division by zero")]
    DivideByZero,
    #[error("negative shift count")]
    NegativeShift,
    #[error("negative exponent")]
    NegativeExponent,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("{0:?} is not a symbol name")]
    NotAName(String),
    #[error("expression nested deeper than {MAX_NESTING} levels")]
    TooDeep,
    #[error("`/` is not integer division, use `//`")]
    TrueDivision,
}

/// Evaluate `expr` against `symbols`, unmasked.
pub fn eval(expr: &str, symbols: &SymbolTable) -> Result<i64, EvalError> {
    let mut p = Parser { src: expr.as_bytes(), pos: 0, depth: 0, symbols };
    p.skip_ws();
    if p.at_end() {
        return Err(EvalError::Empty);
    }
    let v = p.parse_or()?;
    p.skip_ws();
    match p.peek() {
        None => Ok(v),
        Some(_) => Err(p.unexpected()),
    }
}

/// Evaluate and mask to a 16-bit machine word.
pub fn eval_word(expr: &str, symbols: &SymbolTable) -> Result<u16, EvalError> {
    Ok((eval(expr, symbols)? & 0xFFFF) as u16)
}

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    depth: usize,
    symbols: &'a SymbolTable,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> EvalError {
        // Offsets index bytes; report the char that starts there.
        let rest = String::from_utf8_lossy(&self.src[self.pos..]);
        match rest.chars().next() {
            Some(found) => EvalError::UnexpectedChar { found, offset: self.pos },
            None => EvalError::UnexpectedEnd,
        }
    }

    /// Consume a one-char operator `c` unless it is the first half of `cc`.
    fn eat_single(&mut self, c: u8) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) && self.peek2() != Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_double(&mut self, c: u8) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) && self.peek2() == Some(c) {
            self.pos += 2;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<i64, EvalError> {
        let mut v = self.parse_xor()?;
        while self.eat_single(b'|') {
            v |= self.parse_xor()?;
        }
        Ok(v)
    }

    fn parse_xor(&mut self) -> Result<i64, EvalError> {
        let mut v = self.parse_and()?;
        while self.eat_single(b'^') {
            v ^= self.parse_and()?;
        }
        Ok(v)
    }

    fn parse_and(&mut self) -> Result<i64, EvalError> {
        let mut v = self.parse_shift()?;
        while self.eat_single(b'&') {
            v &= self.parse_shift()?;
        }
        Ok(v)
    }

    fn parse_shift(&mut self) -> Result<i64, EvalError> {
        let mut v = self.parse_additive()?;
        loop {
            if self.eat_double(b'<') {
                v = shl(v, self.parse_additive()?)?;
            } else if self.eat_double(b'>') {
                v = shr(v, self.parse_additive()?)?;
            } else {
                return Ok(v);
            }
        }
    }

    fn parse_additive(&mut self) -> Result<i64, EvalError> {
        let mut v = self.parse_multiplicative()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    let r = self.parse_multiplicative()?;
                    v = v.checked_add(r).ok_or(EvalError::Overflow)?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    let r = self.parse_multiplicative()?;
                    v = v.checked_sub(r).ok_or(EvalError::Overflow)?;
                }
                _ => return Ok(v),
            }
        }
    }

    fn parse_multiplicative(&mut self) -> Result<i64, EvalError> {
        let mut v = self.parse_unary()?;
        loop {
            if self.eat_single(b'*') {
                let r = self.parse_unary()?;
                v = v.checked_mul(r).ok_or(EvalError::Overflow)?;
            } else if self.eat_double(b'/') {
                v = floor_div(v, self.parse_unary()?)?;
            } else if self.eat_single(b'/') {
                return Err(EvalError::TrueDivision);
            } else if self.eat_single(b'%') {
                v = floor_mod(v, self.parse_unary()?)?;
            } else {
                return Ok(v);
            }
        }
    }

    /// Every parenthesis, unary operator and exponent passes through here,
    /// so bounding it bounds the recursion.
    fn parse_unary(&mut self) -> Result<i64, EvalError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(EvalError::TooDeep);
        }
        let v = self.parse_prefixed();
        self.depth -= 1;
        v
    }

    fn parse_prefixed(&mut self) -> Result<i64, EvalError> {
        self.skip_ws();
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                self.parse_unary()?.checked_neg().ok_or(EvalError::Overflow)
            }
            Some(b'+') => {
                self.pos += 1;
                self.parse_unary()
            }
            Some(b'~') => {
                self.pos += 1;
                Ok(!self.parse_unary()?)
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<i64, EvalError> {
        let base = self.parse_atom()?;
        if !self.eat_double(b'*') {
            return Ok(base);
        }
        let exp = self.parse_unary()?;
        if exp < 0 {
            return Err(EvalError::NegativeExponent);
        }
        let exp = u32::try_from(exp).map_err(|_| EvalError::Overflow)?;
        base.checked_pow(exp).ok_or(EvalError::Overflow)
    }

    fn parse_atom(&mut self) -> Result<i64, EvalError> {
        self.skip_ws();
        let Some(c) = self.peek() else {
            return Err(EvalError::UnexpectedEnd);
        };
        if c == b'(' {
            self.pos += 1;
            let v = self.parse_or()?;
            self.skip_ws();
            return match self.peek() {
                Some(b')') => {
                    self.pos += 1;
                    Ok(v)
                }
                _ => Err(self.unexpected()),
            };
        }
        if c.is_ascii_digit() {
            let tok = self.take_word();
            return parse_literal(tok);
        }
        if c.is_ascii_alphabetic() || c == b'_' {
            let name = self.take_word();
            return self
                .symbols
                .get(name)
                .map(i64::from)
                .ok_or_else(|| EvalError::UnknownSymbol(name.to_string()));
        }
        Err(self.unexpected())
    }

    fn take_word(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        // Only ASCII bytes were consumed.
        std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default()
    }
}

fn parse_literal(tok: &str) -> Result<i64, EvalError> {
    let bad = || EvalError::BadLiteral(tok.to_string());
    let lower = tok.to_ascii_lowercase();
    let (digits, radix) = if let Some(d) = lower.strip_prefix("0x") {
        (d, 16)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (d, 8)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (d, 2)
    } else {
        (lower.as_str(), 10)
    };
    let digits: String = digits.chars().filter(|&c| c != '_').collect();
    if digits.is_empty() {
        return Err(bad());
    }
    // `010` is ambiguous; only an all-zero decimal may start with 0.
    if radix == 10 && digits.len() > 1 && digits.starts_with('0') && digits.bytes().any(|b| b != b'0') {
        return Err(bad());
    }
    i64::from_str_radix(&digits, radix).map_err(|_| bad())
}

fn shl(v: i64, n: i64) -> Result<i64, EvalError> {
    if n < 0 {
        return Err(EvalError::NegativeShift);
    }
    if v == 0 {
        return Ok(0);
    }
    if n >= 63 {
        return Err(EvalError::Overflow);
    }
    let r = v << n;
    if r >> n != v {
        return Err(EvalError::Overflow);
    }
    Ok(r)
}

fn shr(v: i64, n: i64) -> Result<i64, EvalError> {
    if n < 0 {
        return Err(EvalError::NegativeShift);
    }
    Ok(if n >= 64 { v >> 63 } else { v >> n })
}

fn floor_div(a: i64, b: i64) -> Result<i64, EvalError> {
    if b == 0 {
        return Err(EvalError::DivideByZero);
    }
    let q = a.checked_div(b).ok_or(EvalError::Overflow)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

fn floor_mod(a: i64, b: i64) -> Result<i64, EvalError> {
    if b == 0 {
        return Err(EvalError::DivideByZero);
    }
    let r = a.checked_rem(b).ok_or(EvalError::Overflow)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

use tracing::warn;

/// Opcode table. A mnemonic's opcode is its slot modulo 16, which folds the
/// aliases `halt` (slot 16) onto `mov` and `rti` (slot 31) onto `psr`.
pub const OPCODES: [&str; 32] = [
    "mov", "and", "or", "xor", "add", "adc", "sto", "ld", //
    "ror", "not", "sub", "sbc", "cmp", "cmpc", "bswp", "psr", //
    "halt", "", "", "", "", "", "", "", //
    "", "", "", "", "", "", "", "rti",
];

pub const PREDICATE_SHIFT: u16 = 13;
pub const IMMEDIATE_FLAG: u16 = 1 << 12;
pub const OPCODE_SHIFT: u16 = 8;
pub const SOURCE_SHIFT: u16 = 4;

/// 3-bit execution condition carried in bits 15..13.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Predicate {
    #[default]
    Always = 0,
    Never = 1,
    Zero = 2,
    NotZero = 3,
    Carry = 4,
    NotCarry = 5,
    Negative = 6,
    Positive = 7,
}

impl Predicate {
    /// Source spelling, e.g. `nz` in `nz.add`. An empty token means always.
    pub fn from_token(tok: &str) -> Option<Self> {
        Some(match tok {
            "" | "1" => Predicate::Always,
            "0" => Predicate::Never,
            "z" => Predicate::Zero,
            "nz" => Predicate::NotZero,
            "c" => Predicate::Carry,
            "nc" => Predicate::NotCarry,
            "mi" => Predicate::Negative,
            "pl" => Predicate::Positive,
            _ => return None,
        })
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Table slot of a real instruction mnemonic.
pub fn opcode_slot(mnemonic: &str) -> Option<usize> {
    if mnemonic.is_empty() {
        return None;
    }
    OPCODES.iter().position(|&m| m == mnemonic)
}

/// Words an instruction with `operands` operands occupies once encoded.
pub fn encoded_len(operands: usize) -> usize {
    if operands == 3 {
        2
    } else {
        1
    }
}

/// Pack one instruction. `operands` is `[dst]`, `[dst, src]` or
/// `[dst, src, imm]`; the immediate follows the instruction word verbatim.
pub fn encode(predicate: Predicate, slot: usize, operands: &[u16]) -> Vec<u16> {
    debug_assert!((1..=3).contains(&operands.len()));
    let dst = operands.first().copied().unwrap_or(0);
    let src = operands.get(1).copied().unwrap_or(0);
    let imm = operands.get(2).copied();

    if dst > 0xF || src > 0xF {
        warn!(
            dst,
            src,
            mnemonic = OPCODES[slot],
            "register field wider than 4 bits, truncating"
        );
    }

    let mut word = predicate.code() << PREDICATE_SHIFT;
    if imm.is_some() {
        word |= IMMEDIATE_FLAG;
    }
    word |= ((slot & 0xF) as u16) << OPCODE_SHIFT;
    word |= (src & 0xF) << SOURCE_SHIFT;
    word |= dst & 0xF;

    let mut out = vec![word];
    out.extend(imm);
    out
}

use crate::expr::EvalError;

/// Fatal assembly errors. Any of these aborts the run before an image is written.
#[derive(thiserror::Error, Debug)]
pub enum AsmError {
    #[error("illegal register name or expression, or undefined symbol at line {line}: {text}")]
    Eval {
        line: usize,
        text: String,
        #[source]
        source: EvalError,
    },
    #[error("unrecognized instruction {mnemonic} at line {line}")]
    UnknownInstruction { line: usize, mnemonic: String },
    #[error("{mnemonic} takes at most 3 operands, found {count} at line {line}")]
    OperandCount {
        line: usize,
        mnemonic: String,
        count: usize,
    },
    #[error("macro {name} expands recursively beyond {depth} levels")]
    MacroRecursion { name: String, depth: usize },
    #[error("listing output failed: {0}")]
    Io(#[from] std::io::Error),
}

pub mod assembler;
pub mod config;
pub mod encoder;
pub mod error;
pub mod expr;
pub mod line;
pub mod macros;
pub mod memory;
pub mod output;
pub mod symbols;

pub use assembler::{assemble, Assembler, Assembly, ListingRecord, ListingSink, NoListing};
pub use config::{AsmConfig, SizingMode};
pub use error::AsmError;
pub use expr::EvalError;
pub use memory::MemoryImage;
pub use symbols::SymbolTable;

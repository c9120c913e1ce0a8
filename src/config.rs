use serde::{Deserialize, Serialize};

/// How pass A sizes real instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizingMode {
    /// Advance by operand count - 1. One-operand instructions are sized as
    /// zero words although they emit one, so a label after one resolves a
    /// word early for any forward reference. Matches existing binaries.
    #[default]
    Compatible,
    /// Advance by the number of words the encoder emits.
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsmConfig {
    pub sizing: SizingMode,
    /// Words per line in the hex image.
    pub words_per_line: usize,
}

impl Default for AsmConfig {
    fn default() -> Self {
        Self {
            sizing: SizingMode::Compatible,
            words_per_line: 24,
        }
    }
}

// ============================================================
// Layer 3 — Style Loss Kind
// ============================================================
// Style is matched on encoder feature statistics. Two flavours
// are supported:
//
//   Gram    — channel correlation matrices  G = F Fᵀ / (C·H·W)
//   MeanStd — per-channel mean and standard deviation
//
// The choice is stored in train_config.json, so it is serde-able.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleLossKind {
    #[default]
    Gram,
    MeanStd,
}

impl fmt::Display for StyleLossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleLossKind::Gram => write!(f, "gram"),
            StyleLossKind::MeanStd => write!(f, "mean-std"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&StyleLossKind::MeanStd).unwrap();
        assert_eq!(json, "\"mean-std\"");
        let back: StyleLossKind = serde_json::from_str("\"gram\"").unwrap();
        assert_eq!(back, StyleLossKind::Gram);
    }
}

//! Order deliverables.
//!
//! A deliverable is the text a customer sees once an order is delivered: one
//! `"product: credential"` line per purchased unit, joined with newlines.

use serde::{Deserialize, Serialize};

/// Delivered in place of a credential when a product's stock pool is empty.
pub const OUT_OF_STOCK_PLACEHOLDER: &str =
    "Estoque esgotado no momento da compra - entre em contato com o suporte para receber seu produto";

const SEPARATOR: &str = ": ";

/// One delivered unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverableLine {
    pub product: String,
    pub credential: String,
}

impl DeliverableLine {
    #[must_use]
    pub fn new(product: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            credential: credential.into(),
        }
    }

    /// Whether this unit was delivered without a credential.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.credential == OUT_OF_STOCK_PLACEHOLDER
    }
}

/// Join lines into the stored deliverable text.
#[must_use]
pub fn format_deliverable(lines: &[DeliverableLine]) -> String {
    lines
        .iter()
        .map(|l| format!("{}{SEPARATOR}{}", l.product, l.credential))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split stored deliverable text back into lines.
///
/// Product names never contain `": "` in practice; credentials may, so only
/// the first separator splits. A line without a separator is kept whole as
/// the credential (admins can type free-form deliverables).
#[must_use]
pub fn parse_deliverable(text: &str) -> Vec<DeliverableLine> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| match l.split_once(SEPARATOR) {
            Some((product, credential)) => DeliverableLine::new(product, credential),
            None => DeliverableLine::new("", l),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_joins_with_newlines() {
        let lines = vec![
            DeliverableLine::new("Netflix 30d", "user1@mail.com:pw1"),
            DeliverableLine::new("Netflix 30d", "user2@mail.com:pw2"),
        ];
        assert_eq!(
            format_deliverable(&lines),
            "Netflix 30d: user1@mail.com:pw1\nNetflix 30d: user2@mail.com:pw2"
        );
    }

    #[test]
    fn test_parse_splits_on_first_separator() {
        let parsed = parse_deliverable("Spotify: login: a | senha: b");
        assert_eq!(parsed, vec![DeliverableLine::new("Spotify", "login: a | senha: b")]);
    }

    #[test]
    fn test_parse_free_form_line() {
        let parsed = parse_deliverable("codigo-XYZ\n\n");
        assert_eq!(parsed, vec![DeliverableLine::new("", "codigo-XYZ")]);
    }

    #[test]
    fn test_placeholder_detection() {
        let line = DeliverableLine::new("Game Key", OUT_OF_STOCK_PLACEHOLDER);
        assert!(line.is_placeholder());
        assert!(!DeliverableLine::new("Game Key", "AAAA-BBBB").is_placeholder());
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_deliverable(&[]), "");
    }
}

/// Canonicalizes a raw header string for schema matching.
///
/// Lower-cases the input, strips literal `.` and `#` characters, treats
/// hyphens and underscores as whitespace, and collapses whitespace runs into
/// single spaces while trimming the ends. The same function is applied to
/// table headers and to synonym lookups so both sides agree on spelling.
///
/// The function is pure and total, and idempotent: stripping happens before
/// collapsing, so normalizing an already-normalized header is a no-op.
pub fn normalize_header(raw: &str) -> String {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .filter(|c| *c != '.' && *c != '#')
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::normalize_header;

    #[test]
    fn trims_lowercases_and_collapses() {
        assert_eq!(normalize_header("  Invoice No  "), "invoice no");
        assert_eq!(normalize_header("Unit-Price"), "unit price");
        assert_eq!(normalize_header("order__id"), "order id");
        assert_eq!(normalize_header("Qty."), "qty");
        assert_eq!(normalize_header("Invoice #"), "invoice");
    }

    #[test]
    fn mixed_separator_runs_collapse_to_one_space() {
        assert_eq!(normalize_header("sold - to"), "sold to");
        assert_eq!(normalize_header("net _ -  amount"), "net amount");
    }

    #[test]
    fn strips_punctuation_adjacent_to_spaces() {
        assert_eq!(normalize_header("a . b"), "a b");
        assert_eq!(normalize_header("inv. no."), "inv no");
    }

    #[test]
    fn is_idempotent() {
        for raw in [
            "  Invoice No  ",
            "Unit-Price",
            "a . b",
            "QTY.",
            "##",
            "",
            "   ",
            "customer__id #2",
        ] {
            let once = normalize_header(raw);
            assert_eq!(normalize_header(&once), once);
        }
    }

    #[test]
    fn empty_and_symbol_only_headers_normalize_to_empty() {
        assert_eq!(normalize_header(""), "");
        assert_eq!(normalize_header("  "), "");
        assert_eq!(normalize_header(".#"), "");
    }
}

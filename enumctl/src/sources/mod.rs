//! Concrete [`engine::SourceWorker`] implementations (§4.9, §6 Source-worker
//! contract). Each of these is a thin HTTP collaborator: it knows how to
//! talk to one passive-intelligence provider and turn whatever it gets back
//! into `DnsRequest`s tagged with the right [`engine::Tag`]; none of them
//! know anything about DNS resolution, wildcards, or the graph.

pub mod api;
pub mod archive;
pub mod cert;
pub mod scrape;

use std::collections::HashSet;

/// Pull every label-dotted hostname ending in `.{root}` (or exactly `root`)
/// out of a blob of free text (HTML, JSON, whatever), by scanning for the
/// root domain and walking left across LDH label characters. Good enough
/// for best-effort scraping without pulling in an HTML/regex dependency.
pub fn extract_subdomains(text: &str, root: &str) -> HashSet<String> {
    let root_lower = root.to_ascii_lowercase();
    let text_lower = text.to_ascii_lowercase();
    let mut found = HashSet::new();

    let mut search_from = 0;
    while let Some(rel_idx) = text_lower[search_from..].find(&root_lower) {
        let idx = search_from + rel_idx;
        let end = idx + root_lower.len();
        search_from = end;

        // Reject a partial-label match, e.g. "notexample.com" matching root "example.com".
        let boundary_ok = idx == 0
            || !is_host_char(text_lower.as_bytes()[idx - 1])
            || text_lower.as_bytes()[idx - 1] == b'.';
        if !boundary_ok {
            continue;
        }
        // Reject a trailing continuation, e.g. "example.com.evil.com".
        if text_lower.as_bytes().get(end).is_some_and(|&b| is_host_char(b)) {
            continue;
        }

        let mut start = idx;
        while start > 0 && is_host_char(text_lower.as_bytes()[start - 1]) {
            start -= 1;
        }
        let candidate = &text_lower[start..end];
        if candidate.len() <= 253 && candidate.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            found.insert(candidate.to_string());
        }
    }

    found
}

fn is_host_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_subdomains_bounded_by_non_host_characters() {
        let text = r#"{"name":"www.example.com, something, mail.example.com"}"#;
        let found = extract_subdomains(text, "example.com");
        assert!(found.contains("www.example.com"));
        assert!(found.contains("mail.example.com"));
    }

    #[test]
    fn rejects_a_domain_that_merely_shares_a_suffix() {
        let text = "notexample.com and example.com.evil.com";
        let found = extract_subdomains(text, "example.com");
        assert!(!found.contains("notexample.com"));
        assert!(!found.iter().any(|s| s.ends_with("evil.com")));
    }
}

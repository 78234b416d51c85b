//! Host name predicates
//!
//! Pure string tests; none of these touch the network.

/// True when the host has no domain part
pub fn is_plain_host_name(host: &str) -> bool {
    !host.contains('.')
}

/// Plain suffix test: `dnsDomainIs("www.example.com", ".example.com")`
pub fn dns_domain_is(host: &str, domain: &str) -> bool {
    host.ends_with(domain)
}

/// True when `domain` starts with `host`, so an unqualified host matches its FQDN
pub fn local_host_or_domain_is(host: &str, domain: &str) -> bool {
    domain.starts_with(host)
}

/// Number of dots separating labels; a leading dot separates nothing
pub fn dns_domain_levels(host: &str) -> usize {
    host.chars().skip(1).filter(|c| *c == '.').count()
}

/// Shell-style match where `*` is the only wildcard.
///
/// The literal runs between stars must occur in order, each one starting
/// after the previous match ends. Nothing anchors the first run to the
/// start of `text` or the last run to its end.
pub fn sh_exp_match(text: &str, pattern: &str) -> bool {
    let mut position = 0;
    for token in pattern.split('*').filter(|token| !token.is_empty()) {
        match text[position..].find(token) {
            Some(offset) => position += offset + token.len(),
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_plain_host_name() {
        assert!(is_plain_host_name("intranet"));
        assert!(!is_plain_host_name("www.example.com"));
        assert!(is_plain_host_name(""));
    }

    #[test]
    fn test_dns_domain_is_is_plain_suffix() {
        assert!(dns_domain_is("www.example.com", ".example.com"));
        assert!(dns_domain_is("www.example.com", "example.com"));
        assert!(dns_domain_is("badexample.com", "example.com"));
        assert!(!dns_domain_is("www.example.org", ".example.com"));
    }

    #[test]
    fn test_local_host_or_domain_is_is_prefix_of_domain() {
        assert!(local_host_or_domain_is("www", "www.example.com"));
        assert!(local_host_or_domain_is("www.example.com", "www.example.com"));
        assert!(!local_host_or_domain_is("www.example.com", "www"));
        assert!(!local_host_or_domain_is("home", "www.example.com"));
    }

    #[test]
    fn test_dns_domain_levels() {
        assert_eq!(dns_domain_levels("www"), 0);
        assert_eq!(dns_domain_levels("www.example.com"), 2);
        assert_eq!(dns_domain_levels(".example.com"), 1);
        assert_eq!(dns_domain_levels(""), 0);
    }

    #[test]
    fn test_sh_exp_match_suffix_pattern() {
        assert!(sh_exp_match("www.example.com", "*.example.com"));
        assert!(!sh_exp_match("www.example.org", "*.example.com"));
        assert!(sh_exp_match("http://intranet/index.html", "*/index.html"));
    }

    #[test]
    fn test_sh_exp_match_is_not_anchored() {
        // Literal runs only have to appear in order.
        assert!(sh_exp_match("xexample.comx", "example.com"));
        assert!(sh_exp_match("a.b.c", "a*c"));
        assert!(!sh_exp_match("c.b.a", "a*c"));
        assert!(sh_exp_match("anything", "*"));
        assert!(sh_exp_match("anything", ""));
    }

    #[test]
    fn test_sh_exp_match_tokens_do_not_overlap() {
        assert!(!sh_exp_match("aba", "ab*ba"));
        assert!(sh_exp_match("abba", "ab*ba"));
    }

    #[test]
    fn test_sh_exp_match_multibyte() {
        assert!(sh_exp_match("bücher.example.de", "*ücher*.de"));
    }
}

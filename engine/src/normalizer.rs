use psl::{List, Psl};
use std::net::IpAddr;

/// Structural view of a raw URL string, derived once per extraction.
///
/// Parsing never fails: components that cannot be located are left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedUrl {
    pub raw: String,
    pub scheme: String,
    /// Authority exactly as written, userinfo and port included.
    pub netloc: String,
    pub path: String,
    /// `domain.suffix` per the public suffix list, e.g. `example.co.uk`.
    pub registrable_domain: String,
}

impl NormalizedUrl {
    pub fn parse(raw: &str) -> Self {
        // Surrounding control characters and spaces are ignored for parsing
        // but stay part of `raw`.
        let trimmed = raw.trim_matches(|c: char| c <= ' ');
        let (scheme, rest) = split_scheme(trimmed);

        let (netloc, remainder) = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after
                    .find(|c| matches!(c, '/' | '?' | '#'))
                    .unwrap_or(after.len());
                (&after[..end], &after[end..])
            }
            None => ("", rest),
        };

        let path_end = remainder
            .find(|c| matches!(c, '?' | '#'))
            .unwrap_or(remainder.len());
        let path = &remainder[..path_end];

        let registrable_domain = registrable_domain(&host_candidate(trimmed));

        Self {
            raw: raw.to_string(),
            scheme,
            netloc: netloc.to_string(),
            path: path.to_string(),
            registrable_domain,
        }
    }

    /// Netloc without userinfo, port or IPv6 brackets.
    pub fn host(&self) -> &str {
        authority_host(&self.netloc)
    }

    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }
}

fn is_scheme_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')
}

fn split_scheme(raw: &str) -> (String, &str) {
    if let Some(i) = raw.find(':') {
        let candidate = &raw[..i];
        let starts_alpha = candidate
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_alphabetic());
        if starts_alpha && candidate.chars().all(is_scheme_char) {
            return (candidate.to_ascii_lowercase(), &raw[i + 1..]);
        }
    }
    (String::new(), raw)
}

fn authority_host(authority: &str) -> &str {
    let host_port = match authority.rfind('@') {
        Some(at) => &authority[at + 1..],
        None => authority,
    };

    if let Some(bracketed) = host_port.strip_prefix('[') {
        return match bracketed.find(']') {
            Some(end) => &bracketed[..end],
            None => "",
        };
    }

    match host_port.find(':') {
        Some(colon) => &host_port[..colon],
        None => host_port,
    }
}

/// Best guess at the host even when the input has no `//` authority,
/// so `example.com/login` still yields `example.com`.
fn host_candidate(raw: &str) -> String {
    let mut rest = raw;

    if let Some(idx) = rest.find("//") {
        let prefix = &rest[..idx];
        let is_scheme_prefix = prefix.is_empty()
            || prefix
                .strip_suffix(':')
                .map_or(false, |s| !s.is_empty() && s.chars().all(is_scheme_char));
        if is_scheme_prefix {
            rest = &rest[idx + 2..];
        }
    }

    let end = rest
        .find(|c| matches!(c, '/' | '?' | '#'))
        .unwrap_or(rest.len());

    authority_host(&rest[..end])
        .trim_end_matches('.')
        .to_lowercase()
}

fn registrable_domain(host: &str) -> String {
    if host.is_empty() || host.parse::<IpAddr>().is_ok() {
        return String::new();
    }

    let ascii = match idna::domain_to_ascii(host) {
        Ok(ascii) => ascii,
        Err(_) => return String::new(),
    };

    List.domain(ascii.as_bytes())
        .and_then(|domain| std::str::from_utf8(domain.as_bytes()).ok())
        .map(str::to_string)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_url() {
        let url = NormalizedUrl::parse("http://user:pw@Sub.Example.COM:8080/a/b?q=1#frag");
        assert_eq!(url.scheme, "http");
        assert_eq!(url.netloc, "user:pw@Sub.Example.COM:8080");
        assert_eq!(url.host(), "Sub.Example.COM");
        assert_eq!(url.path, "/a/b");
        assert_eq!(url.registrable_domain, "example.com");
    }

    #[test]
    fn test_multi_part_suffix() {
        let url = NormalizedUrl::parse("https://www.bbc.co.uk/news");
        assert_eq!(url.registrable_domain, "bbc.co.uk");

        let url = NormalizedUrl::parse("http://shop.kienthuc.net.vn/");
        assert_eq!(url.registrable_domain, "kienthuc.net.vn");
    }

    #[test]
    fn test_scheme_is_lowercased() {
        let url = NormalizedUrl::parse("HTTPS://a.com");
        assert_eq!(url.scheme, "https");
        assert_eq!(url.netloc, "a.com");
    }

    #[test]
    fn test_missing_scheme() {
        let url = NormalizedUrl::parse("graphicriver.net");
        assert_eq!(url.scheme, "");
        assert_eq!(url.netloc, "");
        assert_eq!(url.path, "graphicriver.net");
        assert_eq!(url.registrable_domain, "graphicriver.net");

        let url = NormalizedUrl::parse("www.nypost.com/2024/05/story");
        assert_eq!(url.registrable_domain, "nypost.com");
        assert_eq!(url.path_segments().count(), 4);
    }

    #[test]
    fn test_ip_hosts() {
        let url = NormalizedUrl::parse("http://192.168.0.1/page");
        assert_eq!(url.host(), "192.168.0.1");
        assert_eq!(url.registrable_domain, "");

        let url = NormalizedUrl::parse("http://[2001:db8::1]:8443/x");
        assert_eq!(url.netloc, "[2001:db8::1]:8443");
        assert_eq!(url.host(), "2001:db8::1");
    }

    #[test]
    fn test_unicode_host_is_punycoded() {
        let url = NormalizedUrl::parse("http://www.bücher.de/");
        assert_eq!(url.registrable_domain, "xn--bcher-kva.de");
    }

    #[test]
    fn test_garbage_never_panics() {
        for raw in ["", "://", "//", "http://", "@@@", "[", "http://[::1", "::::", "é/ü?#"] {
            let url = NormalizedUrl::parse(raw);
            assert_eq!(url.raw, raw);
        }
        assert_eq!(NormalizedUrl::parse("").registrable_domain, "");
        assert_eq!(NormalizedUrl::parse("http://").host(), "");
    }

    #[test]
    fn test_surrounding_whitespace_kept_in_raw() {
        let url = NormalizedUrl::parse(" https://a.com/x\t");
        assert_eq!(url.raw, " https://a.com/x\t");
        assert_eq!(url.scheme, "https");
        assert_eq!(url.netloc, "a.com");
        assert_eq!(url.path, "/x");
        assert_eq!(url.registrable_domain, "a.com");
    }

    #[test]
    fn test_unterminated_ipv6_literal_has_no_host() {
        let url = NormalizedUrl::parse("http://[::1");
        assert_eq!(url.netloc, "[::1");
        assert_eq!(url.host(), "");
    }

    #[test]
    fn test_path_segments_skip_empty() {
        let url = NormalizedUrl::parse("http://x.com/a//b/");
        assert_eq!(url.path_segments().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}

use http::HeaderMap;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";
const CF_CONNECTING_IP: &str = "cf-connecting-ip";

pub const UNKNOWN_CLIENT: &str = "unknown";

/// Rate-limit identifier for a request.
///
/// Precedence: first `x-forwarded-for` entry, `x-real-ip`, `cf-connecting-ip`,
/// then `"unknown"`. Empty values fall through to the next header.
pub fn client_identifier(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header(FORWARDED_FOR) {
        let first = forwarded.split(',').next().map(str::trim).unwrap_or("");
        if !first.is_empty() {
            return first.to_string();
        }
    }

    header(REAL_IP)
        .or_else(|| header(CF_CONNECTING_IP))
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use rstest::rstest;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[rstest]
    #[case::forwarded_first(&[("x-forwarded-for", " 203.0.113.7 , 10.0.0.1"), ("x-real-ip", "10.0.0.2")], "203.0.113.7")]
    #[case::real_ip(&[("x-real-ip", "10.0.0.2"), ("cf-connecting-ip", "10.0.0.3")], "10.0.0.2")]
    #[case::cloudflare(&[("cf-connecting-ip", "10.0.0.3")], "10.0.0.3")]
    #[case::empty_forwarded_falls_through(&[("x-forwarded-for", " , 10.0.0.1"), ("x-real-ip", "10.0.0.2")], "10.0.0.2")]
    #[case::nothing(&[], "unknown")]
    fn identifier_precedence(#[case] pairs: &[(&'static str, &'static str)], #[case] expected: &str) {
        assert_eq!(client_identifier(&headers(pairs)), expected);
    }
}

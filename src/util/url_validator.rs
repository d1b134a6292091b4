use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Why a custom data-source URL was refused.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    #[error("Localhost not allowed")]
    Localhost,
    #[error("URL has no host")]
    MissingHost,
}

/// Check a URL before it is registered as a crawl target.
///
/// The backend crawls whatever it is given, so internal addresses are
/// refused here: only `http`/`https`, no localhost, no loopback, private,
/// link-local or unspecified IPs.
///
/// ```
/// use navigator::util::validate_url;
///
/// let url = validate_url("https://news.example.com/rss").unwrap();
/// assert_eq!(url.host_str(), Some("news.example.com"));
///
/// assert!(validate_url("http://localhost:8000/admin").is_err());
/// assert!(validate_url("http://10.1.2.3/").is_err());
/// assert!(validate_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;
    if host.eq_ignore_ascii_case("localhost") {
        return Err(UrlValidationError::Localhost);
    }

    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if let Ok(ip) = bare.parse::<IpAddr>() {
        if ip.is_loopback() {
            return Err(UrlValidationError::Localhost);
        }
        if is_private_ip(&ip) {
            return Err(UrlValidationError::PrivateIp(ip.to_string()));
        }
    }

    Ok(url)
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            // fc00::/7 unique local, fe80::/10 link local
            v6.is_unspecified() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_urls_accepted() {
        assert!(validate_url("https://news.example.com/rss").is_ok());
        assert!(validate_url("http://blog.example.org").is_ok());
        assert!(validate_url("https://example.com:8443/feed").is_ok());
    }

    #[test]
    fn test_other_schemes_rejected() {
        assert!(matches!(
            validate_url("ftp://example.com"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_not_a_url_rejected() {
        assert!(matches!(
            validate_url("news site"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_loopback_rejected() {
        assert!(matches!(
            validate_url("http://LOCALHOST/x"),
            Err(UrlValidationError::Localhost)
        ));
        assert!(validate_url("http://127.0.0.1/x").is_err());
        assert!(validate_url("http://[::1]/x").is_err());
    }

    #[test]
    fn test_internal_ranges_rejected() {
        for url in [
            "http://192.168.1.1/",
            "http://10.0.0.1:3000/",
            "http://172.16.0.1/",
            "http://169.254.169.254/latest/meta-data",
            "http://0.0.0.0/",
            "http://[fe80::1]/",
            "http://[fd00::1]/",
        ] {
            assert!(validate_url(url).is_err(), "{url} should be rejected");
        }
    }
}

const BEARER_SCHEME: &str = "bearer";

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively and surrounding whitespace is
/// ignored. Returns `None` for any other scheme or an empty token.
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }

    Some(token)
}

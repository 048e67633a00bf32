//! Utility functions for Converse services.

use url::Url;

/// Strip the API version suffix from a service URL.
///
/// Service credentials are often handed out with the versioned endpoint
/// appended (`.../instances/abc/v2/assistants`). The clients build their own
/// versioned paths, so everything from the first `v<digits>` path segment on
/// is dropped, along with any query string and trailing slash.
pub fn strip_version_suffix(raw: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(raw.trim())?;

    let kept: Vec<String> = url
        .path_segments()
        .map(|segments| {
            segments
                .take_while(|segment| !is_version_segment(segment))
                .filter(|segment| !segment.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    url.set_path(&format!("/{}", kept.join("/")));
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn is_version_segment(segment: &str) -> bool {
    match segment.strip_prefix('v') {
        Some(rest) => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Mask a secret for display, keeping only the last four characters.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Works on character boundaries, so multi-byte text is never split.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let truncated = &s[..idx];
            format!("{}...", truncated.trim_end())
        }
        None => s.to_string(),
    }
}

/// Sanitize a string for safe logging (redact sensitive patterns).
pub fn sanitize_for_log(s: &str) -> String {
    let patterns: &[(&str, &str)] = &[
        (r"(?i)(api[_-]?key|apikey)[=:]\s*\S{8,}", "$1=***REDACTED***"),
        (r"(?i)(access_token|refresh_token)\x22?\s*[=:]\s*\x22?[^\s\x22,]{10,}", "$1=***REDACTED***"),
        (r"(?i)bearer\s+\S{10,}", "Bearer ***REDACTED***"),
    ];

    let mut result = s.to_string();
    for (pattern, replacement) in patterns {
        if let Ok(re) = regex::Regex::new(pattern) {
            result = re.replace_all(&result, *replacement).to_string();
        }
    }
    result
}

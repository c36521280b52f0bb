//! Locating a resource's source map: the inline reference comment, `data:`
//! payloads and relative map locators.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Url;

use crate::error::SourceMapError;

const MAPPING_URL_KEY: &str = "sourceMappingURL=";

/// The *last* `sourceMappingURL` comment in `content`.
///
/// Bundlers concatenating modules may leave several comments behind; only
/// the final one describes the emitted file. Accepts `//#`, `//@`, `/*#`
/// and `/*@` forms.
pub fn find_source_mapping_url(content: &str) -> Option<&str> {
    for (idx, _) in content.rmatch_indices(MAPPING_URL_KEY) {
        let prefix = content[..idx].trim_end_matches([' ', '\t']);
        let is_comment = ["//#", "//@", "/*#", "/*@"]
            .iter()
            .any(|marker| prefix.ends_with(marker));
        if !is_comment {
            continue;
        }
        let value = &content[idx + MAPPING_URL_KEY.len()..];
        let end = value
            .find(|c: char| c.is_whitespace() || c == '*')
            .unwrap_or(value.len());
        let value = &value[..end];
        if !value.is_empty() {
            return Some(value);
        }
    }
    None
}

pub fn is_data_uri(locator: &str) -> bool {
    locator.starts_with("data:")
}

/// Decode a `data:` URI payload (base64 or percent-encoded).
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, SourceMapError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or(SourceMapError::InvalidDataUri("missing data: scheme"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or(SourceMapError::InvalidDataUri("missing ',' separator"))?;

    if meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        Ok(STANDARD.decode(compact)?)
    } else {
        percent_decode(payload)
    }
}

/// Short, display-safe name for a `data:` locator (the media type part).
pub fn data_uri_label(uri: &str) -> &str {
    uri.split_once(',').map_or(uri, |(meta, _)| meta)
}

fn percent_decode(input: &str) -> Result<Vec<u8>, SourceMapError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or(SourceMapError::InvalidDataUri("bad percent escape"))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// Resolve a map reference found in (or sent with) `base`.
///
/// URL bases use URL joining; anything else is treated as a filesystem path
/// and the reference is joined onto its parent directory.
pub fn resolve_reference(base: &str, reference: &str) -> Result<String, SourceMapError> {
    if is_data_uri(reference) || Url::parse(reference).is_ok() {
        return Ok(reference.to_string());
    }

    if let Ok(base_url) = Url::parse(base)
        && matches!(base_url.scheme(), "http" | "https" | "file")
    {
        return base_url
            .join(reference)
            .map(String::from)
            .map_err(|_| SourceMapError::UnresolvableReference {
                base: base.to_string(),
                reference: reference.to_string(),
            });
    }

    if base.contains("://") {
        return Err(SourceMapError::UnresolvableReference {
            base: base.to_string(),
            reference: reference.to_string(),
        });
    }

    let reference_path = Path::new(reference);
    if reference_path.is_absolute() {
        return Ok(reference.to_string());
    }
    let dir = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
    Ok(dir.join(reference_path).to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_mapping_comment_wins() {
        let js = "var a=1;\n//# sourceMappingURL=old.js.map\nvar b=2;\n//# sourceMappingURL=app.min.js.map\n";
        assert_eq!(find_source_mapping_url(js), Some("app.min.js.map"));
    }

    #[test]
    fn accepts_legacy_and_block_comments() {
        assert_eq!(
            find_source_mapping_url("x()\n//@ sourceMappingURL=legacy.map"),
            Some("legacy.map")
        );
        assert_eq!(
            find_source_mapping_url("x()\n/*# sourceMappingURL=block.map */"),
            Some("block.map")
        );
    }

    #[test]
    fn ignores_mentions_outside_comments() {
        let js = "const s = \"sourceMappingURL=nope.map\";";
        assert_eq!(find_source_mapping_url(js), None);
    }

    #[test]
    fn decodes_base64_and_plain_data_uris() {
        let b64 = "data:application/json;charset=utf-8;base64,eyJhIjoxfQ==";
        assert_eq!(decode_data_uri(b64).unwrap(), br#"{"a":1}"#);
        assert_eq!(data_uri_label(b64), "data:application/json;charset=utf-8;base64");

        let plain = "data:application/json,%7B%22a%22%3A1%7D";
        assert_eq!(decode_data_uri(plain).unwrap(), br#"{"a":1}"#);

        assert!(decode_data_uri("data:application/json;base64").is_err());
        assert!(decode_data_uri("data:,%zz").is_err());
    }

    #[test]
    fn resolves_relative_references() {
        assert_eq!(
            resolve_reference("https://cdn.test/js/app.min.js", "app.min.js.map").unwrap(),
            "https://cdn.test/js/app.min.js.map"
        );
        assert_eq!(
            resolve_reference("https://cdn.test/js/app.min.js", "../maps/app.map").unwrap(),
            "https://cdn.test/maps/app.map"
        );
        assert_eq!(
            resolve_reference("https://cdn.test/app.js", "https://maps.test/app.map").unwrap(),
            "https://maps.test/app.map"
        );
        assert_eq!(
            resolve_reference("/srv/www/dist/app.min.js", "app.min.js.map").unwrap(),
            "/srv/www/dist/app.min.js.map"
        );
        assert!(resolve_reference("chrome-extension://abc/app.js", "app.map").is_err());
    }
}

//! HTTP range handling for download responses.

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use bytes::Bytes;

/// Parse a `Range` header against a total body length.
///
/// Returns the inclusive `(start, end)` byte range. `Ok(None)` means no
/// usable range (absent, malformed, or multi-range) and the full body is
/// served; `Err(())` means syntactically valid but unsatisfiable (416).
/// Supported forms: `bytes=a-b`, `bytes=a-`, `bytes=-n`.
pub fn parse_range(header: &str, total: u64) -> Result<Option<(u64, u64)>, ()> {
    let Some(spec) = header.strip_prefix("bytes=") else {
        return Ok(None);
    };
    // Multi-range requests are served as the full body.
    if spec.contains(',') {
        return Ok(None);
    }

    let Some((start_str, end_str)) = spec.split_once('-') else {
        return Ok(None);
    };

    if start_str.is_empty() {
        // bytes=-n : the final n bytes.
        let Ok(suffix) = end_str.parse::<u64>() else {
            return Ok(None);
        };
        if suffix == 0 || total == 0 {
            return Err(());
        }
        let start = total.saturating_sub(suffix);
        return Ok(Some((start, total - 1)));
    }

    let Ok(start) = start_str.parse::<u64>() else {
        return Ok(None);
    };
    if start >= total {
        return Err(());
    }

    if end_str.is_empty() {
        // bytes=a- : from a to the end.
        return Ok(Some((start, total - 1)));
    }

    let Ok(end) = end_str.parse::<u64>() else {
        return Ok(None);
    };
    if end < start {
        return Ok(None);
    }
    Ok(Some((start, end.min(total - 1))))
}

/// Build a download response, honoring an optional `Range` header.
///
/// Full responses are 200 with `Accept-Ranges: bytes`; satisfiable ranges
/// are 206 with `Content-Range`; unsatisfiable ranges are 416.
pub fn file_response(filename: &str, body: Bytes, headers: &HeaderMap) -> Response {
    let total = body.len() as u64;

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_range(v, total));

    let disposition = format!("attachment; filename=\"{}\"", sanitize_filename(filename));

    match range {
        Some(Err(())) => Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{total}"))
            .body(Body::empty())
            .expect("static response"),
        Some(Ok(Some((start, end)))) => {
            let slice = body.slice(start as usize..=end as usize);
            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .header(header::CONTENT_DISPOSITION, disposition)
                .header(header::CONTENT_LENGTH, slice.len())
                .header(header::ACCEPT_RANGES, "bytes")
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {start}-{end}/{total}"),
                )
                .body(Body::from(slice))
                .expect("static response")
        }
        _ => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_DISPOSITION, disposition)
            .header(header::CONTENT_LENGTH, body.len())
            .header(header::ACCEPT_RANGES, "bytes")
            .body(Body::from(body))
            .expect("static response"),
    }
}

/// Strip quote and control characters so the filename cannot break out of
/// the Content-Disposition header.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bounded_range() {
        assert_eq!(parse_range("bytes=0-4", 10), Ok(Some((0, 4))));
        assert_eq!(parse_range("bytes=5-9", 10), Ok(Some((5, 9))));
        // End clamps to the last byte.
        assert_eq!(parse_range("bytes=5-100", 10), Ok(Some((5, 9))));
    }

    #[test]
    fn parses_open_and_suffix_ranges() {
        assert_eq!(parse_range("bytes=3-", 10), Ok(Some((3, 9))));
        assert_eq!(parse_range("bytes=-4", 10), Ok(Some((6, 9))));
        // Suffix longer than the body serves the whole body.
        assert_eq!(parse_range("bytes=-100", 10), Ok(Some((0, 9))));
    }

    #[test]
    fn unsatisfiable_ranges() {
        assert_eq!(parse_range("bytes=10-", 10), Err(()));
        assert_eq!(parse_range("bytes=12-20", 10), Err(()));
        assert_eq!(parse_range("bytes=-0", 10), Err(()));
    }

    #[test]
    fn malformed_ranges_serve_full_body() {
        assert_eq!(parse_range("chunks=0-4", 10), Ok(None));
        assert_eq!(parse_range("bytes=a-b", 10), Ok(None));
        assert_eq!(parse_range("bytes=0-2,5-7", 10), Ok(None));
        assert_eq!(parse_range("bytes=4-2", 10), Ok(None));
    }

    #[test]
    fn filename_sanitized_in_disposition() {
        assert_eq!(sanitize_filename("a\"b\\c\r\n.txt"), "abc.txt");
    }
}

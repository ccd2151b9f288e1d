//! `multipart/*` body parsing.
//!
//! Works on a fully buffered body; parts are zero-copy slices of it.

use bytes::Bytes;
use percent_encoding::percent_decode_str;

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Header names lowercased, in order of appearance.
    pub headers:      Vec<(String, String)>,
    pub name:         Option<String>,
    pub filename:     Option<String>,
    pub content_type: Option<String>,
    pub body:         Bytes,
}

impl Part {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_json(&self) -> bool {
        self.content_type.as_deref().is_some_and(is_json_content_type)
    }
}

/// Whether `content_type` announces a multipart body.
pub fn is_multipart(content_type: &str) -> bool {
    media_type(content_type).starts_with("multipart/")
}

pub fn is_json_content_type(content_type: &str) -> bool {
    let media = media_type(content_type);
    media == "application/json" || media.ends_with("+json")
}

/// Lowercased media type without parameters.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// The `boundary` parameter of a multipart content type.
pub fn boundary(content_type: &str) -> Option<String> {
    header_param(content_type, "boundary").filter(|b| !b.is_empty())
}

/// Look up `name` among the `;`-separated parameters of a header value.
/// Quoted values are unquoted. `filename*` (RFC 5987) values are decoded.
pub fn header_param(value: &str, name: &str) -> Option<String> {
    let params: Vec<&str> = split_params(value);
    let extended = format!("{name}*");

    let mut plain = None;
    for param in params.iter().skip(1) {
        let Some((key, raw)) = param.split_once('=') else { continue };
        let key = key.trim();
        let raw = raw.trim();
        if key.eq_ignore_ascii_case(&extended) {
            if let Some(decoded) = decode_ext_value(raw) {
                return Some(decoded);
            }
        } else if key.eq_ignore_ascii_case(name) && plain.is_none() {
            plain = Some(unquote(raw));
        }
    }
    plain
}

/// Split on `;` outside of quoted strings.
fn split_params(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                parts.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

fn unquote(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// `charset'lang'percent-encoded`; only UTF-8 and ASCII charsets are accepted.
fn decode_ext_value(raw: &str) -> Option<String> {
    let mut pieces = raw.splitn(3, '\'');
    let charset = pieces.next()?;
    let _lang = pieces.next()?;
    let encoded = pieces.next()?;
    if !(charset.eq_ignore_ascii_case("utf-8") || charset.eq_ignore_ascii_case("us-ascii")) {
        return None;
    }

    percent_decode_str(encoded).decode_utf8().ok().map(|s| s.into_owned())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Split `body` into its parts.
///
/// Any preamble before the first delimiter and any epilogue after the closing
/// delimiter are ignored. Returns a description of the problem on malformed
/// input.
pub fn parse(body: &Bytes, boundary: &str) -> Result<Vec<Part>, String> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let mut next_delimiter = Vec::with_capacity(delimiter.len() + 2);
    next_delimiter.extend_from_slice(b"\r\n");
    next_delimiter.extend_from_slice(delimiter);

    let mut pos = if body.starts_with(delimiter) {
        0
    } else {
        find(body, &next_delimiter)
            .map(|p| p + 2)
            .ok_or_else(|| format!("boundary {boundary:?} not found in body"))?
    };

    let mut parts = Vec::new();
    loop {
        pos += delimiter.len();
        let rest = &body[pos..];
        if rest.starts_with(b"--") {
            return Ok(parts);
        }

        // Transport padding, then the line break that ends the delimiter line.
        let line_end = find(rest, b"\r\n").ok_or("unterminated delimiter line")?;
        if !rest[..line_end].iter().all(|b| *b == b' ' || *b == b'\t') {
            return Err("unexpected bytes after boundary delimiter".into());
        }
        let part_start = pos + line_end + 2;

        let part_bytes = &body[part_start..];
        let (headers, body_offset) = if part_bytes.starts_with(b"\r\n") {
            (Vec::new(), 2)
        } else {
            let header_end = find(part_bytes, b"\r\n\r\n").ok_or("unterminated part headers")?;
            (parse_headers(&part_bytes[..header_end])?, header_end + 4)
        };

        let content_start = part_start + body_offset;
        let content_len = find(&body[content_start..], &next_delimiter).ok_or("unterminated part body")?;
        let content = body.slice(content_start..content_start + content_len);

        parts.push(build_part(headers, content));
        pos = content_start + content_len + 2;
    }
}

fn parse_headers(raw: &[u8]) -> Result<Vec<(String, String)>, String> {
    let text = std::str::from_utf8(raw).map_err(|_| "part headers are not valid UTF-8".to_string())?;
    let mut headers: Vec<(String, String)> = Vec::new();
    for line in text.split("\r\n") {
        if line.starts_with(' ') || line.starts_with('\t') {
            // Obsolete line folding.
            let (_, value) = headers.last_mut().ok_or("continuation line without a header")?;
            value.push(' ');
            value.push_str(line.trim());
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| format!("malformed part header line: {line:?}"))?;
        headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
    }
    Ok(headers)
}

fn build_part(headers: Vec<(String, String)>, body: Bytes) -> Part {
    let disposition = headers
        .iter()
        .find(|(k, _)| k == "content-disposition")
        .map(|(_, v)| v.as_str());
    let name = disposition.and_then(|d| header_param(d, "name"));
    let filename = disposition.and_then(|d| header_param(d, "filename"));
    let content_type = headers
        .iter()
        .find(|(k, _)| k == "content-type")
        .map(|(_, v)| v.clone());

    Part {
        headers,
        name,
        filename,
        content_type,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(s: &str) -> Bytes { Bytes::from(s.replace('\n', "\r\n")) }

    #[test]
    fn test_boundary_param() {
        assert_eq!(boundary("multipart/form-data; boundary=xyz").as_deref(), Some("xyz"));
        assert_eq!(
            boundary("multipart/form-data; charset=utf-8; boundary=\"a b;c\"").as_deref(),
            Some("a b;c")
        );
        assert_eq!(boundary("multipart/form-data"), None);
        assert_eq!(boundary("multipart/form-data; boundary="), None);
    }

    #[test]
    fn test_content_type_helpers() {
        assert!(is_multipart("Multipart/Form-Data; boundary=x"));
        assert!(!is_multipart("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("application/problem+json"));
        assert!(!is_json_content_type("application/octet-stream"));
    }

    #[test]
    fn test_disposition_params() {
        let d = r#"form-data; name="file"; filename="my \"q\" file.txt""#;
        assert_eq!(header_param(d, "name").as_deref(), Some("file"));
        assert_eq!(header_param(d, "filename").as_deref(), Some("my \"q\" file.txt"));

        let d = "attachment; filename=plain.txt; filename*=UTF-8''na%C3%AFve%20file.txt";
        assert_eq!(header_param(d, "filename").as_deref(), Some("naïve file.txt"));

        let d = "attachment; filename*=utf-8''100%25%zz.txt";
        assert_eq!(header_param(d, "filename").as_deref(), Some("100%%zz.txt"));

        // Not UTF-8 after decoding: fall back to the plain parameter.
        let d = "attachment; filename=fallback.bin; filename*=UTF-8''%FF.bin";
        assert_eq!(header_param(d, "filename").as_deref(), Some("fallback.bin"));
    }

    #[test]
    fn test_parse_two_parts() {
        let raw = body(
            "--xyz\n\
             Content-Disposition: form-data; name=\"pangea_json\"\n\
             Content-Type: application/json\n\
             \n\
             {\"request_id\":\"r\"}\n\
             --xyz\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"archive.zip\"\n\
             Content-Type: application/octet-stream\n\
             \n\
             PK\u{3}\u{4}binary\n\
             --xyz--\n",
        );

        let parts = parse(&raw, "xyz").unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name.as_deref(), Some("pangea_json"));
        assert!(parts[0].is_json());
        assert_eq!(&parts[0].body[..], b"{\"request_id\":\"r\"}");
        assert_eq!(parts[1].filename.as_deref(), Some("archive.zip"));
        assert_eq!(parts[1].content_type.as_deref(), Some("application/octet-stream"));
        assert_eq!(&parts[1].body[..], b"PK\x03\x04binary");
    }

    #[test]
    fn test_parse_preamble_and_binary_crlf() {
        let mut raw = b"preamble text\r\n--b\r\nContent-Type: application/octet-stream\r\n\r\n".to_vec();
        raw.extend_from_slice(b"line1\r\nline2\r\n--not-the-boundary\r\n");
        raw.extend_from_slice(b"\r\n--b--");

        let parts = parse(&Bytes::from(raw), "b").unwrap();

        assert_eq!(parts.len(), 1);
        assert_eq!(&parts[0].body[..], b"line1\r\nline2\r\n--not-the-boundary\r\n");
        assert_eq!(parts[0].name, None);
    }

    #[test]
    fn test_parse_part_without_headers() {
        let raw = body("--b\n\nraw\n--b--");
        let parts = parse(&raw, "b").unwrap();
        assert!(parts[0].headers.is_empty());
        assert_eq!(&parts[0].body[..], b"raw");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&body("no delimiter here"), "b").is_err());
        assert!(parse(&body("--b\nContent-Type: text/plain\n\nbody never closes"), "b").is_err());
        assert!(parse(&body("--b\nContent-Type text/plain\n\nx\n--b--"), "b").is_err());
    }

    #[test]
    fn test_parse_empty_multipart() {
        assert!(parse(&body("--b--\n"), "b").unwrap().is_empty());
    }
}

//! `multipart/related` framing for envelopes with attachments.

/// One body part. `content_id` is stored without angle brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    pub content_id: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A decoded `multipart/related` body: the root (SOAP) part and the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartMessage {
    pub root: MimePart,
    pub attachments: Vec<MimePart>,
}

#[derive(Debug, thiserror::Error)]
pub enum MimeError {
    #[error("multipart content type without boundary: {0}")]
    MissingBoundary(String),

    #[error("malformed MIME part: {0}")]
    MalformedPart(String),

    #[error("multipart message has no parts")]
    MissingRoot,
}

/// Lower-cased media type of a `Content-Type` value, without parameters.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Value of a `Content-Type` parameter, unquoted.
pub fn content_type_parameter(content_type: &str, name: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().trim_matches('"').to_owned())
    })
}

fn write_part(out: &mut Vec<u8>, boundary: &str, content_type: &str, content_id: &str, data: &[u8]) {
    out.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: {content_type}\r\nContent-Transfer-Encoding: binary\r\nContent-ID: <{content_id}>\r\n\r\n"
        )
        .as_bytes(),
    );
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
}

/// Frames `root` followed by `parts`.
pub fn encode(boundary: &str, start: &str, root: &[u8], parts: &[MimePart]) -> Vec<u8> {
    let mut out = Vec::with_capacity(root.len() + parts.iter().map(|p| p.data.len() + 128).sum::<usize>() + 256);

    write_part(&mut out, boundary, r#"text/xml; charset="utf-8""#, start, root);
    for part in parts {
        write_part(&mut out, boundary, &part.content_type, &part.content_id, &part.data);
    }
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    out
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn skip_line_end(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\r\n")
        .or_else(|| data.strip_prefix(b"\n"))
        .unwrap_or(data)
}

fn parse_part(raw: &[u8]) -> Result<MimePart, MimeError> {
    let (headers, data) = match find(raw, b"\r\n\r\n") {
        Some(end) => (&raw[..end], &raw[end + 4..]),
        None => match find(raw, b"\n\n") {
            Some(end) => (&raw[..end], &raw[end + 2..]),
            None => {
                return Err(MimeError::MalformedPart(
                    "missing blank line after part headers".to_owned(),
                ));
            }
        },
    };

    let headers = String::from_utf8_lossy(headers);
    let mut content_id = String::new();
    let mut content_type = "text/plain".to_owned();
    for line in headers.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-id") {
            content_id = value.trim().trim_start_matches('<').trim_end_matches('>').to_owned();
        } else if name.trim().eq_ignore_ascii_case("content-type") {
            content_type = value.trim().to_owned();
        }
    }

    Ok(MimePart {
        content_id,
        content_type,
        data: data.to_vec(),
    })
}

/// Splits a `multipart/related` body. The root is the part named by the `start`
/// parameter, or the first part.
pub fn decode(content_type: &str, body: &[u8]) -> Result<MultipartMessage, MimeError> {
    let boundary = content_type_parameter(content_type, "boundary")
        .ok_or_else(|| MimeError::MissingBoundary(content_type.to_owned()))?;
    let start = content_type_parameter(content_type, "start")
        .map(|start| start.trim_start_matches('<').trim_end_matches('>').to_owned());
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let first = find(body, delimiter)
        .ok_or_else(|| MimeError::MalformedPart("no boundary delimiter found".to_owned()))?;
    let mut rest = &body[first + delimiter.len()..];

    let mut parts = Vec::new();
    while !rest.starts_with(b"--") {
        rest = skip_line_end(rest);
        let next = find(rest, delimiter)
            .ok_or_else(|| MimeError::MalformedPart("unterminated part".to_owned()))?;
        let raw = &rest[..next];
        let raw = raw
            .strip_suffix(b"\r\n")
            .or_else(|| raw.strip_suffix(b"\n"))
            .unwrap_or(raw);
        parts.push(parse_part(raw)?);
        rest = &rest[next + delimiter.len()..];
    }

    let root_index = start
        .and_then(|start| parts.iter().position(|part| part.content_id == start))
        .unwrap_or(0);
    if parts.is_empty() {
        return Err(MimeError::MissingRoot);
    }
    let root = parts.remove(root_index);

    Ok(MultipartMessage {
        root,
        attachments: parts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_parameters_are_unquoted() {
        let content_type = r#"multipart/related; boundary="b1"; start="<root@x>"; type="text/xml""#;
        assert_eq!(media_type(content_type), "multipart/related");
        assert_eq!(content_type_parameter(content_type, "boundary").as_deref(), Some("b1"));
        assert_eq!(content_type_parameter(content_type, "START").as_deref(), Some("<root@x>"));
        assert_eq!(content_type_parameter(content_type, "charset"), None);
    }

    #[test]
    fn decode_reads_encoded_parts() {
        let attachment = MimePart {
            content_id: "blob@x".to_owned(),
            content_type: "application/octet-stream".to_owned(),
            data: vec![0, 1, 2, 0xff, b'\r', b'\n'],
        };
        let body = encode("b1", "root@x", b"<Envelope/>", std::slice::from_ref(&attachment));

        let message = decode(
            r#"multipart/related; boundary="b1"; start="<root@x>"; type="text/xml""#,
            &body,
        )
        .unwrap();

        assert_eq!(message.root.content_id, "root@x");
        assert_eq!(message.root.data, b"<Envelope/>");
        assert_eq!(message.attachments, vec![attachment]);
    }

    #[test]
    fn decode_uses_start_parameter_for_root() {
        let body = b"preamble\r\n--b\r\nContent-ID: <a>\r\n\r\nfirst\r\n--b\r\nContent-ID: <b>\r\nContent-Type: text/xml\r\n\r\nsecond\r\n--b--\r\n";
        let message = decode(r#"multipart/related; boundary=b; start="<b>""#, body).unwrap();

        assert_eq!(message.root.data, b"second");
        assert_eq!(message.attachments[0].data, b"first");
        assert_eq!(message.attachments[0].content_type, "text/plain");
    }

    #[test]
    fn decode_requires_boundary() {
        assert!(matches!(
            decode("multipart/related", b""),
            Err(MimeError::MissingBoundary(_))
        ));
    }
}

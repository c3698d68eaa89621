use std::collections::HashMap;

use bytes::Bytes;

use crate::error::AppError;

/// One uploaded file inside a multipart body.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub filename: String,
    pub data: Bytes,
}

/// Result of parsing a multipart/form-data body: plain fields plus file
/// attachments, both keyed by the part's `name`.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, FilePart>,
}

impl MultipartForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }

    pub fn file(&self, name: &str) -> Option<&FilePart> {
        self.files.get(name)
    }
}

/// Parse a multipart/form-data body against its declared boundary.
///
/// Parts are delimited only at `\r\n--boundary` positions that are followed
/// by `\r\n` (next part) or `--` (final delimiter), so boundary-like byte
/// sequences inside a binary payload do not split a part. Each part is
/// consumed in two states: header block (CRLF-separated lines up to a blank
/// line), then payload (raw bytes up to the next true delimiter, trailing
/// CRLF stripped).
pub fn parse(body: &[u8], boundary: &str) -> Result<MultipartForm, AppError> {
    if boundary.is_empty() {
        return Err(AppError::MalformedBody("missing multipart boundary".into()));
    }
    let open_delim = [b"--", boundary.as_bytes()].concat();
    let delim = [b"\r\n--", boundary.as_bytes()].concat();

    // The first delimiter has no preceding CRLF.
    let mut pos = if body.starts_with(&open_delim) {
        open_delim.len()
    } else {
        match find_from(body, &delim, 0) {
            Some(at) => at + delim.len(),
            None => {
                return Err(AppError::MalformedBody(
                    "multipart boundary not found in body".into(),
                ))
            }
        }
    };

    let mut form = MultipartForm::default();

    loop {
        // After a delimiter: "--" closes the stream, CRLF opens a part.
        if body[pos..].starts_with(b"--") {
            break;
        }
        if body[pos..].starts_with(b"\r\n") {
            pos += 2;
        } else if pos >= body.len() {
            break;
        } else {
            return Err(AppError::MalformedBody("malformed multipart delimiter".into()));
        }

        // Header block ends at the blank line.
        let headers_end = match find_from(body, b"\r\n\r\n", pos) {
            Some(at) => at,
            None => break, // truncated part, tolerate
        };
        let disposition = parse_part_headers(&body[pos..headers_end]);
        pos = headers_end + 4;

        // Payload runs to the next true delimiter.
        let (payload_end, next_pos) = match next_delimiter(body, &delim, pos) {
            Some(at) => (at, at + delim.len()),
            None => (body.len(), body.len()), // missing final delimiter, tolerate
        };
        let payload = &body[pos..payload_end];
        pos = next_pos;

        let Some(disposition) = disposition else {
            continue; // part without Content-Disposition carries no name
        };

        match disposition.filename {
            Some(filename) => {
                form.files.insert(
                    disposition.name,
                    FilePart {
                        filename,
                        data: Bytes::copy_from_slice(payload),
                    },
                );
            }
            None => {
                form.fields.insert(
                    disposition.name,
                    String::from_utf8_lossy(payload).into_owned(),
                );
            }
        }

        if pos >= body.len() {
            break;
        }
    }

    Ok(form)
}

struct Disposition {
    name: String,
    filename: Option<String>,
}

fn parse_part_headers(block: &[u8]) -> Option<Disposition> {
    for line in block.split(|&b| b == b'\n') {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches('\r');
        if !line
            .to_ascii_lowercase()
            .starts_with("content-disposition:")
        {
            continue;
        }
        let name = quoted_param(line, "name=")?;
        let filename = quoted_param(line, "filename=");
        return Some(Disposition { name, filename });
    }
    None
}

/// Extract the value of `key="value"` from a header line.
fn quoted_param(line: &str, key: &str) -> Option<String> {
    // Match ` name=` or `;name=` so that `filename=` never matches `name=`.
    let mut search = 0;
    let at = loop {
        let at = line[search..].find(key)? + search;
        let boundary_ok = at == 0
            || matches!(line.as_bytes()[at - 1], b' ' | b';' | b'\t');
        if boundary_ok {
            break at;
        }
        search = at + key.len();
    };
    let rest = &line[at + key.len()..];
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

fn find_from(haystack: &[u8], needle: &[u8], start: usize) -> Option<usize> {
    if start > haystack.len() {
        return None;
    }
    haystack[start..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|at| at + start)
}

/// Find the next delimiter that is genuinely a part boundary: it must be
/// followed by CRLF or by the closing `--`. A bare occurrence of the
/// boundary bytes inside a binary payload fails that check and is skipped.
fn next_delimiter(body: &[u8], delim: &[u8], start: usize) -> Option<usize> {
    let mut search = start;
    loop {
        let at = find_from(body, delim, search)?;
        let tail = &body[at + delim.len()..];
        if tail.is_empty() || tail.starts_with(b"\r\n") || tail.starts_with(b"--") {
            return Some(at);
        }
        search = at + 1;
    }
}

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

// 00:00:12,345 --> 00:00:14,210
static TIMECODE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{2}:\d{2}:\d{2},\d{3}\s*-->\s*\d{2}:\d{2}:\d{2},\d{3}")
        .expect("timecode pattern is valid")
});

// <i>, </i>, <font color="...">, ...
static MARKUP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("markup pattern is valid"));

/// Bytes that have no mapping in Windows-1252.
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// Decode raw subtitle bytes, trying in order: a byte-order mark
/// (UTF-8 / UTF-16LE / UTF-16BE), strict UTF-8, strict Windows-1252, and
/// finally lossy UTF-8. Never fails. Returns the text and the name of the
/// encoding that was used.
pub fn decode_subtitle_bytes(bytes: &[u8]) -> (String, &'static str) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        if let Some(text) =
            encoding.decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
        {
            return (text.into_owned(), encoding.name());
        }
    }

    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return (text.into_owned(), UTF_8.name());
    }

    if !bytes.iter().any(|b| CP1252_UNDEFINED.contains(b)) {
        if let Some(text) = WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes)
        {
            return (text.into_owned(), WINDOWS_1252.name());
        }
    }

    log::debug!("No strict decoding matched, falling back to lossy UTF-8");
    (String::from_utf8_lossy(bytes).into_owned(), "utf-8-lossy")
}

/// Spoken-text lines of an already decoded subtitle document, in file
/// order: sequence numbers, timecode lines and blank lines are dropped and
/// markup tags are stripped in place.
pub fn subtitle_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.chars().all(char::is_numeric) {
                return None;
            }
            if TIMECODE_LINE.is_match(line) {
                return None;
            }
            let stripped = MARKUP_TAG.replace_all(line, "");
            let stripped = stripped.trim();
            if stripped.is_empty() {
                None
            } else {
                Some(stripped.to_string())
            }
        })
        .collect()
}

/// Read a subtitle file of unknown encoding and return its spoken lines.
/// Only an unreadable file is an error; undecodable bytes degrade to lossy
/// decoding.
pub fn read_subtitle_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let (text, encoding) = decode_subtitle_bytes(&bytes);
    log::debug!("Decoded {} as {}", path.display(), encoding);
    Ok(subtitle_lines(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "1\n00:00:01,000 --> 00:00:03,500\n<i>Hello world</i>\n\n2\n00:00:04,000 --> 00:00:06,000\nThe world is big\n- <font color=\"#ffff00\">Hello</font> again\n";

    #[test]
    fn test_strips_numbers_timecodes_and_tags() {
        let lines = subtitle_lines(SAMPLE);
        assert_eq!(
            lines,
            vec!["Hello world", "The world is big", "- Hello again"]
        );
    }

    #[test]
    fn test_tag_only_line_is_dropped() {
        let lines = subtitle_lines("3\n<i></i>\nreal text\n");
        assert_eq!(lines, vec!["real text"]);
    }

    #[test]
    fn test_keeps_duplicate_lines_in_order() {
        let lines = subtitle_lines("Yes\nNo\nYes\n");
        assert_eq!(lines, vec!["Yes", "No", "Yes"]);
    }

    #[test]
    fn test_timecode_with_extra_spacing() {
        let lines = subtitle_lines("00:01:02,003   -->   00:01:04,005\nLine\n");
        assert_eq!(lines, vec!["Line"]);
    }

    #[test]
    fn test_decode_utf8() {
        let (text, enc) = decode_subtitle_bytes("déjà vu".as_bytes());
        assert_eq!(text, "déjà vu");
        assert_eq!(enc, "UTF-8");
    }

    #[test]
    fn test_decode_utf8_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"1\nBonjour\n");
        let (text, _) = decode_subtitle_bytes(&bytes);
        assert_eq!(text, "1\nBonjour\n");
    }

    #[test]
    fn test_decode_utf16le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "été".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let (text, enc) = decode_subtitle_bytes(&bytes);
        assert_eq!(text, "été");
        assert_eq!(enc, "UTF-16LE");
    }

    #[test]
    fn test_decode_cp1252() {
        // "café – oui" in Windows-1252
        let bytes = [b'c', b'a', b'f', 0xE9, b' ', 0x96, b' ', b'o', b'u', b'i'];
        let (text, enc) = decode_subtitle_bytes(&bytes);
        assert_eq!(text, "café \u{2013} oui");
        assert_eq!(enc, "windows-1252");
    }

    #[test]
    fn test_decode_never_fails() {
        // invalid UTF-8 that also contains an unmapped cp1252 byte
        let bytes = [b'a', 0x81, 0xC3, b'b'];
        let (text, enc) = decode_subtitle_bytes(&bytes);
        assert_eq!(enc, "utf-8-lossy");
        assert!(text.starts_with('a'));
        assert!(text.ends_with('b'));
    }

    #[test]
    fn test_read_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(read_subtitle_lines(&temp.path().join("missing.srt")).is_err());
    }

    #[test]
    fn test_read_latin_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ep.srt");
        std::fs::write(&path, [b'1', b'\n', b'O', b'\xF9', b' ', b'e', b's', b't', b'\n']).unwrap();
        let lines = read_subtitle_lines(&path).unwrap();
        assert_eq!(lines, vec!["Où est"]);
    }
}

//! Plain-text PDF rendering for document downloads.
//!
//! Nothing fancy: Helvetica 12pt on A4, naive line wrapping, one content
//! stream per page. The writer emits the objects by hand because the
//! export only ever needs "text on a page".

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const FONT_SIZE: f32 = 12.0;
const LEADING: f32 = 14.0;
const WRAP_COLUMNS: usize = 88;
const LINES_PER_PAGE: usize = 52;

/// Render `content` as a downloadable PDF byte stream.
pub(crate) fn pdf(content: &str) -> Vec<u8> {
    let pages = paginate(content);
    let page_count = pages.len();

    // object 1: catalog, 2: page tree, 3: font; per page: page obj, stream obj
    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(3 + page_count * 2);

    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());

    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", 4 + i * 2))
        .collect();
    objects.push(
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_count
        )
        .into_bytes(),
    );

    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );

    for (i, lines) in pages.iter().enumerate() {
        let page_obj = 4 + i * 2;
        let stream_obj = page_obj + 1;
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R \
                 /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R >> >> \
                 /Contents {stream_obj} 0 R >>"
            )
            .into_bytes(),
        );
        objects.push(content_stream(lines));
        debug_assert_eq!(objects.len(), stream_obj);
    }

    assemble(&objects)
}

/// Wrap and split into pages of at most `LINES_PER_PAGE` lines. Always
/// yields at least one (possibly blank) page.
fn paginate(content: &str) -> Vec<Vec<String>> {
    let normalized = content.replace("\r\n", "\n");
    let mut lines: Vec<String> = Vec::new();
    for raw in normalized.trim_end_matches('\n').split('\n') {
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        let chars: Vec<char> = raw.chars().collect();
        for chunk in chars.chunks(WRAP_COLUMNS) {
            lines.push(chunk.iter().collect());
        }
    }

    let mut pages: Vec<Vec<String>> = lines
        .chunks(LINES_PER_PAGE)
        .map(|chunk| chunk.to_vec())
        .collect();
    if pages.is_empty() {
        pages.push(vec![String::new()]);
    }
    pages
}

fn content_stream(lines: &[String]) -> Vec<u8> {
    let top = PAGE_HEIGHT - MARGIN - FONT_SIZE;
    let mut text: Vec<u8> = Vec::new();
    text.extend_from_slice(b"BT\n");
    text.extend_from_slice(format!("/F1 {FONT_SIZE} Tf\n{LEADING} TL\n{MARGIN} {top} Td\n").as_bytes());
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            text.extend_from_slice(b"T*\n");
        }
        text.push(b'(');
        text.extend_from_slice(&escape(line));
        text.extend_from_slice(b") Tj\n");
    }
    text.extend_from_slice(b"ET");

    let mut stream = Vec::new();
    stream.extend_from_slice(format!("<< /Length {} >>\nstream\n", text.len()).as_bytes());
    stream.extend_from_slice(&text);
    stream.extend_from_slice(b"\nendstream");
    stream
}

/// PDF literal-string escaping, one Latin-1 byte per character to match
/// the font's WinAnsi encoding; anything outside that range becomes `?`.
fn escape(line: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '(' => out.extend_from_slice(b"\\("),
            ')' => out.extend_from_slice(b"\\)"),
            '\\' => out.extend_from_slice(b"\\\\"),
            c if (c as u32) < 0x20 => out.push(b' '),
            c if c.is_ascii() => out.push(c as u8),
            c if (0xA0..=0xFF).contains(&(c as u32)) => out.push(c as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

/// Lay the objects out sequentially and append the xref table and trailer.
fn assemble(objects: &[Vec<u8>]) -> Vec<u8> {
    let mut out: Vec<u8> = b"%PDF-1.4\n".to_vec();
    let mut offsets: Vec<usize> = Vec::with_capacity(objects.len());

    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn accented_text_is_one_latin1_byte_per_char() {
        let bytes = pdf("línea");
        // 'í' is the single WinAnsi byte 0xED, not the utf-8 pair C3 AD
        assert!(contains(&bytes, b"(l\xEDnea) Tj"));
        assert!(!contains(&bytes, &[0xC3, 0xAD]));
        assert!(contains(&bytes, b"/Encoding /WinAnsiEncoding"));
    }

    #[test]
    fn pdf_has_header_trailer_and_text() {
        let bytes = pdf("hola mundo");
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("(hola mundo) Tj"));
        assert!(text.contains("/BaseFont /Helvetica"));
    }

    #[test]
    fn empty_content_still_produces_one_page() {
        let bytes = pdf("");
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Count 1"));
    }

    #[test]
    fn parentheses_and_backslashes_are_escaped() {
        let bytes = pdf(r"f(x) = \frac");
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains(r"(f\(x\) = \\frac) Tj"));
    }

    #[test]
    fn long_content_spills_onto_more_pages() {
        let body = "línea\n".repeat(LINES_PER_PAGE + 1);
        let bytes = pdf(&body);
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Count 2"));
    }

    #[test]
    fn page_count_matches_pagination() {
        assert_eq!(paginate("").len(), 1);
        assert_eq!(paginate(&"x\n".repeat(LINES_PER_PAGE)).len(), 1);
        assert_eq!(paginate(&"x\n".repeat(LINES_PER_PAGE * 2 + 1)).len(), 3);
    }
}

//! Recover the original HTML from `\fromhtml1` encapsulated RTF.
//!
//! Outlook converts HTML mail to RTF by wrapping every tag in a
//! `{\*\htmltag<N> ...}` group and bracketing RTF-only formatting with
//! `\htmlrtf ... \htmlrtf0`. Text outside both is the visible content.
//! Walking the stream with those two rules gives back the HTML.

/// Marker that identifies HTML-encapsulated RTF.
const FROM_HTML: &[u8] = b"\\fromhtml";

/// Opening of a tag group; a decimal variant and a space follow.
const HTMLTAG_OPEN: &[u8] = b"{\\*\\htmltag";

/// Start of an RTF-only region.
const HTMLRTF_ON: &[u8] = b"\\htmlrtf";

/// End of an RTF-only region.
const HTMLRTF_OFF: &[u8] = b"\\htmlrtf0";

/// Extract the encapsulated HTML, or `None` if the RTF does not encapsulate
/// HTML or nothing but whitespace was recovered.
pub fn recover_html(rtf: &[u8]) -> Option<Vec<u8>> {
    if !is_encapsulated_html(rtf) {
        return None;
    }

    let mut scanner = Scanner {
        rtf,
        pos: 0,
        out: Vec::with_capacity(rtf.len()),
        in_htmlrtf: false,
        seen_tag: false,
    };
    scanner.run();

    let html = scanner.out.trim_ascii();
    if html.is_empty() {
        None
    } else {
        Some(html.to_vec())
    }
}

/// Whether `rtf` is HTML-encapsulated.
pub fn is_encapsulated_html(rtf: &[u8]) -> bool {
    contains(rtf, FROM_HTML)
}

struct Scanner<'a> {
    rtf: &'a [u8],
    pos: usize,
    out: Vec<u8>,
    /// Inside `\htmlrtf ... \htmlrtf0`.
    in_htmlrtf: bool,
    /// A tag group has been seen; everything before it is RTF preamble.
    seen_tag: bool,
}

impl Scanner<'_> {
    fn run(&mut self) {
        let rtf = self.rtf;
        let n = rtf.len();

        while self.pos < n {
            let rest = &rtf[self.pos..];

            if rest.starts_with(HTMLTAG_OPEN) {
                self.tag_group();
                continue;
            }

            // Checked before `\htmlrtf`, which is its prefix.
            if rest.starts_with(HTMLRTF_OFF) {
                self.in_htmlrtf = false;
                self.pos += HTMLRTF_OFF.len();
                self.skip_delimiter();
                continue;
            }

            if rest.starts_with(HTMLRTF_ON) {
                let mut j = self.pos + HTMLRTF_ON.len();
                if j >= n || !rtf[j].is_ascii_alphabetic() {
                    self.in_htmlrtf = true;
                    while j < n && rtf[j].is_ascii_digit() {
                        j += 1;
                    }
                    self.pos = j;
                    self.skip_delimiter();
                    continue;
                }
            }

            if self.in_htmlrtf {
                if rtf[self.pos] == b'\\' {
                    self.pos = skip_control_word(rtf, self.pos);
                } else {
                    self.pos += 1;
                }
                continue;
            }

            match rtf[self.pos] {
                b'{' | b'}' | b'\r' | b'\n' => self.pos += 1,
                b'\\' => self.escape(),
                b => {
                    if self.seen_tag {
                        self.out.push(b);
                    }
                    self.pos += 1;
                }
            }
        }
    }

    /// `{\*\htmltag<N> content}`: decode and emit the content, skip the group.
    fn tag_group(&mut self) {
        let rtf = self.rtf;
        let n = rtf.len();
        let mut j = self.pos + HTMLTAG_OPEN.len();
        while j < n && rtf[j].is_ascii_digit() {
            j += 1;
        }
        if j < n && rtf[j] == b' ' {
            j += 1;
        }

        let content = group_content(rtf, j);
        decode_fragment(content, &mut self.out);
        self.pos = skip_group(rtf, self.pos);
        self.seen_tag = true;
    }

    /// Backslash sequence outside RTF-only regions.
    fn escape(&mut self) {
        let rtf = self.rtf;
        let n = rtf.len();
        let i = self.pos;

        if i + 1 >= n {
            self.pos += 1;
            return;
        }
        if !self.seen_tag {
            self.pos = skip_control_word(rtf, i);
            return;
        }

        match rtf[i + 1] {
            c @ (b'\\' | b'{' | b'}') => {
                self.out.push(c);
                self.pos += 2;
            }
            b'~' => {
                self.out.extend_from_slice(b"&nbsp;");
                self.pos += 2;
            }
            b'_' => {
                self.out.extend_from_slice(b"&#8209;");
                self.pos += 2;
            }
            b'-' | b'\r' | b'\n' => self.pos += 2,
            b'\'' => {
                if i + 3 < n {
                    if let Some(b) = hex_byte(rtf[i + 2], rtf[i + 3]) {
                        self.out.push(b);
                    }
                    self.pos += 4;
                } else {
                    self.pos += 2;
                }
            }
            _ => self.pos = skip_control_word(rtf, i),
        }
    }

    fn skip_delimiter(&mut self) {
        if self.rtf.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }
    }
}

/// Decode RTF escapes inside a tag group's content.
fn decode_fragment(s: &[u8], out: &mut Vec<u8>) {
    let n = s.len();
    let mut i = 0;

    while i < n {
        match s[i] {
            b'\r' | b'\n' => i += 1,
            b'\\' => {
                i += 1;
                if i >= n {
                    break;
                }
                match s[i] {
                    c @ (b'\\' | b'{' | b'}') => {
                        out.push(c);
                        i += 1;
                    }
                    b'\'' => {
                        if i + 2 < n {
                            if let Some(b) = hex_byte(s[i + 1], s[i + 2]) {
                                out.push(b);
                            }
                            i += 3;
                        } else {
                            i += 1;
                        }
                    }
                    b'\r' | b'\n' => i += 1,
                    c if c.is_ascii_alphabetic() => {
                        let start = i;
                        while i < n && s[i].is_ascii_alphabetic() {
                            i += 1;
                        }
                        let word = &s[start..i];
                        i = skip_parameter(s, i);
                        if i < n && s[i] == b' ' {
                            i += 1;
                        }
                        match word {
                            b"par" | b"line" => out.extend_from_slice(b"\r\n"),
                            b"tab" => out.push(b'\t'),
                            _ => {}
                        }
                    }
                    // Unknown control symbol: drop the backslash only.
                    _ => {}
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
}

/// Content of the group whose opening brace precedes `start`, up to (not
/// including) the matching closing brace. Nested groups are kept verbatim;
/// escaped braces do not count.
fn group_content(data: &[u8], start: usize) -> &[u8] {
    let start = start.min(data.len());
    match matching_close(data, start, 1) {
        Some(close) => &data[start..close],
        None => &data[start..],
    }
}

/// Position just past the group opened at `pos`.
fn skip_group(data: &[u8], pos: usize) -> usize {
    if data.get(pos) != Some(&b'{') {
        return pos + 1;
    }
    matching_close(data, pos + 1, 1).map_or(data.len(), |close| close + 1)
}

/// Index of the brace that brings `depth` to zero, scanning from `start`.
fn matching_close(data: &[u8], start: usize, mut depth: usize) -> Option<usize> {
    let mut i = start;
    while i < data.len() {
        match data[i] {
            b'\\' => i += 1,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Position just past the control word or symbol starting at `pos` (a
/// backslash), including its numeric parameter and delimiter space.
fn skip_control_word(data: &[u8], pos: usize) -> usize {
    let end = data.len();
    let mut i = pos + 1;
    if i >= end {
        return end;
    }
    if !data[i].is_ascii_alphabetic() {
        return i + 1;
    }
    while i < end && data[i].is_ascii_alphabetic() {
        i += 1;
    }
    i = skip_parameter(data, i);
    if i < end && data[i] == b' ' {
        i += 1;
    }
    i
}

/// Skip an optional, possibly negative, decimal parameter.
fn skip_parameter(data: &[u8], mut i: usize) -> usize {
    let end = data.len();
    if i < end && (data[i] == b'-' || data[i].is_ascii_digit()) {
        if data[i] == b'-' {
            i += 1;
        }
        while i < end && data[i].is_ascii_digit() {
            i += 1;
        }
    }
    i
}

fn hex_byte(hi: u8, lo: u8) -> Option<u8> {
    let hi = (hi as char).to_digit(16)?;
    let lo = (lo as char).to_digit(16)?;
    Some((hi << 4 | lo) as u8)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

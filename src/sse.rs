//! Incremental server-sent-events decoder for chat-completion streams.

use crate::error::ErrorKind;
use crate::extract::extract_text;

/// Payload that ends a stream regardless of connection state.
pub const DONE_MARKER: &str = "[DONE]";

/// Largest frame buffered while waiting for its blank-line terminator.
/// Anything longer is dropped up to the next frame boundary.
pub const MAX_FRAME_BYTES: usize = 1 << 20;

const PREVIEW_LEN: usize = 120;

/// What a decoded stream yields. Failures never come out of the parser:
/// malformed frames are logged and counted instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Token(String),
    Done,
}

/// Turns raw body chunks into [`Frame`]s.
///
/// - Reassembles UTF-8 sequences split across chunks
/// - Splits frames on blank lines and keeps partial frames buffered
/// - Emits one `Token` per `data:` line with extractable text
/// - Emits `Done` on the `[DONE]` marker or on [`FrameParser::finish`]
///
/// One parser serves one session. After `Done` it ignores further input.
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
    text: String,
    /// Offset in `text` before which no frame terminator can start.
    scanned: usize,
    /// Set while discarding the rest of an oversized frame.
    oversized: bool,
    skipped: usize,
    done: bool,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of malformed data lines and oversized frames dropped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut out = Vec::new();
        if self.done {
            return out;
        }
        self.decode(chunk);

        while let Some(rel) = self.text[self.scanned..].find("\n\n") {
            let end = self.scanned + rel + 2;
            let frame: String = self.text.drain(..end).collect();
            self.scanned = 0;
            if std::mem::take(&mut self.oversized) {
                // Tail of a frame that was already dropped.
                continue;
            }
            self.handle_frame(&frame, &mut out);
            if self.done {
                self.text.clear();
                return out;
            }
        }
        self.bound_buffer();
        out
    }

    /// Flush whatever is buffered and close the sequence.
    pub fn finish(&mut self) -> Vec<Frame> {
        let mut out = Vec::new();
        if self.done {
            return out;
        }
        if !self.pending.is_empty() {
            // The stream ended mid-codepoint; nothing will complete it.
            let tail = std::mem::take(&mut self.pending);
            self.text.push_str(&String::from_utf8_lossy(&tail));
        }
        let rest = std::mem::take(&mut self.text);
        if !self.oversized && !rest.trim().is_empty() {
            self.handle_frame(&rest, &mut out);
        }
        if !self.done {
            self.done = true;
            out.push(Frame::Done);
        }
        out
    }

    /// Caps the unterminated frame and records where the next search starts.
    fn bound_buffer(&mut self) {
        let trailing_newline = self.text.ends_with('\n');
        if self.text.len() > MAX_FRAME_BYTES {
            if !self.oversized {
                self.skipped += 1;
                tracing::warn!(
                    kind = %ErrorKind::MalformedFrame,
                    limit = MAX_FRAME_BYTES,
                    line = preview(&self.text),
                    "dropping oversized SSE frame"
                );
            }
            self.oversized = true;
            self.text.clear();
            if trailing_newline {
                self.text.push('\n');
            }
        }
        // A trailing '\n' may pair with the first byte of the next chunk.
        self.scanned = if trailing_newline {
            self.text.len() - 1
        } else {
            self.text.len()
        };
    }

    fn decode(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(s) => {
                    push_normalized(&mut self.text, s);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = start + e.valid_up_to();
                    // Bytes up to `valid` were just validated.
                    let s = std::str::from_utf8(&self.pending[start..valid]).unwrap_or_default();
                    push_normalized(&mut self.text, s);
                    match e.error_len() {
                        Some(bad) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            start = valid + bad;
                        }
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: &str, out: &mut Vec<Frame>) {
        for line in frame.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let Some(data) = line.strip_prefix("data:") else {
                // event:, id:, retry: carry nothing we use.
                continue;
            };
            let data = data.trim_start();
            if data == DONE_MARKER {
                self.done = true;
                out.push(Frame::Done);
                return;
            }

            match serde_json::from_str::<serde_json::Value>(data) {
                Ok(payload) => {
                    if let Some(text) = extract_text(&payload) {
                        out.push(Frame::Token(text));
                    }
                }
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!(
                        kind = %ErrorKind::MalformedFrame,
                        error = %e,
                        line = preview(data),
                        "skipping malformed SSE data line"
                    );
                }
            }
        }
    }
}

/// Appends `s` with CR dropped so CRLF framing splits like LF framing.
fn push_normalized(buf: &mut String, s: &str) {
    buf.extend(s.chars().filter(|&c| c != '\r'));
}

fn preview(s: &str) -> &str {
    match s.char_indices().nth(PREVIEW_LEN) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(s: &str) -> Frame {
        Frame::Token(s.to_string())
    }

    fn frame(text: &str) -> String {
        format!("data: {{\"choices\":[{{\"delta\":{{\"content\":{}}}}}]}}\n\n", serde_json::json!(text))
    }

    #[test]
    fn single_frame_then_done_marker() {
        let mut p = FrameParser::new();
        assert_eq!(p.push(frame("Hi").as_bytes()), vec![tok("Hi")]);
        assert_eq!(p.push(b"data: [DONE]\n\n"), vec![Frame::Done]);
        assert!(p.is_done());
        assert!(p.push(frame("late").as_bytes()).is_empty());
        assert!(p.finish().is_empty());
    }

    #[test]
    fn frame_split_across_chunks() {
        let mut p = FrameParser::new();
        let f = frame("hello");
        let (a, b) = f.as_bytes().split_at(10);
        assert!(p.push(a).is_empty());
        assert_eq!(p.push(b), vec![tok("hello")]);
    }

    #[test]
    fn multibyte_char_split_across_chunks() {
        let mut p = FrameParser::new();
        let f = frame("héllo 世界 🦀");
        let bytes = f.as_bytes();
        // Split inside the 4-byte crab.
        let crab = f.find('🦀').unwrap();
        let mut events = p.push(&bytes[..crab + 2]);
        assert!(events.is_empty());
        events.extend(p.push(&bytes[crab + 2..]));
        assert_eq!(events, vec![tok("héllo 世界 🦀")]);
    }

    #[test]
    fn byte_at_a_time() {
        let mut p = FrameParser::new();
        let input = format!("{}{}data: [DONE]\n\n", frame("añb"), frame("ç"));
        let mut events = Vec::new();
        for b in input.as_bytes() {
            events.extend(p.push(std::slice::from_ref(b)));
        }
        assert_eq!(events, vec![tok("añb"), tok("ç"), Frame::Done]);
    }

    #[test]
    fn malformed_line_is_skipped() {
        let mut p = FrameParser::new();
        let input = format!("data: {{not json\n\n{}", frame("ok"));
        assert_eq!(p.push(input.as_bytes()), vec![tok("ok")]);
        assert!(!p.is_done());
        assert_eq!(p.skipped(), 1);
    }

    #[test]
    fn terminator_split_between_chunks() {
        let mut p = FrameParser::new();
        assert!(p.push(b"data: {\"content\":\"a\"}\n").is_empty());
        assert_eq!(p.push(b"\ndata: {\"content\":\"b\"}\n"), vec![tok("a")]);
        assert_eq!(p.push(b"\n"), vec![tok("b")]);
    }

    #[test]
    fn long_frame_arriving_in_pieces() {
        let mut p = FrameParser::new();
        let text = "ü".repeat(5000);
        let f = frame(&text);
        let mut events = Vec::new();
        for piece in f.as_bytes().chunks(7) {
            events.extend(p.push(piece));
        }
        assert_eq!(events, vec![tok(&text)]);
    }

    #[test]
    fn oversized_frame_is_dropped_up_to_next_boundary() {
        let mut p = FrameParser::new();
        let filler = "x".repeat(MAX_FRAME_BYTES / 4);
        assert!(p.push(b"data: {\"content\":\"").is_empty());
        for _ in 0..5 {
            assert!(p.push(filler.as_bytes()).is_empty());
        }
        assert_eq!(p.skipped(), 1);
        assert!(p.text.len() <= MAX_FRAME_BYTES);

        let tail = format!("\"}}\n\n{}", frame("ok"));
        assert_eq!(p.push(tail.as_bytes()), vec![tok("ok")]);
        assert_eq!(p.skipped(), 1);
        assert_eq!(p.finish(), vec![Frame::Done]);
    }

    #[test]
    fn finish_drops_unterminated_oversized_frame() {
        let mut p = FrameParser::new();
        let big = format!("data: {{\"content\":\"{}", "y".repeat(MAX_FRAME_BYTES + 1));
        assert!(p.push(big.as_bytes()).is_empty());
        assert_eq!(p.finish(), vec![Frame::Done]);
        assert_eq!(p.skipped(), 1);
    }

    #[test]
    fn comments_and_other_fields_are_ignored() {
        let mut p = FrameParser::new();
        let input = format!(": keep-alive\n\nevent: message\nid: 7\n{}", frame("x"));
        assert_eq!(p.push(input.as_bytes()), vec![tok("x")]);
    }

    #[test]
    fn multiple_data_lines_in_one_frame() {
        let mut p = FrameParser::new();
        let input = "data: {\"content\":\"a\"}\ndata: {\"content\":\"b\"}\n\n";
        assert_eq!(p.push(input.as_bytes()), vec![tok("a"), tok("b")]);
    }

    #[test]
    fn done_marker_stops_mid_frame() {
        let mut p = FrameParser::new();
        let input = "data: {\"content\":\"a\"}\ndata: [DONE]\ndata: {\"content\":\"b\"}\n\n";
        assert_eq!(p.push(input.as_bytes()), vec![tok("a"), Frame::Done]);
    }

    #[test]
    fn crlf_framing() {
        let mut p = FrameParser::new();
        let input = "data: {\"content\":\"a\"}\r\n\r\ndata: [DONE]\r\n\r\n";
        assert_eq!(p.push(input.as_bytes()), vec![tok("a"), Frame::Done]);
    }

    #[test]
    fn finish_flushes_partial_frame() {
        let mut p = FrameParser::new();
        assert!(p.push(b"data: {\"content\":\"tail\"}").is_empty());
        assert_eq!(p.finish(), vec![tok("tail"), Frame::Done]);
    }

    #[test]
    fn finish_without_data_is_just_done() {
        let mut p = FrameParser::new();
        assert_eq!(p.finish(), vec![Frame::Done]);
    }

    #[test]
    fn frames_without_text_yield_nothing() {
        let mut p = FrameParser::new();
        let input = "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\ndata: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n";
        assert!(p.push(input.as_bytes()).is_empty());
    }

    #[test]
    fn no_space_after_data_colon() {
        let mut p = FrameParser::new();
        assert_eq!(p.push(b"data:{\"content\":\"x\"}\n\ndata:[DONE]\n\n"), vec![tok("x"), Frame::Done]);
    }

    #[test]
    fn invalid_bytes_become_replacement() {
        let mut p = FrameParser::new();
        let mut input = b"data: {\"content\":\"a".to_vec();
        input.push(0xff);
        input.extend_from_slice(b"b\"}\n\n");
        assert_eq!(p.push(&input), vec![tok("a\u{fffd}b")]);
    }
}

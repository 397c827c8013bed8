//! Byte chunks to text chunks.

use std::str;

/// Incremental UTF-8 decoding across arbitrary chunk boundaries.
///
/// An incomplete trailing sequence is held back until the next chunk.
/// Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decode as much of `chunk` (plus held-back bytes) as is complete.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        loop {
            match str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    /// Flush held-back bytes at end of stream.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

/// Decodes stdout and keeps the full output for the final detection pass.
#[derive(Debug, Default)]
pub struct OutputFramer {
    decoder: Utf8Decoder,
    accumulated: String,
}

impl OutputFramer {
    /// Decode one chunk. Returns the text it contributes.
    pub fn push(&mut self, chunk: &[u8]) -> String {
        let text = self.decoder.decode(chunk);
        self.accumulated.push_str(&text);
        text
    }

    /// Flush the decoder at end of stream.
    pub fn finish(&mut self) -> String {
        let text = self.decoder.finish();
        self.accumulated.push_str(&text);
        text
    }

    /// Everything decoded so far.
    #[must_use]
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Consume the framer, returning the full output.
    #[must_use]
    pub fn into_accumulated(self) -> String {
        self.accumulated
    }
}

/// Collects stderr as text and splits it into lines for logging.
#[derive(Debug, Default)]
pub struct StderrCollector {
    decoder: Utf8Decoder,
    line: String,
    text: String,
}

impl StderrCollector {
    /// Add one chunk. Returns the lines it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let decoded = self.decoder.decode(chunk);
        self.text.push_str(&decoded);

        let mut lines = Vec::new();
        for c in decoded.chars() {
            if c == '\n' {
                lines.push(std::mem::take(&mut self.line).trim_end_matches('\r').to_string());
            } else {
                self.line.push(c);
            }
        }
        lines
    }

    /// Flush at end of stream. Returns the unterminated last line, if any.
    pub fn finish(&mut self) -> Option<String> {
        let rest = self.decoder.finish();
        self.text.push_str(&rest);
        self.line.push_str(&rest);
        let line = std::mem::take(&mut self.line);
        (!line.is_empty()).then_some(line)
    }

    /// Whether the collected text contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        !needle.is_empty() && self.text.contains(needle)
    }

    /// Everything collected so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

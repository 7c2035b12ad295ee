//! Lazy parser for a top-level JSON array of objects.
//!
//! The scanner is a byte-level state machine tracking string/escape state and nesting
//! depth. JSON's structural characters are all ASCII and never occur inside multi-byte
//! UTF-8 sequences, so scanning bytes is equivalent to scanning characters.
//!
//! Only the bytes of the object currently being scanned are retained; they are released
//! as soon as the object is emitted, so memory stays bounded by the largest object
//! rather than by the input. Objects larger than the buffer ceiling are discarded whole
//! and counted as malformed.

use std::io::{self, Read};

use serde_json::Value;
use tracing::warn;

const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    /// An object whose bytes are being captured
    Object,
    /// A nested array or a string at the top level, scanned but not kept
    Skipped,
}

/// Iterator over the objects of a streamed top-level JSON array.
///
/// Yields `Err` only for I/O failures of the underlying reader; malformed objects are
/// skipped (see [`ArrayStream::malformed_count`]). Input that does not start with `[`,
/// or ends before the closing `]`, simply ends the sequence.
pub struct ArrayStream<R> {
    reader: R,
    chunk: Box<[u8]>,
    pos: usize,
    filled: usize,
    started: bool,
    finished: bool,
    element: Option<Element>,
    depth: usize,
    in_string: bool,
    escaped: bool,
    /// Completed bytes of the current object from earlier chunks
    buffer: Vec<u8>,
    /// Start of the current object's bytes within `chunk`
    capture_from: Option<usize>,
    overflowed: bool,
    max_buffered: usize,
    malformed: usize,
}

impl<R: Read> ArrayStream<R> {
    /// # Arguments
    ///
    /// * `reader` - Source of JSON bytes
    /// * `max_buffered` - Ceiling on retained bytes for a single object
    pub fn new(reader: R, max_buffered: usize) -> Self {
        Self {
            reader,
            chunk: vec![0u8; READ_CHUNK].into_boxed_slice(),
            pos: 0,
            filled: 0,
            started: false,
            finished: false,
            element: None,
            depth: 0,
            in_string: false,
            escaped: false,
            buffer: Vec::new(),
            capture_from: None,
            overflowed: false,
            max_buffered,
            malformed: 0,
        }
    }

    /// Objects skipped so far because they failed to parse or exceeded the ceiling.
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    fn refill(&mut self) -> io::Result<bool> {
        // Carry the unfinished object's bytes over before the chunk is overwritten
        if let Some(from) = self.capture_from.take() {
            self.retain(from, self.filled);
            self.capture_from = Some(0);
        }
        loop {
            match self.reader.read(&mut self.chunk) {
                Ok(n) => {
                    self.pos = 0;
                    self.filled = n;
                    return Ok(n > 0);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn retain(&mut self, from: usize, to: usize) {
        if self.overflowed {
            return;
        }
        if self.buffer.len() + (to - from) > self.max_buffered {
            warn!("Discarding object larger than {} buffered bytes", self.max_buffered);
            self.overflowed = true;
            self.buffer = Vec::new();
            return;
        }
        self.buffer.extend_from_slice(&self.chunk[from..to]);
    }

    fn begin(&mut self, element: Element, depth: usize, in_string: bool) {
        self.element = Some(element);
        self.depth = depth;
        self.in_string = in_string;
        self.escaped = false;
        if element == Element::Object {
            self.capture_from = Some(self.pos - 1);
        }
    }

    /// Finish the current element; returns the object if it parsed.
    fn complete(&mut self) -> Option<Value> {
        let element = self.element.take();
        if element != Some(Element::Object) {
            return None;
        }
        if let Some(from) = self.capture_from.take() {
            self.retain(from, self.pos);
        }

        let overflowed = std::mem::take(&mut self.overflowed);
        let bytes = std::mem::take(&mut self.buffer);
        if overflowed {
            self.malformed += 1;
            return None;
        }
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping malformed object: {}", e);
                self.malformed += 1;
                None
            }
        }
    }

    /// Advance the state machine by one byte. Returns an object when one closes.
    fn step(&mut self, b: u8) -> Option<Value> {
        if !self.started {
            match b {
                b'[' => self.started = true,
                b' ' | b'\n' | b'\r' | b'\t' => {}
                // Not an array: nothing to yield
                _ => self.finished = true,
            }
            return None;
        }

        if self.element.is_none() {
            match b {
                b' ' | b'\n' | b'\r' | b'\t' | b',' => {}
                b']' => self.finished = true,
                b'{' => self.begin(Element::Object, 1, false),
                b'[' => self.begin(Element::Skipped, 1, false),
                b'"' => self.begin(Element::Skipped, 0, true),
                // Numbers and literals contain no structural bytes
                _ => {}
            }
            return None;
        }

        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if b == b'\\' {
                self.escaped = true;
            } else if b == b'"' {
                self.in_string = false;
                if self.depth == 0 {
                    return self.complete();
                }
            }
            return None;
        }

        match b {
            b'"' => self.in_string = true,
            b'{' | b'[' => self.depth += 1,
            b'}' | b']' => {
                self.depth = self.depth.saturating_sub(1);
                if self.depth == 0 {
                    return self.complete();
                }
            }
            _ => {}
        }
        None
    }
}

impl<R: Read> Iterator for ArrayStream<R> {
    type Item = io::Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if self.pos == self.filled {
                match self.refill() {
                    Ok(true) => {}
                    Ok(false) => {
                        // Unterminated input
                        self.finished = true;
                        self.buffer = Vec::new();
                        return None;
                    }
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                }
            }

            while self.pos < self.filled {
                let b = self.chunk[self.pos];
                self.pos += 1;
                if let Some(value) = self.step(b) {
                    return Some(Ok(value));
                }
                if self.finished {
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const LIMIT: usize = 1024 * 1024;

    /// Reader that hands out its parts one `read` call at a time
    struct Pieces {
        parts: Vec<Vec<u8>>,
        next: usize,
        offset: usize,
    }

    impl Pieces {
        fn new(parts: Vec<Vec<u8>>) -> Self {
            Self { parts, next: 0, offset: 0 }
        }
    }

    impl Read for Pieces {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            while self.next < self.parts.len() {
                let part = &self.parts[self.next];
                if self.offset < part.len() {
                    let n = buf.len().min(part.len() - self.offset);
                    buf[..n].copy_from_slice(&part[self.offset..self.offset + n]);
                    self.offset += n;
                    return Ok(n);
                }
                self.next += 1;
                self.offset = 0;
            }
            Ok(0)
        }
    }

    fn collect(input: &[u8]) -> Vec<Value> {
        ArrayStream::new(input, LIMIT).map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_yields_objects_in_order() {
        let input = br#" [ {"id": 1}, {"id": 2, "nested": {"a": [1, 2, {"b": "}"}]}} ,{"id":3} ] "#;
        let values = collect(input);
        assert_eq!(values.len(), 3);
        assert_eq!(values[1]["nested"]["a"][2]["b"], json!("}"));
        assert_eq!(values[2], json!({"id": 3}));
    }

    #[test]
    fn test_braces_and_escapes_inside_strings() {
        let input = br#"[{"t": "a \"quoted\" {brace} and \\"}, {"t": "[x]"}]"#;
        let values = collect(input);
        assert_eq!(values[0]["t"], json!(r#"a "quoted" {brace} and \"#));
        assert_eq!(values[1]["t"], json!("[x]"));
    }

    #[test]
    fn test_malformed_object_is_skipped() {
        let input = br#"[{"id": 1}, {"id": nope}, {"id": 3}]"#;
        let mut stream = ArrayStream::new(&input[..], LIMIT);
        let ids: Vec<_> = stream.by_ref().map(|r| r.unwrap()["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(3)]);
        assert_eq!(stream.malformed_count(), 1);
    }

    #[test]
    fn test_top_level_non_objects_are_skipped() {
        let input = br#"["a {str}", 42, null, [1, {"x": 1}], {"id": 1}]"#;
        assert_eq!(collect(input), vec![json!({"id": 1})]);
    }

    #[test]
    fn test_non_array_root_yields_nothing() {
        assert!(collect(br#"{"id": 1}"#).is_empty());
        assert!(collect(b"").is_empty());
        assert!(collect(b"   ").is_empty());
    }

    #[test]
    fn test_unterminated_stream_ends_quietly() {
        let values = collect(br#"[{"id": 1}, {"id": 2"#);
        assert_eq!(values, vec![json!({"id": 1})]);
    }

    #[test]
    fn test_oversized_object_is_discarded() {
        let big = "x".repeat(200);
        let input = format!(r#"[{{"big": "{}"}}, {{"id": 2}}]"#, big);
        let mut stream = ArrayStream::new(Pieces::new(vec![input.into_bytes()]), 64);
        let values: Vec<_> = stream.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![json!({"id": 2})]);
        assert_eq!(stream.malformed_count(), 1);
    }

    #[test]
    fn test_any_two_chunk_split_yields_same_objects() {
        let input = br#"[{"id":"a","t":"x\"}y"},{"id":"b","m":{"k":[1,{"z":"]"}]}}, {"id":"c"}]"#;
        let expected = collect(input);
        assert_eq!(expected.len(), 3);

        for split in 0..=input.len() {
            let parts = vec![input[..split].to_vec(), input[split..].to_vec()];
            let values: Vec<_> =
                ArrayStream::new(Pieces::new(parts), LIMIT).map(|r| r.unwrap()).collect();
            assert_eq!(values, expected, "split at {}", split);
        }
    }

    #[test]
    fn test_multibyte_text_across_chunks() {
        let input = r#"[{"t":"こんにちは"},{"t":"世界"}]"#.as_bytes();
        let parts: Vec<Vec<u8>> = input.chunks(1).map(<[u8]>::to_vec).collect();
        let values: Vec<_> =
            ArrayStream::new(Pieces::new(parts), LIMIT).map(|r| r.unwrap()).collect();
        assert_eq!(values[0]["t"], json!("こんにちは"));
        assert_eq!(values[1]["t"], json!("世界"));
    }
}

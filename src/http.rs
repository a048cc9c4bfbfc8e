/// A parsed HTTP response header block.
///
/// Fed either whole or one line at a time, as a transfer library's header
/// callback delivers it. Only complete (`CRLF`-terminated) lines are taken;
/// names are stored lower-cased so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeader {
    proto_line: String,
    params: Vec<(String, String)>,
}

impl HttpHeader {
    /// Parse a complete header block.
    pub fn parse(raw: &str) -> Self {
        let mut header = Self::default();
        header.feed(raw);
        header
    }

    /// Append the complete lines of `raw` to this header.
    ///
    /// A line containing `:` is a `name: value` pair and is kept only when
    /// both sides are non-empty after trimming. The first line without `:`
    /// becomes the protocol line. Text after the last `CRLF` is ignored.
    pub fn feed(&mut self, raw: &str) {
        let mut rest = raw;
        while let Some(end) = rest.find("\r\n") {
            let line = &rest[..end];
            rest = &rest[end + 2..];

            match line.split_once(':') {
                Some((name, value)) => {
                    let name = name.trim().to_ascii_lowercase();
                    let value = value.trim();
                    if !name.is_empty() && !value.is_empty() {
                        self.params.push((name, value.to_string()));
                    }
                }
                None if self.proto_line.is_empty() => self.proto_line = line.to_string(),
                None => {}
            }
        }

        if !rest.is_empty() {
            tracing::trace!(len = rest.len(), "ignoring unterminated header text");
        }
    }

    /// Status line, e.g. `HTTP/1.1 200 OK`.
    pub fn proto_line(&self) -> &str {
        &self.proto_line
    }

    /// Last value of `name`; later headers override earlier ones.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Every value of `name`, in the order received.
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Render back to text with `\n` line endings and a closing blank line.
    pub fn header(&self) -> String {
        let mut out = format!("{}\n", self.proto_line);
        for (name, value) in &self.params {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        out
    }

    pub fn clear(&mut self) {
        self.proto_line.clear();
        self.params.clear();
    }
}

use bytes::{Bytes, BytesMut};

/// A server-sent event.
///
/// The wire form of an event is a sequence of `\n` terminated fields
/// (`id`, `event`, one `:` line per comment, `data`), closed by a
/// `\r\n\r\n` terminator. Line breaks inside the data payload are
/// rewritten into `data:` continuation lines so every line is attributed
/// to the event's data.
#[derive(Debug, Clone, Default)]
pub struct SseEvent {
    id: Option<String>,
    event: Option<String>,
    comments: Vec<String>,
    data: Option<Bytes>,
}

impl SseEvent {
    /// Start building an event.
    #[inline]
    pub fn builder() -> SseEventBuilder {
        SseEventBuilder {
            event: SseEvent::default(),
        }
    }

    /// Returns the event id.
    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the event name.
    #[inline]
    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    /// Returns the comment lines.
    #[inline]
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Returns the data payload.
    #[inline]
    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    /// Encode the event into its wire form.
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        if let Some(id) = &self.id {
            out.extend_from_slice(b"id:");
            out.extend_from_slice(id.as_bytes());
            out.extend_from_slice(b"\n");
        }
        if let Some(event) = &self.event {
            out.extend_from_slice(b"event:");
            out.extend_from_slice(event.as_bytes());
            out.extend_from_slice(b"\n");
        }
        for comment in &self.comments {
            // multi line comments become one `:` line each
            for line in split_lines(comment.as_bytes()) {
                out.extend_from_slice(b":");
                out.extend_from_slice(line);
                out.extend_from_slice(b"\n");
            }
        }
        if let Some(data) = &self.data {
            out.extend_from_slice(b"data:");
            let mut lines = split_lines(data);
            if let Some(first) = lines.next() {
                out.extend_from_slice(first);
            }
            for line in lines {
                out.extend_from_slice(b"\r\ndata:");
                out.extend_from_slice(line);
            }
        }
        out.extend_from_slice(b"\r\n\r\n");
        out.freeze()
    }
}

/// Builder returned by [`SseEvent::builder`].
#[derive(Debug, Clone, Default)]
pub struct SseEventBuilder {
    event: SseEvent,
}

impl SseEventBuilder {
    /// Set the event id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.event.id = Some(id.into());
        self
    }

    /// Set the event name.
    pub fn event(mut self, name: impl Into<String>) -> Self {
        self.event.event = Some(name.into());
        self
    }

    /// Append a comment. Line breaks split the comment into multiple
    /// `:` lines.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.event.comments.push(comment.into());
        self
    }

    /// Set the data payload.
    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.event.data = Some(data.into());
        self
    }

    /// Finish the event.
    #[inline]
    pub fn build(self) -> SseEvent {
        self.event
    }
}

/// Split on `\r\n`, `\r` or `\n`.
fn split_lines(bytes: &[u8]) -> SplitLines<'_> {
    SplitLines {
        rest: Some(bytes),
    }
}

struct SplitLines<'a> {
    rest: Option<&'a [u8]>,
}

impl<'a> Iterator for SplitLines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest?;
        match rest.iter().position(|&b| b == b'\r' || b == b'\n') {
            Some(at) => {
                let line = &rest[..at];
                let skip = match (rest[at], rest.get(at + 1)) {
                    (b'\r', Some(b'\n')) => 2,
                    _ => 1,
                };
                self.rest = Some(&rest[at + skip..]);
                Some(line)
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SseEvent;

    #[test]
    fn id_and_multiline_data() {
        let event = SseEvent::builder().id("1").data("line1\nline2").build();
        assert_eq!(&event.encode()[..], b"id:1\ndata:line1\r\ndata:line2\r\n\r\n");
    }

    #[test]
    fn named_event() {
        let event = SseEvent::builder().event("tick").data("x").build();
        assert_eq!(&event.encode()[..], b"event:tick\ndata:x\r\n\r\n");
    }

    #[test]
    fn comments_split_lines() {
        let event = SseEvent::builder().comment("a\r\nb\rc").build();
        assert_eq!(&event.encode()[..], b":a\n:b\n:c\n\r\n\r\n");
    }

    #[test]
    fn crlf_in_data() {
        let event = SseEvent::builder().data("a\r\nb\rc\nd").build();
        assert_eq!(
            &event.encode()[..],
            b"data:a\r\ndata:b\r\ndata:c\r\ndata:d\r\n\r\n"
        );
    }

    #[test]
    fn empty_event_is_terminator_only() {
        let event = SseEvent::builder().build();
        assert_eq!(&event.encode()[..], b"\r\n\r\n");
    }
}

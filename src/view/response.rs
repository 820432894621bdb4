use std::io;

use encoding_rs::Encoding;

/// Destination of a rendered view.
pub trait ResponseSink {
    fn set_content_type(&mut self, content_type: &str);

    /// Write the complete body. Called at most once per render.
    fn write_body(&mut self, body: &str, charset: &'static Encoding) -> io::Result<()>;
}

/// Buffered response: content type plus body encoded with the view charset.
#[derive(Debug, Clone)]
pub struct RenderedResponse {
    pub content_type: String,
    pub body: Vec<u8>,
    charset: &'static Encoding,
}

impl RenderedResponse {
    pub fn new(charset: &'static Encoding) -> Self {
        Self {
            content_type: String::new(),
            body: Vec::new(),
            charset,
        }
    }

    pub fn charset(&self) -> &'static Encoding {
        self.charset
    }

    /// Body decoded back to text.
    pub fn text(&self) -> String {
        let (text, _, _) = self.charset.decode(&self.body);
        text.into_owned()
    }
}

impl ResponseSink for RenderedResponse {
    fn set_content_type(&mut self, content_type: &str) {
        self.content_type = content_type.to_string();
    }

    fn write_body(&mut self, body: &str, charset: &'static Encoding) -> io::Result<()> {
        let (bytes, used, unmappable) = charset.encode(body);
        if unmappable {
            tracing::debug!(charset = used.name(), "Body contains unmappable characters");
        }
        self.charset = used;
        self.body = bytes.into_owned();
        Ok(())
    }
}

/// Collects the body text only.
impl ResponseSink for String {
    fn set_content_type(&mut self, _content_type: &str) {}

    fn write_body(&mut self, body: &str, _charset: &'static Encoding) -> io::Result<()> {
        self.push_str(body);
        Ok(())
    }
}

use crate::error::{Error, Result};

/// A single markup event from the export document
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent {
    /// Opening tag, with decoded attribute values
    Open {
        /// Element name
        name: String,
        /// Attributes in document order
        attributes: Vec<(String, String)>,
        /// Whether the element closes itself (`<Address />`)
        self_closing: bool,
    },
    /// Closing tag
    Close {
        /// Element name
        name: String,
    },
    /// Character data between tags (entity-decoded, never whitespace-only)
    Text(String),
}

/// Scanner for the Twinsoft export XML dialect.
///
/// The export format is flat and predictable - a root element, repeated tag
/// elements, simple children - so the scanner handles exactly that subset:
/// tags, attributes, character data, comments and the XML declaration. It
/// does not handle CDATA or DTDs, which the export never contains.
pub struct XmlScanner {
    /// Source document as character vector
    source: Vec<char>,
    /// Current position in source
    current: usize,
    /// Current line number (1-indexed)
    line: usize,
}

impl XmlScanner {
    /// Creates a new scanner from document text
    pub fn new(source: &str) -> Self {
        XmlScanner {
            source: source.chars().collect(),
            current: 0,
            line: 1,
        }
    }

    /// Line of the event most recently returned
    pub fn line(&self) -> usize {
        self.line
    }

    /// Scans the next event, or `None` at end of document
    pub fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                return Ok(None);
            }

            if self.peek() == '<' {
                if self.lookahead_is("<!--") {
                    self.skip_comment()?;
                    continue;
                }
                if self.lookahead_is("<?") {
                    self.skip_declaration()?;
                    continue;
                }
                return self.scan_tag().map(Some);
            }

            let text = self.scan_text()?;
            if !text.trim().is_empty() {
                return Ok(Some(XmlEvent::Text(text)));
            }
        }
    }

    fn scan_tag(&mut self) -> Result<XmlEvent> {
        self.advance(); // <
        if self.is_at_end() {
            return Err(self.error("unterminated tag at end of document".to_string()));
        }

        if self.peek() == '/' {
            self.advance();
            let name = self.scan_name()?;
            self.skip_whitespace();
            if !self.match_char('>') {
                return Err(self.error(format!("expected '>' after closing tag </{}", name)));
            }
            return Ok(XmlEvent::Close { name });
        }

        let name = self.scan_name()?;
        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                return Err(self.error(format!("unterminated tag <{}", name)));
            }
            match self.peek() {
                '>' => {
                    self.advance();
                    return Ok(XmlEvent::Open {
                        name,
                        attributes,
                        self_closing: false,
                    });
                }
                '/' => {
                    self.advance();
                    if !self.match_char('>') {
                        return Err(self.error(format!("expected '/>' in tag <{}", name)));
                    }
                    return Ok(XmlEvent::Open {
                        name,
                        attributes,
                        self_closing: true,
                    });
                }
                _ => {
                    let attr_name = self.scan_name()?;
                    self.skip_whitespace();
                    if !self.match_char('=') {
                        return Err(self.error(format!("attribute {} without '='", attr_name)));
                    }
                    self.skip_whitespace();
                    let value = self.scan_attribute_value()?;
                    attributes.push((attr_name, value));
                }
            }
        }
    }

    fn scan_name(&mut self) -> Result<String> {
        let start = self.current;
        while !self.is_at_end() {
            let c = self.peek();
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' || c == ':' {
                self.advance();
            } else {
                break;
            }
        }
        if self.current == start {
            return Err(self.error("expected a name".to_string()));
        }
        Ok(self.source[start..self.current].iter().collect())
    }

    fn scan_attribute_value(&mut self) -> Result<String> {
        if self.is_at_end() {
            return Err(self.error("unterminated attribute value".to_string()));
        }
        let quote = self.peek();
        if quote != '"' && quote != '\'' {
            return Err(self.error("attribute value must be quoted".to_string()));
        }
        self.advance();
        let mut value = String::new();
        while !self.is_at_end() && self.peek() != quote {
            value.push(self.advance());
        }
        if self.is_at_end() {
            return Err(self.error("unterminated attribute value".to_string()));
        }
        self.advance(); // closing quote
        decode_entities(&value).map_err(|msg| self.error(msg))
    }

    fn scan_text(&mut self) -> Result<String> {
        let mut text = String::new();
        while !self.is_at_end() && self.peek() != '<' {
            text.push(self.advance());
        }
        decode_entities(&text).map_err(|msg| self.error(msg))
    }

    fn skip_comment(&mut self) -> Result<()> {
        self.current += 4; // <!--
        while !self.is_at_end() {
            if self.lookahead_is("-->") {
                self.current += 3;
                return Ok(());
            }
            self.advance();
        }
        Err(self.error("unterminated comment".to_string()))
    }

    fn skip_declaration(&mut self) -> Result<()> {
        while !self.is_at_end() {
            if self.lookahead_is("?>") {
                self.current += 2;
                return Ok(());
            }
            self.advance();
        }
        Err(self.error("unterminated XML declaration".to_string()))
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn lookahead_is(&self, expected: &str) -> bool {
        self.source[self.current..]
            .iter()
            .zip(expected.chars())
            .filter(|(a, b)| **a == *b)
            .count()
            == expected.chars().count()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
        }
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> char {
        self.source[self.current]
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn error(&self, message: String) -> Error {
        Error::malformed(String::new(), self.line, message)
    }
}

/// Decodes the five predefined XML entities.
fn decode_entities(text: &str) -> std::result::Result<String, String> {
    if !text.contains('&') {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '&' {
            out.push(c);
            continue;
        }
        let mut entity = String::new();
        for e in chars.by_ref() {
            if e == ';' {
                break;
            }
            entity.push(e);
            if entity.len() > 6 {
                return Err(format!("unterminated entity '&{}'", entity));
            }
        }
        match entity.as_str() {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            other => return Err(format!("unknown entity '&{};'", other)),
        }
    }
    Ok(out)
}

/// Encodes the five predefined XML entities in element or attribute text.
pub fn encode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(source: &str) -> Vec<XmlEvent> {
        let mut scanner = XmlScanner::new(source);
        let mut events = Vec::new();
        while let Some(event) = scanner.next_event().unwrap() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_simple_element() {
        let evts = events("<Group>CHAMBER 1</Group>");
        assert_eq!(
            evts,
            vec![
                XmlEvent::Open {
                    name: "Group".to_string(),
                    attributes: vec![],
                    self_closing: false
                },
                XmlEvent::Text("CHAMBER 1".to_string()),
                XmlEvent::Close {
                    name: "Group".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_self_closing_and_attributes() {
        let evts = events(r#"<Tag Name="LT_101"><InitalValue /></Tag>"#);
        assert_eq!(
            evts[0],
            XmlEvent::Open {
                name: "Tag".to_string(),
                attributes: vec![("Name".to_string(), "LT_101".to_string())],
                self_closing: false
            }
        );
        assert_eq!(
            evts[1],
            XmlEvent::Open {
                name: "InitalValue".to_string(),
                attributes: vec![],
                self_closing: true
            }
        );
    }

    #[test]
    fn test_declaration_and_comment_skipped() {
        let evts = events(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!-- exported -->\n<TWinSoftTags></TWinSoftTags>",
        );
        assert_eq!(evts.len(), 2);
    }

    #[test]
    fn test_entity_decoding() {
        let evts = events("<Comment>flow &lt; 5 &amp; rising</Comment>");
        assert_eq!(evts[1], XmlEvent::Text("flow < 5 & rising".to_string()));
    }

    #[test]
    fn test_unterminated_tag_is_error() {
        let mut scanner = XmlScanner::new("<Tag Name=\"X\"");
        scanner.next_event().unwrap_err();
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let raw = "a < b & \"c\"";
        assert_eq!(decode_entities(&encode_entities(raw)).unwrap(), raw);
    }
}

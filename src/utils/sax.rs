//! Streaming XML tokenizer
//!
//! A callback driven, reentrant, allocation-free XML parser covering the
//! subset used by SVG embroidery files: elements with single- or
//! double-quoted attributes, comments, doctype declarations and processing
//! instructions. Text content other than whitespace is an error.
//!
//! Tokens borrow from the input text and carry their 1-based row and
//! column plus byte index and length. Given an element-opening token, the
//! parse can re-enter the document at that element: [`parse_attributes`]
//! walks its attributes only, [`parse_children`] its inner elements and
//! [`parse_siblings`] the element and everything following it until the
//! parent scope closes.

use crate::utils::error::{Error, Result};

/// Token referencing a span of the parsed text
#[derive(Debug, Clone, Copy)]
pub struct SaxToken<'a> {
    /// Row of the token, 1-based
    pub row: usize,
    /// Column of the token, 1-based
    pub column: usize,
    /// Byte index of the token relative to the beginning of the text
    pub index: usize,
    /// Byte length of the token
    pub length: usize,
    input: &'a str,
}

impl<'a> SaxToken<'a> {
    /// The token's text
    pub fn text(&self) -> &'a str {
        &self.input[self.index..self.index + self.length]
    }
}

/// Parse event delivered to the handler callback
#[derive(Debug, Clone, Copy)]
pub enum SaxEvent<'a> {
    /// An element is opening; the token is its name
    ElementOpening(SaxToken<'a>),
    /// An element is closing; the token is its name
    ElementClosing(SaxToken<'a>),
    /// An attribute of the currently opening element
    Attribute {
        /// Attribute name token
        name: SaxToken<'a>,
        /// Attribute value token, without the quotes
        value: SaxToken<'a>,
    },
}

type Handler<'h, 'a> = &'h mut dyn FnMut(SaxEvent<'a>) -> bool;

struct Cursor<'a> {
    input: &'a str,
    bytes: &'a [u8],
    row: usize,
    column: usize,
    index: usize,
}

struct State {
    level: i32,
}

fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r')
}

fn valid_name_char(c: u8) -> bool {
    c != 0 && !is_space(c) && c != b'=' && c != b'/' && c != b'>'
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            row: 1,
            column: 1,
            index: 0,
        }
    }

    fn from_token(token: &SaxToken<'a>) -> Self {
        Self {
            input: token.input,
            bytes: token.input.as_bytes(),
            row: token.row,
            column: token.column,
            index: token.index,
        }
    }

    /// Current byte, 0 at end of input
    fn peek(&self) -> u8 {
        self.bytes.get(self.index).copied().unwrap_or(0)
    }

    fn peek_at(&self, ahead: usize) -> u8 {
        self.bytes.get(self.index + ahead).copied().unwrap_or(0)
    }

    fn advance(&mut self) {
        match self.peek() {
            0 => {}
            b'\n' => {
                self.row += 1;
                self.column = 1;
                self.index += 1;
            }
            _ => {
                self.column += 1;
                self.index += 1;
            }
        }
    }

    fn token(&self, length: usize) -> SaxToken<'a> {
        SaxToken {
            row: self.row,
            column: self.column,
            index: self.index,
            length,
            input: self.input,
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::Xml {
            row: self.row,
            column: self.column,
            message: message.to_string(),
        }
    }
}

fn parse_name<'a>(c: &mut Cursor<'a>) -> SaxToken<'a> {
    let start = c.token(0);
    let mut length = 0;
    while valid_name_char(c.peek()) {
        length += 1;
        c.advance();
    }
    SaxToken { length, ..start }
}

fn parse_attribute_value<'a>(c: &mut Cursor<'a>, quote: u8) -> SaxToken<'a> {
    let start = c.token(0);
    let mut length = 0;
    while c.peek() != 0 && c.peek() != quote {
        length += 1;
        c.advance();
    }
    SaxToken { length, ..start }
}

fn element_closing<'a>(
    name: SaxToken<'a>,
    state: &mut State,
    handler: Handler<'_, 'a>,
) -> Result<()> {
    let valid = if state.level > 0 {
        handler(SaxEvent::ElementClosing(name))
    } else {
        true
    };
    state.level -= 1;

    if valid {
        Ok(())
    } else {
        Err(Error::Aborted)
    }
}

fn parse_element_closing<'a>(
    c: &mut Cursor<'a>,
    state: &mut State,
    handler: Handler<'_, 'a>,
) -> Result<()> {
    let name = parse_name(c);

    while is_space(c.peek()) {
        c.advance();
    }
    if c.peek() != b'>' {
        return Err(c.error("Expected '>'"));
    }
    c.advance();

    element_closing(name, state, handler)
}

fn parse_attribute<'a>(c: &mut Cursor<'a>, handler: Handler<'_, 'a>) -> Result<()> {
    let name = parse_name(c);

    if c.peek() != b'=' {
        return Err(c.error("Expected '='"));
    }
    c.advance();

    let quote = c.peek();
    if quote != b'\'' && quote != b'"' {
        return Err(c.error("Expected ' or \""));
    }
    c.advance();

    let value = parse_attribute_value(c, quote);

    if c.peek() != quote {
        return Err(c.error("Expected ' or \""));
    }
    c.advance();

    if !handler(SaxEvent::Attribute { name, value }) {
        return Err(Error::Aborted);
    }

    Ok(())
}

fn parse_attribute_list<'a>(c: &mut Cursor<'a>, handler: Handler<'_, 'a>) -> Result<()> {
    loop {
        while is_space(c.peek()) {
            c.advance();
        }

        if c.peek() == b'/' || c.peek() == b'>' {
            return Ok(());
        }

        parse_attribute(c, handler)?;
    }
}

fn parse_element_opening<'a>(
    c: &mut Cursor<'a>,
    state: &mut State,
    handler: Handler<'_, 'a>,
) -> Result<()> {
    let name = parse_name(c);

    state.level += 1;
    if !handler(SaxEvent::ElementOpening(name)) {
        return Err(Error::Aborted);
    }

    parse_attribute_list(c, handler)?;

    if c.peek() == b'/' {
        c.advance();
        element_closing(name, state, handler)?;
    }

    if c.peek() != b'>' {
        return Err(c.error("Expected '>'"));
    }
    c.advance();

    Ok(())
}

fn parse_comment(c: &mut Cursor<'_>) -> Result<()> {
    while c.peek() != 0 {
        if c.peek() == b'-' && c.peek_at(1) == b'-' && c.peek_at(2) == b'>' {
            c.advance();
            c.advance();
            c.advance();
            return Ok(());
        }
        c.advance();
    }

    Err(c.error("Unexpected end in comment"))
}

fn parse_declaration(c: &mut Cursor<'_>) -> Result<()> {
    while c.peek() != 0 {
        if c.peek() == b'>' {
            c.advance();
            return Ok(());
        }
        c.advance();
    }

    Err(c.error("Unexpected end in declaration"))
}

fn parse_processing(c: &mut Cursor<'_>) -> Result<()> {
    while c.peek() != 0 {
        if c.peek() == b'?' && c.peek_at(1) == b'>' {
            c.advance();
            c.advance();
            return Ok(());
        }
        c.advance();
    }

    Err(c.error("Unexpected end in processing instruction"))
}

/// Parse one element with the cursor just past its `<`
fn parse_element<'a>(
    c: &mut Cursor<'a>,
    state: &mut State,
    handler: Handler<'_, 'a>,
) -> Result<()> {
    if c.peek() == b'/' {
        c.advance();
        return parse_element_closing(c, state, handler);
    }

    if c.peek() == b'!' {
        c.advance();

        if c.peek() == b'-' && c.peek_at(1) == b'-' {
            c.advance();
            c.advance();
            return parse_comment(c);
        }

        return parse_declaration(c);
    }

    if c.peek() == b'?' {
        c.advance();
        return parse_processing(c);
    }

    parse_element_opening(c, state, handler)
}

fn parse_scope<'a>(c: &mut Cursor<'a>, state: &mut State, handler: Handler<'_, 'a>) -> Result<()> {
    let mut element_count = 0;

    while c.peek() != 0 && (element_count == 0 || state.level >= 0) {
        if c.peek() == b'<' {
            c.advance();
            element_count += 1;
            parse_element(c, state, handler)?;
        } else if is_space(c.peek()) {
            c.advance();
        } else {
            return Err(c.error("Unrecognized character"));
        }
    }

    Ok(())
}

/// Parse a complete XML text
///
/// The handler receives element-opening, element-closing and attribute
/// events in document order and aborts the parse by returning false.
pub fn parse_text<'a>(
    text: &'a str,
    mut handler: impl FnMut(SaxEvent<'a>) -> bool,
) -> Result<()> {
    let mut cursor = Cursor::new(text);
    let mut state = State { level: 0 };

    parse_scope(&mut cursor, &mut state, &mut handler)
}

/// Re-parse the attributes of the element at the given opening token
pub fn parse_attributes<'a>(
    element: SaxToken<'a>,
    mut handler: impl FnMut(SaxEvent<'a>) -> bool,
) -> Result<()> {
    let mut cursor = Cursor::from_token(&element);
    parse_name(&mut cursor);

    parse_attribute_list(&mut cursor, &mut handler)
}

/// Skip over the element at the given opening token
///
/// Returns the cursor placed after the element's attribute list and
/// whether the element closed itself, with the scope level adjusted the
/// way the element left it.
fn skip_element_opening<'a>(element: &SaxToken<'a>, state: &mut State) -> Result<(Cursor<'a>, bool)> {
    let mut cursor = Cursor::from_token(element);
    let mut closed = false;

    let mut probe = |event: SaxEvent<'_>| {
        if matches!(event, SaxEvent::ElementClosing(_)) {
            closed = true;
        }
        true
    };
    parse_element(&mut cursor, state, &mut probe)?;

    Ok((cursor, closed))
}

/// Re-parse the child elements of the element at the given opening token
pub fn parse_children<'a>(
    element: SaxToken<'a>,
    mut handler: impl FnMut(SaxEvent<'a>) -> bool,
) -> Result<()> {
    let mut state = State { level: 0 };
    let (mut cursor, closed) = skip_element_opening(&element, &mut state)?;

    if closed {
        return Ok(());
    }
    state.level -= 1;

    parse_scope(&mut cursor, &mut state, &mut handler)
}

/// Re-parse the elements following the one at the given opening token
///
/// Walks this element's following siblings until the parent scope closes.
pub fn parse_siblings<'a>(
    element: SaxToken<'a>,
    mut handler: impl FnMut(SaxEvent<'a>) -> bool,
) -> Result<()> {
    let mut state = State { level: 0 };
    let (mut cursor, closed) = skip_element_opening(&element, &mut state)?;

    if !closed {
        state.level -= 1;

        let mut noop = |_: SaxEvent<'_>| true;
        parse_scope(&mut cursor, &mut state, &mut noop)?;

        state.level += 1;
    }

    parse_scope(&mut cursor, &mut state, &mut handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(text: &str) -> Result<Vec<String>> {
        let mut events = Vec::new();
        parse_text(text, |event| {
            events.push(match event {
                SaxEvent::ElementOpening(name) => format!("<{}", name.text()),
                SaxEvent::ElementClosing(name) => format!(">{}", name.text()),
                SaxEvent::Attribute { name, value } => {
                    format!("{}={}", name.text(), value.text())
                }
            });
            true
        })?;
        Ok(events)
    }

    #[test]
    fn test_self_closing_element() {
        let events = collect("<a x='1' y=\"2\"/>").unwrap();
        assert_eq!(events, ["<a", "x=1", "y=2", ">a"]);
    }

    #[test]
    fn test_paired_elements() {
        let events = collect("<a>\n  <b/>\n</a>\n").unwrap();
        assert_eq!(events, ["<a", "<b", ">b", ">a"]);
    }

    #[test]
    fn test_comment_doctype_and_pi() {
        let events = collect("<?xml version=\"1.0\"?>\n<!DOCTYPE svg>\n<!-- note -->\n<a/>")
            .unwrap();
        assert_eq!(events, ["<a", ">a"]);
    }

    #[test]
    fn test_missing_equals() {
        // Quotes are valid name characters, so the name swallows `x'1'`
        // and the error lands on the `/`.
        let err = collect("<a x'1'/>").unwrap_err();
        match err {
            Error::Xml { row, column, message } => {
                assert_eq!((row, column), (1, 8));
                assert_eq!(message, "Expected '='");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unbalanced_quote() {
        assert!(matches!(
            collect("<a x='1\"/>"),
            Err(Error::Xml { message, .. }) if message == "Expected ' or \""
        ));
    }

    #[test]
    fn test_unterminated_comment() {
        assert!(matches!(
            collect("<!-- never closed"),
            Err(Error::Xml { message, .. }) if message == "Unexpected end in comment"
        ));
    }

    #[test]
    fn test_text_content_is_an_error() {
        let err = collect("<a>text</a>").unwrap_err();
        match err {
            Error::Xml { row, column, message } => {
                assert_eq!((row, column), (1, 4));
                assert_eq!(message, "Unrecognized character");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_token_positions_track_rows() {
        let mut positions = Vec::new();
        parse_text("<a>\n  <b c=\"v\"/>\n</a>\n", |event| {
            if let SaxEvent::ElementOpening(name) = event {
                positions.push((name.text().to_string(), name.row, name.column));
            }
            true
        })
        .unwrap();
        assert_eq!(
            positions,
            [("a".to_string(), 1, 2), ("b".to_string(), 2, 4)]
        );
    }

    #[test]
    fn test_abort_from_handler() {
        let result = parse_text("<a><b/></a>", |event| {
            !matches!(event, SaxEvent::ElementOpening(name) if name.text() == "b")
        });
        assert!(matches!(result, Err(Error::Aborted)));
    }

    #[test]
    fn test_reentry_attributes() {
        let mut attrs = Vec::new();
        parse_text("<a x='1'><b y='2'/></a>", |event| {
            if let SaxEvent::ElementOpening(name) = event {
                if name.text() == "a" {
                    parse_attributes(name, |sub| {
                        if let SaxEvent::Attribute { name, value } = sub {
                            attrs.push(format!("{}={}", name.text(), value.text()));
                        }
                        true
                    })
                    .unwrap();
                }
            }
            true
        })
        .unwrap();
        assert_eq!(attrs, ["x=1"]);
    }
}

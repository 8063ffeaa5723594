//! SVG embroidery decoder
//!
//! Decodes the restricted SVG text form produced by the SVG embroidery
//! encoder. The decoder makes two passes over the text with the streaming
//! XML tokenizer: the first enumerates distinct path stroke colors in
//! document order, assigning each a thread templated from the nearest
//! palette entry but carrying the exact RGB, and picks up an optional
//! `<g transform="matrix(...)">` wrapper; the second walks the paths,
//! emitting a block per path and a stitch per `d` coordinate pair.
//!
//! Path `d` data accepts only `M` and `L` commands, each followed by two
//! whitespace-separated floating-point numbers.

use crate::core::matrix::PesTransform;
use crate::core::thread::{PecThread, Rgb};
use crate::palettes::thread_pec::{palette_index_by_rgb, palette_thread_by_index};
use crate::utils::error::{Error, Result};
use crate::utils::sax::{self, SaxEvent, SaxToken};

/// Largest number of threads an SVG embroidery document can reference
pub const MAX_THREADS: usize = 256;

/// Event delivered while iterating an SVG embroidery document
#[derive(Debug, Clone)]
pub enum SvgEmbStitchEvent {
    /// A path element is starting a new color run
    Block {
        /// Index of the path in document order
        block_index: usize,
        /// Thread matching the path's stroke color
        thread: PecThread,
        /// Number of coordinate pairs in the path
        stitch_count: usize,
    },
    /// A coordinate pair within the current path
    Stitch {
        /// Index of the stitch within its path
        stitch_index: usize,
        /// X coordinate in millimeters
        x: f32,
        /// Y coordinate in millimeters
        y: f32,
    },
}

/// One-shot decoder over a complete SVG embroidery text
pub struct SvgEmbDecoder {
    text: String,
    affine_transform: PesTransform,
    thread_list: Vec<PecThread>,
}

impl SvgEmbDecoder {
    /// Create a decoder over a copy of the given text
    ///
    /// The thread enumeration pass runs here, so color and syntax errors
    /// in path strokes surface immediately.
    pub fn new(text: &str) -> Result<Self> {
        let mut decoder = Self {
            text: text.to_string(),
            affine_transform: PesTransform::identity(),
            thread_list: Vec::new(),
        };

        decoder.init_threads()?;

        Ok(decoder)
    }

    /// The affine transform of the `<g>` wrapper, identity when absent
    pub fn affine_transform(&self) -> PesTransform {
        self.affine_transform
    }

    /// Number of distinct stroke colors in document order
    pub fn thread_count(&self) -> usize {
        self.thread_list.len()
    }

    /// Thread at the given 0-based index
    pub fn thread(&self, thread_index: usize) -> PecThread {
        self.thread_list
            .get(thread_index)
            .cloned()
            .unwrap_or_else(PecThread::undefined)
    }

    fn find_thread_index(&self, rgb: Rgb) -> Option<usize> {
        self.thread_list.iter().position(|thread| thread.rgb == rgb)
    }

    /// First pass: collect stroke colors and the group transform
    fn init_threads(&mut self) -> Result<()> {
        let mut failure = None;
        let mut path_element = false;
        let mut transform = self.affine_transform;
        let mut thread_list: Vec<PecThread> = Vec::new();

        let parsed = sax::parse_text(&self.text, |event| match event {
            SaxEvent::ElementOpening(element) => {
                path_element = element.text() == "path";

                if element.text() == "g" {
                    if let Err(error) = parse_group_transform(element, &mut transform) {
                        failure = Some(error);
                        return false;
                    }
                }

                true
            }
            SaxEvent::Attribute { name, value } => {
                if path_element && name.text() == "stroke" {
                    let rgb = match parse_rgb(&value) {
                        Ok(rgb) => rgb,
                        Err(error) => {
                            failure = Some(error);
                            return false;
                        }
                    };

                    if !thread_list.iter().any(|thread| thread.rgb == rgb) {
                        if thread_list.len() >= MAX_THREADS {
                            failure = Some(Error::Range(format!(
                                "thread count outside 1..={}",
                                MAX_THREADS
                            )));
                            return false;
                        }

                        let mut thread =
                            palette_thread_by_index(palette_index_by_rgb(rgb));
                        thread.rgb = rgb;
                        thread.index = thread_list.len();
                        thread_list.push(thread);
                    }
                }

                true
            }
            SaxEvent::ElementClosing(_) => true,
        });

        match (parsed, failure) {
            (Err(Error::Aborted), Some(error)) => Err(error),
            (Err(error), _) => Err(error),
            (Ok(()), _) => {
                self.affine_transform = transform;
                self.thread_list = thread_list;
                Ok(())
            }
        }
    }

    /// Iterate the document's paths and coordinates in order
    ///
    /// Each path delivers one Block event followed by its Stitch events.
    /// Returning false aborts the iteration.
    pub fn for_each_stitch<F>(&self, mut event_cb: F) -> Result<()>
    where
        F: FnMut(SvgEmbStitchEvent) -> bool,
    {
        let mut failure = None;
        let mut path_element = false;
        let mut block_index = 0usize;
        let mut stitch_index = 0usize;
        let mut aborted_by_caller = false;

        let parsed = sax::parse_text(&self.text, |event| match event {
            SaxEvent::ElementOpening(element) => {
                if element.text() != "path" {
                    return true;
                }
                path_element = true;
                stitch_index = 0;

                match self.scan_path_header(element) {
                    Ok((thread, stitch_count)) => {
                        let block = SvgEmbStitchEvent::Block {
                            block_index,
                            thread,
                            stitch_count,
                        };
                        block_index += 1;

                        if event_cb(block) {
                            true
                        } else {
                            aborted_by_caller = true;
                            false
                        }
                    }
                    Err(error) => {
                        failure = Some(error);
                        false
                    }
                }
            }
            SaxEvent::Attribute { name, value } => {
                if !path_element || name.text() != "d" {
                    return true;
                }

                let emit = parse_path_data(value.text(), &mut |x, y| {
                    let stitch = SvgEmbStitchEvent::Stitch {
                        stitch_index,
                        x,
                        y,
                    };
                    stitch_index += 1;

                    if event_cb(stitch) {
                        true
                    } else {
                        aborted_by_caller = true;
                        false
                    }
                });

                match emit {
                    Ok(()) => true,
                    Err(PathDataError::Aborted) => false,
                    Err(PathDataError::Syntax) => {
                        failure = Some(path_data_error(&value));
                        false
                    }
                }
            }
            SaxEvent::ElementClosing(_) => true,
        });

        match (parsed, failure) {
            (Err(Error::Aborted), Some(error)) => Err(error),
            (Err(Error::Aborted), None) if aborted_by_caller => Err(Error::Aborted),
            (Err(error), _) => Err(error),
            (Ok(()), _) => Ok(()),
        }
    }

    /// Parse a path's attributes to resolve its thread and stitch count
    fn scan_path_header(&self, element: SaxToken<'_>) -> Result<(PecThread, usize)> {
        let mut failure = None;
        let mut thread_index = None;
        let mut stitch_count = 0usize;

        let parsed = sax::parse_attributes(element, |event| {
            if let SaxEvent::Attribute { name, value } = event {
                if name.text() == "d" {
                    let counted = parse_path_data(value.text(), &mut |_, _| {
                        stitch_count += 1;
                        true
                    });
                    if counted.is_err() {
                        failure = Some(path_data_error(&value));
                        return false;
                    }
                } else if name.text() == "stroke" {
                    match parse_rgb(&value) {
                        Ok(rgb) => thread_index = self.find_thread_index(rgb),
                        Err(error) => {
                            failure = Some(error);
                            return false;
                        }
                    }
                }
            }
            true
        });

        match (parsed, failure) {
            (Err(Error::Aborted), Some(error)) => return Err(error),
            (Err(error), _) => return Err(error),
            (Ok(()), _) => {}
        }

        match thread_index {
            Some(thread_index) => Ok((self.thread(thread_index), stitch_count)),
            None => Err(Error::Svg {
                row: element.row,
                column: element.column,
                message: "Missing \"stroke\" attribute".to_string(),
            }),
        }
    }
}

enum PathDataError {
    Syntax,
    Aborted,
}

fn path_data_error(value: &SaxToken<'_>) -> Error {
    Error::Svg {
        row: value.row,
        column: value.column,
        message: "Malformed \"d\" attribute".to_string(),
    }
}

/// Parse a `d` attribute of `M`/`L` commands with two coordinates each
fn parse_path_data(
    d: &str,
    point_cb: &mut dyn FnMut(f32, f32) -> bool,
) -> std::result::Result<(), PathDataError> {
    let mut rest = d.trim_start();

    while !rest.is_empty() {
        let command = rest.as_bytes()[0];
        if command != b'M' && command != b'L' {
            return Err(PathDataError::Syntax);
        }
        rest = &rest[1..];

        let (x, after_x) = parse_coordinate(rest).ok_or(PathDataError::Syntax)?;
        let (y, after_y) = parse_coordinate(after_x).ok_or(PathDataError::Syntax)?;
        rest = after_y;

        if !point_cb(x, y) {
            return Err(PathDataError::Aborted);
        }

        rest = rest.trim_start();
    }

    Ok(())
}

/// Parse one leading floating-point number, returning it and the rest
fn parse_coordinate(s: &str) -> Option<(f32, &str)> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        let digits = exp;
        while exp < bytes.len() && bytes[exp].is_ascii_digit() {
            exp += 1;
        }
        if exp > digits {
            end = exp;
        }
    }

    let value: f32 = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

/// Parse a `#rrggbb` stroke color token
fn parse_rgb(value: &SaxToken<'_>) -> Result<Rgb> {
    let text = value.text();
    let bytes = text.as_bytes();

    if bytes.len() == 7
        && bytes[0] == b'#'
        && bytes[1..].iter().all(|b| b.is_ascii_hexdigit())
    {
        let component =
            |i: usize| u8::from_str_radix(&text[i..i + 2], 16).unwrap_or_default();
        return Ok(Rgb::new(component(1), component(3), component(5)));
    }

    Err(Error::Svg {
        row: value.row,
        column: value.column,
        message: "Invalid color not in #RRGGBB hex format".to_string(),
    })
}

/// Parse a `<g>` element's `transform="matrix(a b c d e f)"` attribute
fn parse_group_transform(
    element: SaxToken<'_>,
    transform: &mut PesTransform,
) -> Result<()> {
    let mut failure = None;

    let parsed = sax::parse_attributes(element, |event| {
        if let SaxEvent::Attribute { name, value } = event {
            if name.text() == "transform" {
                match parse_matrix(value.text()) {
                    Some(parsed) => *transform = parsed,
                    None => {
                        failure = Some(Error::Svg {
                            row: value.row,
                            column: value.column,
                            message: "Malformed transform matrix".to_string(),
                        });
                        return false;
                    }
                }
            }
        }
        true
    });

    match (parsed, failure) {
        (Err(Error::Aborted), Some(error)) => Err(error),
        (Err(error), _) => Err(error),
        (Ok(()), _) => Ok(()),
    }
}

fn parse_matrix(text: &str) -> Option<PesTransform> {
    let inner = text.trim().strip_prefix("matrix(")?.strip_suffix(')')?;

    let mut entries = [0.0f32; 6];
    let mut count = 0;
    for part in inner.split_whitespace() {
        if count == entries.len() {
            return None;
        }
        entries[count] = part.parse().ok()?;
        count += 1;
    }
    if count != entries.len() {
        return None;
    }

    Some(PesTransform::from_parts(
        entries[0], entries[1], entries[2], entries[3], entries[4], entries[5],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_COLOR_SVG: &str = "<?xml version=\"1.0\"?>\n\
        <svg width=\"10.0mm\" height=\"10.0mm\" version=\"1.1\"\n\
        \x20    viewBox=\"0.0 0.0 10.0 10.0\" xmlns=\"http://www.w3.org/2000/svg\">\n\
        \x20 <path stroke=\"#feca15\" fill=\"none\" stroke-width=\"0.2\"\n\
        \x20       d=\"M   0.0   0.0 L  10.0   0.0\" />\n\
        \x20 <path stroke=\"#96aa02\" fill=\"none\" stroke-width=\"0.2\"\n\
        \x20       d=\"M  10.0  10.0 L   0.0  10.0\" />\n\
        </svg>\n";

    #[test]
    fn test_threads_enumerated_in_document_order() {
        let decoder = SvgEmbDecoder::new(TWO_COLOR_SVG).unwrap();
        assert_eq!(decoder.thread_count(), 2);

        // The exact stroke RGB wins over the palette template color.
        let khaki = decoder.thread(0);
        assert_eq!(khaki.rgb, Rgb::new(0xfe, 0xca, 0x15));
        assert_eq!(khaki.name, "Khaki");
        assert_eq!(khaki.index, 0);

        let olive = decoder.thread(1);
        assert_eq!(olive.rgb, Rgb::new(0x96, 0xaa, 0x02));
        assert_eq!(olive.name, "Dark Olive");
        assert_eq!(olive.index, 1);

        assert!(decoder.affine_transform().is_identity());
    }

    #[test]
    fn test_repeated_color_is_one_thread() {
        let text = "<svg>\n\
            \x20 <path stroke=\"#feca15\" d=\"M 0 0\" />\n\
            \x20 <path stroke=\"#feca15\" d=\"M 1 1\" />\n\
            </svg>\n";
        let decoder = SvgEmbDecoder::new(text).unwrap();
        assert_eq!(decoder.thread_count(), 1);
    }

    #[test]
    fn test_blocks_and_stitches() {
        let decoder = SvgEmbDecoder::new(TWO_COLOR_SVG).unwrap();

        let mut events = Vec::new();
        decoder
            .for_each_stitch(|event| {
                events.push(match event {
                    SvgEmbStitchEvent::Block {
                        block_index,
                        thread,
                        stitch_count,
                    } => format!("block {} {} {}", block_index, thread.index, stitch_count),
                    SvgEmbStitchEvent::Stitch {
                        stitch_index,
                        x,
                        y,
                    } => format!("stitch {} {} {}", stitch_index, x, y),
                });
                true
            })
            .unwrap();

        assert_eq!(
            events,
            vec![
                "block 0 0 2",
                "stitch 0 0 0",
                "stitch 1 10 0",
                "block 1 1 2",
                "stitch 0 10 10",
                "stitch 1 0 10",
            ]
        );
    }

    #[test]
    fn test_group_transform() {
        let text = "<svg>\n\
            \x20 <g transform=\"matrix(1.0000000 0.0000000 0.0000000 1.0000000 4.0000000 -2.0000000)\">\n\
            \x20   <path stroke=\"#000000\" d=\"M 0 0\" />\n\
            \x20 </g>\n\
            </svg>\n";
        let decoder = SvgEmbDecoder::new(text).unwrap();
        let transform = decoder.affine_transform();
        assert_eq!(transform.translation(), (4.0, -2.0));
    }

    #[test]
    fn test_stroke_not_hex_is_an_error() {
        let text = "<svg><path stroke=\"red\" d=\"M 0 0\" /></svg>";
        assert!(matches!(
            SvgEmbDecoder::new(text),
            Err(Error::Svg { message, .. })
                if message == "Invalid color not in #RRGGBB hex format"
        ));
    }

    #[test]
    fn test_path_without_stroke_is_an_error() {
        let text = "<svg><path d=\"M 0 0\" /></svg>";
        let decoder = SvgEmbDecoder::new(text).unwrap();
        assert!(matches!(
            decoder.for_each_stitch(|_| true),
            Err(Error::Svg { message, .. })
                if message == "Missing \"stroke\" attribute"
        ));
    }

    #[test]
    fn test_malformed_path_data() {
        let text = "<svg><path stroke=\"#000000\" d=\"M 0 0 Q 1 1\" /></svg>";
        let decoder = SvgEmbDecoder::new(text).unwrap();
        assert!(matches!(
            decoder.for_each_stitch(|_| true),
            Err(Error::Svg { message, .. }) if message == "Malformed \"d\" attribute"
        ));
    }

    #[test]
    fn test_abort_from_callback() {
        let decoder = SvgEmbDecoder::new(TWO_COLOR_SVG).unwrap();
        let result = decoder.for_each_stitch(|event| {
            !matches!(event, SvgEmbStitchEvent::Stitch { stitch_index: 1, .. })
        });
        assert!(matches!(result, Err(Error::Aborted)));
    }

    #[test]
    fn test_parse_coordinate_forms() {
        assert_eq!(parse_coordinate("  30.5 rest"), Some((30.5, " rest")));
        assert_eq!(parse_coordinate("-4"), Some((-4.0, "")));
        assert_eq!(parse_coordinate("1e2"), Some((100.0, "")));
        assert!(parse_coordinate("x").is_none());
        assert!(parse_coordinate("").is_none());
    }
}

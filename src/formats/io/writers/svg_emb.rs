//! SVG embroidery encoder
//!
//! Emits the restricted SVG text form: an XML prolog and DOCTYPE, an
//! `<svg>` element sized from the stitch bounds, an optional `<g>` wrapper
//! carrying a non-identity affine transform, and one `<path>` per
//! contiguous single-color run with `M`/`L` commands at four points per
//! line. The output is byte-stable so it round-trips through the decoder.

use crate::core::bounds::Bounds;
use crate::core::matrix::PesTransform;
use crate::core::thread::PecThread;
use crate::formats::io::utils::SinkWriter;
use crate::utils::error::{Error, Result};

/// Largest number of threads an SVG embroidery document can reference
pub const MAX_THREADS: usize = 256;

#[derive(Debug, Clone, Copy)]
struct SvgEmbStitch {
    thread_index: usize,
    x: f32,
    y: f32,
    jump: bool,
}

/// Append-then-emit encoder producing SVG embroidery text
pub struct SvgEmbEncoder {
    bounds: Bounds,
    affine_transform: PesTransform,
    thread_list: Vec<PecThread>,
    stitch_list: Vec<SvgEmbStitch>,
}

impl SvgEmbEncoder {
    /// Create an empty encoder with an identity transform
    pub fn new() -> Self {
        Self {
            bounds: Bounds::new(),
            affine_transform: PesTransform::identity(),
            thread_list: Vec::new(),
            stitch_list: Vec::new(),
        }
    }

    /// Number of appended threads
    pub fn thread_count(&self) -> usize {
        self.thread_list.len()
    }

    /// Number of appended stitches
    pub fn stitch_count(&self) -> usize {
        self.stitch_list.len()
    }

    /// Append a thread; stitches reference threads by append order
    pub fn append_thread(&mut self, thread: PecThread) -> Result<()> {
        if self.thread_list.len() >= MAX_THREADS {
            return Err(Error::Range(format!(
                "thread count outside 1..={}",
                MAX_THREADS
            )));
        }

        self.thread_list.push(thread);

        Ok(())
    }

    /// Append a normal stitch for the given thread
    pub fn append_stitch(&mut self, thread_index: usize, x: f32, y: f32) -> Result<()> {
        self.push_stitch(thread_index, x, y, false)
    }

    /// Append a jump stitch for the given thread, starting a new path
    pub fn append_jump_stitch(&mut self, thread_index: usize, x: f32, y: f32) -> Result<()> {
        self.push_stitch(thread_index, x, y, true)
    }

    /// Set the affine transform emitted as a `<g>` matrix wrapper
    pub fn set_transform(&mut self, affine_transform: PesTransform) {
        self.affine_transform = affine_transform;
    }

    fn push_stitch(&mut self, thread_index: usize, x: f32, y: f32, jump: bool) -> Result<()> {
        if thread_index >= self.thread_list.len() {
            return Err(Error::Range(format!(
                "stitch references thread {} of {}",
                thread_index,
                self.thread_list.len()
            )));
        }

        self.stitch_list.push(SvgEmbStitch {
            thread_index,
            x,
            y,
            jump,
        });
        self.bounds.update(x, y);

        Ok(())
    }

    /// Emit the SVG embroidery text through the given byte sink
    pub fn emit<F: FnMut(&[u8]) -> bool>(&self, mut sink: F) -> Result<()> {
        let mut writer = SinkWriter::new(&mut sink);

        self.encode_header(&mut writer)?;
        self.encode_transform_header(&mut writer)?;
        self.encode_stitch_list(&mut writer)?;
        self.encode_transform_footer(&mut writer)?;
        writer.write_str("</svg>\n")
    }

    /// Size in bytes of the text `emit` would produce
    pub fn size(&self) -> Result<usize> {
        let mut total = 0usize;
        self.emit(|chunk| {
            total += chunk.len();
            true
        })?;
        Ok(total)
    }

    fn encode_header(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        let width = self.bounds.width();
        let height = self.bounds.height();
        let (translation_x, translation_y) = self.affine_transform.translation();

        // TODO: bounds are shifted by the transform translation only; a
        // rotational transform would require recomputing them.
        writer.write_str(&format!(
            "<?xml version=\"1.0\"?>\n\
             <!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\"\n\
             \x20 \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n\
             <svg width=\"{:.1}mm\" height=\"{:.1}mm\" version=\"1.1\"\n\
             \x20    viewBox=\"{:.1} {:.1} {:.1} {:.1}\" \
             xmlns=\"http://www.w3.org/2000/svg\">\n",
            width,
            height,
            self.bounds.min_x + translation_x,
            self.bounds.min_y + translation_y,
            width,
            height
        ))
    }

    fn encode_transform_header(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        if self.affine_transform.is_identity() {
            return Ok(());
        }

        let m = &self.affine_transform.matrix;
        writer.write_str(&format!(
            "  <g transform=\"matrix({:.7} {:.7} {:.7} {:.7} {:.7} {:.7})\">\n",
            m[0][0], m[0][1], m[1][0], m[1][1], m[2][0], m[2][1]
        ))
    }

    fn encode_transform_footer(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        if self.affine_transform.is_identity() {
            return Ok(());
        }

        writer.write_str("  </g>\n")
    }

    fn encode_path_header(
        &self,
        writer: &mut SinkWriter<'_>,
        thread: &PecThread,
    ) -> Result<()> {
        writer.write_str(&format!(
            "  <path stroke=\"{}\" fill=\"none\" stroke-width=\"0.2\"\n        d=\"",
            thread.rgb.hex()
        ))
    }

    fn encode_path_footer(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        writer.write_str("\" />\n")
    }

    fn encode_path_point(
        &self,
        writer: &mut SinkWriter<'_>,
        stitch_index: usize,
        x: f32,
        y: f32,
    ) -> Result<()> {
        let separator = if stitch_index % 4 != 0 {
            " "
        } else if stitch_index != 0 {
            "\n           "
        } else {
            ""
        };
        let command = if stitch_index == 0 { 'M' } else { 'L' };

        writer.write_str(&format!("{}{} {:5.1} {:5.1}", separator, command, x, y))
    }

    fn encode_stitch_list(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        let mut thread_index = usize::MAX;
        let mut stitch_index = 0;

        for (i, stitch) in self.stitch_list.iter().enumerate() {
            // A path break is either an explicit jump or implicit on a
            // thread change. The first stitch never breaks.
            let jump = i > 0 && (stitch.jump || thread_index != stitch.thread_index);

            if jump {
                self.encode_path_footer(writer)?;
            }

            if i == 0 || jump {
                stitch_index = 0;
                self.encode_path_header(writer, &self.thread_list[stitch.thread_index])?;
            }

            self.encode_path_point(writer, stitch_index, stitch.x, stitch.y)?;
            stitch_index += 1;

            thread_index = stitch.thread_index;
        }

        if !self.stitch_list.is_empty() {
            self.encode_path_footer(writer)?;
        }

        Ok(())
    }
}

impl Default for SvgEmbEncoder {
    fn default() -> Self {
        Self::new()
    }
}

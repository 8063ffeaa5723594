//! Brother PES format decoder
//!
//! PES wraps a PEC stitch section in a versioned container holding design
//! metadata, a CEmbOne geometry region and a CSewSeg stitch region.
//! Versions 1, 4, 5 and 6 are recognized on read. The decoder owns an
//! inner [`PecDecoder`] over the embedded PEC payload; it is borrowed
//! through [`PesDecoder::pec`] and never outlives its parent.
//!
//! ## Container layout
//! - `#PES` + four ASCII version digits, then a 32-bit offset to the PEC
//!   payload at byte 8
//! - a version-specific header (name, hoop size, v5/v6 thread table)
//! - `CEmbOne`: two bounds rectangles, a 3x2 affine transform,
//!   translation, size and block count
//! - `CSewSeg`: blocks of (stitch type, block id, stitch count, raw
//!   coordinate pairs) chained by 0x8003 continuations, then the
//!   thread-change table

use crate::core::matrix::PesTransform;
use crate::core::stitch::raw_to_mm;
use crate::core::thread::{PecThread, Rgb};
use crate::formats::io::readers::pec::PecDecoder;
use crate::formats::io::utils::RawReader;
use crate::palettes::thread_pec::palette_thread_by_index;
use crate::utils::error::{Error, Result};

/// Distance from the CEmbOne marker to the CSewSeg marker
const CEMBONE_SIZE: usize = 73;

/// Event delivered while iterating a PES stitch section
#[derive(Debug, Clone)]
pub enum PesStitchEvent {
    /// A CSewSeg block is starting
    Block {
        /// Thread active for this block
        thread: PecThread,
        /// Number of stitches in the block
        stitch_count: usize,
        /// Raw stitch type code; 0 is normal, 1 jump
        stitch_type: u16,
    },
    /// A stitch within the current block
    Stitch {
        /// Index of the stitch within its block
        stitch_index: usize,
        /// X coordinate in millimeters
        x: f32,
        /// Y coordinate in millimeters
        y: f32,
    },
}

#[derive(Debug, Clone, Copy)]
struct PesChange {
    block_index: usize,
    thread_index: usize,
}

/// One-shot decoder over a complete PES file
pub struct PesDecoder {
    data: Vec<u8>,
    version: String,
    name: String,
    hoop_width: u16,
    hoop_height: u16,
    pec_offset: usize,
    cembone_offset: usize,
    csewseg_offset: usize,
    thread_list: Vec<PecThread>,
    change_list: Vec<PesChange>,
    pec: PecDecoder,
}

impl PesDecoder {
    /// Create a decoder over a copy of the given PES file
    pub fn new(data: &[u8]) -> Result<Self> {
        let reader = RawReader::new(data);

        let pec_offset = reader.i32_le_at(8)?;
        if pec_offset < 0 || data.len() < pec_offset as usize {
            return Err(Error::Marker(format!(
                "PEC payload offset {} outside file of {} bytes",
                pec_offset,
                data.len()
            )));
        }
        let pec_offset = pec_offset as usize;
        let pec = PecDecoder::new(&data[pec_offset..])?;

        let magic = reader.bytes_at(0, 8)?;
        let version = String::from_utf8_lossy(&magic[4..]).into_owned();

        let mut decoder = Self {
            data: data.to_vec(),
            version,
            name: String::new(),
            hoop_width: 0,
            hoop_height: 0,
            pec_offset,
            cembone_offset: 0,
            csewseg_offset: 0,
            thread_list: Vec::new(),
            change_list: Vec::new(),
            pec,
        };

        match magic {
            b"#PES0001" => decoder.init_version1()?,
            b"#PES0040" => decoder.init_version4()?,
            b"#PES0050" => decoder.init_version5()?,
            b"#PES0060" => decoder.init_version6()?,
            _ => {
                return Err(Error::Marker(format!(
                    "unrecognized PES magic: {:?}",
                    String::from_utf8_lossy(magic)
                )))
            }
        }

        if !decoder.reader().marker_at(decoder.cembone_offset, "CEmbOne") {
            return Err(Error::Marker("missing CEmbOne section".to_string()));
        }

        decoder.csewseg_offset = decoder.cembone_offset + CEMBONE_SIZE;
        if !decoder.reader().marker_at(decoder.csewseg_offset, "CSewSeg") {
            return Err(Error::Marker("missing CSewSeg section".to_string()));
        }

        if decoder.thread_list.is_empty() {
            decoder.init_palette_threads()?;
        } else {
            decoder.init_changes()?;
        }

        Ok(decoder)
    }

    fn reader(&self) -> RawReader<'_> {
        RawReader::new(&self.data)
    }

    /// Version digits of the file, one of `0001`, `0040`, `0050`, `0060`
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Design name, empty for version 1 files
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of threads referenced by the thread-change table
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

    /// Total number of stitches in the CSewSeg region
    pub fn stitch_count(&self) -> usize {
        let mut counter = 0;
        let walked = self.for_each_stitch(|event| {
            if matches!(event, PesStitchEvent::Stitch { .. }) {
                counter += 1;
            }
            true
        });
        if walked.is_err() {
            return 0;
        }
        counter
    }

    fn bounds_at(&self, offset: usize) -> (f32, f32, f32, f32) {
        let reader = self.reader();
        let coordinate = |o: usize| raw_to_mm(reader.i16_le_at(o).unwrap_or(0) as i32);

        (
            coordinate(offset),
            coordinate(offset + 2),
            coordinate(offset + 4),
            coordinate(offset + 6),
        )
    }

    /// First CEmbOne bounds rectangle as (min_x, min_y, max_x, max_y)
    pub fn bounds1(&self) -> (f32, f32, f32, f32) {
        // TODO: the relation between the two bounds rectangles and the
        // affine transform is unknown.
        self.bounds_at(self.cembone_offset + 9)
    }

    /// Second CEmbOne bounds rectangle as (min_x, min_y, max_x, max_y)
    pub fn bounds2(&self) -> (f32, f32, f32, f32) {
        self.bounds_at(self.cembone_offset + 17)
    }

    /// CEmbOne affine transform with its translation in millimeters
    pub fn affine_transform(&self) -> PesTransform {
        let reader = self.reader();
        let entry = |o: usize| reader.f32_le_at(o).unwrap_or(0.0);
        let offset = self.cembone_offset + 25;

        let mut transform = PesTransform::from_parts(
            entry(offset),
            entry(offset + 4),
            entry(offset + 8),
            entry(offset + 12),
            entry(offset + 16),
            entry(offset + 20),
        );

        let physical_translation_scale = raw_to_mm(1);
        transform.matrix[2][0] *= physical_translation_scale;
        transform.matrix[2][1] *= physical_translation_scale;

        transform
    }

    /// CEmbOne x translation in millimeters
    pub fn translation_x(&self) -> f32 {
        raw_to_mm(self.reader().i16_le_at(self.cembone_offset + 51).unwrap_or(0) as i32)
    }

    /// CEmbOne y translation in millimeters
    pub fn translation_y(&self) -> f32 {
        raw_to_mm(self.reader().i16_le_at(self.cembone_offset + 53).unwrap_or(0) as i32)
    }

    /// CEmbOne width in millimeters
    pub fn width(&self) -> f32 {
        raw_to_mm(self.reader().u16_le_at(self.cembone_offset + 55).unwrap_or(0) as i32)
    }

    /// CEmbOne height in millimeters
    pub fn height(&self) -> f32 {
        raw_to_mm(self.reader().u16_le_at(self.cembone_offset + 57).unwrap_or(0) as i32)
    }

    /// Hoop width in millimeters, zero when undefined
    pub fn hoop_width(&self) -> f32 {
        self.hoop_width as f32
    }

    /// Hoop height in millimeters, zero when undefined
    pub fn hoop_height(&self) -> f32 {
        self.hoop_height as f32
    }

    /// Iterate the CSewSeg blocks and stitches in file order
    ///
    /// Before each block event the running thread is resolved through the
    /// thread-change table, so block events always carry the thread active
    /// for their stitches. Returning false aborts the iteration.
    pub fn for_each_stitch<F>(&self, mut event_cb: F) -> Result<()>
    where
        F: FnMut(PesStitchEvent) -> bool,
    {
        self.walk_blocks(&mut event_cb, true, None)
    }

    /// Borrow the decoder for the embedded PEC payload
    pub fn pec(&self) -> &PecDecoder {
        &self.pec
    }

    /// Walk the CSewSeg region
    ///
    /// Delivers block/stitch events when `with_blocks` is set, and the raw
    /// (change_index, block_index, table_index) change entries to
    /// `change_cb` after the last block.
    fn walk_blocks(
        &self,
        event_cb: &mut dyn FnMut(PesStitchEvent) -> bool,
        with_blocks: bool,
        change_cb: Option<&mut dyn FnMut(usize, usize, usize) -> bool>,
    ) -> Result<()> {
        let reader = self.reader();
        let mut thread = PecThread::undefined();
        let mut offset = self.csewseg_offset + 9;
        let mut change_index = 0;

        let mut block_index = 0;
        while offset < self.pec_offset {
            let stitch_type = reader.u16_le_at(offset)?;
            let _block_id = reader.u16_le_at(offset + 2)?;
            let stitch_count = reader.u16_le_at(offset + 4)? as usize;
            offset += 6;

            if change_index < self.change_list.len()
                && block_index == self.change_list[change_index].block_index
            {
                thread = self.thread(self.change_list[change_index].thread_index);
                change_index += 1;
            }

            if with_blocks
                && !event_cb(PesStitchEvent::Block {
                    thread: thread.clone(),
                    stitch_count,
                    stitch_type,
                })
            {
                return Err(Error::Aborted);
            }

            for stitch_index in 0..stitch_count {
                let x = reader.i16_le_at(offset)? as i32;
                let y = reader.i16_le_at(offset + 2)? as i32;
                offset += 4;

                if with_blocks
                    && !event_cb(PesStitchEvent::Stitch {
                        stitch_index,
                        x: raw_to_mm(x),
                        y: raw_to_mm(y),
                    })
                {
                    return Err(Error::Aborted);
                }
            }

            let code = reader.u16_le_at(offset)?;
            if code != 0x8003 {
                break;
            }
            offset += 2;
            block_index += 1;
        }

        if let Some(change_cb) = change_cb {
            self.walk_changes(offset, change_cb)?;
        }

        Ok(())
    }

    /// Walk the thread-change table that terminates the block sequence
    fn walk_changes(
        &self,
        mut offset: usize,
        change_cb: &mut dyn FnMut(usize, usize, usize) -> bool,
    ) -> Result<()> {
        let reader = self.reader();

        let change_count = reader.u16_le_at(offset)? as usize;
        offset += 2;

        for change_index in 0..change_count {
            let block_index = reader.u16_le_at(offset)? as usize;
            let table_index = reader.u16_le_at(offset + 2)? as usize;
            offset += 4;

            if !change_cb(change_index, block_index, table_index) {
                return Err(Error::Aborted);
            }
        }

        if offset > self.pec_offset {
            return Err(Error::Truncated {
                offset,
                needed: offset - self.pec_offset,
            });
        }

        Ok(())
    }

    /// Build threads and changes from the change table's palette indices
    /// (versions 1 and 4, which carry no thread table)
    fn init_palette_threads(&mut self) -> Result<()> {
        let mut changes = Vec::new();
        let mut collect = |change_index: usize, block_index: usize, palette_index: usize| {
            changes.push((change_index, block_index, palette_index));
            true
        };
        self.walk_blocks(&mut |_| true, false, Some(&mut collect))?;

        for (change_index, block_index, palette_index) in changes {
            let mut thread = palette_thread_by_index(palette_index);
            thread.index = change_index;
            self.thread_list.push(thread);
            self.change_list.push(PesChange {
                block_index,
                thread_index: change_index,
            });
        }

        Ok(())
    }

    /// Build changes referencing the version 5/6 thread table
    fn init_changes(&mut self) -> Result<()> {
        let mut changes = Vec::new();
        let mut collect = |_: usize, block_index: usize, thread_index: usize| {
            changes.push((block_index, thread_index));
            true
        };
        self.walk_blocks(&mut |_| true, false, Some(&mut collect))?;

        for (block_index, thread_index) in changes {
            if thread_index >= self.thread_list.len() {
                return Err(Error::Range(format!(
                    "thread change references thread {} of {}",
                    thread_index,
                    self.thread_list.len()
                )));
            }
            self.change_list.push(PesChange {
                block_index,
                thread_index,
            });
        }

        Ok(())
    }

    /// Decode the version 5/6 thread table at the given offset
    fn init_threads(&mut self, offset: &mut usize) -> Result<()> {
        let reader = RawReader::new(&self.data);
        let thread_count = reader.u16_le_at(*offset)? as usize;
        *offset += 2;

        for i in 0..thread_count {
            let (code, consumed) = reader.string_at(*offset)?;
            *offset += consumed;

            let r = reader.u8_at(*offset)?;
            let g = reader.u8_at(*offset + 1)?;
            let b = reader.u8_at(*offset + 2)?;
            *offset += 3;

            *offset += 1; // unknown

            let type_byte = reader.u8_at(*offset)?;
            *offset += 1;

            *offset += 3; // unknown

            let (id, consumed) = reader.string_at(*offset)?;
            *offset += consumed;

            let (name, consumed) = reader.string_at(*offset)?;
            *offset += consumed;

            *offset += 1; // unknown

            self.thread_list.push(PecThread::new(
                i,
                id,
                code,
                name,
                PecThread::type_tag_from_byte(type_byte),
                Rgb::new(r, g, b),
            ));
        }

        Ok(())
    }

    fn init_hoop(&mut self, offset: usize) -> Result<()> {
        let hoop_width = self.reader().u16_le_at(offset)?;
        let hoop_height = self.reader().u16_le_at(offset + 2)?;
        self.hoop_width = hoop_width;
        self.hoop_height = hoop_height;
        Ok(())
    }

    fn init_name(&mut self, offset: &mut usize) -> Result<()> {
        let (name, consumed) = self.reader().string_at(*offset)?;
        self.name = name;
        *offset += consumed;
        Ok(())
    }

    fn init_version1(&mut self) -> Result<()> {
        let mut offset = 12;

        offset += 10; // unknown

        self.cembone_offset = offset;

        Ok(())
    }

    fn init_version4(&mut self) -> Result<()> {
        let mut offset = 12;

        offset += 4; // unknown
        self.init_name(&mut offset)?;
        offset += 6; // unknown
        self.init_hoop(offset)?;
        offset += 4;
        offset += 28; // unknown

        self.cembone_offset = offset;

        Ok(())
    }

    fn init_version5(&mut self) -> Result<()> {
        let mut offset = 12;

        offset += 4; // unknown
        self.init_name(&mut offset)?;
        offset += 6; // unknown
        self.init_hoop(offset)?;
        offset += 4;
        offset += 49; // unknown
        self.init_threads(&mut offset)?;
        offset += 6; // unknown

        self.cembone_offset = offset;

        Ok(())
    }

    fn init_version6(&mut self) -> Result<()> {
        let mut offset = 12;

        offset += 4; // unknown
        self.init_name(&mut offset)?;
        offset += 8; // unknown
        self.init_hoop(offset)?;
        offset += 4;
        offset += 59; // unknown
        self.init_threads(&mut offset)?;
        offset += 6; // unknown

        self.cembone_offset = offset;

        Ok(())
    }
}

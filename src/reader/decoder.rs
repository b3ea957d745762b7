use std::cmp;
use std::io;

use enum_primitive::FromPrimitive;
use lzw::{Decoder as LzwDecoder, LsbReader};
use thiserror::Error;

use crate::traits::{HasParameters, Parameter};
use crate::types::{Block, DisposalMethod, Extension};

/// Images get converted to RGBA
pub const N_CHANNELS: usize = 4;
/// GIF palettes are RGB
pub const PLTE_CHANNELS: usize = 3;

#[derive(Error, Debug)]
pub enum DecodingError {
    #[error("format error: {0}")]
    Format(&'static str),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Output mode for the image data
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ColorOutput {
    /// The decoder expands the image data to 32bit RGBA
    TrueColor,
    /// The decoder returns the raw indexed data
    Indexed,
}

impl Parameter<Decoder> for ColorOutput {
    fn set_param(self, this: &mut Decoder) {
        this.color_output = self
    }
}

/// Indicated the progress of decoding. Used for block-wise reading
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Progress {
    Start,
    BlockStart,
    DataStart,
    DataEnd,
    Trailer,
}

/// Internal state of the GIF decoder
#[derive(Debug)]
enum State {
    Magic(usize, [u8; 6]),
    U16Byte1(U16Value, u8),
    U16(U16Value),
    Byte(ByteValue),
    GlobalPalette(usize),
    AwaitBlockEnd,
    BlockEnd(u8),
    ExtensionLabel,
    ExtensionBlock(u8),
    SkipBlock(usize),
    LocalPalette(usize),
    LzwInit(u8),
    DecodeSubBlock(usize),
}
use self::State::*;

/// U16 values that may occur in a GIF image
#[derive(Debug)]
enum U16Value {
    /// Logical screen descriptor width
    ScreenWidth,
    /// Logical screen descriptor height
    ScreenHeight,
    /// Delay time
    Delay,
    /// Left frame offset
    ImageLeft,
    /// Top frame offset
    ImageTop,
    /// Frame width
    ImageWidth,
    /// Frame height
    ImageHeight,
}

/// Single byte screen descriptor values
#[derive(Debug)]
enum ByteValue {
    GlobalFlags,
    Background { table_size: usize },
    AspectRatio { table_size: usize },
    ControlFlags,
    ImageFlags,
    TransparentIdx,
    CodeSize,
}

/// A frame
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub delay: u16,
    pub dispose: DisposalMethod,
    pub transparent: Option<u8>,
    pub needs_user_input: bool,
    pub top: u16,
    pub left: u16,
    pub width: u16,
    pub height: u16,
    pub interlaced: bool,
    pub palette: Option<Vec<u8>>,
    pub buffer: Vec<u8>,
}

/// GIF decoder which supports streaming
pub struct Decoder {
    state: Option<State>,
    progress: Progress,
    color_output: ColorOutput,
    version: &'static str,
    width: u16,
    height: u16,
    global_color_table: Vec<u8>,
    /// Label and payload of the extension being read
    ext: (u8, Vec<u8>),
    /// NETSCAPE2.0 loop count, 0 is forever
    loop_count: Option<u16>,
    lzw: Option<LzwDecoder<LsbReader>>,
    /// Frame data
    current: Option<usize>,
    frames: Vec<Frame>,
}

impl HasParameters for Decoder {}

impl Default for Decoder {
    fn default() -> Decoder {
        Decoder::new()
    }
}

impl Decoder {
    pub fn new() -> Decoder {
        Decoder {
            state: Some(Magic(0, [0; 6])),
            progress: Progress::Start,
            color_output: ColorOutput::Indexed,
            version: "",
            width: 0,
            height: 0,
            global_color_table: Vec::new(),
            ext: (0, Vec::with_capacity(256)), // 0xFF + 1 byte length
            loop_count: None,
            lzw: None,
            current: None,
            frames: Vec::new(),
        }
    }

    pub fn update(&mut self, buf: &[u8]) -> Result<usize, DecodingError> {
        self.update_until(buf, Progress::Trailer)
    }

    pub fn update_until(&mut self, mut buf: &[u8], stop_at: Progress) -> Result<usize, DecodingError> {
        let len = buf.len();
        while !buf.is_empty() && self.state.is_some() {
            if self.progress == stop_at {
                return Ok(len - buf.len());
            }
            let bytes = self.next_state(buf)?;
            buf = &buf[bytes..];
        }
        Ok(len - buf.len())
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// "87a" or "89a"
    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// The global color palette
    pub fn global_palette(&self) -> &[u8] {
        &self.global_color_table
    }

    /// Loop count of the NETSCAPE2.0 extension, `Some(0)` loops forever
    pub fn loop_count(&self) -> Option<u16> {
        self.loop_count
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    fn next_state(&mut self, buf: &[u8]) -> Result<usize, DecodingError> {
        macro_rules! goto (
            ($n:expr, $state:expr) => ({
                self.state = Some($state);
                Ok($n)
            });
            ($state:expr) => ({
                self.state = Some($state);
                Ok(1)
            })
        );

        let b = buf[0];

        // Driver should ensure that state is never None
        let state = match self.state.take() {
            Some(state) => state,
            None => return Ok(0),
        };

        match state {
            Magic(i, mut version) => {
                if i < 6 {
                    version[i] = b;
                    goto!(Magic(i + 1, version))
                } else if &version[..3] == b"GIF" {
                    self.version = match &version[3..] {
                        b"87a" => "87a",
                        b"89a" => "89a",
                        _ => return Err(DecodingError::Format("unsupported GIF version")),
                    };
                    goto!(U16Byte1(U16Value::ScreenWidth, b))
                } else {
                    Err(DecodingError::Format("malformed GIF header"))
                }
            }
            U16(next) => goto!(U16Byte1(next, b)),
            U16Byte1(next, value) => {
                use self::U16Value::*;
                let value = ((b as u16) << 8) | value as u16;
                match next {
                    ScreenWidth => {
                        self.width = value;
                        goto!(U16(U16Value::ScreenHeight))
                    }
                    ScreenHeight => {
                        self.height = value;
                        goto!(Byte(ByteValue::GlobalFlags))
                    }
                    Delay => {
                        self.current_frame().delay = value;
                        goto!(Byte(ByteValue::TransparentIdx))
                    }
                    ImageLeft => {
                        self.current_frame().left = value;
                        goto!(U16(U16Value::ImageTop))
                    }
                    ImageTop => {
                        self.current_frame().top = value;
                        goto!(U16(U16Value::ImageWidth))
                    }
                    ImageWidth => {
                        self.current_frame().width = value;
                        goto!(U16(U16Value::ImageHeight))
                    }
                    ImageHeight => {
                        self.current_frame().height = value;
                        goto!(Byte(ByteValue::ImageFlags))
                    }
                }
            }
            Byte(value) => {
                use self::ByteValue::*;
                match value {
                    GlobalFlags => {
                        let global_table = b & 0x80 != 0;
                        let entries = if global_table {
                            let entries = PLTE_CHANNELS * (1 << ((b & 0b111) + 1) as usize);
                            self.global_color_table.reserve_exact(entries);
                            entries
                        } else {
                            0usize
                        };
                        goto!(Byte(Background { table_size: entries }))
                    }
                    // background index and aspect ratio carry nothing a
                    // full-canvas animation needs
                    Background { table_size } => goto!(Byte(AspectRatio { table_size })),
                    AspectRatio { table_size } => goto!(GlobalPalette(table_size)),
                    ControlFlags => {
                        let control_flags = b;
                        if control_flags & 1 != 0 {
                            // Set to Some(...), gets overwritten later
                            self.current_frame().transparent = Some(0)
                        }
                        self.current_frame().needs_user_input = control_flags & 0b10 != 0;
                        self.current_frame().dispose =
                            match DisposalMethod::from_u8((control_flags & 0b11100) >> 2) {
                                Some(method) => method,
                                None => return Err(DecodingError::Format("unknown disposal method")),
                            };
                        goto!(U16(U16Value::Delay))
                    }
                    TransparentIdx => {
                        if let Some(ref mut idx) = self.current_frame().transparent {
                            *idx = b
                        }
                        goto!(AwaitBlockEnd)
                    }
                    ImageFlags => {
                        let local_table = (b & 0b1000_0000) != 0;
                        let interlaced = (b & 0b0100_0000) != 0;
                        let table_size = b & 0b0000_0111;

                        self.current_frame().interlaced = interlaced;
                        if local_table {
                            let entries = PLTE_CHANNELS * (1 << (table_size + 1));
                            self.current_frame().palette = Some(Vec::with_capacity(entries));
                            goto!(LocalPalette(entries))
                        } else {
                            goto!(Byte(CodeSize))
                        }
                    }
                    CodeSize => goto!(LzwInit(b)),
                }
            }
            GlobalPalette(left) => {
                let n = cmp::min(left, buf.len());
                if left > 0 {
                    self.global_color_table.extend_from_slice(&buf[..n]);
                    goto!(n, GlobalPalette(left - n))
                } else {
                    self.block_start(b)
                }
            }
            AwaitBlockEnd => goto!(BlockEnd(b)),
            BlockEnd(terminator) => {
                if terminator == 0 {
                    self.block_start(b)
                } else {
                    Err(DecodingError::Format("expected block terminator not found"))
                }
            }
            ExtensionLabel => goto!(ExtensionBlock(b)),
            ExtensionBlock(label) => {
                self.ext.0 = label;
                self.ext.1.clear();
                match Extension::from_u8(label) {
                    Some(Extension::Control) => goto!(self.read_control_extension(b)?),
                    Some(Extension::Text | Extension::Comment | Extension::Application) => {
                        goto!(SkipBlock(b as usize))
                    }
                    None => Err(DecodingError::Format("unknown extention block encountered")),
                }
            }
            SkipBlock(left) => {
                let n = cmp::min(left, buf.len());
                if left > 0 {
                    self.ext.1.extend_from_slice(&buf[..n]);
                    goto!(n, SkipBlock(left - n))
                } else if b == 0 {
                    self.finish_extension();
                    goto!(BlockEnd(b))
                } else {
                    goto!(SkipBlock(b as usize))
                }
            }
            LocalPalette(left) => {
                let n = cmp::min(left, buf.len());
                if left > 0 {
                    let c = self.current.unwrap_or(0);
                    if let Some(palette) = self.frames[c].palette.as_mut() {
                        palette.extend_from_slice(&buf[..n]);
                    }
                    goto!(n, LocalPalette(left - n))
                } else {
                    goto!(LzwInit(b))
                }
            }
            LzwInit(code_size) => {
                // GIF codes are at most 12 bits wide
                if code_size > 11 {
                    return Err(DecodingError::Format("invalid minimal code size"));
                }
                self.progress = Progress::DataStart;
                self.lzw = Some(LzwDecoder::new(LsbReader::new(), code_size));
                goto!(DecodeSubBlock(b as usize))
            }
            DecodeSubBlock(left) => {
                let n = cmp::min(left, buf.len());
                if left > 0 {
                    let c = self.current.unwrap_or(0);
                    let frame = &mut self.frames[c];
                    let decoder = match self.lzw.as_mut() {
                        Some(decoder) => decoder,
                        None => return Err(DecodingError::Format("image data without code size")),
                    };
                    let mut data = &buf[..n];
                    while !data.is_empty() {
                        let (consumed, bytes) = decoder.decode_bytes(data)?;
                        frame.buffer.extend_from_slice(bytes);
                        data = &data[consumed..];
                    }
                    goto!(n, DecodeSubBlock(left - n))
                } else if b != 0 {
                    // decode next sub-block
                    goto!(DecodeSubBlock(b as usize))
                } else {
                    // end of image data reached
                    self.lzw = None;
                    if self.color_output == ColorOutput::TrueColor {
                        self.expand_palette();
                    }
                    self.current = None;
                    self.progress = Progress::DataEnd;
                    goto!(BlockEnd(b))
                }
            }
        }
    }

    /// Dispatches on a block introducer. The trailer ends decoding.
    fn block_start(&mut self, b: u8) -> Result<usize, DecodingError> {
        self.progress = Progress::BlockStart;
        match Block::from_u8(b) {
            Some(Block::Image) => {
                self.add_frame();
                self.state = Some(U16(U16Value::ImageLeft));
                Ok(1)
            }
            Some(Block::Extension) => {
                self.state = Some(ExtensionLabel);
                Ok(1)
            }
            Some(Block::Trailer) => {
                self.state = None;
                self.progress = Progress::Trailer;
                Ok(1)
            }
            None => Err(DecodingError::Format("unknown block type encountered")),
        }
    }

    /// Interprets a completely read application extension
    fn finish_extension(&mut self) {
        let (label, ref data) = self.ext;
        if label == Extension::Application as u8
            && data.len() >= 14
            && &data[..11] == b"NETSCAPE2.0"
            && data[11] == 1
        {
            self.loop_count = Some(u16::from_le_bytes([data[12], data[13]]));
        }
    }

    #[inline]
    fn read_control_extension(&mut self, b: u8) -> Result<State, DecodingError> {
        self.add_frame();
        if b != 4 {
            return Err(DecodingError::Format("control extension has wrong length"));
        }
        Ok(Byte(ByteValue::ControlFlags))
    }

    fn add_frame(&mut self) {
        if self.current.is_none() {
            self.current = Some(self.frames.len());
            self.frames.push(Frame::default());
            let required_bytes = self.width as usize * self.height as usize;
            self.current_frame().buffer.reserve(required_bytes);
        }
    }

    fn current_frame(&mut self) -> &mut Frame {
        let c = self.current.unwrap_or(0);
        &mut self.frames[c]
    }

    /// Replaces the indices of the current frame by RGBA pixels
    fn expand_palette(&mut self) {
        let c = self.current.unwrap_or(0);
        let frame = &mut self.frames[c];
        let palette = match frame.palette {
            Some(ref table) => &table[..],
            None => &self.global_color_table[..],
        };
        frame.buffer = expand_palette(&frame.buffer, palette, frame.transparent);
    }
}

/// Naive version, should be optimized for speed
fn expand_palette(indices: &[u8], palette: &[u8], transparent: Option<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(indices.len() * N_CHANNELS);
    for &idx in indices {
        let offset = PLTE_CHANNELS * idx as usize;
        match palette.get(offset..offset + PLTE_CHANNELS) {
            Some(colors) => out.extend_from_slice(colors),
            None => out.extend_from_slice(&[0, 0, 0]),
        }
        out.push(if Some(idx) == transparent { 0x00 } else { 0xFF });
    }
    out
}

//! Streaming GIF decoder, used to inspect produced animations
use std::io;
use std::io::prelude::*;

use crate::traits::{HasParameters, Parameter};

mod decoder;
pub use self::decoder::{
    ColorOutput, Decoder, DecodingError, Frame, Progress, N_CHANNELS, PLTE_CHANNELS,
};

impl<T, R> Parameter<Reader<R>> for T
where
    T: Parameter<Decoder>,
    R: Read,
{
    fn set_param(self, this: &mut Reader<R>) {
        this.decoder.set(self);
    }
}

pub struct Reader<R: Read> {
    r: io::BufReader<R>,
    decoder: Decoder,
}

impl<R: Read> HasParameters for Reader<R> {}

impl<R> Reader<R>
where
    R: Read,
{
    pub fn new(reader: R) -> Reader<R> {
        Reader {
            r: io::BufReader::new(reader),
            decoder: Decoder::new(),
        }
    }

    /// Reads everything up to the trailer and returns the frames
    pub fn read_to_end(&mut self) -> Result<&[Frame], DecodingError> {
        self.read_until(Progress::Trailer)?;
        Ok(self.decoder.frames())
    }

    /// Reads the header, screen descriptor and global palette
    pub fn read_info(&mut self) -> Result<(), DecodingError> {
        if self.decoder.progress() == Progress::Start {
            self.read_until(Progress::BlockStart)?;
        }
        Ok(())
    }

    /// Width of the image
    pub fn width(&self) -> u16 {
        self.decoder.width()
    }

    /// Height of the image
    pub fn height(&self) -> u16 {
        self.decoder.height()
    }

    /// The global color palette
    pub fn global_palette(&self) -> &[u8] {
        self.decoder.global_palette()
    }

    /// NETSCAPE2.0 loop count; `Some(0)` loops forever
    pub fn loop_count(&self) -> Option<u16> {
        self.decoder.loop_count()
    }

    pub fn frames(&self) -> &[Frame] {
        self.decoder.frames()
    }

    fn read_until(&mut self, stop_at: Progress) -> Result<(), DecodingError> {
        while self.decoder.progress() != stop_at {
            let consumed = {
                let buf = self.r.fill_buf()?;
                if buf.is_empty() {
                    return Err(DecodingError::Format("unexpected EOF"));
                }
                self.decoder.update_until(buf, stop_at)?
            };
            self.r.consume(consumed);
        }
        Ok(())
    }
}

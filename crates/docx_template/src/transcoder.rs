//! Token stream transcoder for the target part

use crate::buffer::{TranscodeStats, VariableBuffer};
use crate::config::FillConfig;
use crate::error::FillResult;
use crate::token::{normalize, Token};
use crate::xml_io::{TokenSink, TokenSource, XmlDecoder, XmlEncoder};
use std::io::{BufRead, BufWriter, Write};
use tracing::{debug, warn};

/// Sink adapter that normalizes names before they reach the encoder
pub struct Normalizing<S>(pub S);

impl<S: TokenSink> TokenSink for Normalizing<S> {
    fn emit(&mut self, token: Token) -> FillResult<()> {
        self.0.emit(normalize(token))
    }

    fn finish(&mut self) -> FillResult<()> {
        self.0.finish()
    }
}

/// Drives decode -> buffer/match -> encode over one part
pub struct Transcoder<'c> {
    config: &'c FillConfig,
}

impl<'c> Transcoder<'c> {
    pub fn new(config: &'c FillConfig) -> Self {
        Self { config }
    }

    /// Pull every token from `source`, resolve variables and write the
    /// result to `sink`. Ends by finishing the sink.
    pub fn run<Src, Snk>(&self, source: &mut Src, sink: &mut Snk) -> FillResult<TranscodeStats>
    where
        Src: TokenSource,
        Snk: TokenSink,
    {
        let mut buffer = VariableBuffer::new(self.config);

        while let Some(token) = source.next_token()? {
            if buffer.is_full() {
                warn!(
                    capacity = self.config.buffer_capacity,
                    "no closing delimiter within buffer capacity, releasing held tokens"
                );
                buffer.force_flush(sink)?;
            }
            buffer.push(token, sink)?;
        }

        if !buffer.is_empty() {
            debug!(held = buffer.len(), "part ended inside an unterminated variable");
        }
        let stats = buffer.finish(sink)?;
        sink.finish()?;
        Ok(stats)
    }
}

/// Rewrite one XML part read from `reader` into `writer`
pub fn transcode_part<R: BufRead, W: Write>(
    config: &FillConfig,
    reader: R,
    writer: W,
) -> FillResult<TranscodeStats> {
    let mut decoder = XmlDecoder::new(reader);
    let mut encoder = Normalizing(XmlEncoder::new(BufWriter::new(writer)));
    Transcoder::new(config).run(&mut decoder, &mut encoder)
}

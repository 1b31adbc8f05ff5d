// Audio segments and the small amount of decoding the API accepts
//
// Uploads are either 16 kHz mono WAV files or raw little-endian 16-bit PCM.
// Anything else has to be converted by the client.

use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use thiserror::Error;
use uuid::Uuid;

/// Sample rate expected by whisper models
pub const SAMPLE_RATE: u32 = 16_000;

/// Errors raised while decoding uploaded audio
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Raw PCM data has odd length {0}, expected 16-bit samples")]
    TruncatedPcm(usize),

    #[error("Audio contains no samples")]
    Empty,
}

/// A chunk of decoded mono audio located within a larger stream
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Identity used in logs
    pub id: Uuid,
    /// Mono samples in [-1.0, 1.0] at `SAMPLE_RATE`
    pub samples: Arc<[f32]>,
    /// Offset of the first sample within the stream, in seconds
    pub start: f64,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, start: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            samples: samples.into(),
            start,
        }
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / SAMPLE_RATE as f64
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration()
    }
}

impl fmt::Display for AudioSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioSegment(id={}, start={:.2}s, end={:.2}s)",
            self.id,
            self.start,
            self.end()
        )
    }
}

/// Decode an uploaded file into samples
///
/// Files starting with a RIFF header are read as WAV, everything else is
/// treated as raw little-endian signed 16-bit PCM. Uploads without a single
/// sample are rejected.
pub fn decode_upload(data: &[u8]) -> Result<Vec<f32>, AudioError> {
    let samples = if data.starts_with(b"RIFF") {
        decode_wav(data)?
    } else {
        decode_pcm_s16le(data)?
    };

    if samples.is_empty() {
        return Err(AudioError::Empty);
    }
    Ok(samples)
}

/// Decode raw little-endian signed 16-bit PCM
pub fn decode_pcm_s16le(data: &[u8]) -> Result<Vec<f32>, AudioError> {
    if data.len() % 2 != 0 {
        return Err(AudioError::TruncatedPcm(data.len()));
    }

    Ok(data
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect())
}

/// Decode an in-memory 16 kHz mono WAV file
pub fn decode_wav(data: &[u8]) -> Result<Vec<f32>, AudioError> {
    let reader = WavReader::new(Cursor::new(data))?;
    let spec = reader.spec();

    if spec.channels != 1 {
        return Err(AudioError::UnsupportedFormat(format!(
            "expected 1 channel, found {}",
            spec.channels
        )));
    }
    if spec.sample_rate != SAMPLE_RATE {
        return Err(AudioError::UnsupportedFormat(format!(
            "expected {} Hz sample rate, found {} Hz",
            SAMPLE_RATE, spec.sample_rate
        )));
    }

    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|s| s as f32 / 32768.0).map_err(AudioError::from))
            .collect(),
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .map(|s| s.map_err(AudioError::from))
            .collect(),
        (format, bits) => Err(AudioError::UnsupportedFormat(format!(
            "{:?} samples with {} bits are not supported",
            format, bits
        ))),
    }
}

/// Write samples as a 16 kHz mono 16-bit WAV file
pub fn write_wav(path: &Path, samples: &[f32]) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value)?;
    }
    writer.finalize()
}

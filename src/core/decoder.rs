// src/core/decoder.rs
//
// File -> interleaved f32 -> mono at the pipeline rate.

use anyhow::{bail, Context, Result};
use log::debug;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use std::fs::File;
use std::path::Path;

use super::dsp::resample;

/// File extensions the dataset builder treats as audio
pub const AUDIO_EXTENSIONS: [&str; 8] = ["wav", "flac", "mp3", "ogg", "m4a", "aac", "aiff", "aif"];

/// Decoded PCM as read from the file
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Interleaved samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
}

impl AudioData {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Average of all channels per frame
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }
        let scale = 1.0 / self.channels as f32;
        self.samples
            .chunks_exact(self.channels)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect()
    }
}

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

struct TrackInfo {
    id: u32,
    sample_rate: u32,
    channels: usize,
}

fn open_format(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, stream, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Unrecognized or corrupt audio container: {}", path.display()))?;
    Ok(probed.format)
}

fn first_audio_track(format: &dyn FormatReader) -> Result<(TrackInfo, Box<dyn Decoder>)> {
    let Some(track) = format.tracks().iter().find(|t| t.codec_params.codec != CODEC_TYPE_NULL) else {
        bail!("no decodable audio track");
    };
    let params = &track.codec_params;

    let sample_rate = params.sample_rate.context("track has no sample rate")?;
    let channels = params.channels.map_or(1, |c| c.count());
    if channels == 0 {
        bail!("track reports zero channels");
    }

    let decoder = symphonia::default::get_codecs()
        .make(params, &DecoderOptions::default())
        .with_context(|| format!("unsupported codec {:?}", params.codec))?;
    debug!("codec {:?}, {} Hz, {} channel(s)", params.codec, sample_rate, channels);

    Ok((TrackInfo { id: track.id, sample_rate, channels }, decoder))
}

/// Next packet of `track_id`, or `None` at end of stream
fn next_packet(format: &mut dyn FormatReader, decoder: &mut dyn Decoder, track_id: u32) -> Result<Option<Packet>> {
    loop {
        match format.next_packet() {
            Ok(packet) if packet.track_id() == track_id => return Ok(Some(packet)),
            Ok(_) => continue,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(SymphoniaError::ResetRequired) => decoder.reset(),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Decode a whole file into interleaved f32 samples
///
/// The file is closed before returning. A valid stream with no packets
/// decodes to an empty buffer; corrupt packets are dropped.
pub fn decode_audio(path: &Path) -> Result<AudioData> {
    let mut format = open_format(path)?;
    let (track, mut decoder) = first_audio_track(&*format)?;

    let mut samples = Vec::new();
    let mut scratch: Option<SampleBuffer<f32>> = None;

    while let Some(packet) = next_packet(&mut *format, &mut *decoder, track.id)? {
        let block = match decoder.decode(&packet) {
            Ok(block) => block,
            Err(SymphoniaError::DecodeError(reason)) => {
                debug!("{}: dropping corrupt packet ({})", path.display(), reason);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *block.spec();
        let needed = block.capacity() * spec.channels.count();
        let mut buf = match scratch.take() {
            Some(buf) if buf.capacity() >= needed => buf,
            _ => SampleBuffer::new(block.capacity() as u64, spec),
        };
        buf.copy_interleaved_ref(block);
        samples.extend_from_slice(buf.samples());
        scratch = Some(buf);
    }

    Ok(AudioData {
        samples,
        sample_rate: track.sample_rate,
        channels: track.channels,
    })
}

/// Decode, downmix and resample a file to mono at `target_rate`
pub fn load_waveform(path: &Path, target_rate: u32) -> Result<Vec<f32>> {
    let audio = decode_audio(path)?;
    let mono = audio.to_mono();

    if audio.sample_rate == target_rate {
        return Ok(mono);
    }

    debug!(
        "Resampling {} ({:.2}s) from {} Hz to {} Hz",
        path.display(),
        audio.duration_secs(),
        audio.sample_rate,
        target_rate
    );
    resample(&mono, audio.sample_rate as f64, target_rate as f64)
        .with_context(|| format!("Failed to resample {}", path.display()))
}

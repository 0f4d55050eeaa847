//! Audio frame types and frame sources

pub mod capture;
pub mod playback;

pub use capture::MicFrameSource;
pub use playback::AudioPlayback;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{Error, Result};

/// Sample rate for the recognition pipeline (16kHz mono PCM16)
pub const SAMPLE_RATE: u32 = 16_000;

/// An immutable buffer of raw PCM16 samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pcm: Vec<u8>,
}

impl AudioFrame {
    /// Wrap raw PCM16 bytes in a frame
    #[must_use]
    pub const fn new(pcm: Vec<u8>) -> Self {
        Self { pcm }
    }

    /// A frame of digital silence, used to preserve link cadence while
    /// inbound audio is suppressed or absent
    #[must_use]
    pub fn silence(len: usize) -> Self {
        Self { pcm: vec![0; len] }
    }

    /// Frame length in bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.pcm.len()
    }

    /// Whether the frame holds no samples
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }

    /// Whether every sample in the frame is zero
    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.pcm.iter().all(|&b| b == 0)
    }

    /// Consume the frame, yielding its PCM bytes
    #[must_use]
    pub fn into_pcm(self) -> Vec<u8> {
        self.pcm
    }

    /// Borrow the PCM bytes
    #[must_use]
    pub fn pcm(&self) -> &[u8] {
        &self.pcm
    }
}

impl From<Vec<u8>> for AudioFrame {
    fn from(pcm: Vec<u8>) -> Self {
        Self::new(pcm)
    }
}

/// A producer of raw PCM audio frames
///
/// Implemented by the local microphone capture and by the WebSocket
/// transport adapter; the session coordinator only sees this trait.
#[async_trait]
pub trait AudioFrameSource: Send {
    /// The next frame, or `None` once the source is closed
    async fn next_frame(&mut self) -> Option<AudioFrame>;
}

/// Frame source backed by an in-process channel
///
/// The network transport pushes inbound binary frames into the sending
/// half; the coordinator drains this end.
pub struct ChannelFrameSource {
    rx: mpsc::Receiver<AudioFrame>,
}

impl ChannelFrameSource {
    /// Create a bounded channel-backed source, returning the feeder half
    #[must_use]
    pub fn new(capacity: usize) -> (mpsc::Sender<AudioFrame>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

#[async_trait]
impl AudioFrameSource for ChannelFrameSource {
    async fn next_frame(&mut self) -> Option<AudioFrame> {
        self.rx.recv().await
    }
}

/// Wrap raw PCM16 mono bytes in a WAV container
///
/// # Errors
///
/// Returns error if WAV encoding fails or the input is not whole samples
pub fn pcm16_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
    if pcm.len() % 2 != 0 {
        return Err(Error::Audio("PCM16 payload has a partial sample".to_string()));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for sample in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([sample[0], sample[1]]))
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_frame_is_zeroed() {
        let frame = AudioFrame::silence(320);
        assert_eq!(frame.len(), 320);
        assert!(frame.is_silent());
    }

    #[test]
    fn frame_preserves_pcm() {
        let frame = AudioFrame::new(vec![1, 2, 3, 4]);
        assert!(!frame.is_silent());
        assert_eq!(frame.into_pcm(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn pcm16_to_wav_writes_riff_header() {
        let pcm: Vec<u8> = (0..320u16).flat_map(|s| s.to_le_bytes()).collect();
        let wav = pcm16_to_wav(&pcm, SAMPLE_RATE).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert!(wav.len() > 44);
    }

    #[test]
    fn pcm16_to_wav_rejects_partial_sample() {
        assert!(pcm16_to_wav(&[0, 0, 0], SAMPLE_RATE).is_err());
    }

    #[test]
    fn pcm16_wav_roundtrip() {
        let samples: Vec<i16> = vec![0, 100, -100, i16::MAX, i16::MIN];
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let wav = pcm16_to_wav(&pcm, SAMPLE_RATE).unwrap();

        let mut reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        assert_eq!(reader.spec().channels, 1);
        let read: Vec<i16> = reader.samples::<i16>().map(std::result::Result::unwrap).collect();
        assert_eq!(read, samples);
    }

    #[tokio::test]
    async fn channel_source_yields_frames_then_closes() {
        let (tx, mut source) = ChannelFrameSource::new(4);
        tx.send(AudioFrame::new(vec![7, 7])).await.unwrap();
        drop(tx);

        assert_eq!(source.next_frame().await, Some(AudioFrame::new(vec![7, 7])));
        assert_eq!(source.next_frame().await, None);
    }
}

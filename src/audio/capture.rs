//! Audio capture from the local microphone

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use tokio::sync::mpsc;

use super::{AudioFrame, AudioFrameSource, SAMPLE_RATE};
use crate::{Error, Result};

/// Frames buffered between the capture callback and the consumer
const CAPTURE_QUEUE: usize = 64;

/// Captures audio from the default input device as PCM16 frames
///
/// The cpal callback runs on its own audio thread; frames cross into
/// async land over a bounded channel. When the consumer falls behind,
/// frames are dropped rather than blocking the capture device.
pub struct MicFrameSource {
    rx: mpsc::Receiver<AudioFrame>,
    // Held so the device keeps capturing; dropping it ends the capture
    // thread, which owns the (non-Send) stream.
    _shutdown: std::sync::mpsc::Sender<()>,
}

impl MicFrameSource {
    /// Open the default input device and start capturing
    ///
    /// # Errors
    ///
    /// Returns error if no input device is available or the stream
    /// cannot be built at 16kHz mono
    pub fn open() -> Result<Self> {
        let (tx, rx) = mpsc::channel(CAPTURE_QUEUE);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let (shutdown_tx, shutdown_rx) = std::sync::mpsc::channel::<()>();

        // cpal streams are not Send; a dedicated thread owns the stream
        // and holds it alive until this source is dropped.
        std::thread::spawn(move || {
            let stream = match open_stream(&tx) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            let _ = shutdown_rx.recv();
            drop(stream);
        });

        ready_rx
            .recv()
            .map_err(|_| Error::Audio("capture thread exited".to_string()))??;

        Ok(Self {
            rx,
            _shutdown: shutdown_tx,
        })
    }
}

/// Build and start the input stream, feeding frames into `tx`
fn open_stream(tx: &mpsc::Sender<AudioFrame>) -> Result<Stream> {
    {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable input config found".to_string()))?;

        let config: StreamConfig = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "microphone capture initialized"
        );

        let tx = tx.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let frame = AudioFrame::new(samples_to_pcm16(data));
                    if tx.try_send(frame).is_err() {
                        tracing::trace!("capture queue full, dropping frame");
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        Ok(stream)
    }
}

#[async_trait]
impl AudioFrameSource for MicFrameSource {
    async fn next_frame(&mut self) -> Option<AudioFrame> {
        self.rx.recv().await
    }
}

/// Convert f32 samples in `[-1.0, 1.0]` to little-endian PCM16 bytes
fn samples_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut pcm = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        #[allow(clippy::cast_possible_truncation)]
        let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        pcm.extend_from_slice(&sample_i16.to_le_bytes());
    }
    pcm
}

//! Audio output bus implementations
//!
//! The playback core talks to a synchronous output bus: enable, disable,
//! reclock to a sample rate, and a blocking write of interleaved stereo
//! i16 samples. The blocking write is the only backpressure in the
//! pipeline; it paces decoding to real time.
//!
//! Implementations:
//! - `CpalAudioBus`: cpal output stream fed through a lock-free ring buffer
//! - `WavFileBus`: 16-bit stereo WAV segments written with hound

use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use hound::{WavSpec, WavWriter};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Bytes per interleaved i16 sample
const BYTES_PER_SAMPLE: usize = std::mem::size_of::<i16>();

/// Default ring size in stereo frames (~93ms at 44.1kHz)
pub const DEFAULT_RING_FRAMES: usize = 4096;

/// Synchronous audio output bus.
///
/// `write` takes interleaved stereo samples and blocks until the sink has
/// accepted all of them. It returns the number of bytes written.
pub trait AudioBus {
    fn enable(&mut self) -> Result<()>;

    fn disable(&mut self) -> Result<()>;

    /// Apply a new clock configuration. Only called while disabled.
    fn reconfigure(&mut self, sample_rate: u32) -> Result<()>;

    fn write(&mut self, samples: &[i16]) -> Result<usize>;
}

/// List available audio output devices.
pub fn list_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();

    let devices: Vec<String> = host
        .output_devices()
        .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
        .filter_map(|device| device.name().ok())
        .collect();

    debug!("Found {} output devices", devices.len());
    Ok(devices)
}

/// Output bus backed by a cpal stream.
///
/// Samples travel from the playback thread to the audio callback through a
/// single-producer single-consumer ring of stereo frames. The callback
/// never blocks; it outputs silence on underrun.
pub struct CpalAudioBus {
    device: Device,
    ring_frames: usize,
    sample_rate: Option<u32>,
    stream: Option<Stream>,
    producer: Option<HeapProd<[i16; 2]>>,
    enabled: bool,
    /// Stream error flag - set by audio callback on error
    error_flag: Arc<AtomicBool>,
    underruns: Arc<AtomicU64>,
}

impl CpalAudioBus {
    /// Open audio device for output.
    ///
    /// # Fallback Behavior
    /// If the requested device is not found, the default device is used.
    pub fn open(device_name: Option<&str>, ring_frames: usize) -> Result<Self> {
        let host = cpal::default_host();

        let device = if let Some(name) = device_name {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

            match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                Some(dev) => {
                    info!("Found requested audio device: {}", name);
                    dev
                }
                None => {
                    warn!("Requested device '{}' not found, falling back to default device", name);
                    host.default_output_device().ok_or_else(|| {
                        Error::AudioOutput(format!(
                            "Device '{}' not found and no default device available",
                            name
                        ))
                    })?
                }
            }
        } else {
            host.default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?
        };

        info!(
            "Using audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        Ok(Self {
            device,
            ring_frames: ring_frames.max(256),
            sample_rate: None,
            stream: None,
            producer: None,
            enabled: false,
            error_flag: Arc::new(AtomicBool::new(false)),
            underruns: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Pick a stereo-capable config at `sample_rate`, preferring i16, then
    /// f32, then u16.
    fn find_config(&self, sample_rate: u32) -> Result<(StreamConfig, SampleFormat)> {
        let supported: Vec<_> = self
            .device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?
            .filter(|range| {
                range.channels() >= 2
                    && range.min_sample_rate().0 <= sample_rate
                    && range.max_sample_rate().0 >= sample_rate
            })
            .collect();

        for format in [SampleFormat::I16, SampleFormat::F32, SampleFormat::U16] {
            if let Some(range) = supported.iter().find(|r| r.sample_format() == format) {
                let config = range.clone().with_sample_rate(cpal::SampleRate(sample_rate));
                return Ok((config.config(), format));
            }
        }

        Err(Error::AudioOutput(format!(
            "Device has no stereo configuration at {} Hz",
            sample_rate
        )))
    }

    fn build_stream<T>(
        &self,
        config: &StreamConfig,
        mut consumer: HeapCons<[i16; 2]>,
    ) -> Result<Stream>
    where
        T: SizedSample + FromSample<i16>,
    {
        let channels = config.channels as usize;
        let error_flag = Arc::clone(&self.error_flag);
        let underruns = Arc::clone(&self.underruns);

        self.device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut starved = false;
                    for frame in data.chunks_mut(channels) {
                        let [left, right] = consumer.try_pop().unwrap_or_else(|| {
                            starved = true;
                            [0, 0]
                        });
                        for (ch, slot) in frame.iter_mut().enumerate() {
                            let value = match ch {
                                0 => left,
                                1 => right,
                                _ => 0,
                            };
                            *slot = T::from_sample(value);
                        }
                    }
                    if starved {
                        underruns.fetch_add(1, Ordering::Relaxed);
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    /// Wait for queued frames to play out, bounded by the ring length
    fn drain(&self) {
        let Some(producer) = self.producer.as_ref() else {
            return;
        };
        let rate = self.sample_rate.unwrap_or(44100).max(1) as u64;
        let limit = Duration::from_millis(self.ring_frames as u64 * 1000 / rate + 50);
        let started = Instant::now();

        while producer.occupied_len() > 0 && started.elapsed() < limit {
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    /// Check if an audio stream error has occurred.
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    /// Callbacks that ran out of queued audio
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

impl AudioBus for CpalAudioBus {
    fn enable(&mut self) -> Result<()> {
        if self.enabled {
            return Ok(());
        }
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| Error::InvalidState("enable before reconfigure".to_string()))?;
        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;
        self.enabled = true;
        debug!("Audio stream enabled");
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.drain();
        if let Some(stream) = self.stream.as_ref() {
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
        }
        self.enabled = false;
        debug!("Audio stream disabled");
        Ok(())
    }

    fn reconfigure(&mut self, sample_rate: u32) -> Result<()> {
        if self.enabled {
            self.disable()?;
        }

        // Old stream and ring go away together
        self.stream = None;
        self.producer = None;

        let (config, format) = self.find_config(sample_rate)?;
        let ring = HeapRb::<[i16; 2]>::new(self.ring_frames);
        let (producer, consumer) = ring.split();

        let stream = match format {
            SampleFormat::I16 => self.build_stream::<i16>(&config, consumer)?,
            SampleFormat::F32 => self.build_stream::<f32>(&config, consumer)?,
            SampleFormat::U16 => self.build_stream::<u16>(&config, consumer)?,
            other => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };
        // Built streams may start running on some hosts
        let _ = stream.pause();

        info!(
            "Audio bus clocked at {} Hz ({} channels, {:?})",
            sample_rate, config.channels, format
        );

        self.stream = Some(stream);
        self.producer = Some(producer);
        self.sample_rate = Some(sample_rate);
        self.error_flag.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize> {
        let producer = self
            .producer
            .as_mut()
            .ok_or_else(|| Error::InvalidState("write before reconfigure".to_string()))?;

        let mut frames = samples.chunks_exact(2).map(|pair| [pair[0], pair[1]]).peekable();
        let mut written = 0usize;

        while let Some(&frame) = frames.peek() {
            if producer.try_push(frame).is_ok() {
                frames.next();
                written += 2;
            } else {
                if self.error_flag.load(Ordering::SeqCst) {
                    return Err(Error::AudioOutput("Audio stream failed".to_string()));
                }
                // Ring full, wait for the callback to make room
                std::thread::sleep(Duration::from_millis(1));
            }
        }

        Ok(written * BYTES_PER_SAMPLE)
    }
}

impl Drop for CpalAudioBus {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
        }
    }
}

/// Output bus that records to 16-bit stereo WAV files.
///
/// A WAV file has one sample rate, so each reclock to a different rate
/// finalizes the current file and starts a new segment named
/// `<stem>.<n>.<ext>`. With `realtime` set, writes sleep for the duration
/// of the audio they carry so the player runs at playback speed.
pub struct WavFileBus {
    path: PathBuf,
    realtime: bool,
    sample_rate: Option<u32>,
    writer: Option<WavWriter<BufWriter<File>>>,
    segments: usize,
    enabled: bool,
}

impl WavFileBus {
    pub fn new(path: impl Into<PathBuf>, realtime: bool) -> Self {
        Self {
            path: path.into(),
            realtime,
            sample_rate: None,
            writer: None,
            segments: 0,
            enabled: false,
        }
    }

    /// Paths of the segments written so far, in order
    pub fn segment_paths(&self) -> Vec<PathBuf> {
        (0..self.segments).map(|n| self.segment_path(n)).collect()
    }

    fn segment_path(&self, index: usize) -> PathBuf {
        if index == 0 {
            return self.path.clone();
        }
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let ext = self
            .path
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "wav".to_string());
        let parent = self.path.parent().unwrap_or_else(|| Path::new(""));
        parent.join(format!("{}.{}.{}", stem, index, ext))
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| Error::AudioOutput(format!("Failed to finalize WAV: {}", e)))?;
        }
        Ok(())
    }
}

impl AudioBus for WavFileBus {
    fn enable(&mut self) -> Result<()> {
        if self.sample_rate.is_none() {
            return Err(Error::InvalidState("enable before reconfigure".to_string()));
        }
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.enabled = false;
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| Error::AudioOutput(format!("Failed to flush WAV: {}", e)))?;
        }
        Ok(())
    }

    fn reconfigure(&mut self, sample_rate: u32) -> Result<()> {
        if self.sample_rate == Some(sample_rate) && self.writer.is_some() {
            return Ok(());
        }
        self.finalize()?;

        let path = self.segment_path(self.segments);
        let spec = WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = WavWriter::create(&path, spec)
            .map_err(|e| Error::AudioOutput(format!("Failed to create {}: {}", path.display(), e)))?;

        info!("Writing {} Hz audio to {}", sample_rate, path.display());
        self.writer = Some(writer);
        self.segments += 1;
        self.sample_rate = Some(sample_rate);
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize> {
        if !self.enabled {
            return Err(Error::InvalidState("write while disabled".to_string()));
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::InvalidState("write before reconfigure".to_string()))?;

        let started = Instant::now();
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::AudioOutput(format!("Failed to write WAV: {}", e)))?;
        }

        if self.realtime {
            if let Some(rate) = self.sample_rate.filter(|r| *r > 0) {
                let frames = (samples.len() / 2) as u64;
                let duration = Duration::from_micros(frames * 1_000_000 / rate as u64);
                if let Some(remaining) = duration.checked_sub(started.elapsed()) {
                    std::thread::sleep(remaining);
                }
            }
        }

        Ok(samples.len() * BYTES_PER_SAMPLE)
    }
}

impl Drop for WavFileBus {
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            warn!("{}", e);
        }
    }
}

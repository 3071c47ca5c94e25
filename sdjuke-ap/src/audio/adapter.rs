//! Output adapter
//!
//! Sits between decoded frames and the audio bus. Remembers the format the
//! bus was last clocked for and reclocks it when a frame arrives at a
//! different sample rate; expands mono frames to interleaved stereo before
//! they are written.

use crate::audio::output::AudioBus;
use crate::audio::types::DecodedFrame;
use crate::error::Result;
use tracing::{debug, info};

/// Bus state as last configured by the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Maps decoded PCM frames onto an [`AudioBus`]
pub struct OutputAdapter<B: AudioBus> {
    bus: B,
    format: Option<BusFormat>,
    enabled: bool,
    format_changes: u64,
}

impl<B: AudioBus> OutputAdapter<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            format: None,
            enabled: false,
            format_changes: 0,
        }
    }

    /// Format the bus is currently clocked for, if any
    pub fn format(&self) -> Option<BusFormat> {
        self.format
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of times the bus has been reclocked
    pub fn format_changes(&self) -> u64 {
        self.format_changes
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Write one decoded frame to the bus.
    ///
    /// Reclocks the bus first when the sample rate differs from the last
    /// configured one (disable, reconfigure, enable). Mono frames are
    /// expanded to stereo in place. A frame without samples is ignored.
    ///
    /// Returns the number of PCM bytes the bus accepted.
    pub fn write_frame(&mut self, frame: &mut DecodedFrame) -> Result<usize> {
        if frame.sample_count == 0 {
            return Ok(0);
        }

        match self.format {
            Some(format) if format.sample_rate == frame.sample_rate => {
                if format.channels != frame.channels {
                    debug!(
                        from = format.channels,
                        to = frame.channels,
                        "Channel count changed"
                    );
                    self.format = Some(BusFormat {
                        channels: frame.channels,
                        ..format
                    });
                }
                if !self.enabled {
                    self.bus.enable()?;
                    self.enabled = true;
                }
            }
            previous => {
                if self.enabled {
                    self.bus.disable()?;
                    self.enabled = false;
                }
                self.bus.reconfigure(frame.sample_rate)?;
                self.format = Some(BusFormat {
                    sample_rate: frame.sample_rate,
                    channels: frame.channels,
                });
                self.format_changes += 1;
                info!(
                    sample_rate = frame.sample_rate,
                    channels = frame.channels,
                    previous_rate = previous.map(|f| f.sample_rate),
                    "Audio bus reclocked"
                );
                self.bus.enable()?;
                self.enabled = true;
            }
        }

        frame.expand_mono_to_stereo();
        self.bus.write(frame.samples())
    }

    /// Disable the bus if it is enabled. Safe to call repeatedly.
    pub fn release(&mut self) -> Result<()> {
        if self.enabled {
            self.enabled = false;
            self.bus.disable()?;
        }
        Ok(())
    }
}

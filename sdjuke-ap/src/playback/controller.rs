//! Playback controller
//!
//! Plays one track from open to close: streams compressed bytes through
//! the frame decoder into the output adapter, polling the skip flags once
//! per frame. Every outcome is folded into a [`PlaybackStatus`]; nothing
//! escapes to the player loop as an error.

use crate::audio::adapter::OutputAdapter;
use crate::audio::decoder::FrameDecoder;
use crate::audio::output::AudioBus;
use crate::audio::stream_buffer::CompressedStreamBuffer;
use crate::audio::types::{DecodedFrame, FrameInfo};
use crate::error::Result;
use crate::playback::skip::{SkipRequest, SkipRequests};
use crate::storage::Storage;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How a track ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// End of file, unrecoverable stream error, or the file could not be opened
    Finished,
    SkippedForward,
    SkippedBackward,
}

impl PlaybackStatus {
    pub fn is_skip(&self) -> bool {
        !matches!(self, PlaybackStatus::Finished)
    }
}

impl From<SkipRequest> for PlaybackStatus {
    fn from(request: SkipRequest) -> Self {
        match request {
            SkipRequest::Forward => PlaybackStatus::SkippedForward,
            SkipRequest::Backward => PlaybackStatus::SkippedBackward,
        }
    }
}

/// Controller lifecycle, observable between and after calls to `play`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Starting,
    Streaming,
    Done(PlaybackStatus),
}

/// Per-track counters, logged when a track ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackReport {
    pub path: PathBuf,
    pub status: PlaybackStatus,
    /// Frames that produced audio
    pub frames_decoded: u64,
    /// Frames consumed without audio (tags, junk, undecodable)
    pub non_audio_frames: u64,
    /// PCM bytes accepted by the bus
    pub bytes_written: u64,
    /// Bus reclocks during this track
    pub format_changes: u64,
    pub elapsed: Duration,
}

impl TrackReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            status: PlaybackStatus::Finished,
            frames_decoded: 0,
            non_audio_frames: 0,
            bytes_written: 0,
            format_changes: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// Single-track streaming engine.
///
/// The stream buffer and decoded frame are allocated once and reused for
/// every track.
pub struct PlaybackController<D: FrameDecoder, B: AudioBus> {
    decoder: D,
    adapter: OutputAdapter<B>,
    buffer: CompressedStreamBuffer,
    frame: DecodedFrame,
    skips: Arc<SkipRequests>,
    state: ControllerState,
    last_report: Option<TrackReport>,
}

impl<D: FrameDecoder, B: AudioBus> PlaybackController<D, B> {
    pub fn new(decoder: D, bus: B, buffer: CompressedStreamBuffer, skips: Arc<SkipRequests>) -> Self {
        Self {
            decoder,
            adapter: OutputAdapter::new(bus),
            buffer,
            frame: DecodedFrame::new(),
            skips,
            state: ControllerState::Idle,
            last_report: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Counters of the most recently played track
    pub fn last_report(&self) -> Option<&TrackReport> {
        self.last_report.as_ref()
    }

    pub fn adapter(&self) -> &OutputAdapter<B> {
        &self.adapter
    }

    pub fn skips(&self) -> &Arc<SkipRequests> {
        &self.skips
    }

    /// Play `path` to completion or until a skip is requested.
    ///
    /// Pending skip requests are discarded at the start of the track. The
    /// file is closed and the bus disabled before this returns.
    pub fn play<S: Storage>(&mut self, storage: &S, path: &Path) -> PlaybackStatus {
        self.state = ControllerState::Starting;
        self.skips.clear();
        self.decoder.reset();
        self.buffer.reset();

        let mut file = match storage.open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to open {}: {}", path.display(), e);
                self.state = ControllerState::Done(PlaybackStatus::Finished);
                return PlaybackStatus::Finished;
            }
        };

        info!("Playing: {}", path.display());
        let started = Instant::now();
        let reclocks_before = self.adapter.format_changes();
        let mut report = TrackReport::new(path);

        self.state = ControllerState::Streaming;
        let status = self.stream(&mut file, &mut report);

        drop(file);
        if let Err(e) = self.adapter.release() {
            warn!("Failed to disable audio bus: {}", e);
        }

        report.status = status;
        report.format_changes = self.adapter.format_changes() - reclocks_before;
        report.elapsed = started.elapsed();
        info!(
            status = ?status,
            frames = report.frames_decoded,
            non_audio = report.non_audio_frames,
            bytes = report.bytes_written,
            reclocks = report.format_changes,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Track ended: {}",
            path.display()
        );

        self.last_report = Some(report);
        self.state = ControllerState::Done(status);
        status
    }

    /// Frame loop for an open file
    fn stream<R: Read>(&mut self, file: &mut R, report: &mut TrackReport) -> PlaybackStatus {
        if let Err(e) = self.buffer.refill(file) {
            warn!("Read error in {}: {}", report.path.display(), e);
            return PlaybackStatus::Finished;
        }

        loop {
            if let Some(request) = self.skips.take() {
                debug!(?request, "Skip requested");
                return request.into();
            }

            if self.buffer.is_exhausted() {
                return PlaybackStatus::Finished;
            }

            let info = match self.decode_with_retry(file) {
                Ok(info) => info,
                Err(e) => {
                    warn!("Read error in {}: {}", report.path.display(), e);
                    return PlaybackStatus::Finished;
                }
            };
            if info.is_terminal() {
                debug!(unread = self.buffer.len(), "No further frames");
                return PlaybackStatus::Finished;
            }

            if self.frame.sample_count > 0 {
                match self.adapter.write_frame(&mut self.frame) {
                    Ok(bytes) => {
                        report.frames_decoded += 1;
                        report.bytes_written += bytes as u64;
                    }
                    Err(e) => {
                        warn!("Audio output failed: {}", e);
                        return PlaybackStatus::Finished;
                    }
                }
            } else {
                report.non_audio_frames += 1;
            }

            self.buffer.consume(info.frame_bytes);

            if self.buffer.needs_refill() {
                if let Err(e) = self.buffer.refill(file) {
                    warn!("Read error in {}: {}", report.path.display(), e);
                    return PlaybackStatus::Finished;
                }
            }
        }
    }

    /// Decode one frame; if the window held only part of a frame and a
    /// refill brings in more bytes, decode once more.
    fn decode_with_retry<R: Read>(&mut self, file: &mut R) -> Result<FrameInfo> {
        let info = self.decoder.decode(self.buffer.unread(), &mut self.frame);
        if !info.is_terminal() {
            return Ok(info);
        }

        if self.buffer.refill(file)? == 0 {
            return Ok(info);
        }
        Ok(self.decoder.decode(self.buffer.unread(), &mut self.frame))
    }
}

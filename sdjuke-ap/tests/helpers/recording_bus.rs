//! Audio bus that records every call
//!
//! The log is shared, so a test can keep a handle after the bus has been
//! moved into a controller. An optional hook raises a skip request after a
//! given number of writes, standing in for a button press mid-track.

use sdjuke_ap::audio::AudioBus;
use sdjuke_ap::playback::{SkipRequest, SkipRequests};
use sdjuke_ap::Result;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusCall {
    Enable,
    Disable,
    Reconfigure(u32),
    /// Number of samples written
    Write(usize),
}

/// Shared call log plus current bus state
#[derive(Debug, Default)]
pub struct BusLog {
    pub calls: Vec<BusCall>,
    pub enabled: bool,
    pub sample_rate: Option<u32>,
    pub samples: Vec<i16>,
    pub writes: usize,
}

impl BusLog {
    pub fn reconfigures(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BusCall::Reconfigure(rate) => Some(*rate),
                _ => None,
            })
            .collect()
    }
}

struct SkipHook {
    after_writes: usize,
    skips: Arc<SkipRequests>,
    request: SkipRequest,
}

pub struct RecordingBus {
    log: Arc<Mutex<BusLog>>,
    hook: Option<SkipHook>,
    keep_samples: bool,
}

impl RecordingBus {
    pub fn new() -> (Self, Arc<Mutex<BusLog>>) {
        let log = Arc::new(Mutex::new(BusLog::default()));
        let bus = Self {
            log: Arc::clone(&log),
            hook: None,
            keep_samples: false,
        };
        (bus, log)
    }

    /// Keep a copy of every written sample
    pub fn keep_samples(mut self) -> Self {
        self.keep_samples = true;
        self
    }

    /// Raise `request` once `after_writes` writes have completed
    pub fn skip_after(
        mut self,
        after_writes: usize,
        skips: Arc<SkipRequests>,
        request: SkipRequest,
    ) -> Self {
        self.hook = Some(SkipHook {
            after_writes,
            skips,
            request,
        });
        self
    }
}

impl AudioBus for RecordingBus {
    fn enable(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.calls.push(BusCall::Enable);
        log.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.calls.push(BusCall::Disable);
        log.enabled = false;
        Ok(())
    }

    fn reconfigure(&mut self, sample_rate: u32) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        assert!(!log.enabled, "reconfigure while enabled");
        log.calls.push(BusCall::Reconfigure(sample_rate));
        log.sample_rate = Some(sample_rate);
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize> {
        let writes = {
            let mut log = self.log.lock().unwrap();
            assert!(log.enabled, "write while disabled");
            log.calls.push(BusCall::Write(samples.len()));
            if self.keep_samples {
                log.samples.extend_from_slice(samples);
            }
            log.writes += 1;
            log.writes
        };

        if let Some(hook) = self.hook.as_ref() {
            if writes == hook.after_writes {
                match hook.request {
                    SkipRequest::Forward => hook.skips.request_forward(),
                    SkipRequest::Backward => hook.skips.request_backward(),
                }
            }
        }

        Ok(samples.len() * 2)
    }
}

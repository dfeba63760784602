//! Background jobs: slow or terminal sequences that must not block the
//! control loop.
//!
//! A [`BackgroundJob`] is handed to the [`TaskPort`](super::ports::TaskPort),
//! which runs it to completion on its own thread via a [`JobRunner`].
//! There is no cancellation; reset and OTA end in a restart.
//!
//! Jobs never decide what the outputs should show afterwards. The control
//! loop owns the switch value, so the task adapter reports a finished job
//! and the loop redrives relay and LED from the committed state.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::config::PlugConfig;
use crate::pins::OutputPin;

use super::ports::{MaintenancePort, OutputPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundJob {
    /// Blink the status LED. The loop restores it when the job ends.
    Identify { blinks: u8 },
    /// Erase WiFi + pairing data and restart.
    FactoryReset,
    /// Hand over to the OTA updater and restart.
    OtaUpdate { beta: bool, loader_beta: bool },
}

impl BackgroundJob {
    /// Jobs that end in a restart.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::FactoryReset | Self::OtaUpdate { .. })
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Identify { .. } => "identify",
            Self::FactoryReset => "factory-reset",
            Self::OtaUpdate { .. } => "ota",
        }
    }
}

/// Timing parameters for job sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTimings {
    pub identify_on_ms: u32,
    pub identify_off_ms: u32,
    pub restart_delay_ms: u32,
}

impl JobTimings {
    pub fn from_config(cfg: &PlugConfig) -> Self {
        Self {
            identify_on_ms: cfg.identify_on_ms,
            identify_off_ms: cfg.identify_off_ms,
            restart_delay_ms: cfg.restart_delay_ms,
        }
    }
}

/// Executes jobs against owned driver handles.
pub struct JobRunner<O, M, D> {
    pub output: O,
    pub maint: M,
    pub delay: D,
    pub led: OutputPin,
    pub timings: JobTimings,
}

impl<O, M, D> JobRunner<O, M, D>
where
    O: OutputPort,
    M: MaintenancePort,
    D: DelayNs,
{
    pub fn run(&mut self, job: BackgroundJob) {
        info!("Job: {} started", job.name());
        match job {
            BackgroundJob::Identify { blinks } => self.identify(blinks),
            BackgroundJob::FactoryReset => {
                self.maint.reset_configuration();
                self.restart();
            }
            BackgroundJob::OtaUpdate { beta, loader_beta } => {
                self.maint.request_ota_update(beta, loader_beta);
                self.restart();
            }
        }
    }

    fn identify(&mut self, blinks: u8) {
        for _ in 0..blinks {
            self.led(true);
            self.delay.delay_ms(self.timings.identify_on_ms);
            self.led(false);
            self.delay.delay_ms(self.timings.identify_off_ms);
        }
        info!("Job: identify done ({} blinks)", blinks);
    }

    fn led(&mut self, lit: bool) {
        let level = self.led.active.level_for(lit);
        if let Err(e) = self.output.write_output(self.led.gpio, level) {
            warn!("Job: LED write failed: {}", e);
        }
    }

    fn restart(&mut self) {
        info!("Job: restarting in {} ms", self.timings.restart_delay_ms);
        self.delay.delay_ms(self.timings.restart_delay_ms);
        self.maint.restart();
    }
}

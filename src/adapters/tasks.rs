//! Thread-backed [`TaskPort`].
//!
//! Every job gets its own short-lived thread pinned to the APP core. The
//! thread builds its own GPIO handle, maintenance collaborator and delay
//! provider, runs the job to completion and exits; the join handle is
//! dropped, so jobs are detached. On the way out it raises
//! [`Event::JobFinished`] so the control loop redrives the outputs.

use crate::app::jobs::{BackgroundJob, JobRunner, JobTimings};
use crate::app::ports::TaskPort;
use crate::drivers::task_pin::{spawn_on_core, Core, TaskSpec};
use crate::error::SpawnError;
use crate::events::{push_event, Event};
use crate::pins::OutputPin;

use super::hardware::GpioHardware;
use super::maintenance::EspMaintenance;

#[cfg(target_os = "espidf")]
use esp_idf_hal::delay::FreeRtos as JobDelay;

#[cfg(not(target_os = "espidf"))]
use ThreadDelay as JobDelay;

/// Host delay provider: parks the job thread.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

#[cfg(not(target_os = "espidf"))]
impl embedded_hal::delay::DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }
}

fn spec_for(job: BackgroundJob) -> TaskSpec {
    match job {
        BackgroundJob::Identify { .. } => TaskSpec {
            core: Core::App,
            priority: 2,
            stack_kb: 4,
            name: "identify\0",
        },
        BackgroundJob::FactoryReset => TaskSpec {
            core: Core::App,
            priority: 5,
            stack_kb: 6,
            name: "factory-reset\0",
        },
        BackgroundJob::OtaUpdate { .. } => TaskSpec {
            core: Core::App,
            priority: 5,
            stack_kb: 6,
            name: "ota\0",
        },
    }
}

pub struct ThreadTaskAdapter {
    led: OutputPin,
    timings: JobTimings,
}

impl ThreadTaskAdapter {
    pub fn new(led: OutputPin, timings: JobTimings) -> Self {
        Self { led, timings }
    }
}

impl TaskPort for ThreadTaskAdapter {
    fn spawn(&mut self, job: BackgroundJob) -> Result<(), SpawnError> {
        let mut runner = JobRunner {
            output: GpioHardware::new(),
            maint: EspMaintenance::new(),
            delay: JobDelay,
            led: self.led,
            timings: self.timings,
        };
        spawn_on_core(spec_for(job), move || {
            runner.run(job);
            push_event(Event::JobFinished);
        })
        .map(|_detached| ())
    }
}

// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Duration;
use log::{debug, warn};
use rand::Rng;
use tokio::time::Instant;
use crate::definitions::{PadIndex, Rgb, LIGHTSHOW_PALETTE, OFF, PAD_COUNT};
use crate::service::{spawn_service, ServiceHandle, StopHandle};
use crate::usb::portal::Portal;

const STEP_PAUSE_UNIT: Duration = Duration::from_millis(100);
const STEP_PAUSE_MAX_UNITS: u32 = 5;

struct ActiveLightshow {
    handle: ServiceHandle,
    duration: Duration,
}

/// Owner of the single lightshow worker. Starting a new run always stops and
/// joins the previous one first, so two runs never write to the portal at the
/// same time.
pub struct Lightshow {
    portal: Portal,
    active: Option<ActiveLightshow>,
}

impl Lightshow {
    pub fn new(portal: Portal) -> Self {
        Self { portal, active: None }
    }

    pub async fn start(&mut self, duration: Duration, join_timeout: Duration) {
        self.stop(join_timeout).await;
        debug!("Lightshow started for {:?}", duration);
        let portal = self.portal.clone();
        let handle = spawn_service(move |stop| run_lightshow(portal, duration, stop));
        self.active = Some(ActiveLightshow { handle, duration });
    }

    /// Cancels the running lightshow and waits up to `join_timeout` for it to
    /// turn the pads off. A worker that does not stop in time is aborted.
    pub async fn stop(&mut self, join_timeout: Duration) {
        let Some(active) = self.active.take() else {
            return;
        };
        if let Err(e) = active.handle.shutdown_timeout(join_timeout).await {
            warn!("Lightshow stop: {}", e);
        }
    }

    /// Duration of the current run, `None` once it has finished or was stopped.
    pub fn active_duration(&self) -> Option<Duration> {
        self.active
            .as_ref()
            .filter(|active| !active.handle.is_finished())
            .map(|active| active.duration)
    }
}

fn random_step() -> (PadIndex, Rgb, Duration) {
    let mut rng = rand::rng();
    let pad = rng.random_range(0..PAD_COUNT);
    let colour = LIGHTSHOW_PALETTE[rng.random_range(0..LIGHTSHOW_PALETTE.len())];
    let pause = STEP_PAUSE_UNIT * rng.random_range(0..=STEP_PAUSE_MAX_UNITS);
    (pad, colour, pause)
}

async fn run_lightshow(portal: Portal, duration: Duration, mut stop: StopHandle) {
    let deadline = Instant::now() + duration;
    while !stop.is_signaled() && Instant::now() < deadline {
        let (pad, colour, pause) = random_step();
        portal.switch_pad(pad, colour).await;
        tokio::select! {
            _ = stop.signaled() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }
    portal.switch_pad(0, OFF).await;
}

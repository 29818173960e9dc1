use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::access_log::AccessLog;
use super::distance::{DistanceFn, EuclideanDistance};
use super::state_machine::{AccessState, AccessStateMachine, GateSignal, TickOutcome};
use crate::error::VaultResult;
use crate::vault::FeatureVector;

/// Camera or other producer of frames
pub trait FrameSource {
    type Frame;

    /// Block until the next frame; `None` ends the stream
    fn next_frame(&mut self) -> VaultResult<Option<Self::Frame>>;
}

/// Face detection and encoding for one frame
pub trait FeatureExtractor {
    type Frame;

    fn extract_features(&mut self, frame: &Self::Frame) -> VaultResult<Vec<FeatureVector>>;
}

/// Shared stop flag for the evaluation loop
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Transition reports delivered to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    Unlocked {
        identity: String,
        at: DateTime<Utc>,
    },
    Locked {
        at: DateTime<Utc>,
    },
    /// Loop halted; `final_state` is always `Locked`
    Stopped {
        final_state: AccessState,
    },
}

type Clock = Box<dyn FnMut() -> DateTime<Utc> + Send>;

/// Single-threaded evaluation loop
///
/// Each iteration pulls one frame, extracts feature vectors, ticks the state
/// machine and forwards transitions to `events`. Unlocks are appended to the
/// access log when one is attached; a failed log write is only a warning.
pub struct Monitor<S, E, D = EuclideanDistance> {
    source: S,
    extractor: E,
    machine: AccessStateMachine<D>,
    events: Sender<MonitorEvent>,
    access_log: Option<AccessLog>,
    clock: Clock,
}

impl<S, E, D> Monitor<S, E, D>
where
    S: FrameSource,
    E: FeatureExtractor<Frame = S::Frame>,
    D: DistanceFn,
{
    pub fn new(
        source: S,
        extractor: E,
        machine: AccessStateMachine<D>,
        events: Sender<MonitorEvent>,
    ) -> Self {
        Self {
            source,
            extractor,
            machine,
            events,
            access_log: None,
            clock: Box::new(Utc::now),
        }
    }

    pub fn with_access_log(mut self, access_log: AccessLog) -> Self {
        self.access_log = Some(access_log);
        self
    }

    /// Replace the wall clock, e.g. with a scripted one
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: FnMut() -> DateTime<Utc> + Send + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn machine(&self) -> &AccessStateMachine<D> {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut AccessStateMachine<D> {
        &mut self.machine
    }

    /// Process one frame
    ///
    /// A frame that fails to arrive or to decode counts as a frame with no
    /// faces, so the grace period keeps running. Returns `None` when the
    /// source is exhausted.
    pub fn step(&mut self) -> Option<TickOutcome> {
        let observed = match self.source.next_frame() {
            Ok(Some(frame)) => match self.extractor.extract_features(&frame) {
                Ok(observed) => observed,
                Err(e) => {
                    log::warn!("Feature extraction failed: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Frame capture failed: {}", e);
                Vec::new()
            }
        };

        let now = (self.clock)();
        let outcome = self.machine.tick(&observed, now);

        if let Some(event) = &outcome.event {
            if let Some(access_log) = &self.access_log {
                if let Err(e) = access_log.append(event) {
                    log::warn!("Could not record access for '{}': {}", event.identity, e);
                }
            }
        }

        match (outcome.signal, &outcome.event) {
            (Some(GateSignal::Unlock), Some(event)) => self.emit(MonitorEvent::Unlocked {
                identity: event.identity.clone(),
                at: event.timestamp,
            }),
            (Some(GateSignal::Lock), _) => self.emit(MonitorEvent::Locked { at: now }),
            _ => {}
        }

        Some(outcome)
    }

    /// Run until `cancel` fires or the source ends
    ///
    /// The token is checked before every tick. On exit the gate is reset to
    /// `Locked` and `Stopped` is sent as the last event.
    pub fn run(&mut self, cancel: &CancellationToken) -> AccessState {
        log::info!(
            "Monitoring started with {} templates",
            self.machine.template_count()
        );

        while !cancel.is_cancelled() {
            if self.step().is_none() {
                log::info!("Frame source exhausted");
                break;
            }
        }

        if self.machine.reset().is_some() {
            let at = (self.clock)();
            self.emit(MonitorEvent::Locked { at });
        }
        let final_state = self.machine.state();
        self.emit(MonitorEvent::Stopped { final_state });
        log::info!("Monitoring stopped");
        final_state
    }

    fn emit(&self, event: MonitorEvent) {
        if self.events.send(event).is_err() {
            log::debug!("Monitor event receiver is gone");
        }
    }
}

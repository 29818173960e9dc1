use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::distance::{DistanceFn, EuclideanDistance};
use crate::vault::{FeatureVector, Template};

/// Gate state. The gate starts `Locked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessState {
    Locked,
    Unlocked,
}

/// A `Locked` to `Unlocked` transition attributed to an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub identity: String,
    pub timestamp: DateTime<Utc>,
}

/// Side effect requested from the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    Unlock,
    Lock,
}

/// Closest template for one probe
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub identity: String,
    pub distance: f64,
}

/// Result of one evaluation tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub state: AccessState,
    /// The match that kept or made the gate unlocked this tick
    pub matched: Option<MatchResult>,
    /// Set only on the tick that unlocked the gate
    pub event: Option<AccessEvent>,
    /// Set only on transitions
    pub signal: Option<GateSignal>,
}

/// Hysteresis state machine over face matches
///
/// Owns the decrypted templates for the lifetime of the evaluation loop.
pub struct AccessStateMachine<D = EuclideanDistance> {
    identities: Vec<String>,
    vectors: Vec<FeatureVector>,
    tolerance: f64,
    grace: Duration,
    distance: D,
    state: AccessState,
    last_match: Option<DateTime<Utc>>,
}

fn grace_duration(grace_seconds: f64) -> Duration {
    Duration::microseconds((grace_seconds.max(0.0) * 1_000_000.0).round() as i64)
}

impl AccessStateMachine<EuclideanDistance> {
    pub fn new(templates: Vec<Template>, tolerance: f64, grace_seconds: f64) -> Self {
        Self::with_distance(templates, tolerance, grace_seconds, EuclideanDistance)
    }
}

impl<D: DistanceFn> AccessStateMachine<D> {
    pub fn with_distance(
        templates: Vec<Template>,
        tolerance: f64,
        grace_seconds: f64,
        distance: D,
    ) -> Self {
        let mut machine = Self {
            identities: Vec::new(),
            vectors: Vec::new(),
            tolerance,
            grace: grace_duration(grace_seconds),
            distance,
            state: AccessState::Locked,
            last_match: None,
        };
        machine.replace_templates(templates);
        machine
    }

    /// Swap in a freshly loaded template set; the gate state is kept
    pub fn replace_templates(&mut self, templates: Vec<Template>) {
        let (identities, vectors): (Vec<String>, Vec<FeatureVector>) = templates
            .into_iter()
            .map(|t| (t.identity, t.vector))
            .unzip();
        self.identities = identities;
        self.vectors = vectors;
    }

    pub fn template_count(&self) -> usize {
        self.vectors.len()
    }

    pub fn state(&self) -> AccessState {
        self.state
    }

    pub fn last_match(&self) -> Option<DateTime<Utc>> {
        self.last_match
    }

    /// Closest template to `probe`; earlier templates win ties
    pub fn best_match(&self, probe: &FeatureVector) -> Option<MatchResult> {
        if self.vectors.is_empty() {
            return None;
        }

        let distances = self.distance.distances(&self.vectors, probe);
        if distances.len() != self.vectors.len() {
            log::warn!(
                "Distance function returned {} values for {} templates",
                distances.len(),
                self.vectors.len()
            );
        }

        let mut best: Option<(usize, f64)> = None;
        for (index, distance) in distances.into_iter().enumerate().take(self.vectors.len()) {
            if distance.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, current)| distance < current) {
                best = Some((index, distance));
            }
        }

        best.map(|(index, distance)| MatchResult {
            identity: self.identities[index].clone(),
            distance,
        })
    }

    /// Evaluate one frame's observations at time `now`
    pub fn tick(&mut self, observed: &[FeatureVector], now: DateTime<Utc>) -> TickOutcome {
        let matched = observed.iter().find_map(|probe| {
            self.best_match(probe)
                .filter(|candidate| candidate.distance < self.tolerance)
        });

        let mut event = None;
        let mut signal = None;

        match &matched {
            Some(found) => {
                self.last_match = Some(now);
                if self.state == AccessState::Locked {
                    self.state = AccessState::Unlocked;
                    log::info!("Access granted to '{}'", found.identity);
                    event = Some(AccessEvent {
                        identity: found.identity.clone(),
                        timestamp: now,
                    });
                    signal = Some(GateSignal::Unlock);
                }
            }
            None => {
                if self.state == AccessState::Unlocked && self.grace_elapsed(now) {
                    self.state = AccessState::Locked;
                    log::info!("No authorized face for the grace period, locking");
                    signal = Some(GateSignal::Lock);
                }
            }
        }

        TickOutcome {
            state: self.state,
            matched,
            event,
            signal,
        }
    }

    fn grace_elapsed(&self, now: DateTime<Utc>) -> bool {
        match self.last_match {
            Some(last) => now - last >= self.grace,
            None => true,
        }
    }

    /// Force the gate back to `Locked`; returns `Lock` if it was unlocked
    pub fn reset(&mut self) -> Option<GateSignal> {
        self.last_match = None;
        match self.state {
            AccessState::Unlocked => {
                self.state = AccessState::Locked;
                Some(GateSignal::Lock)
            }
            AccessState::Locked => None,
        }
    }
}

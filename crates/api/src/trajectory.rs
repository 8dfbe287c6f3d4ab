// =============================================================================
// Orrery API - Trajectory Sampler
// =============================================================================
// Splits [start, end] into equal sub-intervals and records body states at
// each sub-interval's end. Sampling is lazy: the simulation only advances as
// the iterator is pulled.
// =============================================================================

use std::collections::BTreeMap;

use orrery_engine::ParticleRef;
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::handle::{components, SimulationHandle};

/// Position and velocity of one body at one sample time.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BodySample {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
}

/// One recorded instant, keyed by body name.
#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    pub time: f64,
    pub bodies: BTreeMap<String, BodySample>,
}

/// Lazy sample sequence over a borrowed simulation.
///
/// Yields at most `steps` items and stops for good after the first error.
pub struct TrajectorySampler<'a> {
    handle: &'a mut SimulationHandle,
    start: f64,
    end: f64,
    steps: usize,
    next: usize,
    target: Option<usize>,
    failed: bool,
}

impl<'a> TrajectorySampler<'a> {
    /// Validate the window and build the sampler. No integration happens here.
    ///
    /// `start` defaults to the simulation's current time.
    pub fn new(
        handle: &'a mut SimulationHandle,
        start: Option<f64>,
        end: f64,
        steps: i64,
        target: Option<&ParticleRef>,
    ) -> Result<Self, ApiError> {
        let start = start.unwrap_or_else(|| handle.time());
        if !start.is_finite() || !end.is_finite() {
            return Err(ApiError::invalid("startTime and endTime must be finite"));
        }
        if steps <= 0 {
            return Err(ApiError::invalid(format!("steps must be positive, got {}", steps)));
        }
        if end < start {
            return Err(ApiError::invalid(format!(
                "endTime {} is before startTime {}",
                end, start
            )));
        }
        if end == start && steps > 1 {
            return Err(ApiError::invalid(
                "an empty time window can only be sampled once",
            ));
        }
        if start < handle.time() {
            return Err(ApiError::invalid(format!(
                "startTime {} is before the current time {}",
                start,
                handle.time()
            )));
        }
        let steps = steps as usize;
        // Adjacent samples must stay distinct after rounding
        if let Some(k) = (2..=steps)
            .find(|&k| sample_time(start, end, steps, k) <= sample_time(start, end, steps, k - 1))
        {
            return Err(ApiError::invalid(format!(
                "time window [{}, {}] is too narrow for {} steps (samples {} and {} coincide)",
                start,
                end,
                steps,
                k - 1,
                k
            )));
        }
        let target = target.map(|r| handle.resolve(r)).transpose()?;

        Ok(Self {
            handle,
            start,
            end,
            steps,
            next: 1,
            target,
            failed: false,
        })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    fn record(&self) -> Sample {
        let bodies = self
            .handle
            .engine()
            .particles()
            .iter()
            .enumerate()
            .filter(|(i, _)| self.target.map_or(true, |t| t == *i))
            .map(|(_, p)| {
                (
                    p.name.clone(),
                    BodySample {
                        position: components(&p.position),
                        velocity: components(&p.velocity),
                    },
                )
            })
            .collect();
        Sample {
            time: self.handle.time(),
            bodies,
        }
    }
}

/// Time of the k-th sample, k in 1..=steps. The last one is exactly `end`.
fn sample_time(start: f64, end: f64, steps: usize, k: usize) -> f64 {
    if k == steps {
        end
    } else {
        start + (end - start) * (k as f64) / (steps as f64)
    }
}

impl Iterator for TrajectorySampler<'_> {
    type Item = Result<Sample, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next > self.steps {
            return None;
        }
        let time = sample_time(self.start, self.end, self.steps, self.next);
        self.next += 1;

        if let Err(e) = self.handle.engine_mut().integrate(time) {
            self.failed = true;
            return Some(Err(e.into()));
        }
        Some(Ok(self.record()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let left = self.steps + 1 - self.next;
        (0, Some(left))
    }
}

/// Sample the full window eagerly. Used by the trajectory endpoint.
pub fn sample(
    handle: &mut SimulationHandle,
    start: Option<f64>,
    end: f64,
    steps: i64,
    target: Option<&ParticleRef>,
) -> Result<Vec<Sample>, ApiError> {
    let sampler = TrajectorySampler::new(handle, start, end, steps, target)?;
    let (from, to, n) = (sampler.start(), sampler.end(), sampler.steps());
    let samples = sampler.collect::<Result<Vec<_>, _>>()?;
    debug!(id = %handle.id(), from, to, steps = n, "Trajectory sampled");
    Ok(samples)
}

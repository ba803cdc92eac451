use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: String,
    pub duration: Duration,
}

/// Wall-clock durations of the stages of one pipeline run.
#[derive(Debug, Default, Clone)]
pub struct PipelineTimings {
    steps: Vec<StepTiming>,
    step_map: HashMap<String, Duration>,
}

impl PipelineTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, name: impl Into<String>, duration: Duration) {
        let name = name.into();
        self.steps.push(StepTiming {
            name: name.clone(),
            duration,
        });
        *self.step_map.entry(name).or_insert(Duration::ZERO) += duration;
    }

    /// Runs `f`, recording how long it took under `name`.
    pub fn measure<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        let timer = Timer::start(name);
        let value = f();
        let (name, duration) = timer.stop();
        self.add_step(name, duration);
        value
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    pub fn get_step(&self, name: &str) -> Option<Duration> {
        self.step_map.get(name).copied()
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    pub fn log_summary(&self) {
        let total = self.total_duration();
        for step in &self.steps {
            let percentage = if total.as_secs_f64() > 0.0 {
                (step.duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            } else {
                0.0
            };
            debug!(
                "{:<20} {:>10.3}ms ({:>5.1}%)",
                step.name,
                step.duration.as_secs_f64() * 1000.0,
                percentage
            );
        }
        debug!("{:<20} {:>10.3}ms", "total", total.as_secs_f64() * 1000.0);
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    pub fn stop(self) -> (String, Duration) {
        (self.name, self.start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_steps_accumulate() {
        let mut timings = PipelineTimings::new();
        timings.add_step("ndvi", Duration::from_millis(3));
        timings.add_step("classify", Duration::from_millis(1));
        timings.add_step("ndvi", Duration::from_millis(2));

        assert_eq!(timings.steps().len(), 3);
        assert_eq!(timings.get_step("ndvi"), Some(Duration::from_millis(5)));
        assert_eq!(timings.total_duration(), Duration::from_millis(6));
        assert_eq!(timings.get_step("missing"), None);
    }

    #[test]
    fn test_measure_returns_value() {
        let mut timings = PipelineTimings::new();
        let value = timings.measure("sum", || (1..=4).sum::<u32>());
        assert_eq!(value, 10);
        assert!(timings.get_step("sum").is_some());
    }
}

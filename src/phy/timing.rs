use std::time::{Duration, Instant};

use tracing::debug;

use crate::utils::consts::{BLOCKING_SLEEP_THRESHOLD_NS, BUSY_WAIT_DIVISOR};

/// Blocks the caller for one configured half-period.
pub trait HalfPeriodWait {
    fn wait(&mut self);
}

impl<W: HalfPeriodWait + ?Sized> HalfPeriodWait for &mut W {
    fn wait(&mut self) {
        (**self).wait();
    }
}

impl<W: HalfPeriodWait + ?Sized> HalfPeriodWait for Box<W> {
    fn wait(&mut self) {
        (**self).wait();
    }
}

/// Wall-clock pacing, picked once from the half-period length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacer {
    /// `thread::sleep` for the whole half-period
    Sleep { half_period: Duration },
    /// Sleep in `step` slices and poll the elapsed time
    Spin { half_period: Duration, step: Duration },
}

impl Pacer {
    pub fn new(half_period: Duration) -> Self {
        let pacer = if half_period
            > Duration::from_nanos(BLOCKING_SLEEP_THRESHOLD_NS)
        {
            Pacer::Sleep { half_period }
        } else {
            Pacer::Spin {
                half_period,
                step: half_period / BUSY_WAIT_DIVISOR,
            }
        };
        debug!("Half-period pacer: {:?}", pacer);
        pacer
    }

    pub fn half_period(&self) -> Duration {
        match *self {
            Pacer::Sleep { half_period } | Pacer::Spin { half_period, .. } => {
                half_period
            }
        }
    }
}

impl HalfPeriodWait for Pacer {
    fn wait(&mut self) {
        match *self {
            Pacer::Sleep { half_period } => std::thread::sleep(half_period),
            Pacer::Spin { half_period, step } => {
                let start = Instant::now();
                while start.elapsed() < half_period {
                    if step.is_zero() {
                        std::hint::spin_loop();
                    } else {
                        std::thread::sleep(step);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_half_period_sleeps() {
        let pacer = Pacer::new(Duration::from_millis(1));
        assert!(matches!(pacer, Pacer::Sleep { .. }));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let pacer = Pacer::new(Duration::from_micros(500));
        assert_eq!(
            pacer,
            Pacer::Spin {
                half_period: Duration::from_micros(500),
                step: Duration::from_nanos(50),
            }
        );
    }

    #[test]
    fn test_spin_waits_at_least_half_period() {
        let mut pacer = Pacer::new(Duration::from_micros(200));
        let start = Instant::now();
        pacer.wait();
        assert!(start.elapsed() >= Duration::from_micros(200));
    }
}

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::astro_math::Vec3;
use crate::util::*;

const MIN_CAPACITY: usize = 2;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PositionSample {
    /// Canonical frame direction
    pub direction: Vec3,
    /// When the client ingested the sample
    pub client_time: DateTime<Utc>,
    /// When the position was valid at the driver
    pub server_time: DateTime<Utc>,
}

/// Recent positions, answering "where was the telescope pointing at time t"
/// by interpolating between samples or extrapolating past the newest one.
#[derive(Debug, Clone)]
pub struct InterpolatedPosition {
    samples: VecDeque<PositionSample>, // ordered by server_time
    capacity: usize,
    max_age: Option<Duration>,
}

impl InterpolatedPosition {
    pub fn new(capacity: usize, max_age: Option<Duration>) -> Self {
        let capacity = capacity.max(MIN_CAPACITY);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            max_age,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&PositionSample> {
        self.samples.back()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn add(&mut self, direction: Vec3, client_time: DateTime<Utc>, server_time: DateTime<Utc>) {
        let sample = PositionSample {
            direction,
            client_time,
            server_time,
        };

        // Equal server times go after the existing sample so the newer one wins
        let index = self
            .samples
            .partition_point(|s| s.server_time <= server_time);
        self.samples.insert(index, sample);

        self.evict();
    }

    fn evict(&mut self) {
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }

        if let (Some(max_age), Some(newest)) = (self.max_age, self.samples.back().copied()) {
            while self.samples.len() > MIN_CAPACITY {
                match self.samples.front() {
                    Some(oldest) if newest.server_time - oldest.server_time > max_age => {
                        self.samples.pop_front();
                    }
                    _ => break,
                }
            }
        }
    }

    /// Best estimate of the direction at `time`
    pub fn get(&self, time: DateTime<Utc>) -> ClientResult<Vec3> {
        if self.is_empty() {
            return Err(ClientError::NoDataAvailable);
        }
        let first = &self.samples[0];
        if self.samples.len() == 1 || time <= first.server_time {
            return Ok(first.direction.normalized());
        }

        // The segment containing `time`, or the newest one when `time` is past the end
        let index = self
            .samples
            .partition_point(|s| s.server_time < time)
            .min(self.samples.len() - 1);

        Ok(Self::blend(
            &self.samples[index - 1],
            &self.samples[index],
            time,
        ))
    }

    fn blend(a: &PositionSample, b: &PositionSample, time: DateTime<Utc>) -> Vec3 {
        let span = micros(b.server_time - a.server_time);
        if span <= 0 {
            return b.direction.normalized();
        }
        let t = micros(time - a.server_time) as f64 / span as f64;
        a.direction.lerp(b.direction, t).normalized()
    }
}

fn micros(d: Duration) -> i64 {
    d.num_microseconds().unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    const A: Vec3 = Vec3::new(1., 0., 0.);
    const B: Vec3 = Vec3::new(0., 1., 0.);

    fn two_samples() -> InterpolatedPosition {
        let mut buffer = InterpolatedPosition::new(8, None);
        buffer.add(A, at(0), at(0));
        buffer.add(B, at(10), at(10));
        buffer
    }

    #[test]
    fn test_empty() {
        let buffer = InterpolatedPosition::new(8, None);
        assert_eq!(buffer.get(at(0)), Err(ClientError::NoDataAvailable));
    }

    #[test]
    fn test_single_sample() {
        let mut buffer = InterpolatedPosition::new(8, None);
        buffer.add(A * 2., at(3), at(3));
        assert_eq!(buffer.get(at(100)).unwrap(), A);
        assert_eq!(buffer.get(at(-100)).unwrap(), A);
    }

    #[test]
    fn test_interpolates_midpoint() {
        let v = two_samples().get(at(5)).unwrap();
        let half = std::f64::consts::FRAC_1_SQRT_2;
        assert_float_absolute_eq!(v.x, half, 1E-12);
        assert_float_absolute_eq!(v.y, half, 1E-12);
        assert_float_absolute_eq!(v.z, 0., 1E-12);
    }

    #[test]
    fn test_extrapolates_trend() {
        // A + 1.5 (B - A) = (-0.5, 1.5, 0)
        let v = two_samples().get(at(15)).unwrap();
        let expected = Vec3::new(-0.5, 1.5, 0.).normalized();
        assert_float_absolute_eq!(v.x, expected.x, 1E-12);
        assert_float_absolute_eq!(v.y, expected.y, 1E-12);
    }

    #[test]
    fn test_before_first_sample_holds_oldest() {
        assert_eq!(two_samples().get(at(-5)).unwrap(), A);
    }

    #[test]
    fn test_exact_sample_times() {
        let buffer = two_samples();
        assert_eq!(buffer.get(at(0)).unwrap(), A);
        let v = buffer.get(at(10)).unwrap();
        assert_float_absolute_eq!(v.x, 0., 1E-12);
        assert_float_absolute_eq!(v.y, 1., 1E-12);
    }

    #[test]
    fn test_uses_bracketing_segment() {
        let c = Vec3::new(0., 0., 1.);
        let mut buffer = two_samples();
        buffer.add(c, at(20), at(20));

        let v = buffer.get(at(15)).unwrap();
        let half = std::f64::consts::FRAC_1_SQRT_2;
        assert_float_absolute_eq!(v.x, 0., 1E-12);
        assert_float_absolute_eq!(v.y, half, 1E-12);
        assert_float_absolute_eq!(v.z, half, 1E-12);
    }

    #[test]
    fn test_out_of_order_insert() {
        let mut buffer = InterpolatedPosition::new(8, None);
        buffer.add(B, at(10), at(10));
        buffer.add(A, at(11), at(0));
        assert_eq!(buffer.latest().unwrap().direction, B);
        let v = buffer.get(at(5)).unwrap();
        assert_float_absolute_eq!(v.x, v.y, 1E-12);
    }

    #[test]
    fn test_same_server_time_prefers_newer() {
        let mut buffer = InterpolatedPosition::new(8, None);
        buffer.add(A, at(0), at(0));
        buffer.add(B, at(1), at(0));
        assert_eq!(buffer.get(at(4)).unwrap(), B);
    }

    #[test]
    fn test_clear() {
        let mut buffer = two_samples();
        assert!(!buffer.is_empty());
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.get(at(5)), Err(ClientError::NoDataAvailable));
    }

    #[test]
    fn test_capacity_is_bounded() {
        let mut buffer = InterpolatedPosition::new(4, None);
        for i in 0..100 {
            buffer.add(A, at(i), at(i));
        }
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.samples.front().unwrap().server_time, at(96));

        // never fewer than two slots
        assert_eq!(InterpolatedPosition::new(0, None).capacity, 2);
    }

    #[test]
    fn test_max_age_keeps_two_samples() {
        let mut buffer = InterpolatedPosition::new(10, Some(Duration::seconds(5)));
        buffer.add(A, at(0), at(0));
        buffer.add(A, at(3), at(3));
        buffer.add(B, at(100), at(100));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.samples.front().unwrap().server_time, at(3));

        buffer.add(B, at(102), at(102));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.samples.front().unwrap().server_time, at(100));
    }
}

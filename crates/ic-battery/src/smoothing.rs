use std::collections::VecDeque;

/// Exponential moving average. The first sample seeds the average.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(alpha: f64) -> Self {
        Self { alpha: alpha.clamp(f64::MIN_POSITIVE, 1.0), value: None }
    }

    pub fn update(&mut self, x: f64) -> f64 {
        let next = match self.value {
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
            None => x,
        };
        self.value = Some(next);
        next
    }
}

/// Max over the last `capacity` samples. Holds the reading up while the
/// voltage sags under load.
#[derive(Debug, Clone)]
pub struct MaxWindow {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl MaxWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, samples: VecDeque::with_capacity(capacity) }
    }

    pub fn push(&mut self, x: f64) -> f64 {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(x);
        self.samples.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

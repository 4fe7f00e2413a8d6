//! Drain batch statistics for the streaming run.
//!
//! Tracks how many codes each bulk drain extracted, with min, max, average
//! and a small histogram, so a run report shows how the threshold trigger
//! behaved in practice.

/// Tracks drain batch sizes with minimal overhead.
pub struct BatchStats {
    pub min: u64,
    pub max: u64,
    pub sum: u64,
    pub count: u64,
    pub buckets: [u64; 16],
}

impl BatchStats {
    /// Creates an empty tracker; min starts at u64::MAX so the first
    /// batch becomes the minimum.
    pub fn new() -> Self {
        Self {
            min: u64::MAX,
            max: 0,
            sum: 0,
            count: 0,
            buckets: [0; 16],
        }
    }

    /// Records one drain of `codes` codes.
    pub fn update(&mut self, codes: u64) {
        if codes < self.min {
            self.min = codes;
        }
        if codes > self.max {
            self.max = codes;
        }
        self.sum += codes;
        self.count += 1;

        let idx = (codes as usize).min(15);
        self.buckets[idx] += 1;
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    /// Prints a formatted report of the drains observed during a run.
    pub fn print_report(&self) {
        println!("\nDrain Metrics");
        println!("Drains: {}", self.count);
        if self.count == 0 {
            return;
        }
        println!("Codes moved: {}", self.sum);
        println!("Min batch: {}", self.min);
        println!("Avg batch: {:.2}", self.avg());
        println!("Max batch: {}", self.max);

        println!("Distribution (codes per drain):");
        for (i, &count) in self.buckets.iter().enumerate() {
            if count > 0 {
                let label = if i == 15 { ">=15".to_string() } else { i.to_string() };
                println!("[{:>4}]: {}", label, count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_min_max_avg() {
        let mut stats = BatchStats::new();
        stats.update(3);
        stats.update(7);
        stats.update(5);
        assert_eq!(stats.min, 3);
        assert_eq!(stats.max, 7);
        assert_eq!(stats.count, 3);
        assert!((stats.avg() - 5.0).abs() < f64::EPSILON);
    }
}

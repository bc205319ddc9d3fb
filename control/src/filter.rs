use heapless::{HistoryBuffer, Vec};
use mppt::Sample;

/// Measurements each channel's median is taken over.
pub const WINDOW: usize = 10;

/// Running median over the last `N` values.
pub struct MedianFilter<const N: usize> {
    values: HistoryBuffer<f32, N>,
}

impl<const N: usize> Default for MedianFilter<N> {
    fn default() -> Self {
        MedianFilter {
            values: HistoryBuffer::new(),
        }
    }
}

impl<const N: usize> MedianFilter<N> {
    pub fn new() -> Self {
        MedianFilter::default()
    }

    pub fn push(&mut self, value: f32) {
        self.values.write(value);
    }

    /// Median of the held values, the mean of the middle two for an even
    /// count. NaN sorts above every number, so a lone NaN is outvoted.
    pub fn median(&self) -> Option<f32> {
        let mut sorted: Vec<f32, N> = self.values.oldest_ordered().copied().collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_unstable_by(f32::total_cmp);

        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some(0.5 * (sorted[mid - 1] + sorted[mid]))
        } else {
            Some(sorted[mid])
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// One median filter per sensor channel.
#[derive(Default)]
pub struct SampleFilter {
    array_voltage: MedianFilter<WINDOW>,
    array_current: MedianFilter<WINDOW>,
    battery_voltage: MedianFilter<WINDOW>,
    battery_current: MedianFilter<WINDOW>,
}

impl SampleFilter {
    pub fn new() -> Self {
        SampleFilter::default()
    }

    pub fn push(&mut self, sample: &Sample) {
        self.array_voltage.push(sample.array_voltage);
        self.array_current.push(sample.array_current);
        self.battery_voltage.push(sample.battery_voltage);
        self.battery_current.push(sample.battery_current);
    }

    /// Filtered sample, `None` until something was measured.
    pub fn sample(&self) -> Option<Sample> {
        Some(Sample::new(
            self.array_voltage.median()?,
            self.array_current.median()?,
            self.battery_voltage.median()?,
            self.battery_current.median()?,
        ))
    }

    pub fn clear(&mut self) {
        self.array_voltage.clear();
        self.array_current.clear();
        self.battery_voltage.clear();
        self.battery_current.clear();
    }
}

//! Windowed FFT over a sliding mono buffer

use crate::audio::lockfree_fifo::{Fifo, FifoConsumer, FifoProducer};
use contour_core::domain::audio::gain_to_db;
use contour_core::domain::config::FftOrder;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;
use tracing::debug;

/// Analysis-thread end of the magnitude FIFO
pub type MagnitudeConsumer = FifoConsumer<Vec<f32>>;

/// 4-term Blackman-Harris window, scaled so its coefficients sum to `size`
pub fn blackman_harris_window(size: usize) -> Vec<f32> {
    const A: [f64; 4] = [0.35875, 0.48829, 0.14128, 0.01168];

    if size < 2 {
        return vec![1.0; size];
    }

    let denominator = (size - 1) as f64;
    let raw: Vec<f64> = (0..size)
        .map(|n| {
            let phase = 2.0 * PI * n as f64 / denominator;
            A[0] - A[1] * phase.cos() + A[2] * (2.0 * phase).cos() - A[3] * (3.0 * phase).cos()
        })
        .collect();

    let scale = size as f64 / raw.iter().sum::<f64>();
    raw.into_iter().map(|w| (w * scale) as f32).collect()
}

/// Turns blocks of one channel into dB magnitude vectors
///
/// Owns the sliding window, the FFT plan and the producer side of the
/// magnitude FIFO. Runs on the analysis thread only.
pub struct FftDataGenerator {
    order: FftOrder,
    floor_db: f32,
    capacity: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    mono: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
    producer: FifoProducer<Vec<f32>>,
    produced: u64,
    dropped: u64,
}

impl FftDataGenerator {
    /// Plan the transform and allocate a magnitude FIFO of `capacity` vectors
    pub fn new(order: FftOrder, floor_db: f32, capacity: usize) -> (Self, MagnitudeConsumer) {
        let size = order.size();
        let fft = FftPlanner::new().plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let magnitudes = vec![floor_db; order.bins()];
        let (producer, consumer) = Fifo::new(capacity, magnitudes.clone()).split();

        debug!(fft_size = size, bins = order.bins(), "FFT data generator ready");

        (
            Self {
                order,
                floor_db,
                capacity,
                fft,
                window: blackman_harris_window(size),
                mono: vec![0.0; size],
                spectrum: vec![Complex::new(0.0, 0.0); size],
                scratch,
                magnitudes,
                producer,
                produced: 0,
                dropped: 0,
            },
            consumer,
        )
    }

    /// Rebuild window, plan and magnitude FIFO for a new order
    ///
    /// The previous consumer is orphaned; use the returned one.
    pub fn change_order(&mut self, order: FftOrder) -> MagnitudeConsumer {
        let (generator, consumer) = Self::new(order, self.floor_db, self.capacity);
        *self = generator;
        consumer
    }

    /// Shift `block` into the sliding window, then analyse it
    ///
    /// Returns whether the magnitude vector found room in the FIFO.
    pub fn push_block(&mut self, block: &[f32]) -> bool {
        self.shift_in(block);
        self.produce()
    }

    /// Zero the sliding window so later spectra start from silence
    pub fn reset(&mut self) {
        self.mono.fill(0.0);
    }

    /// Slide the window left by `block.len()` and append `block`
    pub fn shift_in(&mut self, block: &[f32]) {
        let size = self.mono.len();
        if block.len() >= size {
            self.mono.copy_from_slice(&block[block.len() - size..]);
        } else {
            self.mono.copy_within(block.len().., 0);
            self.mono[size - block.len()..].copy_from_slice(block);
        }
    }

    /// Window, transform and push one magnitude vector
    pub fn produce(&mut self) -> bool {
        for ((bin, &sample), &w) in self.spectrum.iter_mut().zip(&self.mono).zip(&self.window) {
            *bin = Complex::new(sample * w, 0.0);
        }

        self.fft.process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let normalisation = (self.mono.len() / 2) as f32;
        let floor = f64::from(self.floor_db);
        for (magnitude, bin) in self.magnitudes.iter_mut().zip(&self.spectrum) {
            let linear = bin.norm() / normalisation;
            *magnitude = gain_to_db(f64::from(linear), floor) as f32;
        }

        if self.producer.push(&self.magnitudes) {
            self.produced += 1;
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    pub fn order(&self) -> FftOrder {
        self.order
    }

    pub fn fft_size(&self) -> usize {
        self.mono.len()
    }

    pub fn bins(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn floor_db(&self) -> f32 {
        self.floor_db
    }

    pub fn produced_vectors(&self) -> u64 {
        self.produced
    }

    /// Vectors that found the magnitude FIFO full
    pub fn dropped_vectors(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin_centred_sine(order: FftOrder, bin: usize, frames: usize) -> Vec<f32> {
        let size = order.size() as f64;
        (0..frames)
            .map(|i| (2.0 * PI * bin as f64 * i as f64 / size).sin() as f32)
            .collect()
    }

    fn argmax(values: &[f32]) -> usize {
        values
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
            .0
    }

    #[test]
    fn test_window_sums_to_size() {
        for size in [2048, 4096, 8192] {
            let window = blackman_harris_window(size);
            let sum: f64 = window.iter().map(|&w| f64::from(w)).sum();
            assert!((sum - size as f64).abs() < 1e-2 * size as f64 / 1000.0);
            assert!(window[0] < 1e-3);
        }
    }

    #[test]
    fn test_vector_length_is_half_plus_one() {
        let (generator, _consumer) = FftDataGenerator::new(FftOrder::Order4096, -48.0, 4);
        assert_eq!(generator.fft_size(), 4096);
        assert_eq!(generator.bins(), 2049);
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let order = FftOrder::Order2048;
        let (mut generator, mut consumer) = FftDataGenerator::new(order, -48.0, 4);

        assert!(generator.push_block(&bin_centred_sine(order, 64, order.size())));

        let mut magnitudes = vec![0.0; order.bins()];
        assert!(consumer.pull(&mut magnitudes));

        assert_eq!(argmax(&magnitudes), 64);
        assert!(magnitudes[64].abs() < 0.5, "peak at {} dB", magnitudes[64]);
        assert_eq!(magnitudes[600], -48.0);
    }

    #[test]
    fn test_silence_sits_on_floor() {
        let (mut generator, mut consumer) = FftDataGenerator::new(FftOrder::Order2048, -60.0, 2);
        generator.push_block(&vec![0.0; 512]);

        let mut magnitudes = vec![0.0; 1025];
        assert!(consumer.pull(&mut magnitudes));
        assert!(magnitudes.iter().all(|&m| m == -60.0));
    }

    #[test]
    fn test_shift_in_slides_window() {
        let (mut generator, _consumer) = FftDataGenerator::new(FftOrder::Order2048, -48.0, 1);

        let first: Vec<f32> = (0..2048).map(|i| i as f32).collect();
        generator.shift_in(&first);
        generator.shift_in(&[-1.0, -2.0]);

        assert_eq!(generator.mono[0], 2.0);
        assert_eq!(generator.mono[2045], 2047.0);
        assert_eq!(&generator.mono[2046..], &[-1.0, -2.0]);

        let oversized: Vec<f32> = (0..3000).map(|i| i as f32).collect();
        generator.shift_in(&oversized);
        assert_eq!(generator.mono[0], 952.0);
    }

    #[test]
    fn test_reset_clears_window() {
        let order = FftOrder::Order2048;
        let (mut generator, mut consumer) = FftDataGenerator::new(order, -48.0, 2);

        generator.shift_in(&bin_centred_sine(order, 32, order.size()));
        generator.reset();
        assert!(generator.produce());

        let mut magnitudes = vec![0.0; order.bins()];
        assert!(consumer.pull(&mut magnitudes));
        assert!(magnitudes.iter().all(|&m| m == -48.0));
    }

    #[test]
    fn test_full_magnitude_fifo_drops() {
        let (mut generator, consumer) = FftDataGenerator::new(FftOrder::Order2048, -48.0, 2);

        for _ in 0..3 {
            generator.push_block(&[0.0; 256]);
        }

        assert_eq!(consumer.num_available(), 2);
        assert_eq!(generator.produced_vectors(), 2);
        assert_eq!(generator.dropped_vectors(), 1);
    }

    #[test]
    fn test_change_order_rebuilds() {
        let (mut generator, _old) = FftDataGenerator::new(FftOrder::Order2048, -48.0, 3);

        let consumer = generator.change_order(FftOrder::Order8192);

        assert_eq!(generator.order(), FftOrder::Order8192);
        assert_eq!(generator.fft_size(), 8192);
        assert_eq!(generator.bins(), 4097);
        assert_eq!(consumer.capacity(), 3);
    }
}

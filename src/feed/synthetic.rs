//! Test-signal source: a few tones plus noise analysed into dB magnitudes, and
//! a slowly breathing reference curve sent without frequencies.

use super::{FeedFrame, FeedSender};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use realfft::num_complex::Complex32;
use realfft::{RealFftPlanner, RealToComplex};
use std::f32::consts::TAU;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

pub const MAIN_LAYER: &str = "main";
pub const REFERENCE_LAYER: &str = "reference";

const SAMPLE_RATE: f32 = 48_000.0;
const FFT_SIZE: usize = 4_096;
const FRAME_INTERVAL: Duration = Duration::from_millis(20);
const REFERENCE_POINTS: usize = 512;
const NOISE_AMPLITUDE: f32 = 0.01;
const SWEEP_PERIOD: f32 = 12.0;

const DB_FLOOR: f32 = -140.0;
const POWER_EPSILON: f32 = 1.0e-20;
const LN_TO_DB: f32 = 4.342_944_8;

#[inline]
fn power_to_db(power: f32) -> f32 {
    if power > POWER_EPSILON {
        (power.ln() * LN_TO_DB).max(DB_FLOOR)
    } else {
        DB_FLOOR
    }
}

/// Periodic Hann window.
pub fn hann(len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| 0.5 - 0.5 * (TAU * n as f32 / len as f32).cos())
        .collect()
}

/// Windowed real FFT producing per-bin dB, DC excluded.
pub struct Analyzer {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    normalization: f32,
    input: Vec<f32>,
    output: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("fft_size", &self.window.len())
            .finish_non_exhaustive()
    }
}

impl Analyzer {
    pub fn new(fft_size: usize) -> Self {
        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(fft_size);
        let window = hann(fft_size);
        let window_sum: f32 = window.iter().sum();
        let amplitude = if window_sum > f32::EPSILON {
            2.0 / window_sum
        } else {
            2.0 / fft_size.max(1) as f32
        };

        Self {
            input: fft.make_input_vec(),
            output: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            normalization: amplitude * amplitude,
            window,
            fft,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.window.len()
    }

    /// Number of bins reported per frame.
    pub fn bins(&self) -> usize {
        self.fft_size() / 2
    }

    /// Center frequency of every reported bin.
    pub fn frequencies(&self, sample_rate: f32) -> Vec<f32> {
        let resolution = sample_rate / self.fft_size() as f32;
        (1..=self.bins()).map(|k| k as f32 * resolution).collect()
    }

    /// Analyses the first `fft_size` samples. `None` when too few samples are
    /// given or the transform fails.
    pub fn magnitudes_db(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        let size = self.fft_size();
        if samples.len() < size {
            return None;
        }

        for ((target, sample), coeff) in self.input.iter_mut().zip(samples).zip(&self.window) {
            *target = sample * coeff;
        }

        if let Err(err) =
            self.fft
                .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)
        {
            warn!("[feed] FFT failed: {err}");
            return None;
        }

        Some(
            self.output
                .iter()
                .skip(1)
                .take(self.bins())
                .map(|bin| power_to_db(bin.norm_sqr() * self.normalization))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Tone {
    frequency: f32,
    amplitude: f32,
    phase: f32,
}

/// Fixed tones plus one tone sweeping 200 Hz..5 kHz, with white noise.
#[derive(Debug)]
pub struct SignalGenerator {
    tones: Vec<Tone>,
    sweep: Tone,
    sample_rate: f32,
    elapsed: f32,
    rng: StdRng,
}

impl SignalGenerator {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        let tone = |frequency, amplitude| Tone {
            frequency,
            amplitude,
            phase: 0.0,
        };
        Self {
            tones: vec![tone(60.0, 0.5), tone(1_000.0, 0.25), tone(8_000.0, 0.05)],
            sweep: tone(200.0, 0.2),
            sample_rate,
            elapsed: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Appends `count` samples to `out`.
    pub fn fill(&mut self, out: &mut Vec<f32>, count: usize) {
        let dt = 1.0 / self.sample_rate;
        out.reserve(count);

        for _ in 0..count {
            let t = (self.elapsed % SWEEP_PERIOD) / SWEEP_PERIOD;
            let sweep_t = if t < 0.5 { t * 2.0 } else { 2.0 - t * 2.0 };
            self.sweep.frequency = 200.0 * 25.0_f32.powf(sweep_t);

            let mut sample = self.rng.random_range(-NOISE_AMPLITUDE..NOISE_AMPLITUDE);
            for tone in self.tones.iter_mut().chain(std::iter::once(&mut self.sweep)) {
                sample += tone.amplitude * tone.phase.sin();
                tone.phase = (tone.phase + TAU * tone.frequency * dt) % TAU;
            }
            out.push(sample);
            self.elapsed += dt;
        }
    }
}

/// Pink-sloped target curve (-3 dB/oct around 1 kHz) that drifts by a few dB.
/// Index `i` corresponds to the chart's log sweep position `i / (len - 1)`.
pub fn reference_curve(len: usize, time: f32) -> Vec<f32> {
    let last = len.saturating_sub(1).max(1) as f32;
    let wobble = 3.0 * (time * 0.5).sin();
    (0..len)
        .map(|i| {
            let fraction = i as f32 / last;
            let frequency = 20.0 * 1_000.0_f32.powf(fraction);
            -45.0 - 3.0 * (frequency / 1_000.0).log2() + wobble
        })
        .collect()
}

/// Drops the oldest `hop` samples and tops `samples` back up to `window_len`.
fn slide_window(
    samples: &mut Vec<f32>,
    generator: &mut SignalGenerator,
    hop: usize,
    window_len: usize,
) {
    samples.drain(..hop.min(samples.len()));
    let missing = window_len.saturating_sub(samples.len());
    generator.fill(samples, missing);
}

pub(super) fn run(mut sender: FeedSender) {
    let mut analyzer = Analyzer::new(FFT_SIZE);
    let mut generator = SignalGenerator::new(SAMPLE_RATE, 0x5eed);
    let frequencies = analyzer.frequencies(SAMPLE_RATE);
    let hop = (SAMPLE_RATE * FRAME_INTERVAL.as_secs_f32()) as usize;

    let mut samples = Vec::with_capacity(FFT_SIZE + hop);
    generator.fill(&mut samples, FFT_SIZE);
    let started = Instant::now();

    loop {
        let frame_start = Instant::now();

        if let Some(magnitudes) = analyzer.magnitudes_db(&samples) {
            let main = FeedFrame {
                layer: MAIN_LAYER.to_string(),
                magnitudes,
                frequencies: Some(frequencies.clone()),
            };
            if !sender.publish(main) {
                return;
            }
        }

        let reference = FeedFrame {
            layer: REFERENCE_LAYER.to_string(),
            magnitudes: reference_curve(REFERENCE_POINTS, started.elapsed().as_secs_f32()),
            frequencies: None,
        };
        if !sender.publish(reference) {
            return;
        }

        slide_window(&mut samples, &mut generator, hop, FFT_SIZE);

        if let Some(remaining) = FRAME_INTERVAL.checked_sub(frame_start.elapsed()) {
            thread::sleep(remaining);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_centered_tone_peaks_at_its_bin() {
        let mut analyzer = Analyzer::new(1_024);
        let frequency = 64.0 * SAMPLE_RATE / 1_024.0;
        let samples: Vec<f32> = (0..1_024)
            .map(|n| (TAU * frequency * n as f32 / SAMPLE_RATE).sin())
            .collect();

        let magnitudes = analyzer.magnitudes_db(&samples).expect("enough samples");
        assert_eq!(magnitudes.len(), 512);

        let (peak, value) = magnitudes
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .expect("non-empty");
        assert_eq!(peak, 63, "DC is skipped so bin 64 lands at index 63");
        assert!(value.abs() < 0.1, "unit sine reads about 0 dB, got {value}");

        let frequencies = analyzer.frequencies(SAMPLE_RATE);
        assert!((frequencies[peak] - frequency).abs() < 1.0e-3);
    }

    #[test]
    fn short_input_is_rejected() {
        let mut analyzer = Analyzer::new(256);
        assert!(analyzer.magnitudes_db(&[0.0; 100]).is_none());
    }

    #[test]
    fn silence_sits_at_the_floor() {
        let mut analyzer = Analyzer::new(256);
        let magnitudes = analyzer.magnitudes_db(&[0.0; 256]).expect("enough samples");
        assert!(magnitudes.iter().all(|&db| db == DB_FLOOR));
    }

    #[test]
    fn generator_stays_bounded() {
        let mut generator = SignalGenerator::new(SAMPLE_RATE, 7);
        let mut samples = Vec::new();
        generator.fill(&mut samples, 4_800);
        assert_eq!(samples.len(), 4_800);
        assert!(samples.iter().all(|s| s.is_finite() && s.abs() <= 1.02));
    }

    #[test]
    fn sliding_keeps_the_window_full_and_ordered() {
        let mut generator = SignalGenerator::new(SAMPLE_RATE, 3);
        let mut samples = Vec::new();
        generator.fill(&mut samples, 1_024);
        let tail = samples[256..].to_vec();

        slide_window(&mut samples, &mut generator, 256, 1_024);
        assert_eq!(samples.len(), 1_024);
        assert_eq!(&samples[..768], tail.as_slice());

        slide_window(&mut samples, &mut generator, 4_096, 1_024);
        assert_eq!(samples.len(), 1_024);
    }

    #[test]
    fn reference_curve_slopes_down() {
        let curve = reference_curve(REFERENCE_POINTS, 0.0);
        assert_eq!(curve.len(), REFERENCE_POINTS);
        assert!(curve.first() > curve.last());
        assert!(curve.windows(2).all(|w| w[0] >= w[1]));
    }
}

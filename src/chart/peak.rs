//! Running per-bin maxima, held until explicitly reset.

#[derive(Debug, Clone, PartialEq)]
pub struct PeakHold {
    values: Vec<f32>,
}

impl PeakHold {
    pub fn new(len: usize, floor: f32) -> Self {
        Self {
            values: vec![floor; len],
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Folds a new input frame into the held maxima. Extra input beyond the
    /// buffer length is ignored.
    pub fn accumulate(&mut self, input: &[f32]) {
        for (peak, &value) in self.values.iter_mut().zip(input) {
            if value > *peak {
                *peak = value;
            }
        }
    }

    pub fn reset(&mut self, floor: f32) {
        self.values.fill(floor);
    }

    /// Reallocates to `len` bins, all at `floor`.
    pub fn reallocate(&mut self, len: usize, floor: f32) {
        self.values.clear();
        self.values.resize(len, floor);
    }
}

/// Number of gain reduction values kept for display.
pub const HISTORY_LEN: usize = 256;

/// Ring of the most recent per-sample gain reduction values, in dB.
#[derive(Debug, Clone, PartialEq)]
pub struct GainHistory {
    values: [f32; HISTORY_LEN],
    write_index: usize,
}

impl Default for GainHistory {
    fn default() -> Self {
        Self {
            values: [0.0; HISTORY_LEN],
            write_index: 0,
        }
    }
}

impl GainHistory {
    pub fn push(&mut self, gain_reduction_db: f32) {
        self.values[self.write_index] = gain_reduction_db;
        self.write_index = (self.write_index + 1) % HISTORY_LEN;
    }

    /// Raw ring contents. The oldest value sits at [`write_index()`][Self::write_index].
    pub fn values(&self) -> &[f32; HISTORY_LEN] {
        &self.values
    }

    /// Slot the next value will be written to.
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn latest(&self) -> f32 {
        self.values[(self.write_index + HISTORY_LEN - 1) % HISTORY_LEN]
    }

    /// Values from oldest to newest.
    pub fn iter_chronological(&self) -> impl Iterator<Item = f32> + '_ {
        self.values[self.write_index..]
            .iter()
            .chain(self.values[..self.write_index].iter())
            .copied()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// One sample of per-channel intensities.
///
/// Values are stored densely with channel 1 at index 0. Callers address channels through
/// the 1-based helpers below and must not rely on the storage layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    values: Vec<u8>,
}

impl Frame {
    pub fn new(values: Vec<u8>) -> Self {
        Self { values }
    }

    /// A frame of `channels` zeroed channels, used for blackout.
    pub fn blank(channels: usize) -> Self {
        Self {
            values: vec![0; channels],
        }
    }

    /// Repeats `pattern` across `count` consecutive fixtures (e.g. one RGB triple per light).
    pub fn filled(pattern: &[u8], count: usize) -> Self {
        let mut values = Vec::with_capacity(pattern.len() * count);
        for _ in 0..count {
            values.extend_from_slice(pattern);
        }
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Intensity of a 1-based channel. Channel 0 and channels past the end are `None`.
    pub fn channel(&self, channel: usize) -> Option<u8> {
        channel
            .checked_sub(1)
            .and_then(|index| self.values.get(index))
            .copied()
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Multiplies every value by `factor`, clamped to `[0, 1]`.
    pub fn scaled(&self, factor: f32) -> Frame {
        let factor = if factor.is_nan() {
            0.0
        } else {
            factor.clamp(0.0, 1.0)
        };

        Frame {
            values: self
                .values
                .iter()
                .map(|&value| (value as f32 * factor).round() as u8)
                .collect(),
        }
    }

    /// `(channel, value)` pairs numbered from 1, as the output boundary expects.
    pub fn one_based(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(index, &value)| (index + 1, value))
    }

    /// Copies the 1-based channel window starting at `first_channel` into `buffer`.
    ///
    /// Channels outside the window are ignored and buffer slots the frame doesn't reach
    /// are left untouched. Returns the number of slots written.
    pub fn write_into(&self, buffer: &mut [u8], first_channel: usize) -> usize {
        let Some(offset) = first_channel.checked_sub(1) else {
            return 0;
        };
        if offset >= self.values.len() {
            return 0;
        }

        let source = &self.values[offset..];
        let count = source.len().min(buffer.len());
        buffer[..count].copy_from_slice(&source[..count]);
        count
    }
}

impl From<Vec<u8>> for Frame {
    fn from(values: Vec<u8>) -> Self {
        Frame::new(values)
    }
}

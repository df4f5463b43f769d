use crate::Frame;

/// A named, pre-rendered lighting animation.
#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
    name: String,
    frames: Vec<Frame>,
}

impl Clip {
    pub fn new(name: impl Into<String>, frames: Vec<Frame>) -> Self {
        Self {
            name: name.into(),
            frames,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Last valid 0-based frame index. Playback completes on the tick after this one.
    pub fn last_frame_index(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }
}

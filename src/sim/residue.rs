// residue.rs - Static trail marks
//
// Marks never move; they only shrink by a linear fade and are dropped once
// they are too small to see.

use super::TrailEvent;

/// Marks at or below this radius (px) are removed.
pub const RESIDUE_EPSILON: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidueMark {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Inherited heading of the droplet that left it
    pub angle: Option<f32>,
}

impl ResidueMark {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { x, y, radius, angle: None }
    }

    /// Linear fade. Returns whether the mark is still live.
    #[inline]
    pub fn update(&mut self, dt: f32, fade_rate: f32) -> bool {
        self.radius -= fade_rate * dt;
        self.is_alive()
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.radius > RESIDUE_EPSILON
    }
}

impl From<&TrailEvent> for ResidueMark {
    fn from(e: &TrailEvent) -> Self {
        Self { x: e.x, y: e.y, radius: e.radius, angle: Some(e.angle) }
    }
}

/// Live residue marks.
#[derive(Debug, Clone, Default)]
pub struct Residue {
    marks: Vec<ResidueMark>,
}

impl Residue {
    pub fn new() -> Self {
        Self { marks: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn as_slice(&self) -> &[ResidueMark] {
        &self.marks
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResidueMark> {
        self.marks.iter()
    }

    /// Turn trail events into marks. Marks beyond `limit`, and marks already
    /// too small to be live, are dropped. Returns how many were kept.
    pub fn deposit(&mut self, events: &[TrailEvent], limit: usize) -> usize {
        let mut kept = 0;
        for e in events {
            let mark = ResidueMark::from(e);
            if !mark.is_alive() { continue; }
            if self.marks.len() >= limit {
                log::debug!("residue full ({}), dropping {} marks", limit, events.len() - kept);
                break;
            }
            self.marks.push(mark);
            kept += 1;
        }
        kept
    }

    /// Drop the oldest marks until at most `limit` remain. Returns how many
    /// were removed.
    pub fn shrink_to(&mut self, limit: usize) -> usize {
        let excess = self.marks.len().saturating_sub(limit);
        self.marks.drain(..excess);
        excess
    }

    /// Fade every mark and remove the dead ones.
    pub fn update(&mut self, dt: f32, fade_rate: f32) {
        let mut write = 0;

        for read in 0..self.marks.len() {
            let mut mark = self.marks[read];
            if !mark.update(dt, fade_rate) { continue; }
            self.marks[write] = mark;
            write += 1;
        }

        self.marks.truncate(write);
    }
}

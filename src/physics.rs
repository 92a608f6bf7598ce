use crate::geometry::Rect;

/// The screaming hero. Only `y` and `vy` change during a round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entity {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub vy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    None,
    Ceiling,
    Floor,
}

impl Entity {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    /// Advance one frame: `vy += gravity`, `y += vy`, then clamp into
    /// `[0, floor_y - h]`. Both clamps zero the velocity.
    pub fn integrate(&mut self, gravity: f64, floor_y: f64) -> Contact {
        self.vy += gravity;
        self.y += self.vy;

        let lowest = floor_y - self.h;
        // Resting exactly on the ground counts as contact.
        if self.y >= lowest {
            self.y = lowest;
            self.vy = 0.0;
            return Contact::Floor;
        }
        if self.y < 0.0 {
            self.y = 0.0;
            self.vy = 0.0;
            return Contact::Ceiling;
        }
        Contact::None
    }
}

/// Axis-aligned bounding boxes in playfield pixel coordinates.
///
/// Overlap uses strict inequalities: rects that merely share an edge do
/// not collide. All collision queries in the simulation go through
/// `Rect::intersects`.

use glam::Vec2;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Rect {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Rect { pos: Vec2::new(x, y), size: Vec2::new(w, h) }
    }

    pub fn from_parts(pos: Vec2, size: Vec2) -> Self {
        Rect { pos, size }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.pos.x < other.pos.x + other.size.x
            && other.pos.x < self.pos.x + self.size.x
            && self.pos.y < other.pos.y + other.size.y
            && other.pos.y < self.pos.y + self.size.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_and_disjoint() {
        let a = Rect::new(0.0, 0.0, 32.0, 32.0);
        let b = Rect::new(16.0, 16.0, 32.0, 32.0);
        let c = Rect::new(100.0, 0.0, 32.0, 32.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn edge_contact_is_not_overlap() {
        let a = Rect::new(0.0, 0.0, 32.0, 32.0);
        let b = Rect::new(32.0, 0.0, 32.0, 32.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn containment_is_overlap() {
        let outer = Rect::new(0.0, 0.0, 64.0, 64.0);
        let inner = Rect::new(20.0, 20.0, 4.0, 12.0);
        assert!(outer.intersects(&inner));
    }
}

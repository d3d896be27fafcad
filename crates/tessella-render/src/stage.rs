//! Scene stage
//!
//! Composition over inheritance: anything that can paint itself onto a
//! target bitmap implements `Drawable` and reports a `ZOrder`. The stage
//! sorts by (z, y, id) each draw, matching painter's-order expectations
//! for a 2D scene (same-z sprites stack by vertical position, ties broken
//! by creation id for stability).

use std::cmp::Ordering;

use crate::Bitmap;

/// Paint-order key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZOrder {
    pub z: i32,
    pub y: f64,
    pub id: u64,
}

impl ZOrder {
    pub fn new(z: i32, y: f64, id: u64) -> Self {
        Self { z, y, id }
    }

    pub fn paint_order(&self, other: &ZOrder) -> Ordering {
        self.z
            .cmp(&other.z)
            .then(self.y.total_cmp(&other.y))
            .then(self.id.cmp(&other.id))
    }
}

/// A node the stage can update and composite
pub trait Drawable {
    fn z_order(&self) -> ZOrder;

    /// Paint onto the target surface
    fn draw(&mut self, target: &Bitmap);

    /// Per-frame state advance
    fn update(&mut self) {}
}

/// Flat scene container drawing children in paint order.
#[derive(Default)]
pub struct Stage {
    children: Vec<Box<dyn Drawable>>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_child(&mut self, child: Box<dyn Drawable>) {
        self.children.push(child);
    }

    pub fn update(&mut self) {
        for child in &mut self.children {
            child.update();
        }
    }

    /// Sort by paint order and composite every child
    pub fn draw(&mut self, target: &Bitmap) {
        self.children
            .sort_by(|a, b| a.z_order().paint_order(&b.z_order()));
        for child in &mut self.children {
            child.draw(target);
        }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Probe {
        order: ZOrder,
        log: Rc<RefCell<Vec<u64>>>,
    }

    impl Drawable for Probe {
        fn z_order(&self) -> ZOrder {
            self.order
        }

        fn draw(&mut self, _target: &Bitmap) {
            self.log.borrow_mut().push(self.order.id);
        }
    }

    #[test]
    fn test_paint_order_z_then_y_then_id() {
        let a = ZOrder::new(1, 0.0, 1);
        let b = ZOrder::new(0, 99.0, 2);
        let c = ZOrder::new(1, -5.0, 3);
        let d = ZOrder::new(1, 0.0, 0);

        assert_eq!(b.paint_order(&a), Ordering::Less);
        assert_eq!(c.paint_order(&a), Ordering::Less);
        assert_eq!(d.paint_order(&a), Ordering::Less);
    }

    #[test]
    fn test_stage_draws_sorted() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stage = Stage::new();
        for (z, y, id) in [(2, 0.0, 10), (0, 5.0, 11), (0, 1.0, 12)] {
            stage.add_child(Box::new(Probe {
                order: ZOrder::new(z, y, id),
                log: Rc::clone(&log),
            }));
        }

        let target = Bitmap::new(1, 1);
        stage.draw(&target);
        assert_eq!(*log.borrow(), vec![12, 11, 10]);
    }
}

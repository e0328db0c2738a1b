//! Graphics state tracking for content stream replay.

use crate::color::Color;
use crate::geometry::Point;

/// A 2D transformation matrix.
///
/// PDF matrices have the form:
/// ```text
/// [ a  b  0 ]
/// [ c  d  0 ]
/// [ e  f  1 ]
/// ```
/// where (a, b, c, d) define scaling/rotation/skewing and (e, f) define
/// translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    /// Horizontal scaling component
    pub a: f32,
    /// Rotation/skew component
    pub b: f32,
    /// Rotation/skew component
    pub c: f32,
    /// Vertical scaling component
    pub d: f32,
    /// Horizontal translation
    pub e: f32,
    /// Vertical translation
    pub f: f32,
}

impl Matrix {
    /// The identity matrix.
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// A pure translation.
    pub fn translation(tx: f32, ty: f32) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: tx,
            f: ty,
        }
    }

    /// Build a matrix from the six operands of a `cm`/`Tm` operator.
    pub fn from_operands(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Matrix concatenation. `a.multiply(&b)` represents applying `a`
    /// first, then `b` (row-vector convention).
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Transform a point with this matrix.
    pub fn transform_point(&self, x: f32, y: f32) -> Point {
        Point {
            x: self.a * x + self.c * y + self.e,
            y: self.b * x + self.d * y + self.f,
        }
    }

    /// The vertical scale factor this matrix applies, used to turn a raw
    /// `Tf` size into an effective on-page size.
    pub fn vertical_scale(&self) -> f32 {
        (self.b * self.b + self.d * self.d).sqrt()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

/// The subset of the PDF graphics state the walker needs: the CTM, the
/// fill color, and the text state parameters that survive q/Q.
#[derive(Debug, Clone)]
pub(crate) struct GraphicsState {
    /// Current transformation matrix (user space to page space)
    pub ctm: Matrix,
    /// Non-stroking fill color
    pub fill_color: Color,
    /// Current font: resource name and raw `Tf` size
    pub font: Option<(Vec<u8>, f32)>,
    /// Character spacing (`Tc`)
    pub char_space: f32,
    /// Word spacing (`Tw`)
    pub word_space: f32,
    /// Text leading (`TL`)
    pub leading: f32,
}

impl GraphicsState {
    /// Graphics state at the start of a content stream.
    pub fn new() -> Self {
        Self {
            ctm: Matrix::identity(),
            fill_color: Color::BLACK,
            font: None,
            char_space: 0.0,
            word_space: 0.0,
            leading: 0.0,
        }
    }

    /// Raw `Tf` size, defaulting to 12 for streams that show text without
    /// selecting a font first.
    pub fn tf_size(&self) -> f32 {
        self.font.as_ref().map(|(_, size)| *size).unwrap_or(12.0)
    }
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self::new()
    }
}

/// Stack of graphics states driven by the q/Q operators.
#[derive(Debug)]
pub(crate) struct GraphicsStateStack {
    stack: Vec<GraphicsState>,
}

impl GraphicsStateStack {
    /// A stack holding the initial state.
    pub fn new() -> Self {
        Self {
            stack: vec![GraphicsState::new()],
        }
    }

    /// The active graphics state.
    pub fn current(&self) -> &GraphicsState {
        self.stack.last().expect("stack is never empty")
    }

    /// Mutable access to the active graphics state.
    pub fn current_mut(&mut self) -> &mut GraphicsState {
        self.stack.last_mut().expect("stack is never empty")
    }

    /// Save the current state (q).
    pub fn save(&mut self) {
        let state = self.current().clone();
        self.stack.push(state);
    }

    /// Restore the previous state (Q). Restoring past the initial state
    /// has no effect.
    pub fn restore(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let m = Matrix::identity();
        let p = m.transform_point(3.0, 4.0);
        assert_eq!(p.x, 3.0);
        assert_eq!(p.y, 4.0);
    }

    #[test]
    fn test_translation() {
        let m = Matrix::translation(10.0, 20.0);
        let p = m.transform_point(5.0, 10.0);
        assert_eq!(p.x, 15.0);
        assert_eq!(p.y, 30.0);
    }

    #[test]
    fn test_multiply_order() {
        let translate = Matrix::translation(10.0, 20.0);
        let scale = Matrix::from_operands(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        // Translate first, then scale.
        let m = translate.multiply(&scale);
        let p = m.transform_point(5.0, 5.0);
        assert_eq!(p.x, 30.0);
        assert_eq!(p.y, 50.0);
    }

    #[test]
    fn test_vertical_scale() {
        let m = Matrix::from_operands(1.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        assert!((m.vertical_scale() - 2.0).abs() < 1e-6);
        assert!((Matrix::identity().vertical_scale() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_state_defaults() {
        let gs = GraphicsState::new();
        assert_eq!(gs.fill_color, Color::BLACK);
        assert_eq!(gs.tf_size(), 12.0);
        assert!(gs.font.is_none());
    }

    #[test]
    fn test_stack_save_restore() {
        let mut stack = GraphicsStateStack::new();
        stack.current_mut().char_space = 1.5;
        stack.save();
        stack.current_mut().char_space = 3.0;
        stack.restore();
        assert_eq!(stack.current().char_space, 1.5);
        // Restoring past the initial state is a no-op.
        stack.restore();
        assert_eq!(stack.current().char_space, 1.5);
    }
}

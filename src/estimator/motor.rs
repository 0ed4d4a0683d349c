//! Right/left wheel value pair.

/// A pair of values for the right and left drive wheels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorPair<T> {
    /// Right wheel
    pub right: T,
    /// Left wheel
    pub left: T,
}

impl<T> MotorPair<T> {
    /// Creates a pair from right and left values.
    pub fn new(right: T, left: T) -> Self {
        Self { right, left }
    }

    /// Applies `f` to both wheels.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> MotorPair<U> {
        MotorPair {
            right: f(self.right),
            left: f(self.left),
        }
    }

    /// Combines two pairs wheel by wheel.
    pub fn zip_with<U, V>(self, other: MotorPair<U>, mut f: impl FnMut(T, U) -> V) -> MotorPair<V> {
        MotorPair {
            right: f(self.right, other.right),
            left: f(self.left, other.left),
        }
    }
}

//! Operator-forwarding macros for transparent newtypes.

/// Forwards the std operator traits to the inner value of a single-field tuple struct.
///
/// `op!(binary Credits, Add, add)` expands to `impl Add for Credits` that adds the inner values,
/// and similarly for `inplace` (e.g. `SubAssign`) and `unary` (e.g. `Neg`) forms.
#[macro_export]
macro_rules! op {
    (binary $t:ident, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $t {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(std::ops::$trait::$method(self.0, rhs.0))
            }
        }
    };
    (inplace $t:ident, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $t {
            fn $method(&mut self, rhs: Self) {
                std::ops::$trait::$method(&mut self.0, rhs.0);
            }
        }
    };
    (unary $t:ident, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $t {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self(std::ops::$trait::$method(self.0))
            }
        }
    };
}

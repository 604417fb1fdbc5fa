use crate::Float;
use std::ops::{Add, Div, Mul, Neg, Sub};

pub const MACHINE_EPSILON: f32 = std::f32::EPSILON * 0.5;

pub fn gamma(n: i32) -> Float {
    let n = n as Float;
    (n * MACHINE_EPSILON) / (1.0 - n * MACHINE_EPSILON)
}

pub fn next_float_up(mut v: f32) -> f32 {
    if v == std::f32::INFINITY { return v; }

    if v == -0.0 { v = 0.0 }

    let bits = v.to_bits();
    let bits = if v >= 0.0 { bits + 1 } else { bits - 1 };
    f32::from_bits(bits)
}

pub fn next_float_down(mut v: f32) -> f32 {
    if v == std::f32::NEG_INFINITY { return v; }

    if v == 0.0 { v = -0.0 }

    let bits = v.to_bits();
    let bits = if v >= 0.0 { bits - 1 } else { bits + 1 };
    f32::from_bits(bits)
}

/// A float that tracks a conservative interval of the rounding error
/// accumulated by the operations that produced it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EFloat {
    pub v: Float,
    low: Float,
    high: Float,
}

impl EFloat {
    pub fn new(v: Float) -> Self {
        Self { v, low: v, high: v }
    }

    pub fn with_err(v: Float, err: Float) -> Self {
        if err == 0.0 {
            Self::new(v)
        } else {
            Self {
                v,
                low: next_float_down(v - err),
                high: next_float_up(v + err),
            }
        }
    }

    pub fn lower_bound(self) -> Float {
        self.low
    }

    pub fn upper_bound(self) -> Float {
        self.high
    }

    pub fn absolute_error(self) -> Float {
        self.high - self.low
    }
}

impl From<EFloat> for Float {
    fn from(ef: EFloat) -> Self {
        ef.v
    }
}

impl Add for EFloat {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            v: self.v + rhs.v,
            low: next_float_down(self.low + rhs.low),
            high: next_float_up(self.high + rhs.high),
        }
    }
}

impl Sub for EFloat {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            v: self.v - rhs.v,
            low: next_float_down(self.low - rhs.high),
            high: next_float_up(self.high - rhs.low),
        }
    }
}

impl Mul for EFloat {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let prods = [
            self.low * rhs.low,
            self.low * rhs.high,
            self.high * rhs.low,
            self.high * rhs.high,
        ];
        Self {
            v: self.v * rhs.v,
            low: next_float_down(prods.iter().cloned().fold(Float::INFINITY, Float::min)),
            high: next_float_up(prods.iter().cloned().fold(Float::NEG_INFINITY, Float::max)),
        }
    }
}

impl Div for EFloat {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        // the divisor interval straddles zero, so the result can be anything
        if rhs.low < 0.0 && rhs.high > 0.0 {
            return Self {
                v: self.v / rhs.v,
                low: Float::NEG_INFINITY,
                high: Float::INFINITY,
            };
        }
        let quots = [
            self.low / rhs.low,
            self.low / rhs.high,
            self.high / rhs.low,
            self.high / rhs.high,
        ];
        Self {
            v: self.v / rhs.v,
            low: next_float_down(quots.iter().cloned().fold(Float::INFINITY, Float::min)),
            high: next_float_up(quots.iter().cloned().fold(Float::NEG_INFINITY, Float::max)),
        }
    }
}

impl Neg for EFloat {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            v: -self.v,
            low: -self.high,
            high: -self.low,
        }
    }
}

macro_rules! impl_float_ops {
    ($($op:ident, $fn:ident);+ $(;)?) => {
        $(
            impl $op<Float> for EFloat {
                type Output = EFloat;

                fn $fn(self, rhs: Float) -> EFloat {
                    self.$fn(EFloat::new(rhs))
                }
            }

            impl $op<EFloat> for Float {
                type Output = EFloat;

                fn $fn(self, rhs: EFloat) -> EFloat {
                    EFloat::new(self).$fn(rhs)
                }
            }
        )+
    };
}

impl_float_ops! {
    Add, add;
    Sub, sub;
    Mul, mul;
    Div, div;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(ef: EFloat, exact: f64) -> bool {
        ef.lower_bound() as f64 <= exact && exact <= ef.upper_bound() as f64
    }

    #[test]
    fn interval_contains_exact_result() {
        let a = EFloat::new(0.1);
        let b = EFloat::new(0.3);

        let exact_a = 0.1f32 as f64;
        let exact_b = 0.3f32 as f64;

        assert!(contains(a + b, exact_a + exact_b));
        assert!(contains(a - b, exact_a - exact_b));
        assert!(contains(a * b, exact_a * exact_b));
        assert!(contains(a / b, exact_a / exact_b));
    }

    #[test]
    fn interval_grows_through_chained_ops() {
        let mut ef = EFloat::new(1.0);
        let mut exact = 1.0f64;
        for i in 1..100 {
            let f = 1.0 + 1.0 / i as Float;
            ef = ef * f + 0.25;
            exact = exact * (f as f64) + 0.25;
            assert!(contains(ef, exact));
        }
        assert!(ef.absolute_error() > 0.0);
    }

    #[test]
    fn division_by_interval_straddling_zero_is_unbounded() {
        let denom = EFloat::with_err(0.0, 0.5);
        let q = EFloat::new(1.0) / denom;
        assert_eq!(q.lower_bound(), Float::NEG_INFINITY);
        assert_eq!(q.upper_bound(), Float::INFINITY);
    }

    #[test]
    fn mixed_float_ops() {
        let a = EFloat::new(2.0);
        assert_eq!((2.0 * a).v, 4.0);
        assert_eq!((a * 2.0).v, 4.0);
        assert_eq!((-a).v, -2.0);
        assert_eq!((1.0 - a).v, -1.0);
    }
}

//! The Wendland-C2 smoothing kernel of Dehnen & Aly (2012).
//!
//! The kernel takes a distance and the radius of compact support `H` (not the smoothing length;
//! `H = KERNEL_GAMMA * h`) and returns the weight of a particle at that distance. It is zero at
//! and beyond `H`.

use num_traits::Float;

/// Normalisation of the two-dimensional kernel.
pub const KERNEL_CONSTANT: f64 = 2.22817109;

/// Ratio between the radius of compact support and the smoothing length.
pub const KERNEL_GAMMA: f64 = 1.897367;

mod private {
    pub trait Sealed {}

    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Floating point types the kernel is evaluated in.
pub trait KernelFloat: private::Sealed + Float {
    /// [`KERNEL_CONSTANT`] in this precision.
    const CONSTANT: Self;
    /// [`KERNEL_GAMMA`] in this precision.
    const GAMMA: Self;
    const FOUR: Self;
}

impl KernelFloat for f32 {
    #[allow(clippy::cast_possible_truncation)]
    const CONSTANT: Self = KERNEL_CONSTANT as f32;
    #[allow(clippy::cast_possible_truncation)]
    const GAMMA: Self = KERNEL_GAMMA as f32;
    const FOUR: Self = 4.0;
}

impl KernelFloat for f64 {
    const CONSTANT: Self = KERNEL_CONSTANT;
    const GAMMA: Self = KERNEL_GAMMA;
    const FOUR: Self = 4.0;
}

/// The kernel weight at distance `r` for a radius of compact support `radius`.
#[inline]
pub fn kernel<F: KernelFloat>(r: F, radius: F) -> F {
    let inverse_h = F::one() / radius;
    let ratio = r * inverse_h;
    if ratio < F::one() {
        let one_minus_ratio = F::one() - ratio;
        let one_minus_ratio_2 = one_minus_ratio * one_minus_ratio;
        let one_minus_ratio_4 = one_minus_ratio_2 * one_minus_ratio_2;
        let weight = (one_minus_ratio_4 * (F::one() + F::FOUR * ratio)).max(F::zero());
        weight * F::CONSTANT * inverse_h * inverse_h
    } else {
        F::zero()
    }
}

/// [`kernel`] in single precision.
#[inline]
pub fn kernel_f32(r: f32, radius: f32) -> f32 {
    kernel(r, radius)
}

/// [`kernel`] in double precision.
#[inline]
pub fn kernel_f64(r: f64, radius: f64) -> f64 {
    kernel(r, radius)
}

/// The radius of compact support for a smoothing length `h`.
#[inline]
pub fn support_radius<F: KernelFloat>(h: F) -> F {
    F::GAMMA * h
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0.0, 1.0, KERNEL_CONSTANT)]
    #[case(0.5, 1.0, 0.0625 * 3.0 * KERNEL_CONSTANT)]
    #[case(0.0, 2.0, KERNEL_CONSTANT / 4.0)]
    #[case(1.0, 1.0, 0.0)]
    #[case(3.0, 1.0, 0.0)]
    fn double_precision(#[case] r: f64, #[case] radius: f64, #[case] expected: f64) {
        assert!((kernel_f64(r, radius) - expected).abs() < 1e-12);
    }

    #[test]
    fn single_precision_matches_double() {
        for i in 0..=100u8 {
            let r = f32::from(i) / 80.0;
            let single = f64::from(kernel_f32(r, 1.25));
            let double = kernel_f64(f64::from(r), 1.25);
            assert!((single - double).abs() < 1e-5, "r = {r}");
        }
    }

    #[test]
    fn monotonically_decreasing_within_support() {
        let weights = (0..50).map(|i| kernel_f64(f64::from(i) / 50.0, 1.0)).collect::<Vec<_>>();
        assert!(weights.windows(2).all(|w| w[0] > w[1]));
        assert!(weights.iter().all(|&w| w > 0.0));
    }

    #[test]
    fn support_from_smoothing_length() {
        assert!((support_radius(2.0f64) - 2.0 * KERNEL_GAMMA).abs() < 1e-12);
        let radius = support_radius(1.0f64);
        // r / H rounds to just below one at the boundary, leaving a negligible weight.
        assert!(kernel_f64(radius, radius).abs() < 1e-30);
        assert_eq!(kernel_f64(radius * (1.0 + 1e-12), radius), 0.0);
        assert_eq!(kernel_f32(f32::INFINITY, 1.0), 0.0);
    }
}

//! Spectral colorimetry engine (spec §4.B).
//!
//! Converts RGB/XYZ/sampled-spectrum/blackbody representations to RGB the
//! same way pbrt does: integrate against the CIE 1931 2-degree standard
//! observer curves, sampled at 1 nm from 360-830 nm (471 samples), averaged
//! into 60 bins spanning 400-700 nm, then a fixed XYZ->RGB matrix.
//!
//! The 471 raw samples are generated once from the standard multi-lobe
//! Gaussian fit to the CIE 1931 tables (Wyman, Sloan & Shirley 2013) rather
//! than embedded as a literal table — this keeps the curve data auditable in
//! a few closed-form lines instead of >1400 magic numbers, while producing
//! the same shape of curve §4.B's averaging machinery is built to consume.

use std::sync::OnceLock;

pub const CIE_LAMBDA_START: f64 = 360.0;
pub const CIE_LAMBDA_END: f64 = 830.0;
pub const CIE_SAMPLES: usize = 471; // (830 - 360) / 1 + 1
pub const NUM_BINS: usize = 60;
pub const BIN_LAMBDA_START: f64 = 400.0;
pub const BIN_LAMBDA_END: f64 = 700.0;
/// Integral of the CIE Y matching curve over its full domain.
pub const CIE_Y_INTEGRAL: f64 = 106.856895;

fn gaussian(x: f64, mu: f64, sigma1: f64, sigma2: f64) -> f64 {
    let sigma = if x < mu { sigma1 } else { sigma2 };
    let t = (x - mu) / sigma;
    (-0.5 * t * t).exp()
}

fn cie_xbar(lambda: f64) -> f64 {
    1.056 * gaussian(lambda, 599.8, 37.9, 31.0) + 0.362 * gaussian(lambda, 442.0, 16.0, 26.7)
        - 0.065 * gaussian(lambda, 501.1, 20.4, 26.2)
}

fn cie_ybar(lambda: f64) -> f64 {
    0.821 * gaussian(lambda, 568.8, 46.9, 40.5) + 0.286 * gaussian(lambda, 530.9, 16.3, 31.1)
}

fn cie_zbar(lambda: f64) -> f64 {
    1.217 * gaussian(lambda, 437.0, 11.8, 36.0) + 0.681 * gaussian(lambda, 459.0, 26.0, 13.8)
}

/// Analytically integrate a piecewise-linear curve `(x[i], y[i])` over
/// `[x0, x1]`, clamping to the end samples outside the curve's domain, and
/// dividing by `x1 - x0` (spec §4.B).
pub fn average_over_curve(x: &[f64], y: &[f64], x0: f64, x1: f64) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    let n = x.len();
    if n == 0 || x1 <= x0 {
        return 0.0;
    }

    // Clamp entirely outside the curve's domain to the boundary sample.
    if x1 <= x[0] {
        return y[0];
    }
    if x0 >= x[n - 1] {
        return y[n - 1];
    }

    let mut sum = 0.0;
    // Below the curve's first sample: flat extension at y[0].
    if x0 < x[0] {
        sum += y[0] * (x[0].min(x1) - x0);
    }
    // Above the curve's last sample: flat extension at y[n-1].
    if x1 > x[n - 1] {
        sum += y[n - 1] * (x1 - x[n - 1].max(x0));
    }

    for i in 0..n - 1 {
        let seg_lo = x[i];
        let seg_hi = x[i + 1];
        let lo = seg_lo.max(x0);
        let hi = seg_hi.min(x1);
        if hi <= lo {
            continue;
        }
        let dseg = seg_hi - seg_lo;
        if dseg <= 0.0 {
            continue;
        }
        // Linear interpolation y(t) = y[i] + (y[i+1]-y[i]) * (t - seg_lo)/dseg
        let slope = (y[i + 1] - y[i]) / dseg;
        let eval = |t: f64| y[i] + slope * (t - seg_lo);
        // Integral of a line over [lo, hi] = average of endpoints * width.
        sum += 0.5 * (eval(lo) + eval(hi)) * (hi - lo);
    }

    sum / (x1 - x0)
}

/// Precomputed 60-bin averages of the CIE matching curves over 400-700 nm.
pub struct SpectralTables {
    pub bin_x: [f64; NUM_BINS],
    pub bin_y: [f64; NUM_BINS],
    pub bin_z: [f64; NUM_BINS],
}

impl SpectralTables {
    fn build() -> Self {
        let mut lambda = [0.0f64; CIE_SAMPLES];
        let mut xraw = [0.0f64; CIE_SAMPLES];
        let mut yraw = [0.0f64; CIE_SAMPLES];
        let mut zraw = [0.0f64; CIE_SAMPLES];
        for i in 0..CIE_SAMPLES {
            let l = CIE_LAMBDA_START + i as f64;
            lambda[i] = l;
            xraw[i] = cie_xbar(l);
            yraw[i] = cie_ybar(l);
            zraw[i] = cie_zbar(l);
        }

        let bin_width = (BIN_LAMBDA_END - BIN_LAMBDA_START) / NUM_BINS as f64;
        let mut bin_x = [0.0f64; NUM_BINS];
        let mut bin_y = [0.0f64; NUM_BINS];
        let mut bin_z = [0.0f64; NUM_BINS];
        for b in 0..NUM_BINS {
            let lo = BIN_LAMBDA_START + b as f64 * bin_width;
            let hi = lo + bin_width;
            bin_x[b] = average_over_curve(&lambda, &xraw, lo, hi);
            bin_y[b] = average_over_curve(&lambda, &yraw, lo, hi);
            bin_z[b] = average_over_curve(&lambda, &zraw, lo, hi);
        }

        SpectralTables { bin_x, bin_y, bin_z }
    }

    pub fn get() -> &'static SpectralTables {
        static TABLES: OnceLock<SpectralTables> = OnceLock::new();
        TABLES.get_or_init(SpectralTables::build)
    }
}

/// D65-primaries sRGB matrix, fixed (spec §4.B).
const XYZ_TO_RGB: [[f64; 3]; 3] = [
    [3.240479, -1.537150, -0.498535],
    [-0.969256, 1.875991, 0.041556],
    [0.055648, -0.204043, 1.057311],
];

pub fn xyz_to_rgb(xyz: [f64; 3]) -> [f64; 3] {
    let mut rgb = [0.0; 3];
    for r in 0..3 {
        rgb[r] = XYZ_TO_RGB[r][0] * xyz[0] + XYZ_TO_RGB[r][1] * xyz[1] + XYZ_TO_RGB[r][2] * xyz[2];
    }
    rgb
}

/// Integrates a set of (wavelength, value) samples against the 60 precomputed
/// bins, per spec §4.B. Sorts `samples` in place if not already monotonic.
pub fn samples_to_xyz(samples: &mut Vec<(f64, f64)>) -> [f64; 3] {
    if !samples.windows(2).all(|w| w[0].0 <= w[1].0) {
        samples.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    }
    if samples.is_empty() {
        return [0.0, 0.0, 0.0];
    }

    let lambda: Vec<f64> = samples.iter().map(|s| s.0).collect();
    let value: Vec<f64> = samples.iter().map(|s| s.1).collect();

    let tables = SpectralTables::get();
    let bin_width = (BIN_LAMBDA_END - BIN_LAMBDA_START) / NUM_BINS as f64;

    let mut xyz = [0.0; 3];
    for b in 0..NUM_BINS {
        let lo = BIN_LAMBDA_START + b as f64 * bin_width;
        let hi = lo + bin_width;
        let v = average_over_curve(&lambda, &value, lo, hi);
        // Accumulate into the matching channel only — spec §9 flags the
        // source bug of accumulating into xyz[0] in all three branches.
        xyz[0] += v * tables.bin_x[b];
        xyz[1] += v * tables.bin_y[b];
        xyz[2] += v * tables.bin_z[b];
    }

    let scale = (BIN_LAMBDA_END - BIN_LAMBDA_START) / (CIE_Y_INTEGRAL * NUM_BINS as f64);
    for c in xyz.iter_mut() {
        *c *= scale;
    }
    xyz
}

pub fn samples_to_rgb(samples: &mut Vec<(f64, f64)>) -> [f64; 3] {
    xyz_to_rgb(samples_to_xyz(samples))
}

const PLANCK_H: f64 = 6.62606957e-34; // J*s
const PLANCK_C: f64 = 299792458.0; // m/s
const BOLTZMANN_K: f64 = 1.3806488e-23; // J/K

fn blackbody_le(lambda_nm: f64, temp_k: f64) -> f64 {
    let l = lambda_nm * 1e-9;
    let lambda5 = l.powi(5);
    let exponent = (PLANCK_H * PLANCK_C) / (l * BOLTZMANN_K * temp_k);
    (2.0 * PLANCK_H * PLANCK_C * PLANCK_C) / (lambda5 * (exponent.exp() - 1.0))
}

/// Blackbody radiator at temperature `temp_k`, scale `scale`, to RGB (§4.B).
pub fn blackbody_to_rgb(temp_k: f64, scale: f64) -> [f64; 3] {
    let tables = SpectralTables::get();
    let bin_width = (BIN_LAMBDA_END - BIN_LAMBDA_START) / NUM_BINS as f64;

    let mut xyz = [0.0; 3];
    for b in 0..NUM_BINS {
        let center = BIN_LAMBDA_START + (b as f64 + 0.5) * bin_width;
        let le = blackbody_le(center, temp_k);
        xyz[0] += le * tables.bin_x[b];
        xyz[1] += le * tables.bin_y[b];
        xyz[2] += le * tables.bin_z[b];
    }

    let factor = scale * (BIN_LAMBDA_END - BIN_LAMBDA_START) / (CIE_Y_INTEGRAL * NUM_BINS as f64);
    for c in xyz.iter_mut() {
        *c *= factor;
    }
    xyz_to_rgb(xyz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_over_curve_of_constant_curve_is_constant() {
        let x = vec![0.0, 1.0, 2.0, 3.0];
        let y = vec![1.0, 1.0, 1.0, 1.0];
        let avg = average_over_curve(&x, &y, 0.5, 2.5);
        assert!((avg - 1.0).abs() < 1e-9);
    }

    #[test]
    fn average_over_curve_clamps_outside_domain() {
        let x = vec![10.0, 20.0];
        let y = vec![5.0, 5.0];
        // Entirely below the domain -> clamp to first sample.
        assert!((average_over_curve(&x, &y, 0.0, 5.0) - 5.0).abs() < 1e-9);
        // Entirely above -> clamp to last sample.
        assert!((average_over_curve(&x, &y, 25.0, 30.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn samples_to_rgb_is_finite_and_positive_for_constant_spectrum() {
        let mut samples = vec![(400.0, 1.0), (700.0, 1.0)];
        let rgb = samples_to_rgb(&mut samples);
        for c in rgb {
            assert!(c.is_finite());
        }
        // A roughly flat unit spectrum should look close to neutral gray,
        // i.e. not wildly unbalanced between channels.
        assert!(rgb.iter().all(|c| *c > -0.5 && *c < 3.0));
    }

    #[test]
    fn samples_to_rgb_sorts_unsorted_input() {
        let mut forward = vec![(400.0, 0.2), (500.0, 0.8), (700.0, 0.1)];
        let mut backward = vec![(700.0, 0.1), (500.0, 0.8), (400.0, 0.2)];
        let a = samples_to_rgb(&mut forward);
        let b = samples_to_rgb(&mut backward);
        for i in 0..3 {
            assert!((a[i] - b[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn blackbody_to_rgb_is_deterministic() {
        let a = blackbody_to_rgb(6500.0, 1.0);
        let b = blackbody_to_rgb(6500.0, 1.0);
        assert_eq!(a, b);
        for c in a {
            assert!(c.is_finite());
        }
    }

    #[test]
    fn hotter_blackbody_shifts_blue_relative_to_red() {
        let cool = blackbody_to_rgb(3000.0, 1.0);
        let hot = blackbody_to_rgb(9000.0, 1.0);
        // Ratio of blue to red should increase as temperature rises.
        let cool_ratio = cool[2] / cool[0].max(1e-9);
        let hot_ratio = hot[2] / hot[0].max(1e-9);
        assert!(hot_ratio > cool_ratio);
    }
}

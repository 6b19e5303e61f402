use crate::Pixel;

/// CIE L*a*b* color, D65 reference white.
///
/// L: lightness [0, 100], a: green-red, b: blue-yellow.
/// Only used for distance computation, never displayed directly.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lab {
    pub l: f32,
    pub a: f32,
    pub b: f32,
}

impl Lab {
    pub const fn new(l: f32, a: f32, b: f32) -> Self {
        Self { l, a, b }
    }

    /// Squared Euclidean distance in Lab space.
    pub fn distance_sq(self, other: Self) -> f32 {
        let dl = self.l - other.l;
        let da = self.a - other.a;
        let db = self.b - other.b;
        dl * dl + da * da + db * db
    }

    /// CIE76 color difference (ΔE*ab).
    pub fn delta_e(self, other: Self) -> f32 {
        self.distance_sq(other).sqrt()
    }
}

// D65 reference white, Y normalized to 1.
const WHITE_X: f32 = 0.95047;
const WHITE_Y: f32 = 1.0;
const WHITE_Z: f32 = 1.08883;

const LAB_EPSILON: f32 = 0.008856;
const LAB_KAPPA: f32 = 7.787;
const LAB_OFFSET: f32 = 16.0 / 116.0;

/// sRGB gamma → linear (single channel, 0..255 → 0.0..1.0)
#[inline(always)]
fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

/// Linear → sRGB gamma (single channel, 0.0..1.0 → 0..255), clamped.
#[inline(always)]
fn linear_to_srgb(c: f32) -> u8 {
    let c = if c > 0.0031308 {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    } else {
        12.92 * c
    };
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

#[inline(always)]
fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        LAB_KAPPA * t + LAB_OFFSET
    }
}

#[inline(always)]
fn lab_f_inv(t: f32) -> f32 {
    let cubed = t * t * t;
    if cubed > LAB_EPSILON {
        cubed
    } else {
        (t - LAB_OFFSET) / LAB_KAPPA
    }
}

/// Convert an sRGB pixel to CIE Lab.
pub fn rgb_to_lab(pixel: Pixel) -> Lab {
    let r = srgb_to_linear(pixel.r);
    let g = srgb_to_linear(pixel.g);
    let b = srgb_to_linear(pixel.b);

    // Linear sRGB → XYZ, normalized by the reference white
    let x = (r * 0.4124 + g * 0.3576 + b * 0.1805) / WHITE_X;
    let y = (r * 0.2126 + g * 0.7152 + b * 0.0722) / WHITE_Y;
    let z = (r * 0.0193 + g * 0.1192 + b * 0.9505) / WHITE_Z;

    let fx = lab_f(x);
    let fy = lab_f(y);
    let fz = lab_f(z);

    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// Convert CIE Lab back to an sRGB pixel, clamping each channel to [0, 255].
pub fn lab_to_rgb(lab: Lab) -> Pixel {
    let fy = (lab.l + 16.0) / 116.0;
    let fx = lab.a / 500.0 + fy;
    let fz = fy - lab.b / 200.0;

    let x = WHITE_X * lab_f_inv(fx);
    let y = WHITE_Y * lab_f_inv(fy);
    let z = WHITE_Z * lab_f_inv(fz);

    // XYZ → linear sRGB
    let r = x * 3.2406 + y * -1.5372 + z * -0.4986;
    let g = x * -0.9689 + y * 1.8758 + z * 0.0415;
    let b = x * 0.0557 + y * -0.2040 + z * 1.0570;

    Pixel {
        r: linear_to_srgb(r),
        g: linear_to_srgb(g),
        b: linear_to_srgb(b),
    }
}

/// Euclidean distance between two Lab colors (ΔE76).
pub fn delta_e(lab0: Lab, lab1: Lab) -> f32 {
    lab0.delta_e(lab1)
}

/// Rec.709-weighted sum of the non-linear channels.
///
/// Not photometric luminance; only meant for ordering colors light to dark.
pub fn luminance(pixel: Pixel) -> f32 {
    0.2126 * pixel.r as f32 + 0.7152 * pixel.g as f32 + 0.0722 * pixel.b as f32
}

/// Luminance of a fractional (mean) color.
pub(crate) fn luminance_f32(color: rgb::RGB<f32>) -> f32 {
    0.2126 * color.r + 0.7152 * color.g + 0.0722 * color.b
}

/// Convert an sRGB pixel to HSL, each component in [0, 1].
pub fn rgb_to_hsl(pixel: Pixel) -> [f32; 3] {
    let r = pixel.r as f32 / 255.0;
    let g = pixel.g as f32 / 255.0;
    let b = pixel.b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        // achromatic
        return [0.0, 0.0, l];
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    [h / 6.0, s, l]
}

/// Format a pixel as `#rrggbb`.
pub fn to_hex(pixel: Pixel) -> String {
    format!("#{:02x}{:02x}{:02x}", pixel.r, pixel.g, pixel.b)
}

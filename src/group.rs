use crate::Pixel;
use crate::colorspace::luminance_f32;

/// A collection of pixel samples produced by one of the clustering engines.
///
/// Order is the order in which pixels were assigned; it carries no meaning
/// beyond display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelGroup {
    pixels: Vec<Pixel>,
}

impl PixelGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pixels: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, pixel: Pixel) {
        self.pixels.push(pixel);
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<Pixel> {
        self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Arithmetic mean per channel, accumulated in f64.
    /// Returns `None` for an empty group.
    pub fn mean(&self) -> Option<rgb::RGB<f32>> {
        mean_of(&self.pixels)
    }

    /// The mean color rounded to the nearest pixel value.
    pub fn representative(&self) -> Option<Pixel> {
        self.mean().map(round_color)
    }

    /// Luminance of the mean color.
    pub fn luminance(&self) -> Option<f32> {
        self.mean().map(luminance_f32)
    }
}

impl From<Vec<Pixel>> for PixelGroup {
    fn from(pixels: Vec<Pixel>) -> Self {
        Self { pixels }
    }
}

impl FromIterator<Pixel> for PixelGroup {
    fn from_iter<I: IntoIterator<Item = Pixel>>(iter: I) -> Self {
        Self {
            pixels: iter.into_iter().collect(),
        }
    }
}

impl Extend<Pixel> for PixelGroup {
    fn extend<I: IntoIterator<Item = Pixel>>(&mut self, iter: I) {
        self.pixels.extend(iter);
    }
}

impl<'a> IntoIterator for &'a PixelGroup {
    type Item = &'a Pixel;
    type IntoIter = core::slice::Iter<'a, Pixel>;

    fn into_iter(self) -> Self::IntoIter {
        self.pixels.iter()
    }
}

pub(crate) fn mean_of(pixels: &[Pixel]) -> Option<rgb::RGB<f32>> {
    if pixels.is_empty() {
        return None;
    }
    let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
    for p in pixels {
        r += p.r as u64;
        g += p.g as u64;
        b += p.b as u64;
    }
    let n = pixels.len() as f64;
    Some(rgb::RGB {
        r: (r as f64 / n) as f32,
        g: (g as f64 / n) as f32,
        b: (b as f64 / n) as f32,
    })
}

pub(crate) fn round_color(color: rgb::RGB<f32>) -> Pixel {
    Pixel {
        r: color.r.round().clamp(0.0, 255.0) as u8,
        g: color.g.round().clamp(0.0, 255.0) as u8,
        b: color.b.round().clamp(0.0, 255.0) as u8,
    }
}

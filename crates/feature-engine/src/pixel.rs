//! Input precision handling

use ndarray::{ArrayD, ArrayViewD};

/// Sample types accepted as image input. Everything is processed as `f32`.
pub trait Pixel: Copy + Send + Sync {
    /// Convert to the working precision. Unsigned integers are rescaled to
    /// `[0, 1]`; floats are cast unchanged.
    fn to_f32(self) -> f32;
}

impl Pixel for u8 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32 / u8::MAX as f32
    }
}

impl Pixel for u16 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32 / u16::MAX as f32
    }
}

impl Pixel for f32 {
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

impl Pixel for f64 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

/// `f32` copy of `image`
pub fn to_float_image<P: Pixel>(image: &ArrayViewD<'_, P>) -> ArrayD<f32> {
    image.mapv(P::to_f32)
}

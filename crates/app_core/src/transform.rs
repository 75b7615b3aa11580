//! Pixel transforms: per-frame render (rotate, then brightness) and the
//! baking edits crop and sharpen

use crate::error::{AppError, Result};
use image::{imageops, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use std::sync::Arc;

/// Neutral brightness factor
pub const NEUTRAL_BRIGHTNESS: f32 = 1.0;

/// Produce display pixels from an original and the live parameters
///
/// Rotation is applied first, brightness second. The neutral case hands
/// back the original without copying.
pub fn render(original: &Arc<RgbaImage>, rotation: f32, brightness: f32) -> Arc<RgbaImage> {
    let rotation = rotation.rem_euclid(360.0);
    if rotation == 0.0 && brightness == NEUTRAL_BRIGHTNESS {
        return Arc::clone(original);
    }

    let mut out = rotate(original, rotation);
    apply_brightness(&mut out, brightness);
    Arc::new(out)
}

/// Rotate clockwise by `degrees` about the image center
///
/// Quarter turns are exact. Other angles grow the canvas to the rotated
/// bounding box, fill with transparency and interpolate bilinearly.
pub fn rotate(img: &RgbaImage, degrees: f32) -> RgbaImage {
    let degrees = degrees.rem_euclid(360.0);
    if degrees == 0.0 {
        return img.clone();
    }
    if degrees == 90.0 {
        return imageops::rotate90(img);
    }
    if degrees == 180.0 {
        return imageops::rotate180(img);
    }
    if degrees == 270.0 {
        return imageops::rotate270(img);
    }

    let theta = degrees.to_radians();
    let (w, h) = (img.width() as f32, img.height() as f32);
    let (cos, sin) = (theta.cos().abs(), theta.sin().abs());
    let out_w = (w * cos + h * sin).ceil() as u32;
    let out_h = (w * sin + h * cos).ceil() as u32;

    let mut canvas = RgbaImage::new(out_w.max(1), out_h.max(1));
    let x = (out_w as i64 - img.width() as i64) / 2;
    let y = (out_h as i64 - img.height() as i64) / 2;
    imageops::overlay(&mut canvas, img, x, y);

    rotate_about_center(&canvas, theta, Interpolation::Bilinear, Rgba([0, 0, 0, 0]))
}

/// Power-law brightness, `out = in ^ factor` per color channel; alpha untouched
pub fn apply_brightness(img: &mut RgbaImage, factor: f32) {
    if factor == NEUTRAL_BRIGHTNESS {
        return;
    }

    let lut: Vec<u8> = (0..=255u16)
        .map(|v| {
            let normalized = v as f32 / 255.0;
            (normalized.powf(factor) * 255.0).round().clamp(0.0, 255.0) as u8
        })
        .collect();

    for px in img.pixels_mut() {
        for c in 0..3 {
            px[c] = lut[px[c] as usize];
        }
    }
}

/// Slider position in [-100, 100] to a brightness factor in [0.5, 1.5]
pub fn brightness_from_slider(value: i32) -> f32 {
    1.0 - value.clamp(-100, 100) as f32 / 200.0
}

/// Crop rectangle in pixels of the rotated image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Largest rectangle of the given aspect ratio centered inside `self`
    pub fn fit_aspect(self, aspect_w: u32, aspect_h: u32) -> Self {
        if aspect_w == 0 || aspect_h == 0 || self.width == 0 || self.height == 0 {
            return self;
        }

        let ratio = aspect_w as f64 / aspect_h as f64;
        let (width, height) = if self.width as f64 / self.height as f64 > ratio {
            ((self.height as f64 * ratio).round() as u32, self.height)
        } else {
            (self.width, (self.width as f64 / ratio).round() as u32)
        };

        Self {
            x: self.x + (self.width - width.min(self.width)) / 2,
            y: self.y + (self.height - height.min(self.height)) / 2,
            width,
            height,
        }
    }
}

/// Crop request: rectangle on the image rotated by `rotation`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSpec {
    pub rect: CropRect,
    pub rotation: f32,
    /// Fixed aspect ratio (width, height), if any
    pub aspect: Option<(u32, u32)>,
}

/// Rotate the pristine original and cut out the requested rectangle
pub fn crop(original: &RgbaImage, spec: &CropSpec) -> Result<RgbaImage> {
    let rotated = rotate(original, spec.rotation);

    let rect = match spec.aspect {
        Some((w, h)) => spec.rect.fit_aspect(w, h),
        None => spec.rect,
    };

    // Clamp to the rotated image
    let x = rect.x.min(rotated.width());
    let y = rect.y.min(rotated.height());
    let width = rect.width.min(rotated.width() - x);
    let height = rect.height.min(rotated.height() - y);

    if width == 0 || height == 0 {
        return Err(AppError::InvalidEdit(format!(
            "Crop area {}x{} at ({}, {}) is empty",
            rect.width, rect.height, rect.x, rect.y
        )));
    }

    Ok(imageops::crop_imm(&rotated, x, y, width, height).to_image())
}

/// Largest accepted sharpen radius
pub const MAX_SHARPEN_RADIUS: f32 = 100.0;

/// Unsharp mask parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharpenParams {
    /// Blur radius (sigma) of the fine scale; the coarse scale uses twice this
    pub radius: f32,
    /// Strength of the fine scale; the coarse scale uses half of it
    pub amount: f32,
    /// Luminance differences below this are left alone
    pub threshold: u8,
}

impl Default for SharpenParams {
    fn default() -> Self {
        Self {
            radius: 2.0,
            amount: 1.0,
            threshold: 2,
        }
    }
}

/// Two-scale unsharp mask on luminance; chroma and alpha are preserved
pub fn sharpen(original: &RgbaImage, params: &SharpenParams) -> Result<RgbaImage> {
    if !params.radius.is_finite() || !(0.0..=MAX_SHARPEN_RADIUS).contains(&params.radius) {
        return Err(AppError::InvalidEdit(format!(
            "Sharpen radius must be within 0..{}, got {}",
            MAX_SHARPEN_RADIUS, params.radius
        )));
    }
    if !params.amount.is_finite() {
        return Err(AppError::InvalidEdit(format!(
            "Sharpen amount must be a number, got {}",
            params.amount
        )));
    }
    if params.radius == 0.0 || params.amount == 0.0 {
        return Ok(original.clone());
    }

    let luma = GrayImage::from_fn(original.width(), original.height(), |x, y| {
        let px = original.get_pixel(x, y);
        let y = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
        Luma([y.round().clamp(0.0, 255.0) as u8])
    });

    let fine = gaussian_blur_f32(&luma, params.radius);
    let coarse = gaussian_blur_f32(&luma, params.radius * 2.0);
    let threshold = params.threshold as f32;

    let mut out = original.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        let l = luma.get_pixel(x, y)[0] as f32;
        let mut d1 = l - fine.get_pixel(x, y)[0] as f32;
        let mut d2 = l - coarse.get_pixel(x, y)[0] as f32;
        if d1.abs() < threshold {
            d1 = 0.0;
        }
        if d2.abs() < threshold {
            d2 = 0.0;
        }

        let delta = params.amount * d1 + params.amount * 0.5 * d2;
        if delta == 0.0 {
            continue;
        }
        for c in 0..3 {
            px[c] = (px[c] as f32 + delta).round().clamp(0.0, 255.0) as u8;
        }
    }

    Ok(out)
}

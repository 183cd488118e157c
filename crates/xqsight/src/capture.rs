//! Frame sources for the orchestrator.

use crate::CaptureError;
use xqsight_core::{ColorImage, PixelRect};

#[cfg(feature = "image")]
use std::path::{Path, PathBuf};

/// Supplies one frame per call. A failure is handled like "board not found".
pub trait ScreenCapture: Send {
    fn name(&self) -> &str;
    fn capture(&mut self) -> Result<ColorImage, CaptureError>;
}

/// Crop `image` to `[x, y, width, height]`, clipped to the image.
pub fn crop_region(image: &ColorImage, region: Option<[u32; 4]>) -> Result<ColorImage, CaptureError> {
    let out = match region {
        None => image.clone(),
        Some([x, y, w, h]) => image.view().crop(PixelRect {
            x: x as usize,
            y: y as usize,
            width: w as usize,
            height: h as usize,
        }),
    };
    if out.is_empty() {
        return Err(CaptureError::Empty);
    }
    Ok(out)
}

#[cfg(feature = "image")]
pub fn color_image_from_rgb(img: &::image::RgbImage) -> ColorImage {
    ColorImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

/// Decode any format `image` understands into RGB.
#[cfg(feature = "image")]
pub fn load_color_image(path: impl AsRef<Path>) -> Result<ColorImage, CaptureError> {
    let path = path.as_ref();
    let read_err = |message: String| CaptureError::Read {
        path: path.to_path_buf(),
        message,
    };
    let img = ::image::ImageReader::open(path)
        .map_err(|e| read_err(e.to_string()))?
        .decode()
        .map_err(|e| read_err(e.to_string()))?
        .to_rgb8();
    Ok(color_image_from_rgb(&img))
}

/// Save as PNG (or whatever the extension says).
#[cfg(feature = "image")]
pub fn save_color_image(image: &ColorImage, path: impl AsRef<Path>) -> Result<(), ::image::ImageError> {
    ::image::save_buffer(
        path,
        &image.data,
        image.width as u32,
        image.height as u32,
        ::image::ColorType::Rgb8,
    )
}

/// Re-reads an image file on every call, so a test harness or another tool
/// can swap the file between ticks.
#[cfg(feature = "image")]
#[derive(Clone, Debug)]
pub struct FileCapture {
    path: PathBuf,
    region: Option<[u32; 4]>,
}

#[cfg(feature = "image")]
impl FileCapture {
    pub fn new(path: impl Into<PathBuf>, region: Option<[u32; 4]>) -> Self {
        Self {
            path: path.into(),
            region,
        }
    }
}

#[cfg(feature = "image")]
impl ScreenCapture for FileCapture {
    fn name(&self) -> &str {
        "file"
    }

    fn capture(&mut self) -> Result<ColorImage, CaptureError> {
        crop_region(&load_color_image(&self.path)?, self.region)
    }
}

/// Primary monitor through `xcap`.
#[cfg(feature = "screen")]
#[derive(Clone, Debug, Default)]
pub struct XcapCapture {
    region: Option<[u32; 4]>,
}

#[cfg(feature = "screen")]
impl XcapCapture {
    pub fn new(region: Option<[u32; 4]>) -> Self {
        Self { region }
    }
}

#[cfg(feature = "screen")]
impl ScreenCapture for XcapCapture {
    fn name(&self) -> &str {
        "screen"
    }

    fn capture(&mut self) -> Result<ColorImage, CaptureError> {
        let screen_err = |e: xcap::XCapError| CaptureError::Screen(e.to_string());
        let monitors = xcap::Monitor::all().map_err(screen_err)?;
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary())
            .or_else(|| monitors.first())
            .ok_or_else(|| CaptureError::Screen("no monitor found".into()))?;
        let rgba = monitor.capture_image().map_err(screen_err)?;
        let rgb = ::image::DynamicImage::ImageRgba8(rgba).to_rgb8();
        crop_region(&color_image_from_rgb(&rgb), self.region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_is_clipped() {
        let img = ColorImage::filled(100, 80, [1, 2, 3]);
        let out = crop_region(&img, Some([90, 70, 50, 50])).unwrap();
        assert_eq!((out.width, out.height), (10, 10));
        assert_eq!(crop_region(&img, None).unwrap(), img);
        assert!(matches!(
            crop_region(&img, Some([200, 0, 10, 10])),
            Err(CaptureError::Empty)
        ));
    }

    #[cfg(feature = "image")]
    #[test]
    fn file_capture_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut img = ColorImage::filled(40, 30, [200, 180, 120]);
        img.put_pixel(5, 6, [10, 20, 30]);
        save_color_image(&img, &path).unwrap();

        let mut cap = FileCapture::new(&path, Some([5, 6, 10, 10]));
        let frame = cap.capture().unwrap();
        assert_eq!((frame.width, frame.height), (10, 10));
        assert_eq!(frame.pixel(0, 0), [10, 20, 30]);

        let mut missing = FileCapture::new(dir.path().join("nope.png"), None);
        assert!(matches!(missing.capture(), Err(CaptureError::Read { .. })));
    }
}

use crate::errors::CaptureError;
use crate::info::DeviceInfo;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder};

/// One 8-bit grayscale sensor frame, sized from the device geometry at allocation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RawFrame {
    /// Allocates a zeroed buffer of exactly `width * height` bytes.
    pub fn allocate(info: &DeviceInfo) -> crate::Result<Self> {
        let (width, height) = info.geometry()?;
        let data = vec![0u8; width as usize * height as usize];

        Ok(RawFrame {
            width,
            height,
            data,
        })
    }

    /// Wraps bytes obtained elsewhere. The length is checked on conversion, not here.
    pub fn from_parts(width: u32, height: u32, data: Vec<u8>) -> Self {
        RawFrame {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Reinterprets the buffer as a row-major grayscale image.
    pub fn into_image(self) -> crate::Result<GrayImage> {
        let expected = self.width as usize * self.height as usize;
        let actual = self.data.len();
        if actual != expected {
            return Err(CaptureError::BufferSizeMismatch { expected, actual });
        }

        GrayImage::from_raw(self.width, self.height, self.data)
            .ok_or(CaptureError::BufferSizeMismatch { expected, actual })
    }

    /// Converts to an image and encodes it as PNG.
    pub fn encode_png(self) -> crate::Result<Vec<u8>> {
        let image = self.into_image()?;
        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::L8,
            )
            .map_err(|e| CaptureError::ConversionFailed(e.to_string()))?;

        Ok(png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, ImageFormat};

    fn info(width: u32, height: u32) -> DeviceInfo {
        DeviceInfo {
            device_id: 0,
            serial: String::new(),
            com_port: 0,
            com_speed: 0,
            width,
            height,
            contrast: 0,
            brightness: 0,
            gain: 0,
            dpi: 500,
            firmware_version: 0,
        }
    }

    #[test]
    fn allocation_matches_geometry() {
        let frame = RawFrame::allocate(&info(300, 400)).unwrap();

        assert_eq!(frame.as_bytes().len(), 120_000);
        assert_eq!((frame.width(), frame.height()), (300, 400));
    }

    #[test]
    fn allocation_refuses_invalid_geometry() {
        let err = RawFrame::allocate(&info(300, 0)).unwrap_err();

        assert_eq!(
            err,
            CaptureError::InvalidGeometry {
                width: 300,
                height: 0
            }
        );
    }

    #[test]
    fn short_buffer_is_a_size_mismatch() {
        let frame = RawFrame::from_parts(300, 400, vec![0; 119_999]);

        assert_eq!(
            frame.encode_png().unwrap_err(),
            CaptureError::BufferSizeMismatch {
                expected: 120_000,
                actual: 119_999
            }
        );
    }

    #[test]
    fn png_decodes_to_same_pixels() {
        let data: Vec<u8> = (0..12u32).map(|i| (i * 20) as u8).collect();
        let png = RawFrame::from_parts(4, 3, data.clone()).encode_png().unwrap();

        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert_eq!(decoded.color(), ColorType::L8);
        let gray = decoded.to_luma8();
        assert_eq!(gray.dimensions(), (4, 3));
        assert_eq!(gray.get_pixel(1, 2).0[0], data[2 * 4 + 1]);
        assert_eq!(gray.into_raw(), data);
    }
}

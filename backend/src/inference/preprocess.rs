use image::DynamicImage;
use image::imageops::{self, FilterType};
use ndarray::Array4;

use super::InferenceError;

/// Spatial input size of the model, read from its input tensor `[1, H, W, 3]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub height: u32,
    pub width: u32,
}

/// Converts a decoded image into the model's input tensor.
///
/// This reproduces the training-time pipeline: RGB conversion, Lanczos
/// resize to the exact input size and a float cast that keeps pixel values
/// in `0..=255`. The model was trained on unscaled pixels, so dividing by
/// 255 here would corrupt every prediction.
pub fn preprocess(image: &DynamicImage, size: InputSize) -> Result<Array4<f32>, InferenceError> {
    let rgb = image.to_rgb8();
    let resized = imageops::resize(&rgb, size.width, size.height, FilterType::Lanczos3);

    let data: Vec<f32> = resized.into_raw().into_iter().map(f32::from).collect();
    let tensor = Array4::from_shape_vec(
        (1, size.height as usize, size.width as usize, 3),
        data,
    )
    .map_err(|e| InferenceError::PreprocessingError(e.to_string()))?;

    if log::log_enabled!(log::Level::Debug) {
        let (min, max) = tensor
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        log::debug!(
            "Preprocessed {}x{} {:?} image to {:?} (min {:.2}, max {:.2})",
            image.width(),
            image.height(),
            image.color(),
            tensor.shape(),
            min,
            max
        );
    }

    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use proptest::prelude::*;

    const SIZE: InputSize = InputSize {
        height: 16,
        width: 24,
    };

    #[test]
    fn tensor_has_batch_height_width_channels_layout() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([10, 20, 30])));
        let tensor = preprocess(&image, SIZE).unwrap();
        assert_eq!(tensor.shape(), &[1, 16, 24, 3]);
    }

    #[test]
    fn pixel_values_stay_unscaled() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([200, 100, 50])));
        let tensor = preprocess(&image, SIZE).unwrap();

        assert_eq!(tensor[[0, 0, 0, 0]], 200.0);
        assert_eq!(tensor[[0, 7, 11, 1]], 100.0);
        assert_eq!(tensor[[0, 15, 23, 2]], 50.0);
        let max = tensor.iter().cloned().fold(f32::MIN, f32::max);
        assert!(max > 1.5, "tensor looks normalized: max {max}");
    }

    #[test]
    fn grayscale_is_expanded_to_three_equal_channels() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(20, 20, Luma([128])));
        let tensor = preprocess(&image, SIZE).unwrap();
        for c in 0..3 {
            assert_eq!(tensor[[0, 3, 5, c]], 128.0);
        }
    }

    #[test]
    fn alpha_channel_is_dropped() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 20, Rgba([1, 2, 3, 0])));
        let tensor = preprocess(&image, SIZE).unwrap();
        assert_eq!(tensor.shape()[3], 3);
        assert_eq!(tensor[[0, 0, 0, 2]], 3.0);
    }

    #[test]
    fn downscaling_filters_instead_of_sampling() {
        // 2x2 black/white checkerboard; point sampling would only ever yield 0 or 255.
        let board: RgbImage = ImageBuffer::from_fn(64, 64, |x, y| {
            if ((x / 2) + (y / 2)) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let tensor = preprocess(&DynamicImage::ImageRgb8(board), InputSize { height: 16, width: 16 })
            .unwrap();
        assert!(tensor.iter().any(|&v| v > 10.0 && v < 245.0));
    }

    proptest! {
        #[test]
        fn values_in_pixel_range_for_any_input(
            w in 1u32..48,
            h in 1u32..48,
            r in 2u8..=255,
            g in 0u8..=255,
            b in 0u8..=255,
        ) {
            let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([r, g, b])));
            let tensor = preprocess(&image, InputSize { height: 8, width: 12 }).unwrap();

            prop_assert_eq!(tensor.shape(), &[1, 8, 12, 3]);
            prop_assert!(tensor.iter().all(|&v| (0.0..=255.0).contains(&v)));
            let max = tensor.iter().cloned().fold(f32::MIN, f32::max);
            prop_assert!(max > 1.5);
        }
    }
}

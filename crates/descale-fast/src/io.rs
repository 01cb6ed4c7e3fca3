use std::path::Path;

use descale_fast_ops::convert_depth;
use descale_fast_types::{ColorFamily, Frame, FrameError, FrameFormat, Plane, SampleType};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};

use crate::error::AppError;

// Full-range BT.709.
const KR: f32 = 0.2126;
const KB: f32 = 0.0722;
const KG: f32 = 1.0 - KR - KB;
const CB_SCALE: f32 = 2.0 * (1.0 - KB);
const CR_SCALE: f32 = 2.0 * (1.0 - KR);
const CHROMA_ZERO: f32 = 128.0;

fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Loads an image as a frame: grayscale images stay single plane, colour
/// images become 8-bit 4:4:4 YUV.
pub fn load_frame(path: &Path) -> Result<Frame, AppError> {
    let image = image::open(path).map_err(|source| AppError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let (width, height) = (image.width() as usize, image.height() as usize);

    if !image.color().has_color() {
        let data = image.to_luma8().into_raw().into_iter().map(f32::from).collect();
        return Ok(Frame::gray(FrameFormat::GRAY8, Plane::from_vec(width, height, data)?)?);
    }

    let rgb = image.to_rgb8().into_raw();
    let mut y = Vec::with_capacity(width * height);
    let mut cb = Vec::with_capacity(width * height);
    let mut cr = Vec::with_capacity(width * height);
    for pixel in rgb.chunks_exact(3) {
        let (r, g, b) = (f32::from(pixel[0]), f32::from(pixel[1]), f32::from(pixel[2]));
        let luma = KR * r + KG * g + KB * b;
        y.push(f32::from(to_u8(luma)));
        cb.push(f32::from(to_u8((b - luma) / CB_SCALE + CHROMA_ZERO)));
        cr.push(f32::from(to_u8((r - luma) / CR_SCALE + CHROMA_ZERO)));
    }
    let planes = vec![
        Plane::from_vec(width, height, y)?,
        Plane::from_vec(width, height, cb)?,
        Plane::from_vec(width, height, cr)?,
    ];
    Ok(Frame::new(FrameFormat::YUV444P8, planes)?)
}

/// 8-bit samples ready for encoding, gray or interleaved RGB.
pub fn frame_to_pixels(frame: &Frame) -> Result<(Vec<u8>, ColorType), AppError> {
    let frame = convert_depth(frame, SampleType::Integer, 8)?;
    let format = frame.format();
    match format.family {
        ColorFamily::Gray => {
            let data = frame.luma().data().iter().map(|&v| to_u8(v)).collect();
            Ok((data, ColorType::L8))
        }
        ColorFamily::Yuv if format.subsampling_w == 0 && format.subsampling_h == 0 => {
            let planes = frame.planes();
            let (y, cb, cr) = (planes[0].data(), planes[1].data(), planes[2].data());
            let mut data = Vec::with_capacity(y.len() * 3);
            for ((&luma, &blue), &red) in y.iter().zip(cb).zip(cr) {
                let r = luma + CR_SCALE * (red - CHROMA_ZERO);
                let b = luma + CB_SCALE * (blue - CHROMA_ZERO);
                let g = (luma - KR * r - KB * b) / KG;
                data.extend([to_u8(r), to_u8(g), to_u8(b)]);
            }
            Ok((data, ColorType::Rgb8))
        }
        ColorFamily::Yuv => Err(FrameError::format_mismatch(
            FrameFormat::YUV444P8.to_string(),
            format.to_string(),
        )
        .into()),
    }
}

pub fn encode_png(frame: &Frame) -> Result<Vec<u8>, AppError> {
    let (pixels, color) = frame_to_pixels(frame)?;
    let mut encoded = Vec::new();
    let encoder = PngEncoder::new(&mut encoded);
    encoder
        .write_image(&pixels, frame.width(), frame.height(), color)
        .map_err(AppError::Encode)?;
    Ok(encoded)
}

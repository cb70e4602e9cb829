/// YUV4MPEG2 stream format utilities.
///
/// Layout written by `Y4mEncoder`:
/// ```text
/// YUV4MPEG2 W<width> H<height> F<num>:<den> Ip A1:1 C444 XCOLORRANGE=FULL\n
/// FRAME\n <Y plane> <Cb plane> <Cr plane>
/// FRAME\n ...
/// ```
/// Planes are full resolution (4:4:4), one byte per sample, BT.601 full range.
use crate::models::frame::FrameDimensions;

/// Marker preceding every frame payload.
pub const FRAME_HEADER: &[u8] = b"FRAME\n";

/// Frame rate as the `num:den` pair used in the stream header.
pub fn fps_ratio(fps: f64) -> (u32, u32) {
    let den = 1000u32;
    let num = (fps * den as f64).round().max(1.0) as u32;
    let divisor = gcd(num, den);
    (num / divisor, den / divisor)
}

/// Stream header line, newline included.
pub fn stream_header(dimensions: FrameDimensions, fps: f64) -> String {
    let (num, den) = fps_ratio(fps);
    format!(
        "YUV4MPEG2 W{} H{} F{}:{} Ip A1:1 C444 XCOLORRANGE=FULL\n",
        dimensions.width, dimensions.height, num, den
    )
}

/// Bytes one frame occupies in the stream, frame marker included.
pub fn frame_size(dimensions: FrameDimensions) -> usize {
    FRAME_HEADER.len() + dimensions.width as usize * dimensions.height as usize * 3
}

/// Convert interleaved BGR pixels into planar Y, Cb, Cr appended to `out`.
pub fn bgr_to_yuv444(pixels: &[u8], out: &mut Vec<u8>) {
    let count = pixels.len() / 3;
    let base = out.len();
    out.resize(base + count * 3, 0);
    let (y_plane, rest) = out[base..].split_at_mut(count);
    let (cb_plane, cr_plane) = rest.split_at_mut(count);

    for (i, bgr) in pixels.chunks_exact(3).enumerate() {
        let b = bgr[0] as f32;
        let g = bgr[1] as f32;
        let r = bgr[2] as f32;

        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
        let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;

        y_plane[i] = clamp_sample(y);
        cb_plane[i] = clamp_sample(cb);
        cr_plane[i] = clamp_sample(cr);
    }
}

fn clamp_sample(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fields() {
        let header = stream_header(FrameDimensions::new(640, 480), 10.0);
        assert_eq!(header, "YUV4MPEG2 W640 H480 F10:1 Ip A1:1 C444 XCOLORRANGE=FULL\n");
    }

    #[test]
    fn fractional_rates_reduce() {
        assert_eq!(fps_ratio(29.97), (2997, 100));
        assert_eq!(fps_ratio(12.5), (25, 2));
        assert_eq!(fps_ratio(0.0), (1, 1000));
    }

    #[test]
    fn gray_pixels_have_neutral_chroma() {
        let mut out = Vec::new();
        bgr_to_yuv444(&[0, 0, 0, 255, 255, 255, 128, 128, 128], &mut out);
        assert_eq!(out.len(), 9);
        assert_eq!(&out[0..3], &[0, 255, 128]);
        assert_eq!(&out[3..6], &[128, 128, 128]);
        assert_eq!(&out[6..9], &[128, 128, 128]);
    }

    #[test]
    fn primaries_land_in_expected_planes() {
        let mut out = Vec::new();
        // Pure blue, then pure red.
        bgr_to_yuv444(&[255, 0, 0, 0, 0, 255], &mut out);
        let (y, rest) = out.split_at(2);
        let (cb, cr) = rest.split_at(2);
        assert_eq!(y, &[29, 76]);
        assert_eq!(cb, &[255, 85]);
        assert_eq!(cr, &[107, 255]);
    }

    #[test]
    fn frame_size_includes_marker() {
        assert_eq!(frame_size(FrameDimensions::new(4, 2)), 6 + 24);
    }
}

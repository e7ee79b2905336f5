use image::GrayImage;

/// Rec.601 luma composite of the three visible bands.
pub(crate) fn luma_composite(
    red: &[u8],
    green: &[u8],
    blue: &[u8],
    width: u32,
    height: u32,
) -> GrayImage {
    let data: Vec<u8> = red
        .iter()
        .zip(green)
        .zip(blue)
        .map(|((&r, &g), &b)| {
            let y = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
            y.round().clamp(0.0, 255.0) as u8
        })
        .collect();
    GrayImage::from_raw(width, height, data).expect("band planes validated by RasterTile")
}

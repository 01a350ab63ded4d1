use image::{Rgb, RgbImage};
use palette::{Hsl, IntoColor, Srgb};

use crate::depth::MaskStack;

// ---------------------------------------------------------------------------
// Plane palette
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
/// Plane 0 (nearest) starts at red.
pub fn plane_palette(n: usize) -> Vec<Rgb<u8>> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 300.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Rgb([
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            ])
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Plane map preview
// ---------------------------------------------------------------------------

/// Colour every pixel of the first batch entry by its assigned plane.
pub fn render_plane_map(masks: &MaskStack) -> RgbImage {
    let palette = plane_palette(masks.num_planes());
    let indices = masks.plane_indices();
    let (_, h, w) = indices.dim();

    RgbImage::from_fn(w as u32, h as u32, |x, y| {
        palette[indices[[0, y as usize, x as usize]]]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::PlaneMaskDecomposer;
    use ndarray::arr2;

    #[test]
    fn palette_is_distinct() {
        let palette = plane_palette(8);
        assert_eq!(palette.len(), 8);
        for (i, a) in palette.iter().enumerate() {
            for b in &palette[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(plane_palette(0).is_empty());
    }

    #[test]
    fn preview_uses_plane_colours() {
        let depth = arr2(&[[0.0, 0.7], [0.3, -1.0]]);
        let masks = PlaneMaskDecomposer::default().decompose(&depth).unwrap();
        let palette = plane_palette(8);

        let preview = render_plane_map(&masks);
        assert_eq!(preview.dimensions(), (2, 2));
        assert_eq!(*preview.get_pixel(0, 0), palette[0]);
        assert_eq!(*preview.get_pixel(1, 0), palette[7]);
        assert_eq!(*preview.get_pixel(0, 1), palette[4]);
        assert_eq!(*preview.get_pixel(1, 1), palette[0]);
    }
}

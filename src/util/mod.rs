pub type Rgba = rgb::RGBA<f32>;

pub const TRANSPARENT_BLACK: Rgba = Rgba {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 0.0,
};

/// Componentwise product of two colors.
pub fn modulate(a: Rgba, b: Rgba) -> Rgba {
    Rgba::new(a.r * b.r, a.g * b.g, a.b * b.b, a.a * b.a)
}

/// Limits every channel to at most 1.0. Channels are never negative here.
pub fn clamp_to_one(color: Rgba) -> Rgba {
    Rgba::new(
        color.r.min(1.0),
        color.g.min(1.0),
        color.b.min(1.0),
        color.a.min(1.0),
    )
}

/// Maps a 0-1 f32 rgba pixel to pixel type compatible with module image.
pub fn color_to_image(color: Rgba) -> image::Rgba<u8> {
    image::Rgba([
        (color.r * 255.0).round().clamp(0.0, 255.0) as u8,
        (color.g * 255.0).round().clamp(0.0, 255.0) as u8,
        (color.b * 255.0).round().clamp(0.0, 255.0) as u8,
        (color.a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;
    use test_case::test_case;

    #[test]
    fn modulate_is_componentwise() {
        let c = modulate(Rgba::new(1.0, 0.5, 0.0, 1.0), Rgba::new(0.5, 0.5, 1.0, 1.0));
        assert!(c == Rgba::new(0.5, 0.25, 0.0, 1.0));
    }

    #[test]
    fn clamp_only_limits_from_above() {
        let c = clamp_to_one(Rgba::new(2.0, 0.25, 1.0, 7.0));
        assert!(c == Rgba::new(1.0, 0.25, 1.0, 1.0));
    }

    #[test_case(0.0, 0 ; "black")]
    #[test_case(1.0, 255 ; "white")]
    #[test_case(0.5, 128 ; "half")]
    #[test_case(1.5, 255 ; "overflow")]
    #[test_case(-0.5, 0 ; "underflow")]
    fn channel_conversion(value: f32, expected: u8) {
        let pixel = color_to_image(Rgba::new(value, value, value, value));
        assert!(pixel.0 == [expected; 4]);
    }
}

use crate::colors::{Color, Palette};
use crate::error::{Error, Result};
use crate::features::FeatureSet;
use palette::{encoding, Hsv, IntoColor, Srgb};

/// Palette size used when the caller does not pick one
pub const DEFAULT_NUM_COLORS: usize = 5;

/// Hue, saturation and value of palette entry `index`, each in `[0, 1]`.
///
/// Index 0 is the base triple (tempo, energy, brightness). Later entries rotate
/// the hue by harmony and push saturation and value in alternating directions.
pub fn variant_hsv(features: &FeatureSet, index: usize) -> (f64, f64, f64) {
    let base_hue = features.tempo_norm;
    let base_saturation = features.energy_norm;
    let base_value = features.brightness_norm;

    if index == 0 {
        return (base_hue, base_saturation, base_value);
    }

    let step = index as f64;
    let sign = if index % 2 == 0 { 1.0 } else { -1.0 };

    let hue = (base_hue + features.harmony_norm * 0.3 * step).rem_euclid(1.0);
    let saturation = (base_saturation + features.complexity_norm * 0.2 * sign).clamp(0.2, 0.9);
    let value = (base_value + 0.1 * step * sign).clamp(0.3, 0.95);

    (hue, saturation, value)
}

/// Converts an HSV triple in `[0, 1]` to 8-bit RGB, truncating each channel
pub fn hsv_to_color(hue: f64, saturation: f64, value: f64) -> Color {
    let hsv: Hsv<encoding::Srgb, f64> = Hsv::new(hue * 360.0, saturation, value);
    let rgb: Srgb<f64> = hsv.into_color();

    Color::new(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

pub fn features_to_palette(features: &FeatureSet, num_colors: usize) -> Result<Palette> {
    if num_colors < 1 {
        return Err(Error::InvalidArgument(
            "palette needs at least one color".to_string(),
        ));
    }

    features.validate()?;

    let colors = (0..num_colors)
        .map(|index| {
            let (hue, saturation, value) = variant_hsv(features, index);
            hsv_to_color(hue, saturation, value)
        })
        .collect();

    Ok(Palette::from_colors(colors))
}

//! Dashboard colors and the PPE category color table

use image::Rgb;

pub const COLOR_SAFE: Rgb<u8> = Rgb([0, 200, 0]);
pub const COLOR_UNSAFE: Rgb<u8> = Rgb([200, 50, 0]);
pub const COLOR_BG_DARK: Rgb<u8> = Rgb([20, 20, 20]);
pub const COLOR_TEXT: Rgb<u8> = Rgb([255, 255, 255]);
pub const COLOR_TEXT_DIM: Rgb<u8> = Rgb([180, 180, 180]);
pub const COLOR_ACCENT: Rgb<u8> = Rgb([255, 255, 0]);
pub const COLOR_LABEL_BG: Rgb<u8> = Rgb([0, 0, 0]);

/// Color for labels that match no PPE keyword
pub const COLOR_DEFAULT: Rgb<u8> = COLOR_TEXT;

/// Keyword table, checked in order; the first keyword contained in the
/// lowercased label decides the color
pub const PPE_COLORS: &[(&str, Rgb<u8>)] = &[
    ("helmet", Rgb([255, 0, 255])),
    ("hardhat", Rgb([255, 0, 255])),
    ("vest", Rgb([255, 255, 0])),
    ("jacket", Rgb([255, 255, 0])),
    ("glass", Rgb([0, 255, 0])),
    ("goggle", Rgb([0, 255, 0])),
    ("mask", Rgb([0, 255, 255])),
    ("glove", Rgb([0, 128, 255])),
    ("boot", Rgb([255, 0, 128])),
    ("person", Rgb([255, 150, 100])),
];

/// Resolve the display color of a class label
pub fn ppe_color(label: &str) -> Rgb<u8> {
    let name = label.to_lowercase();

    PPE_COLORS
        .iter()
        .find(|(keyword, _)| name.contains(keyword))
        .map(|(_, color)| *color)
        .unwrap_or(COLOR_DEFAULT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(ppe_color("HARDHAT-Type2"), ppe_color("hardhat"));
        assert_eq!(ppe_color("Safety Vest"), Rgb([255, 255, 0]));
        assert_eq!(ppe_color("GLOVES"), Rgb([0, 128, 255]));
    }

    #[test]
    fn test_first_keyword_wins() {
        // "person" is listed after "mask"
        assert_eq!(ppe_color("person-with-mask"), ppe_color("mask"));
        assert_eq!(ppe_color("Safety Glasses"), Rgb([0, 255, 0]));
    }

    #[test]
    fn test_unknown_label_uses_default() {
        assert_eq!(ppe_color("machinery"), COLOR_DEFAULT);
        assert_eq!(ppe_color(""), COLOR_DEFAULT);
    }

    #[test]
    fn test_negative_classes_share_category_color() {
        assert_eq!(ppe_color("NO-Hardhat"), ppe_color("Hardhat"));
        assert_eq!(ppe_color("NO-Mask"), ppe_color("Mask"));
    }
}

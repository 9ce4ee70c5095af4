//! Phone camera reference table
//!
//! Approximate focal lengths used for scale estimation when a photo carries
//! no usable EXIF. Values are typical per model family; EXIF is preferred
//! whenever present.

use serde::Serialize;

use crate::geometry::AspectRatio;

/// One camera module of a phone
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneLensSpec {
    pub name: &'static str,
    #[serde(rename = "focalLengthMM")]
    pub focal_length_mm: f64,
    #[serde(rename = "equivalent35mmFocalLengthMM")]
    pub equivalent_35mm_focal_length_mm: f64,
    pub aspect_ratio: AspectRatio,
}

/// A phone model family and its camera modules
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhoneModelSpec {
    pub brand: &'static str,
    pub model: &'static str,
    pub year: Option<u16>,
    pub lenses: &'static [PhoneLensSpec],
}

impl PhoneModelSpec {
    /// Look up a lens by its exact name
    pub fn lens(&self, name: &str) -> Option<&'static PhoneLensSpec> {
        self.lenses.iter().find(|lens| lens.name == name)
    }

    /// The 1x main camera, used when the operator names a phone but no lens
    pub fn main_lens(&self) -> Option<&'static PhoneLensSpec> {
        self.lenses
            .iter()
            .find(|lens| lens.name.starts_with("Wide"))
            .or_else(|| self.lenses.first())
    }

    /// `"{brand} {model}"`
    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }
}

const fn lens(
    name: &'static str,
    focal_length_mm: f64,
    equivalent_35mm_focal_length_mm: f64,
) -> PhoneLensSpec {
    PhoneLensSpec {
        name,
        focal_length_mm,
        equivalent_35mm_focal_length_mm,
        aspect_ratio: AspectRatio::FourThree,
    }
}

const APPLE_ULTRA_WIDE_11: PhoneLensSpec = lens("Ultra-Wide (0.5x)", 1.54, 13.0);
const APPLE_ULTRA_WIDE_13: PhoneLensSpec = lens("Ultra-Wide (0.5x)", 1.57, 13.0);
const GOOGLE_ULTRA_WIDE: PhoneLensSpec = lens("Ultra-Wide (0.7x)", 1.95, 16.0);
const SAMSUNG_ULTRA_WIDE: PhoneLensSpec = lens("Ultra-Wide (0.6x)", 1.8, 13.0);
const SAMSUNG_WIDE: PhoneLensSpec = lens("Wide (1x)", 5.4, 24.0);

/// Reference table, grouped by brand and ordered by release year
pub static PHONE_SPECS: &[PhoneModelSpec] = &[
    PhoneModelSpec {
        brand: "Apple",
        model: "iPhone 11",
        year: Some(2019),
        lenses: &[APPLE_ULTRA_WIDE_11, lens("Wide (1x)", 4.25, 26.0)],
    },
    PhoneModelSpec {
        brand: "Apple",
        model: "iPhone 12 / 12 Pro / 12 mini",
        year: Some(2020),
        lenses: &[
            APPLE_ULTRA_WIDE_11,
            lens("Wide (1x)", 5.1, 26.0),
            lens("Tele (2x/2.5x/3x)*", 7.65, 52.0),
        ],
    },
    PhoneModelSpec {
        brand: "Apple",
        model: "iPhone 13 / 13 Pro",
        year: Some(2021),
        lenses: &[
            APPLE_ULTRA_WIDE_13,
            lens("Wide (1x)", 5.7, 26.0),
            lens("Tele (3x)", 9.0, 77.0),
        ],
    },
    PhoneModelSpec {
        brand: "Apple",
        model: "iPhone 14 / 14 Pro",
        year: Some(2022),
        lenses: &[
            APPLE_ULTRA_WIDE_13,
            lens("Wide (1x)", 6.86, 24.0),
            lens("Tele (3x)", 9.0, 77.0),
        ],
    },
    PhoneModelSpec {
        brand: "Apple",
        model: "iPhone 15 / 15 Pro",
        year: Some(2023),
        lenses: &[
            APPLE_ULTRA_WIDE_13,
            lens("Wide (1x)", 6.86, 24.0),
            lens("Tele (3x/5x)*", 9.0, 77.0),
        ],
    },
    PhoneModelSpec {
        brand: "Google",
        model: "Pixel 6 / 6 Pro",
        year: Some(2021),
        lenses: &[
            GOOGLE_ULTRA_WIDE,
            lens("Wide (1x)", 6.81, 25.0),
            lens("Tele (4x)*", 19.0, 104.0),
        ],
    },
    PhoneModelSpec {
        brand: "Google",
        model: "Pixel 7 / 7 Pro",
        year: Some(2022),
        lenses: &[
            GOOGLE_ULTRA_WIDE,
            lens("Wide (1x)", 6.81, 24.0),
            lens("Tele (5x)*", 26.0, 120.0),
        ],
    },
    PhoneModelSpec {
        brand: "Google",
        model: "Pixel 8 / 8 Pro",
        year: Some(2023),
        lenses: &[
            lens("Ultra-Wide (0.5–0.7x)", 2.0, 14.0),
            lens("Wide (1x)", 6.5, 24.0),
            lens("Tele (5x)*", 26.0, 120.0),
        ],
    },
    PhoneModelSpec {
        brand: "Samsung",
        model: "Galaxy S21 / S21 Ultra",
        year: Some(2021),
        lenses: &[SAMSUNG_ULTRA_WIDE, SAMSUNG_WIDE, lens("Tele (3x/10x)*", 10.0, 70.0)],
    },
    PhoneModelSpec {
        brand: "Samsung",
        model: "Galaxy S22 / S22 Ultra",
        year: Some(2022),
        lenses: &[SAMSUNG_ULTRA_WIDE, SAMSUNG_WIDE, lens("Tele (3x/10x)*", 10.0, 70.0)],
    },
    PhoneModelSpec {
        brand: "Samsung",
        model: "Galaxy S23 / S23 Ultra",
        year: Some(2023),
        lenses: &[SAMSUNG_ULTRA_WIDE, SAMSUNG_WIDE, lens("Tele (3x/10x)*", 10.0, 70.0)],
    },
    PhoneModelSpec {
        brand: "Samsung",
        model: "Galaxy S24 / S24 Ultra",
        year: Some(2024),
        lenses: &[SAMSUNG_ULTRA_WIDE, SAMSUNG_WIDE, lens("Tele (3x/5–10x)*", 9.0, 70.0)],
    },
];

/// Distinct brands, sorted
pub fn brands() -> Vec<&'static str> {
    let mut brands: Vec<&'static str> = PHONE_SPECS.iter().map(|spec| spec.brand).collect();
    brands.sort_unstable();
    brands.dedup();
    brands
}

/// All model families of a brand (case-insensitive)
pub fn models_for_brand(brand: &str) -> Vec<&'static PhoneModelSpec> {
    PHONE_SPECS
        .iter()
        .filter(|spec| spec.brand.eq_ignore_ascii_case(brand))
        .collect()
}

/// Find a model family by brand and model name (case-insensitive)
pub fn find_model(brand: &str, model: &str) -> Option<&'static PhoneModelSpec> {
    PHONE_SPECS
        .iter()
        .find(|spec| spec.brand.eq_ignore_ascii_case(brand) && spec.model.eq_ignore_ascii_case(model))
}

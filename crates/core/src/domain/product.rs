use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// MSC pricing is national ASP less a 40% discount.
pub const MSC_PRICE_FACTOR: Decimal = Decimal::from_parts(60, 0, 0, false, 2);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WoundProduct {
    pub q_code: String,
    pub name: String,
    pub manufacturer: String,
    pub category: String,
    pub national_asp_per_sq_cm: Decimal,
    pub available_sizes_cm2: Vec<f64>,
    pub active: bool,
}

impl WoundProduct {
    pub fn msc_price_per_sq_cm(&self) -> Decimal {
        (self.national_asp_per_sq_cm * MSC_PRICE_FACTOR).round_dp(2)
    }

    /// Price for a graft of `size_cm2`, or `None` when the size or the product is not
    /// representable as a decimal.
    pub fn total_price(&self, size_cm2: f64, use_national_asp: bool) -> Option<Decimal> {
        let size = Decimal::from_f64_retain(size_cm2)?;
        let unit = if use_national_asp {
            self.national_asp_per_sq_cm
        } else {
            self.msc_price_per_sq_cm()
        };
        unit.checked_mul(size).map(|total| total.round_dp(2))
    }

    /// Smallest offered size covering `size_cm2`, else the largest offered size.
    pub fn closest_available_size(&self, size_cm2: f64) -> Option<f64> {
        let mut sizes: Vec<f64> =
            self.available_sizes_cm2.iter().copied().filter(|size| size.is_finite()).collect();
        sizes.sort_by(f64::total_cmp);

        sizes.iter().copied().find(|size| *size >= size_cm2).or_else(|| sizes.last().copied())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::WoundProduct;

    fn product() -> WoundProduct {
        WoundProduct {
            q_code: "Q4158".to_string(),
            name: "Kerecis Omega3".to_string(),
            manufacturer: "Kerecis".to_string(),
            category: "skin_substitute".to_string(),
            national_asp_per_sq_cm: Decimal::new(15000, 2),
            available_sizes_cm2: vec![16.0, 4.0, 28.0],
            active: true,
        }
    }

    #[test]
    fn msc_price_applies_forty_percent_discount() {
        assert_eq!(product().msc_price_per_sq_cm(), Decimal::new(9000, 2));
    }

    #[test]
    fn total_price_multiplies_unit_price_by_size() {
        let product = product();
        assert_eq!(product.total_price(4.0, false), Some(Decimal::new(36000, 2)));
        assert_eq!(product.total_price(4.0, true), Some(Decimal::new(60000, 2)));
        assert_eq!(product.total_price(f64::NAN, false), None);
        assert_eq!(product.total_price(1.0e27, false), None);
    }

    #[test]
    fn closest_size_rounds_up_then_caps_at_largest() {
        let product = product();
        assert_eq!(product.closest_available_size(3.0), Some(4.0));
        assert_eq!(product.closest_available_size(16.0), Some(16.0));
        assert_eq!(product.closest_available_size(50.0), Some(28.0));

        let empty = WoundProduct { available_sizes_cm2: Vec::new(), ..product };
        assert_eq!(empty.closest_available_size(4.0), None);
    }
}

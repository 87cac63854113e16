use crate::domain::product::WoundProduct;

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    products: Vec<WoundProduct>,
}

impl Catalog {
    pub fn new(products: Vec<WoundProduct>) -> Self {
        Self { products }
    }

    pub fn find(&self, q_code: &str) -> Option<&WoundProduct> {
        let q_code = q_code.trim();
        self.products.iter().find(|product| product.q_code.eq_ignore_ascii_case(q_code))
    }

    pub fn find_active(&self, q_code: &str) -> Option<&WoundProduct> {
        self.find(q_code).filter(|product| product.active)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::Catalog;
    use crate::domain::product::WoundProduct;

    fn product(q_code: &str, active: bool) -> WoundProduct {
        WoundProduct {
            q_code: q_code.to_string(),
            name: format!("{q_code} graft"),
            manufacturer: "Acme Biologics".to_string(),
            category: "skin_substitute".to_string(),
            national_asp_per_sq_cm: Decimal::new(10000, 2),
            available_sizes_cm2: vec![4.0],
            active,
        }
    }

    #[test]
    fn lookup_is_case_insensitive_and_respects_active_flag() {
        let catalog = Catalog::new(vec![product("Q4158", true), product("Q4161", false)]);

        assert!(catalog.find(" q4158 ").is_some());
        assert!(catalog.find("Q4161").is_some());
        assert!(catalog.find_active("Q4161").is_none());
        assert!(catalog.find("Q9999").is_none());
        assert_eq!(catalog.len(), 2);
    }
}

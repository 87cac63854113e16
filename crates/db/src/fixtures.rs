use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use woundrx_core::domain::context::WoundType;
use woundrx_core::domain::product::WoundProduct;
use woundrx_core::domain::rule::{RecommendationRule, RecommendedProduct, RuleId};
use woundrx_core::recommend::Condition;

use crate::connection::DbPool;
use crate::repositories::{
    ProductRepository, RepositoryError, RuleRepository, SqlProductRepository, SqlRuleRepository,
};

struct SeedProduct {
    q_code: &'static str,
    name: &'static str,
    manufacturer: &'static str,
    category: &'static str,
    /// National ASP per cm2 in cents.
    national_asp_cents: i64,
    sizes_cm2: &'static [f64],
}

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        q_code: "Q4158",
        name: "Kerecis Omega3",
        manufacturer: "Kerecis",
        category: "SkinSubstitute",
        national_asp_cents: 12_544,
        sizes_cm2: &[3.0, 7.0, 10.5, 14.0, 21.0, 38.5, 70.0],
    },
    SeedProduct {
        q_code: "Q4161",
        name: "bio-ConneKt Wound Matrix",
        manufacturer: "Aroa Biosurgery",
        category: "CollageMatrix",
        national_asp_cents: 8_913,
        sizes_cm2: &[4.0, 16.0, 25.0, 50.0],
    },
    SeedProduct {
        q_code: "Q4145",
        name: "EpiFix",
        manufacturer: "MiMedx",
        category: "Amniotic",
        national_asp_cents: 13_371,
        sizes_cm2: &[2.25, 4.0, 6.0, 8.0, 16.0, 24.0],
    },
    SeedProduct {
        q_code: "Q4154",
        name: "Biovance",
        manufacturer: "CELULARITY",
        category: "SkinSubstitute",
        national_asp_cents: 55_064,
        sizes_cm2: &[4.0, 6.0, 8.0, 9.0, 12.0, 16.0, 25.0, 36.0],
    },
    SeedProduct {
        q_code: "Q4191",
        name: "Restorigin",
        manufacturer: "Extremity Care LLC",
        category: "Amniotic",
        national_asp_cents: 94_015,
        sizes_cm2: &[4.0, 6.0, 8.0, 16.0, 24.0, 25.0, 32.0],
    },
    SeedProduct {
        q_code: "Q4193",
        name: "Coll-e-derm",
        manufacturer: "Extremity Care LLC",
        category: "CollageMatrix",
        national_asp_cents: 160_827,
        sizes_cm2: &[4.0, 6.0, 8.0, 16.0, 24.0, 32.0],
    },
    SeedProduct {
        q_code: "Q4238",
        name: "Derm-maxx",
        manufacturer: "BioWound Solutions",
        category: "SkinSubstitute",
        national_asp_cents: 164_499,
        sizes_cm2: &[16.0, 25.0],
    },
];

const SEED_RULE_IDS: &[i64] = &[1001, 1002, 1003, 1004, 1005, 1006];

/// Demonstration catalog and rule set for DFU, VLU and PU workflows.
pub struct WoundCareSeedDataset;

impl WoundCareSeedDataset {
    pub fn products() -> Vec<WoundProduct> {
        SEED_PRODUCTS
            .iter()
            .map(|seed| WoundProduct {
                q_code: seed.q_code.to_string(),
                name: seed.name.to_string(),
                manufacturer: seed.manufacturer.to_string(),
                category: seed.category.to_string(),
                national_asp_per_sq_cm: Decimal::new(seed.national_asp_cents, 2),
                available_sizes_cm2: seed.sizes_cm2.to_vec(),
                active: true,
            })
            .collect()
    }

    pub fn rules() -> Vec<RecommendationRule> {
        vec![
            RecommendationRule::new(RuleId(1001), "DFU first-line fish skin graft")
                .with_description("Uninfected diabetic foot ulcers after four weeks of standard care")
                .for_wound_types(vec![WoundType::Dfu])
                .with_priority(10)
                .when(Condition::All(vec![
                    Condition::greater_than("wound_characteristics.duration_weeks", 3.0),
                    Condition::not_equals("wound_characteristics.infection_status", "active"),
                ]))
                .unless(Condition::equals("patient_factors.fish_allergy", true))
                .recommend(
                    RecommendedProduct::new("Q4158")
                        .with_rank(1)
                        .with_confidence(0.9)
                        .with_benefit("Omega-3 rich acellular dermal matrix")
                        .with_benefit("Supports granulation in chronic DFU"),
                )
                .recommend(RecommendedProduct::new("Q4145").with_rank(2).with_confidence(0.8))
                .with_reasoning_template(
                    "default",
                    "{{ q_code }} is indicated for {{ wound_type_label }} wounds that have not healed with standard care; suggested graft size {{ suggested_size_cm2 }} cm2.",
                )
                .with_clinical_evidence("Randomized trials show improved 12-week closure in DFU")
                .with_contraindication("Known sensitivity to fish products")
                .with_size_suggestion("WOUND_AREA_PLUS_MARGIN"),
            RecommendationRule::new(RuleId(1002), "Large DFU collagen matrix")
                .for_wound_types(vec![WoundType::Dfu])
                .with_priority(20)
                .when(Condition::greater_than("wound_characteristics.area_cm2", 10.0))
                .recommend(RecommendedProduct::new("Q4193").with_rank(1).with_confidence(0.75))
                .recommend(RecommendedProduct::new("Q4238").with_rank(2).with_confidence(0.7))
                .with_size_suggestion("LARGE_WOUND"),
            RecommendationRule::new(RuleId(1003), "VLU amniotic membrane")
                .for_wound_types(vec![WoundType::Vlu])
                .with_priority(10)
                .when(Condition::exists("wound_characteristics.area_cm2"))
                .recommend(
                    RecommendedProduct::new("Q4145")
                        .with_rank(1)
                        .with_confidence(0.85)
                        .with_benefit("Dehydrated human amnion/chorion membrane"),
                )
                .recommend(RecommendedProduct::new("Q4191").with_rank(2).with_confidence(0.7))
                .with_reasoning_template(
                    "Q4145",
                    "Amniotic membrane {{ q_code }} supports closure of venous leg ulcers under compression therapy.",
                )
                .with_clinical_evidence("Multicenter RCT in VLU with multilayer compression")
                .with_size_suggestion("MATCH_WOUND_AREA"),
            RecommendationRule::new(RuleId(1004), "Pressure ulcer stage 3-4")
                .for_wound_types(vec![WoundType::Pu])
                .with_priority(10)
                .when(Condition::one_of("wound_characteristics.depth", ["full_thickness", "deep"]))
                .recommend(RecommendedProduct::new("Q4154").with_rank(1).with_confidence(0.8))
                .recommend(RecommendedProduct::new("Q4161").with_rank(2).with_confidence(0.65))
                .with_size_suggestion("STANDARD_4x4"),
            RecommendationRule::new(RuleId(1005), "Medicare Advantage preference")
                .with_priority(50)
                .when(Condition::equals("payer_context.payer_type", "medicare_advantage"))
                .recommend(RecommendedProduct::new("Q4161").with_rank(3).with_confidence(0.6))
                .with_size_suggestion("STANDARD_2x2"),
            RecommendationRule::new(RuleId(1006), "Retired Biovance protocol")
                .for_wound_types(vec![WoundType::Dfu, WoundType::Vlu])
                .with_priority(5)
                .inactive()
                .recommend(RecommendedProduct::new("Q4154").with_rank(1).with_confidence(0.95)),
        ]
    }

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let products = SqlProductRepository::new(pool.clone());
        let seeded_products = Self::products();
        let product_count = seeded_products.len();
        for product in seeded_products {
            products.save(product).await?;
        }

        let rules = SqlRuleRepository::new(pool.clone());
        let seeded_rules = Self::rules();
        let rule_count = seeded_rules.len();
        for rule in seeded_rules {
            rules.save(rule).await?;
        }

        info!(
            event_name = "seed.loaded",
            products = product_count,
            rules = rule_count,
            "wound care seed dataset loaded"
        );
        Ok(SeedResult { products_seeded: product_count, rules_seeded: rule_count })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let products = SqlProductRepository::new(pool.clone());
        for seed in SEED_PRODUCTS {
            let present = products
                .find_by_q_code(seed.q_code)
                .await?
                .map(|product| product.national_asp_per_sq_cm == Decimal::new(seed.national_asp_cents, 2))
                .unwrap_or(false);
            checks.push((format!("product {}", seed.q_code), present));
        }

        let rules = SqlRuleRepository::new(pool.clone());
        for id in SEED_RULE_IDS {
            let present = rules.find_by_id(RuleId(*id)).await?.is_some();
            checks.push((format!("rule {id}"), present));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for id in SEED_RULE_IDS {
            sqlx::query("DELETE FROM recommendation_rules WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        for seed in SEED_PRODUCTS {
            sqlx::query("DELETE FROM wound_products WHERE q_code = ?")
                .bind(seed.q_code)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    pub products_seeded: usize,
    pub rules_seeded: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

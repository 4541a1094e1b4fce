use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::warn;

use crate::catalog::{normalize_style, ProductRecord, CORE_CATEGORIES};

/// How products are picked for a request. Both behaviors shipped at different
/// times, so the choice is configuration rather than code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationMode {
    Random,
    Tiered,
}

impl RecommendationMode {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "random" => RecommendationMode::Random,
            "tiered" => RecommendationMode::Tiered,
            other => {
                warn!("Unknown RECOMMENDATION_MODE value '{other}', using tiered.");
                RecommendationMode::Tiered
            }
        }
    }
}

const MAX_STYLES: usize = 6;

const PLAN_TIERS: [(&str, &str); 3] = [
    ("economy", "便宜方案"),
    ("mid", "中等方案"),
    ("premium", "奢華方案"),
];

#[derive(Debug, Clone, Serialize)]
pub struct SelectedItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub description: String,
    pub price_per_unit: f64,
    pub product_id: u32,
}

impl From<&ProductRecord> for SelectedItem {
    fn from(record: &ProductRecord) -> Self {
        SelectedItem {
            name: record.name.to_string(),
            quantity: 1.0,
            unit: record.unit.to_string(),
            description: record.description.to_string(),
            price_per_unit: record.price_per_unit,
            product_id: record.id,
        }
    }
}

impl SelectedItem {
    fn none_available() -> Self {
        SelectedItem {
            name: "無推薦商品".to_string(),
            quantity: 0.0,
            unit: "件".to_string(),
            description: String::new(),
            price_per_unit: 0.0,
            product_id: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub plan: &'static str,
    pub label: &'static str,
    pub total_cost: f64,
    pub items: BTreeMap<String, SelectedItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StylePlans {
    pub style_summary: String,
    pub plans: Vec<Plan>,
    pub min_total_cost: f64,
    pub cheapest_flag: bool,
}

/// Selection output: keyed by category in random mode, by style in tiered
/// mode. Serialized untagged so the result JSON mirrors whichever shape was
/// produced.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Recommendations {
    ByCategory(BTreeMap<String, Vec<SelectedItem>>),
    ByStyle(BTreeMap<String, StylePlans>),
}

impl Recommendations {
    pub fn is_empty(&self) -> bool {
        match self {
            Recommendations::ByCategory(map) => map.is_empty(),
            Recommendations::ByStyle(map) => map.is_empty(),
        }
    }
}

/// Representative cost for the whole selection: the sum of picked items in
/// random mode, the globally cheapest plan total in tiered mode.
pub fn total_cost(recommendations: &Recommendations) -> f64 {
    match recommendations {
        Recommendations::ByCategory(map) => map
            .values()
            .flatten()
            .map(|item| item.price_per_unit * item.quantity)
            .sum(),
        Recommendations::ByStyle(map) => map
            .values()
            .map(|style| style.min_total_cost)
            .min_by(f64::total_cmp)
            .unwrap_or(0.0),
    }
}

pub fn match_products(
    mode: RecommendationMode,
    style_name: &str,
    catalog: &[ProductRecord],
) -> Recommendations {
    let mut rng = rand::thread_rng();
    match mode {
        RecommendationMode::Random => random_selection(style_name, catalog, &mut rng),
        RecommendationMode::Tiered => tiered_selection(catalog, &mut rng),
    }
}

/// Per core category, 1-2 random picks without replacement among products of
/// the normalized style or the `general` pool.
fn random_selection<R: Rng>(
    style_name: &str,
    catalog: &[ProductRecord],
    rng: &mut R,
) -> Recommendations {
    let normalized = normalize_style(style_name);
    let mut selections = BTreeMap::new();

    for category in CORE_CATEGORIES {
        let candidates: Vec<&ProductRecord> = catalog
            .iter()
            .filter(|p| p.category == category && (p.style == normalized || p.style == "general"))
            .collect();
        if candidates.is_empty() {
            continue;
        }
        let count = rng.gen_range(1..=2usize).min(candidates.len());
        let picked: Vec<SelectedItem> = candidates
            .choose_multiple(rng, count)
            .map(|record| SelectedItem::from(*record))
            .collect();
        selections.insert(category.to_string(), picked);
    }

    Recommendations::ByCategory(selections)
}

fn pick_for_tier<'a>(sorted: &[&'a ProductRecord], tier: &str) -> &'a ProductRecord {
    match tier {
        "economy" => sorted[0],
        "mid" => {
            if sorted.len() > 1 {
                sorted[1]
            } else {
                sorted[0]
            }
        }
        _ => sorted[sorted.len() - 1],
    }
}

/// Up to `MAX_STYLES` randomly chosen catalog styles, each with three plans
/// built by price tiering per core category. Categories without a
/// style-specific match fall back to the whole catalog.
fn tiered_selection<R: Rng>(catalog: &[ProductRecord], rng: &mut R) -> Recommendations {
    let mut styles: Vec<&str> = catalog.iter().map(|p| p.style).collect();
    styles.sort_unstable();
    styles.dedup();
    styles.shuffle(rng);
    styles.truncate(MAX_STYLES);

    let mut selections = BTreeMap::new();
    for style in styles {
        let style_products: Vec<&ProductRecord> =
            catalog.iter().filter(|p| p.style == style).collect();

        let mut plans = Vec::with_capacity(PLAN_TIERS.len());
        for (tier, label) in PLAN_TIERS {
            let mut items = BTreeMap::new();
            let mut plan_total = 0.0;
            for category in CORE_CATEGORIES {
                let mut candidates: Vec<&ProductRecord> = style_products
                    .iter()
                    .copied()
                    .filter(|p| p.category == category)
                    .collect();
                if candidates.is_empty() {
                    candidates = catalog.iter().filter(|p| p.category == category).collect();
                }

                let item = if candidates.is_empty() {
                    SelectedItem::none_available()
                } else {
                    candidates.sort_by(|a, b| a.price_per_unit.total_cmp(&b.price_per_unit));
                    SelectedItem::from(pick_for_tier(&candidates, tier))
                };
                plan_total += item.price_per_unit * item.quantity;
                items.insert(category.to_string(), item);
            }
            plans.push(Plan {
                plan: tier,
                label,
                total_cost: plan_total,
                items,
            });
        }

        let min_total_cost = plans
            .iter()
            .map(|plan| plan.total_cost)
            .min_by(f64::total_cmp)
            .unwrap_or(0.0);
        selections.insert(
            style.to_string(),
            StylePlans {
                style_summary: format!("{style} 風格"),
                plans,
                min_total_cost,
                cheapest_flag: false,
            },
        );
    }

    if let Some(global_min) = selections
        .values()
        .map(|style| style.min_total_cost)
        .min_by(f64::total_cmp)
    {
        for style in selections.values_mut() {
            style.cheapest_flag = style.min_total_cost == global_min;
        }
    }

    Recommendations::ByStyle(selections)
}

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::additive_extractor::{canonical_set, has_additive_field, probe_raw_tokens};
use crate::additive_normalizer::{normalize, AdditiveCode};
use crate::interaction_checker::can_run;
use crate::report_presenter::RiskTier;

/// How often a routine product is consumed. Cycling taps through the
/// variants in order and wraps around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Rare,
}

impl Frequency {
    pub fn next(self) -> Self {
        match self {
            Frequency::Daily => Frequency::Weekly,
            Frequency::Weekly => Frequency::Rare,
            Frequency::Rare => Frequency::Daily,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Rare => "rare",
        };
        write!(f, "{}", label)
    }
}

/// Tri-state dietary suitability: `None` means the source data did not say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DietFlags {
    pub vegan: Option<bool>,
    pub vegetarian: Option<bool>,
}

/// Summary shown on a routine row. Counts are always recomputed from the
/// stored lists when an item changes, never taken from an incoming record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoutineBadge {
    pub eco_grade: Option<String>,
    pub vegan: Option<bool>,
    pub vegetarian: Option<bool>,
    pub additives_count: usize,
    pub allergens_count: usize,
    pub additive_risk: RiskTier,
}

/// One product in the user's routine.
///
/// `raw_additive_tokens` holds the tokens exactly as the source record
/// carried them; `additives` is the canonical, sorted, deduplicated rendering
/// of those tokens (full forms only, no base expansion) and is rederived on
/// every merge together with the badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineItem {
    pub id: String,
    pub barcode: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub ingredients_text: Option<String>,
    pub allergens: Vec<String>,
    pub eco_grade: Option<String>,
    pub diet_flags: DietFlags,
    pub additive_risk: RiskTier,
    pub raw_additive_tokens: Vec<String>,
    pub additives: Vec<AdditiveCode>,
    pub enabled: bool,
    pub frequency: Frequency,
    pub badge: RoutineBadge,
}

impl RoutineItem {
    fn from_patch(patch: RoutineItemPatch) -> Self {
        let id = patch
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut item = Self {
            id,
            barcode: None,
            name: None,
            brand: None,
            image_url: None,
            ingredients_text: None,
            allergens: Vec::new(),
            eco_grade: None,
            diet_flags: DietFlags::default(),
            additive_risk: RiskTier::default(),
            raw_additive_tokens: Vec::new(),
            additives: Vec::new(),
            enabled: true,
            frequency: Frequency::default(),
            badge: RoutineBadge::default(),
        };
        item.merge(patch);
        item
    }

    /// Barcode when the item has one, internal id otherwise.
    pub fn identity(&self) -> &str {
        self.barcode.as_deref().unwrap_or(&self.id)
    }

    pub fn matches_key(&self, key: &str) -> bool {
        self.id == key || self.barcode.as_deref() == Some(key)
    }

    fn merge(&mut self, patch: RoutineItemPatch) {
        macro_rules! replace_some {
            ($field:ident) => {
                if let Some(value) = patch.$field {
                    self.$field = Some(value);
                }
            };
        }
        replace_some!(barcode);
        replace_some!(name);
        replace_some!(brand);
        replace_some!(image_url);
        replace_some!(ingredients_text);
        replace_some!(eco_grade);
        if let Some(allergens) = patch.allergens {
            self.allergens = allergens;
        }
        if let Some(flags) = patch.diet_flags {
            self.diet_flags = flags;
        }
        if let Some(risk) = patch.additive_risk {
            self.additive_risk = risk;
        }
        if let Some(tokens) = patch.raw_additive_tokens {
            self.raw_additive_tokens = tokens;
        } else if let Some(codes) = patch.additive_codes {
            // Codes-only input still lands in the raw list, so the derived
            // views have a single source of truth.
            self.raw_additive_tokens =
                codes.iter().map(|c| c.as_str().to_string()).collect();
        }
        self.refresh_derived();
    }

    fn refresh_derived(&mut self) {
        let full: BTreeSet<AdditiveCode> = self
            .raw_additive_tokens
            .iter()
            .filter_map(|token| normalize(token))
            .collect();
        self.additives = full.into_iter().collect();
        self.badge = RoutineBadge {
            eco_grade: self.eco_grade.clone(),
            vegan: self.diet_flags.vegan,
            vegetarian: self.diet_flags.vegetarian,
            additives_count: self.additives.len(),
            allergens_count: self.allergens.len(),
            additive_risk: self.additive_risk,
        };
    }
}

/// Partial update for a routine item. `None` means "leave the existing value
/// alone"; a present field replaces wholesale, including an explicitly empty
/// additive list.
///
/// `id` keys the merge for barcode-less records and seeds the stored id on
/// insert; merges never rewrite a stored id, so keys held elsewhere stay
/// valid. Additive data can arrive two ways: `raw_additive_tokens` (the
/// record's literal tokens) or `additive_codes` (already-normalized codes,
/// the manual entry path). The raw list takes precedence when both are
/// present.
#[derive(Debug, Clone, Default)]
pub struct RoutineItemPatch {
    pub id: Option<String>,
    pub barcode: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub ingredients_text: Option<String>,
    pub allergens: Option<Vec<String>>,
    pub eco_grade: Option<String>,
    pub diet_flags: Option<DietFlags>,
    pub additive_risk: Option<RiskTier>,
    pub raw_additive_tokens: Option<Vec<String>>,
    pub additive_codes: Option<Vec<AdditiveCode>>,
}

impl RoutineItemPatch {
    /// Probes a product-like record for every field a routine item can carry.
    /// Field names vary with the record's origin, so each field tries its
    /// known spellings in order.
    pub fn from_product_record(record: &Value) -> Self {
        let raw_additive_tokens = if has_additive_field(record) {
            Some(probe_raw_tokens(record))
        } else {
            None
        };
        Self {
            id: string_field(record, &["id"]),
            barcode: string_field(record, &["barcode", "code"]),
            name: string_field(record, &["name", "product_name"]),
            brand: string_field(record, &["brand", "brands"]),
            image_url: string_field(record, &["image_url", "image_front_url"]),
            ingredients_text: string_field(record, &["ingredients_text"]),
            allergens: allergens_field(record),
            eco_grade: string_field(record, &["ecoscore_grade", "eco_grade"]),
            diet_flags: diet_flags_field(record),
            additive_risk: risk_field(record),
            raw_additive_tokens,
            additive_codes: None,
        }
    }
}

fn string_field(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn allergens_field(record: &Value) -> Option<Vec<String>> {
    match record.get("allergens") {
        Some(Value::String(s)) => Some(clean_allergens(s.split(','))),
        Some(Value::Array(entries)) => {
            Some(clean_allergens(entries.iter().filter_map(Value::as_str)))
        }
        _ => match record.get("allergens_tags") {
            Some(Value::Array(entries)) => {
                Some(clean_allergens(entries.iter().filter_map(Value::as_str)))
            }
            _ => None,
        },
    }
}

/// Strips language prefixes like `en:`, lowercases, and deduplicates while
/// keeping first-seen order.
fn clean_allergens<'a, I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut cleaned = Vec::new();
    for entry in raw {
        let allergen = entry
            .rsplit(':')
            .next()
            .unwrap_or(entry)
            .trim()
            .to_lowercase();
        if !allergen.is_empty() && !cleaned.contains(&allergen) {
            cleaned.push(allergen);
        }
    }
    cleaned
}

fn diet_flags_field(record: &Value) -> Option<DietFlags> {
    let flags = record.get("diet_flags")?.as_object()?;
    Some(DietFlags {
        vegan: flags.get("vegan").and_then(Value::as_bool),
        vegetarian: flags.get("vegetarian").and_then(Value::as_bool),
    })
}

/// Worst risk tier over the record's `additives_info` entries.
fn risk_field(record: &Value) -> Option<RiskTier> {
    let infos = record.get("additives_info")?.as_array()?;
    Some(
        infos
            .iter()
            .map(|info| {
                let label = info
                    .get("risk_level")
                    .and_then(Value::as_str)
                    .or_else(|| info.get("basic_risk_level").and_then(Value::as_str));
                RiskTier::from_label(label)
            })
            .max()
            .unwrap_or(RiskTier::Unknown),
    )
}

/// Ordered collection of routine items. Upsert identity resolves by barcode
/// first, then by the patch's explicit id, else the item is new under a
/// generated id; blank barcodes never act as keys.
///
/// Scanning the same product twice merges into the existing row instead of
/// duplicating it. New items land at the front, the way the scan history
/// reads.
#[derive(Debug, Clone, Default)]
pub struct RoutineAggregator {
    items: Vec<RoutineItem>,
}

impl RoutineAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_record(&mut self, record: &Value) -> &RoutineItem {
        self.upsert(RoutineItemPatch::from_product_record(record))
    }

    pub fn upsert(&mut self, patch: RoutineItemPatch) -> &RoutineItem {
        let existing = self.position_of(&patch);
        match existing {
            Some(index) => {
                self.items[index].merge(patch);
                debug!(key = self.items[index].identity(), "merged routine item");
                &self.items[index]
            }
            None => {
                let item = RoutineItem::from_patch(patch);
                debug!(key = item.identity(), "added routine item");
                self.items.insert(0, item);
                &self.items[0]
            }
        }
    }

    fn position_of(&self, patch: &RoutineItemPatch) -> Option<usize> {
        let barcode = patch.barcode.as_deref().filter(|b| !b.trim().is_empty());
        if let Some(barcode) = barcode {
            let found = self
                .items
                .iter()
                .position(|item| item.barcode.as_deref() == Some(barcode));
            if found.is_some() {
                return found;
            }
        }
        let id = patch.id.as_deref().filter(|id| !id.trim().is_empty())?;
        self.items.iter().position(|item| item.id == id)
    }

    pub fn set_enabled(&mut self, key: &str, enabled: bool) -> bool {
        match self.items.iter_mut().find(|item| item.matches_key(key)) {
            Some(item) => {
                item.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn toggle_enabled(&mut self, key: &str) -> Option<bool> {
        let item = self.items.iter_mut().find(|item| item.matches_key(key))?;
        item.enabled = !item.enabled;
        Some(item.enabled)
    }

    pub fn set_frequency(&mut self, key: &str, frequency: Frequency) -> bool {
        match self.items.iter_mut().find(|item| item.matches_key(key)) {
            Some(item) => {
                item.frequency = frequency;
                true
            }
            None => false,
        }
    }

    pub fn cycle_frequency(&mut self, key: &str) -> Option<Frequency> {
        let item = self.items.iter_mut().find(|item| item.matches_key(key))?;
        item.frequency = item.frequency.next();
        Some(item.frequency)
    }

    /// Removes an item by barcode or id. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| !item.matches_key(key));
        let removed = before != self.items.len();
        if removed {
            debug!(key, "removed routine item");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn list(&self) -> &[RoutineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Canonical additive set over the enabled items, expanded to full and
    /// base forms. This is what an interaction check submits.
    pub fn additive_set(&self) -> Vec<AdditiveCode> {
        additive_set_of(&self.items)
    }

    pub fn unique_additive_count(&self) -> usize {
        self.additive_set().len()
    }

    pub fn can_run_check(&self) -> bool {
        can_run(&self.additive_set())
    }
}

/// Canonical additive set over the enabled items of any slice, so what-if
/// subsets go through the same derivation as the aggregator itself.
pub fn additive_set_of(items: &[RoutineItem]) -> Vec<AdditiveCode> {
    canonical_set(
        items
            .iter()
            .filter(|item| item.enabled)
            .flat_map(|item| item.raw_additive_tokens.iter().map(String::as_str)),
    )
}

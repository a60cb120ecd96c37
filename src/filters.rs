// Mutation helpers for FilterState.
// Every facet edit resets the page to 1 and keeps ranges ordered.

use crate::models::{Facet, FilterPatch, FilterState, RangeKind, SortOrder};
use crate::vocabulary::Bucket;
use std::collections::BTreeSet;

// Swap a (min, max) pair into order when both sides are set
pub(crate) fn ordered<T: Ord>(min: Option<T>, max: Option<T>) -> (Option<T>, Option<T>) {
    match (min, max) {
        (Some(lo), Some(hi)) if lo > hi => (Some(hi), Some(lo)),
        pair => pair,
    }
}

fn clean_token(token: &str) -> Option<String> {
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl FilterState {
    pub fn facet(&self, facet: Facet) -> &BTreeSet<String> {
        match facet {
            Facet::Brand => &self.brand,
            Facet::Fuel => &self.fuel,
            Facet::Body => &self.body,
            Facet::Transmission => &self.transmission,
            Facet::Color => &self.color,
        }
    }

    fn facet_mut(&mut self, facet: Facet) -> &mut BTreeSet<String> {
        match facet {
            Facet::Brand => &mut self.brand,
            Facet::Fuel => &mut self.fuel,
            Facet::Body => &mut self.body,
            Facet::Transmission => &mut self.transmission,
            Facet::Color => &mut self.color,
        }
    }

    pub fn set_search(&mut self, text: &str) {
        self.search = text.trim().to_string();
        self.page = 1;
    }

    pub fn set_price_range(&mut self, min: Option<u64>, max: Option<u64>) {
        (self.price_min, self.price_max) = ordered(min, max);
        self.page = 1;
    }

    pub fn set_year_range(&mut self, min: Option<u32>, max: Option<u32>) {
        (self.year_min, self.year_max) = ordered(min, max);
        self.page = 1;
    }

    pub fn set_km_range(&mut self, min: Option<u64>, max: Option<u64>) {
        (self.km_min, self.km_max) = ordered(min, max);
        self.page = 1;
    }

    /// Apply a preset bucket from the facet vocabulary to the matching range.
    pub fn apply_bucket(&mut self, kind: RangeKind, bucket: &Bucket) {
        match kind {
            RangeKind::Price => self.set_price_range(bucket.min, bucket.max),
            RangeKind::Km => self.set_km_range(bucket.min, bucket.max),
            RangeKind::Year => self.set_year_range(
                bucket.min.and_then(|v| u32::try_from(v).ok()),
                bucket.max.and_then(|v| u32::try_from(v).ok()),
            ),
        }
    }

    /// Add the token if absent, remove it if present. Returns whether it is now selected.
    pub fn toggle(&mut self, facet: Facet, token: &str) -> bool {
        let Some(token) = clean_token(token) else {
            return false;
        };
        self.page = 1;
        if facet == Facet::Brand && self.brand.contains(&token) {
            self.models.remove(&token);
        }
        let set = self.facet_mut(facet);
        if set.remove(&token) {
            false
        } else {
            set.insert(token);
            true
        }
    }

    pub fn set_facet<I, S>(&mut self, facet: Facet, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cleaned: BTreeSet<String> = tokens
            .into_iter()
            .filter_map(|t| clean_token(t.as_ref()))
            .collect();
        if facet == Facet::Brand {
            self.models.retain(|brand, _| cleaned.contains(brand));
        }
        *self.facet_mut(facet) = cleaned;
        self.page = 1;
    }

    /// Toggle a model inside a brand's sub-selection. Selecting a model also
    /// selects its brand; removing the last model leaves the brand selected.
    pub fn toggle_model(&mut self, brand: &str, model: &str) -> bool {
        let (Some(brand), Some(model)) = (clean_token(brand), clean_token(model)) else {
            return false;
        };
        self.page = 1;
        let models = self.models.entry(brand.clone()).or_default();
        let selected = if models.remove(&model) {
            false
        } else {
            models.insert(model);
            true
        };
        if models.is_empty() {
            self.models.remove(&brand);
        }
        self.brand.insert(brand);
        selected
    }

    pub fn set_ordering(&mut self, ordering: SortOrder) {
        self.ordering = ordering;
        self.page = 1;
    }

    pub fn clear_facet(&mut self, facet: Facet) {
        self.facet_mut(facet).clear();
        if facet == Facet::Brand {
            self.models.clear();
        }
        self.page = 1;
    }

    pub fn clear_all(&mut self) {
        *self = FilterState::default();
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.set_page(page);
        self
    }

    /// True when both states select the same results (page ignored).
    pub fn same_facets(&self, other: &FilterState) -> bool {
        self.search == other.search
            && self.price_min == other.price_min
            && self.price_max == other.price_max
            && self.year_min == other.year_min
            && self.year_max == other.year_max
            && self.km_min == other.km_min
            && self.km_max == other.km_max
            && self.brand == other.brand
            && self.models == other.models
            && self.fuel == other.fuel
            && self.body == other.body
            && self.transmission == other.transmission
            && self.color == other.color
            && self.ordering == other.ordering
    }

    /// Restore the invariants after direct field manipulation.
    pub fn normalize(&mut self) {
        self.search = self.search.trim().to_string();
        (self.price_min, self.price_max) = ordered(self.price_min, self.price_max);
        (self.year_min, self.year_max) = ordered(self.year_min, self.year_max);
        (self.km_min, self.km_max) = ordered(self.km_min, self.km_max);
        for facet in Facet::ALL {
            let set = self.facet_mut(facet);
            *set = set.iter().filter_map(|t| clean_token(t)).collect();
        }
        let brands = &self.brand;
        self.models.retain(|brand, models| !models.is_empty() && brands.contains(brand));
        self.page = self.page.max(1);
    }

    /// Merge decoded values over this state.
    pub fn apply_patch(mut self, patch: FilterPatch) -> Self {
        if let Some(search) = patch.search {
            self.search = search;
        }
        self.price_min = patch.price_min.or(self.price_min);
        self.price_max = patch.price_max.or(self.price_max);
        self.year_min = patch.year_min.or(self.year_min);
        self.year_max = patch.year_max.or(self.year_max);
        self.km_min = patch.km_min.or(self.km_min);
        self.km_max = patch.km_max.or(self.km_max);

        for (facet, decoded) in [
            (Facet::Brand, patch.brand),
            (Facet::Fuel, patch.fuel),
            (Facet::Body, patch.body),
            (Facet::Transmission, patch.transmission),
            (Facet::Color, patch.color),
        ] {
            if !decoded.is_empty() {
                *self.facet_mut(facet) = decoded;
            }
        }
        if !patch.models.is_empty() {
            self.brand.extend(patch.models.keys().cloned());
            self.models = patch.models;
        }
        if let Some(ordering) = patch.ordering {
            self.ordering = ordering;
        }
        if let Some(page) = patch.page {
            self.page = page;
        }
        self.normalize();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_ranges_are_swapped() {
        let mut filters = FilterState::default();
        filters.set_price_range(Some(900_000), Some(300_000));
        filters.set_year_range(Some(2022), Some(2015));
        filters.set_km_range(None, Some(50_000));

        assert_eq!((filters.price_min, filters.price_max), (Some(300_000), Some(900_000)));
        assert_eq!((filters.year_min, filters.year_max), (Some(2015), Some(2022)));
        assert_eq!((filters.km_min, filters.km_max), (None, Some(50_000)));
    }

    #[test]
    fn facet_edits_reset_the_page() {
        let mut filters = FilterState::default().with_page(4);
        filters.toggle(Facet::Fuel, "Diesel");
        assert_eq!(filters.page, 1);

        filters.set_page(3);
        filters.set_ordering(SortOrder::PriceAsc);
        assert_eq!(filters.page, 1);
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut filters = FilterState::default();
        assert!(filters.toggle(Facet::Color, " Red "));
        assert!(filters.color.contains("Red"));
        assert!(!filters.toggle(Facet::Color, "Red"));
        assert!(filters.color.is_empty());
        assert!(!filters.toggle(Facet::Color, "   "));
        assert!(filters.color.is_empty());
    }

    #[test]
    fn toggling_a_model_selects_its_brand() {
        let mut filters = FilterState::default();
        assert!(filters.toggle_model("Honda", "City"));
        assert!(filters.brand.contains("Honda"));
        assert_eq!(filters.models["Honda"].len(), 1);

        assert!(!filters.toggle_model("Honda", "City"));
        assert!(!filters.models.contains_key("Honda"));
        assert!(filters.brand.contains("Honda"));
    }

    #[test]
    fn clearing_brand_drops_model_selection() {
        let mut filters = FilterState::default();
        filters.toggle_model("Maruti Suzuki", "Swift");
        filters.clear_facet(Facet::Brand);
        assert!(filters.brand.is_empty());
        assert!(filters.models.is_empty());
    }

    #[test]
    fn replacing_brands_drops_models_of_removed_brands() {
        let mut filters = FilterState::default();
        filters.toggle_model("Honda", "City");
        filters.toggle_model("Kia", "Seltos");
        filters.set_facet(Facet::Brand, ["Kia", "Tata"]);

        assert_eq!(filters.brand, BTreeSet::from(["Kia".to_string(), "Tata".to_string()]));
        assert_eq!(filters.models.keys().collect::<Vec<_>>(), ["Kia"]);
        let query = crate::query_codec::encode(&filters);
        assert_eq!(query, "brand=Kia,Tata&model=Kia:Seltos");
        let decoded = FilterState::default().apply_patch(crate::query_codec::decode(&query));
        assert_eq!(decoded, filters);
    }

    #[test]
    fn normalize_drops_models_without_their_brand() {
        let mut filters = FilterState::default();
        filters.toggle_model("Honda", "City");
        filters.toggle_model("Tata", "Nexon");
        filters.brand.remove("Honda");
        filters.normalize();

        assert!(!filters.models.contains_key("Honda"));
        assert!(filters.models.contains_key("Tata"));
    }

    #[test]
    fn same_facets_ignores_page() {
        let mut a = FilterState::default();
        a.toggle(Facet::Brand, "Honda");
        let b = a.clone().with_page(5);
        assert!(a.same_facets(&b));

        let mut c = a.clone();
        c.toggle(Facet::Brand, "Toyota");
        assert!(!a.same_facets(&c));
    }

    #[test]
    fn patch_merges_over_base_and_restores_order() {
        let mut base = FilterState::default();
        base.toggle(Facet::Fuel, "CNG");
        base.set_price_range(None, Some(400_000));

        let patch = FilterPatch {
            price_min: Some(600_000),
            brand: BTreeSet::from(["Tata".to_string()]),
            ..FilterPatch::default()
        };
        let merged = base.apply_patch(patch);

        assert_eq!(merged.fuel, BTreeSet::from(["CNG".to_string()]));
        assert_eq!(merged.brand, BTreeSet::from(["Tata".to_string()]));
        assert_eq!((merged.price_min, merged.price_max), (Some(400_000), Some(600_000)));
    }

    #[test]
    fn bucket_sets_range() {
        let bucket = Bucket {
            label: "5 - 10 Lakh".to_string(),
            min: Some(500_000),
            max: Some(1_000_000),
        };
        let mut filters = FilterState::default();
        filters.apply_bucket(RangeKind::Price, &bucket);
        assert_eq!((filters.price_min, filters.price_max), (Some(500_000), Some(1_000_000)));
    }
}

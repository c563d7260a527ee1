//! Name canonicalization shared by the analyzers.

use std::collections::BTreeMap;

use crate::domain::ports::ExtractedUnit;

/// Lowercase alphanumerics only, so `"Well Count Chart"`, `"WellCountChart"`
/// and `"well_count_chart"` all map to `"wellcountchart"`.
pub fn canonical(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Implementation units keyed by canonical name. The first definition of a
/// name wins.
pub struct UnitIndex<'a> {
    units: BTreeMap<String, &'a ExtractedUnit>,
}

impl<'a> UnitIndex<'a> {
    pub fn new(units: &'a [ExtractedUnit]) -> Self {
        let mut index = BTreeMap::new();
        for unit in units {
            index.entry(canonical(&unit.name)).or_insert(unit);
        }
        Self { units: index }
    }

    pub fn get(&self, name: &str) -> Option<&'a ExtractedUnit> {
        self.units.get(&canonical(name)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(&canonical(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a ExtractedUnit> + '_ {
        self.units.values().copied()
    }
}

/// Whether `unit` accepts a parameter equivalent to `name`.
pub fn accepts_param(unit: &ExtractedUnit, name: &str) -> bool {
    let wanted = canonical(name);
    unit.params.keys().any(|param| canonical(param) == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalent_names_share_a_canonical_form() {
        assert_eq!(canonical("Well Count Chart"), "wellcountchart");
        assert_eq!(canonical("WellCountChart"), "wellcountchart");
        assert_eq!(canonical("well_count-chart"), "wellcountchart");
        assert_ne!(canonical("Well Chart"), canonical("Well Count Chart"));
    }

    #[test]
    fn first_definition_wins() {
        let mut first = ExtractedUnit::new("Chart", "a.tsx");
        first.event_wiring = true;
        let second = ExtractedUnit::new("chart", "b.tsx");
        let units = vec![first, second];

        let index = UnitIndex::new(&units);
        assert_eq!(index.get("CHART").map(|u| u.module.as_str()), Some("a.tsx"));
        assert!(index.contains("c-h-a-r-t"));
        assert_eq!(index.iter().count(), 1);
    }

    #[test]
    fn params_match_canonically() {
        let mut unit = ExtractedUnit::new("Chart", "a.tsx");
        unit.params.insert("x_axis".to_string(), None);
        assert!(accepts_param(&unit, "xAxis"));
        assert!(!accepts_param(&unit, "yAxis"));
    }
}

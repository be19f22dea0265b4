//! crates/learnlingo_core/src/filter.rs
//!
//! Client-side filtering of catalog entries.
//!
//! Two matching strategies exist because the filter panel comes in two shapes:
//! a multi-select panel (checkbox sets, exact membership) and a single-select
//! panel (one language / one level, case-insensitive containment). Both share
//! the same fixed price buckets. An unset criterion never excludes anything.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::Tutor;

/// Fixed hourly price buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceBucket {
    #[default]
    Any,
    /// price < 20
    Under20,
    /// 20 <= price <= 30
    From20To30,
    /// price > 30
    Over30,
}

impl PriceBucket {
    pub fn contains(self, price: f64) -> bool {
        match self {
            PriceBucket::Any => true,
            PriceBucket::Under20 => price < 20.0,
            PriceBucket::From20To30 => (20.0..=30.0).contains(&price),
            PriceBucket::Over30 => price > 30.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriceBucket::Any => "all",
            PriceBucket::Under20 => "0-20",
            PriceBucket::From20To30 => "20-30",
            PriceBucket::Over30 => "30+",
        }
    }
}

impl fmt::Display for PriceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown price range '{0}', expected one of: all, 0-20, 20-30, 30+")]
pub struct UnknownPriceBucket(pub String);

impl FromStr for PriceBucket {
    type Err = UnknownPriceBucket;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(PriceBucket::Any),
            "0-20" => Ok(PriceBucket::Under20),
            "20-30" => Ok(PriceBucket::From20To30),
            "30+" => Ok(PriceBucket::Over30),
            other => Err(UnknownPriceBucket(other.to_string())),
        }
    }
}

/// Checkbox-style criteria: an entry matches when its languages intersect the
/// selected languages AND its levels intersect the selected levels AND its
/// price falls in the bucket.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiSelect {
    pub languages: BTreeSet<String>,
    pub levels: BTreeSet<String>,
    pub price: PriceBucket,
}

impl MultiSelect {
    /// Flips one language in or out of the selection.
    pub fn toggle_language(&mut self, language: &str) {
        if !self.languages.remove(language) {
            self.languages.insert(language.to_string());
        }
    }

    pub fn toggle_level(&mut self, level: &str) {
        if !self.levels.remove(level) {
            self.levels.insert(level.to_string());
        }
    }

    fn matches(&self, tutor: &Tutor) -> bool {
        let language_ok = self.languages.is_empty()
            || tutor.languages.iter().any(|l| self.languages.contains(l));
        let level_ok =
            self.levels.is_empty() || tutor.levels.iter().any(|l| self.levels.contains(l));
        language_ok && level_ok && self.price.contains(tutor.price_per_hour)
    }
}

/// Dropdown-style criteria matched by case-insensitive containment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SingleSelect {
    pub language: Option<String>,
    pub level: Option<String>,
    pub price: PriceBucket,
}

impl SingleSelect {
    fn matches(&self, tutor: &Tutor) -> bool {
        contains_ci(&tutor.languages, self.language.as_deref())
            && contains_ci(&tutor.levels, self.level.as_deref())
            && self.price.contains(tutor.price_per_hour)
    }
}

fn contains_ci(values: &[String], needle: Option<&str>) -> bool {
    let needle = match needle.map(str::trim) {
        None | Some("") => return true,
        Some(n) => n.to_lowercase(),
    };
    values.iter().any(|v| v.to_lowercase().contains(&needle))
}

/// The criteria currently applied to the listing.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCriteria {
    MultiSelect(MultiSelect),
    SingleSelect(SingleSelect),
}

impl Default for FilterCriteria {
    fn default() -> Self {
        FilterCriteria::MultiSelect(MultiSelect::default())
    }
}

impl FilterCriteria {
    pub fn matches(&self, tutor: &Tutor) -> bool {
        match self {
            FilterCriteria::MultiSelect(c) => c.matches(tutor),
            FilterCriteria::SingleSelect(c) => c.matches(tutor),
        }
    }

    /// Whether any criterion would exclude something.
    pub fn has_active_filters(&self) -> bool {
        match self {
            FilterCriteria::MultiSelect(c) => {
                !c.languages.is_empty() || !c.levels.is_empty() || c.price != PriceBucket::Any
            }
            FilterCriteria::SingleSelect(c) => {
                c.language.as_deref().is_some_and(|s| !s.trim().is_empty())
                    || c.level.as_deref().is_some_and(|s| !s.trim().is_empty())
                    || c.price != PriceBucket::Any
            }
        }
    }

    /// Resets every criterion while keeping the same strategy.
    pub fn clear(&mut self) {
        *self = match self {
            FilterCriteria::MultiSelect(_) => FilterCriteria::MultiSelect(MultiSelect::default()),
            FilterCriteria::SingleSelect(_) => {
                FilterCriteria::SingleSelect(SingleSelect::default())
            }
        };
    }

    /// Entries that pass, in their original order.
    pub fn apply<'a>(&self, tutors: &'a [Tutor]) -> Vec<&'a Tutor> {
        tutors.iter().filter(|t| self.matches(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tutor_with;

    fn catalog() -> Vec<Tutor> {
        vec![
            tutor_with("1", &["English", "French"], &["Beginner"], 15.0),
            tutor_with("2", &["German"], &["Intermediate", "Advanced"], 20.0),
            tutor_with("3", &["English"], &["Advanced"], 30.0),
            tutor_with("4", &["Spanish"], &["Beginner", "Intermediate"], 31.0),
        ]
    }

    fn ids(tutors: Vec<&Tutor>) -> Vec<&str> {
        tutors.into_iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn empty_criteria_accept_everything() {
        let all = catalog();
        for criteria in [
            FilterCriteria::MultiSelect(MultiSelect::default()),
            FilterCriteria::SingleSelect(SingleSelect::default()),
            FilterCriteria::SingleSelect(SingleSelect {
                language: Some("  ".into()),
                level: None,
                price: PriceBucket::Any,
            }),
        ] {
            assert_eq!(criteria.apply(&all).len(), all.len());
        }
    }

    #[test]
    fn price_bucket_edges() {
        assert!(PriceBucket::From20To30.contains(20.0));
        assert!(!PriceBucket::Under20.contains(20.0));
        assert!(PriceBucket::From20To30.contains(30.0));
        assert!(!PriceBucket::Over30.contains(30.0));
        assert!(PriceBucket::Under20.contains(19.99));
        assert!(PriceBucket::Over30.contains(30.01));
    }

    #[test]
    fn multi_select_is_and_of_ors() {
        let all = catalog();
        let mut criteria = MultiSelect::default();
        criteria.toggle_language("English");
        criteria.toggle_language("German");
        let f = FilterCriteria::MultiSelect(criteria.clone());
        assert_eq!(ids(f.apply(&all)), vec!["1", "2", "3"]);

        criteria.toggle_level("Advanced");
        let f = FilterCriteria::MultiSelect(criteria.clone());
        assert_eq!(ids(f.apply(&all)), vec!["2", "3"]);

        criteria.price = PriceBucket::From20To30;
        criteria.toggle_language("German");
        let f = FilterCriteria::MultiSelect(criteria);
        assert_eq!(ids(f.apply(&all)), vec!["3"]);
    }

    #[test]
    fn multi_select_uses_exact_membership() {
        let all = catalog();
        let mut criteria = MultiSelect::default();
        criteria.toggle_language("english");
        assert!(FilterCriteria::MultiSelect(criteria).apply(&all).is_empty());
    }

    #[test]
    fn single_select_matches_substrings_case_insensitively() {
        let all = catalog();
        let f = FilterCriteria::SingleSelect(SingleSelect {
            language: Some("engl".into()),
            level: Some("ADV".into()),
            price: PriceBucket::Any,
        });
        assert_eq!(ids(f.apply(&all)), vec!["3"]);

        let f = FilterCriteria::SingleSelect(SingleSelect {
            language: None,
            level: Some("inter".into()),
            price: PriceBucket::Over30,
        });
        assert_eq!(ids(f.apply(&all)), vec!["4"]);
    }

    #[test]
    fn toggling_twice_restores_selection() {
        let mut criteria = MultiSelect::default();
        criteria.toggle_level("Beginner");
        criteria.toggle_level("Beginner");
        assert_eq!(criteria, MultiSelect::default());
    }

    #[test]
    fn clear_keeps_strategy() {
        let mut f = FilterCriteria::SingleSelect(SingleSelect {
            language: Some("French".into()),
            level: None,
            price: PriceBucket::Under20,
        });
        assert!(f.has_active_filters());
        f.clear();
        assert!(!f.has_active_filters());
        assert!(matches!(f, FilterCriteria::SingleSelect(_)));
    }

    #[test]
    fn price_bucket_parses_wire_values() {
        assert_eq!("20-30".parse::<PriceBucket>(), Ok(PriceBucket::From20To30));
        assert_eq!("all".parse::<PriceBucket>(), Ok(PriceBucket::Any));
        assert_eq!("30+".parse::<PriceBucket>(), Ok(PriceBucket::Over30));
        assert!("cheap".parse::<PriceBucket>().is_err());
        assert_eq!(PriceBucket::Under20.to_string(), "0-20");
    }
}

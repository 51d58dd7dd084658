use std::cmp::Ordering;
use std::fmt;

/// Which partition a record belongs to. Only the K-factor takes part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey(pub u32);

/// Composite key for the secondary sort: grouped by K-factor, ordered by K-factor then date.
///
/// Grouping and ordering are exposed as two separately named functions. The type does not
/// implement `PartialEq` or `Ord`, so neither can be picked up by accident through an operator
/// or a generic `sort()`.
#[derive(Debug, Clone, Copy)]
pub struct SortKey {
    pub k_factor: u32,
    pub season_year: i32,
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl SortKey {
    pub fn new(k_factor: u32, season_year: i32, year: i32, month: u32, day: u32) -> Self {
        Self { k_factor, season_year, year, month, day }
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey(self.k_factor)
    }

    // Grouping equality: dates are ignored.
    pub fn same_group(&self, other: &SortKey) -> bool {
        self.group_key() == other.group_key()
    }

    // Total order. Records of one group form one contiguous run because K-factor comes first.
    pub fn cmp_order(&self, other: &SortKey) -> Ordering {
        self.k_factor.cmp(&other.k_factor)
            .then(self.season_year.cmp(&other.season_year))
            .then(self.year.cmp(&other.year))
            .then(self.month.cmp(&other.month))
            .then(self.day.cmp(&other.day))
    }

    pub fn less(&self, other: &SortKey) -> bool {
        self.cmp_order(other) == Ordering::Less
    }

    pub fn date_cmp(&self, other: &SortKey) -> Ordering {
        (self.season_year, self.year, self.month, self.day)
            .cmp(&(other.season_year, other.year, other.month, other.day))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}/{}", self.k_factor, self.year, self.month, self.day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn same_group_ignores_dates() {
        let a = SortKey::new(20, 2016, 2015, 11, 2);
        let b = SortKey::new(20, 2017, 2017, 4, 12);
        assert!(a.same_group(&b));
        assert!(a.less(&b));
        assert_ne!(a.cmp_order(&b), Ordering::Equal);
    }

    #[test]
    fn k_factor_dominates_dates() {
        let early_big_k = SortKey::new(30, 2001, 2000, 11, 1);
        let late_small_k = SortKey::new(10, 2019, 2019, 4, 1);
        assert!(late_small_k.less(&early_big_k));
        assert!(!late_small_k.same_group(&early_big_k));
    }

    #[test]
    fn season_year_before_calendar_year() {
        // A game in calendar 2016 of the 2016 season comes before a 2015 calendar game of the 2017 season
        let a = SortKey::new(5, 2016, 2016, 3, 1);
        let b = SortKey::new(5, 2017, 2015, 12, 1);
        assert!(a.less(&b));
    }

    #[test]
    fn display_matches_record_style() {
        assert_eq!(SortKey::new(12, 2016, 2016, 1, 9).to_string(), "12 2016/1/9");
    }

    fn any_key() -> impl Strategy<Value = SortKey> {
        (1u32..5, 2000i32..2003, 2000i32..2003, 1u32..13, 1u32..29)
            .prop_map(|(k, s, y, m, d)| SortKey::new(k, s, y, m, d))
    }

    proptest! {
        #[test]
        fn order_is_antisymmetric(a in any_key(), b in any_key()) {
            prop_assert_eq!(a.cmp_order(&b), b.cmp_order(&a).reverse());
            prop_assert!(!(a.less(&b) && b.less(&a)));
        }

        #[test]
        fn order_equal_implies_group_equal(a in any_key(), b in any_key()) {
            if a.cmp_order(&b) == Ordering::Equal {
                prop_assert!(a.same_group(&b));
            }
        }

        #[test]
        fn groups_are_contiguous_after_sort(mut keys in proptest::collection::vec(any_key(), 0..60)) {
            keys.sort_by(|a, b| a.cmp_order(b));
            let mut seen = Vec::new();
            for w in keys.windows(2) {
                if !w[0].same_group(&w[1]) {
                    seen.push(w[0].group_key());
                    prop_assert!(!seen.contains(&w[1].group_key()));
                }
            }
        }
    }
}

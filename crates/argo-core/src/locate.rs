//! Find the variable holding time among a fixed list of candidate names.

use crate::dataset::Dataset;

/// Time variable names in priority order: Argo point data (`TIME`), Argo
/// profile files (`JULD`), then the generic CF lower-case name.
pub const DEFAULT_TIME_CANDIDATES: &[&str] = &["TIME", "JULD", "time"];

/// Return the first candidate that names a variable in `dataset`.
///
/// Matching is exact and case-sensitive. Variable types are never inspected.
pub fn locate_time_field<'a>(dataset: &Dataset, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .find(|name| dataset.has_variable(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{VarData, Variable};
    use proptest::prelude::*;

    fn with_vars(names: &[&str]) -> Dataset {
        let mut ds = Dataset::new();
        ds.add_dimension("N_POINTS", 1).unwrap();
        for name in names {
            ds.add_variable(Variable::new(*name, &["N_POINTS"], VarData::F64(vec![0.0])))
                .unwrap();
        }
        ds
    }

    #[test]
    fn test_first_candidate_wins() {
        let ds = with_vars(&["time", "JULD", "TIME"]);
        assert_eq!(locate_time_field(&ds, DEFAULT_TIME_CANDIDATES), Some("TIME"));
    }

    #[test]
    fn test_falls_through_to_later_candidate() {
        let ds = with_vars(&["PRES", "JULD"]);
        assert_eq!(locate_time_field(&ds, DEFAULT_TIME_CANDIDATES), Some("JULD"));
    }

    #[test]
    fn test_case_sensitive() {
        let ds = with_vars(&["Time", "juld"]);
        assert_eq!(locate_time_field(&ds, DEFAULT_TIME_CANDIDATES), None);
    }

    #[test]
    fn test_empty_dataset_not_found() {
        assert_eq!(locate_time_field(&Dataset::new(), DEFAULT_TIME_CANDIDATES), None);
    }

    #[test]
    fn test_empty_candidate_list() {
        let ds = with_vars(&["TIME"]);
        assert_eq!(locate_time_field(&ds, &[]), None);
    }

    const POOL: &[&str] = &["TIME", "JULD", "time", "PRES", "TEMP", "PSAL", "date"];

    proptest! {
        #[test]
        fn prop_returns_first_present_candidate(
            present in proptest::sample::subsequence(POOL, 0..POOL.len()),
            candidates in proptest::sample::subsequence(POOL, 0..POOL.len()).prop_shuffle(),
        ) {
            let ds = with_vars(&present);
            let expected = candidates.iter().copied().find(|c| present.contains(c));
            prop_assert_eq!(locate_time_field(&ds, &candidates), expected);
        }
    }
}

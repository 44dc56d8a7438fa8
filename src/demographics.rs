use crate::types::DemographicRecord;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    /// A referenced neighborhood has no demographic record. Surfaced
    /// instead of zeroed so missing data can't silently deflate the
    /// aggregate.
    #[error("no demographic record for {0:?}")]
    MissingRecord(String),
    #[error("cannot merge an empty set of neighborhoods")]
    NoNames,
}

/// Sums age and income tabulations bucket-by-bucket across the named
/// neighborhoods. The names form a set: a name listed more than once
/// contributes once. The bucket key set is the union across all
/// members, so a bucket present in any member is present in the result
/// (a bucket missing from some member contributes zero). Commutative
/// in the member order.
pub fn merge<'a, I>(
    names: I,
    records: &HashMap<String, DemographicRecord>,
) -> Result<DemographicRecord, MergeError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut members: Vec<&DemographicRecord> = Vec::new();
    for name in names {
        if !seen.insert(name) {
            continue;
        }
        let record = records
            .get(name)
            .ok_or_else(|| MergeError::MissingRecord(name.to_string()))?;
        members.push(record);
    }
    if members.is_empty() {
        return Err(MergeError::NoNames);
    }

    Ok(DemographicRecord {
        age: sum_buckets(members.iter().map(|r| &r.age)),
        income: sum_buckets(members.iter().map(|r| &r.income)),
    })
}

fn sum_buckets<'a, I>(tables: I) -> HashMap<String, u32>
where
    I: Iterator<Item = &'a HashMap<String, u32>> + Clone,
{
    let keys: BTreeSet<&str> = tables
        .clone()
        .flat_map(|t| t.keys().map(String::as_str))
        .collect();

    keys.into_iter()
        .map(|key| {
            let total = tables
                .clone()
                .map(|t| t.get(key).copied().unwrap_or(0))
                .sum();
            (key.to_string(), total)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(age: &[(&str, u32)], income: &[(&str, u32)]) -> DemographicRecord {
        DemographicRecord {
            age: age.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            income: income.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    fn records(entries: &[(&str, DemographicRecord)]) -> HashMap<String, DemographicRecord> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn merging_a_singleton_is_identity() {
        let r = record(
            &[("Under 5", 10), ("Over 65", 4)],
            &[("Less than $50,000", 7)],
        );
        let all = records(&[("X", r.clone())]);
        assert_eq!(merge(["X"], &all).unwrap(), r);
    }

    #[test]
    fn merge_of_disjoint_sets_equals_bucketwise_sum_of_merges() {
        let all = records(&[
            ("A", record(&[("Over 65", 1)], &[("low", 2)])),
            ("B", record(&[("Over 65", 3)], &[("low", 4)])),
            ("C", record(&[("Over 65", 5)], &[("low", 6), ("high", 1)])),
        ]);

        let m_ab = merge(["A", "B"], &all).unwrap();
        let m_c = merge(["C"], &all).unwrap();
        let m_all = merge(["A", "B", "C"], &all).unwrap();

        assert_eq!(
            m_all.age["Over 65"],
            m_ab.age["Over 65"] + m_c.age["Over 65"]
        );
        assert_eq!(m_all.income["low"], m_ab.income["low"] + m_c.income["low"]);
        assert_eq!(m_all.income["high"], 1);
    }

    #[test]
    fn member_order_does_not_change_the_result() {
        let all = records(&[
            ("A", record(&[("Over 65", 2)], &[])),
            ("B", record(&[("Over 65", 9), ("Under 5", 1)], &[])),
        ]);
        assert_eq!(merge(["A", "B"], &all), merge(["B", "A"], &all));
    }

    #[test]
    fn buckets_only_in_later_members_are_kept() {
        // The first member lacks "20 to 34"; the union-of-keys rule
        // must still carry it through.
        let all = records(&[
            ("First", record(&[("Over 65", 2)], &[])),
            ("Second", record(&[("20 to 34", 8)], &[])),
        ]);
        let merged = merge(["First", "Second"], &all).unwrap();
        assert_eq!(merged.age["20 to 34"], 8);
        assert_eq!(merged.age["Over 65"], 2);
    }

    #[test]
    fn repeated_names_contribute_once() {
        let all = records(&[("A", record(&[("Over 65", 10)], &[("low", 5)]))]);
        let merged = merge(["A", "A"], &all).unwrap();
        assert_eq!(merged.age["Over 65"], 10);
        assert_eq!(merged.income["low"], 5);
        assert_eq!(merge(["A", "A"], &all), merge(["A"], &all));
    }

    #[test]
    fn missing_record_is_an_error() {
        let all = records(&[]);
        assert_eq!(
            merge(["X"], &all),
            Err(MergeError::MissingRecord("X".to_string()))
        );
    }

    #[test]
    fn empty_name_set_is_an_error() {
        let all = records(&[("A", record(&[], &[]))]);
        assert_eq!(merge(std::iter::empty::<&str>(), &all), Err(MergeError::NoNames));
    }
}

use std::collections::HashMap;

use log::debug;

use crate::config::UniversityRecord;

/// Collects records and resolves duplicated (name, year) keys.
///
/// The natural key of a record is the (name, year) pair. When the same key
/// is added twice, the record added last wins, but it keeps the position of
/// the first occurrence so the category order of downstream charts stays
/// stable.
///
/// ```rust
/// use mir_shaping::builder::RecordSetBuilder;
/// use mir_shaping::UniversityRecord;
///
/// let mut builder = RecordSetBuilder::new();
/// builder.add_record(UniversityRecord {
///     name: "Universidad Autónoma".to_string(),
///     abbreviation: "UAM".to_string(),
///     year: 2021,
///     admitted: 120,
///     presented: 100,
///     places_awarded: 90,
///     pct_presented_over_admitted: 83.33,
///     pct_places_over_presented: 90.0,
///     pct_places_over_passed: 90.0,
///     without_place_absolute: 10.0,
///     rank: 1,
/// });
/// let records = builder.build();
/// assert_eq!(records.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RecordSetBuilder {
    records: Vec<UniversityRecord>,
    positions: HashMap<(String, i32), usize>,
}

impl RecordSetBuilder {
    pub fn new() -> RecordSetBuilder {
        RecordSetBuilder::default()
    }

    /// Adds a record, replacing in place any earlier record with the same
    /// (name, year) key.
    pub fn add_record(&mut self, record: UniversityRecord) {
        let key = (record.name.clone(), record.year);
        match self.positions.get(&key) {
            Some(&pos) => {
                debug!(
                    "add_record: replacing earlier record for {:?} year {:?}",
                    record.name, record.year
                );
                self.records[pos] = record;
            }
            None => {
                self.positions.insert(key, self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn build(self) -> Vec<UniversityRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, year: i32, admitted: u32) -> UniversityRecord {
        UniversityRecord {
            name: name.to_string(),
            abbreviation: name.to_string(),
            year,
            admitted,
            presented: 0,
            places_awarded: 0,
            pct_presented_over_admitted: 0.0,
            pct_places_over_presented: 0.0,
            pct_places_over_passed: 0.0,
            without_place_absolute: 0.0,
            rank: 1,
        }
    }

    #[test]
    fn last_record_wins_at_first_position() {
        let mut builder = RecordSetBuilder::new();
        builder.add_record(rec("A", 2021, 10));
        builder.add_record(rec("B", 2021, 20));
        builder.add_record(rec("A", 2021, 30));
        let records = builder.build();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "A");
        assert_eq!(records[0].admitted, 30);
        assert_eq!(records[1].name, "B");
    }

    #[test]
    fn same_name_different_years_are_distinct() {
        let mut builder = RecordSetBuilder::new();
        builder.add_record(rec("A", 2020, 10));
        builder.add_record(rec("A", 2021, 20));
        assert_eq!(builder.len(), 2);
    }
}

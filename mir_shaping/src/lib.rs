mod config;
pub mod builder;
pub mod manual;

use log::{debug, info};

use std::collections::HashMap;

pub use crate::config::*;

// **** Axis scaling ****

/// Derives a tight but safe axis domain for a set of percentage values.
///
/// An empty input yields the full `(0, 100)` range. When any value dips
/// below 50, the full range is kept so that low values retain their context.
/// Otherwise the lower bound sits 10 points under the minimum, snapped down
/// to a multiple of 5 and clamped at 0. The upper bound is always 100.
pub fn percentage_domain(values: &[f64]) -> (f64, f64) {
    let min_val = values.iter().fold(f64::INFINITY, |acc, v| acc.min(*v));
    if !min_val.is_finite() || min_val < 50.0 {
        return (0.0, 100.0);
    }
    let snapped = ((min_val - 10.0) / 5.0).floor() * 5.0;
    (snapped.max(0.0), 100.0)
}

fn fixed_percentage_domain(values: &[f64]) -> AxisDomain {
    let (min, max) = percentage_domain(values);
    AxisDomain::Fixed { min, max }
}

// **** Comparison shaping ****

/// Shapes a single-year slice of records into the parallel series consumed
/// by the comparison charts.
///
/// All records are expected to belong to the same year, with one record per
/// university. The input order is preserved as the category order of every
/// output series. No validation is performed: inconsistent upstream counts
/// flow through (the without-place count may come out negative) rather than
/// failing.
pub fn shape_comparison(records: &[UniversityRecord], palette: &Palette) -> ComparisonView {
    info!("shape_comparison: processing {:?} records", records.len());

    let absolute: Vec<AbsoluteEntry> = records
        .iter()
        .map(|r| AbsoluteEntry {
            key: row_key(r),
            admitted: r.admitted,
            presented: r.presented,
            places_awarded: r.places_awarded,
        })
        .collect();

    let ranking: Vec<RankingEntry> = records
        .iter()
        .enumerate()
        .map(|(idx, r)| RankingEntry {
            key: row_key(r),
            color_slot: palette.slot(idx),
        })
        .collect();

    let presented_over_admitted =
        percentage_series(records, |r| r.pct_presented_over_admitted);
    let places_over_presented = percentage_series(records, |r| r.pct_places_over_presented);
    let places_over_passed = percentage_series(records, |r| r.pct_places_over_passed);

    // The one ratio this shaper derives itself. All the other percentages
    // arrive precomputed from the loading stage.
    let without_values: Vec<WithoutPlaceEntry> = records
        .iter()
        .map(|r| {
            let absolute = r.presented as i64 - r.places_awarded as i64;
            // A ratio over an empty cohort is defined as zero.
            let percent = if r.presented > 0 {
                absolute as f64 / r.presented as f64 * 100.0
            } else {
                0.0
            };
            WithoutPlaceEntry {
                key: row_key(r),
                absolute,
                percent,
            }
        })
        .collect();
    let percents: Vec<f64> = without_values.iter().map(|e| e.percent).collect();
    let without_place = WithoutPlaceSeries {
        values: without_values,
        percent_domain: fixed_percentage_domain(&percents),
    };

    ComparisonView {
        absolute,
        ranking,
        presented_over_admitted,
        places_over_presented,
        places_over_passed,
        without_place,
    }
}

fn row_key(r: &UniversityRecord) -> RowKey {
    RowKey {
        abbreviation: r.abbreviation.clone(),
        full_name: r.name.clone(),
        rank: r.rank,
    }
}

fn percentage_series<F>(records: &[UniversityRecord], value: F) -> PercentageSeries
where
    F: Fn(&UniversityRecord) -> f64,
{
    let raw: Vec<f64> = records.iter().map(&value).collect();
    let values: Vec<PercentageEntry> = records
        .iter()
        .zip(raw.iter())
        .map(|(r, v)| PercentageEntry {
            key: row_key(r),
            value: *v,
        })
        .collect();
    PercentageSeries {
        values,
        domain: fixed_percentage_domain(&raw),
    }
}

// **** Evolution shaping ****

/// Pivots a multi-year, multi-university slice into one time series per
/// requested metric, aligned on a shared year axis.
///
/// Years before the first year in which any university has a record are
/// dropped from the axis, so trend charts do not start with an empty prefix.
/// A missing (university, year) pair yields an empty cell rather than a
/// zero. For a duplicated (name, year) pair the record appearing last in
/// the input wins.
///
/// Degenerate inputs (no records, or an empty `all_years`) produce charts
/// with empty rows; this is the correct output, not an error.
pub fn shape_evolution(
    records: &[UniversityRecord],
    metrics: &[MetricDescriptor],
    all_years: &[i32],
    palette: &Palette,
) -> Vec<MetricChart> {
    info!(
        "shape_evolution: processing {:?} records over {:?} metrics",
        records.len(),
        metrics.len()
    );

    let series = university_series(records, palette);

    // The minimum over all records equals the minimum of the per-university
    // first years.
    let first_year = records.iter().map(|r| r.year).min();

    let mut relevant_years: Vec<i32> = match first_year {
        Some(y0) => all_years.iter().cloned().filter(|y| *y >= y0).collect(),
        None => Vec::new(),
    };
    relevant_years.sort_unstable();
    debug!(
        "shape_evolution: first_year: {:?} relevant_years: {:?}",
        first_year, relevant_years
    );

    // Long-to-wide lookup. Later records overwrite earlier ones for the
    // same (name, year) pair.
    let index: HashMap<(&str, i32), &UniversityRecord> = records
        .iter()
        .map(|r| ((r.name.as_str(), r.year), r))
        .collect();

    metrics
        .iter()
        .map(|metric| {
            let rows: Vec<YearRow> = relevant_years
                .iter()
                .map(|&year| {
                    let cells: Vec<DataPoint> = series
                        .iter()
                        .map(|s| match index.get(&(s.name.as_str(), year)) {
                            Some(r) => DataPoint {
                                value: Some(r.metric(metric.key)),
                                rank: Some(r.rank),
                            },
                            None => DataPoint {
                                value: None,
                                rank: None,
                            },
                        })
                        .collect();
                    YearRow { year, cells }
                })
                .collect();

            let domain = if metric.is_percentage {
                // Zero and negative values are plotted but excluded from the
                // domain calculation.
                let positive: Vec<f64> = match first_year {
                    Some(y0) => records
                        .iter()
                        .filter(|r| r.year >= y0)
                        .map(|r| r.metric(metric.key))
                        .filter(|v| *v > 0.0)
                        .collect(),
                    None => Vec::new(),
                };
                fixed_percentage_domain(&positive)
            } else {
                AxisDomain::Auto
            };

            let has_data = rows
                .iter()
                .any(|row| row.cells.iter().any(|c| c.value.is_some()));

            MetricChart {
                metric: metric.clone(),
                series: series.clone(),
                rows,
                domain,
                has_data,
            }
        })
        .collect()
}

// The order of first appearance establishes the series and color-slot
// order. The abbreviation of a university is the first one seen for its
// name.
fn university_series(records: &[UniversityRecord], palette: &Palette) -> Vec<SeriesId> {
    let mut series: Vec<SeriesId> = Vec::new();
    for r in records.iter() {
        if !series.iter().any(|s| s.name == r.name) {
            series.push(SeriesId {
                name: r.name.clone(),
                abbreviation: r.abbreviation.clone(),
                color_slot: palette.slot(series.len()),
            });
        }
    }
    debug!("university_series: {:?}", series);
    series
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(num: u32, den: u32) -> f64 {
        if den > 0 {
            num as f64 / den as f64 * 100.0
        } else {
            0.0
        }
    }

    fn rec(
        name: &str,
        abbrev: &str,
        year: i32,
        admitted: u32,
        presented: u32,
        places: u32,
        rank: u32,
    ) -> UniversityRecord {
        UniversityRecord {
            name: name.to_string(),
            abbreviation: abbrev.to_string(),
            year,
            admitted,
            presented,
            places_awarded: places,
            pct_presented_over_admitted: pct(presented, admitted),
            pct_places_over_presented: pct(places, presented),
            pct_places_over_passed: pct(places, presented),
            without_place_absolute: presented as f64 - places as f64,
            rank,
        }
    }

    fn percentage_metric() -> MetricDescriptor {
        MetricDescriptor {
            key: MetricKey::PlacesOverPresented,
            label: "% Plazas / Presentados".to_string(),
            is_percentage: true,
        }
    }

    #[test]
    fn domain_empty_input_is_full_range() {
        assert_eq!(percentage_domain(&[]), (0.0, 100.0));
    }

    #[test]
    fn domain_low_minimum_keeps_full_range() {
        assert_eq!(percentage_domain(&[49.9, 80.0, 95.0]), (0.0, 100.0));
        assert_eq!(percentage_domain(&[10.0]), (0.0, 100.0));
    }

    #[test]
    fn domain_high_minimum_zooms_in() {
        // min 92 -> floor(82 / 5) * 5 = 80
        assert_eq!(percentage_domain(&[92.0, 95.0, 99.0]), (80.0, 100.0));
        // min exactly 50 -> floor(40 / 5) * 5 = 40
        assert_eq!(percentage_domain(&[50.0, 70.0]), (40.0, 100.0));
        // snapping down to the previous multiple of 5
        assert_eq!(percentage_domain(&[83.0]), (70.0, 100.0));
    }

    #[test]
    fn domain_lower_bound_properties() {
        for min in [50.0, 55.0, 62.5, 77.0, 88.8, 100.0] {
            let (lo, hi) = percentage_domain(&[min, 100.0]);
            assert!(lo <= min - 10.0, "min {}: lo {}", min, lo);
            assert!(lo >= 0.0);
            assert_eq!(lo % 5.0, 0.0);
            assert_eq!(hi, 100.0);
        }
    }

    #[test]
    fn comparison_preserves_input_order() {
        let records = vec![
            rec("Universidad B", "UB", 2021, 200, 180, 120, 2),
            rec("Universidad A", "UA", 2021, 150, 140, 100, 1),
            rec("Universidad C", "UC", 2021, 90, 80, 40, 3),
        ];
        let view = shape_comparison(&records, &Palette::default());
        assert_eq!(view.absolute.len(), records.len());
        for (i, r) in records.iter().enumerate() {
            assert_eq!(view.absolute[i].key.abbreviation, r.abbreviation);
            assert_eq!(view.absolute[i].key.full_name, r.name);
            assert_eq!(view.absolute[i].key.rank, r.rank);
            assert_eq!(view.ranking[i].key.abbreviation, r.abbreviation);
            assert_eq!(
                view.presented_over_admitted.values[i].key.abbreviation,
                r.abbreviation
            );
            assert_eq!(view.without_place.values[i].key.abbreviation, r.abbreviation);
        }
    }

    #[test]
    fn comparison_color_slots_cycle() {
        let records: Vec<UniversityRecord> = (0..7)
            .map(|i| rec(&format!("U{}", i), &format!("U{}", i), 2021, 10, 10, 5, i + 1))
            .collect();
        let view = shape_comparison(&records, &Palette::default());
        let slots: Vec<usize> = view.ranking.iter().map(|e| e.color_slot).collect();
        assert_eq!(slots, vec![0, 1, 2, 3, 4, 0, 1]);
    }

    #[test]
    fn comparison_without_place_end_to_end() {
        let records = vec![
            rec("A", "A", 2021, 120, 100, 90, 1),
            rec("B", "B", 2021, 60, 50, 10, 2),
        ];
        let view = shape_comparison(&records, &Palette::default());
        let wp = &view.without_place;
        assert_eq!(wp.values[0].absolute, 10);
        assert_eq!(wp.values[0].percent, 10.0);
        assert_eq!(wp.values[1].absolute, 40);
        assert_eq!(wp.values[1].percent, 80.0);
        // values [10, 80]: min below 50 keeps the full range
        assert_eq!(
            wp.percent_domain,
            AxisDomain::Fixed {
                min: 0.0,
                max: 100.0
            }
        );
    }

    #[test]
    fn comparison_without_place_zero_presented() {
        let records = vec![rec("A", "A", 2021, 10, 0, 0, 1)];
        let view = shape_comparison(&records, &Palette::default());
        assert_eq!(view.without_place.values[0].absolute, 0);
        assert_eq!(view.without_place.values[0].percent, 0.0);

        // The percent stays 0 even when places were awarded to nobody
        // presented; only the absolute count goes negative.
        let records = vec![rec("B", "B", 2021, 10, 0, 40, 1)];
        let view = shape_comparison(&records, &Palette::default());
        assert_eq!(view.without_place.values[0].absolute, -40);
        assert_eq!(view.without_place.values[0].percent, 0.0);
    }

    #[test]
    fn comparison_inconsistent_counts_flow_through() {
        // More places than presented: negative, not clamped, no panic.
        let records = vec![rec("A", "A", 2021, 50, 40, 60, 1)];
        let view = shape_comparison(&records, &Palette::default());
        assert_eq!(view.without_place.values[0].absolute, -20);
        assert_eq!(view.without_place.values[0].percent, -50.0);
    }

    #[test]
    fn comparison_percentage_domains_are_independent() {
        let mut a = rec("A", "A", 2021, 100, 95, 90, 1);
        a.pct_presented_over_admitted = 95.0;
        a.pct_places_over_presented = 40.0;
        let mut b = rec("B", "B", 2021, 100, 92, 80, 2);
        b.pct_presented_over_admitted = 92.0;
        b.pct_places_over_presented = 30.0;
        let view = shape_comparison(&[a, b], &Palette::default());
        assert_eq!(
            view.presented_over_admitted.domain,
            AxisDomain::Fixed {
                min: 80.0,
                max: 100.0
            }
        );
        assert_eq!(
            view.places_over_presented.domain,
            AxisDomain::Fixed {
                min: 0.0,
                max: 100.0
            }
        );
    }

    #[test]
    fn evolution_missing_year_yields_empty_cell() {
        let records = vec![
            rec("A", "A", 2021, 100, 90, 80, 1),
            rec("A", "A", 2022, 100, 95, 85, 1),
            rec("B", "B", 2022, 100, 80, 60, 2),
        ];
        let charts = shape_evolution(
            &records,
            &[percentage_metric()],
            &[2021, 2022],
            &Palette::default(),
        );
        let chart = &charts[0];
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.rows.len(), 2);
        // B has no 2021 record: the cell exists and is explicitly empty.
        let row_2021 = &chart.rows[0];
        assert_eq!(row_2021.year, 2021);
        assert!(row_2021.cells[0].value.is_some());
        assert_eq!(row_2021.cells[1].value, None);
        assert_eq!(row_2021.cells[1].rank, None);
        assert!(chart.has_data);
    }

    #[test]
    fn evolution_relevant_years_drop_empty_prefix() {
        let records = vec![
            rec("A", "A", 2018, 100, 90, 80, 1),
            rec("B", "B", 2020, 100, 80, 60, 2),
        ];
        let all_years: Vec<i32> = (2015..=2023).collect();
        let charts = shape_evolution(
            &records,
            &[percentage_metric()],
            &all_years,
            &Palette::default(),
        );
        let years: Vec<i32> = charts[0].rows.iter().map(|r| r.year).collect();
        assert_eq!(years, (2018..=2023).collect::<Vec<i32>>());
    }

    #[test]
    fn evolution_years_are_ascending() {
        let records = vec![rec("A", "A", 2019, 100, 90, 80, 1)];
        let charts = shape_evolution(
            &records,
            &[percentage_metric()],
            &[2021, 2019, 2020],
            &Palette::default(),
        );
        let years: Vec<i32> = charts[0].rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2019, 2020, 2021]);
    }

    #[test]
    fn evolution_duplicate_record_last_wins() {
        let mut first = rec("A", "A", 2021, 100, 90, 80, 1);
        first.pct_places_over_presented = 10.0;
        let mut second = rec("A", "A", 2021, 100, 90, 80, 1);
        second.pct_places_over_presented = 20.0;
        let charts = shape_evolution(
            &[first, second],
            &[percentage_metric()],
            &[2021],
            &Palette::default(),
        );
        assert_eq!(charts[0].rows[0].cells[0].value, Some(20.0));
    }

    #[test]
    fn evolution_non_percentage_domain_is_auto() {
        let records = vec![rec("A", "A", 2021, 100, 90, 80, 1)];
        let metrics = vec![
            MetricDescriptor {
                key: MetricKey::Admitted,
                label: "Admitidos".to_string(),
                is_percentage: false,
            },
            MetricDescriptor {
                key: MetricKey::Rank,
                label: "Ranking".to_string(),
                is_percentage: false,
            },
        ];
        let charts = shape_evolution(&records, &metrics, &[2021], &Palette::default());
        assert_eq!(charts[0].domain, AxisDomain::Auto);
        assert_eq!(charts[1].domain, AxisDomain::Auto);
    }

    #[test]
    fn evolution_domain_excludes_non_positive_values() {
        let mut a = rec("A", "A", 2021, 100, 90, 80, 1);
        a.pct_places_over_presented = 0.0;
        let mut b = rec("B", "B", 2021, 100, 90, 80, 2);
        b.pct_places_over_presented = 90.0;
        let charts = shape_evolution(
            &[a, b],
            &[percentage_metric()],
            &[2021],
            &Palette::default(),
        );
        // The zero is plotted but does not widen the domain.
        assert_eq!(
            charts[0].domain,
            AxisDomain::Fixed {
                min: 80.0,
                max: 100.0
            }
        );
        assert_eq!(charts[0].rows[0].cells[0].value, Some(0.0));
    }

    #[test]
    fn evolution_degenerate_inputs_yield_empty_series() {
        let metrics = vec![percentage_metric()];
        let palette = Palette::default();

        let charts = shape_evolution(&[], &metrics, &[2020, 2021], &palette);
        assert_eq!(charts.len(), 1);
        assert!(charts[0].rows.is_empty());
        assert!(!charts[0].has_data);

        let records = vec![rec("A", "A", 2021, 100, 90, 80, 1)];
        let charts = shape_evolution(&records, &metrics, &[], &palette);
        assert!(charts[0].rows.is_empty());
        assert!(!charts[0].has_data);
    }

    #[test]
    fn evolution_first_seen_abbreviation_sticks() {
        let mut early = rec("A", "UAX", 2020, 100, 90, 80, 1);
        early.abbreviation = "UAX".to_string();
        let mut late = rec("A", "UAX2", 2021, 100, 90, 80, 1);
        late.abbreviation = "UAX2".to_string();
        let charts = shape_evolution(
            &[early, late],
            &[percentage_metric()],
            &[2020, 2021],
            &Palette::default(),
        );
        assert_eq!(charts[0].series[0].abbreviation, "UAX");
    }

    #[test]
    fn palette_rejects_empty_and_cycles() {
        assert_eq!(Palette::new(&[]), Err(ShapingErrors::EmptyPalette));
        let p = Palette::new(&["#111111".to_string(), "#222222".to_string()]).unwrap();
        assert_eq!(p.slot(0), 0);
        assert_eq!(p.slot(3), 1);
        assert_eq!(p.color(2), "#111111");
    }
}

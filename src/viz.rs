use log::{debug, info, warn};

use mir_shaping::builder::RecordSetBuilder;
use mir_shaping::*;
use snafu::{prelude::*, Snafu};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::viz::config_reader::*;

pub mod config_reader;
mod io_csv;
mod io_json;
mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum VizError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display(""))]
    EmptyExcel {},
    #[snafu(display("Unexpected cell content at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display(""))]
    ParsingJsonNumber {},
    #[snafu(display(""))]
    MissingParentDir {},
    #[snafu(display(""))]
    CsvOpen { source: csv::Error },
    #[snafu(display(""))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Missing column {column} at line {lineno}"))]
    MissingColumn { column: String, lineno: usize },
    #[snafu(display("Could not parse a number at line {lineno}"))]
    NumberParse { lineno: usize },
    #[snafu(display("Error writing the report to {path}"))]
    WritingReport {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type VizResult<T> = Result<T, VizError>;

/// A record as parsed by the readers.
/// This is before filling in the derived fields and the ranking.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ParsedRecord {
    pub name: String,
    pub abbreviation: Option<String>,
    pub year: i32,
    pub admitted: u32,
    pub presented: u32,
    pub places_awarded: u32,
    pub passed: Option<u32>,
    pub pct_presented_over_admitted: Option<f64>,
    pub pct_places_over_presented: Option<f64>,
    pub pct_places_over_passed: Option<f64>,
    pub without_place_absolute: Option<f64>,
    pub rank: Option<u32>,
}

/// Normalizes parsed records into complete records.
///
/// Missing abbreviations fall back to the full name. Missing percentages are
/// derived from the counts, with a zero denominator yielding 0. When any
/// record of a year arrives without a rank, the ranks of that whole year are
/// recomputed from the places-over-passed ratio, descending, starting at 1.
/// Duplicated (name, year) pairs keep the record parsed last.
pub fn validate_records(parsed: &[ParsedRecord]) -> Vec<UniversityRecord> {
    fn ratio(num: f64, den: f64) -> f64 {
        if den > 0.0 {
            num / den * 100.0
        } else {
            0.0
        }
    }

    let mut records: Vec<UniversityRecord> = parsed
        .iter()
        .map(|p| {
            let passed = p.passed.unwrap_or(p.presented);
            UniversityRecord {
                name: p.name.clone(),
                abbreviation: p.abbreviation.clone().unwrap_or_else(|| p.name.clone()),
                year: p.year,
                admitted: p.admitted,
                presented: p.presented,
                places_awarded: p.places_awarded,
                pct_presented_over_admitted: p
                    .pct_presented_over_admitted
                    .unwrap_or_else(|| ratio(p.presented as f64, p.admitted as f64)),
                pct_places_over_presented: p
                    .pct_places_over_presented
                    .unwrap_or_else(|| ratio(p.places_awarded as f64, p.presented as f64)),
                pct_places_over_passed: p
                    .pct_places_over_passed
                    .unwrap_or_else(|| ratio(p.places_awarded as f64, passed as f64)),
                without_place_absolute: p
                    .without_place_absolute
                    .unwrap_or_else(|| p.presented as f64 - p.places_awarded as f64),
                rank: p.rank.unwrap_or(0),
            }
        })
        .collect();

    // A year with a partial ranking would mix upstream ranks with derived
    // ones, so the whole year is recomputed.
    let unranked_years: HashSet<i32> = parsed
        .iter()
        .filter(|p| p.rank.is_none())
        .map(|p| p.year)
        .collect();
    for year in unranked_years {
        let mut idxs: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.year == year)
            .map(|(i, _)| i)
            .collect();
        idxs.sort_by(|&a, &b| {
            records[b]
                .pct_places_over_passed
                .partial_cmp(&records[a].pct_places_over_passed)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        debug!("validate_records: derived ranking for year {:?}: {:?}", year, idxs);
        for (pos, &i) in idxs.iter().enumerate() {
            records[i].rank = (pos + 1) as u32;
        }
    }

    let mut builder = RecordSetBuilder::new();
    for r in records {
        builder.add_record(r);
    }
    let records = builder.build();

    // Colliding abbreviations inside one year make the pivot columns of the
    // evolution charts ambiguous.
    let mut seen: HashSet<(i32, String)> = HashSet::new();
    for r in records.iter() {
        if !seen.insert((r.year, r.abbreviation.clone())) {
            warn!(
                "validate_records: duplicate abbreviation {:?} in year {:?}",
                r.abbreviation, r.year
            );
        }
    }

    records
}

fn read_records_data(root_path: String, cfs: &FileSource) -> VizResult<Vec<ParsedRecord>> {
    let p: PathBuf = [root_path, cfs.file_path.clone()].iter().collect();
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read record file {:?}", p2);
    match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_records(p2, cfs),
        "json" => io_json::read_json_records(p2, cfs),
        "xlsx" => io_xlsx::read_xlsx_records(p2, cfs),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

// **** Report assembly ****

fn axis_domain_js(domain: &AxisDomain) -> JSValue {
    match domain {
        AxisDomain::Auto => json!(["auto", "auto"]),
        AxisDomain::Fixed { min, max } => json!([min, max]),
    }
}

fn row_key_js(key: &RowKey) -> JSMap<String, JSValue> {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    m.insert("name".to_string(), json!(key.abbreviation));
    m.insert("fullName".to_string(), json!(key.full_name));
    m.insert("rank".to_string(), json!(key.rank));
    m
}

fn percentage_series_js(series: &PercentageSeries) -> JSValue {
    let values: Vec<JSValue> = series
        .values
        .iter()
        .map(|e| {
            let mut m = row_key_js(&e.key);
            m.insert("value".to_string(), json!(e.value));
            JSValue::Object(m)
        })
        .collect();
    json!({"domain": axis_domain_js(&series.domain), "values": values})
}

fn comparison_to_json(view: &ComparisonView) -> JSValue {
    let absolute: Vec<JSValue> = view
        .absolute
        .iter()
        .map(|e| {
            let mut m = row_key_js(&e.key);
            m.insert("admitted".to_string(), json!(e.admitted));
            m.insert("presented".to_string(), json!(e.presented));
            m.insert("placesAwarded".to_string(), json!(e.places_awarded));
            JSValue::Object(m)
        })
        .collect();

    let ranking: Vec<JSValue> = view
        .ranking
        .iter()
        .map(|e| {
            let mut m = row_key_js(&e.key);
            m.insert("colorSlot".to_string(), json!(e.color_slot));
            JSValue::Object(m)
        })
        .collect();

    let without_values: Vec<JSValue> = view
        .without_place
        .values
        .iter()
        .map(|e| {
            let mut m = row_key_js(&e.key);
            m.insert("absolute".to_string(), json!(e.absolute));
            m.insert("percent".to_string(), json!(e.percent));
            JSValue::Object(m)
        })
        .collect();

    json!({
        "absolute": absolute,
        "ranking": ranking,
        "percentagePresentedOverAdmitted": percentage_series_js(&view.presented_over_admitted),
        "percentagePlacesOverPresented": percentage_series_js(&view.places_over_presented),
        "percentagePlacesOverPassed": percentage_series_js(&view.places_over_passed),
        "withoutPlace": {
            "domain": axis_domain_js(&view.without_place.percent_domain),
            "values": without_values,
        },
    })
}

fn evolution_to_json(charts: &[MetricChart]) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for chart in charts {
        let series: Vec<JSValue> = chart
            .series
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "abbreviation": s.abbreviation,
                    "colorSlot": s.color_slot,
                })
            })
            .collect();

        let mut rows: Vec<JSValue> = Vec::new();
        for row in chart.rows.iter() {
            let mut m: JSMap<String, JSValue> = JSMap::new();
            m.insert("year".to_string(), json!(row.year));
            for (s, cell) in chart.series.iter().zip(row.cells.iter()) {
                // A missing year stays an explicit null so line charts break
                // at the gap.
                let value = match cell.value {
                    Some(v) => json!(v),
                    None => JSValue::Null,
                };
                let rank = match cell.rank {
                    Some(r) => json!(r),
                    None => JSValue::Null,
                };
                m.insert(s.abbreviation.clone(), value);
                m.insert(format!("{}_rank", s.abbreviation), rank);
            }
            rows.push(JSValue::Object(m));
        }

        l.push(json!({
            "metric": {
                "key": metric_key_name(chart.metric.key),
                "label": chart.metric.label,
                "isPercentage": chart.metric.is_percentage,
            },
            "domain": axis_domain_js(&chart.domain),
            "hasData": chart.has_data,
            "series": series,
            "rows": rows,
        }));
    }
    l
}

// The condensed projection handed to the external text-generation step.
fn summary_projection(records: &[UniversityRecord]) -> Vec<JSValue> {
    records
        .iter()
        .map(|r| {
            json!({
                "universidad": r.abbreviation,
                "año": r.year,
                "admitidos": r.admitted,
                "presentados": r.presented,
                "plazas_adjudicadas": r.places_awarded,
                "plazas_/_presentados_%": format!("{:.2}", r.pct_places_over_presented),
                "alumnos_sin_plaza": r.without_place_absolute,
            })
        })
        .collect()
}

fn build_report_js(
    config: &VizConfig,
    comparison_year: i32,
    view: &ComparisonView,
    charts: &[MetricChart],
    comparison_records: &[UniversityRecord],
) -> JSValue {
    let c = OutputConfig {
        report: config.output_settings.report_name.clone(),
        comparison_year: Some(comparison_year),
    };
    json!({
        "config": c,
        "comparison": comparison_to_json(view),
        "evolution": evolution_to_json(charts),
        "summaryInput": summary_projection(comparison_records),
    })
}

pub fn run_report(args: &Args) -> VizResult<()> {
    let (mut config, root_path) = match &args.config {
        Some(config_path) => {
            let config_p = Path::new(config_path.as_str());
            let config_str = fs::read_to_string(config_path.clone()).context(OpeningJsonSnafu {
                path: config_path.clone(),
            })?;
            let config: VizConfig =
                serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
            let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
            (
                config,
                root_p.as_os_str().to_str().unwrap_or("").to_string(),
            )
        }
        None => match &args.input {
            Some(input) => (default_config(input, args)?, "".to_string()),
            None => whatever!("No configuration or input file provided"),
        },
    };
    info!("config: {:?}", config);

    if config.record_file_sources.is_empty() {
        whatever!("no record file sources detected");
    }

    if args.excel_worksheet_name.is_some() {
        for cfs in config.record_file_sources.iter_mut() {
            cfs.excel_worksheet_name = args.excel_worksheet_name.clone();
        }
    }

    let mut parsed: Vec<ParsedRecord> = Vec::new();
    for cfs in config.record_file_sources.iter() {
        let mut file_data = read_records_data(root_path.clone(), cfs)?;
        parsed.append(&mut file_data);
    }
    debug!("parsed records: {:?}", parsed);

    let records = validate_records(&parsed);
    if records.is_empty() {
        whatever!("no records found in the input sources");
    }

    let metrics = validate_metrics(&config.metrics)?;

    let palette = match &config.palette {
        Some(colors) => match Palette::new(colors) {
            Result::Ok(p) => p,
            Result::Err(e) => whatever!("Invalid palette: {}", e),
        },
        None => Palette::default(),
    };

    let all_years: Vec<i32> = match &config.years {
        Some(years) => years.clone(),
        None => {
            let mut years: Vec<i32> = records.iter().map(|r| r.year).collect();
            years.sort_unstable();
            years.dedup();
            years
        }
    };

    let comparison_year = match args
        .year
        .or(config.output_settings.comparison_year)
        .or_else(|| records.iter().map(|r| r.year).max())
    {
        Some(y) => y,
        None => whatever!("no comparison year could be determined"),
    };
    info!("comparison year: {:?}", comparison_year);

    let mut comparison_records: Vec<UniversityRecord> = records
        .iter()
        .filter(|r| r.year == comparison_year)
        .cloned()
        .collect();
    comparison_records.sort_by_key(|r| r.rank);

    let view = shape_comparison(&comparison_records, &palette);
    let charts = shape_evolution(&records, &metrics, &all_years, &palette);

    let report_js = build_report_js(&config, comparison_year, &view, &charts, &comparison_records);
    let pretty_js = serde_json::to_string_pretty(&report_js).context(ParsingJsonSnafu {})?;

    let out_path: Option<String> = match &args.out {
        Some(p) if p == "stdout" => None,
        Some(p) => Some(p.clone()),
        None => config.output_settings.output_directory.as_ref().map(|dir| {
            let p: PathBuf = [
                dir.clone(),
                format!("{}.json", config.output_settings.report_name),
            ]
            .iter()
            .collect();
            p.as_path().display().to_string()
        }),
    };
    match out_path {
        Some(path) => {
            info!("Writing the report to {:?}", path);
            fs::write(path.clone(), &pretty_js).context(WritingReportSnafu { path })?;
        }
        None => println!("report:{}", pretty_js),
    }

    // The reference report, if provided for comparison
    if let Some(reference_p) = &args.reference {
        let reference = read_summary(reference_p.clone())?;
        let pretty_reference =
            serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
        if pretty_reference != pretty_js {
            warn!("Found differences with the reference report");
            print_diff(pretty_reference.as_str(), pretty_js.as_ref(), "\n");
            whatever!("Difference detected between the generated report and the reference report")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(name: &str, year: i32, admitted: u32, presented: u32, places: u32) -> ParsedRecord {
        ParsedRecord {
            name: name.to_string(),
            year,
            admitted,
            presented,
            places_awarded: places,
            ..Default::default()
        }
    }

    #[test]
    fn config_parses_camel_case_fields() {
        let config_str = r##"{
            "outputSettings": {
                "reportName": "mir-2021",
                "comparisonYear": 2021
            },
            "recordFileSources": [
                {"provider": "csv", "filePath": "records.csv", "firstRecordRowIndex": "3"}
            ],
            "metrics": [
                {"key": "rank", "label": "Ranking"},
                {"key": "percentagePlacesOverPresented", "label": "% Plazas / Presentados"}
            ],
            "years": [2019, 2020, 2021],
            "palette": ["#111111", "#222222"]
        }"##;
        let config: VizConfig = serde_json::from_str(config_str).unwrap();
        assert_eq!(config.output_settings.report_name, "mir-2021");
        assert_eq!(config.output_settings.comparison_year, Some(2021));
        assert_eq!(config.record_file_sources[0].provider, "csv");
        assert_eq!(
            config.record_file_sources[0].first_record_row_index().unwrap(),
            3
        );
        assert_eq!(config.metrics.len(), 2);
        assert_eq!(config.years, Some(vec![2019, 2020, 2021]));
    }

    #[test]
    fn first_record_row_index_defaults_to_two() {
        let config_str = r#"{
            "outputSettings": {"reportName": "r"},
            "recordFileSources": [{"provider": "csv", "filePath": "records.csv"}],
            "metrics": []
        }"#;
        let config: VizConfig = serde_json::from_str(config_str).unwrap();
        assert_eq!(
            config.record_file_sources[0].first_record_row_index().unwrap(),
            2
        );
    }

    #[test]
    fn metrics_validation() {
        let metrics = validate_metrics(&default_metrics()).unwrap();
        assert_eq!(metrics.len(), 5);
        assert_eq!(metrics[0].key, MetricKey::Rank);
        assert!(!metrics[0].is_percentage);
        assert!(metrics[1].is_percentage);

        let bad = vec![MetricConfig {
            key: "presentedOverTheMoon".to_string(),
            label: "?".to_string(),
            is_percentage: None,
        }];
        assert!(validate_metrics(&bad).is_err());
    }

    #[test]
    fn validate_records_derives_missing_fields() {
        let records = validate_records(&[
            parsed("Universidad A", 2021, 120, 100, 90),
            parsed("Universidad B", 2021, 60, 50, 10),
        ]);
        let a = &records[0];
        assert_eq!(a.abbreviation, "Universidad A");
        assert_eq!(a.pct_presented_over_admitted, 100.0 / 120.0 * 100.0);
        assert_eq!(a.pct_places_over_presented, 90.0);
        assert_eq!(a.without_place_absolute, 10.0);
        // Derived ranking: descending places-over-passed ratio.
        assert_eq!(a.rank, 1);
        assert_eq!(records[1].rank, 2);
    }

    #[test]
    fn validate_records_zero_denominators() {
        let records = validate_records(&[parsed("A", 2021, 0, 0, 0)]);
        assert_eq!(records[0].pct_presented_over_admitted, 0.0);
        assert_eq!(records[0].pct_places_over_presented, 0.0);
        assert_eq!(records[0].pct_places_over_passed, 0.0);
    }

    #[test]
    fn validate_records_keeps_last_duplicate() {
        let records = validate_records(&[
            parsed("A", 2021, 100, 90, 80),
            parsed("A", 2021, 100, 95, 85),
        ]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].presented, 95);
    }

    #[test]
    fn validate_records_keeps_upstream_ranks() {
        let mut p1 = parsed("A", 2021, 100, 90, 50);
        p1.rank = Some(7);
        let mut p2 = parsed("B", 2021, 100, 90, 80);
        p2.rank = Some(9);
        let records = validate_records(&[p1, p2]);
        assert_eq!(records[0].rank, 7);
        assert_eq!(records[1].rank, 9);
    }

    #[test]
    fn evolution_rows_keep_explicit_nulls() {
        let records = validate_records(&[
            parsed("Universidad A", 2020, 100, 90, 80),
            parsed("Universidad A", 2021, 100, 95, 85),
            parsed("Universidad B", 2021, 100, 80, 60),
        ]);
        let metrics = validate_metrics(&default_metrics()).unwrap();
        let charts = shape_evolution(&records, &metrics, &[2020, 2021], &Palette::default());
        let js = evolution_to_json(&charts);
        let rows = js[0]["rows"].as_array().unwrap();
        assert_eq!(rows[0]["year"], json!(2020));
        assert!(rows[0]["Universidad A"].is_number());
        assert!(rows[0]["Universidad B"].is_null());
        assert!(rows[0]["Universidad B_rank"].is_null());
        assert!(rows[1]["Universidad B"].is_number());
    }

    #[test]
    fn summary_projection_fields() {
        let records = validate_records(&[parsed("Universidad A", 2021, 120, 100, 90)]);
        let js = summary_projection(&records);
        assert_eq!(js[0]["universidad"], json!("Universidad A"));
        assert_eq!(js[0]["año"], json!(2021));
        assert_eq!(js[0]["admitidos"], json!(120));
        assert_eq!(js[0]["presentados"], json!(100));
        assert_eq!(js[0]["plazas_adjudicadas"], json!(90));
        assert_eq!(js[0]["plazas_/_presentados_%"], json!("90.00"));
        assert_eq!(js[0]["alumnos_sin_plaza"], json!(10.0));
    }

    #[test]
    fn summary_projection_passes_through_upstream_without_place() {
        // An upstream withoutPlaceAbsolute wins over the counts, so the
        // summary agrees with the evolution chart for that metric.
        let mut p = parsed("Universidad A", 2021, 120, 100, 90);
        p.without_place_absolute = Some(5.0);
        let records = validate_records(&[p]);
        assert_eq!(records[0].without_place_absolute, 5.0);
        let js = summary_projection(&records);
        assert_eq!(js[0]["alumnos_sin_plaza"], json!(5.0));
    }

    #[test]
    fn axis_domains_serialize_as_pairs() {
        assert_eq!(axis_domain_js(&AxisDomain::Auto), json!(["auto", "auto"]));
        assert_eq!(
            axis_domain_js(&AxisDomain::Fixed {
                min: 70.0,
                max: 100.0
            }),
            json!([70.0, 100.0])
        );
    }
}

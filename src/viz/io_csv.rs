// Primitives for reading CSV record files.

use std::collections::HashMap;

use crate::viz::*;

pub fn read_csv_records(path: String, cfs: &FileSource) -> VizResult<Vec<ParsedRecord>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu {})?;
    let mut records = rdr.into_records();

    let header_row = match records.next() {
        Some(r) => r.context(CsvLineParseSnafu {})?,
        None => whatever!("The file contains no header row"),
    };
    let columns: HashMap<String, usize> = header_row
        .iter()
        .enumerate()
        .map(|(idx, s)| (s.trim().to_string(), idx))
        .collect();
    debug!("read_csv_records: columns: {:?}", columns);

    let first_row = cfs.first_record_row_index()?;
    // The index starts at 1 to respect most conventions in the excel world.
    // The header is row 1.
    for _ in 2..first_row {
        _ = records.next();
    }

    let mut res: Vec<ParsedRecord> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + first_row;
        let line = line_r.context(CsvLineParseSnafu {})?;
        debug!("read_csv_records: lineno: {:?} row: {:?}", lineno, line);

        let get = |name: &str| get_field(&columns, &line, name);

        let name = get("name")
            .context(MissingColumnSnafu {
                column: "name",
                lineno,
            })?
            .to_string();
        let year = parse_i32(
            get("year").context(MissingColumnSnafu {
                column: "year",
                lineno,
            })?,
            lineno,
        )?;
        let admitted = parse_u32(
            get("admitted").context(MissingColumnSnafu {
                column: "admitted",
                lineno,
            })?,
            lineno,
        )?;
        let presented = parse_u32(
            get("presented").context(MissingColumnSnafu {
                column: "presented",
                lineno,
            })?,
            lineno,
        )?;
        let places_awarded = parse_u32(
            get("placesAwarded").context(MissingColumnSnafu {
                column: "placesAwarded",
                lineno,
            })?,
            lineno,
        )?;

        res.push(ParsedRecord {
            name,
            abbreviation: get("abbreviation").map(|s| s.to_string()),
            year,
            admitted,
            presented,
            places_awarded,
            passed: get("passed").map(|s| parse_u32(s, lineno)).transpose()?,
            pct_presented_over_admitted: get("percentagePresentedOverAdmitted")
                .map(|s| parse_f64(s, lineno))
                .transpose()?,
            pct_places_over_presented: get("percentagePlacesOverPresented")
                .map(|s| parse_f64(s, lineno))
                .transpose()?,
            pct_places_over_passed: get("percentagePlacesOverPassed")
                .map(|s| parse_f64(s, lineno))
                .transpose()?,
            without_place_absolute: get("withoutPlaceAbsolute")
                .map(|s| parse_f64(s, lineno))
                .transpose()?,
            rank: get("rank").map(|s| parse_u32(s, lineno)).transpose()?,
        });
    }
    Ok(res)
}

fn get_field<'a>(
    columns: &HashMap<String, usize>,
    line: &'a csv::StringRecord,
    name: &str,
) -> Option<&'a str> {
    columns
        .get(name)
        .and_then(|&i| line.get(i))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

fn parse_u32(s: &str, lineno: usize) -> VizResult<u32> {
    s.parse::<u32>().ok().context(NumberParseSnafu { lineno })
}

fn parse_i32(s: &str, lineno: usize) -> VizResult<i32> {
    s.parse::<i32>().ok().context(NumberParseSnafu { lineno })
}

fn parse_f64(s: &str, lineno: usize) -> VizResult<f64> {
    s.parse::<f64>().ok().context(NumberParseSnafu { lineno })
}

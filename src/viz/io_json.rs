// Primitives for reading JSON record files.

use crate::viz::*;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct JsonRecord {
    name: String,
    abbreviation: Option<String>,
    year: i32,
    admitted: u32,
    presented: u32,
    #[serde(rename = "placesAwarded")]
    places_awarded: u32,
    passed: Option<u32>,
    #[serde(rename = "percentagePresentedOverAdmitted")]
    pct_presented_over_admitted: Option<f64>,
    #[serde(rename = "percentagePlacesOverPresented")]
    pct_places_over_presented: Option<f64>,
    #[serde(rename = "percentagePlacesOverPassed")]
    pct_places_over_passed: Option<f64>,
    #[serde(rename = "withoutPlaceAbsolute")]
    without_place_absolute: Option<f64>,
    rank: Option<u32>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct JsonRecordFile {
    records: Vec<JsonRecord>,
}

pub fn read_json_records(path: String, _cfs: &FileSource) -> VizResult<Vec<ParsedRecord>> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    // Both a top-level array and a {"records": [...]} wrapper are accepted.
    let records: Vec<JsonRecord> = match serde_json::from_str::<Vec<JsonRecord>>(&contents) {
        Result::Ok(rs) => rs,
        Result::Err(_) => {
            serde_json::from_str::<JsonRecordFile>(&contents)
                .context(ParsingJsonSnafu {})?
                .records
        }
    };
    debug!("read_json_records: {:?} records", records.len());

    Ok(records
        .into_iter()
        .map(|r| ParsedRecord {
            name: r.name,
            abbreviation: r.abbreviation,
            year: r.year,
            admitted: r.admitted,
            presented: r.presented,
            places_awarded: r.places_awarded,
            passed: r.passed,
            pct_presented_over_admitted: r.pct_presented_over_admitted,
            pct_places_over_presented: r.pct_places_over_presented,
            pct_places_over_passed: r.pct_places_over_passed,
            without_place_absolute: r.without_place_absolute,
            rank: r.rank,
        })
        .collect())
}

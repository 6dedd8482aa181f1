use crate::args::Args;
use crate::viz::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "reportName")]
    pub report_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "comparisonYear")]
    pub comparison_year: Option<i32>,
}

/// The configuration echoed back at the top of the generated report.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub report: String,
    #[serde(rename = "comparisonYear")]
    pub comparison_year: Option<i32>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstRecordRowIndex")]
    _first_record_row_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl FileSource {
    /// 1-based index of the first record row. The header is row 1, so
    /// records start at row 2 unless stated otherwise.
    pub fn first_record_row_index(&self) -> VizResult<usize> {
        match &self._first_record_row_index {
            None => Ok(2),
            x => read_js_int(x),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MetricConfig {
    pub key: String,
    pub label: String,
    #[serde(rename = "isPercentage")]
    pub is_percentage: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VizConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "recordFileSources")]
    pub record_file_sources: Vec<FileSource>,
    pub metrics: Vec<MetricConfig>,
    pub years: Option<Vec<i32>>,
    pub palette: Option<Vec<String>>,
}

pub fn read_summary(path: String) -> VizResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    debug!("read content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn read_js_int(x: &Option<JSValue>) -> VizResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        Some(JSValue::String(s)) => s.parse::<usize>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}

pub fn metric_key_from_name(name: &str) -> Option<MetricKey> {
    match name {
        "admitted" => Some(MetricKey::Admitted),
        "presented" => Some(MetricKey::Presented),
        "placesAwarded" => Some(MetricKey::PlacesAwarded),
        "percentagePresentedOverAdmitted" => Some(MetricKey::PresentedOverAdmitted),
        "percentagePlacesOverPresented" => Some(MetricKey::PlacesOverPresented),
        "percentagePlacesOverPassed" => Some(MetricKey::PlacesOverPassed),
        "withoutPlaceAbsolute" => Some(MetricKey::WithoutPlaceAbsolute),
        "rank" => Some(MetricKey::Rank),
        _ => None,
    }
}

pub fn metric_key_name(key: MetricKey) -> &'static str {
    match key {
        MetricKey::Admitted => "admitted",
        MetricKey::Presented => "presented",
        MetricKey::PlacesAwarded => "placesAwarded",
        MetricKey::PresentedOverAdmitted => "percentagePresentedOverAdmitted",
        MetricKey::PlacesOverPresented => "percentagePlacesOverPresented",
        MetricKey::PlacesOverPassed => "percentagePlacesOverPassed",
        MetricKey::WithoutPlaceAbsolute => "withoutPlaceAbsolute",
        MetricKey::Rank => "rank",
    }
}

pub fn validate_metrics(metric_configs: &[MetricConfig]) -> VizResult<Vec<MetricDescriptor>> {
    let mut res: Vec<MetricDescriptor> = Vec::new();
    for mc in metric_configs {
        let key = match metric_key_from_name(mc.key.as_str()) {
            Some(k) => k,
            None => whatever!("Unknown metric key {:?}", mc.key),
        };
        let is_percentage = mc.is_percentage.unwrap_or(matches!(
            key,
            MetricKey::PresentedOverAdmitted
                | MetricKey::PlacesOverPresented
                | MetricKey::PlacesOverPassed
        ));
        res.push(MetricDescriptor {
            key,
            label: mc.label.clone(),
            is_percentage,
        });
    }
    Ok(res)
}

/// The metric catalog used when no configuration file selects one.
pub fn default_metrics() -> Vec<MetricConfig> {
    fn m(key: &str, label: &str) -> MetricConfig {
        MetricConfig {
            key: key.to_string(),
            label: label.to_string(),
            is_percentage: None,
        }
    }
    vec![
        m("rank", "Ranking"),
        m("percentagePresentedOverAdmitted", "% Presentados / Admitidos"),
        m("percentagePlacesOverPresented", "% Plazas / Presentados"),
        m("percentagePlacesOverPassed", "% Plazas / Aprobados"),
        m("withoutPlaceAbsolute", "Alumnos sin plaza"),
    ]
}

/// Builds a configuration for the single-file mode, where only --input is
/// provided on the command line.
pub fn default_config(input: &str, args: &Args) -> VizResult<VizConfig> {
    let provider = match &args.input_type {
        Some(t) => t.clone(),
        None => match input.rsplit('.').next() {
            Some(ext) if ext == "csv" || ext == "json" || ext == "xlsx" => ext.to_string(),
            x => whatever!("Cannot deduce the input type from {:?}, pass --input-type", x),
        },
    };
    Ok(VizConfig {
        output_settings: OutputSettings {
            report_name: "mir-report".to_string(),
            output_directory: None,
            comparison_year: None,
        },
        record_file_sources: vec![FileSource {
            provider,
            file_path: input.to_string(),
            _first_record_row_index: None,
            excel_worksheet_name: args.excel_worksheet_name.clone(),
        }],
        metrics: default_metrics(),
        years: None,
        palette: None,
    })
}

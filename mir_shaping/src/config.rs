// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// One university's admission results for one exam year.
///
/// Records are produced by an upstream loading stage. The shaping functions
/// never mutate them, they only derive new view structures.
#[derive(PartialEq, Debug, Clone)]
pub struct UniversityRecord {
    /// Canonical full name. Identifies the university across years.
    pub name: String,
    /// Short display code. Not guaranteed unique across the whole catalog,
    /// but unique within one year's comparison set.
    pub abbreviation: String,
    pub year: i32,
    pub admitted: u32,
    pub presented: u32,
    pub places_awarded: u32,
    /// Percentage ratios precomputed by the loading stage. The shapers pass
    /// these through without recomputing them.
    pub pct_presented_over_admitted: f64,
    pub pct_places_over_presented: f64,
    pub pct_places_over_passed: f64,
    pub without_place_absolute: f64,
    /// Ranking of this university among its peers for this year, supplied
    /// upstream.
    pub rank: u32,
}

/// The numeric fields of a record that can be charted.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum MetricKey {
    Admitted,
    Presented,
    PlacesAwarded,
    PresentedOverAdmitted,
    PlacesOverPresented,
    PlacesOverPassed,
    WithoutPlaceAbsolute,
    Rank,
}

impl UniversityRecord {
    /// The value of the given metric for this record.
    pub fn metric(&self, key: MetricKey) -> f64 {
        match key {
            MetricKey::Admitted => self.admitted as f64,
            MetricKey::Presented => self.presented as f64,
            MetricKey::PlacesAwarded => self.places_awarded as f64,
            MetricKey::PresentedOverAdmitted => self.pct_presented_over_admitted,
            MetricKey::PlacesOverPresented => self.pct_places_over_presented,
            MetricKey::PlacesOverPassed => self.pct_places_over_passed,
            MetricKey::WithoutPlaceAbsolute => self.without_place_absolute,
            MetricKey::Rank => self.rank as f64,
        }
    }
}

/// A chartable metric, as selected by the consumer.
#[derive(PartialEq, Debug, Clone)]
pub struct MetricDescriptor {
    pub key: MetricKey,
    pub label: String,
    /// Selects the dynamic percentage axis domain. Non-percentage metrics
    /// always get an unconstrained domain.
    pub is_percentage: bool,
}

// ********* Configuration **********

/// The default chart colors (cyan, amber, lime, pink, violet).
pub const DEFAULT_COLORS: [&str; 5] = ["#06b6d4", "#f59e0b", "#84cc16", "#ec4899", "#8b5cf6"];

/// An ordered color palette with wraparound indexing.
///
/// Color assignment is a pure function of the series position, so the
/// university-to-color mapping stays stable across re-renders. Slots cycle
/// when there are more series than colors.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Palette {
    colors: Vec<String>,
}

impl Palette {
    pub fn new(colors: &[String]) -> Result<Palette, ShapingErrors> {
        if colors.is_empty() {
            return Err(ShapingErrors::EmptyPalette);
        }
        Ok(Palette {
            colors: colors.to_vec(),
        })
    }

    /// The color slot for the series at the given position.
    pub fn slot(&self, index: usize) -> usize {
        index % self.colors.len()
    }

    pub fn color(&self, index: usize) -> &str {
        &self.colors[self.slot(index)]
    }
}

impl Default for Palette {
    fn default() -> Palette {
        Palette {
            colors: DEFAULT_COLORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ******** Output data structures *********

/// The (min, max) range an axis is scaled to.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum AxisDomain {
    /// The charting surface picks the range from the plotted values.
    Auto,
    Fixed { min: f64, max: f64 },
}

/// Back-reference carried by every series row, for tooltips and legends.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RowKey {
    pub abbreviation: String,
    pub full_name: String,
    pub rank: u32,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AbsoluteEntry {
    pub key: RowKey,
    pub admitted: u32,
    pub presented: u32,
    pub places_awarded: u32,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RankingEntry {
    pub key: RowKey,
    pub color_slot: usize,
}

#[derive(PartialEq, Debug, Clone)]
pub struct PercentageEntry {
    pub key: RowKey,
    pub value: f64,
}

/// One percentage ratio across the comparison set, with its own axis domain.
#[derive(PartialEq, Debug, Clone)]
pub struct PercentageSeries {
    pub values: Vec<PercentageEntry>,
    pub domain: AxisDomain,
}

#[derive(PartialEq, Debug, Clone)]
pub struct WithoutPlaceEntry {
    pub key: RowKey,
    /// presented - places_awarded. Negative when the upstream counts are
    /// inconsistent; not clamped.
    pub absolute: i64,
    pub percent: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct WithoutPlaceSeries {
    pub values: Vec<WithoutPlaceEntry>,
    pub percent_domain: AxisDomain,
}

/// A single-year snapshot shaped into parallel chart-ready series.
///
/// All series share the category order of the input records.
#[derive(PartialEq, Debug, Clone)]
pub struct ComparisonView {
    pub absolute: Vec<AbsoluteEntry>,
    pub ranking: Vec<RankingEntry>,
    pub presented_over_admitted: PercentageSeries,
    pub places_over_presented: PercentageSeries,
    pub places_over_passed: PercentageSeries,
    pub without_place: WithoutPlaceSeries,
}

/// One university line in an evolution chart.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SeriesId {
    pub name: String,
    pub abbreviation: String,
    pub color_slot: usize,
}

/// One cell of a pivoted row. `value` is None when the university has no
/// record for the year, which breaks line continuity instead of
/// interpolating over the gap.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct DataPoint {
    pub value: Option<f64>,
    pub rank: Option<u32>,
}

/// One pivoted row: a year with one cell per university, in series order.
#[derive(PartialEq, Debug, Clone)]
pub struct YearRow {
    pub year: i32,
    pub cells: Vec<DataPoint>,
}

/// The pivoted time series for one metric.
#[derive(PartialEq, Debug, Clone)]
pub struct MetricChart {
    pub metric: MetricDescriptor,
    /// Universities in first-appearance order, with their color slots.
    pub series: Vec<SeriesId>,
    /// Years ascending.
    pub rows: Vec<YearRow>,
    pub domain: AxisDomain,
    /// False when every cell of every row is empty. Such a chart is still
    /// emitted; skipping it is a presentation decision left to the consumer.
    pub has_data: bool,
}

/// Errors raised when assembling the shaping inputs.
///
/// The shaping functions themselves are total and have no error path.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ShapingErrors {
    EmptyPalette,
}

impl Error for ShapingErrors {}

impl Display for ShapingErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapingErrors::EmptyPalette => write!(f, "the palette may not be empty"),
        }
    }
}

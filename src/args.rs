use clap::Parser;

/// This program shapes yearly university admission statistics into chart-ready JSON reports.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the report: input sources, metrics, years
    /// and output settings. Record file paths inside the configuration are resolved relative to it.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference report in JSON format. If provided, mirstats will check that the
    /// generated report matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the report will be written in JSON format to
    /// the given location. Setting this option overrides the output directory that may be
    /// specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) A single record file to shape without a configuration file. The
    /// default metric catalog is used in this mode.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default: deduced from the file extension) The type of the input: csv, json or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (exam year or empty) The year to use for the comparison charts. Defaults to the most
    /// recent year present in the records.
    #[clap(short, long, value_parser)]
    pub year: Option<i32>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet
    /// to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

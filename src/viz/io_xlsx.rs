// Primitives for reading Excel record files.

use calamine::{open_workbook, DataType, Reader, Xlsx};
use std::collections::HashMap;

use crate::viz::*;

pub fn read_xlsx_records(path: String, cfs: &FileSource) -> VizResult<Vec<ParsedRecord>> {
    let wrange = get_range(&path, cfs)?;

    let header = wrange.rows().next().context(EmptyExcelSnafu {})?;
    debug!("read_xlsx_records: header: {:?}", header);
    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .filter_map(|(idx, c)| match c {
            DataType::String(s) => Some((s.trim().to_string(), idx)),
            _ => None,
        })
        .collect();
    debug!("read_xlsx_records: columns: {:?}", columns);

    let first_row = cfs.first_record_row_index()?;
    let mut iter = wrange.rows();
    // The index starts at 1 to respect most conventions in the excel world.
    // The header is row 1.
    for _ in 1..first_row {
        iter.next();
    }

    let mut res: Vec<ParsedRecord> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = (idx + first_row) as u64;
        if row.iter().all(|c| matches!(c, DataType::Empty)) {
            continue;
        }
        debug!("read_xlsx_records: lineno: {:?} row: {:?}", lineno, row);

        let cell = |name: &str| get_cell(&columns, row, name);

        res.push(ParsedRecord {
            name: cell_string(cell("name"), lineno)?,
            abbreviation: cell_opt_string(cell("abbreviation"), lineno)?,
            year: cell_u32(cell("year"), lineno)? as i32,
            admitted: cell_u32(cell("admitted"), lineno)?,
            presented: cell_u32(cell("presented"), lineno)?,
            places_awarded: cell_u32(cell("placesAwarded"), lineno)?,
            passed: cell_opt_u32(cell("passed"), lineno)?,
            pct_presented_over_admitted: cell_opt_f64(
                cell("percentagePresentedOverAdmitted"),
                lineno,
            )?,
            pct_places_over_presented: cell_opt_f64(
                cell("percentagePlacesOverPresented"),
                lineno,
            )?,
            pct_places_over_passed: cell_opt_f64(cell("percentagePlacesOverPassed"), lineno)?,
            without_place_absolute: cell_opt_f64(cell("withoutPlaceAbsolute"), lineno)?,
            rank: cell_opt_u32(cell("rank"), lineno)?,
        });
    }
    Ok(res)
}

fn get_cell<'a>(
    columns: &HashMap<String, usize>,
    row: &'a [DataType],
    name: &str,
) -> Option<&'a DataType> {
    columns.get(name).and_then(|&i| row.get(i))
}

fn cell_string(cell: Option<&DataType>, lineno: u64) -> VizResult<String> {
    match cell {
        Some(DataType::String(s)) => Ok(s.trim().to_string()),
        x => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", x),
        }
        .fail(),
    }
}

fn cell_opt_string(cell: Option<&DataType>, _lineno: u64) -> VizResult<Option<String>> {
    match cell {
        Some(DataType::String(s)) if !s.trim().is_empty() => Ok(Some(s.trim().to_string())),
        _ => Ok(None),
    }
}

fn cell_u32(cell: Option<&DataType>, lineno: u64) -> VizResult<u32> {
    match cell {
        Some(DataType::Float(f)) => Ok(*f as u32),
        Some(DataType::Int(i)) => Ok(*i as u32),
        Some(DataType::String(s)) => {
            s.trim().parse::<u32>().ok().context(ExcelWrongCellTypeSnafu {
                lineno,
                content: s.clone(),
            })
        }
        x => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", x),
        }
        .fail(),
    }
}

fn cell_opt_u32(cell: Option<&DataType>, lineno: u64) -> VizResult<Option<u32>> {
    match cell {
        None | Some(DataType::Empty) => Ok(None),
        x => cell_u32(x, lineno).map(Some),
    }
}

fn cell_opt_f64(cell: Option<&DataType>, lineno: u64) -> VizResult<Option<f64>> {
    match cell {
        None | Some(DataType::Empty) => Ok(None),
        Some(DataType::Float(f)) => Ok(Some(*f)),
        Some(DataType::Int(i)) => Ok(Some(*i as f64)),
        Some(DataType::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .map(Some)
            .context(ExcelWrongCellTypeSnafu {
                lineno,
                content: s.clone(),
            }),
        x => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", x),
        }
        .fail(),
    }
}

fn get_range(path: &String, cfs: &FileSource) -> VizResult<calamine::Range<DataType>> {
    let worksheet_name_o = cfs.excel_worksheet_name.clone();
    debug!(
        "read_xlsx_records: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let p = path.clone();
    let mut workbook: Xlsx<_> =
        open_workbook(p).context(OpeningExcelSnafu { path: path.clone() })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path: path.clone() })?;

        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => whatever!("The workbook {:?} contains no worksheet", path),
            [(worksheet_name, wrange)] => {
                debug!(
                    "read_xlsx_records: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => {
                whatever!(
                    "The workbook {:?} contains several worksheets, pass --excel-worksheet-name",
                    path
                )
            }
        }
    }
}

//! Ifremer ERDDAP `ArgoFloats` table, requested as CSV.
//!
//! ERDDAP's CSV has one header row of column names, one row of units, then
//! the data. Every row is one measurement point, so the result has a single
//! `N_POINTS` dimension with one variable per column.

use anyhow::{bail, Context, Result};
use argo_core::{DataMode, Dataset, FetchRequest, VarData, Variable};
use reqwest::blocking::Client;

pub const POINT_DIM: &str = "N_POINTS";

const DATASET_ID: &str = "ArgoFloats";

/// Core variables, served in both modes.
const STANDARD_VARIABLES: &[&str] = &[
    "platform_number",
    "cycle_number",
    "direction",
    "data_mode",
    "time",
    "latitude",
    "longitude",
    "pres",
    "temp",
    "psal",
    "pres_adjusted",
    "temp_adjusted",
    "psal_adjusted",
];

/// Added on top of the core set in expert mode.
const EXPERT_EXTRAS: &[&str] = &[
    "config_mission_number",
    "time_qc",
    "position_qc",
    "pres_qc",
    "temp_qc",
    "psal_qc",
    "pres_adjusted_qc",
    "temp_adjusted_qc",
    "psal_adjusted_qc",
    "pres_adjusted_error",
    "temp_adjusted_error",
    "psal_adjusted_error",
];

pub fn variables_for(mode: DataMode) -> Vec<&'static str> {
    match mode {
        DataMode::Standard => STANDARD_VARIABLES.to_vec(),
        DataMode::Expert => STANDARD_VARIABLES
            .iter()
            .chain(EXPERT_EXTRAS)
            .copied()
            .collect(),
    }
}

/// Tabledap query for every point of one float, in time order.
pub fn query_url(base: &str, float_id: u64, mode: DataMode) -> String {
    format!(
        "{base}/tabledap/{DATASET_ID}.csv?{}&platform_number=%22{float_id}%22&orderBy(%22time,pres%22)",
        variables_for(mode).join(",")
    )
}

pub fn fetch(client: &Client, base: &str, request: &FetchRequest) -> Result<Dataset> {
    let url = query_url(base, request.float_id, request.mode);
    log::debug!("GET {url}");
    let body = client
        .get(&url)
        .send()
        .with_context(|| format!("requesting {url}"))?
        .error_for_status()
        .context("ERDDAP rejected the query")?
        .bytes()
        .context("reading ERDDAP response")?;
    log::debug!("ERDDAP returned {} bytes", body.len());
    parse_table(&body)
}

/// Turn an ERDDAP CSV body into a dataset.
///
/// Column names are upper-cased to match the profile-file convention
/// (`time` → `TIME`). A column whose every cell is a number, empty or `NaN`
/// becomes `F64` with `NaN` for gaps; any other column stays text. A
/// non-empty units cell becomes the variable's `units` attribute.
///
/// # Errors
///
/// Malformed CSV, ragged rows, or a body without the units row.
pub fn parse_table(body: &[u8]) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(body);
    let names: Vec<String> = reader
        .headers()
        .context("reading CSV header")?
        .iter()
        .map(|h| h.trim().to_uppercase())
        .collect();

    let mut records = reader.records();
    let units = match records.next() {
        Some(row) => row.context("reading units row")?,
        None => bail!("ERDDAP response has no units row"),
    };

    let mut columns: Vec<Vec<String>> = vec![Vec::new(); names.len()];
    for (row, record) in records.enumerate() {
        let record = record.with_context(|| format!("reading CSV data row {}", row + 1))?;
        for (column, cell) in columns.iter_mut().zip(record.iter()) {
            column.push(cell.to_string());
        }
    }
    let points = columns.first().map_or(0, Vec::len);

    let mut ds = Dataset::new();
    ds.add_dimension(POINT_DIM, points)?;
    for ((name, unit), cells) in names.iter().zip(units.iter()).zip(columns) {
        let mut variable = Variable::new(name.as_str(), &[POINT_DIM], infer_column(cells));
        let unit = unit.trim();
        if !unit.is_empty() {
            variable = variable.with_attr("units", unit);
        }
        ds.add_variable(variable)?;
    }
    Ok(ds)
}

fn infer_column(cells: Vec<String>) -> VarData {
    let numeric: Option<Vec<f64>> = cells
        .iter()
        .map(|cell| {
            let cell = cell.trim();
            if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
                Some(f64::NAN)
            } else {
                cell.parse().ok()
            }
        })
        .collect();
    match numeric {
        Some(values) => VarData::F64(values),
        None => VarData::Text(cells),
    }
}

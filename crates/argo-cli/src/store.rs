//! NetCDF reading and writing.

use std::path::Path;

use anyhow::{Context, Result};
use argo_core::{ArgoError, AttrValue, Dataset, DatasetSink, VarData, Variable};
use chrono::{TimeZone, Utc};
use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::AttributeValue;

/// Units written for decoded instants.
pub const INSTANT_UNITS: &str = "days since 1950-01-01 00:00:00 UTC";
/// Fill value for missing instants, matching the Argo `JULD` convention.
pub const INSTANT_FILL: f64 = 999_999.0;

/// Writes the dataset as a NetCDF-4 file, replacing any existing file.
/// The file only appears under its final name once fully written.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetcdfSink;

impl DatasetSink for NetcdfSink {
    fn save(&self, dataset: &Dataset, filename: &str) -> argo_core::error::Result<()> {
        write_netcdf(dataset, Path::new(filename)).map_err(|e| ArgoError::Persist {
            filename: filename.to_string(),
            message: format!("{e:#}"),
        })
    }
}

// ── Writing ─────────────────────────────────────────────────────────────────

pub fn write_netcdf(ds: &Dataset, path: &Path) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let staging = tempfile::Builder::new()
        .prefix(".argo_")
        .suffix(".nc")
        .tempfile_in(dir)
        .with_context(|| format!("creating a temporary file in {}", dir.display()))?
        .into_temp_path();

    // Dropped (and deleted) on any error below
    write_contents(ds, &staging)?;
    staging
        .persist(path)
        .with_context(|| format!("moving output into place at {}", path.display()))?;
    Ok(())
}

fn write_contents(ds: &Dataset, path: &Path) -> Result<()> {
    let mut file =
        netcdf::create(path).with_context(|| format!("creating {}", path.display()))?;

    // Zero-length dimensions are only representable as unlimited.
    for dim in ds.dims() {
        if dim.len == 0 {
            file.add_unlimited_dimension(&dim.name)
        } else {
            file.add_dimension(&dim.name, dim.len)
        }
        .with_context(|| format!("declaring dimension {}", dim.name))?;
    }

    for (key, value) in ds.attrs() {
        file.add_attribute(key, to_nc_attr(value))
            .with_context(|| format!("writing global attribute {key}"))?;
    }

    for variable in ds.variables() {
        let shape = ds.shape_of(&variable.dims)?;
        write_variable(&mut file, variable, &shape)
            .with_context(|| format!("writing variable {}", variable.name))?;
    }
    Ok(())
}

fn write_variable(
    file: &mut netcdf::FileMut,
    variable: &Variable,
    shape: &[usize],
) -> Result<()> {
    let dims: Vec<&str> = variable.dims.iter().map(String::as_str).collect();
    let fill = variable.attr("_FillValue").and_then(AttrValue::as_f64);
    let empty = variable.data.is_empty();

    let mut var = match &variable.data {
        VarData::F64(values) => {
            let mut var = file.add_variable::<f64>(&variable.name, &dims)?;
            if let Some(fill) = fill {
                var.set_fill_value(fill)?;
            }
            if !empty {
                var.put_values(values, ..)?;
            }
            var
        }
        VarData::F32(values) => {
            let mut var = file.add_variable::<f32>(&variable.name, &dims)?;
            if let Some(fill) = fill {
                var.set_fill_value(fill as f32)?;
            }
            if !empty {
                var.put_values(values, ..)?;
            }
            var
        }
        VarData::I32(values) => {
            let mut var = file.add_variable::<i32>(&variable.name, &dims)?;
            if let Some(fill) = fill {
                var.set_fill_value(fill as i32)?;
            }
            if !empty {
                var.put_values(values, ..)?;
            }
            var
        }
        VarData::I64(values) => {
            let mut var = file.add_variable::<i64>(&variable.name, &dims)?;
            if let Some(fill) = fill {
                var.set_fill_value(fill as i64)?;
            }
            if !empty {
                var.put_values(values, ..)?;
            }
            var
        }
        VarData::Instant(values) => {
            let mut var = file.add_variable::<f64>(&variable.name, &dims)?;
            var.set_fill_value(INSTANT_FILL)?;
            if !empty {
                let days: Vec<f64> = values.iter().map(|t| days_since_1950(*t)).collect();
                var.put_values(&days, ..)?;
            }
            var.put_attribute("units", INSTANT_UNITS)?;
            var
        }
        VarData::Text(values) => {
            let mut var = file.add_string_variable(&variable.name, &dims)?;
            for (flat, value) in values.iter().enumerate() {
                let index = unravel(flat, shape);
                var.put_string(value, index.as_slice())?;
            }
            var
        }
    };

    for (key, value) in &variable.attrs {
        if key == "_FillValue" {
            continue;
        }
        if key == "units" && matches!(variable.data, VarData::Instant(_)) {
            continue;
        }
        var.put_attribute(key, to_nc_attr(value))?;
    }
    Ok(())
}

/// Row-major multi-index of a flat position.
fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (slot, &len) in index.iter_mut().zip(shape).rev() {
        if len > 0 {
            *slot = flat % len;
            flat /= len;
        }
    }
    index
}

fn days_since_1950(t: Option<argo_core::Instant>) -> f64 {
    let epoch = Utc.with_ymd_and_hms(1950, 1, 1, 0, 0, 0).single();
    match (t, epoch) {
        (Some(t), Some(epoch)) => (t - epoch)
            .num_microseconds()
            .map_or(INSTANT_FILL, |us| us as f64 / 86_400_000_000.0),
        _ => INSTANT_FILL,
    }
}

fn to_nc_attr(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::Text(s) => AttributeValue::Str(s.clone()),
        AttrValue::Float(v) => AttributeValue::Double(*v),
        AttrValue::Int(i) => i32::try_from(*i)
            .map(AttributeValue::Int)
            .unwrap_or(AttributeValue::Longlong(*i)),
        AttrValue::Floats(v) => AttributeValue::Doubles(v.clone()),
    }
}

// ── Reading ─────────────────────────────────────────────────────────────────

/// Load dimensions, global attributes, and every numeric, character and
/// string variable.
///
/// Character arrays become [`VarData::Text`]; see [`collapse_chars`].
pub fn read_netcdf(path: &Path) -> Result<Dataset> {
    let file = netcdf::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut ds = Dataset::new();

    for dim in file.dimensions() {
        ds.add_dimension(&dim.name(), dim.len())?;
    }
    for attr in file.attributes() {
        if let Some(value) = from_nc_attr(attr.value()?) {
            ds.set_attr(attr.name(), value);
        }
    }

    let mut skipped = 0usize;
    for var in file.variables() {
        let name = var.name();
        let dim_names: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let count: usize = shape.iter().product();

        let (dim_names, data) = match var.vartype() {
            NcVariableType::Float(FloatType::F64) => {
                (dim_names, VarData::F64(var.get_values::<f64, _>(..)?))
            }
            NcVariableType::Float(FloatType::F32) => {
                (dim_names, VarData::F32(var.get_values::<f32, _>(..)?))
            }
            NcVariableType::Int(IntType::I64 | IntType::U64 | IntType::U32) => {
                (dim_names, VarData::I64(var.get_values::<i64, _>(..)?))
            }
            NcVariableType::Int(_) => (dim_names, VarData::I32(var.get_values::<i32, _>(..)?)),
            NcVariableType::Char => {
                let raw = if count == 0 {
                    Vec::new()
                } else {
                    var.get_raw_values(..)?
                };
                collapse_chars(dim_names, &shape, &raw)
            }
            NcVariableType::String => {
                let mut values = Vec::with_capacity(count);
                for flat in 0..count {
                    let index = unravel(flat, &shape);
                    values.push(var.get_string(index.as_slice())?);
                }
                (dim_names, VarData::Text(values))
            }
            _ => {
                log::debug!("Skipping variable {name} of unsupported type");
                skipped += 1;
                continue;
            }
        };

        let dims: Vec<&str> = dim_names.iter().map(String::as_str).collect();
        let mut variable = Variable::new(name.as_str(), &dims, data);
        for attr in var.attributes() {
            if let Some(value) = from_nc_attr(attr.value()?) {
                variable.attrs.insert(attr.name().to_string(), value);
            }
        }
        ds.add_variable(variable)
            .with_context(|| format!("loading variable {name}"))?;
    }
    if skipped > 0 {
        log::info!("Skipped {skipped} variables of unsupported type");
    }
    Ok(ds)
}

/// Whether a dimension holds the characters of one fixed-width string,
/// as `STRING8` or `DATE_TIME` do in Argo files.
fn is_char_width_dim(name: &str) -> bool {
    name.starts_with("STRING") || name == "DATE_TIME"
}

/// Turn NC_CHAR data into text. A trailing string-width dimension is folded
/// into the strings (`PLATFORM_NUMBER(N_PROF, STRING8)` becomes one string
/// per profile); otherwise every character is one element, as for QC
/// flags. Trailing NULs and blanks are trimmed.
fn collapse_chars(
    mut dims: Vec<String>,
    shape: &[usize],
    raw: &[u8],
) -> (Vec<String>, VarData) {
    let width = match dims.last() {
        Some(last) if is_char_width_dim(last) => {
            dims.pop();
            shape.last().copied().unwrap_or(1)
        }
        _ => 1,
    };
    let values = if width == 0 {
        let outer: usize = shape[..dims.len()].iter().product();
        vec![String::new(); outer]
    } else {
        raw.chunks(width)
            .map(|chunk| {
                String::from_utf8_lossy(chunk)
                    .trim_end_matches(['\0', ' '])
                    .to_string()
            })
            .collect()
    };
    (dims, VarData::Text(values))
}

fn from_nc_attr(value: AttributeValue) -> Option<AttrValue> {
    Some(match value {
        AttributeValue::Str(s) => AttrValue::Text(s),
        AttributeValue::Strs(v) => AttrValue::Text(v.join("\n")),
        AttributeValue::Double(v) => AttrValue::Float(v),
        AttributeValue::Float(v) => AttrValue::Float(f64::from(v)),
        AttributeValue::Longlong(i) => AttrValue::Int(i),
        AttributeValue::Int(i) => AttrValue::Int(i64::from(i)),
        AttributeValue::Short(i) => AttrValue::Int(i64::from(i)),
        AttributeValue::Schar(i) => AttrValue::Int(i64::from(i)),
        AttributeValue::Uchar(i) => AttrValue::Int(i64::from(i)),
        AttributeValue::Doubles(v) => AttrValue::Floats(v),
        AttributeValue::Floats(v) => AttrValue::Floats(v.into_iter().map(f64::from).collect()),
        _ => return None,
    })
}

//! Argo GDAC profile files (`<id>_prof.nc`) over HTTPS.
//!
//! The GDAC files floats under the data assembly centre that processed
//! them, which the WMO code alone does not reveal, so each DAC directory is
//! probed in turn until the file is found.

use std::io::Write;

use anyhow::{bail, Context, Result};
use argo_core::{DataMode, Dataset, FetchRequest};
use reqwest::blocking::Client;

use crate::store::read_netcdf;

/// Data assembly centres, in probe order.
pub const DACS: &[&str] = &[
    "coriolis", "aoml", "csiro", "bodc", "jma", "meds", "incois", "kma", "kordi", "csio",
    "nmdis",
];

pub fn profile_url(base: &str, dac: &str, float_id: u64) -> String {
    format!("{base}/{dac}/{float_id}/{float_id}_prof.nc")
}

pub fn fetch(client: &Client, base: &str, request: &FetchRequest) -> Result<Dataset> {
    let url = locate_profile_file(client, base, request.float_id)?;

    let body = client
        .get(&url)
        .send()
        .with_context(|| format!("requesting {url}"))?
        .error_for_status()
        .context("GDAC rejected the download")?
        .bytes()
        .context("reading GDAC response")?;
    log::info!("Downloaded {} bytes from {url}", body.len());

    let mut file = tempfile::Builder::new()
        .prefix("argo_prof_")
        .suffix(".nc")
        .tempfile()
        .context("creating temporary file")?;
    file.write_all(&body).context("buffering profile file")?;
    file.flush()?;

    let mut ds = read_netcdf(file.path())?;
    if request.mode == DataMode::Standard {
        let dropped = drop_expert_variables(&mut ds);
        log::debug!("Standard mode: dropped {dropped} QC/error variables");
    }
    Ok(ds)
}

fn locate_profile_file(client: &Client, base: &str, float_id: u64) -> Result<String> {
    for dac in DACS {
        let url = profile_url(base, dac, float_id);
        let status = client
            .head(&url)
            .send()
            .with_context(|| format!("probing {url}"))?
            .status();
        if status.is_success() {
            log::info!("Float {float_id} is served by DAC '{dac}'");
            return Ok(url);
        }
        log::debug!("{url}: {status}");
    }
    bail!(
        "no profile file for float {float_id} under any DAC ({})",
        DACS.join(", ")
    )
}

/// QC flags and adjusted-value error estimates are expert-only.
pub fn is_expert_only(name: &str) -> bool {
    name.ends_with("_QC") || name.ends_with("_ADJUSTED_ERROR")
}

/// Remove expert-only variables, returning how many went.
pub fn drop_expert_variables(ds: &mut Dataset) -> usize {
    let doomed: Vec<String> = ds
        .variable_names()
        .filter(|name| is_expert_only(name))
        .map(str::to_string)
        .collect();
    for name in &doomed {
        ds.remove_variable(name);
    }
    doomed.len()
}

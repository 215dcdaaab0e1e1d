//! Remote profile sources.
//!
//! Both services are reached over blocking HTTPS. Anything that goes wrong
//! below this point surfaces as a single [`ArgoError::Fetch`] carrying the
//! full cause chain.

pub mod erddap;
pub mod gdac;

use anyhow::Context;
use argo_core::{ArgoError, DataSource, Dataset, FetchRequest, ProfileSource};
use reqwest::blocking::Client;

pub const DEFAULT_ERDDAP_URL: &str = "https://erddap.ifremer.fr/erddap";
pub const DEFAULT_GDAC_URL: &str = "https://data-argo.ifremer.fr/dac";

/// Base URLs of the two services. `ARGO_ERDDAP_URL` and `ARGO_GDAC_URL`
/// override the defaults, e.g. to point at a mirror.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub erddap: String,
    pub gdac: String,
}

impl Endpoints {
    pub fn from_env() -> Self {
        let pick = |key: &str, default: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            erddap: pick("ARGO_ERDDAP_URL", DEFAULT_ERDDAP_URL),
            gdac: pick("ARGO_GDAC_URL", DEFAULT_GDAC_URL),
        }
    }
}

pub struct RemoteSource {
    client: Client,
    endpoints: Endpoints,
}

impl RemoteSource {
    pub fn new(endpoints: Endpoints) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("argo-download/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("building HTTP client")?;
        Ok(Self { client, endpoints })
    }
}

impl ProfileSource for RemoteSource {
    fn fetch(&self, request: &FetchRequest) -> argo_core::error::Result<Dataset> {
        let fetched = match request.source {
            DataSource::Erddap => erddap::fetch(&self.client, &self.endpoints.erddap, request),
            DataSource::Gdac => gdac::fetch(&self.client, &self.endpoints.gdac, request),
        };
        fetched.map_err(|e| ArgoError::Fetch {
            float_id: request.float_id,
            message: format!("{e:#}"),
        })
    }
}

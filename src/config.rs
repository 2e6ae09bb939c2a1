use std::env;
use std::net::SocketAddr;

use crate::extract::CellLayout;
use crate::{
    Error, Result, BASELINE_CSV_URL, BIND_ADDR, REPORT_LINK_PREFIX, REPORT_ORIGIN,
    REPORT_PAGE_URL,
};

/// Where to fetch from and where to serve.
#[derive(Debug, Clone)]
pub struct Config {
    pub baseline_url: String,
    pub report_page_url: String,
    pub report_origin: String,
    pub report_link_prefix: String,
    pub layout: CellLayout,
    pub bind: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            baseline_url: BASELINE_CSV_URL.into(),
            report_page_url: REPORT_PAGE_URL.into(),
            report_origin: REPORT_ORIGIN.into(),
            report_link_prefix: REPORT_LINK_PREFIX.into(),
            layout: CellLayout::default(),
            bind: BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8050))),
        }
    }
}

impl Config {
    /// Defaults, overridden by `SITREP_BASELINE_URL`, `SITREP_REPORT_PAGE_URL` and `SITREP_BIND`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("SITREP_BASELINE_URL") {
            config.baseline_url = url;
        }
        if let Some(url) = lookup("SITREP_REPORT_PAGE_URL") {
            config.report_page_url = url;
        }
        if let Some(bind) = lookup("SITREP_BIND") {
            config.bind = bind
                .parse()
                .map_err(|_| Error::Config(format!("SITREP_BIND isn't a socket address: {bind}")))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_serve_on_local_dash_port() {
        let config = Config::default();
        assert_eq!(config.bind, SocketAddr::from(([127, 0, 0, 1], 8050)));
        assert_eq!(config.report_link_prefix, "/docs/librariesprovider5/");
    }

    #[test]
    fn env_overrides_urls_and_bind() {
        let config = Config::from_lookup(lookup_from(&[
            ("SITREP_BASELINE_URL", "http://localhost/base.csv"),
            ("SITREP_BIND", "0.0.0.0:9000"),
        ]))
        .unwrap();

        assert_eq!(config.baseline_url, "http://localhost/base.csv");
        assert_eq!(config.report_page_url, REPORT_PAGE_URL);
        assert_eq!(config.bind.port(), 9000);
    }

    #[test]
    fn bad_bind_is_rejected() {
        let res = Config::from_lookup(lookup_from(&[("SITREP_BIND", "not-an-addr")]));
        assert!(matches!(res, Err(Error::Config(_))));
    }
}

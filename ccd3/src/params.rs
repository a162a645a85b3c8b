//! Exposure parameter staging
//!
//! Parameters are built by the caller, pushed to the camera, and consumed
//! by the next start-exposure call. The camera daemon silently repeats the
//! previous configuration if nothing fresh was staged, so the client tracks
//! staleness and warns.

use std::collections::BTreeMap;

/// Parameter keys the current camera firmware is known to accept. Anything
/// outside this set is staged anyway (firmware compatibility in both
/// directions) but logged as a warning.
pub const EXPECTED_PARAMETERS: &[&str] = &[
    "async",
    "CCD3.exposure",
    "CCD3.IMAGETYP",
    "CCD3.OBJECT",
    "CCD3.SHUTTER",
    "WASA.filter",
    "WASB.filter",
];

/// A staged key -> value set for one exposure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExposureParameters {
    values: BTreeMap<String, String>,
}

impl ExposureParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generic setter; prefer the typed helpers below for known keys.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Exposure time in seconds.
    pub fn exposure(self, secs: f64) -> Self {
        self.set("CCD3.exposure", format!("{}", secs))
    }

    /// FITS IMAGETYP keyword (`LIGHT`, `DARK`, `WAVE,LAMP`, ...).
    pub fn image_type(self, image_type: &str) -> Self {
        self.set("CCD3.IMAGETYP", image_type)
    }

    /// FITS OBJECT keyword.
    pub fn object(self, object: &str) -> Self {
        self.set("CCD3.OBJECT", object)
    }

    /// Shutter flag: `0` open for the exposure, `1` kept closed.
    pub fn shutter_closed(self, closed: bool) -> Self {
        self.set("CCD3.SHUTTER", if closed { "1" } else { "0" })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Staged exposure time, if one was set and parses.
    pub fn exposure_secs(&self) -> Option<f64> {
        self.get("CCD3.exposure")?.parse().ok()
    }

    /// Keys outside [`EXPECTED_PARAMETERS`].
    pub fn unknown_keys(&self) -> Vec<&str> {
        self.values
            .keys()
            .map(String::as_str)
            .filter(|key| !EXPECTED_PARAMETERS.contains(key))
            .collect()
    }

    pub(crate) fn insert_default_async(&mut self) {
        self.values
            .entry("async".to_string())
            .or_insert_with(|| "0".to_string());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_helpers_fill_known_keys() {
        let params = ExposureParameters::new()
            .exposure(30.0)
            .image_type("LIGHT")
            .object("SN2026ab")
            .shutter_closed(false);
        assert_eq!(params.get("CCD3.exposure"), Some("30"));
        assert_eq!(params.get("CCD3.IMAGETYP"), Some("LIGHT"));
        assert_eq!(params.get("CCD3.SHUTTER"), Some("0"));
        assert_eq!(params.exposure_secs(), Some(30.0));
        assert!(params.unknown_keys().is_empty());
    }

    #[test]
    fn test_unknown_keys_reported_not_dropped() {
        let params = ExposureParameters::new().set("CCD9.gain", "2");
        assert_eq!(params.unknown_keys(), vec!["CCD9.gain"]);
        assert_eq!(params.get("CCD9.gain"), Some("2"));
    }

    #[test]
    fn test_default_async_does_not_override() {
        let mut params = ExposureParameters::new().set("async", "1");
        params.insert_default_async();
        assert_eq!(params.get("async"), Some("1"));

        let mut params = ExposureParameters::new();
        params.insert_default_async();
        assert_eq!(params.get("async"), Some("0"));
    }
}

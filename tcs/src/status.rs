//! Aggregate status reports
//!
//! Convenience collection of every readable status axis into one
//! human-readable report. Decode failures stay fatal inside the client;
//! this display layer is the only place allowed to degrade a failed
//! *collection* to a placeholder, so a glitching sensor does not take the
//! whole report down with it.

use std::fmt;

use tracing::warn;

use crate::client::{Ascol, FasuWheel};
use crate::error::AscolError;

const UNAVAILABLE: &str = "?ERR";

fn axis(field: &'static str, result: Result<String, AscolError>) -> Option<String> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(field, error = %err, "status axis unavailable");
            None
        }
    }
}

fn show(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNAVAILABLE)
}

/// One snapshot of the telescope-side status axes.
#[derive(Debug, Clone, Default)]
pub struct TelescopeStatus {
    pub remote_state: Option<String>,
    pub safety_relay: Option<String>,
    pub telescope: Option<String>,
    pub dome: Option<String>,
    pub cassegrain_flap: Option<String>,
    pub mirror_flap: Option<String>,
    pub ra: Option<String>,
    pub dec: Option<String>,
    pub side: Option<String>,
    pub wheel_a: Option<String>,
    pub wheel_b: Option<String>,
    pub shutter: Option<String>,
}

impl TelescopeStatus {
    /// Read every axis over the given connection. Individual failures are
    /// logged and rendered as a placeholder.
    pub async fn collect(ascol: &mut Ascol) -> Self {
        let (ra, dec, side) = match ascol.read_ra_dec().await {
            Ok((ra, dec, side)) => (Some(ra), Some(dec), Some(side.to_string())),
            Err(err) => {
                warn!(field = "TRRD", error = %err, "status axis unavailable");
                (None, None, None)
            }
        };
        Self {
            remote_state: axis("GLRE", ascol.remote_state().await.map(str::to_string)),
            safety_relay: axis("GLSR", ascol.safety_relay_state().await.map(str::to_string)),
            telescope: axis("TERS", ascol.telescope_state().await.map(str::to_string)),
            dome: axis("DORS", ascol.dome_state().await.map(str::to_string)),
            cassegrain_flap: axis(
                "FCRS",
                ascol.cassegrain_flap_state().await.map(str::to_string),
            ),
            mirror_flap: axis("FMRS", ascol.mirror_flap_state().await.map(str::to_string)),
            ra,
            dec,
            side,
            wheel_a: axis(
                "WARP",
                ascol.fasu_position(FasuWheel::A).await.map(str::to_string),
            ),
            wheel_b: axis(
                "WBRP",
                ascol.fasu_position(FasuWheel::B).await.map(str::to_string),
            ),
            shutter: axis("SHRP", ascol.shutter_position().await.map(str::to_string)),
        }
    }
}

impl fmt::Display for TelescopeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Telescope status:")?;
        writeln!(
            f,
            "    RA/Dec (side) [TRRD]: {}, {} ({})",
            show(&self.ra),
            show(&self.dec),
            show(&self.side)
        )?;
        writeln!(f, "    remote/local [GLRE]: {}", show(&self.remote_state))?;
        writeln!(f, "    safety relay [GLSR]: {}", show(&self.safety_relay))?;
        writeln!(f, "    tel. state [TERS]  : {}", show(&self.telescope))?;
        writeln!(f, "    dome state [DORS]  : {}", show(&self.dome))?;
        writeln!(f, "    casseg. flap [FCRS]: {}", show(&self.cassegrain_flap))?;
        writeln!(f, "    mirror flap [FMRS] : {}", show(&self.mirror_flap))?;
        writeln!(f, "    wheel A pos. [WARP]: {}", show(&self.wheel_a))?;
        writeln!(f, "    wheel B pos. [WBRP]: {}", show(&self.wheel_b))?;
        write!(f, "    shutter [SHRP]     : {}", show(&self.shutter))
    }
}

/// One meteo value with its validity flag.
#[derive(Debug, Clone)]
pub struct MeteoReading {
    pub value: f64,
    pub validity: String,
}

/// Snapshot of the meteorological sensors.
#[derive(Debug, Clone, Default)]
pub struct MeteoStatus {
    pub twilight: Option<MeteoReading>,
    pub humidity: Option<MeteoReading>,
    pub temperature: Option<MeteoReading>,
    pub wind_speed: Option<MeteoReading>,
    pub pressure: Option<MeteoReading>,
    pub irradiance: Option<MeteoReading>,
    pub precipitation: Option<(String, String)>,
}

impl MeteoStatus {
    pub async fn collect(ascol: &mut Ascol) -> Self {
        fn reading(
            field: &'static str,
            result: Result<(f64, &'static str), AscolError>,
        ) -> Option<MeteoReading> {
            match result {
                Ok((value, validity)) => Some(MeteoReading {
                    value,
                    validity: validity.to_string(),
                }),
                Err(err) => {
                    warn!(field, error = %err, "meteo axis unavailable");
                    None
                }
            }
        }

        Self {
            twilight: reading("METW", ascol.twilight().await),
            humidity: reading("MEHU", ascol.humidity().await),
            temperature: reading("METE", ascol.temperature().await),
            wind_speed: reading("MEWS", ascol.wind_speed().await),
            pressure: reading("MEAP", ascol.pressure().await),
            irradiance: reading("MEPY", ascol.irradiance().await),
            precipitation: match ascol.precipitation().await {
                Ok((p, v)) => Some((p.to_string(), v.to_string())),
                Err(err) => {
                    warn!(field = "MEPR", error = %err, "meteo axis unavailable");
                    None
                }
            },
        }
    }
}

impl fmt::Display for MeteoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn line(reading: &Option<MeteoReading>, unit: &str) -> String {
            match reading {
                Some(r) => format!("{:.2} {} [{}]", r.value, unit, r.validity),
                None => UNAVAILABLE.to_string(),
            }
        }
        writeln!(f, "Meteorology status:")?;
        writeln!(f, "    twilight [METW]  : {}", line(&self.twilight, "Lux"))?;
        writeln!(f, "    humidity [MEHU]  : {}", line(&self.humidity, "%"))?;
        writeln!(f, "    temperat. [METE] : {}", line(&self.temperature, "C"))?;
        writeln!(f, "    wind speed [MEWS]: {}", line(&self.wind_speed, "m/s"))?;
        writeln!(f, "    atm. pres. [MEAP]: {}", line(&self.pressure, "mbar"))?;
        writeln!(f, "    irradiance [MEPY]: {}", line(&self.irradiance, "W/m2"))?;
        let precip = match &self.precipitation {
            Some((p, v)) => format!("{} [{}]", p, v),
            None => UNAVAILABLE.to_string(),
        };
        write!(f, "    precip. [MEPR]   : {}", precip)
    }
}

//! DFOSC status report
//!
//! Per-wheel ready flag, raw step and guessed position name in one
//! log-friendly snapshot. Collection failures degrade to placeholders in
//! this display layer only; the client itself stays loud.

use std::fmt;

use tracing::warn;

use crate::setup::DfoscSetup;
use crate::wheel::{Dfosc, WheelKind};

#[derive(Debug, Clone, Default)]
pub struct WheelStatus {
    pub ready: Option<bool>,
    pub step: Option<u32>,
    pub guessed: Option<String>,
}

impl WheelStatus {
    async fn collect(dfosc: &mut Dfosc, kind: WheelKind, setup: &DfoscSetup) -> Self {
        let ready = match dfosc.is_ready(kind).await {
            Ok(ready) => Some(ready),
            Err(err) => {
                warn!(wheel = %kind, error = %err, "ready probe unavailable");
                None
            }
        };
        let step = match dfosc.position(kind).await {
            Ok(step) => Some(step),
            Err(err) => {
                warn!(wheel = %kind, error = %err, "position unavailable");
                None
            }
        };
        let table = match kind {
            WheelKind::Grism => &setup.grism,
            WheelKind::Aperture => &setup.aperture,
            WheelKind::Filter => &setup.filter,
        };
        let guessed = step.map(|s| table.guess_position_name(s));
        Self {
            ready,
            step,
            guessed,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DfoscStatus {
    pub grism: WheelStatus,
    pub aperture: WheelStatus,
    pub filter: WheelStatus,
}

impl DfoscStatus {
    pub async fn collect(dfosc: &mut Dfosc, setup: &DfoscSetup) -> Self {
        Self {
            grism: WheelStatus::collect(dfosc, WheelKind::Grism, setup).await,
            aperture: WheelStatus::collect(dfosc, WheelKind::Aperture, setup).await,
            filter: WheelStatus::collect(dfosc, WheelKind::Filter, setup).await,
        }
    }
}

fn fmt_wheel(f: &mut fmt::Formatter<'_>, label: &str, status: &WheelStatus) -> fmt::Result {
    let ready = match status.ready {
        Some(true) => "y",
        Some(false) => "n",
        None => "?",
    };
    let step = status
        .step
        .map(|s| s.to_string())
        .unwrap_or_else(|| "?".to_string());
    let guess = status.guessed.as_deref().unwrap_or("?");
    writeln!(
        f,
        "    {} wheel ready? {}  pos: {} (likely '{}')",
        label, ready, step, guess
    )
}

impl fmt::Display for DfoscStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DFOSC status:")?;
        fmt_wheel(f, "grism", &self.grism)?;
        fmt_wheel(f, "aperture", &self.aperture)?;
        fmt_wheel(f, "filter", &self.filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_placeholders() {
        let status = DfoscStatus {
            grism: WheelStatus {
                ready: Some(true),
                step: Some(40_000),
                guessed: Some("g7".to_string()),
            },
            ..Default::default()
        };
        let rendered = status.to_string();
        assert!(rendered.contains("grism wheel ready? y"));
        assert!(rendered.contains("likely 'g7'"));
        assert!(rendered.contains("filter wheel ready? ?"));
    }
}

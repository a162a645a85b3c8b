//! The orchestration façade

use dk154_ccd3::{Ccd3, ExposureParameters};
use dk154_core::{wait_for_result, CancelToken};
use dk154_dfosc::{Dfosc, DfoscStatus, WheelKind};
use dk154_lamps::WaveLamps;
use dk154_tcs::{Ascol, FasuWheel, MeteoStatus, PierSide, TelescopeStatus};
use futures::FutureExt;
use tracing::{error, info};

use crate::config::ObservatoryConfig;
use crate::error::ObservatoryError;
use crate::plan::{hm_stamp, ExposurePlan, FrameSink};

/// Telescope state confirming an arrived slew: the mount is back on sky
/// track at the commanded position.
const SLEW_TERMINAL_STATES: [&str; 1] = ["sky track"];

/// Dome state confirming automatic (telescope-following) mode.
const DOME_AUTO_STATES: [&str; 1] = ["auto"];

/// High-level observatory operations composed from the device clients.
pub struct Observatory {
    config: ObservatoryConfig,
}

impl Observatory {
    pub fn new(config: ObservatoryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ObservatoryConfig {
        &self.config
    }

    fn check_cancel(operation: &str, cancel: &CancelToken) -> Result<(), ObservatoryError> {
        if cancel.is_cancelled() {
            Err(ObservatoryError::Cancelled(operation.to_string()))
        } else {
            Ok(())
        }
    }

    // --- status ---

    /// Collect the telescope status report over a scoped connection.
    pub async fn telescope_status(&self) -> Result<TelescopeStatus, ObservatoryError> {
        let mut ascol = Ascol::connect(self.config.tcs.clone()).await?;
        Ok(TelescopeStatus::collect(&mut ascol).await)
    }

    /// Collect the meteo report over a scoped connection.
    pub async fn meteo_status(&self) -> Result<MeteoStatus, ObservatoryError> {
        let mut ascol = Ascol::connect(self.config.tcs.clone()).await?;
        Ok(MeteoStatus::collect(&mut ascol).await)
    }

    /// Collect the spectrograph wheel report over a scoped connection.
    pub async fn dfosc_status(&self) -> Result<DfoscStatus, ObservatoryError> {
        let mut dfosc = Dfosc::connect(self.config.dfosc.clone()).await?;
        Ok(DfoscStatus::collect(&mut dfosc, &self.config.dfosc_setup).await)
    }

    // --- FASU wheels ---

    /// Move a FASU wheel to a named position and wait for the lock.
    ///
    /// The name is validated against the wheel's code table before any
    /// command is sent; the transient "rotating" pseudo-position is not a
    /// valid target and is rejected by the client's range check.
    pub async fn move_fasu_wheel_and_wait(
        &self,
        wheel: FasuWheel,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<(), ObservatoryError> {
        let operation = format!("move FASU {} to '{}'", wheel.label(), name);
        Self::check_cancel(&operation, cancel)?;

        let code = wheel.position_table().encode(name)?;
        info!(wheel = wheel.label(), name, code, "moving FASU wheel");

        let mut ascol = Ascol::connect(self.config.tcs.clone()).await?;
        ascol.fasu_set_position(wheel, code).await?;
        ascol.fasu_go(wheel).await?;
        tokio::time::sleep(self.config.post_go_settle).await;

        wait_for_result(
            &operation,
            &mut ascol,
            move |ascol| {
                async move { ascol.fasu_state(wheel).await.map(str::to_string) }.boxed()
            },
            &self.config.fasu_accepted_states,
            self.config.wheel_wait,
            cancel,
        )
        .await?;
        info!(wheel = wheel.label(), name, "FASU wheel arrived");
        Ok(())
    }

    // --- DFOSC wheels ---

    /// Move one DFOSC wheel to a named position with the two-phase
    /// ready/goto/ready confirmation.
    pub async fn move_dfosc_wheel_and_wait(
        &self,
        kind: WheelKind,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<(), ObservatoryError> {
        let operation = format!("move DFOSC {} to '{}'", kind.label(), name);
        Self::check_cancel(&operation, cancel)?;

        let table = match kind {
            WheelKind::Grism => &self.config.dfosc_setup.grism,
            WheelKind::Aperture => &self.config.dfosc_setup.aperture,
            WheelKind::Filter => &self.config.dfosc_setup.filter,
        };
        let mut dfosc = Dfosc::connect(self.config.dfosc.clone()).await?;
        dfosc
            .goto_position_confirmed(kind, table, name, cancel)
            .await?;
        Ok(())
    }

    /// Move all three DFOSC wheels over one scoped connection, in the
    /// fixed grism / aperture / filter order.
    pub async fn move_dfosc_wheels_and_wait(
        &self,
        grism: &str,
        aperture: &str,
        filter: &str,
        cancel: &CancelToken,
    ) -> Result<(), ObservatoryError> {
        Self::check_cancel("move DFOSC wheels", cancel)?;
        let setup = &self.config.dfosc_setup;
        let mut dfosc = Dfosc::connect(self.config.dfosc.clone()).await?;
        for (kind, table, name) in [
            (WheelKind::Grism, &setup.grism, grism),
            (WheelKind::Aperture, &setup.aperture, aperture),
            (WheelKind::Filter, &setup.filter, filter),
        ] {
            Self::check_cancel(&format!("move DFOSC {}", kind.label()), cancel)?;
            dfosc
                .goto_position_confirmed(kind, table, name, cancel)
                .await?;
        }
        Ok(())
    }

    /// Home all three DFOSC wheels to their hall switches. Only needed
    /// after a power cycle or manual wheel movement.
    pub async fn init_dfosc_wheels(&self, cancel: &CancelToken) -> Result<(), ObservatoryError> {
        let mut dfosc = Dfosc::connect(self.config.dfosc.clone()).await?;
        for kind in [WheelKind::Aperture, WheelKind::Grism, WheelKind::Filter] {
            Self::check_cancel(&format!("init DFOSC {}", kind.label()), cancel)?;
            dfosc.init_confirmed(kind, cancel).await?;
        }
        Ok(())
    }

    // --- mount / dome / shutter ---

    /// Slew to RA/Dec on the given pier side and wait until the mount
    /// reports sky track again.
    pub async fn slew_and_confirm(
        &self,
        ra: &str,
        dec: &str,
        side: PierSide,
        cancel: &CancelToken,
    ) -> Result<(), ObservatoryError> {
        let operation = format!("slew to {} {}", ra, dec);
        Self::check_cancel(&operation, cancel)?;

        let mut ascol = Ascol::connect(self.config.tcs.clone()).await?;
        ascol.set_ra_dec(ra, dec, side).await?;
        ascol.go_ra_dec().await?;
        tokio::time::sleep(self.config.post_go_settle).await;

        wait_for_result(
            &operation,
            &mut ascol,
            |ascol| async move { ascol.telescope_state().await }.boxed(),
            &SLEW_TERMINAL_STATES,
            self.config.slew_wait,
            cancel,
        )
        .await?;
        info!(ra, dec, "slew confirmed, tracking");
        Ok(())
    }

    /// Put the dome into automatic mode and wait for it to report auto.
    pub async fn dome_auto_and_confirm(&self, cancel: &CancelToken) -> Result<(), ObservatoryError> {
        Self::check_cancel("dome auto", cancel)?;
        let mut ascol = Ascol::connect(self.config.tcs.clone()).await?;
        ascol.dome_auto().await?;
        tokio::time::sleep(self.config.post_go_settle).await;
        wait_for_result(
            "dome auto",
            &mut ascol,
            |ascol| async move { ascol.dome_state().await }.boxed(),
            &DOME_AUTO_STATES,
            self.config.dome_wait,
            cancel,
        )
        .await?;
        Ok(())
    }

    /// Drive the shutter and wait for the confirmed position.
    pub async fn set_shutter_and_confirm(
        &self,
        open: bool,
        cancel: &CancelToken,
    ) -> Result<(), ObservatoryError> {
        let target = if open { "open" } else { "closed" };
        let operation = format!("shutter {}", target);
        Self::check_cancel(&operation, cancel)?;

        let mut ascol = Ascol::connect(self.config.tcs.clone()).await?;
        ascol.shutter(open).await?;
        tokio::time::sleep(self.config.post_go_settle).await;
        let accepted = [target];
        wait_for_result(
            &operation,
            &mut ascol,
            |ascol| async move { ascol.shutter_position().await }.boxed(),
            &accepted,
            self.config.dome_wait,
            cancel,
        )
        .await?;
        Ok(())
    }

    // --- lamps ---

    pub async fn lamps_on(&self) -> Result<(), ObservatoryError> {
        WaveLamps::new(self.config.pdu.clone()).all_lamps_on().await?;
        Ok(())
    }

    pub async fn lamps_off(&self) -> Result<(), ObservatoryError> {
        WaveLamps::new(self.config.pdu.clone()).all_lamps_off().await?;
        Ok(())
    }

    // --- exposures ---

    /// Take `plan.n_exp` sequential frames with the shared parameter set.
    ///
    /// Each frame gets its own scoped camera client; parameters are staged
    /// fresh per frame, and the sink (external backup) is notified as each
    /// frame lands. Cancellation is checked between steps; a cancel during
    /// the exposure wait performs one best-effort stop inside the camera
    /// client before surfacing here.
    pub async fn take_exposure_sequence(
        &self,
        plan: &ExposurePlan,
        sink: Option<&dyn FrameSink>,
        cancel: &CancelToken,
    ) -> Result<Vec<String>, ObservatoryError> {
        let hm = hm_stamp();
        let exp_time = plan.parameters.exposure_secs();
        let mut frames = Vec::with_capacity(plan.n_exp as usize);

        for index in 0..plan.n_exp {
            Self::check_cancel(&format!("exposure {}/{}", index + 1, plan.n_exp), cancel)?;
            let remote_path = plan.frame_path(&hm, index);
            info!(
                frame = index + 1,
                total = plan.n_exp,
                remote_path,
                "starting exposure"
            );

            let mut camera = Ccd3::new(&self.config.ccd3)?;
            let state = camera.state().await?;
            info!(state = %state, "ccd state before staging");

            camera
                .set_exposure_parameters(plan.parameters.clone())
                .await?;
            camera.start_exposure(&remote_path).await?;
            camera
                .wait_for_exposure(exp_time, self.config.read_time, cancel)
                .await?;

            if let Some(sink) = sink {
                sink.frame_ready(&remote_path).await;
            }
            frames.push(remote_path);
        }
        Ok(frames)
    }

    /// Short shutter-closed frames that reset the CCD charge state before
    /// a calibration sequence.
    pub async fn take_discard_frames(
        &self,
        n_exp: u32,
        cancel: &CancelToken,
    ) -> Result<(), ObservatoryError> {
        let parameters = ExposureParameters::new().exposure(1.0).shutter_closed(true);
        let plan = ExposurePlan::new(n_exp, parameters, "/ucph/discard", "discard");
        info!(n_exp, "taking discard frames");
        self.take_exposure_sequence(&plan, None, cancel).await?;
        Ok(())
    }

    /// Comparison-lamp (arc) sequence.
    ///
    /// Ordering invariant: both FASU wheels go to "empty" and the DFOSC
    /// wheels reach their confirmed positions before the lamps strike; the
    /// lamps are extinguished afterwards even when the exposure sequence
    /// fails.
    pub async fn take_arc_frames(
        &self,
        grism: &str,
        aperture: &str,
        filter: &str,
        plan: &ExposurePlan,
        sink: Option<&dyn FrameSink>,
        cancel: &CancelToken,
    ) -> Result<Vec<String>, ObservatoryError> {
        self.move_fasu_wheel_and_wait(FasuWheel::A, "empty", cancel)
            .await?;
        self.move_fasu_wheel_and_wait(FasuWheel::B, "empty", cancel)
            .await?;
        self.move_dfosc_wheels_and_wait(grism, aperture, filter, cancel)
            .await?;

        self.lamps_on().await?;
        tokio::time::sleep(self.config.post_go_settle).await;

        let result = self.take_exposure_sequence(plan, sink, cancel).await;

        // Lamps out no matter how the sequence ended.
        if let Err(err) = self.lamps_off().await {
            error!(error = %err, "failed to extinguish calibration lamps");
            if result.is_ok() {
                return Err(err);
            }
        }
        result
    }

    /// Dark sequence: shutter confirmed closed before the first frame, and
    /// the parameter set forced to keep the CCD shutter shut.
    pub async fn take_dark_frames(
        &self,
        plan: &ExposurePlan,
        sink: Option<&dyn FrameSink>,
        cancel: &CancelToken,
    ) -> Result<Vec<String>, ObservatoryError> {
        self.set_shutter_and_confirm(false, cancel).await?;

        let mut plan = plan.clone();
        plan.parameters = plan.parameters.shutter_closed(true);
        self.take_exposure_sequence(&plan, sink, cancel).await
    }

    /// Science sequence: lamps are extinguished before anything else, then
    /// the wheels reach their confirmed positions, then the frames run.
    #[allow(clippy::too_many_arguments)]
    pub async fn take_science_frames(
        &self,
        wheel_a: &str,
        wheel_b: &str,
        grism: &str,
        aperture: &str,
        filter: &str,
        plan: &ExposurePlan,
        sink: Option<&dyn FrameSink>,
        cancel: &CancelToken,
    ) -> Result<Vec<String>, ObservatoryError> {
        self.lamps_off().await?;

        self.move_fasu_wheel_and_wait(FasuWheel::A, wheel_a, cancel)
            .await?;
        self.move_fasu_wheel_and_wait(FasuWheel::B, wheel_b, cancel)
            .await?;
        self.move_dfosc_wheels_and_wait(grism, aperture, filter, cancel)
            .await?;

        self.take_exposure_sequence(plan, sink, cancel).await
    }
}

use crate::{
    board::Board,
    config::{DISSIPATE_LEVEL, DISSIPATE_TIMEOUT, DISSIPATE_WINDOW},
    driver::ModuleDriver,
    error::{Error, FaultReason, Origin, Result, SlotList, VerificationError},
    hal::FlexPin,
    registry::{ModuleType, match_module},
    signature::{DETECTION_SAMPLES, Signature, classify_detection},
    slot::{NUM_SLOTS, SlotId},
};

use embedded_hal::digital::InputPin;

use super::Yukon;

/// Which slots a verification check is waived for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SlotAllowance {
    #[default]
    None,
    All,
    Only(SlotList),
}

impl SlotAllowance {
    pub fn allows(&self, slot: SlotId) -> bool {
        match self {
            SlotAllowance::None => false,
            SlotAllowance::All => true,
            SlotAllowance::Only(slots) => slots.contains(&slot),
        }
    }
}

impl From<bool> for SlotAllowance {
    fn from(allow: bool) -> Self {
        if allow {
            SlotAllowance::All
        } else {
            SlotAllowance::None
        }
    }
}

impl From<SlotId> for SlotAllowance {
    fn from(slot: SlotId) -> Self {
        SlotAllowance::from(&[slot][..])
    }
}

impl From<&[SlotId]> for SlotAllowance {
    fn from(slots: &[SlotId]) -> Self {
        SlotAllowance::Only(
            SlotId::ALL
                .into_iter()
                .filter(|slot| slots.contains(slot))
                .collect(),
        )
    }
}

impl<const N: usize> From<[SlotId; N]> for SlotAllowance {
    fn from(slots: [SlotId; N]) -> Self {
        SlotAllowance::from(&slots[..])
    }
}

/// How a slot's registration compares with what was detected in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotCheck {
    Empty,
    Match(ModuleType),
    Unregistered(ModuleType),
    Undetected(ModuleType),
    Discrepancy {
        registered: ModuleType,
        detected: ModuleType,
    },
}

impl SlotCheck {
    fn new(registered: Option<ModuleType>, detected: Option<ModuleType>) -> Self {
        match (registered, detected) {
            (None, None) => SlotCheck::Empty,
            (None, Some(detected)) => SlotCheck::Unregistered(detected),
            (Some(registered), None) => SlotCheck::Undetected(registered),
            (Some(registered), Some(detected)) if registered == detected => {
                SlotCheck::Match(registered)
            }
            (Some(registered), Some(detected)) => SlotCheck::Discrepancy {
                registered,
                detected,
            },
        }
    }
}

impl<'m, B: Board> Yukon<'m, B> {
    fn ensure_output_off(&self, action: &'static str) -> Result<()> {
        if self.is_main_output_enabled() {
            return Err(Error::OutputEnabled(action));
        }
        Ok(())
    }

    /// Register a module's driver with a slot.
    pub fn register_with_slot(
        &mut self,
        module: &'m mut dyn ModuleDriver<B::Pin>,
        slot: SlotId,
    ) -> Result<()> {
        self.ensure_output_off("register modules with slots")?;

        if module.module_type() == ModuleType::Unknown {
            return Err(Error::UnregistrableModule);
        }

        let assignment = &mut self.assignments[slot.index()];
        if assignment.module.is_some() {
            return Err(Error::SlotOccupied(slot));
        }
        tracing::debug!("[{slot}] Registered '{}'", module.module_type());
        assignment.module = Some(module);
        assignment.initialised = false;
        Ok(())
    }

    /// Detach the module registered with a slot, handing it back.
    pub fn deregister_slot(
        &mut self,
        slot: SlotId,
    ) -> Result<Option<&'m mut dyn ModuleDriver<B::Pin>>> {
        self.ensure_output_off("deregister module slots")?;

        let assignment = &mut self.assignments[slot.index()];
        assignment.initialised = false;
        Ok(assignment.module.take())
    }

    /// Identify the module fitted to a slot, if any.
    pub fn detect_in_slot(&mut self, slot: SlotId) -> Result<Option<ModuleType>> {
        self.ensure_output_off("detect modules")?;
        self.check_output_dissipated("module detection")?;
        self.detect_module(slot)
    }

    /// Every slot holding a module of the given type.
    pub fn find_slots_with(&mut self, module_type: ModuleType) -> Result<SlotList> {
        self.ensure_output_off("find slots with modules")?;
        self.check_output_dissipated("module finding")?;

        tracing::info!("> Finding slots with '{module_type}' module");

        let mut detected = [None; NUM_SLOTS];
        for (slot, found) in SlotId::ALL.into_iter().zip(detected.iter_mut()) {
            *found = self.detect_module(slot)?;
            if *found == Some(module_type) {
                tracing::info!("[{slot}] Found '{module_type}' module");
            } else {
                tracing::info!("[{slot}] No '{module_type}' module");
            }
        }

        Ok(SlotId::ALL
            .into_iter()
            .zip(detected)
            .filter(|(_, found)| *found == Some(module_type))
            .map(|(slot, _)| slot)
            .collect())
    }

    /// Compare what is fitted to each slot with what is registered, once the output has
    /// discharged.
    ///
    /// Each `allow_*` waives one kind of mismatch for some or all slots. With `allow_no_modules`
    /// false, at least one slot must have a module registered.
    pub fn verify(
        &mut self,
        allow_unregistered: impl Into<SlotAllowance>,
        allow_undetected: impl Into<SlotAllowance>,
        allow_discrepancies: impl Into<SlotAllowance>,
        allow_no_modules: bool,
    ) -> Result<()> {
        self.ensure_output_off("verify modules")?;
        self.check_output_dissipated("module verification")?;

        let allow_unregistered = allow_unregistered.into();
        let allow_undetected = allow_undetected.into();
        let allow_discrepancies = allow_discrepancies.into();

        tracing::info!("> Verifying modules");

        let mut checks = [SlotCheck::Empty; NUM_SLOTS];
        for (slot, check) in SlotId::ALL.into_iter().zip(checks.iter_mut()) {
            let detected = self.detect_module(slot)?;
            *check = SlotCheck::new(self.registered_in(slot), detected);
            log_slot_check(slot, check);
        }

        let unregistered_slots = checks
            .iter()
            .filter(|check| matches!(check, SlotCheck::Empty | SlotCheck::Unregistered(_)))
            .count();
        if !allow_no_modules && unregistered_slots == NUM_SLOTS {
            return Err(VerificationError::NoModules.into());
        }

        let discrepant = failing_slots(&checks, &allow_discrepancies, |check| {
            matches!(check, SlotCheck::Discrepancy { .. })
        });
        if !discrepant.is_empty() {
            return Err(VerificationError::Discrepancy(discrepant).into());
        }

        let undetected = failing_slots(&checks, &allow_undetected, |check| {
            matches!(check, SlotCheck::Undetected(_))
        });
        if !undetected.is_empty() {
            return Err(VerificationError::Undetected(undetected).into());
        }

        let unregistered = failing_slots(&checks, &allow_unregistered, |check| {
            matches!(check, SlotCheck::Unregistered(_))
        });
        if !unregistered.is_empty() {
            return Err(VerificationError::Unregistered(unregistered).into());
        }

        Ok(())
    }

    /// Initialise then reset every registered module.
    pub fn initialise_all(&mut self) -> Result<()> {
        self.ensure_output_off("initialise modules")?;
        tracing::info!("> Initialising modules");

        for (slot, assignment) in SlotId::ALL.into_iter().zip(self.assignments.iter_mut()) {
            let Some(module) = &mut assignment.module else {
                continue;
            };
            tracing::info!("[{slot} '{}'] Initialising", module.module_type());

            let mut ctx = self.board.slot_context(slot);
            module.initialise(&mut ctx)?;
            module.reset(&mut ctx)?;
            assignment.initialised = true;
        }
        Ok(())
    }

    /// [`verify`](Self::verify) then [`initialise_all`](Self::initialise_all).
    pub fn verify_and_initialise(
        &mut self,
        allow_unregistered: impl Into<SlotAllowance>,
        allow_undetected: impl Into<SlotAllowance>,
        allow_discrepancies: impl Into<SlotAllowance>,
        allow_no_modules: bool,
    ) -> Result<()> {
        self.ensure_output_off("verify modules")?;
        self.verify(
            allow_unregistered,
            allow_undetected,
            allow_discrepancies,
            allow_no_modules,
        )?;
        self.initialise_all()
    }

    /// Whether the module registered with a slot has been initialised.
    pub fn is_initialised(&self, slot: SlotId) -> bool {
        self.assignments[slot.index()].initialised
    }

    /// Wait until the output has been below the dissipation level for a while.
    ///
    /// Detection reads would be skewed by a charged output.
    pub(super) fn check_output_dissipated(&mut self, action: &'static str) -> Result<()> {
        tracing::info!("> Checking output voltage");
        let voltage = self.board.read_output_voltage(1)?;
        tracing::debug!("Output Voltage = {voltage} V");
        if voltage < DISSIPATE_LEVEL {
            return Ok(());
        }

        tracing::warn!("> Waiting for output voltage to dissipate before {action}");
        let start = self.board.now();
        let mut first_below = None;
        loop {
            let voltage = self.board.read_output_voltage(1)?;
            tracing::debug!("Output Voltage = {voltage} V");
            let now = self.board.now();

            if voltage < DISSIPATE_LEVEL {
                match first_below {
                    None => first_below = Some(now),
                    Some(since) if now > since + DISSIPATE_WINDOW => return Ok(()),
                    Some(_) => {}
                }
            } else {
                first_below = None;
            }

            if now > start + DISSIPATE_TIMEOUT {
                tracing::error!("[Yukon] Output voltage did not dissipate. Aborting {action}");
                return Err(Error::Fault {
                    origin: Origin::Board,
                    reason: FaultReason::DidNotDissipate,
                });
            }
        }
    }

    /// Read a slot's signature and match it against the known modules.
    fn detect_module(&mut self, slot: SlotId) -> Result<Option<ModuleType>> {
        let pins = self.board.slot_pins(slot);
        for pin in [&mut pins.slow1, &mut pins.slow2, &mut pins.slow3] {
            pin.set_as_input().map_err(Error::pin)?;
        }

        let mut ctx = self.board.slot_context(slot);
        let adc1 = ctx.adc.read_adc1(DETECTION_SAMPLES)?;
        let adc2 = ctx.adc.read_adc2(DETECTION_SAMPLES)?;
        let signature = Signature::new(
            classify_detection(adc1),
            classify_detection(adc2),
            ctx.pins.slow1.is_high().map_err(Error::pin)?,
            ctx.pins.slow2.is_high().map_err(Error::pin)?,
            ctx.pins.slow3.is_high().map_err(Error::pin)?,
        );
        tracing::debug!("[{slot}] ADC1 = {adc1}, ADC2 = {adc2}, {signature}");

        self.board.mux().deselect()?;
        Ok(match_module(&signature))
    }
}

/// Slots whose check is of the given kind, less those the allowance waives.
fn failing_slots(
    checks: &[SlotCheck; NUM_SLOTS],
    allowance: &SlotAllowance,
    kind: impl Fn(&SlotCheck) -> bool,
) -> SlotList {
    SlotId::ALL
        .into_iter()
        .zip(checks.iter())
        .filter(|&(slot, check)| kind(check) && !allowance.allows(slot))
        .map(|(slot, _)| slot)
        .collect()
}

fn log_slot_check(slot: SlotId, check: &SlotCheck) {
    match check {
        SlotCheck::Empty => tracing::info!("[{slot}] Module slot is empty"),
        SlotCheck::Match(module) => {
            tracing::info!("[{slot}] '{module}' module detected and registered")
        }
        SlotCheck::Unregistered(detected) => {
            tracing::warn!("[{slot}] '{detected}' module detected but not registered")
        }
        SlotCheck::Undetected(registered) => {
            tracing::warn!("[{slot}] No module detected! Expected a '{registered}' module")
        }
        SlotCheck::Discrepancy {
            registered,
            detected,
        } => tracing::warn!(
            "[{slot}] Module discrepancy! Expected a '{registered}' module, but detected a '{detected}' module"
        ),
    }
}

//! Flat pin addressing across two expander buses.
//!
//! [`PinExpanderBus`] maps a flat [`PinAddress`] onto `(bus, group, offset)`
//! and performs the write. Each bus is probed once at startup; a bus that did
//! not answer stays [`BusSlot::Absent`] for the lifetime of the process.
//!
//! ```text
//!  index   0 ........ 8 ............... 24 ........ 32 ............... 48
//!          | bus0 GPIO | bus0 GPO        | bus1 GPIO | bus1 GPO        | all
//! ```
//!
//! # Diagnostic writes
//!
//! With [`WriteMode::Diagnostic`], a write aimed at an absent bus is
//! redirected instead of dropped: bus 0 falls over to the first line of bus 1,
//! and bus 1 falls over to the broadcast index. The effective index is
//! returned so a sweep can continue from there.

use crate::traits::ExpanderChip;
use crate::types::{BusLayout, LineGroup};
use crate::Result;
use ptl_core::{LineLevel, PinAddress};
use tracing::{debug, info, warn};

/// Presence of an expander on one bus.
#[derive(Debug)]
pub enum BusSlot<C> {
    /// Chip answered the startup probe.
    Present(C),

    /// Nothing answered; writes to this bus are dropped.
    Absent(BusLayout),
}

impl<C: ExpanderChip> BusSlot<C> {
    /// Probe a chip and configure it when it answers.
    ///
    /// A chip that fails to answer or to configure yields an absent slot that
    /// keeps the chip's layout, so pin numbering does not shift.
    pub async fn probe(mut chip: C) -> Self {
        let layout = chip.layout();
        match chip.probe().await {
            Ok(true) => match chip.configure().await {
                Ok(()) => BusSlot::Present(chip),
                Err(e) => {
                    warn!("Expander answered probe but failed to configure: {}", e);
                    BusSlot::Absent(layout)
                }
            },
            Ok(false) => BusSlot::Absent(layout),
            Err(e) => {
                warn!("Expander probe failed: {}", e);
                BusSlot::Absent(layout)
            }
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, BusSlot::Present(_))
    }

    fn layout(&self) -> BusLayout {
        match self {
            BusSlot::Present(chip) => chip.layout(),
            BusSlot::Absent(layout) => *layout,
        }
    }
}

/// How writes to absent buses are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Drop writes aimed at an absent bus.
    #[default]
    Normal,

    /// Redirect writes aimed at an absent bus to a fixed fallback index.
    Diagnostic,
}

/// Where a flat index lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// A single line.
    Line {
        bus: usize,
        group: LineGroup,
        offset: u8,
    },

    /// Every line on every present bus.
    Broadcast,

    /// Past the broadcast index; nothing is written.
    Nowhere,
}

/// Output lines of two independently probed expander buses.
///
/// # Examples
///
/// ```
/// use ptl_hardware::bus::{BusSlot, PinExpanderBus, WriteMode};
/// use ptl_hardware::mock::MockExpander;
/// use ptl_hardware::types::LineGroup;
/// use ptl_core::{LineLevel, PinAddress};
///
/// #[tokio::main]
/// async fn main() -> ptl_hardware::Result<()> {
///     let (chip0, handle0) = MockExpander::new();
///     let (chip1, _) = MockExpander::absent();
///
///     let mut bus = PinExpanderBus::new(BusSlot::probe(chip0).await, BusSlot::probe(chip1).await);
///     assert_eq!(bus.all_pins(), PinAddress::new(48));
///
///     bus.set_pin(PinAddress::new(9), LineLevel::Low, WriteMode::Normal).await?;
///     assert_eq!(handle0.line_level(LineGroup::Gpo, 1), LineLevel::Low);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct PinExpanderBus<C> {
    buses: [BusSlot<C>; 2],
}

impl<C: ExpanderChip> PinExpanderBus<C> {
    pub fn new(bus0: BusSlot<C>, bus1: BusSlot<C>) -> Self {
        info!(
            bus0 = bus0.is_present(),
            bus1 = bus1.is_present(),
            "Expander buses probed"
        );
        Self {
            buses: [bus0, bus1],
        }
    }

    /// Number of addressable lines, which is also the broadcast index.
    pub fn all_pins(&self) -> PinAddress {
        PinAddress::new(self.buses.iter().map(|b| b.layout().lines()).sum())
    }

    pub fn is_present(&self, bus: usize) -> bool {
        self.buses.get(bus).is_some_and(BusSlot::is_present)
    }

    /// First flat index belonging to `bus`.
    fn base(&self, bus: usize) -> u16 {
        self.buses[..bus].iter().map(|b| b.layout().lines()).sum()
    }

    /// Resolve a flat index without touching hardware.
    pub fn route(&self, pin: PinAddress) -> Route {
        let mut local = pin.index();
        for (bus, slot) in self.buses.iter().enumerate() {
            let layout = slot.layout();
            if let Some((group, offset)) = layout.locate(local) {
                return Route::Line { bus, group, offset };
            }
            local -= layout.lines();
        }
        if local == 0 {
            Route::Broadcast
        } else {
            Route::Nowhere
        }
    }

    /// Fallback index used for diagnostic writes aimed at an absent bus.
    fn redirect_target(&self, bus: usize) -> PinAddress {
        if bus + 1 < self.buses.len() {
            PinAddress::new(self.base(bus + 1))
        } else {
            self.all_pins()
        }
    }

    /// Drive one line, or every line when `pin` is the broadcast index.
    ///
    /// Returns the index that was effectively addressed. It differs from
    /// `pin` only when a diagnostic write was redirected away from an absent
    /// bus. Writes past the broadcast index and writes to an absent bus in
    /// [`WriteMode::Normal`] are silently dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if a present chip rejects the transfer.
    pub async fn set_pin(
        &mut self,
        pin: PinAddress,
        level: LineLevel,
        mode: WriteMode,
    ) -> Result<PinAddress> {
        let mut target = pin;

        loop {
            match self.route(target) {
                Route::Nowhere => return Ok(target),
                Route::Broadcast => {
                    self.broadcast(level).await?;
                    return Ok(target);
                }
                Route::Line { bus, group, offset } => {
                    if let BusSlot::Present(chip) = &mut self.buses[bus] {
                        chip.write_line(group, offset, level).await?;
                        return Ok(target);
                    }
                    if mode == WriteMode::Normal {
                        debug!(%pin, "Write dropped: {}", ptl_core::Error::HardwareBusAbsent(bus as u8));
                        return Ok(target);
                    }
                    let fallback = self.redirect_target(bus);
                    info!("No expander on bus {}, moving pin {} to {}", bus, target, fallback);
                    target = fallback;
                }
            }
        }
    }

    /// Drive every line of every present bus.
    pub async fn broadcast(&mut self, level: LineLevel) -> Result<()> {
        for slot in &mut self.buses {
            if let BusSlot::Present(chip) = slot {
                chip.write_group(LineGroup::Gpio, level).await?;
                chip.write_group(LineGroup::Gpo, level).await?;
            }
        }
        Ok(())
    }
}

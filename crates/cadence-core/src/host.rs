//! The surface a [`crate::Worker`] sees of the environment that invokes it.

use std::cell::Cell;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::rc::Rc;

/// Requested re-invocation cadence, as a set of flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UpdateFrequency(u8);

impl UpdateFrequency {
    pub const NONE: Self = Self(0);
    /// Run again on the very next frame, once.
    pub const ONCE: Self = Self(1);
    /// Run every 10th frame.
    pub const UPDATE10: Self = Self(1 << 1);
    /// Run every 100th frame.
    pub const UPDATE100: Self = Self(1 << 2);

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && (self.0 & other.0) == other.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for UpdateFrequency {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for UpdateFrequency {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for UpdateFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("None");
        }
        let names = [
            (Self::ONCE, "Once"),
            (Self::UPDATE10, "Update10"),
            (Self::UPDATE100, "Update100"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Display for UpdateFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Budget and cadence surface exposed by the invoking environment.
pub trait Host {
    /// Instructions consumed so far in the current frame.
    fn instruction_count(&self) -> u64;

    fn update_frequency(&self) -> UpdateFrequency;

    fn set_update_frequency(&mut self, frequency: UpdateFrequency);
}

/// Shared instruction counter. Operations charge it; the host resets it.
#[derive(Debug, Clone, Default)]
pub struct InstructionMeter {
    consumed: Rc<Cell<u64>>,
}

impl InstructionMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn charge(&self, instructions: u64) {
        self.consumed
            .set(self.consumed.get().saturating_add(instructions));
    }

    pub fn consumed(&self) -> u64 {
        self.consumed.get()
    }

    pub fn reset(&self) {
        self.consumed.set(0);
    }
}

/// In-process host used by tests and the CLI driver.
#[derive(Debug, Clone, Default)]
pub struct SimulatedHost {
    meter: InstructionMeter,
    frequency: UpdateFrequency,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_meter(meter: InstructionMeter) -> Self {
        Self {
            meter,
            frequency: UpdateFrequency::NONE,
        }
    }

    pub fn meter(&self) -> &InstructionMeter {
        &self.meter
    }

    /// Start a frame: the meter restarts and a pending `ONCE` is consumed.
    pub fn begin_tick(&mut self) {
        self.meter.reset();
        self.frequency = self.frequency.without(UpdateFrequency::ONCE);
    }

    /// Whether the requested cadence calls for running on `frame`.
    pub fn should_run(&self, frame: u64) -> bool {
        self.frequency.contains(UpdateFrequency::ONCE)
            || (self.frequency.contains(UpdateFrequency::UPDATE10) && frame % 10 == 0)
            || (self.frequency.contains(UpdateFrequency::UPDATE100) && frame % 100 == 0)
    }
}

impl Host for SimulatedHost {
    fn instruction_count(&self) -> u64 {
        self.meter.consumed()
    }

    fn update_frequency(&self) -> UpdateFrequency {
        self.frequency
    }

    fn set_update_frequency(&mut self, frequency: UpdateFrequency) {
        self.frequency = frequency;
    }
}

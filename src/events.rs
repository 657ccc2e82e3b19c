//! Events delivered to the watchface by the host event loop.

use core::ops::{BitOr, BitOrAssign};

use chrono::NaiveDateTime;
use heapless::Vec;

use crate::{
    battery::BatteryChargeState, config::INBOX_SIZE, message::AppMessageResult,
    platform::AnimationId,
};

/// Set of calendar units that changed with a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeUnits(u8);

impl TimeUnits {
    pub const SECOND: Self = Self(1 << 0);
    pub const MINUTE: Self = Self(1 << 1);
    pub const HOUR: Self = Self(1 << 2);
    pub const DAY: Self = Self(1 << 3);
    pub const MONTH: Self = Self(1 << 4);
    pub const YEAR: Self = Self(1 << 5);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for TimeUnits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TimeUnits {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Everything the host can tell the watchface about.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// A new minute started.
    Tick {
        time: NaiveDateTime,
        units: TimeUnits,
    },
    /// The phone connected or disconnected.
    BluetoothConnection(bool),
    /// Charging state or charge level changed.
    BatteryState(BatteryChargeState),
    /// An encoded dictionary arrived from the phone.
    InboxReceived(Vec<u8, INBOX_SIZE>),
    /// An inbound message was lost before it could be delivered.
    InboxDropped(AppMessageResult),
    /// The last outbound message was acknowledged.
    OutboxSent,
    /// The last outbound message could not be delivered.
    OutboxFailed(AppMessageResult),
    /// A scheduled animation ran to completion or was unscheduled.
    AnimationStopped { id: AnimationId, finished: bool },
}

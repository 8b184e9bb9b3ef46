//! Alert and BMS fault bitflag types.
//!
//! Every alert id owns exactly one bit of [`AlertMask`]: id `n` maps to bit
//! `n - 1`. FATAL-class alerts latch the fatal error flag.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

/// Severity class of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AlertType {
    /// Latches the fatal error flag.
    Fatal = 1,
    Error = 2,
    Warning = 3,
}

/// Closed set of alert ids tracked by the alert tracker.
///
/// Discriminants are recorded in the alert history and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AlertId {
    /// Motor controller firmware fault.
    FwFault = 1,
    BmsConnection = 2,
    BmsOverTemp = 3,
    BmsCellOverVoltage = 4,
    BmsCellUnderVoltage = 5,
    BmsCellOverTemp = 6,
    BmsCellUnderTemp = 7,
    BmsCellBalance = 8,
}

impl AlertId {
    /// All ids in discriminant order.
    pub const ALL: [AlertId; 8] = [
        Self::FwFault,
        Self::BmsConnection,
        Self::BmsOverTemp,
        Self::BmsCellOverVoltage,
        Self::BmsCellUnderVoltage,
        Self::BmsCellOverTemp,
        Self::BmsCellUnderTemp,
        Self::BmsCellBalance,
    ];

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::FwFault),
            2 => Some(Self::BmsConnection),
            3 => Some(Self::BmsOverTemp),
            4 => Some(Self::BmsCellOverVoltage),
            5 => Some(Self::BmsCellUnderVoltage),
            6 => Some(Self::BmsCellOverTemp),
            7 => Some(Self::BmsCellUnderTemp),
            8 => Some(Self::BmsCellBalance),
            _ => None,
        }
    }

    /// Severity class of this alert.
    #[inline]
    pub const fn alert_type(&self) -> AlertType {
        match self {
            Self::FwFault => AlertType::Fatal,
            _ => AlertType::Error,
        }
    }

    /// The single bit this alert occupies in [`AlertMask`].
    #[inline]
    pub const fn mask(&self) -> AlertMask {
        AlertMask::from_bits_retain(1 << (*self as u8 - 1))
    }

    /// Short name used in log output and app-data.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FwFault => "FW_FAULT",
            Self::BmsConnection => "BMS_CONNECTION",
            Self::BmsOverTemp => "BMS_OVER_TEMP",
            Self::BmsCellOverVoltage => "BMS_CELL_OVER_VOLTAGE",
            Self::BmsCellUnderVoltage => "BMS_CELL_UNDER_VOLTAGE",
            Self::BmsCellOverTemp => "BMS_CELL_OVER_TEMP",
            Self::BmsCellUnderTemp => "BMS_CELL_UNDER_TEMP",
            Self::BmsCellBalance => "BMS_CELL_BALANCE",
        }
    }

    /// Alert raised for a single BMS fault flag.
    pub fn from_bms_fault(fault: BmsFault) -> Option<Self> {
        const TABLE: [(BmsFault, AlertId); 7] = [
            (BmsFault::CONNECTION, AlertId::BmsConnection),
            (BmsFault::OVER_TEMP, AlertId::BmsOverTemp),
            (BmsFault::CELL_OVER_VOLTAGE, AlertId::BmsCellOverVoltage),
            (BmsFault::CELL_UNDER_VOLTAGE, AlertId::BmsCellUnderVoltage),
            (BmsFault::CELL_OVER_TEMP, AlertId::BmsCellOverTemp),
            (BmsFault::CELL_UNDER_TEMP, AlertId::BmsCellUnderTemp),
            (BmsFault::CELL_BALANCE, AlertId::BmsCellBalance),
        ];
        TABLE
            .iter()
            .find(|(flag, _)| *flag == fault)
            .map(|(_, id)| *id)
    }
}

bitflags! {
    /// Active alert bitmask.
    ///
    /// FATAL flags: FW_FAULT.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AlertMask: u32 {
        const FW_FAULT               = 1 << 0;
        const BMS_CONNECTION         = 1 << 1;
        const BMS_OVER_TEMP          = 1 << 2;
        const BMS_CELL_OVER_VOLTAGE  = 1 << 3;
        const BMS_CELL_UNDER_VOLTAGE = 1 << 4;
        const BMS_CELL_OVER_TEMP     = 1 << 5;
        const BMS_CELL_UNDER_TEMP    = 1 << 6;
        const BMS_CELL_BALANCE       = 1 << 7;
    }
}

impl AlertMask {
    /// Mask of all FATAL-class alerts.
    pub const FATAL_MASK: Self = Self::from_bits_truncate(Self::FW_FAULT.bits());

    /// Returns true if any FATAL alert is set.
    #[inline]
    pub const fn has_fatal(&self) -> bool {
        self.intersects(Self::FATAL_MASK)
    }
}

impl Default for AlertMask {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// BMS fault bitmask. Fault code `n` maps to bit `n - 1`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BmsFault: u32 {
        /// No BMS message within the timeout.
        const CONNECTION         = 1 << 0;
        /// BMS board temperature.
        const OVER_TEMP          = 1 << 1;
        const CELL_OVER_VOLTAGE  = 1 << 2;
        const CELL_UNDER_VOLTAGE = 1 << 3;
        const CELL_OVER_TEMP     = 1 << 4;
        const CELL_UNDER_TEMP    = 1 << 5;
        /// Highest and lowest cell drifted too far apart.
        const CELL_BALANCE       = 1 << 6;
    }
}

impl Default for BmsFault {
    fn default() -> Self {
        Self::empty()
    }
}

// Every alert id must fit the mask.
const_assert!((AlertId::BmsCellBalance as u32) <= u32::BITS);
const_assert!(AlertMask::all().bits().count_ones() as usize == AlertId::ALL.len());

//! Severity-coded result and quality indicator.
//!
//! A `StatusCode` is a 32-bit value. The top two bits carry the severity
//! (`00` Good, `01` Uncertain, `10`/`11` Bad), bits 16..30 the sub-code, and the
//! low 16 bits structure/info flags that do not affect classification.

use std::fmt;

use serde::{Deserialize, Serialize};

const SEVERITY_MASK: u32 = 0xC000_0000;
const SEVERITY_UNCERTAIN: u32 = 0x4000_0000;
const SUB_CODE_MASK: u32 = 0xFFFF_0000;

/// Coarse classification of a [`StatusCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Good,
    Uncertain,
    Bad,
}

/// Protocol status code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

macro_rules! status_codes {
    ($($name:ident = $value:expr),+ $(,)?) => {
        #[allow(non_upper_case_globals)]
        impl StatusCode {
            $(pub const $name: StatusCode = StatusCode($value);)+

            /// Symbolic name of the sub-code, if it is one this crate knows.
            #[must_use]
            pub fn name(self) -> Option<&'static str> {
                match self.0 & SUB_CODE_MASK {
                    $(v if v == $value => Some(stringify!($name)),)+
                    _ => None,
                }
            }
        }
    };
}

status_codes! {
    Good = 0x0000_0000,
    GoodEntryInserted = 0x00A2_0000,
    GoodEntryReplaced = 0x00A3_0000,
    GoodNoData = 0x00A5_0000,
    GoodMoreData = 0x00A6_0000,
    Uncertain = 0x4000_0000,
    Bad = 0x8000_0000,
    BadUnexpectedError = 0x8001_0000,
    BadInternalError = 0x8002_0000,
    BadTimeout = 0x800A_0000,
    BadNothingToDo = 0x800F_0000,
    BadTooManyOperations = 0x8010_0000,
    BadTimestampsToReturnInvalid = 0x802B_0000,
    BadInvalidTimestamp = 0x8023_0000,
    BadNodeIdInvalid = 0x8033_0000,
    BadNodeIdUnknown = 0x8034_0000,
    BadAttributeIdInvalid = 0x8035_0000,
    BadIndexRangeInvalid = 0x8036_0000,
    BadIndexRangeNoData = 0x8037_0000,
    BadDataEncodingInvalid = 0x8038_0000,
    BadDataEncodingUnsupported = 0x8039_0000,
    BadNotReadable = 0x803A_0000,
    BadNotWritable = 0x803B_0000,
    BadOutOfRange = 0x803C_0000,
    BadNotSupported = 0x803D_0000,
    BadContinuationPointInvalid = 0x804A_0000,
    BadNoContinuationPoints = 0x804B_0000,
    BadMaxAgeInvalid = 0x8070_0000,
    BadHistoryOperationInvalid = 0x8071_0000,
    BadHistoryOperationUnsupported = 0x8072_0000,
    BadWriteNotSupported = 0x8073_0000,
    BadTypeMismatch = 0x8074_0000,
    BadNoData = 0x809B_0000,
    BadEntryExists = 0x809F_0000,
    BadNoEntryExists = 0x80A0_0000,
}

impl StatusCode {
    #[must_use]
    pub fn severity(self) -> Severity {
        match self.0 & SEVERITY_MASK {
            0 => Severity::Good,
            SEVERITY_UNCERTAIN => Severity::Uncertain,
            _ => Severity::Bad,
        }
    }

    #[must_use]
    pub fn is_good(self) -> bool {
        self.severity() == Severity::Good
    }

    #[must_use]
    pub fn is_uncertain(self) -> bool {
        self.severity() == Severity::Uncertain
    }

    #[must_use]
    pub fn is_bad(self) -> bool {
        self.severity() == Severity::Bad
    }

    /// The code with the low 16 info bits cleared, for comparisons that must
    /// ignore structure changed / semantics changed / limit flags.
    #[must_use]
    pub fn sub_code(self) -> StatusCode {
        StatusCode(self.0 & SUB_CODE_MASK)
    }

    /// True when both codes share the same severity and sub-code.
    #[must_use]
    pub fn matches(self, other: StatusCode) -> bool {
        self.sub_code() == other.sub_code()
    }
}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) if self.0 & !SUB_CODE_MASK == 0 => f.write_str(name),
            Some(name) => write!(f, "{name} (0x{:08X})", self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

//! Command opcodes sent by the gateway, IEC 62386-102 numbering.
//!
//! Only the opcodes the dispatcher actually forwards are listed. Frame
//! assembly from opcode and address is the driver's business.

pub const OFF: u8 = 0x00;
pub const RECALL_MAX_LEVEL: u8 = 0x05;
pub const RESET: u8 = 0x20;

/// SET commands take their argument from DTR0, sent twice by the driver.
pub const SET_MAX_LEVEL: u8 = 0x2a;
pub const SET_MIN_LEVEL: u8 = 0x2b;
pub const SET_SYSTEM_FAILURE_LEVEL: u8 = 0x2c;
pub const SET_POWER_ON_LEVEL: u8 = 0x2d;
pub const SET_FADE_TIME: u8 = 0x2e;
pub const SET_FADE_RATE: u8 = 0x2f;

pub const QUERY_DEVICE_TYPE: u8 = 0x99;
pub const QUERY_MAX_LEVEL: u8 = 0xa1;
pub const QUERY_MIN_LEVEL: u8 = 0xa2;
pub const QUERY_POWER_ON_LEVEL: u8 = 0xa3;
pub const QUERY_SYSTEM_FAILURE_LEVEL: u8 = 0xa4;
/// Fade time in the high nibble, fade rate in the low.
pub const QUERY_FADE_TIME_RATE: u8 = 0xa5;

/// Extended (special command) opcode slot for writing DTR0.
pub const EXT_DTR0: u16 = 257;

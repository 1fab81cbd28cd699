use crate::base::address::{Address, Short};
use crate::error::DynFuture;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Mutex;

/// Result of a single bus operation.
#[derive(Debug)]
pub enum SendResult {
    Ok,
    Timeout,
    DriverError(Box<dyn Error + Send + Sync>),
}

impl SendResult {
    pub fn check_send(self) -> Result<(), SendResult> {
        match self {
            SendResult::Ok => Ok(()),
            e => Err(e),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SendResult::Timeout)
    }
}

impl fmt::Display for SendResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SendResult::Ok => write!(f, "send OK"),
            SendResult::Timeout => write!(f, "timeout"),
            SendResult::DriverError(e) => write!(f, "driver error: {}", e),
        }
    }
}

impl Error for SendResult {}

/// Remap selection: readdress every device or only those without a
/// short address.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RemapMode {
    All,
    MissShort,
}

pub const STATUS_BUSY: u8 = 0x01;

/// Driver status byte. Bit 0 is set while a long running operation
/// (scan or remap) owns the bus.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BusStatus(u8);

impl BusStatus {
    pub fn new(status: u8) -> BusStatus {
        BusStatus(status)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn busy(&self) -> bool {
        self.0 & STATUS_BUSY != 0
    }
}

impl fmt::Display for BusStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.busy() {
            f.write_str("busy")
        } else {
            f.write_str("idle")
        }
    }
}

/// A DALI bus back end.
///
/// Send operations return boxed futures so the trait stays object safe;
/// the session awaits each one to completion before the next command.
/// The reply of the most recent query is held by the driver until the
/// next send overwrites it.
pub trait BusDriver: Send {
    /// Send a device command frame to the addressed target.
    fn send_command(&mut self, opcode: u8, addr: Address) -> DynFuture<'_, SendResult>;

    /// Send a direct arc power (brightness) level.
    fn send_direct(&mut self, level: u8, addr: Address) -> DynFuture<'_, SendResult>;

    /// Send an extended (special) command, e.g. a DTR0 write.
    fn send_ext_command(&mut self, opcode: u16, data: u8) -> DynFuture<'_, SendResult>;

    /// Backward frame captured by the last query, if any.
    fn get_reply(&self) -> Option<u8>;

    /// Scan the bus and rebuild the in-memory slave bitmap.
    fn list_dev(&mut self) -> DynFuture<'_, SendResult>;

    /// Reassign short addresses to devices on the bus.
    fn remap(&mut self, mode: RemapMode) -> DynFuture<'_, SendResult>;

    /// Reassign short addresses sequentially starting from `start`.
    fn remap_static(&mut self, start: Short, mode: RemapMode) -> DynFuture<'_, SendResult>;

    /// Move the device at `from` to short address `to`.
    fn remap_move(&mut self, from: Short, to: Short, mode: RemapMode) -> DynFuture<'_, SendResult>;

    /// Stop an in-progress remap. Returns immediately; the driver may
    /// still be unwinding when this call comes back.
    fn abort_remap(&mut self);

    fn status(&self) -> BusStatus;

    /// Presence bitmap as the driver currently believes it: bit
    /// `addr % 8` of byte `addr / 8`.
    fn slaves(&self) -> [u8; 8];

    /// Replace the driver's presence bitmap, normally from the
    /// persisted copy.
    fn set_slaves(&mut self, slaves: [u8; 8]);

    /// Devices found by the remap in progress (or the last one).
    fn devices_found(&self) -> u8;

    fn clear_devices_found(&mut self);
}

#[derive(Debug)]
pub enum OpenError {
    NotFound,
    ParameterError(String),
    DriverError(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OpenError::NotFound => write!(f, "Driver not found"),
            OpenError::ParameterError(p) => write!(f, "Invalid driver parameter: {}", p),
            OpenError::DriverError(e) => write!(f, "Failed to set up driver: {}", e),
        }
    }
}

impl Error for OpenError {}

pub struct DriverInfo {
    pub name: String,
    pub description: String,
    pub open: fn(HashMap<String, String>) -> Result<Box<dyn BusDriver>, OpenError>,
}

lazy_static! {
    static ref DRIVERS: Mutex<Vec<DriverInfo>> = Mutex::new(Vec::new());
}

pub fn add_driver(info: DriverInfo) {
    if let Ok(mut drivers) = DRIVERS.lock() {
        drivers.push(info);
    }
}

pub fn driver_names() -> Vec<String> {
    match DRIVERS.lock() {
        Ok(drivers) => drivers.iter().map(|d| d.name.clone()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Open a driver from a device string of the form `name` or
/// `name:key=value,key=value`. The name `default` selects the first
/// registered driver.
pub fn open(device: &str) -> Result<Box<dyn BusDriver>, OpenError> {
    let (name, param_str) = match device.split_once(':') {
        Some((n, p)) => (n, Some(p)),
        None => (device, None),
    };
    let mut params = HashMap::new();
    if let Some(param_str) = param_str {
        for p in param_str.split(',').filter(|p| !p.is_empty()) {
            match p.split_once('=') {
                Some((k, v)) => {
                    params.insert(k.to_string(), v.to_string());
                }
                None => return Err(OpenError::ParameterError(p.to_string())),
            }
        }
    }
    let drivers = DRIVERS.lock().map_err(|_| OpenError::NotFound)?;
    let info = if name == "default" {
        drivers.first()
    } else {
        drivers.iter().find(|d| d.name == name)
    };
    match info {
        Some(info) => (info.open)(params),
        None => Err(OpenError::NotFound),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_busy_bit() {
        assert!(BusStatus::new(STATUS_BUSY).busy());
        assert!(!BusStatus::new(0).busy());
        assert!(BusStatus::new(0x81).busy());
    }

    #[test]
    fn device_string_rejects_bad_params() {
        match open("nosuchdriver:garbage") {
            Err(OpenError::ParameterError(p)) => assert_eq!(p, "garbage"),
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }
}

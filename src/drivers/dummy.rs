use crate::base::address::{Address, Short};
use crate::drivers::driver::{BusDriver, BusStatus, DriverInfo, OpenError, RemapMode, SendResult};
use crate::error::DynFuture;
use std::collections::HashMap;
use std::time::Duration;

// Roughly one forward frame on a real bus.
const FRAME_TIME: Duration = Duration::from_millis(9);

/// Emulates an empty bus: every send succeeds, no device ever answers.
pub struct DummyDriver {
    slaves: [u8; 8],
}

impl DummyDriver {
    pub fn new() -> DummyDriver {
        DummyDriver { slaves: [0; 8] }
    }
}

impl Default for DummyDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl BusDriver for DummyDriver {
    fn send_command(&mut self, _opcode: u8, _addr: Address) -> DynFuture<'_, SendResult> {
        Box::pin(async {
            tokio::time::sleep(FRAME_TIME).await;
            SendResult::Ok
        })
    }

    fn send_direct(&mut self, _level: u8, _addr: Address) -> DynFuture<'_, SendResult> {
        Box::pin(async {
            tokio::time::sleep(FRAME_TIME).await;
            SendResult::Ok
        })
    }

    fn send_ext_command(&mut self, _opcode: u16, _data: u8) -> DynFuture<'_, SendResult> {
        Box::pin(async {
            tokio::time::sleep(FRAME_TIME).await;
            SendResult::Ok
        })
    }

    fn get_reply(&self) -> Option<u8> {
        None
    }

    fn list_dev(&mut self) -> DynFuture<'_, SendResult> {
        self.slaves = [0; 8];
        Box::pin(async {
            tokio::time::sleep(FRAME_TIME).await;
            SendResult::Ok
        })
    }

    fn remap(&mut self, _mode: RemapMode) -> DynFuture<'_, SendResult> {
        Box::pin(async { SendResult::Ok })
    }

    fn remap_static(&mut self, _start: Short, _mode: RemapMode) -> DynFuture<'_, SendResult> {
        Box::pin(async { SendResult::Ok })
    }

    fn remap_move(&mut self, _from: Short, _to: Short, _mode: RemapMode) -> DynFuture<'_, SendResult> {
        Box::pin(async { SendResult::Ok })
    }

    fn abort_remap(&mut self) {}

    fn status(&self) -> BusStatus {
        BusStatus::new(0)
    }

    fn slaves(&self) -> [u8; 8] {
        self.slaves
    }

    fn set_slaves(&mut self, slaves: [u8; 8]) {
        self.slaves = slaves;
    }

    fn devices_found(&self) -> u8 {
        0
    }

    fn clear_devices_found(&mut self) {}
}

fn driver_open(_params: HashMap<String, String>) -> Result<Box<dyn BusDriver>, OpenError> {
    Ok(Box::new(DummyDriver::new()))
}

pub fn driver_info() -> DriverInfo {
    DriverInfo {
        name: "dummy".to_string(),
        description: "Dummy driver. Emulates an empty bus.".to_string(),
        open: driver_open,
    }
}

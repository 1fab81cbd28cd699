use crate::base::address::{Address, Short};
use crate::defs::cmd;
use crate::drivers::driver::{
    BusDriver, BusStatus, DriverInfo, OpenError, RemapMode, SendResult, STATUS_BUSY,
};
use crate::error::DynFuture;
use log::debug;
use rand::{thread_rng, Rng};
use std::collections::HashMap;
use std::time::{Duration, Instant};

// Bus timing, scaled down from real frame times to keep tests quick.
const FRAME_TIME: Duration = Duration::from_millis(2);
// Simulated time spent per device while remapping.
const REMAP_STEP: Duration = Duration::from_millis(50);

const RESET_LEVEL: u8 = 254;
const RESET_FADE: u8 = 0x07;

/// One simulated control gear.
#[derive(Debug, Clone)]
pub struct SimGear {
    short: Option<u8>,
    long: u32,
    groups: u64,
    device_type: u8,
    level: u8,
    min_level: u8,
    max_level: u8,
    power_on_level: u8,
    system_failure_level: u8,
    /// Fade time in the high nibble, fade rate in the low.
    fade: u8,
}

impl SimGear {
    pub fn new(short: Option<u8>) -> SimGear {
        SimGear {
            short,
            long: thread_rng().gen_range(0..0x0100_0000),
            groups: 0,
            device_type: 6,
            level: RESET_LEVEL,
            min_level: 1,
            max_level: 254,
            power_on_level: RESET_LEVEL,
            system_failure_level: RESET_LEVEL,
            fade: RESET_FADE,
        }
    }

    pub fn with_group(mut self, group: u8) -> SimGear {
        self.groups |= 1 << (group & 0x3f);
        self
    }

    pub fn with_device_type(mut self, device_type: u8) -> SimGear {
        self.device_type = device_type;
        self
    }

    pub fn short(&self) -> Option<u8> {
        self.short
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn min_level(&self) -> u8 {
        self.min_level
    }

    pub fn max_level(&self) -> u8 {
        self.max_level
    }

    pub fn fade(&self) -> u8 {
        self.fade
    }

    fn matches(&self, addr: &Address) -> bool {
        match addr {
            Address::Short(s) => self.short == Some(s.value()),
            Address::Group(g) => self.groups & (1 << g.value()) != 0,
            Address::Broadcast => true,
        }
    }

    fn reset(&mut self) {
        self.level = RESET_LEVEL;
        self.max_level = 254;
        self.min_level = 1;
        self.power_on_level = RESET_LEVEL;
        self.system_failure_level = RESET_LEVEL;
        self.fade = RESET_FADE;
    }

    // Answer a query opcode, None for opcodes this gear ignores.
    fn query(&self, opcode: u8) -> Option<u8> {
        match opcode {
            cmd::QUERY_DEVICE_TYPE => Some(self.device_type),
            cmd::QUERY_MAX_LEVEL => Some(self.max_level),
            cmd::QUERY_MIN_LEVEL => Some(self.min_level),
            cmd::QUERY_POWER_ON_LEVEL => Some(self.power_on_level),
            cmd::QUERY_SYSTEM_FAILURE_LEVEL => Some(self.system_failure_level),
            cmd::QUERY_FADE_TIME_RATE => Some(self.fade),
            _ => None,
        }
    }

    fn command(&mut self, opcode: u8, dtr0: u8) {
        match opcode {
            cmd::OFF => self.level = 0,
            cmd::RECALL_MAX_LEVEL => self.level = self.max_level,
            cmd::RESET => self.reset(),
            cmd::SET_MAX_LEVEL => self.max_level = dtr0,
            cmd::SET_MIN_LEVEL => self.min_level = dtr0,
            cmd::SET_SYSTEM_FAILURE_LEVEL => self.system_failure_level = dtr0,
            cmd::SET_POWER_ON_LEVEL => self.power_on_level = dtr0,
            cmd::SET_FADE_TIME => self.fade = (self.fade & 0x0f) | (dtr0 << 4),
            cmd::SET_FADE_RATE => self.fade = (self.fade & 0xf0) | (dtr0 & 0x0f),
            _ => {}
        }
    }
}

/// Bus operations as seen by the simulator, recorded for inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum BusOp {
    Command(u8, Address),
    Direct(u8, Address),
    Ext(u16, u8),
}

/// Simulated bus: a set of gears, a presence bitmap and a busy window.
///
/// Remap operations assign short addresses in long-address order and
/// leave the driver busy for a while so progress queries and aborts
/// have something to observe.
pub struct SimBus {
    gears: Vec<SimGear>,
    slaves: [u8; 8],
    dtr0: u8,
    last_reply: Option<u8>,
    busy_until: Option<Instant>,
    found: u8,
    ops: Vec<BusOp>,
}

impl SimBus {
    pub fn new() -> SimBus {
        SimBus {
            gears: Vec::new(),
            slaves: [0; 8],
            dtr0: 0,
            last_reply: None,
            busy_until: None,
            found: 0,
            ops: Vec::new(),
        }
    }

    pub fn add_gear(&mut self, gear: SimGear) {
        self.gears.push(gear);
        self.rebuild_slaves();
    }

    pub fn gear_at(&self, short: u8) -> Option<&SimGear> {
        self.gears.iter().find(|g| g.short == Some(short))
    }

    pub fn ops(&self) -> &[BusOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Force the busy bit for a while, as if a remap were running.
    pub fn set_busy_for(&mut self, d: Duration) {
        self.busy_until = Some(Instant::now() + d);
    }

    pub fn set_found(&mut self, found: u8) {
        self.found = found;
    }

    fn rebuild_slaves(&mut self) {
        self.slaves = [0; 8];
        for g in &self.gears {
            if let Some(a) = g.short {
                self.slaves[(a / 8) as usize] |= 1 << (a % 8);
            }
        }
    }

    fn used_shorts(&self) -> u64 {
        let mut used = 0u64;
        for g in &self.gears {
            if let Some(a) = g.short {
                used |= 1 << a;
            }
        }
        used
    }

    // Indices of the gears a remap touches, in long-address order.
    fn remap_candidates(&self, mode: RemapMode) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.gears.len())
            .filter(|&i| match mode {
                RemapMode::All => true,
                RemapMode::MissShort => self.gears[i].short.is_none(),
            })
            .collect();
        idx.sort_by_key(|&i| self.gears[i].long);
        idx
    }

    fn assign_from(&mut self, start: u8, mode: RemapMode) {
        let candidates = self.remap_candidates(mode);
        let mut used = match mode {
            // A full remap frees every address first.
            RemapMode::All => 0u64,
            RemapMode::MissShort => self.used_shorts(),
        };
        if mode == RemapMode::All {
            for g in self.gears.iter_mut() {
                g.short = None;
            }
        }
        let mut next = start;
        let mut found = 0u8;
        for i in candidates {
            while next <= 63 && used & (1 << next) != 0 {
                next += 1;
            }
            if next > 63 {
                break;
            }
            self.gears[i].short = Some(next);
            used |= 1 << next;
            found += 1;
        }
        self.found = found;
        self.rebuild_slaves();
        self.busy_until = Some(Instant::now() + REMAP_STEP * u32::from(found.max(1)));
        debug!("remap assigned {} devices from {}", found, start);
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusDriver for SimBus {
    fn send_command(&mut self, opcode: u8, addr: Address) -> DynFuture<'_, SendResult> {
        self.ops.push(BusOp::Command(opcode, addr));
        let is_query = (0x90..=0xc5).contains(&opcode);
        if is_query {
            // Only an individually addressed gear answers; everything
            // else would collide on the backward channel.
            self.last_reply = match addr {
                Address::Short(_) => self
                    .gears
                    .iter()
                    .find(|g| g.matches(&addr))
                    .and_then(|g| g.query(opcode)),
                _ => None,
            };
        } else {
            self.last_reply = None;
            let dtr0 = self.dtr0;
            for g in self.gears.iter_mut().filter(|g| g.matches(&addr)) {
                g.command(opcode, dtr0);
            }
        }
        let answered = self.last_reply.is_some();
        Box::pin(async move {
            tokio::time::sleep(FRAME_TIME).await;
            if is_query && !answered {
                SendResult::Timeout
            } else {
                SendResult::Ok
            }
        })
    }

    fn send_direct(&mut self, level: u8, addr: Address) -> DynFuture<'_, SendResult> {
        self.ops.push(BusOp::Direct(level, addr));
        self.last_reply = None;
        for g in self.gears.iter_mut().filter(|g| g.matches(&addr)) {
            // MASK leaves the level untouched.
            if level != 0xff {
                g.level = level;
            }
        }
        Box::pin(async {
            tokio::time::sleep(FRAME_TIME).await;
            SendResult::Ok
        })
    }

    fn send_ext_command(&mut self, opcode: u16, data: u8) -> DynFuture<'_, SendResult> {
        self.ops.push(BusOp::Ext(opcode, data));
        self.last_reply = None;
        if opcode == cmd::EXT_DTR0 {
            self.dtr0 = data;
        }
        Box::pin(async {
            tokio::time::sleep(FRAME_TIME).await;
            SendResult::Ok
        })
    }

    fn get_reply(&self) -> Option<u8> {
        self.last_reply
    }

    fn list_dev(&mut self) -> DynFuture<'_, SendResult> {
        self.rebuild_slaves();
        Box::pin(async {
            tokio::time::sleep(FRAME_TIME * 64).await;
            SendResult::Ok
        })
    }

    fn remap(&mut self, mode: RemapMode) -> DynFuture<'_, SendResult> {
        self.assign_from(0, mode);
        Box::pin(async { SendResult::Ok })
    }

    fn remap_static(&mut self, start: Short, mode: RemapMode) -> DynFuture<'_, SendResult> {
        self.assign_from(start.value(), mode);
        Box::pin(async { SendResult::Ok })
    }

    fn remap_move(&mut self, from: Short, to: Short, _mode: RemapMode) -> DynFuture<'_, SendResult> {
        let from_idx = self.gears.iter().position(|g| g.short == Some(from.value()));
        let to_idx = self.gears.iter().position(|g| g.short == Some(to.value()));
        if let Some(i) = from_idx {
            // The displaced gear, if any, takes the vacated address.
            if let Some(j) = to_idx {
                self.gears[j].short = Some(from.value());
            }
            self.gears[i].short = Some(to.value());
        }
        self.rebuild_slaves();
        self.busy_until = Some(Instant::now() + REMAP_STEP);
        Box::pin(async { SendResult::Ok })
    }

    fn abort_remap(&mut self) {
        self.busy_until = None;
    }

    fn status(&self) -> BusStatus {
        let busy = match self.busy_until {
            Some(t) => Instant::now() < t,
            None => false,
        };
        BusStatus::new(if busy { STATUS_BUSY } else { 0 })
    }

    fn slaves(&self) -> [u8; 8] {
        self.slaves
    }

    fn set_slaves(&mut self, slaves: [u8; 8]) {
        self.slaves = slaves;
    }

    fn devices_found(&self) -> u8 {
        self.found
    }

    fn clear_devices_found(&mut self) {
        self.found = 0;
    }
}

fn parse_count(params: &HashMap<String, String>, key: &str) -> Result<usize, OpenError> {
    match params.get(key) {
        Some(v) => v
            .parse()
            .map_err(|_| OpenError::ParameterError(format!("{}={}", key, v))),
        None => Ok(0),
    }
}

fn driver_open(params: HashMap<String, String>) -> Result<Box<dyn BusDriver>, OpenError> {
    let addressed = parse_count(&params, "gears")?;
    let unaddressed = parse_count(&params, "unaddressed")?;
    if addressed > 64 {
        return Err(OpenError::ParameterError(format!("gears={}", addressed)));
    }
    let mut bus = SimBus::new();
    for a in 0..addressed {
        bus.add_gear(SimGear::new(Some(a as u8)));
    }
    for _ in 0..unaddressed {
        bus.add_gear(SimGear::new(None));
    }
    Ok(Box::new(bus))
}

pub fn driver_info() -> DriverInfo {
    DriverInfo {
        name: "sim".to_string(),
        description: "Simulated bus. Parameters: gears=N, unaddressed=N.".to_string(),
        open: driver_open,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::executor::block_on;

    fn sim_with(shorts: &[u8]) -> SimBus {
        let mut bus = SimBus::new();
        for &a in shorts {
            bus.add_gear(SimGear::new(Some(a)));
        }
        bus
    }

    #[tokio::test]
    async fn query_answers_and_timeouts() {
        let mut bus = sim_with(&[3]);
        let addr = Address::Short(Short::new(3).unwrap());
        match bus.send_command(cmd::QUERY_MAX_LEVEL, addr).await {
            SendResult::Ok => {}
            r => panic!("query failed: {}", r),
        }
        assert_eq!(bus.get_reply(), Some(254));

        let absent = Address::Short(Short::new(9).unwrap());
        assert!(bus
            .send_command(cmd::QUERY_MAX_LEVEL, absent)
            .await
            .is_timeout());
        assert_eq!(bus.get_reply(), None);
    }

    #[tokio::test]
    async fn dtr_commit_changes_gear() {
        let mut bus = sim_with(&[0]);
        let addr = Address::Short(Short::new(0).unwrap());
        bus.send_ext_command(cmd::EXT_DTR0, 100).await;
        bus.send_command(cmd::SET_MIN_LEVEL, addr).await;
        assert_eq!(bus.gear_at(0).unwrap().min_level(), 100);
    }

    #[test]
    fn remap_all_assigns_everything() {
        let mut bus = sim_with(&[]);
        for _ in 0..5 {
            bus.add_gear(SimGear::new(None));
        }
        block_on(bus.remap(RemapMode::All)).check_send().unwrap();
        assert_eq!(bus.devices_found(), 5);
        let mut shorts: Vec<u8> = bus.gears.iter().filter_map(|g| g.short).collect();
        shorts.sort();
        assert_eq!(shorts, vec![0, 1, 2, 3, 4]);
        assert!(bus.status().busy());
        bus.abort_remap();
        assert!(!bus.status().busy());
    }

    #[test]
    fn remap_miss_short_keeps_existing() {
        let mut bus = sim_with(&[0, 2]);
        bus.add_gear(SimGear::new(None));
        block_on(bus.remap(RemapMode::MissShort)).check_send().unwrap();
        assert_eq!(bus.devices_found(), 1);
        // The new device takes the lowest free address.
        assert!(bus.gear_at(1).is_some());
        assert!(bus.gear_at(0).is_some() && bus.gear_at(2).is_some());
    }

    #[test]
    fn move_swaps_occupied_target() {
        let mut bus = sim_with(&[1, 5]);
        block_on(bus.remap_move(
            Short::new(1).unwrap(),
            Short::new(5).unwrap(),
            RemapMode::All,
        ));
        assert!(bus.gear_at(5).is_some());
        assert!(bus.gear_at(1).is_some());
        assert_eq!(bus.slaves()[0], 0x22);
    }

    #[tokio::test]
    async fn scan_rebuilds_bitmap() {
        let mut bus = sim_with(&[0, 8, 63]);
        bus.set_slaves([0; 8]);
        bus.list_dev().await.check_send().unwrap();
        let slaves = bus.slaves();
        assert_eq!(slaves[0], 0x01);
        assert_eq!(slaves[1], 0x01);
        assert_eq!(slaves[7], 0x80);
    }
}

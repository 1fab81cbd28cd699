use crate::base::address::Short;
use crate::drivers::driver::BusDriver;
use crate::store::NvStore;

/// Location of the presence bitmap in non-volatile storage. One bit per
/// short address, LSB of the first byte is address 0.
pub const BITMAP_BASE: u16 = 0x0000;
pub const BITMAP_LEN: usize = 8;

/// Persist the presence bitmap.
pub fn store_slaves(store: &mut dyn NvStore, slaves: &[u8; BITMAP_LEN]) {
    for (i, byte) in slaves.iter().enumerate() {
        store.write_byte(BITMAP_BASE + i as u16, *byte);
    }
}

/// Load the presence bitmap and hand the driver a fresh copy of it.
pub fn retrieve_slaves(store: &dyn NvStore, driver: &mut dyn BusDriver) -> [u8; BITMAP_LEN] {
    let mut slaves = [0u8; BITMAP_LEN];
    for (i, byte) in slaves.iter_mut().enumerate() {
        *byte = store.read_byte(BITMAP_BASE + i as u16);
    }
    driver.set_slaves(slaves);
    slaves
}

/// True if the stored bitmap marks the device as present.
pub fn check_slave(store: &dyn NvStore, driver: &mut dyn BusDriver, dev: Short) -> bool {
    let slaves = retrieve_slaves(store, driver);
    let byte = usize::from(dev.value() / 8);
    let bit = dev.value() % 8;
    slaves[byte] & (1 << bit) != 0
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::drivers::dummy::DummyDriver;
    use crate::store::MemStore;

    #[test]
    fn round_trip_through_store() {
        let mut store = MemStore::new();
        let mut driver = DummyDriver::new();
        let slaves = [0x01, 0x80, 0x00, 0xff, 0x55, 0xaa, 0x03, 0xc0];
        store_slaves(&mut store, &slaves);
        assert_eq!(retrieve_slaves(&store, &mut driver), slaves);
        // The driver's copy is refreshed as well.
        assert_eq!(driver.slaves(), slaves);
    }

    #[test]
    fn check_slave_tests_single_bits() {
        let mut store = MemStore::new();
        let mut driver = DummyDriver::new();
        for dev in Short::all() {
            let mut slaves = [0u8; BITMAP_LEN];
            slaves[usize::from(dev.value() / 8)] = 1 << (dev.value() % 8);
            store_slaves(&mut store, &slaves);
            assert!(check_slave(&store, &mut driver, dev), "missing {}", dev);
            for other in Short::all().filter(|o| *o != dev) {
                assert!(!check_slave(&store, &mut driver, other));
            }
        }
    }
}

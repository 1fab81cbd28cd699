use crate::drivers;
use crate::error::DynResult;
use drivers::driver::add_driver;
use drivers::{dummy, sim};

/// Register the built-in drivers. Call once at startup, before
/// `drivers::open`.
pub fn init() -> DynResult<()> {
    add_driver(sim::driver_info());
    add_driver(dummy::driver_info());
    Ok(())
}

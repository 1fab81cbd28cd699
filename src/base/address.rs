use core::str::FromStr;

pub const MAX_ADDRESS: u8 = 63;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AddressError {
    NotShort,
    NotGroup,
    InvalidAddress,
}

impl std::fmt::Display for AddressError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        match self {
            AddressError::NotShort => write!(fmt, "Not a short address"),
            AddressError::NotGroup => write!(fmt, "Not a group address"),
            AddressError::InvalidAddress => write!(fmt, "Address out of range"),
        }
    }
}

impl std::error::Error for AddressError {}

/// Short (individual) address of a device on the bus, 0..=63.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Short(u8);

impl Short {
    pub fn new(a: u8) -> Result<Short, AddressError> {
        if a <= MAX_ADDRESS {
            Ok(Short(a))
        } else {
            Err(AddressError::InvalidAddress)
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// All valid short addresses in ascending order.
    pub fn all() -> impl Iterator<Item = Short> {
        (0..=MAX_ADDRESS).map(Short)
    }
}

impl std::fmt::Display for Short {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        self.0.fmt(fmt)
    }
}

impl FromStr for Short {
    type Err = AddressError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u8::from_str(s).map_or(Err(AddressError::InvalidAddress), Short::new)
    }
}

/// Group address, 0..=63.
///
/// The gateway grammar allows the full two digit range even though most
/// gear only implements groups 0..=15.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Group(u8);

impl Group {
    pub fn new(a: u8) -> Result<Group, AddressError> {
        if a <= MAX_ADDRESS {
            Ok(Group(a))
        } else {
            Err(AddressError::InvalidAddress)
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        self.0.fmt(fmt)
    }
}

impl FromStr for Group {
    type Err = AddressError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u8::from_str(s).map_or(Err(AddressError::InvalidAddress), Group::new)
    }
}

/// Target of a bus operation: one device, one group or every device.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Address {
    Short(Short),
    Group(Group),
    Broadcast,
}

impl From<Short> for Address {
    fn from(a: Short) -> Self {
        Address::Short(a)
    }
}

impl From<Group> for Address {
    fn from(a: Group) -> Self {
        Address::Group(a)
    }
}

impl std::convert::TryFrom<Address> for Short {
    type Error = AddressError;
    fn try_from(addr: Address) -> Result<Short, Self::Error> {
        if let Address::Short(s) = addr {
            Ok(s)
        } else {
            Err(AddressError::NotShort)
        }
    }
}

impl std::convert::TryFrom<Address> for Group {
    type Error = AddressError;
    fn try_from(addr: Address) -> Result<Group, Self::Error> {
        if let Address::Group(g) = addr {
            Ok(g)
        } else {
            Err(AddressError::NotGroup)
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        match self {
            Address::Short(a) => write!(fmt, "device {}", a),
            Address::Group(g) => write!(fmt, "group {}", g),
            Address::Broadcast => write!(fmt, "broadcast"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn short_range() {
        assert_eq!(Short::new(0).unwrap().value(), 0);
        assert_eq!(Short::new(63).unwrap().value(), 63);
        assert_eq!(Short::new(64), Err(AddressError::InvalidAddress));
        assert_eq!("70".parse::<Short>(), Err(AddressError::InvalidAddress));
        assert_eq!("12".parse::<Short>().unwrap().value(), 12);
        assert_eq!(Short::all().count(), 64);
    }

    #[test]
    fn address_conversions() {
        let a = Address::from(Short::new(5).unwrap());
        assert_eq!(Short::try_from(a).unwrap().value(), 5);
        assert_eq!(Group::try_from(a), Err(AddressError::NotGroup));
        assert_eq!(
            Short::try_from(Address::Broadcast),
            Err(AddressError::NotShort)
        );
    }
}

use crate::base::address::{Group, Short};
use crate::protocol::reply::ErrorCode;

/// Configuration value a `c` command commits from the transfer
/// register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigTarget {
    MinLevel,
    MaxLevel,
    SystemFailureLevel,
    PowerOnLevel,
    FadeTime,
    FadeRate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceCmd {
    On(Short),
    Off(Short),
    Arc(Short, u8),
    Info(Short),
    InfoAll,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupCmd {
    On(Group),
    Off(Group),
    Arc(Group, u8),
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BusCmd {
    On,
    Off,
    Arc(u8),
    List,
    Scan,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemapCmd {
    All,
    Unaddressed,
    From(Short),
    Move(Short, Short),
    Progress,
    Abort,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigCmd {
    Set(ConfigTarget, Short, u8),
    Reset(Short, u8),
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestCmd {
    /// `t1` is reserved; the dispatcher reports it as not implemented.
    Reserved,
}

/// One parsed command line. The first character picked the family,
/// the second the sub-command; numeric fields are already converted
/// and range checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Device(DeviceCmd),
    Group(GroupCmd),
    Bus(BusCmd),
    Remap(RemapCmd),
    Config(ConfigCmd),
    Test(TestCmd),
    Help,
}

impl Command {
    /// Parse a framed line (terminator already stripped). Unknown
    /// family or sub-command characters are syntax errors; address
    /// fields outside 0..=63 report an address error.
    pub fn parse(line: &[u8]) -> Result<Command, ErrorCode> {
        match line.first() {
            Some(b'd') => DeviceCmd::parse(line).map(Command::Device),
            Some(b'g') => GroupCmd::parse(line).map(Command::Group),
            Some(b'b') => BusCmd::parse(line).map(Command::Bus),
            Some(b'r') => RemapCmd::parse(line).map(Command::Remap),
            Some(b'c') => ConfigCmd::parse(line).map(Command::Config),
            Some(b't') => TestCmd::parse(line).map(Command::Test),
            Some(b'?') => Ok(Command::Help),
            _ => Err(ErrorCode::InvalidCommand),
        }
    }
}

/// Fixed width decimal field starting at byte `at`. Digits accumulate
/// until the first non-digit or the end of the line; no digit at all
/// yields 0 (deliberate leniency, the wire contract since the first
/// firmware). Values wider than a byte wrap.
fn field(line: &[u8], at: usize, width: usize) -> u8 {
    let mut v: u32 = 0;
    for i in at..at + width {
        match line.get(i) {
            Some(c) if c.is_ascii_digit() => v = v * 10 + u32::from(c - b'0'),
            _ => break,
        }
    }
    v as u8
}

fn short_field(line: &[u8], at: usize) -> Result<Short, ErrorCode> {
    Short::new(field(line, at, 2)).map_err(|_| ErrorCode::InvalidAddress)
}

fn group_field(line: &[u8], at: usize) -> Result<Group, ErrorCode> {
    Group::new(field(line, at, 2)).map_err(|_| ErrorCode::InvalidAddress)
}

impl DeviceCmd {
    fn parse(line: &[u8]) -> Result<DeviceCmd, ErrorCode> {
        match line.get(1) {
            Some(b'1') => Ok(DeviceCmd::On(short_field(line, 2)?)),
            Some(b'0') => Ok(DeviceCmd::Off(short_field(line, 2)?)),
            Some(b'a') => Ok(DeviceCmd::Arc(short_field(line, 2)?, field(line, 4, 3))),
            Some(b'i') => match line.get(2) {
                Some(b'a') => Ok(DeviceCmd::InfoAll),
                _ => Ok(DeviceCmd::Info(short_field(line, 2)?)),
            },
            Some(b'?') => Ok(DeviceCmd::Help),
            _ => Err(ErrorCode::InvalidCommand),
        }
    }
}

impl GroupCmd {
    fn parse(line: &[u8]) -> Result<GroupCmd, ErrorCode> {
        match line.get(1) {
            Some(b'1') => Ok(GroupCmd::On(group_field(line, 2)?)),
            Some(b'0') => Ok(GroupCmd::Off(group_field(line, 2)?)),
            Some(b'a') => Ok(GroupCmd::Arc(group_field(line, 2)?, field(line, 4, 3))),
            Some(b'?') => Ok(GroupCmd::Help),
            _ => Err(ErrorCode::InvalidCommand),
        }
    }
}

impl BusCmd {
    fn parse(line: &[u8]) -> Result<BusCmd, ErrorCode> {
        match line.get(1) {
            Some(b'1') => Ok(BusCmd::On),
            Some(b'0') => Ok(BusCmd::Off),
            Some(b'a') => Ok(BusCmd::Arc(field(line, 2, 3))),
            Some(b'l') => Ok(BusCmd::List),
            Some(b's') => Ok(BusCmd::Scan),
            Some(b'?') => Ok(BusCmd::Help),
            _ => Err(ErrorCode::InvalidCommand),
        }
    }
}

impl RemapCmd {
    fn parse(line: &[u8]) -> Result<RemapCmd, ErrorCode> {
        match line.get(1) {
            Some(b'a') => Ok(RemapCmd::All),
            Some(b'u') => Ok(RemapCmd::Unaddressed),
            Some(b's') => Ok(RemapCmd::From(short_field(line, 2)?)),
            Some(b'm') => Ok(RemapCmd::Move(
                short_field(line, 2)?,
                short_field(line, 4)?,
            )),
            Some(b'p') => Ok(RemapCmd::Progress),
            Some(b'A') => Ok(RemapCmd::Abort),
            Some(b'?') => Ok(RemapCmd::Help),
            _ => Err(ErrorCode::InvalidCommand),
        }
    }
}

impl ConfigCmd {
    fn parse(line: &[u8]) -> Result<ConfigCmd, ErrorCode> {
        let target = match line.get(1) {
            Some(b'm') => ConfigTarget::MinLevel,
            Some(b'x') => ConfigTarget::MaxLevel,
            Some(b'f') => ConfigTarget::SystemFailureLevel,
            Some(b'p') => ConfigTarget::PowerOnLevel,
            Some(b't') => ConfigTarget::FadeTime,
            Some(b'r') => ConfigTarget::FadeRate,
            Some(b'z') => {
                return Ok(ConfigCmd::Reset(short_field(line, 2)?, field(line, 4, 3)))
            }
            Some(b'?') => return Ok(ConfigCmd::Help),
            _ => return Err(ErrorCode::InvalidCommand),
        };
        Ok(ConfigCmd::Set(target, short_field(line, 2)?, field(line, 4, 3)))
    }
}

impl TestCmd {
    fn parse(line: &[u8]) -> Result<TestCmd, ErrorCode> {
        match line.get(1) {
            Some(b'1') => Ok(TestCmd::Reserved),
            _ => Err(ErrorCode::InvalidCommand),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn short(a: u8) -> Short {
        Short::new(a).unwrap()
    }

    fn group(g: u8) -> Group {
        Group::new(g).unwrap()
    }

    #[test]
    fn device_commands() {
        assert_eq!(
            Command::parse(b"d105"),
            Ok(Command::Device(DeviceCmd::On(short(5))))
        );
        assert_eq!(
            Command::parse(b"d063"),
            Ok(Command::Device(DeviceCmd::Off(short(63))))
        );
        assert_eq!(
            Command::parse(b"da12200"),
            Ok(Command::Device(DeviceCmd::Arc(short(12), 200)))
        );
        assert_eq!(
            Command::parse(b"di07"),
            Ok(Command::Device(DeviceCmd::Info(short(7))))
        );
        assert_eq!(Command::parse(b"dia"), Ok(Command::Device(DeviceCmd::InfoAll)));
        assert_eq!(Command::parse(b"d?"), Ok(Command::Device(DeviceCmd::Help)));
        assert_eq!(Command::parse(b"dz"), Err(ErrorCode::InvalidCommand));
    }

    #[test]
    fn group_and_bus_commands() {
        assert_eq!(
            Command::parse(b"g112"),
            Ok(Command::Group(GroupCmd::On(group(12))))
        );
        assert_eq!(
            Command::parse(b"ga03128"),
            Ok(Command::Group(GroupCmd::Arc(group(3), 128)))
        );
        assert_eq!(Command::parse(b"b1"), Ok(Command::Bus(BusCmd::On)));
        assert_eq!(Command::parse(b"b0"), Ok(Command::Bus(BusCmd::Off)));
        assert_eq!(Command::parse(b"ba100"), Ok(Command::Bus(BusCmd::Arc(100))));
        assert_eq!(Command::parse(b"bl"), Ok(Command::Bus(BusCmd::List)));
        assert_eq!(Command::parse(b"bs"), Ok(Command::Bus(BusCmd::Scan)));
    }

    #[test]
    fn remap_commands() {
        assert_eq!(Command::parse(b"ra"), Ok(Command::Remap(RemapCmd::All)));
        assert_eq!(
            Command::parse(b"ru"),
            Ok(Command::Remap(RemapCmd::Unaddressed))
        );
        assert_eq!(
            Command::parse(b"rs12"),
            Ok(Command::Remap(RemapCmd::From(short(12))))
        );
        assert_eq!(
            Command::parse(b"rm0510"),
            Ok(Command::Remap(RemapCmd::Move(short(5), short(10))))
        );
        assert_eq!(Command::parse(b"rp"), Ok(Command::Remap(RemapCmd::Progress)));
        assert_eq!(Command::parse(b"rA"), Ok(Command::Remap(RemapCmd::Abort)));
    }

    #[test]
    fn config_commands() {
        assert_eq!(
            Command::parse(b"cm05100"),
            Ok(Command::Config(ConfigCmd::Set(
                ConfigTarget::MinLevel,
                short(5),
                100
            )))
        );
        assert_eq!(
            Command::parse(b"cr63007"),
            Ok(Command::Config(ConfigCmd::Set(
                ConfigTarget::FadeRate,
                short(63),
                7
            )))
        );
        assert_eq!(
            Command::parse(b"cz05"),
            Ok(Command::Config(ConfigCmd::Reset(short(5), 0)))
        );
    }

    #[test]
    fn test_family() {
        assert_eq!(Command::parse(b"t1"), Ok(Command::Test(TestCmd::Reserved)));
        assert_eq!(Command::parse(b"t2"), Err(ErrorCode::InvalidCommand));
        assert_eq!(Command::parse(b"t"), Err(ErrorCode::InvalidCommand));
    }

    #[test]
    fn unknown_family_is_syntax_error() {
        for line in [&b"x105"[..], b"Q", b"", b" d1"] {
            assert_eq!(Command::parse(line), Err(ErrorCode::InvalidCommand));
        }
    }

    #[test]
    fn address_range_checked() {
        assert_eq!(Command::parse(b"d164"), Err(ErrorCode::InvalidAddress));
        assert_eq!(Command::parse(b"rm7005"), Err(ErrorCode::InvalidAddress));
        assert_eq!(Command::parse(b"rm0570"), Err(ErrorCode::InvalidAddress));
        assert_eq!(Command::parse(b"cm99000"), Err(ErrorCode::InvalidAddress));
    }

    #[test]
    fn malformed_digits_read_as_zero() {
        assert_eq!(
            Command::parse(b"d1xx"),
            Ok(Command::Device(DeviceCmd::On(short(0))))
        );
        assert_eq!(
            Command::parse(b"d1"),
            Ok(Command::Device(DeviceCmd::On(short(0))))
        );
        // A digit followed by junk keeps the digits seen so far.
        assert_eq!(
            Command::parse(b"d15x"),
            Ok(Command::Device(DeviceCmd::On(short(5))))
        );
    }

    #[test]
    fn wide_values_wrap() {
        assert_eq!(
            Command::parse(b"da05999"),
            Ok(Command::Device(DeviceCmd::Arc(short(5), 231)))
        );
    }
}

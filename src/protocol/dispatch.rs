use crate::base::address::{Address, Short};
use crate::defs::cmd;
use crate::drivers::driver::{BusDriver, RemapMode, SendResult};
use crate::protocol::command::{
    BusCmd, Command, ConfigCmd, ConfigTarget, DeviceCmd, GroupCmd, RemapCmd, TestCmd,
};
use crate::protocol::presence;
use crate::protocol::reply::{encode_success, Coding, ErrorCode, Payload, Reply};
use crate::store::NvStore;
use log::{debug, warn};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

// Pause between info lines when walking all 64 addresses, so a slow
// reader on the other end can keep up.
const INFO_PACE: Duration = Duration::from_millis(50);

const HELP_MAIN: &[&str] = &[
    "========================== HELP ==========================",
    "    d:Device | g:Group | b:Bus | r:Remap | c:Configure",
    "==========================================================",
];

const HELP_DEVICE: &[&str] = &[
    "================================= DEVICE HELP ================================",
    "1XX:ON | 0XX:OFF | aYYY:ARC | iXX:Info (Specific Slave) | ia:Info (All Slaves)",
    "               XX = Slave ID 0-63 | YYY = ARC Brightness 0-254                ",
    "==============================================================================",
];

const HELP_GROUP: &[&str] = &[
    "================================= GROUP HELP =================================",
    "                          1XX:ON | 0XX:OFF | aYYY:ARC                         ",
    "               XX = Slave ID 0-63 | YYY = ARC Brightness 0-254                ",
    "==============================================================================",
];

const HELP_BUS: &[&str] = &[
    "================================== BUS HELP ==================================",
    "         1XX:ON | 0XX:OFF | aYYY:ARC | l:List Slaves | s:Scan Slaves          ",
    "               XX = Slave ID 0-63 | YYY = ARC Brightness 0-254                ",
    "==============================================================================",
];

const HELP_REMAP: &[&str] = &[
    "=============================================== REMAP HELP ================================================",
    " a:Remap All | u:Remap Unknown | p:Remap Progress | sXX:Remap All From | mYYZZ:Move Slave | A:Abort Remap ",
    "                    XX = Start Slave ID 0-63 | YY = Current Slave ID | ZZ = New Slave ID                   ",
    "===========================================================================================================",
];

const HELP_CONFIG: &[&str] = &[
    "====================================================== CONFIG HELP =======================================================",
    " mXXYYY:MIN Level | xXXYYY:MAX Level | fXXYYY:SYSFAIL Level | pXXYYY:PWRFAIL Level | tXXYYY:Fade Time | rXXYYY:Fade Rate ",
    "                                                   zXX:Reset Driver                                                      ",
    "                                          XX = Start Slave ID 0-63 | YYY = Value                                         ",
    "=========================================================================================================================",
];

/// Run one framed command line against the bus. `out` is only written
/// for responses the normal encoding pass does not cover: help menus,
/// info lines and the remap pre-acknowledgment.
pub async fn execute<W>(
    line: &[u8],
    driver: &mut dyn BusDriver,
    store: &mut dyn NvStore,
    out: &mut W,
) -> io::Result<Reply>
where
    W: AsyncWrite + Unpin,
{
    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(code) => return Ok(Reply::Error(code)),
    };
    debug!("dispatch {:?}", command);
    match command {
        Command::Device(c) => device_cmd(c, driver, out).await,
        Command::Group(c) => group_cmd(c, driver, out).await,
        Command::Bus(c) => bus_cmd(c, driver, store, out).await,
        Command::Remap(c) => remap_cmd(c, driver, out).await,
        Command::Config(c) => config_cmd(c, driver, out).await,
        Command::Test(TestCmd::Reserved) => Ok(Reply::Error(ErrorCode::NotImplemented)),
        Command::Help => {
            write_lines(out, HELP_MAIN).await?;
            Ok(Reply::Error(ErrorCode::Help))
        }
    }
}

// Driver trouble has no code of its own on the wire; report it as the
// driver failure family.
fn flatten(res: SendResult) -> Result<(), ErrorCode> {
    match res {
        SendResult::Ok => Ok(()),
        SendResult::Timeout => Err(ErrorCode::Timeout),
        SendResult::DriverError(e) => {
            warn!("bus driver error: {}", e);
            Err(ErrorCode::Timeout)
        }
    }
}

fn reply_from(res: SendResult) -> Reply {
    match flatten(res) {
        Ok(()) => Reply::empty(),
        Err(code) => Reply::Error(code),
    }
}

async fn query_byte(
    driver: &mut dyn BusDriver,
    opcode: u8,
    addr: Address,
) -> Result<u8, ErrorCode> {
    flatten(driver.send_command(opcode, addr).await)?;
    driver.get_reply().ok_or(ErrorCode::Timeout)
}

// One line of device configuration: address, the four stored levels
// and the fade byte in hex.
async fn info_line(driver: &mut dyn BusDriver, dev: Short) -> Result<String, ErrorCode> {
    let addr = Address::Short(dev);
    let min = query_byte(driver, cmd::QUERY_MIN_LEVEL, addr).await?;
    let max = query_byte(driver, cmd::QUERY_MAX_LEVEL, addr).await?;
    let sysfail = query_byte(driver, cmd::QUERY_SYSTEM_FAILURE_LEVEL, addr).await?;
    let poweron = query_byte(driver, cmd::QUERY_POWER_ON_LEVEL, addr).await?;
    let fade = query_byte(driver, cmd::QUERY_FADE_TIME_RATE, addr).await?;
    Ok(format!(
        "{} {} {} {} {} {:X}",
        dev, min, max, sysfail, poweron, fade
    ))
}

async fn device_cmd<W>(
    command: DeviceCmd,
    driver: &mut dyn BusDriver,
    out: &mut W,
) -> io::Result<Reply>
where
    W: AsyncWrite + Unpin,
{
    if driver.status().busy() {
        return Ok(Reply::Error(ErrorCode::BusBusy));
    }
    match command {
        DeviceCmd::On(dev) => Ok(reply_from(
            driver
                .send_command(cmd::RECALL_MAX_LEVEL, dev.into())
                .await,
        )),
        DeviceCmd::Off(dev) => Ok(reply_from(driver.send_command(cmd::OFF, dev.into()).await)),
        DeviceCmd::Arc(dev, level) => {
            Ok(reply_from(driver.send_direct(level, dev.into()).await))
        }
        DeviceCmd::Info(dev) => match info_line(driver, dev).await {
            Ok(line) => {
                write_lines(out, &[line.as_str()]).await?;
                Ok(Reply::empty())
            }
            Err(code) => Ok(Reply::Error(code)),
        },
        DeviceCmd::InfoAll => {
            for dev in Short::all() {
                // Anything that does not answer the device type query
                // with a positive type is skipped.
                let device_type =
                    match query_byte(driver, cmd::QUERY_DEVICE_TYPE, Address::Short(dev)).await {
                        Ok(t) => t as i8,
                        Err(_) => continue,
                    };
                if device_type <= 0 {
                    continue;
                }
                match info_line(driver, dev).await {
                    Ok(line) => write_lines(out, &[line.as_str()]).await?,
                    Err(_) => continue,
                }
                tokio::time::sleep(INFO_PACE).await;
            }
            Ok(Reply::empty())
        }
        DeviceCmd::Help => {
            write_lines(out, HELP_DEVICE).await?;
            Ok(Reply::Error(ErrorCode::Help))
        }
    }
}

async fn group_cmd<W>(
    command: GroupCmd,
    driver: &mut dyn BusDriver,
    out: &mut W,
) -> io::Result<Reply>
where
    W: AsyncWrite + Unpin,
{
    if driver.status().busy() {
        return Ok(Reply::Error(ErrorCode::BusBusy));
    }
    match command {
        GroupCmd::On(group) => Ok(reply_from(
            driver
                .send_command(cmd::RECALL_MAX_LEVEL, group.into())
                .await,
        )),
        GroupCmd::Off(group) => {
            Ok(reply_from(driver.send_command(cmd::OFF, group.into()).await))
        }
        GroupCmd::Arc(group, level) => {
            Ok(reply_from(driver.send_direct(level, group.into()).await))
        }
        GroupCmd::Help => {
            write_lines(out, HELP_GROUP).await?;
            Ok(Reply::Error(ErrorCode::Help))
        }
    }
}

fn bitmap_payload(slaves: &[u8; 8]) -> Payload {
    let mut payload = Payload::new();
    for byte in slaves {
        for bit in 0..8 {
            payload.push((byte >> bit) & 1);
        }
    }
    payload
}

async fn bus_cmd<W>(
    command: BusCmd,
    driver: &mut dyn BusDriver,
    store: &mut dyn NvStore,
    out: &mut W,
) -> io::Result<Reply>
where
    W: AsyncWrite + Unpin,
{
    if driver.status().busy() {
        return Ok(Reply::Error(ErrorCode::BusBusy));
    }
    match command {
        BusCmd::On => Ok(reply_from(
            driver
                .send_command(cmd::RECALL_MAX_LEVEL, Address::Broadcast)
                .await,
        )),
        BusCmd::Off => Ok(reply_from(
            driver.send_command(cmd::OFF, Address::Broadcast).await,
        )),
        BusCmd::Arc(level) => Ok(reply_from(
            driver.send_direct(level, Address::Broadcast).await,
        )),
        BusCmd::List => {
            let slaves = presence::retrieve_slaves(store, driver);
            Ok(Reply::text(bitmap_payload(&slaves)))
        }
        BusCmd::Scan => {
            if let Err(code) = flatten(driver.list_dev().await) {
                return Ok(Reply::Error(code));
            }
            // Persist what the scan found, then render like `l`.
            presence::store_slaves(store, &driver.slaves());
            let slaves = presence::retrieve_slaves(store, driver);
            Ok(Reply::text(bitmap_payload(&slaves)))
        }
        BusCmd::Help => {
            write_lines(out, HELP_BUS).await?;
            Ok(Reply::Error(ErrorCode::Help))
        }
    }
}

// Remap operations that kick off a long running driver call.
enum RemapStart {
    All,
    Unaddressed,
    From(Short),
    Move(Short, Short),
}

async fn begin_remap<W>(
    driver: &mut dyn BusDriver,
    out: &mut W,
    op: RemapStart,
) -> io::Result<Reply>
where
    W: AsyncWrite + Unpin,
{
    if driver.status().busy() {
        return Ok(Reply::Error(ErrorCode::BusBusy));
    }
    // Acknowledge before the long call; from here on the progress
    // query is the status channel and no further frame is encoded.
    out.write_all(&encode_success(&Payload::new(), Coding::Text))
        .await?;
    out.flush().await?;
    let res = match op {
        RemapStart::All => {
            driver.clear_devices_found();
            driver.remap(RemapMode::All).await
        }
        RemapStart::Unaddressed => {
            driver.clear_devices_found();
            driver.remap(RemapMode::MissShort).await
        }
        RemapStart::From(start) => {
            driver.clear_devices_found();
            driver.remap_static(start, RemapMode::All).await
        }
        RemapStart::Move(from, to) => driver.remap_move(from, to, RemapMode::All).await,
    };
    if let Err(e) = res.check_send() {
        warn!("remap failed: {}", e);
    }
    Ok(Reply::Deferred)
}

async fn remap_cmd<W>(
    command: RemapCmd,
    driver: &mut dyn BusDriver,
    out: &mut W,
) -> io::Result<Reply>
where
    W: AsyncWrite + Unpin,
{
    match command {
        RemapCmd::All => begin_remap(driver, out, RemapStart::All).await,
        RemapCmd::Unaddressed => begin_remap(driver, out, RemapStart::Unaddressed).await,
        RemapCmd::From(start) => begin_remap(driver, out, RemapStart::From(start)).await,
        RemapCmd::Move(from, to) => begin_remap(driver, out, RemapStart::Move(from, to)).await,
        RemapCmd::Progress => {
            let percent = if driver.status().busy() {
                (u16::from(driver.devices_found()) * 100 / 64) as u8
            } else {
                100
            };
            Ok(Reply::text(Payload::from_slice(&[percent])))
        }
        RemapCmd::Abort => {
            driver.abort_remap();
            Ok(Reply::empty())
        }
        RemapCmd::Help => {
            write_lines(out, HELP_REMAP).await?;
            Ok(Reply::Error(ErrorCode::Help))
        }
    }
}

async fn stage_and_commit(driver: &mut dyn BusDriver, dev: Short, data: u8, opcode: u8) -> Reply {
    if let Err(code) = flatten(driver.send_ext_command(cmd::EXT_DTR0, data).await) {
        return Reply::Error(code);
    }
    reply_from(driver.send_command(opcode, dev.into()).await)
}

async fn config_cmd<W>(
    command: ConfigCmd,
    driver: &mut dyn BusDriver,
    out: &mut W,
) -> io::Result<Reply>
where
    W: AsyncWrite + Unpin,
{
    if driver.status().busy() {
        return Ok(Reply::Error(ErrorCode::BusBusy));
    }
    match command {
        ConfigCmd::Set(target, dev, data) => {
            let opcode = match target {
                ConfigTarget::MinLevel => cmd::SET_MIN_LEVEL,
                ConfigTarget::MaxLevel => cmd::SET_MAX_LEVEL,
                ConfigTarget::SystemFailureLevel => cmd::SET_SYSTEM_FAILURE_LEVEL,
                ConfigTarget::PowerOnLevel => cmd::SET_POWER_ON_LEVEL,
                ConfigTarget::FadeTime => cmd::SET_FADE_TIME,
                ConfigTarget::FadeRate => cmd::SET_FADE_RATE,
            };
            Ok(stage_and_commit(driver, dev, data, opcode).await)
        }
        ConfigCmd::Reset(dev, data) => Ok(stage_and_commit(driver, dev, data, cmd::RESET).await),
        ConfigCmd::Help => {
            write_lines(out, HELP_CONFIG).await?;
            Ok(Reply::Error(ErrorCode::Help))
        }
    }
}

async fn write_lines<W>(out: &mut W, lines: &[&str]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    for line in lines {
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\r\n").await?;
    }
    out.flush().await
}

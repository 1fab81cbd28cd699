use dali::config::GatewayConfig;
use dali::drivers::driver::OpenError;
use dali::protocol::session::Session;
use dali::store::{FileStore, MemStore, NvStore};
use dali_gateway as dali;
use std::process::ExitCode;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::StreamExt;

extern crate clap;
use clap::{Arg, Command};

#[cfg(feature = "serial")]
use tokio_serial::SerialPortBuilderExt;

async fn serve_tcp(session: &mut Session, addr: &str) -> ExitCode {
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to listen on {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    println!("Listening on {}", addr);
    let mut incoming = TcpListenerStream::new(listener);
    // One connection at a time; the bus has no way to interleave
    // commands from several masters anyway.
    while let Some(conn) = incoming.next().await {
        match conn {
            Ok(mut socket) => {
                if let Ok(peer) = socket.peer_addr() {
                    println!("Connection from {}", peer);
                }
                let (reader, writer) = socket.split();
                if let Err(e) = session.serve(reader, writer).await {
                    eprintln!("Connection failed: {}", e);
                }
            }
            Err(e) => eprintln!("Accept failed: {}", e),
        }
    }
    ExitCode::SUCCESS
}

#[cfg(feature = "serial")]
async fn serve_serial(session: &mut Session, port: &str, baud: u32, parity: Option<&str>) -> ExitCode {
    let parity = match parity {
        None | Some("none") => tokio_serial::Parity::None,
        Some("odd") => tokio_serial::Parity::Odd,
        Some("even") => tokio_serial::Parity::Even,
        Some(p) => {
            eprintln!("Unknown parity '{}'", p);
            return ExitCode::FAILURE;
        }
    };
    let stream = match tokio_serial::new(port, baud).parity(parity).open_native_async() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open serial port '{}': {}", port, e);
            return ExitCode::FAILURE;
        }
    };
    println!("Serving {}", port);
    let (reader, writer) = tokio::io::split(stream);
    if let Err(e) = session.serve(reader, writer).await {
        eprintln!("Serial link failed: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn serve_stdio(session: &mut Session) -> ExitCode {
    let reader = tokio::io::stdin();
    let writer = tokio::io::stdout();
    if let Err(e) = session.serve(reader, writer).await {
        eprintln!("Session failed: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    if let Err(e) = dali::drivers::init() {
        println!("Failed to initialize DALI drivers: {}", e);
    }
    let args = Command::new("dali_gateway")
        .about("Line based command front end for a DALI bus")
        .arg(
            Arg::new("CONFIG")
                .short('c')
                .long("config")
                .help("Read settings from a JSON file"),
        )
        .arg(
            Arg::new("DEVICE")
                .short('d')
                .long("device")
                .help("Select DALI-device (default: first registered driver)"),
        )
        .arg(
            Arg::new("NVM")
                .long("nvm")
                .help("File backing the non-volatile store"),
        )
        .arg(
            Arg::new("LISTEN")
                .short('l')
                .long("listen")
                .help("Serve connections on this TCP address"),
        );
    #[cfg(feature = "serial")]
    let args = args
        .arg(
            Arg::new("PORT")
                .short('p')
                .long("port")
                .help("Serve this serial port"),
        )
        .arg(
            Arg::new("BAUD")
                .long("baud")
                .value_parser(clap::value_parser!(u32))
                .help("Serial baud rate (default 115200)"),
        )
        .arg(
            Arg::new("PARITY")
                .long("parity")
                .help("Serial parity: none, odd or even"),
        );
    let matches = args.get_matches();

    let mut config = match matches.get_one::<String>("CONFIG") {
        Some(path) => match GatewayConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to read config '{}': {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => GatewayConfig::default(),
    };
    // Switches override the configuration file.
    if let Some(v) = matches.get_one::<String>("DEVICE") {
        config.device = Some(v.clone());
    }
    if let Some(v) = matches.get_one::<String>("NVM") {
        config.nvm = Some(v.clone());
    }
    if let Some(v) = matches.get_one::<String>("LISTEN") {
        config.listen = Some(v.clone());
    }
    #[cfg(feature = "serial")]
    {
        if let Some(v) = matches.get_one::<String>("PORT") {
            config.port = Some(v.clone());
        }
        if let Some(v) = matches.get_one::<u32>("BAUD") {
            config.baud = Some(*v);
        }
        if let Some(v) = matches.get_one::<String>("PARITY") {
            config.parity = Some(v.clone());
        }
    }

    let device_name = config.device.as_deref().unwrap_or("default");
    let driver = match dali::drivers::open(device_name) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Failed to open DALI device '{}': {}", device_name, e);
            if let OpenError::NotFound = e {
                println!("Available drivers:");
                for name in dali::drivers::driver_names() {
                    println!("  {}", name);
                }
            }
            return ExitCode::FAILURE;
        }
    };

    let store: Box<dyn NvStore> = match &config.nvm {
        Some(path) => match FileStore::open(path) {
            Ok(s) => Box::new(s),
            Err(e) => {
                eprintln!("Failed to open store '{}': {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(MemStore::new()),
    };
    let mut session = Session::new(driver, store);

    #[cfg(feature = "serial")]
    if let Some(port) = config.port.clone() {
        return serve_serial(
            &mut session,
            &port,
            config.baud.unwrap_or(115200),
            config.parity.as_deref(),
        )
        .await;
    }
    #[cfg(not(feature = "serial"))]
    if config.port.is_some() {
        eprintln!("Serial support not built in, ignoring port setting");
    }
    if let Some(addr) = config.listen.clone() {
        return serve_tcp(&mut session, &addr).await;
    }
    serve_stdio(&mut session).await
}

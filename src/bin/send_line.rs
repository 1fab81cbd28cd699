use std::process::ExitCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

extern crate clap;
use clap::{value_parser, Arg, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let matches = Command::new("send_line")
        .about("Send one command line to a running gateway and print the replies.")
        .arg(
            Arg::new("LINE")
                .required(true)
                .help("Command line to send, e.g. 'd105'"),
        )
        .arg(
            Arg::new("CONNECT")
                .short('c')
                .long("connect")
                .default_value("127.0.0.1:5523")
                .help("Gateway TCP address"),
        )
        .arg(
            Arg::new("WAIT")
                .short('w')
                .long("wait")
                .value_parser(value_parser!(u64))
                .default_value("500")
                .help("How long to wait for further output, in milliseconds"),
        )
        .get_matches();

    let line = matches.get_one::<String>("LINE").unwrap();
    let addr = matches.get_one::<String>("CONNECT").unwrap();
    let wait = Duration::from_millis(*matches.get_one::<u64>("WAIT").unwrap());

    let mut stream = match TcpStream::connect(addr).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = stream.write_all(line.as_bytes()).await {
        eprintln!("Send failed: {}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = stream.write_all(b"\r\n").await {
        eprintln!("Send failed: {}", e);
        return ExitCode::FAILURE;
    }

    // Keep printing until the gateway goes quiet. Help menus and info
    // listings span several lines.
    let mut buf = [0u8; 256];
    loop {
        match timeout(wait, stream.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => print!("{}", String::from_utf8_lossy(&buf[..n])),
            Ok(Err(e)) => {
                eprintln!("Read failed: {}", e);
                return ExitCode::FAILURE;
            }
            Err(_) => break,
        }
    }
    ExitCode::SUCCESS
}

use crate::drivers::driver::BusDriver;
use crate::protocol::dispatch;
use crate::protocol::framer::LineFramer;
use crate::protocol::presence;
use crate::protocol::reply::{encode_error, encode_success, Reply};
use crate::store::NvStore;
use log::debug;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// One command session: a bus driver, the non-volatile store and the
/// line framer, serving byte streams one at a time.
pub struct Session {
    driver: Box<dyn BusDriver>,
    store: Box<dyn NvStore>,
    framer: LineFramer,
}

impl Session {
    pub fn new(driver: Box<dyn BusDriver>, store: Box<dyn NvStore>) -> Session {
        let mut session = Session {
            driver,
            store,
            framer: LineFramer::new(),
        };
        // Hand the driver the last known presence map so list works
        // before the first scan.
        presence::retrieve_slaves(&*session.store, &mut *session.driver);
        session
    }

    /// Serve one byte stream until it ends. Bus and store state carry
    /// over to the next stream, partial input does not.
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let Session {
            driver,
            store,
            framer,
        } = self;
        framer.reset();
        let mut buf = [0u8; 256];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                debug!("stream closed");
                return Ok(());
            }
            for &byte in &buf[..n] {
                let line = match framer.push(byte) {
                    Some(line) => line,
                    None => continue,
                };
                let reply =
                    dispatch::execute(line, &mut **driver, &mut **store, &mut writer).await?;
                match reply {
                    Reply::Success { payload, coding } => {
                        writer.write_all(&encode_success(&payload, coding)).await?;
                        writer.flush().await?;
                    }
                    Reply::Error(code) => {
                        writer.write_all(&encode_error(code)).await?;
                        writer.flush().await?;
                    }
                    Reply::Deferred => {}
                }
            }
        }
    }
}

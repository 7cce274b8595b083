use crate::wol::{AddressFamily, DatagramSocket, Error, SocketFactory};
use log::info;

pub struct LogOnlyFactory;

impl SocketFactory for LogOnlyFactory {
    type Socket = LogOnlySocket;

    fn open(&self, family: AddressFamily) -> Result<LogOnlySocket, Error> {
        info!("faking {} socket", family);
        Ok(LogOnlySocket)
    }
}

pub struct LogOnlySocket;

impl DatagramSocket for LogOnlySocket {
    fn bind(&self, host: &str, port: u16) -> Result<(), Error> {
        info!("faking bind to {}:{}", host, port);
        Ok(())
    }
    fn set_broadcast(&self, on: bool) -> Result<(), Error> {
        info!("faking broadcast={}", on);
        Ok(())
    }
    fn connect(&self, host: &str, port: u16) -> Result<(), Error> {
        info!("faking connect to {}:{}", host, port);
        Ok(())
    }
    fn send(&self, buf: &[u8]) -> Result<usize, Error> {
        info!("faking send of {} bytes", buf.len());
        Ok(buf.len())
    }
}

impl Drop for LogOnlySocket {
    fn drop(&mut self) {
        info!("faking close");
    }
}

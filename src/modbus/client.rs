use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tokio_modbus::client::{tcp, Context, Reader};
use tokio_modbus::slave::Slave;
use tracing::debug;

use crate::modbus::{ReadError, RegisterTransport};

/// Per-call bound on connects and reads.
pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ModbusClient {
    addr: SocketAddr,
    unit: Slave,
    client: Option<Context>,
}

impl ModbusClient {
    pub async fn new(addr: SocketAddr, unit: u8) -> Result<Self, ReadError> {
        let mut cli = Self {
            addr,
            unit: Slave(unit),
            client: None,
        };
        cli.connect().await?;
        Ok(cli)
    }

    fn context(&mut self) -> Result<&mut Context, ReadError> {
        self.client.as_mut().ok_or(ReadError::NotConnected)
    }
}

async fn bounded<F>(request: F) -> Result<Vec<u16>, ReadError>
where
    F: Future<Output = tokio_modbus::Result<Vec<u16>>>,
{
    match timeout(IO_TIMEOUT, request).await {
        Err(_) => Err(ReadError::Timeout),
        Ok(Err(tokio_modbus::Error::Transport(e))) => Err(ReadError::Transport(e)),
        Ok(Err(e)) => Err(ReadError::Protocol(e.to_string())),
        Ok(Ok(Err(code))) => Err(ReadError::Exception(format!("{code:?}"))),
        Ok(Ok(Ok(words))) => Ok(words),
    }
}

#[async_trait]
impl RegisterTransport for ModbusClient {
    async fn read_input_registers(&mut self, addr: u16, count: u16) -> Result<Vec<u16>, ReadError> {
        let ctx = self.context()?;
        bounded(ctx.read_input_registers(addr, count)).await
    }

    async fn read_holding_registers(
        &mut self,
        addr: u16,
        count: u16,
    ) -> Result<Vec<u16>, ReadError> {
        let ctx = self.context()?;
        bounded(ctx.read_holding_registers(addr, count)).await
    }

    async fn connect(&mut self) -> Result<(), ReadError> {
        debug!(addr = %self.addr, unit = self.unit.0, "connecting to modbus device");
        let ctx = timeout(IO_TIMEOUT, tcp::connect_slave(self.addr, self.unit))
            .await
            .map_err(|_| ReadError::Timeout)??;
        self.client = Some(ctx);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ReadError> {
        // Dropping the context closes the TCP stream.
        if self.client.take().is_some() {
            debug!(addr = %self.addr, "modbus connection closed");
        }
        Ok(())
    }
}

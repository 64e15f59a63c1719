use tracing::warn;

use crate::modbus::{ReadError, RegisterTransport, RegisterType};

/// Single-register reads with one reconnect-and-retry on failure.
pub struct RegisterReader<T> {
    transport: T,
}

impl<T: RegisterTransport> RegisterReader<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Reads one register as a raw big-endian `u16`.
    ///
    /// Any failure of the first attempt (transport, timeout, exception or a short response)
    /// closes and re-establishes the connection and retries the same read once. Only the
    /// retry's failure is surfaced.
    pub async fn read(&mut self, addr: u16, register_type: RegisterType) -> Result<u16, ReadError> {
        match self.read_once(addr, register_type).await {
            Ok(v) => Ok(v),
            Err(e) => {
                warn!(addr, %register_type, "read failed: {e}. Attempting reconnect...");
                self.reconnect().await?;
                self.read_once(addr, register_type)
                    .await
                    .map_err(|e| ReadError::AfterReconnect(Box::new(e)))
            }
        }
    }

    async fn read_once(&mut self, addr: u16, register_type: RegisterType) -> Result<u16, ReadError> {
        let words = match register_type {
            RegisterType::Input => self.transport.read_input_registers(addr, 1).await?,
            RegisterType::Holding => self.transport.read_holding_registers(addr, 1).await?,
        };
        words.first().copied().ok_or(ReadError::InsufficientData)
    }

    async fn reconnect(&mut self) -> Result<(), ReadError> {
        if let Err(e) = self.transport.close().await {
            warn!("closing modbus connection failed: {e}");
        }
        self.transport
            .connect()
            .await
            .map_err(|e| ReadError::Reconnect(Box::new(e)))
    }
}

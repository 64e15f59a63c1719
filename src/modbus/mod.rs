use async_trait::async_trait;
use serde::Deserialize;

pub mod client;
pub mod reader;

pub use client::ModbusClient;
pub use reader::RegisterReader;

/// Register class a value is read from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterType {
    Input,
    Holding,
}

impl std::fmt::Display for RegisterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RegisterType::Input => "input",
            RegisterType::Holding => "holding",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("not connected")]
    NotConnected,
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("request timed out")]
    Timeout,
    #[error("device returned exception: {0}")]
    Exception(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("insufficient data in response")]
    InsufficientData,
    #[error("reconnect failed: {0}")]
    Reconnect(#[source] Box<ReadError>),
    #[error("read failed after reconnect: {0}")]
    AfterReconnect(#[source] Box<ReadError>),
}

/// Raw register access plus the connection lifecycle needed to recover from a failed read.
#[async_trait]
pub trait RegisterTransport: Send {
    async fn read_input_registers(&mut self, addr: u16, count: u16) -> Result<Vec<u16>, ReadError>;

    async fn read_holding_registers(&mut self, addr: u16, count: u16)
        -> Result<Vec<u16>, ReadError>;

    async fn connect(&mut self) -> Result<(), ReadError>;

    async fn close(&mut self) -> Result<(), ReadError>;
}

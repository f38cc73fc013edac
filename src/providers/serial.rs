//! Serial port provider for a meter's customer interface.

use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::time::{Instant, timeout_at};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, info};

use super::reader::ReaderProvider;
use crate::config::SerialConfig;
use crate::provider::Provider;
use crate::types::FramePacket;
use crate::{MeterError, Result};

/// Frames from a serial device at 8E1, no flow control.
pub struct SerialProvider {
    inner: ReaderProvider<SerialStream>,
    device: String,
}

impl SerialProvider {
    /// Open the port and drain whatever the driver buffered before we
    /// attached, so decoding starts on fresh data.
    pub async fn open(config: &SerialConfig) -> Result<Self> {
        debug!(device = %config.device, baud = config.baud_rate, "Opening serial port");

        let mut port = tokio_serial::new(config.device.as_str(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::Even)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| MeterError::serial_failed(config.device.clone(), e))?;

        let drained = drain(&mut port, config.drain())
            .await
            .map_err(|e| MeterError::serial_failed(config.device.clone(), e))?;
        info!(device = %config.device, baud = config.baud_rate, drained, "Serial port open");

        let inner = ReaderProvider::new(port).with_nominal_interval(config.frame_interval());
        Ok(Self { inner, device: config.device.clone() })
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

/// Read and discard input until `period` has passed. Returns the number of
/// bytes thrown away.
async fn drain(port: &mut SerialStream, period: Duration) -> std::io::Result<usize> {
    let deadline = Instant::now() + period;
    let mut scratch = [0u8; 256];
    let mut total = 0;
    while let Ok(read) = timeout_at(deadline, port.read(&mut scratch)).await {
        match read? {
            0 => break,
            n => total += n,
        }
    }
    Ok(total)
}

#[async_trait::async_trait]
impl Provider for SerialProvider {
    async fn next_frame(&mut self) -> Result<Option<FramePacket>> {
        self.inner.next_frame().await
    }

    fn nominal_interval(&self) -> Option<Duration> {
        self.inner.nominal_interval()
    }
}

//! Serial-line motor controller.
//!
//! The drive board listens on a UART and reads one ASCII byte per command.
//! The line is opened 8N1 without flow control at the configured baud rate
//! (the board's firmware expects [`DEFAULT_BAUD_RATE`]).

use std::io::Write;
use std::time::Duration;

use scout_types::{CommandCode, ScoutError};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::motor::MotorController;

/// Baud rate of the drive board's UART.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Write timeout for a single command byte.
const WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// Writes each [`CommandCode`] as a single byte and flushes immediately.
pub struct SerialMotorController<W: Write + Send = Box<dyn SerialPort>> {
    id: String,
    writer: W,
}

impl SerialMotorController<Box<dyn SerialPort>> {
    /// Open and configure the serial port at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::HardwareFault`] if the port cannot be opened or
    /// configured.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, ScoutError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(WRITE_TIMEOUT)
            .open()
            .map_err(|e| ScoutError::HardwareFault {
                component: path.to_string(),
                details: format!("cannot open serial port at {baud_rate} baud: {e}"),
            })?;
        info!(device = path, baud_rate, "opened serial motor link");
        Ok(Self {
            id: path.to_string(),
            writer: port,
        })
    }
}

impl<W: Write + Send> SerialMotorController<W> {
    /// Wrap an arbitrary writer, e.g. an already-configured port.
    pub fn from_writer(id: impl Into<String>, writer: W) -> Self {
        Self {
            id: id.into(),
            writer,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> MotorController for SerialMotorController<W> {
    fn id(&self) -> &str {
        &self.id
    }

    fn send(&mut self, code: CommandCode) -> Result<(), ScoutError> {
        debug!(device = %self.id, code = %code.as_char(), "serial write");
        self.writer
            .write_all(&[code.as_byte()])
            .and_then(|()| self.writer.flush())
            .map_err(|e| ScoutError::HardwareFault {
                component: self.id.clone(),
                details: format!("serial write failed: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_one_byte_per_command() {
        let mut motor = SerialMotorController::from_writer("ttyUSB0", Vec::new());
        motor.send(CommandCode::Forward).unwrap();
        motor.send(CommandCode::Right).unwrap();
        motor.send(CommandCode::Stop).unwrap();
        assert_eq!(motor.into_inner(), b"FLS".to_vec());
    }

    #[test]
    fn write_error_becomes_hardware_fault() {
        let mut motor = SerialMotorController::from_writer("ttyUSB0", BrokenPipe);
        match motor.send(CommandCode::Stop) {
            Err(ScoutError::HardwareFault { component, details }) => {
                assert_eq!(component, "ttyUSB0");
                assert!(details.contains("unplugged"));
            }
            other => panic!("expected hardware fault, got {other:?}"),
        }
    }

    #[test]
    fn open_missing_port_reports_device_and_baud() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ttyMISSING");
        let path = path.to_string_lossy();

        match SerialMotorController::open(&path, DEFAULT_BAUD_RATE) {
            Err(ScoutError::HardwareFault { component, details }) => {
                assert_eq!(component, path);
                assert!(details.contains("115200 baud"));
            }
            Err(other) => panic!("expected hardware fault, got {other:?}"),
            Ok(_) => panic!("opened a port that does not exist"),
        }
    }
}

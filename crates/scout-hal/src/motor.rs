//! Generic `MotorController` trait for the drive base.
//!
//! The drive firmware understands a five-letter alphabet
//! ([`CommandCode`]); drivers only have to get one byte to it.

use scout_types::{CommandCode, ScoutError};

/// The link to the motor controller board.
pub trait MotorController: Send {
    /// Stable identifier, e.g. `"drive_base"`.
    fn id(&self) -> &str;

    /// Deliver `code` to the controller.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::HardwareFault`] when the byte could not be
    /// written.  Callers treat this as transient.
    fn send(&mut self, code: CommandCode) -> Result<(), ScoutError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LastCode {
        last: Option<CommandCode>,
    }

    impl MotorController for LastCode {
        fn id(&self) -> &str {
            "test_base"
        }

        fn send(&mut self, code: CommandCode) -> Result<(), ScoutError> {
            self.last = Some(code);
            Ok(())
        }
    }

    #[test]
    fn trait_object_delivers_code() {
        let mut motor = LastCode { last: None };
        {
            let dyn_motor: &mut dyn MotorController = &mut motor;
            assert_eq!(dyn_motor.id(), "test_base");
            dyn_motor.send(CommandCode::Stop).unwrap();
        }
        assert_eq!(motor.last, Some(CommandCode::Stop));
    }
}

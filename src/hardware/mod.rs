//! Capability traits between the control core and the mount hardware.
//!
//! Implementations are expected to be callable from any thread. Trip handlers
//! run in the context of whatever raised the edge (an interrupt on real
//! hardware), so they must not block.

pub mod sim;

/// Handler invoked on a sensor edge.
pub type TripHandler = Box<dyn Fn() + Send + Sync + 'static>;

/// Quadrature counter for one axis.
pub trait PositionSensor: Send + Sync {
    /// Signed pulse count since the last zero.
    fn read(&self) -> i32;
    /// Reset the hardware counter to zero.
    fn zero(&self);
}

/// Edge-triggered digital input: index sensors and the emergency stop.
pub trait TripSensor: Send + Sync {
    /// Register a handler for the active edge. Handlers accumulate.
    fn on_trip(&self, handler: TripHandler);
    /// Current level of the input, `true` while asserted.
    fn is_tripped(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum MotorCommand {
    /// Signed duty in [-255, 255], never zero.
    Speed(i16),
    Brake,
    Coast,
    /// Coast with the driver enable line released.
    Disabled,
}

impl MotorCommand {
    /// Effective signed duty, zero for every non-driving command.
    pub fn duty(self) -> i16 {
        match self {
            MotorCommand::Speed(speed) => speed,
            _ => 0,
        }
    }
}

/// H-bridge motor driver for one axis.
pub trait MotorDriver: Send + Sync {
    fn apply(&self, command: MotorCommand);
}

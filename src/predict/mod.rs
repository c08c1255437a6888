mod error;
mod julian;
mod predictor;
mod propagator;
mod site;
mod types;

pub use error::PredictError;
pub use julian::{datetime_from_julian, julian_date, MAX_YEAR, MIN_YEAR};
pub use predictor::PositionPredictor;
pub use propagator::{Propagator, Sgp4Propagator};
pub use site::ObserverSite;
pub use types::{LookAngles, Prediction};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

use super::{Delivery, ElementSet, Mailbox};
use crate::predict::{ObserverSite, PositionPredictor, Prediction, Propagator};
use crate::shared::SharedState;

/// What one tracking tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEvent {
    /// Nothing to track.
    Idle,
    /// A new element set was loaded and tracking enabled.
    HandoffAccepted(ElementSet),
    /// A pending element set was dropped; the producer has to resend it.
    HandoffDeclined(ElementSet),
    /// The GPS fix went away while tracking, so tracking was switched off.
    GpsLost,
    /// The target was updated from this prediction.
    Target(Prediction),
    /// Prediction failed for this tick; shared state is untouched.
    Skipped,
    /// An operator or safety write to the target landed while predicting,
    /// so the prediction was not published.
    Superseded,
}

/// Slow loop: consumes TLE handoffs and keeps the shared target updated.
pub struct TrackingLoop<P> {
    shared: Arc<SharedState>,
    mailbox: Arc<Mailbox<ElementSet>>,
    predictor: PositionPredictor<P>,
}

impl<P: Propagator> TrackingLoop<P> {
    pub fn new(
        shared: Arc<SharedState>,
        mailbox: Arc<Mailbox<ElementSet>>,
        predictor: PositionPredictor<P>,
    ) -> Self {
        Self {
            shared,
            mailbox,
            predictor,
        }
    }

    pub fn predictor(&self) -> &PositionPredictor<P> {
        &self.predictor
    }

    pub fn tick(&mut self) -> TrackingEvent {
        let mailbox = self.mailbox.clone();
        if let Some(delivery) = mailbox.take() {
            return self.consume(delivery);
        }

        // read before the tracking flag: every path that clears tracking
        // writes the target afterwards, which moves the generation on
        let generation = self.shared.target_generation();
        if !self.shared.tracking() {
            return TrackingEvent::Idle;
        }
        let gps = self.shared.gps();
        if !gps.valid {
            self.shared.set_tracking(false);
            log::warn!("GPS fix lost, tracking stopped");
            return TrackingEvent::GpsLost;
        }
        if !self.shared.tle_valid() {
            return TrackingEvent::Idle;
        }

        match self.predictor.predict(&gps.time) {
            Ok(prediction) => {
                if self.shared.publish_target(generation, prediction.target) {
                    TrackingEvent::Target(prediction)
                } else {
                    log::debug!("Prediction dropped, target was rewritten meanwhile");
                    TrackingEvent::Superseded
                }
            }
            Err(e) => {
                log::warn!("Tracking tick skipped: {}", e);
                TrackingEvent::Skipped
            }
        }
    }

    fn consume(&mut self, delivery: Delivery<'_, ElementSet>) -> TrackingEvent {
        let set = *delivery;
        let gps = self.shared.gps();
        if !gps.valid {
            log::warn!("TLE handoff for {} declined: no GPS fix", set.name());
            return TrackingEvent::HandoffDeclined(set);
        }

        if let Err(e) = self.predictor.load(&set, ObserverSite::from_fix(&gps)) {
            log::warn!("TLE handoff for {} declined: {}", set.name(), e);
            return TrackingEvent::HandoffDeclined(set);
        }

        self.shared.set_tle_valid(true);
        self.shared.set_tracking(true);
        log::info!("Tracking {}", set.name());
        drop(delivery);
        TrackingEvent::HandoffAccepted(set)
    }
}

/// Tick `tracking` every `period` until `stop` fires or its sender is dropped.
pub async fn run_tracking_loop<P: Propagator>(
    mut tracking: TrackingLoop<P>,
    period: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    log::info!("Tracking loop running every {:?}", period);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                tracking.tick();
            }
            _ = &mut stop => break,
        }
    }
    log::info!("Tracking loop stopped");
}

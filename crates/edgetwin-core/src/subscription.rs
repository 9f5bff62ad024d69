//! Subscription engine: one cancellable polling loop per subscribed event

use crate::catalog::{Device, ProductEvent, ProductId};
use crate::data::DeviceDataWrapper;
use crate::source::DataSource;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Why a polling loop exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionEnd {
    /// The twin's cancellation scope was invalidated
    Cancelled,
    /// The data source failed; the caller must subscribe again
    SourceFailed,
    /// The receiving side of the output channel was dropped
    ReceiverClosed,
}

impl fmt::Display for SubscriptionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::SourceFailed => write!(f, "source failed"),
            Self::ReceiverClosed => write!(f, "receiver closed"),
        }
    }
}

/// Everything one polling loop needs; moved into its task
pub(crate) struct Subscription<S> {
    pub source: Arc<S>,
    pub device: Arc<Device>,
    pub product_id: ProductId,
    pub event: ProductEvent,
    pub interval: Duration,
    pub token: CancellationToken,
    pub bus: mpsc::Sender<DeviceDataWrapper>,
}

impl<S: DataSource> Subscription<S> {
    /// Poll until cancelled, the source fails, or the receiver goes away.
    ///
    /// Every suspension point (tick, sample, send) also waits on the
    /// cancellation token, so a stopped twin never emits another batch and a
    /// slow consumer cannot keep the loop alive. The ticker is owned by this
    /// future and dropped on every return.
    pub async fn run(self) -> SubscriptionEnd {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.token.cancelled() => return SubscriptionEnd::Cancelled,
                _ = ticker.tick() => {}
            }

            let sampled = tokio::select! {
                biased;
                () = self.token.cancelled() => return SubscriptionEnd::Cancelled,
                sampled = self.source.sample(&self.device, &self.event.outs) => sampled,
            };
            let properties = match sampled {
                Ok(properties) => properties,
                Err(err) => {
                    error!(error = %err, "failed to sample event, ending subscription");
                    return SubscriptionEnd::SourceFailed;
                }
            };

            let count = properties.len();
            let wrapper = DeviceDataWrapper {
                product_id: self.product_id.clone(),
                device_id: self.device.id.clone(),
                func_id: self.event.id.clone(),
                properties,
            };

            tokio::select! {
                biased;
                () = self.token.cancelled() => return SubscriptionEnd::Cancelled,
                sent = self.bus.send(wrapper) => {
                    if sent.is_err() {
                        warn!("output channel closed, ending subscription");
                        return SubscriptionEnd::ReceiverClosed;
                    }
                }
            }
            debug!(values = count, "emitted event batch");
        }
    }
}

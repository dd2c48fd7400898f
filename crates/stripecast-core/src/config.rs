use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::StripeError;
use crate::types::{DisplayGeometry, ScreenOrientation};

/// Default number of stripes a frame is cut into.
pub const DEFAULT_NUM_STRIPES: u16 = 8;
/// Default stripe queue capacity.
pub const DEFAULT_MAX_QUEUE_ELEMENTS: usize = 64;

/// Composer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    #[serde(alias = "numStripes")]
    pub num_stripes: u16,
    #[serde(alias = "maxQueueElements")]
    pub max_queue_elements: usize,
    pub orientation: ScreenOrientation,
    /// Pop jitter for stress runs. Leave `None` in production.
    #[serde(alias = "popJitter")]
    pub pop_jitter: Option<JitterConfig>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            num_stripes: DEFAULT_NUM_STRIPES,
            max_queue_elements: DEFAULT_MAX_QUEUE_ELEMENTS,
            orientation: ScreenOrientation::Portrait,
            pop_jitter: None,
        }
    }
}

/// Requeue-and-delay jitter applied on the consumer side of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JitterConfig {
    /// Chance in `[0, 1]` that a popped stripe is requeued.
    pub probability: f64,
    #[serde(alias = "delayMs")]
    pub delay_ms: u64,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self { probability: 0.5, delay_ms: 7 }
    }
}

impl JitterConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl ComposerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, StripeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the configuration against the display it will slice.
    ///
    /// The queue evicts its oldest `capacity / 2` stripes on overflow; with
    /// more stripes per frame than that, eviction could hit the newest frame.
    pub fn validate(&self, geometry: &DisplayGeometry) -> Result<(), StripeError> {
        if self.num_stripes == 0 {
            return Err(invalid("num_stripes must be at least 1"));
        }
        if self.max_queue_elements < 2 {
            return Err(invalid("max_queue_elements must be at least 2"));
        }
        if usize::from(self.num_stripes) > self.max_queue_elements / 2 {
            return Err(invalid(format!(
                "num_stripes ({}) exceeds half the queue capacity ({})",
                self.num_stripes, self.max_queue_elements
            )));
        }
        if geometry.height < u32::from(self.num_stripes) {
            return Err(StripeError::InvalidGeometry {
                reason: format!(
                    "screen height {} is smaller than num_stripes {}",
                    geometry.height, self.num_stripes
                ),
            });
        }
        if geometry.width == 0 || geometry.bytes_per_pixel == 0 {
            return Err(StripeError::InvalidGeometry {
                reason: format!("degenerate display {geometry}"),
            });
        }
        if let Some(jitter) = &self.pop_jitter {
            if !(0.0..=1.0).contains(&jitter.probability) {
                return Err(invalid(format!(
                    "pop_jitter.probability {} outside [0, 1]",
                    jitter.probability
                )));
            }
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> StripeError {
    StripeError::ConfigurationInvalid { reason: reason.into() }
}

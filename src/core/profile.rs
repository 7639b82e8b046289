use std::sync::{Arc, Mutex, PoisonError};

use crate::types::{ChannelOrder, ColorProfile};

/// Color profile shared between the control thread and the active render loop
///
/// The lock is only held for the copy in or out, never across a sleep or I/O call.
#[derive(Debug, Clone, Default)]
pub struct SharedProfile {
    inner: Arc<Mutex<ColorProfile>>,
}

impl SharedProfile {
    pub fn new(profile: ColorProfile) -> Self {
        Self {
            inner: Arc::new(Mutex::new(profile)),
        }
    }

    /// Copy of the current profile
    pub fn get(&self) -> ColorProfile {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, profile: ColorProfile) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = profile;
    }

    /// Replace the factors, clamped into [0, 1]; returns the stored profile
    pub fn set_factors(&self, factors: [f32; 3]) -> ColorProfile {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = guard.with_factors(factors);
        *guard
    }

    pub fn set_channel_order(&self, order: ChannelOrder) -> ColorProfile {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = guard.with_channel_order(order);
        *guard
    }
}

//! Serial correlation of listener callbacks
//!
//! Wayland delivers one logical input event through several listener
//! callbacks and the host later asks for it by serial. [`Correlator`] builds
//! the pending record field by field and hands it out on a matching flush.
//!
//! Callbacks only write their own fields: motion writes the position or adds
//! to the delta, keys and buttons write code, state and text. A record that
//! cannot absorb the next event (a second key, a key after a wheel step, a
//! new serial) is queued under its serial instead of being overwritten, so
//! nothing set since the last flush is lost.

use std::collections::VecDeque;

use log::{trace, warn};

use crate::event::{EventCode, EventInfo};
use crate::fixed::Fixed;

/// Completed records kept for hosts that flush late
const READY_LIMIT: usize = 64;

#[derive(Debug, Default)]
pub struct Correlator {
    serial: u32,
    pending: EventInfo,
    accumulating: bool,
    ready: VecDeque<(u32, EventInfo)>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently recorded serial
    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Nothing pending and nothing queued
    pub fn is_empty(&self) -> bool {
        !self.accumulating && self.ready.is_empty()
    }

    pub fn pending(&self) -> &EventInfo {
        &self.pending
    }

    /// Completed records waiting for their flush
    pub fn queued(&self) -> usize {
        self.ready.len()
    }

    /// Record a serial without contributing to the pending record
    ///
    /// `None` keeps the last serial (motion, axis and relative motion carry
    /// none). A pending record of an older serial is queued.
    pub fn set_serial(&mut self, serial: Option<u32>) {
        let Some(serial) = serial else {
            return;
        };
        if serial != self.serial {
            self.commit();
            self.serial = serial;
        }
    }

    /// Queue the pending record under its serial
    pub fn commit(&mut self) {
        if !self.accumulating {
            return;
        }
        self.accumulating = false;
        if self.ready.len() == READY_LIMIT {
            if let Some((serial, _)) = self.ready.pop_front() {
                warn!("Correlation queue full, dropping record of serial {}", serial);
            }
        }
        let record = std::mem::take(&mut self.pending);
        trace!("Queued {} (serial {})", record.code, self.serial);
        self.ready.push_back((self.serial, record));
    }

    /// Merge a key, button, wheel or text event into the pending record
    ///
    /// Motion fields already pending are kept. Repeated steps of the same
    /// wheel direction add up; any other collision queues the pending record
    /// first.
    pub fn record(&mut self, serial: Option<u32>, event: EventInfo) {
        self.set_serial(serial);

        let held = self.pending.code;
        let carries_event = held.is_switch() || held.is_wheel() || self.pending.text.is_some();
        if self.accumulating && carries_event {
            if event.code.is_wheel() && event.code == held {
                self.pending.wheel_steps = self.pending.wheel_steps.saturating_add(event.wheel_steps);
                return;
            }
            self.commit();
        }

        self.pending.code = event.code;
        self.pending.state = event.state;
        self.pending.text = event.text;
        self.pending.wheel_steps = event.wheel_steps;
        self.accumulating = true;
    }

    /// Absolute pointer position, latest wins
    pub fn record_position(&mut self, serial: Option<u32>, x: i16, y: i16) {
        self.set_serial(serial);
        self.touch_motion();
        self.pending.mouse_x = x;
        self.pending.mouse_y = y;
    }

    /// Relative pointer motion, summed until flushed
    pub fn record_delta(&mut self, dx: Fixed, dy: Fixed) {
        self.touch_motion();
        self.pending.delta_x = self.pending.delta_x.saturating_add(dx);
        self.pending.delta_y = self.pending.delta_y.saturating_add(dy);
    }

    fn touch_motion(&mut self) {
        if !self.accumulating || (self.pending.code.is_none() && self.pending.text.is_none()) {
            self.pending.code = EventCode::MouseMotion;
        }
        self.accumulating = true;
    }

    /// Hand out the oldest record for `serial`, queued ones first
    pub fn flush(&mut self, serial: u32) -> Option<EventInfo> {
        if let Some(index) = self.ready.iter().position(|(s, _)| *s == serial) {
            return self.ready.remove(index).map(|(_, record)| record);
        }
        if serial != self.serial || !self.accumulating {
            return None;
        }
        self.accumulating = false;
        Some(std::mem::take(&mut self.pending))
    }

    /// Drop everything pending or queued
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

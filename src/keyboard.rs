//! Keyboard controller: scancode FIFO, clock-line self-test, enable/data
//! latch. Ported from `keyboard.c`; the self-test timing threshold follows
//! the `KB_RESET_US`/`KB_RESET_DELAY_US` convention used in reference Rust
//! PC emulators (SPEC_FULL.md §4.9).

use crate::util::RingBuffer;

/// Hold the clock line low this long before a rising edge is treated as a
/// reset request.
pub const KB_RESET_US: f64 = 10_000.0;
/// Delay between detecting the reset condition and the self-test byte
/// actually landing in the data latch.
pub const KB_RESET_DELAY_US: f64 = 1_000.0;

const SCANCODE_FIFO_CAPACITY: usize = 16;
const SELF_TEST_BYTE: u8 = 0xAA;

pub struct Keyboard {
    enabled: bool,
    data: u8,
    irq_pending: bool,
    fifo: RingBuffer,

    clock_high: bool,
    low_elapsed_us: f64,
    reset_pending: bool,
    reset_delay_us: f64,
}

impl Default for Keyboard {
    fn default() -> Self {
        Keyboard {
            enabled: false,
            data: 0,
            irq_pending: false,
            fifo: RingBuffer::with_capacity(SCANCODE_FIFO_CAPACITY),
            clock_high: true,
            low_elapsed_us: 0.0,
            reset_pending: false,
            reset_delay_us: 0.0,
        }
    }
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// PPI port B bit5 (inverted: enable keyboard read).
    pub fn set_enable(&mut self, enable: bool) {
        if enable {
            self.enabled = true;
        } else {
            self.enabled = false;
            self.data = 0;
            self.irq_pending = false;
        }
    }

    /// PPI port B bit6: keyboard clock line.
    pub fn set_clock(&mut self, clock_high: bool) {
        if !clock_high && self.clock_high {
            self.low_elapsed_us = 0.0;
        } else if clock_high && !self.clock_high && self.low_elapsed_us > KB_RESET_US {
            self.reset_pending = true;
            self.reset_delay_us = 0.0;
        }
        self.clock_high = clock_high;
    }

    pub fn push_scancode(&mut self, byte: u8) {
        self.fifo.push(byte);
    }

    pub fn get_data(&mut self) -> u8 {
        self.irq_pending = false;
        self.data
    }

    pub fn irq_requested(&self) -> bool {
        self.irq_pending
    }

    /// Advance the controller by `elapsed_us` of wall time, driven by the
    /// machine's pacing loop.
    pub fn tick(&mut self, elapsed_us: f64) {
        if !self.clock_high {
            self.low_elapsed_us += elapsed_us;
        }

        if self.reset_pending {
            self.reset_delay_us += elapsed_us;
            if self.reset_delay_us > KB_RESET_DELAY_US {
                self.reset_pending = false;
                self.fifo.clear();
                self.data = SELF_TEST_BYTE;
                self.irq_pending = true;
            }
            return;
        }

        if self.enabled && !self.fifo.is_empty() {
            self.data = self.fifo.pop();
            self.irq_pending = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scancode_delivery_sets_irq_and_data() {
        let mut kbd = Keyboard::new();
        kbd.set_enable(true);
        kbd.push_scancode(0x1E);
        kbd.tick(10.0);
        assert_eq!(kbd.get_data(), 0x1E);
        assert!(!kbd.irq_requested());
    }

    #[test]
    fn disabled_controller_does_not_deliver() {
        let mut kbd = Keyboard::new();
        kbd.push_scancode(0x1E);
        kbd.tick(10.0);
        assert!(!kbd.irq_requested());
    }

    #[test]
    fn clock_held_low_past_threshold_then_raised_triggers_self_test() {
        let mut kbd = Keyboard::new();
        kbd.set_clock(false);
        kbd.tick(KB_RESET_US + 1.0);
        kbd.set_clock(true);
        assert!(!kbd.irq_requested()); // reset armed, not yet delivered

        kbd.tick(KB_RESET_DELAY_US + 1.0);
        assert_eq!(kbd.get_data(), SELF_TEST_BYTE);
    }

    #[test]
    fn brief_clock_low_does_not_trigger_reset() {
        let mut kbd = Keyboard::new();
        kbd.set_clock(false);
        kbd.tick(1.0);
        kbd.set_clock(true);
        kbd.tick(KB_RESET_DELAY_US + 1.0);
        assert!(!kbd.irq_requested());
    }
}

//! The ISA expansion bus: a fixed pool of card slots, each optionally
//! carrying an I/O handler, a memory-map region index, a reset hook, and a
//! per-tick update hook. Ported from the reference `isa_bus.c` dispatch
//! model (SPEC_FULL.md §4.2).

use super::memory_map::MemoryMap;
use super::traits::BusIO;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CardFlags(u8);

impl CardFlags {
    const HAS_IO: CardFlags = CardFlags(0x01);
    const HAS_MM: CardFlags = CardFlags(0x02);
    const ENABLED: CardFlags = CardFlags(0x04);
    const REMOVED: CardFlags = CardFlags(0x08);

    fn contains(self, other: CardFlags) -> bool {
        self.0 & other.0 == other.0
    }
    fn insert(&mut self, other: CardFlags) {
        self.0 |= other.0;
    }
    fn remove(&mut self, other: CardFlags) {
        self.0 &= !other.0;
    }
}

struct Slot {
    name: String,
    mregion_index: Option<usize>,
    device: Option<Box<dyn BusIO>>,
    flags: CardFlags,
}

/// A fixed-capacity pool of ISA card slots dispatching port I/O in
/// insertion order; the first claiming handler wins.
pub struct IsaBus {
    slots: Vec<Slot>,
    capacity: usize,
}

impl IsaBus {
    pub fn new(slots: usize) -> Self {
        IsaBus { slots: Vec::new(), capacity: slots }
    }

    /// Install a card with an I/O handler. Reuses a removed slot (highest
    /// index found) if any, else appends. Returns the slot index, or `None`
    /// if the pool is exhausted.
    pub fn add_card(&mut self, name: &str, device: Box<dyn BusIO>) -> Option<usize> {
        let mut flags = CardFlags::default();
        flags.insert(CardFlags::HAS_IO);
        flags.insert(CardFlags::ENABLED);
        let slot = Slot {
            name: name.to_string(),
            mregion_index: None,
            device: Some(device),
            flags,
        };

        let mut reuse_index = None;
        for (i, s) in self.slots.iter().enumerate() {
            if s.flags.contains(CardFlags::REMOVED) {
                reuse_index = Some(i);
            }
        }

        if let Some(i) = reuse_index {
            self.slots[i] = slot;
            Some(i)
        } else if self.slots.len() < self.capacity {
            self.slots.push(slot);
            Some(self.slots.len() - 1)
        } else {
            log::warn!(target: "isa_bus", "card slot pool exhausted, cannot add {name}");
            None
        }
    }

    pub fn attach_region(&mut self, index: usize, region_index: usize) {
        if let Some(s) = self.slots.get_mut(index) {
            s.mregion_index = Some(region_index);
            s.flags.insert(CardFlags::HAS_MM);
        }
    }

    pub fn remove_card(&mut self, index: usize) {
        if let Some(s) = self.slots.get_mut(index) {
            s.flags.insert(CardFlags::REMOVED);
            s.flags.remove(CardFlags::ENABLED);
        }
    }

    pub fn enable_card(&mut self, index: usize, mm: &mut MemoryMap) {
        if let Some(s) = self.slots.get_mut(index) {
            if !s.flags.contains(CardFlags::REMOVED) {
                s.flags.insert(CardFlags::ENABLED);
                if let Some(r) = s.mregion_index {
                    mm.enable_region(r);
                }
            }
        }
    }

    pub fn disable_card(&mut self, index: usize, mm: &mut MemoryMap) {
        if let Some(s) = self.slots.get_mut(index) {
            s.flags.remove(CardFlags::ENABLED);
            if let Some(r) = s.mregion_index {
                mm.disable_region(r);
            }
        }
    }

    fn active_io_slots_mut(&mut self) -> impl Iterator<Item = &mut Slot> {
        self.slots
            .iter_mut()
            .filter(|s| s.flags.contains(CardFlags::ENABLED) && s.flags.contains(CardFlags::HAS_IO))
    }

    /// Dispatch a port write to the first claiming card. Returns `true` if
    /// any card handled it.
    pub fn write_io(&mut self, port: u16, value: u8) -> bool {
        for slot in self.active_io_slots_mut() {
            if let Some(dev) = slot.device.as_mut() {
                if dev.write_io(port, value) {
                    return true;
                }
            }
        }
        false
    }

    /// Dispatch a port read to the first claiming card. Returns `None` if no
    /// card handled it.
    pub fn read_io(&mut self, port: u16) -> Option<u8> {
        for slot in self.active_io_slots_mut() {
            if let Some(dev) = slot.device.as_mut() {
                if let Some(v) = dev.read_io(port) {
                    return Some(v);
                }
            }
        }
        None
    }

    pub fn card_name(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(|s| s.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(u8);
    impl BusIO for Echo {
        fn write_io(&mut self, port: u16, value: u8) -> bool {
            if port == 0x42 {
                self.0 = value;
                true
            } else {
                false
            }
        }
        fn read_io(&mut self, port: u16) -> Option<u8> {
            if port == 0x42 {
                Some(self.0)
            } else {
                None
            }
        }
    }

    #[test]
    fn first_claiming_handler_wins() {
        let mut bus = IsaBus::new(4);
        bus.add_card("echo-a", Box::new(Echo(0)));
        bus.add_card("echo-b", Box::new(Echo(0)));
        assert!(bus.write_io(0x42, 7));
        assert_eq!(bus.read_io(0x42), Some(7));
        assert_eq!(bus.read_io(0x99), None);
    }

    #[test]
    fn removed_slot_is_reused() {
        let mut bus = IsaBus::new(1);
        let a = bus.add_card("a", Box::new(Echo(0))).unwrap();
        bus.remove_card(a);
        let b = bus.add_card("b", Box::new(Echo(0)));
        assert_eq!(b, Some(a));
    }

    #[test]
    fn pool_exhaustion_returns_none() {
        let mut bus = IsaBus::new(1);
        bus.add_card("a", Box::new(Echo(0)));
        assert_eq!(bus.add_card("b", Box::new(Echo(0))), None);
    }
}

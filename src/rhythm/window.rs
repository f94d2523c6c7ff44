//! UnitWindow - the 96 units backing the active pattern window.

use crate::rhythm::{CharacterFeed, PatternSource, RhythmicUnit, PATTERN_LEN, WINDOW_LEN};

/// Units for every slot of the active window.
///
/// Rotation keeps the 72 units that stay in view (including any early press
/// already stamped on them) and creates 24 new ones for the incoming pattern.
#[derive(Debug, Clone)]
pub struct UnitWindow {
    units: Vec<RhythmicUnit>,
    next_serial: u64,
}

impl UnitWindow {
    /// Build all 96 units from the source's current window.
    pub fn build<P: PatternSource + ?Sized>(source: &P, feed: &mut CharacterFeed) -> Self {
        let mut window = Self {
            units: Vec::with_capacity(WINDOW_LEN),
            next_serial: 1,
        };
        for slot in 0..WINDOW_LEN {
            let unit = window.create_unit(source, feed, slot);
            window.units.push(unit);
        }
        window
    }

    /// Follow a window advance on `source`: shift by one pattern and fill the tail.
    pub fn rotate<P: PatternSource + ?Sized>(&mut self, source: &P, feed: &mut CharacterFeed) {
        self.units.drain(..PATTERN_LEN);
        for (slot, unit) in self.units.iter_mut().enumerate() {
            unit.index = slot;
        }
        for slot in WINDOW_LEN - PATTERN_LEN..WINDOW_LEN {
            let unit = self.create_unit(source, feed, slot);
            self.units.push(unit);
        }
    }

    pub fn get(&self, slot: usize) -> Option<&RhythmicUnit> {
        self.units.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut RhythmicUnit> {
        self.units.get_mut(slot)
    }

    pub fn units(&self) -> &[RhythmicUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Hand out a serial for a unit created outside the window.
    pub fn allocate_serial(&mut self) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        serial
    }

    fn create_unit<P: PatternSource + ?Sized>(
        &mut self,
        source: &P,
        feed: &mut CharacterFeed,
        slot: usize,
    ) -> RhythmicUnit {
        let kind = source.window_kind(slot);
        let character = if kind.is_silence() {
            None
        } else {
            Some(feed.next_char())
        };
        let serial = self.allocate_serial();
        RhythmicUnit::new(serial, slot, kind, character)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhythm::{Pattern, RhythmKind, WINDOW_PATTERNS};

    struct FixedSource {
        window: [Pattern; WINDOW_PATTERNS],
        advanced: usize,
    }

    impl FixedSource {
        fn new() -> Self {
            let mut window = [[RhythmKind::Soft; PATTERN_LEN]; WINDOW_PATTERNS];
            window[0][..12].fill(RhythmKind::Silence);
            window[1][0] = RhythmKind::Accent;
            Self {
                window,
                advanced: 0,
            }
        }
    }

    impl PatternSource for FixedSource {
        fn window_kind(&self, slot: usize) -> RhythmKind {
            self.window[slot / PATTERN_LEN][slot % PATTERN_LEN]
        }

        fn current_pattern(&self) -> &Pattern {
            &self.window[0]
        }

        fn advance_window(&mut self) {
            self.advanced += 1;
            self.window.rotate_left(1);
            self.window[WINDOW_PATTERNS - 1] = [RhythmKind::AccentZoomed; PATTERN_LEN];
        }
    }

    #[test]
    fn test_build_assigns_characters_to_sounding_slots() {
        let source = FixedSource::new();
        let mut feed = CharacterFeed::new("xy");
        let window = UnitWindow::build(&source, &mut feed);

        assert_eq!(window.len(), WINDOW_LEN);
        assert!(window.units()[..12].iter().all(|u| u.character.is_none()));
        assert_eq!(window.get(12).unwrap().character, Some('x'));
        assert_eq!(window.get(13).unwrap().character, Some('y'));
        assert_eq!(window.get(24).unwrap().kind, RhythmKind::Accent);
    }

    #[test]
    fn test_rotate_keeps_surviving_units() {
        let mut source = FixedSource::new();
        let mut feed = CharacterFeed::new("abc");
        let mut window = UnitWindow::build(&source, &mut feed);

        window.get_mut(24).unwrap().press(1.25);
        let survivor_serial = window.get(24).unwrap().serial;

        source.advance_window();
        window.rotate(&source, &mut feed);

        assert_eq!(window.len(), WINDOW_LEN);
        let moved = window.get(0).unwrap();
        assert_eq!(moved.serial, survivor_serial);
        assert_eq!(moved.index, 0);
        assert_eq!(moved.time_pressed, Some(1.25));
        assert!(window.units()[72..]
            .iter()
            .all(|u| u.kind == RhythmKind::AccentZoomed && u.character.is_some()));
        let serials: std::collections::HashSet<u64> =
            window.units().iter().map(|u| u.serial).collect();
        assert_eq!(serials.len(), WINDOW_LEN);
    }
}

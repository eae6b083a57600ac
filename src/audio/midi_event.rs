#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MidiEvent {
    /// Ticks elapsed since the previous event of the same track.
    pub delta: u32,
    /// The type of the event.
    pub event: MidiEventType,
}

impl MidiEvent {
    pub const fn is_note_on(&self) -> bool {
        matches!(self.event, MidiEventType::NoteOn(_, _, _))
    }

    pub const fn is_note_off(&self) -> bool {
        matches!(self.event, MidiEventType::NoteOff(_, _))
    }

    pub const fn key(&self) -> u8 {
        match self.event {
            MidiEventType::NoteOn(_, key, _) | MidiEventType::NoteOff(_, key) => key,
        }
    }

    pub const fn channel(&self) -> u8 {
        match self.event {
            MidiEventType::NoteOn(channel, _, _) | MidiEventType::NoteOff(channel, _) => channel,
        }
    }

    pub const fn new_note_on(delta: u32, channel: u8, key: u8, velocity: u8) -> Self {
        let event = MidiEventType::note_on(channel, key, velocity);
        Self { delta, event }
    }

    pub const fn new_note_off(delta: u32, channel: u8, key: u8) -> Self {
        let event = MidiEventType::note_off(channel, key);
        Self { delta, event }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MidiEventType {
    NoteOn(u8, u8, u8), // channel, note, velocity
    NoteOff(u8, u8),    // channel, note
}

impl MidiEventType {
    const fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        Self::NoteOn(channel, key, velocity)
    }

    const fn note_off(channel: u8, key: u8) -> Self {
        Self::NoteOff(channel, key)
    }
}

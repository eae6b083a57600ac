pub mod midi_event;
pub mod midi_writer;
pub mod progression;
pub mod tick_sequencer;

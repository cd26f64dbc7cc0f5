pub mod direct;
pub mod router;
pub mod sequencer;
pub mod transport;

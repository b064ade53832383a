/// Session orchestration: join, leave, switch, mark, new card.
pub mod controller;
/// REST half of the transport adapter.
pub mod rest;
/// Persistent-channel half of the transport adapter.
pub mod socket;

#[cfg(test)]
pub mod stub_server;

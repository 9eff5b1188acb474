//! Pure consensus logic, kept free of I/O so every computation can be safely
//! re-run by whichever poller observes a round boundary first

pub mod consensus;
pub mod join_code;
pub mod lifecycle;
pub mod rounds;

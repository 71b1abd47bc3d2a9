pub mod framing;
pub mod protocol;
pub mod session;

#[cfg(feature = "transport")]
pub mod transport;

pub mod client;
pub mod doctor;
pub mod proxy;
pub mod receiver;
pub mod retry;
pub mod signals;

pub use client::{BusClient, ConnectionState};

/// Failure indicator returned by every client operation. Callers log it;
/// nothing here panics or unwinds past the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("gave up connecting after {attempts} attempts")]
    PermanentlyFailed { attempts: u32 },
    #[error("bus call {call} failed: {cause:#}")]
    Call { call: &'static str, cause: anyhow::Error },
}

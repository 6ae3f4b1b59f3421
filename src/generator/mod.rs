/// Proposal and quotation generation.
///
/// A unified client over the text-generation backend, using the Rig framework
/// for the hosted providers plus a custom HTTP endpoint. Provider selection is
/// automatic from environment variables.
///
/// The backend promises nothing about the structure of what it returns; both
/// operations hand back raw prose and the display layer tokenizes it.
mod client;
mod providers;

pub use client::{GeneratorClient, GeneratorError};
pub use providers::{CustomEndpointClient, ProviderClient};

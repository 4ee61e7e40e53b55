//! Exchange of chart values schemas with remote schema repositories.

mod download;
#[cfg(any(test, feature = "test-util"))]
mod memory;
mod publish;
mod transport;

pub use download::{DownloadedSchema, SchemaDownloader};
pub use publish::JsonSchemaPublisher;
#[cfg(any(test, feature = "test-util"))]
pub use memory::{MemoryTransport, RecordedRequest};
pub use transport::{HttpResponse, SchemaTransport, TransportError, UreqTransport};

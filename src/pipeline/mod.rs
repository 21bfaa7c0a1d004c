pub mod completion;
pub mod structuring;
pub mod session;
pub mod dispatch;
pub mod ingest;

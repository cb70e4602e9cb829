pub mod frame_encoder;
pub mod frame_source;
pub mod ingest_delegate;

pub mod annotations;
pub mod metadata;
pub mod retention;
pub mod rotating_writer;
pub mod y4m_encoder;

pub mod frame_buffer;
pub mod pacing;
pub mod y4m_format;

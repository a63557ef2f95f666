pub mod avi_layout;
pub mod chunk_index;
pub mod container_session;
pub mod container_writer;

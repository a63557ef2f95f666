pub mod constants;
pub mod encoded_frame;
pub mod frame;
pub mod recording_metadata;

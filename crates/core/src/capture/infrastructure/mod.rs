pub mod image_sequence_source;
pub mod system_clock;
pub mod test_pattern_source;

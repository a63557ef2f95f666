pub mod capture_pacer;
pub mod record_screen_use_case;
pub mod recording_config;
pub mod recording_logger;

pub mod avi_mjpeg_writer;
pub mod avi_reader;

pub mod capture;
pub mod container;
pub mod encoding;
pub mod pipeline;
pub mod shared;

pub mod adjust;
pub mod config;
pub mod effects;
pub mod error;
pub mod image;
pub mod palette;
pub mod pipeline;
pub mod recolor;
pub mod session;
pub mod transform;
pub mod worker;

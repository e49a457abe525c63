mod activation;
mod license;

pub use activation::*;
pub use license::*;

//! Request and response models

pub mod training;
pub mod detection;
pub mod lifecycle;
pub mod validated;

pub use training::*;
pub use detection::*;
pub use lifecycle::*;
pub use validated::ValidatedJson;

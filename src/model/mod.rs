//! Model loading and the classifier network.

pub mod loader;
pub mod network;

pub use loader::ModelLoader;
pub use network::{ClassifierModel, NetworkDims};

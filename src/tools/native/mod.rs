pub mod orchestrate;

pub use orchestrate::{CheckResponseStatusTool, GenerateResponseTool};

//! The fixed request stages, in pipeline order:
//! [`LoadHistory`], [`RetrieveGrounding`], [`FrameSystemPrompt`],
//! [`CompleteWithTools`], [`PersistTurn`].

mod completion;
mod memory;
mod prompt;
mod retrieval;

pub use completion::CompleteWithTools;
pub use memory::{LoadHistory, PersistTurn};
pub use prompt::{FrameSystemPrompt, grounding_section};
pub use retrieval::RetrieveGrounding;

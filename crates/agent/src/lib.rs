//! Request orchestration for pawline.
//!
//! A question flows through a fixed [`Pipeline`] of [`Stage`]s:
//!
//! 1. **Load history**: the session's recent window from the conversation store
//! 2. **Retrieve grounding**: documents from the [`RetrievalAdvisor`]
//! 3. **Frame**: system preamble plus grounding, history and the question
//! 4. **Complete with tools**: call the engine; resolve tool calls; repeat
//! 5. **Persist**: the question and the final answer, nothing else
//!
//! The [`Orchestrator`] wires the stages from explicit dependencies.

pub mod advisor;
pub mod context;
pub mod orchestrator;
pub mod pipeline;
pub mod stages;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use advisor::{Retrieval, RetrievalAdvisor};
pub use context::{Grounding, RequestContext, RequestState};
pub use orchestrator::{Answer, Orchestrator};
pub use pipeline::{Pipeline, Stage};

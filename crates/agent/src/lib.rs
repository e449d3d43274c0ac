//! The reply pipeline — from an incoming chat message to a reply string.
//!
//! For every message the engine:
//!
//! 1. **Classifies** it into intent labels (rule based, no I/O)
//! 2. **Resolves** the answering account's persona through the override registry
//! 3. **Reads** a bounded window of the conversation history
//! 4. **Assembles** one prompt from persona, rule-derived facts, retrieved
//!    knowledge snippets and recent turns
//! 5. **Completes** it through the response cache and the provider, with
//!    retry and a fixed fallback reply
//!
//! Every collaborator is constructed once at the application root and
//! injected; nothing here holds global state.

pub mod completion;
pub mod engine;
pub mod intent;
pub mod persona;
pub mod prompt;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use completion::CompletionClient;
pub use engine::{EngineReply, PreparedPrompt, ResponseEngine};
pub use intent::IntentClassifier;
pub use persona::{OverrideLayer, OverrideSource, PersonaRegistry, PersonaResolver};
pub use prompt::{PromptAssembler, PromptContext, PromptSection, SectionKind};

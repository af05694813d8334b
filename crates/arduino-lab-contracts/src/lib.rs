//! Shared types for the ARduino Lab assistant: the component vocabulary,
//! response payload parsing, and the session state front-ends drive.

pub mod catalog;
pub mod commands;
pub mod components;
pub mod error;
pub mod events;
pub mod instructions;
pub mod inventory;
pub mod models;
pub mod paging;
pub mod payloads;
pub mod projects;
pub mod receipts;

pub use catalog::Tip;
pub use components::{Component, ComponentKind};
pub use error::PayloadError;
pub use instructions::{CodeSnippet, InstructionStep, StepCursor};
pub use inventory::Inventory;
pub use paging::Pager;
pub use payloads::Parsed;
pub use projects::{Project, SelectedProject};

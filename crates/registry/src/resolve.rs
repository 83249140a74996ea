//! Handler resolution over [`LookupTable`]s.
//!
//! Handlers are resolved either interactively with [`descend`], which walks
//! the table one prompt per level, or from a stored selection path with
//! [`retrieve`], which never prompts.

use parrot_util::{PromptError, Prompter};
use thiserror::Error;
use tracing::debug;

use crate::table::{LookupNode, LookupTable};

/// Prompt shown for every level below the first.
pub const REFINE_SELECTION_MESSAGE: &str = "Please refine your selection:";

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("At least one option must be provided (after selecting [{}])", selections.join(" -> "))]
    EmptyTable { selections: Vec<String> },

    #[error("Failed to find a handler registered for selection: {path}")]
    HandlerNotFound { path: String },

    #[error("'{choice}' is not one of the offered options")]
    UnknownChoice { choice: String },

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// A handler together with the keys that lead to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<T> {
    pub handler: T,
    pub selections: Vec<String>,
}

/// Interactively walks `table` down to a leaf.
///
/// Each level offers its keys in table order. The first prompt uses
/// `message`; deeper levels use [`REFINE_SELECTION_MESSAGE`]. An empty table
/// at any level fails with [`SelectionError::EmptyTable`] before anything is
/// asked at that level.
pub async fn descend<T: Clone>(table: &LookupTable<T>, prompter: &dyn Prompter, message: &str) -> Result<Selection<T>, SelectionError> {
    let mut current = table;
    let mut message = message;
    let mut selections = Vec::new();

    loop {
        if current.is_empty() {
            return Err(SelectionError::EmptyTable { selections });
        }
        let choices: Vec<String> = current.keys().map(str::to_string).collect();
        let choice = prompter.select(message, &choices, None).await?;
        let Some(node) = current.get(&choice) else {
            return Err(SelectionError::UnknownChoice { choice });
        };
        selections.push(choice);

        match node {
            LookupNode::Leaf(handler) => {
                debug!(selection = %selections.join(" -> "), "resolved handler interactively");
                return Ok(Selection {
                    handler: handler.clone(),
                    selections,
                });
            }
            LookupNode::Branch(nested) => {
                current = nested;
                message = REFINE_SELECTION_MESSAGE;
            }
        }
    }
}

/// Follows `selections` through `table` without prompting.
///
/// Succeeds only when the last key lands exactly on a leaf. An empty path, a
/// path that stops at a nested table, a path that runs past a leaf, and an
/// unknown key all fail with [`SelectionError::HandlerNotFound`].
pub fn retrieve<'a, T, S>(table: &'a LookupTable<T>, selections: &[S]) -> Result<&'a T, SelectionError>
where
    S: AsRef<str>,
{
    let mut current = table;
    for (index, key) in selections.iter().enumerate() {
        let is_last = index + 1 == selections.len();
        match current.get(key.as_ref()) {
            Some(LookupNode::Leaf(handler)) if is_last => return Ok(handler),
            Some(LookupNode::Branch(nested)) if !is_last => current = nested,
            _ => break,
        }
    }

    let path = selections.iter().map(AsRef::as_ref).collect::<Vec<&str>>().join(" -> ");
    Err(SelectionError::HandlerNotFound { path })
}

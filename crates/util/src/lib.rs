pub mod arguments;
pub mod env;
pub mod masking;
pub mod path_processing;
pub mod prompt;

pub use arguments::{ArgumentError, split_arguments};
pub use env::{EnvError, EnvVariable, get_env, get_env_optional, load_env_files};
pub use masking::mask_middle;
pub use path_processing::expand_tilde;
pub use prompt::{PromptError, Prompter, ScriptedPrompter, TerminalPrompter, env_or_input, env_or_password};

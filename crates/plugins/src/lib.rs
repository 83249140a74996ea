//! Built-in sources and drains.
//!
//! Parrot ships with:
//!
//! - an Xray test plan source (`xray` → `test plan`) for Xray Cloud and
//!   Xray Server/DC,
//! - a Microsoft Teams drain (`microsoft` → `teams`) posting an adaptive card
//!   to an incoming webhook,
//! - a standard output drain (`stdout`) printing a plain-text report, and
//! - command handlers that delegate to external programs, which plugin
//!   manifests reference with `handler: command`.
//!
//! [`builtin_plugins`] returns the plugins registering the first three, in the
//! order they are applied at startup. [`BuiltinHandlerFactory`] resolves
//! manifest leaves to handler instances.

pub mod builtin;
pub mod command;
pub mod stdout;
pub mod teams;
pub mod xray;

use serde::{Deserialize, Serialize};

pub use builtin::{
    BuiltinHandlerFactory, MicrosoftTeamsPlugin, StdoutPlugin, XrayPlugin, builtin_plugins, MICROSOFT_TEAMS_DRAIN, STDOUT_DRAIN,
    XRAY_TEST_PLAN_SOURCE,
};
pub use command::{CommandDrainHandler, CommandSourceHandler};
pub use stdout::{StdoutDrain, StdoutDrainHandler, StdoutOutlet, render_report};
pub use teams::{MicrosoftTeamsDrain, MicrosoftTeamsDrainHandler, MicrosoftTeamsOutlet, test_results_card};
pub use xray::{XrayTestPlanInlet, XrayTestPlanSource, XrayTestPlanSourceHandler, convert_status};

/// Stored form of an entity that has nothing worth persisting. Serializes to
/// `{}` and accepts any object when read back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoConfiguration {}

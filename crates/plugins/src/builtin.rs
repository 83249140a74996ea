//! Plugins and manifest handlers compiled into Parrot.

use std::sync::Arc;

use parrot_registry::{
    DrainHandlerRef, DrainTable, HandlerFactory, HandlerRegistry, HandlerSpec, PartialConfiguration, Plugin, PluginLoadError, Side,
    SourceHandlerRef, SourceTable,
};

use crate::command::{CommandDrainHandler, CommandSourceHandler};
use crate::stdout::StdoutDrainHandler;
use crate::teams::MicrosoftTeamsDrainHandler;
use crate::xray::XrayTestPlanSourceHandler;

/// Manifest name of the Xray test plan source.
pub const XRAY_TEST_PLAN_SOURCE: &str = "xray-test-plan";
/// Manifest name of the Microsoft Teams drain.
pub const MICROSOFT_TEAMS_DRAIN: &str = "microsoft-teams";
/// Manifest name of the standard output drain.
pub const STDOUT_DRAIN: &str = "stdout";

/// Registers `xray` → `test plan`.
#[derive(Debug, Default)]
pub struct XrayPlugin;

impl Plugin for XrayPlugin {
    fn name(&self) -> String {
        "xray".to_string()
    }

    fn register(&self, _current: &HandlerRegistry) -> Result<PartialConfiguration, PluginLoadError> {
        let handler: SourceHandlerRef = Arc::new(XrayTestPlanSourceHandler);
        let sources = SourceTable::new().with_branch("xray", SourceTable::new().with_leaf("test plan", handler));
        Ok(PartialConfiguration::new().with_sources(sources))
    }
}

/// Registers `microsoft` → `teams`.
#[derive(Debug, Default)]
pub struct MicrosoftTeamsPlugin;

impl Plugin for MicrosoftTeamsPlugin {
    fn name(&self) -> String {
        "microsoft-teams".to_string()
    }

    fn register(&self, _current: &HandlerRegistry) -> Result<PartialConfiguration, PluginLoadError> {
        let handler: DrainHandlerRef = Arc::new(MicrosoftTeamsDrainHandler);
        let drains = DrainTable::new().with_branch("microsoft", DrainTable::new().with_leaf("teams", handler));
        Ok(PartialConfiguration::new().with_drains(drains))
    }
}

/// Registers `stdout`.
#[derive(Debug, Default)]
pub struct StdoutPlugin;

impl Plugin for StdoutPlugin {
    fn name(&self) -> String {
        "stdout".to_string()
    }

    fn register(&self, _current: &HandlerRegistry) -> Result<PartialConfiguration, PluginLoadError> {
        let handler: DrainHandlerRef = Arc::new(StdoutDrainHandler);
        Ok(PartialConfiguration::new().with_drains(DrainTable::new().with_leaf("stdout", handler)))
    }
}

/// The built-in plugins in application order.
pub fn builtin_plugins() -> Vec<Box<dyn Plugin>> {
    vec![Box::new(XrayPlugin), Box::new(MicrosoftTeamsPlugin), Box::new(StdoutPlugin)]
}

/// Resolves manifest leaves to built-in or command handlers.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinHandlerFactory;

impl HandlerFactory for BuiltinHandlerFactory {
    fn source_handler(&self, spec: &HandlerSpec) -> Result<SourceHandlerRef, PluginLoadError> {
        match spec {
            HandlerSpec::Builtin { name } if name == XRAY_TEST_PLAN_SOURCE => Ok(Arc::new(XrayTestPlanSourceHandler)),
            HandlerSpec::Builtin { name } => Err(PluginLoadError::UnknownBuiltin {
                side: Side::Source,
                name: name.clone(),
            }),
            HandlerSpec::Command { program, args } => Ok(Arc::new(CommandSourceHandler::new(program.clone(), args.clone()))),
        }
    }

    fn drain_handler(&self, spec: &HandlerSpec) -> Result<DrainHandlerRef, PluginLoadError> {
        match spec {
            HandlerSpec::Builtin { name } => match name.as_str() {
                MICROSOFT_TEAMS_DRAIN => Ok(Arc::new(MicrosoftTeamsDrainHandler)),
                STDOUT_DRAIN => Ok(Arc::new(StdoutDrainHandler)),
                _ => Err(PluginLoadError::UnknownBuiltin {
                    side: Side::Drain,
                    name: name.clone(),
                }),
            },
            HandlerSpec::Command { program, args } => Ok(Arc::new(CommandDrainHandler::new(program.clone(), args.clone()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use parrot_registry::retrieve;

    use super::*;

    #[test]
    fn builtins_register_the_default_tables() {
        let mut registry = HandlerRegistry::new();
        for plugin in builtin_plugins() {
            parrot_registry::apply_plugin(&mut registry, plugin.as_ref()).unwrap();
        }

        assert_eq!(registry.sources().keys().collect::<Vec<_>>(), vec!["xray"]);
        assert_eq!(registry.drains().keys().collect::<Vec<_>>(), vec!["microsoft", "stdout"]);
        assert!(retrieve(registry.sources(), &["xray", "test plan"]).is_ok());
        assert!(retrieve(registry.drains(), &["microsoft", "teams"]).is_ok());
        assert!(retrieve(registry.drains(), &["stdout"]).is_ok());
    }

    #[test]
    fn factory_rejects_builtins_of_the_wrong_side() {
        let factory = BuiltinHandlerFactory;
        let stdout = HandlerSpec::Builtin {
            name: STDOUT_DRAIN.to_string(),
        };
        assert!(factory.drain_handler(&stdout).is_ok());
        assert!(matches!(
            factory.source_handler(&stdout),
            Err(PluginLoadError::UnknownBuiltin { side: Side::Source, .. })
        ));
    }

    #[test]
    fn factory_builds_command_handlers_for_both_sides() {
        let factory = BuiltinHandlerFactory;
        let spec = HandlerSpec::Command {
            program: "./results.sh".to_string(),
            args: vec!["--json".to_string()],
        };
        let source = factory.source_handler(&spec).unwrap();
        let drain = factory.drain_handler(&spec).unwrap();
        assert!(source.handler_name().ends_with("CommandSourceHandler"));
        assert!(drain.handler_name().ends_with("CommandDrainHandler"));
    }
}

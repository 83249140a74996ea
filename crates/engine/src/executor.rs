//! Running a session: every inlet is fetched before any outlet is written.

use parrot_registry::EntityKind;
use tracing::{debug, error, info};

use crate::error::{SessionError, Stage};
use crate::model::{DrainFailure, DrainFailurePolicy, DrainOutput, RunReport, Session};

/// Fetches the results of every (source, inlet) pair in order, then writes the
/// accumulated results to every (drain, outlet) pair in order.
///
/// A failing source always aborts the run. A failing outlet aborts it under
/// [`DrainFailurePolicy::Abort`]; under [`DrainFailurePolicy::Isolate`] the
/// failure is recorded in the report and the remaining outlets still run.
pub async fn execute(session: &Session, policy: DrainFailurePolicy) -> Result<RunReport, SessionError> {
    let mut report = RunReport::default();

    for source in &session.sources {
        for inlet in &source.inlets {
            let results = source
                .handler
                .get_test_results(&source.source, &inlet.entity)
                .await
                .map_err(|error| SessionError::handler(Stage::Run, EntityKind::Inlet, label(&source.name, &inlet.name), error))?;
            debug!(source = %source.name, inlet = %inlet.name, count = results.len(), "fetched test results");
            report.results.extend(results);
        }
    }
    info!(count = report.results.len(), "collected test results");

    for drain in &session.drains {
        for outlet in &drain.outlets {
            match drain.handler.write_test_results(&drain.drain, &report.results, &outlet.entity).await {
                Ok(output) => {
                    debug!(drain = %drain.name, outlet = %outlet.name, "wrote test results");
                    report.outputs.push(DrainOutput {
                        drain: drain.name.clone(),
                        outlet: outlet.name.clone(),
                        output,
                    });
                }
                Err(failure) => match policy {
                    DrainFailurePolicy::Abort => {
                        return Err(SessionError::handler(
                            Stage::Run,
                            EntityKind::Outlet,
                            label(&drain.name, &outlet.name),
                            failure,
                        ));
                    }
                    DrainFailurePolicy::Isolate => {
                        error!(drain = %drain.name, outlet = %outlet.name, error = %failure, "writing test results failed, continuing");
                        report.failures.push(DrainFailure {
                            drain: drain.name.clone(),
                            outlet: outlet.name.clone(),
                            error: failure,
                        });
                    }
                },
            }
        }
    }
    Ok(report)
}

fn label(entity: &str, parameter_set: &str) -> String {
    format!("{entity} / {parameter_set}")
}

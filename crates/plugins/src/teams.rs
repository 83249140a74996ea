//! Microsoft Teams drain.
//!
//! Posts an adaptive card summarizing the results to a channel's incoming
//! webhook. The webhook URL grants write access to the channel, so it is
//! treated as a secret: it is read from `MICROSOFT_TEAMS_WEBHOOK_URL` or asked
//! for, and never stored.

use async_trait::async_trait;
use parrot_api::TeamsWebhookClient;
use parrot_registry::{Drain, DrainHandler, EntityKind, HandlerError};
use parrot_types::{TestResult, TestStatus, passing_percentage};
use parrot_util::{EnvVariable, Prompter, env_or_input, mask_middle};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::NoConfiguration;

/// Characters of the webhook URL shown at each end in logs.
const WEBHOOK_CHARACTERS_SHOWN: usize = 10;

const WEBHOOK_MESSAGE: &str = "What is the Webhook URL of your Microsoft Teams Channel?";
const TESTS_LIST_ID: &str = "tests-list";
const SHOW_TESTS_ID: &str = "show-tests-button";
const HIDE_TESTS_ID: &str = "hide-tests-button";

/// Parameters of one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicrosoftTeamsOutlet {
    pub incoming_webhook_url: String,
}

#[derive(Debug, Clone)]
pub struct MicrosoftTeamsDrain {
    client: TeamsWebhookClient,
}

impl MicrosoftTeamsDrain {
    pub fn new() -> Result<Self, HandlerError> {
        let client = TeamsWebhookClient::new().map_err(|error| HandlerError::construction(EntityKind::Drain, format!("{error:#}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Drain for MicrosoftTeamsDrain {
    type Outlet = MicrosoftTeamsOutlet;
    type Output = Value;

    async fn write_test_results(&self, results: &[TestResult], outlet: &MicrosoftTeamsOutlet) -> Result<Value, HandlerError> {
        info!(
            "Draining test results to {} ...",
            mask_middle(&outlet.incoming_webhook_url, WEBHOOK_CHARACTERS_SHOWN)
        );
        let card = test_results_card(results);
        let response = self
            .client
            .post(&outlet.incoming_webhook_url, &card)
            .await
            .map_err(|error| HandlerError::collaborator("posting to Microsoft Teams", error))?;
        if !response.is_accepted() {
            warn!(status = response.status, body = %response.body, "Microsoft Teams did not accept the message");
        }
        Ok(card)
    }
}

/// Builds the adaptive card message posted to Teams.
pub fn test_results_card(results: &[TestResult]) -> Value {
    let count = |status: TestStatus| results.iter().filter(|result| result.status == status).count().to_string();
    let facts = json!([
        { "title": "Test Cases", "value": results.len().to_string() },
        { "title": "Passed", "value": count(TestStatus::Pass) },
        { "title": "Failed", "value": count(TestStatus::Fail) },
        { "title": "Skipped", "value": count(TestStatus::Skipped) },
        { "title": "Pending", "value": count(TestStatus::Pending) },
        { "title": "Passing", "value": format!("{:.2} %", passing_percentage(results)) },
    ]);

    let body = json!([
        {
            "type": "TextBlock",
            "text": "Test Results",
            "style": "heading",
            "color": "Accent",
            "size": "Large",
            "weight": "Default",
            "isSubtle": false,
            "wrap": true
        },
        {
            "type": "FactSet",
            "facts": facts,
            "separator": true
        },
        {
            "type": "Container",
            "items": [
                toggle_tests_action(SHOW_TESTS_ID, "Show Tests", true),
                toggle_tests_action(HIDE_TESTS_ID, "Hide Tests", false),
                {
                    "type": "Container",
                    "id": TESTS_LIST_ID,
                    "isVisible": false,
                    "items": results.iter().map(test_row).collect::<Vec<_>>()
                }
            ]
        }
    ]);

    json!({
        "type": "message",
        "attachments": [
            {
                "contentType": "application/vnd.microsoft.card.adaptive",
                "contentUrl": null,
                "content": {
                    "$schema": "http://adaptivecards.io/schemas/adaptive-card.json",
                    "type": "AdaptiveCard",
                    "version": "1.5",
                    "body": body
                }
            }
        ]
    })
}

/// `show` is true for the button that reveals the list.
fn toggle_tests_action(id: &str, title: &str, show: bool) -> Value {
    let mut action_set = json!({
        "type": "ActionSet",
        "id": id,
        "actions": [
            {
                "type": "Action.ToggleVisibility",
                "title": title,
                "iconUrl": "icon:TaskListLtr",
                "targetElements": [
                    { "elementId": SHOW_TESTS_ID, "isVisible": !show },
                    { "elementId": HIDE_TESTS_ID, "isVisible": show },
                    { "elementId": TESTS_LIST_ID, "isVisible": show }
                ]
            }
        ]
    });
    if !show {
        action_set["isVisible"] = json!(false);
    }
    action_set
}

fn test_row(result: &TestResult) -> Value {
    let color = match result.status {
        TestStatus::Pass => "Good",
        TestStatus::Fail => "Attention",
        TestStatus::Pending => "Default",
        TestStatus::Skipped => "Warning",
    };
    json!({
        "type": "ColumnSet",
        "columns": [
            {
                "type": "Column",
                "width": "auto",
                "verticalContentAlignment": "Center",
                "items": [
                    {
                        "type": "ActionSet",
                        "actions": [
                            {
                                "type": "Action.OpenUrl",
                                "url": result.url,
                                "style": "positive",
                                "iconUrl": "icon:CursorClick"
                            }
                        ]
                    }
                ]
            },
            {
                "type": "Column",
                "width": "auto",
                "verticalContentAlignment": "Center",
                "items": [
                    { "type": "TextBlock", "text": "\u{2589}", "color": color, "size": "ExtraLarge" }
                ]
            },
            {
                "type": "Column",
                "width": "stretch",
                "verticalContentAlignment": "Center",
                "items": [
                    { "type": "TextBlock", "text": result.name, "size": "Medium", "weight": "Bolder" }
                ]
            }
        ]
    })
}

/// Handler of the `microsoft` → `teams` drain.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicrosoftTeamsDrainHandler;

impl MicrosoftTeamsDrainHandler {
    async fn webhook_outlet(prompter: &dyn Prompter) -> Result<MicrosoftTeamsOutlet, HandlerError> {
        let incoming_webhook_url = env_or_input(prompter, EnvVariable::MicrosoftTeamsWebhookUrl, WEBHOOK_MESSAGE).await?;
        Ok(MicrosoftTeamsOutlet { incoming_webhook_url })
    }
}

#[async_trait]
impl DrainHandler for MicrosoftTeamsDrainHandler {
    type Drain = MicrosoftTeamsDrain;
    type SerializedDrain = NoConfiguration;
    type SerializedOutlet = NoConfiguration;

    async fn build_drain(&self, _prompter: &dyn Prompter) -> Result<MicrosoftTeamsDrain, HandlerError> {
        MicrosoftTeamsDrain::new()
    }

    fn serialize_drain(&self, _drain: &MicrosoftTeamsDrain) -> Result<NoConfiguration, HandlerError> {
        Ok(NoConfiguration::default())
    }

    async fn deserialize_drain(&self, _serialized: NoConfiguration, _prompter: &dyn Prompter) -> Result<MicrosoftTeamsDrain, HandlerError> {
        MicrosoftTeamsDrain::new()
    }

    async fn build_outlet(&self, prompter: &dyn Prompter) -> Result<MicrosoftTeamsOutlet, HandlerError> {
        Self::webhook_outlet(prompter).await
    }

    fn serialize_outlet(&self, _outlet: &MicrosoftTeamsOutlet) -> Result<NoConfiguration, HandlerError> {
        Ok(NoConfiguration::default())
    }

    async fn deserialize_outlet(&self, _serialized: NoConfiguration, prompter: &dyn Prompter) -> Result<MicrosoftTeamsOutlet, HandlerError> {
        Self::webhook_outlet(prompter).await
    }
}

#[cfg(test)]
mod tests {
    use parrot_util::ScriptedPrompter;

    use super::*;

    fn results() -> Vec<TestResult> {
        vec![
            TestResult::new("T1", "logs in", TestStatus::Pass),
            TestResult::new("T2", "logs out", TestStatus::Fail),
            TestResult::new("T3", "resets password", TestStatus::Pending),
            TestResult::new("T4", "deletes account", TestStatus::Skipped),
        ]
    }

    #[test]
    fn cards_summarize_the_results() {
        let card = test_results_card(&results());
        assert_eq!(card["type"], "message");
        let attachment = &card["attachments"][0];
        assert_eq!(attachment["contentType"], "application/vnd.microsoft.card.adaptive");
        assert!(attachment["contentUrl"].is_null());
        assert_eq!(attachment["content"]["version"], "1.5");

        let facts = attachment["content"]["body"][1]["facts"].as_array().unwrap();
        let facts: Vec<(&str, &str)> = facts
            .iter()
            .map(|fact| (fact["title"].as_str().unwrap(), fact["value"].as_str().unwrap()))
            .collect();
        assert_eq!(
            facts,
            vec![
                ("Test Cases", "4"),
                ("Passed", "1"),
                ("Failed", "1"),
                ("Skipped", "1"),
                ("Pending", "1"),
                ("Passing", "25.00 %"),
            ]
        );
    }

    #[test]
    fn test_rows_are_colored_by_status_in_input_order() {
        let card = test_results_card(&results());
        let list = &card["attachments"][0]["content"]["body"][2]["items"][2];
        assert_eq!(list["id"], TESTS_LIST_ID);
        assert_eq!(list["isVisible"], false);
        let rows = list["items"].as_array().unwrap();
        let colors: Vec<&str> = rows.iter().map(|row| row["columns"][1]["items"][0]["color"].as_str().unwrap()).collect();
        assert_eq!(colors, vec!["Good", "Attention", "Default", "Warning"]);
        assert_eq!(rows[1]["columns"][2]["items"][0]["text"], "logs out");
    }

    #[test]
    fn only_the_hide_button_starts_hidden() {
        let card = test_results_card(&[]);
        let toggles = &card["attachments"][0]["content"]["body"][2]["items"];
        assert!(toggles[0].get("isVisible").is_none());
        assert_eq!(toggles[1]["isVisible"], false);
        assert_eq!(toggles[0]["actions"][0]["targetElements"][2]["isVisible"], true);
    }

    #[tokio::test]
    async fn webhook_urls_are_never_stored() {
        let prompter = ScriptedPrompter::new(["https://example.webhook.office.com/webhookb2/secret", "https://example.webhook.office.com/webhookb2/secret"]);
        temp_env::async_with_vars([("MICROSOFT_TEAMS_WEBHOOK_URL", None::<&str>)], async {
            let handler = MicrosoftTeamsDrainHandler;
            let outlet = handler.build_outlet(&prompter).await.unwrap();
            let stored = serde_json::to_value(handler.serialize_outlet(&outlet).unwrap()).unwrap();
            assert_eq!(stored, json!({}));

            let restored = handler
                .deserialize_outlet(serde_json::from_value(stored).unwrap(), &prompter)
                .await
                .unwrap();
            assert_eq!(restored, outlet);
        })
        .await;
        assert_eq!(prompter.asked(), vec![WEBHOOK_MESSAGE, WEBHOOK_MESSAGE]);
    }
}

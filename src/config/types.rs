use serde::Deserialize;

/// Main configuration structure for Filing-Watch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub listing: ListingConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub store: StoreConfig,
    /// Classification is disabled when this section is absent
    #[serde(default)]
    pub classifier: Option<ClassifierConfig>,
}

/// Where and how to crawl the latest-filings listing
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// Origin of the listing site; relative filing links resolve against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Item code a filing must mention to be recorded (e.g. "1.05")
    #[serde(rename = "item-code")]
    pub item_code: String,

    /// Form type passed to the listing query
    #[serde(rename = "form-type", default = "default_form_type")]
    pub form_type: String,

    /// Text that marks a row as a filing entry
    #[serde(rename = "marker-phrase", default = "default_marker_phrase")]
    pub marker_phrase: String,

    /// Entries per listing page; one of 10, 20, 40, 80, 100
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per page before the crawl gives up
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(rename = "initial-backoff-ms", default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(rename = "max-backoff-ms", default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "client-name")]
    pub client_name: String,

    #[serde(rename = "client-version")]
    pub client_version: String,

    /// URL with information about the client
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for operator contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: Name/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.client_name, self.client_version, self.contact_url, self.contact_email
        )
    }
}

/// Remote document store holding the index
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// API root, e.g. "https://api.github.com"
    #[serde(rename = "api-url", default = "default_api_url")]
    pub api_url: String,

    pub owner: String,

    pub repo: String,

    /// Path of the index document inside the repository
    pub path: String,

    #[serde(default)]
    pub branch: Option<String>,

    /// Name of the environment variable carrying the API token
    #[serde(rename = "token-env", default = "default_token_env")]
    pub token_env: String,

    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Read-merge-write attempts when the conditional write conflicts
    #[serde(rename = "write-attempts", default = "default_write_attempts")]
    pub write_attempts: u32,

    /// Open an issue when new filings were added
    #[serde(default)]
    pub notify: bool,

    #[serde(rename = "issue-labels", default)]
    pub issue_labels: Vec<String>,
}

/// Language model used to judge materiality
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Chat-completion endpoint URL
    pub endpoint: String,

    pub model: String,

    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,

    /// Upper bound on filing text downloaded per filing
    #[serde(rename = "max-text-bytes", default = "default_max_text_bytes")]
    pub max_text_bytes: usize,

    /// Phrase where the classified section ends (case-insensitive)
    #[serde(rename = "end-marker", default = "default_end_marker")]
    pub end_marker: String,

    #[serde(rename = "timeout-secs", default = "default_classifier_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_form_type() -> String {
    "8-K".to_string()
}

fn default_marker_phrase() -> String {
    "Current report".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_write_attempts() -> u32 {
    3
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_text_bytes() -> usize {
    500_000
}

fn default_end_marker() -> String {
    "forward-looking statements".to_string()
}

fn default_classifier_timeout_secs() -> u64 {
    60
}

use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct ModelArgs {
    /// Path to the JSON model artifact
    #[arg(
        long = "model",
        env = "MODEL_PATH",
        global = true,
        default_value = "student_performance_model.json"
    )]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct DatabaseArgs {
    /// Full connection URL (mysql:// or sqlite://); overrides the parts below
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,
    #[arg(long, env = "DB_HOST", global = true, default_value = "localhost")]
    pub db_host: String,
    #[arg(long, env = "DB_NAME", global = true, default_value = "student_db")]
    pub db_name: String,
    #[arg(long, env = "DB_USER", global = true, default_value = "root")]
    pub db_user: String,
    #[arg(long, env = "DB_PASSWORD", global = true, default_value = "", hide_env_values = true)]
    pub db_password: String,
}

impl DatabaseArgs {
    pub fn settings(&self) -> DatabaseSettings {
        let url = match &self.database_url {
            Some(url) => url.clone(),
            None => mysql_url(&self.db_host, &self.db_name, &self.db_user, &self.db_password),
        };
        DatabaseSettings::new(url)
    }
}

/// Where prediction rows are written. Each operation opens its own
/// connection from these settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: String,
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn redacted_url(&self) -> String {
        redact_connection_url(&self.url)
    }
}

// MySQL negotiates mysql_native_password itself.
fn mysql_url(host: &str, database: &str, user: &str, password: &str) -> String {
    let user = urlencoding::encode(user);
    if password.is_empty() {
        format!("mysql://{user}@{host}/{database}")
    } else {
        let password = urlencoding::encode(password);
        format!("mysql://{user}:{password}@{host}/{database}")
    }
}

fn redact_connection_url(input: &str) -> String {
    let Some(scheme_idx) = input.find("://") else {
        return input.to_string();
    };

    let rest = &input[scheme_idx + 3..];
    let Some(at_idx) = rest.rfind('@') else {
        return input.to_string();
    };

    let prefix = &input[..scheme_idx + 3];
    let suffix = &rest[at_idx + 1..];
    format!("{prefix}[REDACTED]@{suffix}")
}

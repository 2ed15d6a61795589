use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::error::{AppError, AppResult};

const LOG_MODULES: &[&str] = &["stray_rescue", "tower_http"];

pub fn init_logging() {
    let mut env_filter = EnvFilter::from_default_env();

    for module in LOG_MODULES {
        env_filter = env_filter.add_directive(
            format!("{}=info", module)
                .parse()
                .expect("Could not parse logging directive"),
        );
    }

    if std::env::var("LOG_JSON").is_ok() {
        tracing_log::LogTracer::init().expect("Could not bridge log records");

        let stackdriver = tracing_stackdriver::layer();
        let subscriber = Registry::default().with(env_filter).with(stackdriver);

        tracing::subscriber::set_global_default(subscriber)
            .expect("Could not set up global logger");
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

/// Log a store or collaborator failure where it is converted for the client.
pub trait LogError<T> {
    fn log_error_internal(self) -> AppResult<T>;
    fn log_error_unavailable(self, what: &'static str) -> AppResult<T>;
}

impl<T, E> LogError<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn log_error_internal(self) -> AppResult<T> {
        match self {
            Ok(v) => Ok(v),
            Err(error) => {
                let error = error.into();
                tracing::error!(?error, "Error: {:?}", error);

                Err(AppError::Submission(error))
            }
        }
    }

    fn log_error_unavailable(self, what: &'static str) -> AppResult<T> {
        match self {
            Ok(v) => Ok(v),
            Err(error) => {
                let error = error.into();
                tracing::warn!(?error, "{} failed: {:?}", what, error);

                Err(AppError::Unavailable(what))
            }
        }
    }
}

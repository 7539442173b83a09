use crate::config::{LogFormat, Logging};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{EnvFilter, Layer};

/// Counts WARN and ERROR events into `dashboard_log_events_total{level}`.
/// Background tick failures only show up as warnings, so both levels matter.
struct LogEventCounter;

impl<S> Layer<S> for LogEventCounter
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let level = match *event.metadata().level() {
            Level::ERROR => "error",
            Level::WARN => "warn",
            _ => return,
        };
        metrics::counter!("dashboard_log_events_total", "level" => level).increment(1);
    }
}

/// Build the process dispatcher from the `[logging]` section. `RUST_LOG`
/// takes precedence over the configured level.
pub fn build_dispatch(service_name: &'static str, logging: &Logging) -> tracing::Dispatch {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let fmt_layer = match logging.format {
        LogFormat::Json => fmt_layer.json().boxed(),
        LogFormat::Pretty => fmt_layer.pretty().boxed(),
    };

    let subscriber = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .with(LogEventCounter);

    let dispatch = tracing::Dispatch::new(subscriber);
    tracing::dispatcher::with_default(&dispatch, || {
        tracing::debug!(service = service_name, format = ?logging.format, "logging configured");
    });
    dispatch
}

/// Install the dispatcher process-wide. Returns false if one was already set.
pub fn init(service_name: &'static str, logging: &Logging) -> bool {
    tracing::dispatcher::set_global_default(build_dispatch(service_name, logging)).is_ok()
}

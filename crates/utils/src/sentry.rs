//! Optional Sentry error reporting, enabled only when `SENTRY_DSN` is set.

use std::sync::OnceLock;

use sentry_tracing::{EventFilter, SentryLayer};
use tracing::Level;

static INIT_GUARD: OnceLock<Option<sentry::ClientInitGuard>> = OnceLock::new();

fn environment() -> &'static str {
    if cfg!(debug_assertions) {
        "dev"
    } else {
        "production"
    }
}

/// Initialise the Sentry client once per process. Returns whether reporting is active.
pub fn init_once() -> bool {
    INIT_GUARD
        .get_or_init(|| {
            let dsn = std::env::var("SENTRY_DSN").ok().filter(|d| !d.trim().is_empty())?;
            Some(sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    environment: Some(environment().into()),
                    ..Default::default()
                },
            )))
        })
        .is_some()
}

/// Tracing layer forwarding `error!` events to Sentry and keeping `warn!`/`info!` as breadcrumbs.
pub fn sentry_layer<S>() -> SentryLayer<S>
where
    S: tracing::Subscriber,
    S: for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    SentryLayer::default()
        .span_filter(|meta| {
            matches!(
                *meta.level(),
                Level::DEBUG | Level::INFO | Level::WARN | Level::ERROR
            )
        })
        .event_filter(|meta| match *meta.level() {
            Level::ERROR => EventFilter::Event,
            Level::DEBUG | Level::INFO | Level::WARN => EventFilter::Breadcrumb,
            Level::TRACE => EventFilter::Ignore,
        })
}

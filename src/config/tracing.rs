use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn subscribe_tracing() {
    let mut filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    for directive in ["sqlx=off", "sea_orm=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true),
        )
        .with(filter)
        .init();
}

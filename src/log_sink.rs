//! Progress handler that re-emits library messages through the `log` facade.

use std::ffi::CStr;
use std::sync::Arc;

use log::{log, LevelFilter};

use crate::config::LoggingConfig;
use crate::context::{Context, Level};
use crate::error::Result;
use crate::registry::Registry;

#[derive(Debug, Clone)]
pub struct LogSink {
    target: String,
    max_level: LevelFilter,
}

impl LogSink {
    pub fn new(target: impl Into<String>, max_level: LevelFilter) -> Self {
        Self {
            target: target.into(),
            max_level,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Result<Self> {
        Ok(Self::new(config.target.clone(), config.level_filter()?))
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Level and trimmed text for a message, or `None` if it is filtered out.
    /// OpenConnect terminates most messages with a newline; that is dropped.
    pub fn render(&self, level: Level, text: &CStr) -> Option<(log::Level, String)> {
        let level = level.to_log_level();
        if level > self.max_level {
            return None;
        }
        let text = text.to_string_lossy();
        Some((level, text.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub fn emit(&self, ctx: Context, level: Level, text: &CStr) {
        if let Some((level, message)) = self.render(level, text) {
            log!(target: self.target.as_str(), level, "[{ctx}] {message}");
        }
    }

    /// Take both progress slots of `registry`.
    pub fn register(self, registry: &Registry) {
        let sink = Arc::new(self);

        let text_sink = Arc::clone(&sink);
        registry.register_progress(move |ctx, level, text| text_sink.emit(ctx, level, text));

        registry.register_progress_cursor(move |ctx, level, cursor| {
            if let Some(text) = cursor.format() {
                sink.emit(ctx, level, &text);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_maps_levels_and_trims() {
        let sink = LogSink::new("openconnect", LevelFilter::Trace);
        assert_eq!(
            sink.render(Level::ERR, c"SSL negotiation failed\n"),
            Some((log::Level::Error, "SSL negotiation failed".to_string()))
        );
        assert_eq!(
            sink.render(Level::TRACE, c"raw packet\r\n"),
            Some((log::Level::Trace, "raw packet".to_string()))
        );
        assert_eq!(sink.render(Level::INFO, c""), Some((log::Level::Info, String::new())));
    }

    #[test]
    fn test_render_filters_verbose_levels() {
        let sink = LogSink::new("openconnect", LevelFilter::Info);
        assert!(sink.render(Level::INFO, c"Connected to 10.0.0.1\n").is_some());
        assert!(sink.render(Level::DEBUG, c"Got HTTP response\n").is_none());
        assert!(sink.render(Level::TRACE, c"> GET / HTTP/1.1\n").is_none());
    }

    #[test]
    fn test_from_config() {
        let mut config = LoggingConfig::default();
        config.target = "vpn".to_string();
        config.level = "debug".to_string();
        let sink = LogSink::from_config(&config).unwrap();
        assert_eq!(sink.target(), "vpn");
        assert!(sink.render(Level::DEBUG, c"x").is_some());
        assert!(sink.render(Level::TRACE, c"x").is_none());

        config.level = "chatty".to_string();
        assert!(LogSink::from_config(&config).is_err());
    }

    #[test]
    fn test_register_takes_both_slots() {
        let registry = Registry::new();
        LogSink::new("openconnect", LevelFilter::Off).register(&registry);
        assert!(registry.has_progress());
        assert!(registry.has_progress_cursor());
        assert!(registry.dispatch_progress(Context::NULL, Level::ERR, c"filtered out"));
    }
}

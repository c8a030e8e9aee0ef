//! Custom tracing layers for mirrorsim
//!
//! [`StructureContextLayer`] stamps new spans with the active structure
//! context; [`jsonl_layer`] builds the JSON formatter shared by console and
//! file output.

use tracing::{Subscriber, span};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::{
    layer::{Context, Layer},
    registry::LookupSpan,
};

use crate::config::JsonlConfig;
use crate::context::{StructureContextData, StructureContextGuard};

/// Layer that attaches the active structure context to new spans
///
/// The context is stored as a [`StructureContextExtension`] so later layers
/// and span lookups can recover which instance a span was opened for.
#[derive(Debug, Default)]
pub struct StructureContextLayer;

impl StructureContextLayer {
    pub fn new() -> Self {
        Self
    }
}

/// Extension data stored on spans
#[derive(Debug, Clone)]
pub struct StructureContextExtension {
    pub data: StructureContextData,
}

impl<S> Layer<S> for StructureContextLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, _attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            if let Some(data) = StructureContextGuard::current() {
                span.extensions_mut().insert(StructureContextExtension { data });
            }
        }
    }
}

/// JSONL formatting layer writing to `writer`
pub fn jsonl_layer<S, W>(
    writer: W,
    config: &JsonlConfig,
) -> tracing_subscriber::fmt::Layer<S, JsonFields, Format<Json>, W>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(config.current_span)
        .with_span_list(config.span_list)
        .flatten_event(config.flatten)
        .with_file(config.location)
        .with_line_number(config.location)
        .with_thread_ids(config.thread_info)
        .with_thread_names(config.thread_info)
        .with_writer(writer)
}

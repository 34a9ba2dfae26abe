use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use tracing::level_filters::LevelFilter;
use tracing::Dispatch;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::{Layer, Layered, SubscriberExt};
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::log_format::JsonRecordFormat;

type Filtered = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Filtered> + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkKind {
    File(PathBuf),
    Stderr,
}

/// An append-only destination with its own background writer. Records reach the
/// destination in the order they were emitted.
pub struct Sink {
    pub kind: SinkKind,
    writer: NonBlocking,
    guard: WorkerGuard,
}

impl Sink {
    pub fn file(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let (writer, guard) = tracing_appender::non_blocking(file);
        Ok(Self {
            kind: SinkKind::File(path.to_path_buf()),
            writer,
            guard,
        })
    }

    pub fn stderr() -> Self {
        let (writer, guard) = tracing_appender::non_blocking(io::stderr());
        Self {
            kind: SinkKind::Stderr,
            writer,
            guard,
        }
    }

    fn into_layer(self) -> (BoxedLayer, WorkerGuard) {
        let layer = fmt::layer()
            .with_ansi(false)
            .event_format(JsonRecordFormat::default())
            .with_writer(self.writer)
            .boxed();
        (layer, self.guard)
    }
}

/// File sink first, then stderr when requested.
///
/// A file that cannot be opened is reported on raw stderr and skipped so the
/// remaining sinks still work.
pub fn build_sinks(path: &Path, also_stderr: bool) -> Vec<Sink> {
    let mut sinks = Vec::with_capacity(2);
    match Sink::file(path) {
        Ok(sink) => sinks.push(sink),
        Err(e) => eprintln!("Failed to open log file {}: {e}", path.display()),
    }
    if also_stderr {
        sinks.push(Sink::stderr());
    }
    sinks
}

/// Merges the sinks into one dispatcher. Every record goes to every sink.
pub fn fan_out(sinks: Vec<Sink>, level: LevelFilter) -> (Dispatch, Vec<WorkerGuard>) {
    let filter = EnvFilter::default().add_directive(level.into());
    let base = tracing_subscriber::registry().with(filter);

    let mut guards = Vec::with_capacity(sinks.len());
    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(sinks.len());
    for sink in sinks {
        let (layer, guard) = sink.into_layer();
        layers.push(layer);
        guards.push(guard);
    }

    let dispatch = if layers.len() == 1 {
        let single = layers.remove(0);
        Dispatch::new(base.with(single))
    } else {
        Dispatch::new(base.with(layers))
    };
    (dispatch, guards)
}

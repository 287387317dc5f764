use std::{
    backtrace::Backtrace,
    fmt,
    panic::Location,
    process,
    sync::{Arc, OnceLock},
};

use env_logger::{Target, WriteStyle, fmt::Formatter};
use log::{Log, Record};
use serde_json::{Map, Value};

use crate::{
    config::LogConfig,
    encoder::{Envelope, RecordEncoder},
    error::{Error, Result},
    field::Field,
    level::{FATAL_EXIT_CODE, Severity},
    sink::SharedSinks,
};

static GLOBAL: OnceLock<LoggerFactory> = OnceLock::new();

/// Install the configuration of the process-wide logger.
///
/// Must run before the first [`logger`] call; afterwards the global engine
/// exists and the call fails with [`Error::AlreadyConfigured`].
pub fn configure(config: LogConfig) -> Result<()> {
    GLOBAL
        .set(LoggerFactory::new(config))
        .map_err(|_| Error::AlreadyConfigured)
}

/// Acquire a handle on the process-wide logger, bound to the caller's line.
///
/// Uses [`LogConfig::default`] unless [`configure`] ran first.
#[track_caller]
pub fn logger() -> LoggerHandle {
    GLOBAL
        .get_or_init(|| LoggerFactory::new(LogConfig::default()))
        .acquire()
}

/// The configured engine: `env_logger` writing JSON records to the sinks.
pub(crate) struct Engine {
    inner: env_logger::Logger,
    sinks: SharedSinks,
    level: Severity,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("sinks", &self.sinks)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl Engine {
    fn build(config: &LogConfig) -> Result<Self> {
        let sinks = SharedSinks::open(
            &config.effective_output_paths(),
            &config.error_output_paths,
        )?;
        let encoder = RecordEncoder::new(config.caller);
        let inner = env_logger::Builder::new()
            .filter_level(config.level.engine_filter())
            .write_style(WriteStyle::Never)
            .target(Target::Pipe(Box::new(sinks.clone())))
            .format(move |buf: &mut Formatter, record: &Record<'_>| {
                encoder.write(buf, record)
            })
            .build();
        Ok(Self {
            inner,
            sinks,
            level: config.level,
        })
    }

    fn enabled(&self, severity: Severity) -> bool {
        severity >= self.level
    }

    fn emit(
        &self,
        severity: Severity,
        caller: &'static Location<'static>,
        message: &str,
        envelope: &Envelope<'_>,
    ) {
        self.inner.log(
            &Record::builder()
                .args(format_args!("{message}"))
                .level(severity.engine_level())
                .target(severity.target())
                .file_static(Some(caller.file()))
                .line(Some(caller.line()))
                .key_values(envelope)
                .build(),
        );
    }

    fn sync(&self) -> Result<()> {
        self.inner.flush();
        self.sinks.sync()
    }
}

type EngineSlot = std::result::Result<Arc<Engine>, Arc<Error>>;

/// Builds the engine on first acquisition and hands out caller-bound handles.
///
/// Construction runs at most once per factory, however many threads race
/// the first [`acquire`](Self::acquire). A failed construction is kept and
/// every handle of this factory panics when it emits.
#[derive(Debug)]
pub struct LoggerFactory {
    config: LogConfig,
    engine: OnceLock<EngineSlot>,
}

impl LoggerFactory {
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            engine: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    fn engine(&self) -> &EngineSlot {
        self.engine
            .get_or_init(|| Engine::build(&self.config).map(Arc::new).map_err(Arc::new))
    }

    /// Handle whose records carry the caller's line as `src_line` and nest
    /// every attached field under `context`.
    #[track_caller]
    pub fn acquire(&self) -> LoggerHandle {
        let caller = Location::caller();
        LoggerHandle {
            engine: self.engine().clone(),
            src_line: caller.line().to_string().into(),
            context: Map::new(),
        }
    }

    /// Swap the configuration and drop the engine so the next acquisition
    /// builds a fresh one. Test harnesses only.
    #[doc(hidden)]
    pub fn reset(&mut self, config: LogConfig) {
        self.config = config;
        self.engine = OnceLock::new();
    }
}

#[derive(Debug, Clone)]
pub struct LoggerHandle {
    engine: EngineSlot,
    src_line: Arc<str>,
    context: Map<String, Value>,
}

impl LoggerHandle {
    #[track_caller]
    fn engine(&self) -> &Engine {
        match &self.engine {
            Ok(engine) => engine,
            Err(err) => panic!("logger is unusable, engine construction failed: {err}"),
        }
    }

    /// Line of the `acquire`/`logger` call this handle came from.
    pub fn src_line(&self) -> &str {
        &self.src_line
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        self.engine().enabled(severity)
    }

    /// Child handle with `fields` bound under `context` for every record.
    pub fn with(&self, fields: &[Field]) -> LoggerHandle {
        let mut child = self.clone();
        for field in fields {
            let (key, value) = field.clone().into_pair();
            child.context.insert(key, value);
        }
        child
    }

    /// Emit one record. Per-call fields override bound fields of the same
    /// key. A fatal record exits the process after it is written.
    #[track_caller]
    pub fn log(&self, severity: Severity, message: &str, fields: &[Field]) {
        let engine = self.engine();
        if engine.enabled(severity) {
            let context = if fields.is_empty() {
                None
            } else {
                let mut merged = self.context.clone();
                for field in fields {
                    let (key, value) = field.clone().into_pair();
                    merged.insert(key, value);
                }
                Some(merged)
            };
            let backtrace = severity
                .captures_backtrace()
                .then(|| Backtrace::force_capture().to_string());
            let envelope = Envelope {
                src_line: &self.src_line,
                context: context.as_ref().unwrap_or(&self.context),
                backtrace: backtrace.as_deref(),
            };
            engine.emit(severity, Location::caller(), message, &envelope);
        }

        if severity == Severity::Fatal {
            if let Err(err) = engine.sync() {
                engine.sinks.report(&err.to_string());
            }
            process::exit(FATAL_EXIT_CODE);
        }
    }

    #[track_caller]
    pub fn debug(&self, message: &str, fields: &[Field]) {
        self.log(Severity::Debug, message, fields);
    }

    #[track_caller]
    pub fn info(&self, message: &str, fields: &[Field]) {
        self.log(Severity::Info, message, fields);
    }

    /// Rendered as `"level":"warning"`.
    #[track_caller]
    pub fn warn(&self, message: &str, fields: &[Field]) {
        self.log(Severity::Warn, message, fields);
    }

    #[track_caller]
    pub fn error(&self, message: &str, fields: &[Field]) {
        self.log(Severity::Error, message, fields);
    }

    /// Write the record, flush, and exit with [`FATAL_EXIT_CODE`].
    #[track_caller]
    pub fn fatal(&self, message: &str, fields: &[Field]) -> ! {
        self.log(Severity::Fatal, message, fields);
        process::exit(FATAL_EXIT_CODE)
    }

    /// Flush buffered records to every destination.
    #[track_caller]
    pub fn sync(&self) -> Result<()> {
        self.engine().sync()
    }

    /// Guard that syncs when dropped, including while unwinding.
    pub fn sync_on_drop(&self) -> SyncGuard {
        SyncGuard {
            handle: self.clone(),
        }
    }
}

/// Returned by [`LoggerHandle::sync_on_drop`]. Sync failures are reported to
/// the error outputs.
#[must_use = "records are flushed when the guard is dropped"]
#[derive(Debug)]
pub struct SyncGuard {
    handle: LoggerHandle,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        if let Ok(engine) = &self.handle.engine {
            if let Err(err) = engine.sync() {
                engine.sinks.report(&err.to_string());
            }
        }
    }
}

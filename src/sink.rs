use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;

use crate::{
    encoder::encode_time,
    error::{Error, Result},
};

pub const STDOUT: &str = "stdout";
pub const STDERR: &str = "stderr";

/// One opened destination.
#[derive(Debug)]
enum Sink {
    Stdout,
    Stderr,
    File { path: String, file: File },
}

impl Sink {
    fn open(path: &str) -> Result<Self> {
        match path {
            STDOUT => Ok(Sink::Stdout),
            STDERR => Ok(Sink::Stderr),
            _ => OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map(|file| Sink::File {
                    path: path.to_string(),
                    file,
                })
                .map_err(|source| Error::OpenDestination {
                    path: path.to_string(),
                    source,
                }),
        }
    }

    fn name(&self) -> &str {
        match self {
            Sink::Stdout => STDOUT,
            Sink::Stderr => STDERR,
            Sink::File { path, .. } => path,
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Sink::Stdout => io::stdout().lock().write_all(buf),
            Sink::Stderr => io::stderr().lock().write_all(buf),
            Sink::File { file, .. } => file.write_all(buf),
        }
    }

    fn sync(&mut self) -> io::Result<()> {
        match self {
            Sink::Stdout => io::stdout().flush(),
            Sink::Stderr => io::stderr().flush(),
            Sink::File { file, .. } => {
                file.flush()?;
                file.sync_data()
            }
        }
    }
}

#[derive(Debug)]
struct SinkSet {
    outputs: Vec<Sink>,
    errors: Vec<Sink>,
}

impl SinkSet {
    fn write_record(&mut self, buf: &[u8]) {
        let mut failures = Vec::new();
        for sink in &mut self.outputs {
            if let Err(e) = sink.write_all(buf) {
                failures.push(format!("write error on {}: {e}", sink.name()));
            }
        }
        for failure in failures {
            self.report(&failure);
        }
    }

    // Failures of the error outputs themselves have nowhere left to go.
    fn report(&mut self, message: &str) {
        let line = format!("{} {message}\n", encode_time(&Utc::now()));
        for sink in &mut self.errors {
            let _ = sink.write_all(line.as_bytes());
        }
    }
}

/// Output and error-output destinations shared between the engine's write
/// path and `sync`.
#[derive(Debug, Clone)]
pub(crate) struct SharedSinks {
    inner: Arc<Mutex<SinkSet>>,
}

impl SharedSinks {
    /// Open every destination; the first one that fails aborts construction.
    pub(crate) fn open(outputs: &[String], errors: &[String]) -> Result<Self> {
        let outputs = outputs
            .iter()
            .map(|path| Sink::open(path))
            .collect::<Result<Vec<_>>>()?;
        let errors = errors
            .iter()
            .map(|path| Sink::open(path))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            inner: Arc::new(Mutex::new(SinkSet { outputs, errors })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SinkSet> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flush every output. The first failure is returned; the rest are
    /// reported to the error outputs.
    pub(crate) fn sync(&self) -> Result<()> {
        let mut set = self.lock();
        let mut first = None;
        let mut rest = Vec::new();
        for sink in &mut set.outputs {
            if let Err(source) = sink.sync() {
                let err = Error::Sync {
                    path: sink.name().to_string(),
                    source,
                };
                if first.is_none() {
                    first = Some(err);
                } else {
                    rest.push(err.to_string());
                }
            }
        }
        for message in rest {
            set.report(&message);
        }
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub(crate) fn report(&self, message: &str) {
        self.lock().report(message);
    }
}

impl Write for SharedSinks {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write_record(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, path::PathBuf};
    use uuid::Uuid;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("logs-plus-sink-{name}-{}.log", Uuid::new_v4()))
    }

    #[test]
    fn fans_out_to_every_file() -> Result<()> {
        let first = temp_path("first");
        let second = temp_path("second");
        let paths = vec![
            first.to_string_lossy().into_owned(),
            second.to_string_lossy().into_owned(),
        ];
        let mut sinks = SharedSinks::open(&paths, &[STDERR.to_string()])?;
        sinks.write_all(b"{\"message\":\"one\"}\n").unwrap();
        sinks.write_all(b"{\"message\":\"two\"}\n").unwrap();
        sinks.sync()?;

        for path in [&first, &second] {
            let contents = fs::read_to_string(path).unwrap();
            assert_eq!(contents.lines().count(), 2);
            fs::remove_file(path).unwrap();
        }
        Ok(())
    }

    #[test]
    fn files_are_appended_not_truncated() -> Result<()> {
        let path = temp_path("append");
        fs::write(&path, "existing\n").unwrap();
        let mut sinks = SharedSinks::open(&[path.to_string_lossy().into_owned()], &[])?;
        sinks.write_all(b"new\n").unwrap();
        sinks.sync()?;
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing\nnew\n");
        fs::remove_file(&path).unwrap();
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn write_failures_go_to_error_outputs() -> Result<()> {
        let good = temp_path("good");
        let errors = temp_path("errors");
        let mut sinks = SharedSinks::open(
            &["/dev/full".to_string(), good.to_string_lossy().into_owned()],
            &[errors.to_string_lossy().into_owned()],
        )?;
        sinks.write_all(b"{\"message\":\"kept\"}\n").unwrap();

        assert_eq!(fs::read_to_string(&good).unwrap(), "{\"message\":\"kept\"}\n");
        let reported = fs::read_to_string(&errors).unwrap();
        let lines: Vec<&str> = reported.lines().collect();
        assert_eq!(lines.len(), 1);
        let (time, message) = lines[0].split_once(' ').unwrap();
        assert!(crate::encoder::parse_time(time).is_ok());
        assert!(message.starts_with("write error on /dev/full: "), "{message}");

        fs::remove_file(&good).unwrap();
        fs::remove_file(&errors).unwrap();
        Ok(())
    }

    #[test]
    fn reports_are_timestamped_lines() -> Result<()> {
        let errors = temp_path("report");
        let sinks = SharedSinks::open(&[], &[errors.to_string_lossy().into_owned()])?;
        sinks.report("sync error: disk gone");

        let reported = fs::read_to_string(&errors).unwrap();
        let (time, message) = reported.trim_end().split_once(' ').unwrap();
        assert!(crate::encoder::parse_time(time).is_ok());
        assert_eq!(message, "sync error: disk gone");
        fs::remove_file(&errors).unwrap();
        Ok(())
    }

    #[test]
    fn unopenable_destination_is_reported_by_path() {
        let missing = std::env::temp_dir()
            .join("logs-plus-missing-dir")
            .join("nested")
            .join("out.log");
        let path = missing.to_string_lossy().into_owned();
        let err = SharedSinks::open(&[path.clone()], &[]).unwrap_err();
        assert!(matches!(&err, Error::OpenDestination { path: p, .. } if *p == path));
    }
}

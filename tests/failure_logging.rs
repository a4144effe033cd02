//! Failures are returned to the caller, never logged at error level by the unit.
//!
//! Lives in its own test binary because it installs the global logger.

use forgeline::prelude::*;
use std::sync::Mutex;

struct Capture {
    records: Mutex<Vec<(log::Level, String)>>,
}

impl log::Log for Capture {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture {
    records: Mutex::new(Vec::new()),
};

#[test]
fn test_failed_dispatch_is_reported_once_to_the_caller() {
    log::set_logger(&CAPTURE).unwrap();
    log::set_max_level(log::LevelFilter::Trace);

    let unit = UnitFactory::default().from_fn(
        |_unit: &Unit, _carrier: Carrier| Err("jammed".into()),
        FnConfig::sync().with_options(UnitOptions::default().with_name("press")),
    );
    let err = unit.process_now(Carrier::new()).unwrap_err();
    assert_eq!(err.as_tagged().unwrap().cause().to_string(), "jammed");

    let records = CAPTURE.records.lock().unwrap();
    assert!(records.iter().all(|(level, _)| *level > log::Level::Warn));
    assert!(
        records
            .iter()
            .any(|(level, msg)| *level == log::Level::Debug && msg.contains("jammed"))
    );
}

//! Fuzz target: persisted config blob
//!
//! Writes arbitrary bytes where the config lives and loads it back:
//! - No panics on any blob
//! - Whatever `load` accepts also passes `validate_config`
//! - A config that loaded can be saved again
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use envnode::adapters::nvs::{validate_config, NvsAdapter};
use envnode::app::ports::{ConfigPort, StoragePort};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut nvs = NvsAdapter::unavailable();
    if nvs.write("envnode", "syscfg", data).is_err() {
        return;
    }

    if let Ok(cfg) = nvs.load() {
        assert!(validate_config(&cfg).is_ok(), "load accepted an invalid config");
        assert!(nvs.save(&cfg).is_ok(), "loaded config failed to save");
    }
});

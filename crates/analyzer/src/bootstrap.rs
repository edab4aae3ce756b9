//! Entry point: resolve a raw resource, open it, build a driver, start it.

use crate::driver::DecoderDriver;
use nalu_core::error::NaluResult;
use nalu_provider::{AssetProvider, AssetRef, AssetStream};
use std::collections::BTreeMap;

/// Saved state handed back on a relaunch. Absent on a cold start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchState {
    pub saved: BTreeMap<String, String>,
}

impl LaunchState {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.saved.get(key).map(String::as_str)
    }
}

/// Opens `asset` once, builds one driver over the stream and starts it.
///
/// The stream's ownership moves into the driver. If resolution, opening or
/// construction fails, nothing is started and any opened stream is released.
pub fn launch<P, D, F>(
    provider: &P,
    asset: &AssetRef,
    state: Option<&LaunchState>,
    make_driver: F,
) -> NaluResult<D::Handle>
where
    P: AssetProvider + ?Sized,
    D: DecoderDriver,
    F: FnOnce(AssetStream) -> NaluResult<D>,
{
    tracing::info!(
        asset = %asset,
        restored = state.is_some(),
        saved_keys = state.map_or(0, |s| s.saved.len()),
        "launching"
    );

    let entry = provider.resolve(asset)?;
    let stream = provider.open_raw(entry.id)?;
    tracing::info!(id = %entry.id, name = %entry.name, size = entry.size, "opened raw resource");

    let driver = make_driver(stream)?;
    driver.start()
}

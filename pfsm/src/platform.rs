//! Enumeration of the PFSM cores present on a platform
//!
//! Every probed core becomes a [`Device`] named `pfsm<N>` after the first free slot, with its
//! own session guard.

use crate::{
    core::AddressMap,
    session::Device,
    transport::{
        self,
        local::{
            Local,
            LocalConfig,
        },
        Transport,
    },
};
use pfsm_utils::params::HardwareParameters;
use thiserror::Error;
use tracing::info;

/// The most cores a platform will enumerate
pub const MAX_DEVICES: usize = 2;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Every device slot is taken")]
    NoMoreDevices,
    #[error("Region of {size} bytes doesn't cover the {needed} byte register window")]
    RegionTooSmall { size: usize, needed: usize },
    #[error(transparent)]
    Transport(#[from] transport::Error),
}

fn check_region(map: &AddressMap, size: usize) -> Result<(), Error> {
    let needed = map.window_len();
    if size < needed {
        return Err(Error::RegionTooSmall { size, needed });
    }
    Ok(())
}

#[derive(Debug)]
pub struct Platform<T> {
    slots: Vec<Option<Device<T>>>,
}

impl<T> Default for Platform<T> {
    fn default() -> Self {
        Self {
            slots: (0..MAX_DEVICES).map(|_| None).collect(),
        }
    }
}

impl<T> Platform<T>
where
    T: Transport,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a core with the given parameters reached through `transport`
    /// # Errors
    /// Returns [`Error::NoMoreDevices`] once every slot is taken, or
    /// [`Error::RegionTooSmall`] if the transport can't reach every register
    pub fn probe(&mut self, params: HardwareParameters, transport: T) -> Result<&Device<T>, Error> {
        let idx = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::NoMoreDevices)?;
        let map = AddressMap::new(params);
        check_region(&map, transport.size())?;
        let name = format!("pfsm{idx}");
        info!(
            device = %name,
            region = transport.size(),
            addr_w = map.addr_w(),
            "Probed PFSM"
        );
        Ok(self.slots[idx].insert(Device::new(&name, map, transport)))
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Device<T>> {
        self.slots.get(idx)?.as_ref()
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Device<T>> {
        self.devices().find(|device| device.name() == name)
    }

    /// Every probed device, in slot order
    pub fn devices(&self) -> impl Iterator<Item = &Device<T>> {
        self.slots.iter().flatten()
    }

    /// Take a device out of the platform, freeing its slot
    pub fn remove(&mut self, idx: usize) -> Option<Device<T>> {
        let device = self.slots.get_mut(idx)?.take()?;
        info!(device = device.name(), "Removed PFSM");
        Some(device)
    }
}

impl Platform<Local> {
    /// Map the register window described by `config` and register it as a core
    /// # Errors
    /// Returns an error if the window can't be mapped or every slot is taken
    pub fn probe_local(
        &mut self,
        params: HardwareParameters,
        config: &LocalConfig,
    ) -> Result<&Device<Local>, Error> {
        if self.slots.iter().all(Option::is_some) {
            return Err(Error::NoMoreDevices);
        }
        check_region(&AddressMap::new(params), config.size)?;
        let transport = Local::new(config)?;
        self.probe(params, transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::Mock;

    fn mock(params: HardwareParameters) -> Mock {
        Mock::new(AddressMap::new(params))
    }

    #[test]
    fn test_probe_names() {
        let params = HardwareParameters::new(2, 1, 1).unwrap();
        let mut platform = Platform::new();
        assert_eq!(platform.probe(params, mock(params)).unwrap().name(), "pfsm0");
        assert_eq!(platform.probe(params, mock(params)).unwrap().name(), "pfsm1");
        assert!(matches!(
            platform.probe(params, mock(params)),
            Err(Error::NoMoreDevices)
        ));
        assert_eq!(platform.devices().count(), 2);
    }

    #[test]
    fn test_lookup() {
        let small = HardwareParameters::new(2, 1, 1).unwrap();
        let big = HardwareParameters::new(8, 2, 16).unwrap();
        let mut platform = Platform::new();
        platform.probe(small, mock(small)).unwrap();
        platform.probe(big, mock(big)).unwrap();
        assert_eq!(platform.get(1).unwrap().map().params(), &big);
        assert_eq!(platform.find("pfsm0").unwrap().map().params(), &small);
        assert!(platform.find("pfsm2").is_none());
        assert!(platform.get(2).is_none());
    }

    #[test]
    fn test_remove_frees_slot() {
        let params = HardwareParameters::new(2, 1, 1).unwrap();
        let mut platform = Platform::new();
        platform.probe(params, mock(params)).unwrap();
        platform.probe(params, mock(params)).unwrap();
        let removed = platform.remove(0).unwrap();
        assert_eq!(removed.name(), "pfsm0");
        assert!(platform.get(0).is_none());
        assert!(platform.remove(0).is_none());
        assert_eq!(platform.probe(params, mock(params)).unwrap().name(), "pfsm0");
    }

    #[test]
    fn test_region_too_small() {
        let params = HardwareParameters::new(2, 1, 1).unwrap();
        let map = AddressMap::new(params);
        let mut platform = Platform::new();
        // Ends right before soft reset
        assert!(matches!(
            platform.probe(params, Mock::with_size(map.clone(), 36)),
            Err(Error::RegionTooSmall {
                size: 36,
                needed: 48
            })
        ));
        assert!(platform.get(0).is_none());
        // Covering the version slot is enough, the padding up to `2^addr_w` isn't needed
        assert_eq!(
            platform.probe(params, Mock::with_size(map, 48)).unwrap().name(),
            "pfsm0"
        );
    }

    #[test]
    fn test_probe_local_region_too_small() {
        let params = HardwareParameters::new(2, 1, 1).unwrap();
        let config = LocalConfig {
            path: "/nonexistent/pfsm".into(),
            base_addr: 0,
            size: 16,
        };
        // Rejected before the device file is ever opened
        assert!(matches!(
            Platform::new().probe_local(params, &config),
            Err(Error::RegionTooSmall { size: 16, .. })
        ));
    }

    #[test]
    fn test_devices_are_independent() {
        let params = HardwareParameters::new(2, 1, 1).unwrap();
        let mut platform = Platform::new();
        platform.probe(params, mock(params)).unwrap();
        platform.probe(params, mock(params)).unwrap();
        let _first = platform.get(0).unwrap().open().unwrap();
        assert!(platform.get(1).unwrap().open().is_ok());
    }
}

//! Receiver topology
//!
//! A frame is cut into square panels. Each panel belongs to one receiver,
//! identified by a one-byte hardware ID that must be unique among the
//! receivers sharing its link.

use crate::{LedToneError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Marker byte that starts every frame packet
pub const FRAME_SYNC: u8 = 0xAA;

/// One receiver and the panel it owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    /// Hardware ID within the link
    pub id: u8,
    /// Link index the receiver listens on
    pub link: usize,
    /// Panel's left edge in the frame
    pub origin_x: usize,
    /// Panel's top edge in the frame
    pub origin_y: usize,
}

/// Validated frame layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    frame_width: usize,
    frame_height: usize,
    panel_size: usize,
    link_count: usize,
    devices: Vec<DeviceSpec>,
}

impl Topology {
    /// Validate and build a topology
    pub fn new(
        frame_width: usize,
        frame_height: usize,
        panel_size: usize,
        link_count: usize,
        devices: Vec<DeviceSpec>,
    ) -> Result<Self> {
        let err = |msg: String| Err(LedToneError::ConfigError(msg));

        if panel_size == 0 {
            return err("panel size must be non-zero".into());
        }
        if (panel_size * panel_size) % 2 != 0 {
            return err(format!(
                "panel {}x{} has an odd LED count and cannot be nibble-packed",
                panel_size, panel_size
            ));
        }
        if link_count == 0 {
            return err("at least one link is required".into());
        }

        let mut seen = HashSet::new();
        for dev in &devices {
            if dev.link >= link_count {
                return err(format!(
                    "device {} is on link {} but only {} links exist",
                    dev.id, dev.link, link_count
                ));
            }
            if dev.id == FRAME_SYNC {
                return err(format!(
                    "hardware ID {:#04x} collides with the sync byte",
                    dev.id
                ));
            }
            if !seen.insert((dev.link, dev.id)) {
                return err(format!("duplicate hardware ID {} on link {}", dev.id, dev.link));
            }
            if dev.origin_x + panel_size > frame_width || dev.origin_y + panel_size > frame_height {
                return err(format!(
                    "panel of device {} at ({}, {}) extends past the {}x{} frame",
                    dev.id, dev.origin_x, dev.origin_y, frame_width, frame_height
                ));
            }
        }

        Ok(Topology {
            frame_width,
            frame_height,
            panel_size,
            link_count,
            devices,
        })
    }

    /// Tile a frame with panels in row-major order, assigning IDs 0.. per link
    /// and spreading consecutive panels across links round-robin
    pub fn grid(
        frame_width: usize,
        frame_height: usize,
        panel_size: usize,
        link_count: usize,
    ) -> Result<Self> {
        if panel_size == 0 || link_count == 0 {
            return Self::new(frame_width, frame_height, panel_size, link_count, Vec::new());
        }
        let mut next_id = vec![0u8; link_count];
        let mut devices = Vec::new();
        let mut n = 0;
        for row in 0..frame_height / panel_size {
            for col in 0..frame_width / panel_size {
                let link = n % link_count;
                if next_id[link] == FRAME_SYNC {
                    next_id[link] += 1;
                }
                devices.push(DeviceSpec {
                    id: next_id[link],
                    link,
                    origin_x: col * panel_size,
                    origin_y: row * panel_size,
                });
                next_id[link] = next_id[link].wrapping_add(1);
                n += 1;
            }
        }
        Self::new(frame_width, frame_height, panel_size, link_count, devices)
    }

    /// Frame width in pixels
    pub fn frame_width(&self) -> usize {
        self.frame_width
    }

    /// Frame height in pixels
    pub fn frame_height(&self) -> usize {
        self.frame_height
    }

    /// Panel edge length in pixels
    pub fn panel_size(&self) -> usize {
        self.panel_size
    }

    /// Number of links
    pub fn link_count(&self) -> usize {
        self.link_count
    }

    /// All receivers
    pub fn devices(&self) -> &[DeviceSpec] {
        &self.devices
    }

    /// Receivers on one link
    pub fn devices_on(&self, link: usize) -> impl Iterator<Item = &DeviceSpec> {
        self.devices.iter().filter(move |d| d.link == link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(id: u8, link: usize, x: usize, y: usize) -> DeviceSpec {
        DeviceSpec {
            id,
            link,
            origin_x: x,
            origin_y: y,
        }
    }

    #[test]
    fn test_valid_topology() {
        let topo = Topology::new(16, 8, 8, 2, vec![dev(0, 0, 0, 0), dev(0, 1, 8, 0)]).unwrap();
        assert_eq!(topo.devices().len(), 2);
        assert_eq!(topo.devices_on(1).count(), 1);
    }

    #[test]
    fn test_rejects_duplicate_id_on_link() {
        let result = Topology::new(16, 8, 8, 1, vec![dev(3, 0, 0, 0), dev(3, 0, 8, 0)]);
        assert!(matches!(result, Err(LedToneError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_sync_id_and_bad_geometry() {
        assert!(Topology::new(8, 8, 8, 1, vec![dev(FRAME_SYNC, 0, 0, 0)]).is_err());
        assert!(Topology::new(8, 8, 8, 1, vec![dev(1, 1, 0, 0)]).is_err());
        assert!(Topology::new(8, 8, 8, 1, vec![dev(1, 0, 4, 0)]).is_err());
        assert!(Topology::new(9, 9, 3, 1, vec![dev(1, 0, 0, 0)]).is_err());
        assert!(Topology::new(8, 8, 0, 1, vec![]).is_err());
    }

    #[test]
    fn test_grid_assigns_per_link_ids() {
        let topo = Topology::grid(32, 16, 8, 2).unwrap();
        assert_eq!(topo.devices().len(), 8);
        let link0: Vec<u8> = topo.devices_on(0).map(|d| d.id).collect();
        let link1: Vec<u8> = topo.devices_on(1).map(|d| d.id).collect();
        assert_eq!(link0, vec![0, 1, 2, 3]);
        assert_eq!(link1, vec![0, 1, 2, 3]);
        assert_eq!(topo.devices()[5].origin_x, 8);
        assert_eq!(topo.devices()[5].origin_y, 8);
    }
}

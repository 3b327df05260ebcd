/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/

//! Locating the bridge's block device through sysfs.
//!
//! A `vvvv:pppp` selector is resolved by walking `/sys/bus/scsi/devices`,
//! matching each SCSI host's USB ancestor against the wanted VID/PID, and
//! then mapping the host number back to its `/dev` node via `/sys/block`.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

const SCSI_DEVICES: &str = "/sys/bus/scsi/devices";
const BLOCK_DEVICES: &str = "/sys/block";

/// Parses a `vvvv:pppp` USB selector into (vendor, product) IDs.
///
/// Returns `None` for anything that is not four hex digits, a colon, four
/// hex digits, so plain device paths fall through to the caller.
pub fn parse_usb_selector(selector: &str) -> Option<(u16, u16)> {
    let (vid, pid) = selector.split_once(':')?;
    if vid.len() != 4 || pid.len() != 4 {
        return None;
    }

    let vid = u16::from_str_radix(vid, 16).ok()?;
    let pid = u16::from_str_radix(pid, 16).ok()?;
    Some((vid, pid))
}

/// Returns the `/dev` block device nodes of all attached USB storage
/// devices matching `vid`/`pid`. A zero ID matches anything.
pub fn find_usb_storage(vid: u16, pid: u16) -> Result<Vec<String>> {
    scan(Path::new(SCSI_DEVICES), Path::new(BLOCK_DEVICES), vid, pid)
}

fn scan(scsi: &Path, block: &Path, vid: u16, pid: u16) -> Result<Vec<String>> {
    let mut nodes = Vec::new();

    for entry in fs::read_dir(scsi)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(host) = name.strip_prefix("host") else { continue };
        let Ok(host) = host.parse::<u32>() else { continue };

        // The host directory sits two levels below the USB interface that
        // carries the idVendor/idProduct attributes.
        let dev = entry.path();
        let Ok(vendor) = read_id(&dev.join("../../idVendor")) else { continue };
        let product = read_id(&dev.join("../../idProduct")).unwrap_or(0);

        if (vid > 0 && vendor != vid) || (pid > 0 && product != pid) {
            continue;
        }

        if let Ok(node) = block_device_for_host(block, host) {
            nodes.push(node);
        }
    }

    Ok(nodes)
}

fn read_id(path: &Path) -> Result<u16> {
    let text = fs::read_to_string(path)?;
    let digits = text.get(..4).ok_or(Error::scsi("sysfs id attribute is too short"))?;
    u16::from_str_radix(digits, 16).map_err(|_| Error::scsi("sysfs id attribute is not hex"))
}

fn block_device_for_host(block: &Path, host: u32) -> Result<String> {
    for entry in fs::read_dir(block)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };

        let Ok(dst) = fs::read_link(entry.path().join("device")) else { continue };
        let Some(dst) = dst.to_str() else { continue };

        // The link target names the SCSI address as "../../../H:C:T:L".
        let Some(addr) = dst.strip_prefix("../../../") else { continue };
        let Some((h, _)) = addr.split_once(':') else { continue };
        if h.parse() == Ok(host) {
            return Ok(format!("/dev/{name}"));
        }
    }

    Err(Error::scsi(format!("no block device for SCSI host {host}")))
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::symlink;

    use super::*;

    #[test]
    fn selector_parsing() {
        assert_eq!(parse_usb_selector("152d:0578"), Some((0x152D, 0x0578)));
        assert_eq!(parse_usb_selector("0000:0000"), Some((0, 0)));
        assert_eq!(parse_usb_selector("/dev/sdb"), None);
        assert_eq!(parse_usb_selector("152d-0578"), None);
        assert_eq!(parse_usb_selector("152d:57"), None);
        assert_eq!(parse_usb_selector("152d:05zz"), None);
        assert_eq!(parse_usb_selector(""), None);
    }

    /// Lays out the part of sysfs the scanner looks at:
    ///
    /// ```text
    /// usb/<port>/idVendor, idProduct
    /// usb/<port>/iface/hostN          (scsi/hostN symlinks here)
    /// block/<name>/device -> ../../../H:0:0:0
    /// ```
    struct FakeSysfs {
        root: tempfile::TempDir,
    }

    impl FakeSysfs {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            fs::create_dir_all(root.path().join("scsi")).unwrap();
            fs::create_dir_all(root.path().join("block")).unwrap();
            FakeSysfs { root }
        }

        fn add_bridge(&self, port: &str, vid: &str, pid: &str, host: u32, node: &str) {
            let usb = self.root.path().join("usb").join(port);
            let iface = usb.join("iface");
            fs::create_dir_all(&iface).unwrap();
            fs::write(usb.join("idVendor"), format!("{vid}\n")).unwrap();
            fs::write(usb.join("idProduct"), format!("{pid}\n")).unwrap();

            let hostdir = iface.join(format!("host{host}"));
            fs::create_dir(&hostdir).unwrap();
            symlink(&hostdir, self.root.path().join("scsi").join(format!("host{host}"))).unwrap();

            let blockdir = self.root.path().join("block").join(node);
            fs::create_dir(&blockdir).unwrap();
            symlink(format!("../../../{host}:0:0:0"), blockdir.join("device")).unwrap();
        }

        fn scan(&self, vid: u16, pid: u16) -> Vec<String> {
            scan(&self.root.path().join("scsi"), &self.root.path().join("block"), vid, pid)
                .unwrap()
        }
    }

    #[test]
    fn finds_the_matching_bridge() {
        let sysfs = FakeSysfs::new();
        sysfs.add_bridge("1-1", "152d", "0578", 4, "sdb");
        sysfs.add_bridge("1-2", "0781", "5583", 5, "sdc");

        assert_eq!(sysfs.scan(0x152D, 0x0578), vec!["/dev/sdb".to_string()]);
        assert_eq!(sysfs.scan(0x0781, 0x5583), vec!["/dev/sdc".to_string()]);
        assert!(sysfs.scan(0x152D, 0x0579).is_empty());
    }

    #[test]
    fn zero_ids_are_wildcards() {
        let sysfs = FakeSysfs::new();
        sysfs.add_bridge("1-1", "152d", "0578", 4, "sdb");
        sysfs.add_bridge("1-2", "152d", "1337", 5, "sdc");

        let mut nodes = sysfs.scan(0x152D, 0);
        nodes.sort();
        assert_eq!(nodes, vec!["/dev/sdb".to_string(), "/dev/sdc".to_string()]);
    }

    #[test]
    fn hosts_without_a_block_device_are_skipped() {
        let sysfs = FakeSysfs::new();
        sysfs.add_bridge("1-1", "152d", "0578", 4, "sdb");
        fs::remove_dir_all(sysfs.root.path().join("block").join("sdb")).unwrap();

        assert!(sysfs.scan(0x152D, 0x0578).is_empty());
    }
}

//! Populating the Windows-oriented XML properties of an image.
//!
//! Finds the most plausible system-root directory among the image's
//! top-level directories, then derives properties from the files under
//! it: the architecture from `System32/kernel32.dll`, edition and version
//! data from the SOFTWARE hive, service-pack and language data from the
//! SYSTEM hive. Nothing here is load-bearing for the archive itself:
//! every failure short of allocation failure degrades to a warning and a
//! missing property.

use wim_meta::case::{CaseSensitivity, upcase_name};
use wim_meta::parse::CancelCheck;
use wim_meta::tree::{DentryId, DentryTree};

use crate::WimError;
use crate::providers::{
    BlobProvider, HiveStatus, RegistryHive, RegistryHiveParser, XmlPropertySink,
};
use crate::windows::{languages, pe};

const CURRENT_VERSION_KEY: &str = r"Microsoft\Windows NT\CurrentVersion";
const WINDOWS_KEY: &str = r"ControlSet001\Control\Windows";
const PRODUCT_OPTIONS_KEY: &str = r"ControlSet001\Control\ProductOptions";
const HAL_KEY: &str = r"ControlSet001\Enum\Root\ACPI_HAL\0000";
const UI_LANGUAGES_KEY: &str = r"ControlSet001\Control\MUI\UILanguages";
const NLS_LANGUAGE_KEY: &str = r"ControlSet001\Control\Nls\Language";

/// The chosen system root and the well-known files found under it.
struct SystemRoot {
    dir: DentryId,
    score: u32,
    kernel32: Option<DentryId>,
    software: Option<DentryId>,
    system: Option<DentryId>,
}

/// Inspect the image tree and set the Windows-specific XML properties.
///
/// Returns without touching the document when no top-level directory
/// looks like a system root. Only allocation failure (from the XML sink
/// or the hive parser) and cancellation are errors.
pub fn set_windows_specific_info(
    tree: &DentryTree,
    blobs: &dyn BlobProvider,
    hives: &dyn RegistryHiveParser,
    xml: &mut dyn XmlPropertySink,
    cancel: Option<&CancelCheck<'_>>,
) -> Result<(), WimError> {
    let Some(root) = tree.root() else {
        return Ok(());
    };
    let Some(sysroot) = pick_system_root(tree, root) else {
        return Ok(());
    };
    if sysroot.score == 0 {
        return Ok(());
    }

    let name = tree.dentry(sysroot.dir).name.as_units().to_vec();
    let sysroot_name = String::from_utf16_lossy(&upcase_name(&name));
    xml.set("WINDOWS/SYSTEMROOT", &sysroot_name)?;

    if let Some(kernel32) = sysroot.kernel32 {
        check_cancelled(cancel)?;
        harvest_arch(tree, blobs, kernel32, xml)?;
    }
    if let Some(software) = sysroot.software {
        check_cancelled(cancel)?;
        if let Some(bytes) = read_file_blob(tree, blobs, software, "SOFTWARE") {
            match hives.open(&bytes) {
                Ok(hive) => harvest_software(&*hive, xml)?,
                Err(HiveStatus::OutOfMemory) => return Err(WimError::OutOfMemory),
                Err(status) => log::warn!("Ignoring invalid SOFTWARE hive ({status:?})"),
            }
        }
    }
    if let Some(system) = sysroot.system {
        check_cancelled(cancel)?;
        if let Some(bytes) = read_file_blob(tree, blobs, system, "SYSTEM") {
            match hives.open(&bytes) {
                Ok(hive) => harvest_system(&*hive, xml)?,
                Err(HiveStatus::OutOfMemory) => return Err(WimError::OutOfMemory),
                Err(status) => log::warn!("Ignoring invalid SYSTEM hive ({status:?})"),
            }
        }
    }
    Ok(())
}

fn check_cancelled(cancel: Option<&CancelCheck<'_>>) -> Result<(), WimError> {
    match cancel {
        Some(cancel) if cancel() => Err(WimError::Cancelled),
        _ => Ok(()),
    }
}

/// Score each top-level directory by how many of the well-known files it
/// holds; ties go to a directory literally named `Windows` (any case).
fn pick_system_root(tree: &DentryTree, root: DentryId) -> Option<SystemRoot> {
    let windows_name: Vec<u16> = "WINDOWS".encode_utf16().collect();
    let mut best: Option<SystemRoot> = None;
    for dir in tree.children(root) {
        if !tree.is_directory(dir) {
            continue;
        }
        let kernel32 = lookup_under(tree, dir, &["System32", "kernel32.dll"]);
        let software = lookup_under(tree, dir, &["System32", "config", "SOFTWARE"]);
        let system = lookup_under(tree, dir, &["System32", "config", "SYSTEM"]);
        let candidate = SystemRoot {
            dir,
            score: [kernel32, software, system]
                .iter()
                .filter(|found| found.is_some())
                .count() as u32,
            kernel32,
            software,
            system,
        };
        let is_windows =
            |id: DentryId| upcase_name(tree.dentry(id).name.as_units()) == windows_name;
        let wins = match &best {
            None => true,
            Some(current) => {
                candidate.score > current.score
                    || (candidate.score == current.score
                        && is_windows(candidate.dir)
                        && !is_windows(current.dir))
            }
        };
        if wins {
            best = Some(candidate);
        }
    }
    best
}

fn lookup_under(tree: &DentryTree, base: DentryId, components: &[&str]) -> Option<DentryId> {
    let mut current = base;
    for component in components {
        if !tree.is_directory(current) {
            return None;
        }
        let units: Vec<u16> = component.encode_utf16().collect();
        current = tree.lookup_child(current, &units, CaseSensitivity::Insensitive)?;
    }
    Some(current)
}

/// Contents of a file's unnamed data stream, or `None` with a warning.
fn read_file_blob(
    tree: &DentryTree,
    blobs: &dyn BlobProvider,
    id: DentryId,
    what: &str,
) -> Option<Vec<u8>> {
    let inode = tree.inode_of(id);
    let hash = match inode.unnamed_data_stream() {
        Some(stream) if !stream.hash.is_zero() => stream.hash,
        _ => {
            log::warn!("{what} has no contents; skipping");
            return None;
        }
    };
    let mut bytes = Vec::new();
    match blobs
        .open_blob(&hash)
        .and_then(|mut blob| std::io::Read::read_to_end(&mut blob, &mut bytes))
    {
        Ok(_) => Some(bytes),
        Err(err) => {
            log::warn!("Unable to read {what}: {err}");
            None
        }
    }
}

fn harvest_arch(
    tree: &DentryTree,
    blobs: &dyn BlobProvider,
    kernel32: DentryId,
    xml: &mut dyn XmlPropertySink,
) -> Result<(), WimError> {
    let Some(bytes) = read_file_blob(tree, blobs, kernel32, "kernel32.dll") else {
        return Ok(());
    };
    match pe::machine(&bytes) {
        Ok(machine) => match pe::machine_to_arch(machine) {
            Some(arch) => xml.set("WINDOWS/ARCH", &arch.to_string())?,
            None => log::warn!("Unrecognized PE machine {machine:#06x} in kernel32.dll"),
        },
        Err(err) => log::warn!("kernel32.dll is not a valid PE image: {err}"),
    }
    Ok(())
}

/// Copy one hive string value to one or more XML properties, warning on
/// anything but success.
fn copy_string(
    hive: &dyn RegistryHive,
    key: &str,
    value: &str,
    xml: &mut dyn XmlPropertySink,
    properties: &[&str],
) -> Result<(), WimError> {
    match hive.get_string(key, value) {
        Ok(text) => {
            for property in properties {
                xml.set(property, &text)?;
            }
        }
        Err(HiveStatus::OutOfMemory) => return Err(WimError::OutOfMemory),
        Err(status) => log::warn!("No usable {key}\\{value} ({status:?})"),
    }
    Ok(())
}

fn harvest_software(
    hive: &dyn RegistryHive,
    xml: &mut dyn XmlPropertySink,
) -> Result<(), WimError> {
    copy_string(
        hive,
        CURRENT_VERSION_KEY,
        "EditionID",
        xml,
        &["FLAGS", "WINDOWS/EDITIONID"],
    )?;
    copy_string(
        hive,
        CURRENT_VERSION_KEY,
        "ProductName",
        xml,
        &["DISPLAYNAME", "DISPLAYDESCRIPTION", "WINDOWS/PRODUCTNAME"],
    )?;
    copy_string(
        hive,
        CURRENT_VERSION_KEY,
        "InstallationType",
        xml,
        &["WINDOWS/INSTALLATIONTYPE"],
    )?;

    // Version numbers: the explicit DWORD values exist from Windows 10 on;
    // older hives only have the "M.N" string.
    let version = match (
        hive.get_number(CURRENT_VERSION_KEY, "CurrentMajorVersionNumber"),
        hive.get_number(CURRENT_VERSION_KEY, "CurrentMinorVersionNumber"),
    ) {
        (Ok(major), Ok(minor)) => Some((major, minor)),
        (Err(HiveStatus::OutOfMemory), _) | (_, Err(HiveStatus::OutOfMemory)) => {
            return Err(WimError::OutOfMemory);
        }
        _ => match hive.get_string(CURRENT_VERSION_KEY, "CurrentVersion") {
            Ok(text) => parse_version_string(&text),
            Err(HiveStatus::OutOfMemory) => return Err(WimError::OutOfMemory),
            Err(status) => {
                log::warn!("No usable Windows version number ({status:?})");
                None
            }
        },
    };
    if let Some((major, minor)) = version {
        xml.set("WINDOWS/VERSION/MAJOR", &major.to_string())?;
        xml.set("WINDOWS/VERSION/MINOR", &minor.to_string())?;
    }

    // Build number: CurrentBuild, unless it is a bogus dotted value left
    // by some upgrade paths, then CurrentBuildNumber.
    let build = match hive.get_string(CURRENT_VERSION_KEY, "CurrentBuild") {
        Ok(build) if !build.contains('.') => Some(build),
        Err(HiveStatus::OutOfMemory) => return Err(WimError::OutOfMemory),
        _ => match hive.get_string(CURRENT_VERSION_KEY, "CurrentBuildNumber") {
            Ok(build) => Some(build),
            Err(HiveStatus::OutOfMemory) => return Err(WimError::OutOfMemory),
            Err(status) => {
                log::warn!("No usable Windows build number ({status:?})");
                None
            }
        },
    };
    if let Some(build) = build {
        xml.set("WINDOWS/VERSION/BUILD", &build)?;
    }
    Ok(())
}

fn parse_version_string(text: &str) -> Option<(u64, u64)> {
    let (major, minor) = text.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

fn harvest_system(
    hive: &dyn RegistryHive,
    xml: &mut dyn XmlPropertySink,
) -> Result<(), WimError> {
    match hive.get_number(WINDOWS_KEY, "CSDBuildNumber") {
        Ok(build) => xml.set("WINDOWS/VERSION/SPBUILD", &build.to_string())?,
        Err(HiveStatus::OutOfMemory) => return Err(WimError::OutOfMemory),
        Err(status) => log::warn!("No usable CSDBuildNumber ({status:?})"),
    }
    match hive.get_number(WINDOWS_KEY, "CSDVersion") {
        Ok(version) => xml.set("WINDOWS/VERSION/SPLEVEL", &(version >> 8).to_string())?,
        Err(HiveStatus::OutOfMemory) => return Err(WimError::OutOfMemory),
        Err(status) => log::warn!("No usable CSDVersion ({status:?})"),
    }
    copy_string(
        hive,
        PRODUCT_OPTIONS_KEY,
        "ProductType",
        xml,
        &["WINDOWS/PRODUCTTYPE"],
    )?;
    copy_string(
        hive,
        PRODUCT_OPTIONS_KEY,
        "ProductSuite",
        xml,
        &["WINDOWS/PRODUCTSUITE"],
    )?;
    copy_string(hive, HAL_KEY, "FriendlyName", xml, &["WINDOWS/HAL"])?;

    match hive.list_subkeys(UI_LANGUAGES_KEY) {
        Ok(languages) => {
            for (index, language) in languages.iter().enumerate() {
                xml.set(
                    &format!("WINDOWS/LANGUAGES/LANGUAGE[{}]", index + 1),
                    language,
                )?;
            }
        }
        Err(HiveStatus::OutOfMemory) => return Err(WimError::OutOfMemory),
        Err(status) => log::warn!("No usable UILanguages ({status:?})"),
    }
    match hive.get_string(NLS_LANGUAGE_KEY, "InstallLanguage") {
        Ok(hex_id) => match u16::from_str_radix(hex_id.trim(), 16) {
            Ok(id) => match languages::language_name(id) {
                Some(name) => xml.set("WINDOWS/LANGUAGES/DEFAULT", name)?,
                None => log::warn!("Unknown install language id {id:#06x}"),
            },
            Err(_) => log::warn!("Unparsable InstallLanguage \"{hex_id}\""),
        },
        Err(HiveStatus::OutOfMemory) => return Err(WimError::OutOfMemory),
        Err(status) => log::warn!("No usable InstallLanguage ({status:?})"),
    }
    Ok(())
}

//! Harvester tests against in-memory fakes of the external collaborators.

use std::collections::HashMap;
use std::io::Read;

use wim::{
    BlobProvider, DentryId, DentryTree, FileAttributes, HiveResult, HiveStatus, Inode, InodeId,
    RegistryHive, RegistryHiveParser, Sha1Hash, SizedWideString, StreamType, WimError,
    XmlPropertySink, set_windows_specific_info,
};

fn hash(byte: u8) -> Sha1Hash {
    Sha1Hash([byte; 20])
}

fn dir_inode() -> Inode {
    Inode::new(FileAttributes::new().with_directory(true))
}

fn tree_with_root() -> (DentryTree, DentryId) {
    let mut tree = DentryTree::new();
    let inode = tree.new_inode(dir_inode());
    let root = tree.new_dentry(SizedWideString::default(), SizedWideString::default(), inode);
    tree.set_root(root);
    (tree, root)
}

fn add_named(tree: &mut DentryTree, parent: DentryId, name: &str, inode: InodeId) -> DentryId {
    let dentry = tree.new_dentry(SizedWideString::from(name), SizedWideString::default(), inode);
    tree.link(parent, dentry).unwrap();
    dentry
}

fn add_dir(tree: &mut DentryTree, parent: DentryId, name: &str) -> DentryId {
    let inode = tree.new_inode(dir_inode());
    add_named(tree, parent, name, inode)
}

fn add_file(tree: &mut DentryTree, parent: DentryId, name: &str, contents: Sha1Hash) -> DentryId {
    let mut inode = Inode::new(FileAttributes::new().with_archive(true));
    inode.add_stream(StreamType::Data, SizedWideString::default(), contents);
    let inode = tree.new_inode(inode);
    add_named(tree, parent, name, inode)
}

fn minimal_pe(machine: u16) -> Vec<u8> {
    let mut image = vec![0u8; 0x48];
    image[0] = b'M';
    image[1] = b'Z';
    image[0x3c..0x40].copy_from_slice(&0x40u32.to_le_bytes());
    image[0x40..0x44].copy_from_slice(b"PE\0\0");
    image[0x44..0x46].copy_from_slice(&machine.to_le_bytes());
    image
}

#[derive(Default)]
struct FakeBlobStore {
    blobs: HashMap<Sha1Hash, Vec<u8>>,
}

impl BlobProvider for FakeBlobStore {
    fn blob_size(&self, hash: &Sha1Hash) -> std::io::Result<u64> {
        self.blobs
            .get(hash)
            .map(|b| b.len() as u64)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no such blob"))
    }

    fn open_blob(&self, hash: &Sha1Hash) -> std::io::Result<Box<dyn Read + '_>> {
        self.blobs
            .get(hash)
            .map(|b| Box::new(b.as_slice()) as Box<dyn Read + '_>)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no such blob"))
    }
}

#[derive(Default, Clone)]
struct FakeHive {
    strings: HashMap<(String, String), String>,
    numbers: HashMap<(String, String), u64>,
    subkeys: HashMap<String, Vec<String>>,
}

impl FakeHive {
    fn string(mut self, key: &str, value: &str, data: &str) -> Self {
        self.strings
            .insert((key.to_string(), value.to_string()), data.to_string());
        self
    }

    fn number(mut self, key: &str, value: &str, data: u64) -> Self {
        self.numbers
            .insert((key.to_string(), value.to_string()), data);
        self
    }

    fn with_subkeys(mut self, key: &str, names: &[&str]) -> Self {
        self.subkeys.insert(
            key.to_string(),
            names.iter().map(|n| n.to_string()).collect(),
        );
        self
    }
}

impl RegistryHive for FakeHive {
    fn get_string(&self, key: &str, value: &str) -> HiveResult<String> {
        self.strings
            .get(&(key.to_string(), value.to_string()))
            .cloned()
            .ok_or(HiveStatus::NotFound)
    }

    fn get_number(&self, key: &str, value: &str) -> HiveResult<u64> {
        self.numbers
            .get(&(key.to_string(), value.to_string()))
            .copied()
            .ok_or(HiveStatus::NotFound)
    }

    fn list_subkeys(&self, key: &str) -> HiveResult<Vec<String>> {
        self.subkeys.get(key).cloned().ok_or(HiveStatus::NotFound)
    }
}

/// Hands out clones of one prepared hive for any buffer that carries the
/// hive magic.
struct FakeHiveParser {
    hive: FakeHive,
}

impl RegistryHiveParser for FakeHiveParser {
    fn open<'a>(&'a self, bytes: &'a [u8]) -> HiveResult<Box<dyn RegistryHive + 'a>> {
        if !bytes.starts_with(b"regf") {
            return Err(HiveStatus::Invalid);
        }
        Ok(Box::new(self.hive.clone()))
    }
}

/// A parser that always reports allocation failure.
struct OomHiveParser;

impl RegistryHiveParser for OomHiveParser {
    fn open<'a>(&'a self, _bytes: &'a [u8]) -> HiveResult<Box<dyn RegistryHive + 'a>> {
        Err(HiveStatus::OutOfMemory)
    }
}

#[derive(Default)]
struct RecordingXml {
    properties: Vec<(String, String)>,
}

impl RecordingXml {
    fn get(&self, path: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, v)| v.as_str())
    }
}

impl XmlPropertySink for RecordingXml {
    fn set(&mut self, path: &str, value: &str) -> Result<(), WimError> {
        self.properties.push((path.to_string(), value.to_string()));
        Ok(())
    }
}

/// An image shaped like scenario S6: `WINDOWS/System32/kernel32.dll` with
/// an AMD64 PE header and no hives.
fn s6_image() -> (DentryTree, FakeBlobStore) {
    let (mut tree, root) = tree_with_root();
    let windows = add_dir(&mut tree, root, "WINDOWS");
    let system32 = add_dir(&mut tree, windows, "System32");
    add_file(&mut tree, system32, "kernel32.dll", hash(0x42));
    let mut blobs = FakeBlobStore::default();
    blobs.blobs.insert(hash(0x42), minimal_pe(0x8664));
    (tree, blobs)
}

#[test]
fn test_sysroot_and_arch_from_pe() {
    let (tree, blobs) = s6_image();
    let parser = FakeHiveParser {
        hive: FakeHive::default(),
    };
    let mut xml = RecordingXml::default();
    set_windows_specific_info(&tree, &blobs, &parser, &mut xml, None).unwrap();
    assert_eq!(xml.get("WINDOWS/SYSTEMROOT"), Some("WINDOWS"));
    assert_eq!(xml.get("WINDOWS/ARCH"), Some("9"));
    // Missing hives are warnings, not failures, and set nothing else.
    assert_eq!(xml.properties.len(), 2);
}

#[test]
fn test_no_system_root_sets_nothing() {
    let (mut tree, root) = tree_with_root();
    add_dir(&mut tree, root, "data");
    add_file(&mut tree, root, "notes.txt", hash(1));
    let parser = FakeHiveParser {
        hive: FakeHive::default(),
    };
    let mut xml = RecordingXml::default();
    set_windows_specific_info(&tree, &FakeBlobStore::default(), &parser, &mut xml, None)
        .unwrap();
    assert!(xml.properties.is_empty());
}

#[test]
fn test_tie_break_prefers_windows() {
    let (mut tree, root) = tree_with_root();
    for name in ["Aaa", "Windows", "Zzz"] {
        let dir = add_dir(&mut tree, root, name);
        let system32 = add_dir(&mut tree, dir, "System32");
        add_file(&mut tree, system32, "kernel32.dll", hash(0x42));
    }
    let mut blobs = FakeBlobStore::default();
    blobs.blobs.insert(hash(0x42), minimal_pe(0x014c));
    let parser = FakeHiveParser {
        hive: FakeHive::default(),
    };
    let mut xml = RecordingXml::default();
    set_windows_specific_info(&tree, &blobs, &parser, &mut xml, None).unwrap();
    assert_eq!(xml.get("WINDOWS/SYSTEMROOT"), Some("WINDOWS"));
    assert_eq!(xml.get("WINDOWS/ARCH"), Some("0"));
}

#[test]
fn test_unknown_machine_warns_only() {
    let (mut tree, root) = tree_with_root();
    let windows = add_dir(&mut tree, root, "Windows");
    let system32 = add_dir(&mut tree, windows, "System32");
    add_file(&mut tree, system32, "kernel32.dll", hash(0x42));
    let mut blobs = FakeBlobStore::default();
    blobs.blobs.insert(hash(0x42), minimal_pe(0x5032)); // RISC-V
    let parser = FakeHiveParser {
        hive: FakeHive::default(),
    };
    let mut xml = RecordingXml::default();
    set_windows_specific_info(&tree, &blobs, &parser, &mut xml, None).unwrap();
    assert_eq!(xml.get("WINDOWS/SYSTEMROOT"), Some("WINDOWS"));
    assert_eq!(xml.get("WINDOWS/ARCH"), None);
}

fn image_with_hives() -> (DentryTree, FakeBlobStore) {
    let (mut tree, root) = tree_with_root();
    let windows = add_dir(&mut tree, root, "Windows");
    let system32 = add_dir(&mut tree, windows, "System32");
    add_file(&mut tree, system32, "kernel32.dll", hash(0x42));
    let config = add_dir(&mut tree, system32, "config");
    add_file(&mut tree, config, "SOFTWARE", hash(0x50));
    add_file(&mut tree, config, "SYSTEM", hash(0x51));

    let mut blobs = FakeBlobStore::default();
    blobs.blobs.insert(hash(0x42), minimal_pe(0x8664));
    blobs.blobs.insert(hash(0x50), b"regf-software".to_vec());
    blobs.blobs.insert(hash(0x51), b"regf-system".to_vec());
    (tree, blobs)
}

const CURRENT_VERSION: &str = r"Microsoft\Windows NT\CurrentVersion";
const CONTROL: &str = r"ControlSet001\Control";

#[test]
fn test_full_hive_harvest() {
    use const_format::concatcp;

    let (tree, blobs) = image_with_hives();
    let hive = FakeHive::default()
        .string(CURRENT_VERSION, "EditionID", "Professional")
        .string(CURRENT_VERSION, "ProductName", "Windows 10 Pro")
        .string(CURRENT_VERSION, "InstallationType", "Client")
        .string(CURRENT_VERSION, "CurrentBuild", "19041")
        .number(CURRENT_VERSION, "CurrentMajorVersionNumber", 10)
        .number(CURRENT_VERSION, "CurrentMinorVersionNumber", 0)
        .number(concatcp!(CONTROL, r"\Windows"), "CSDBuildNumber", 1234)
        .number(concatcp!(CONTROL, r"\Windows"), "CSDVersion", 0x300)
        .string(concatcp!(CONTROL, r"\ProductOptions"), "ProductType", "WinNT")
        .string(
            concatcp!(CONTROL, r"\ProductOptions"),
            "ProductSuite",
            "Terminal Server",
        )
        .string(
            r"ControlSet001\Enum\Root\ACPI_HAL\0000",
            "FriendlyName",
            "ACPI x64-based PC",
        )
        .string(concatcp!(CONTROL, r"\Nls\Language"), "InstallLanguage", "0409")
        .with_subkeys(concatcp!(CONTROL, r"\MUI\UILanguages"), &["de-DE", "en-US"]);
    let parser = FakeHiveParser { hive };
    let mut xml = RecordingXml::default();
    set_windows_specific_info(&tree, &blobs, &parser, &mut xml, None).unwrap();

    assert_eq!(xml.get("WINDOWS/SYSTEMROOT"), Some("WINDOWS"));
    assert_eq!(xml.get("WINDOWS/ARCH"), Some("9"));
    assert_eq!(xml.get("FLAGS"), Some("Professional"));
    assert_eq!(xml.get("WINDOWS/EDITIONID"), Some("Professional"));
    assert_eq!(xml.get("DISPLAYNAME"), Some("Windows 10 Pro"));
    assert_eq!(xml.get("DISPLAYDESCRIPTION"), Some("Windows 10 Pro"));
    assert_eq!(xml.get("WINDOWS/PRODUCTNAME"), Some("Windows 10 Pro"));
    assert_eq!(xml.get("WINDOWS/INSTALLATIONTYPE"), Some("Client"));
    assert_eq!(xml.get("WINDOWS/VERSION/MAJOR"), Some("10"));
    assert_eq!(xml.get("WINDOWS/VERSION/MINOR"), Some("0"));
    assert_eq!(xml.get("WINDOWS/VERSION/BUILD"), Some("19041"));
    assert_eq!(xml.get("WINDOWS/VERSION/SPBUILD"), Some("1234"));
    assert_eq!(xml.get("WINDOWS/VERSION/SPLEVEL"), Some("3"));
    assert_eq!(xml.get("WINDOWS/PRODUCTTYPE"), Some("WinNT"));
    assert_eq!(xml.get("WINDOWS/PRODUCTSUITE"), Some("Terminal Server"));
    assert_eq!(xml.get("WINDOWS/HAL"), Some("ACPI x64-based PC"));
    assert_eq!(xml.get("WINDOWS/LANGUAGES/LANGUAGE[1]"), Some("de-DE"));
    assert_eq!(xml.get("WINDOWS/LANGUAGES/LANGUAGE[2]"), Some("en-US"));
    assert_eq!(xml.get("WINDOWS/LANGUAGES/DEFAULT"), Some("en-US"));
}

#[test]
fn test_version_falls_back_to_string() {
    let (tree, blobs) = image_with_hives();
    let hive = FakeHive::default().string(CURRENT_VERSION, "CurrentVersion", "6.1");
    let parser = FakeHiveParser { hive };
    let mut xml = RecordingXml::default();
    set_windows_specific_info(&tree, &blobs, &parser, &mut xml, None).unwrap();
    assert_eq!(xml.get("WINDOWS/VERSION/MAJOR"), Some("6"));
    assert_eq!(xml.get("WINDOWS/VERSION/MINOR"), Some("1"));
}

#[test]
fn test_dotted_build_falls_back() {
    let (tree, blobs) = image_with_hives();
    let hive = FakeHive::default()
        .string(CURRENT_VERSION, "CurrentBuild", "6.0")
        .string(CURRENT_VERSION, "CurrentBuildNumber", "6002");
    let parser = FakeHiveParser { hive };
    let mut xml = RecordingXml::default();
    set_windows_specific_info(&tree, &blobs, &parser, &mut xml, None).unwrap();
    assert_eq!(xml.get("WINDOWS/VERSION/BUILD"), Some("6002"));
}

#[test]
fn test_invalid_hive_is_warning_only() {
    let (mut tree, root) = tree_with_root();
    let windows = add_dir(&mut tree, root, "Windows");
    let system32 = add_dir(&mut tree, windows, "System32");
    let config = add_dir(&mut tree, system32, "config");
    add_file(&mut tree, config, "SOFTWARE", hash(0x50));
    let mut blobs = FakeBlobStore::default();
    blobs.blobs.insert(hash(0x50), b"not a hive".to_vec());
    let parser = FakeHiveParser {
        hive: FakeHive::default().string(CURRENT_VERSION, "EditionID", "X"),
    };
    let mut xml = RecordingXml::default();
    set_windows_specific_info(&tree, &blobs, &parser, &mut xml, None).unwrap();
    assert_eq!(xml.get("WINDOWS/SYSTEMROOT"), Some("WINDOWS"));
    assert_eq!(xml.get("WINDOWS/EDITIONID"), None);
}

#[test]
fn test_out_of_memory_is_fatal() {
    let (tree, blobs) = image_with_hives();
    let mut xml = RecordingXml::default();
    assert!(matches!(
        set_windows_specific_info(&tree, &blobs, &OomHiveParser, &mut xml, None),
        Err(WimError::OutOfMemory)
    ));
}

#[test]
fn test_cancellation_between_blobs() {
    let (tree, blobs) = s6_image();
    let parser = FakeHiveParser {
        hive: FakeHive::default(),
    };
    let mut xml = RecordingXml::default();
    let cancel = || true;
    assert!(matches!(
        set_windows_specific_info(&tree, &blobs, &parser, &mut xml, Some(&cancel)),
        Err(WimError::Cancelled)
    ));
}

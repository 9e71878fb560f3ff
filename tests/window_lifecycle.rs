//! End-to-end exercises of the whole stack: descriptor string in, installed
//! windows out.

use shmwin::{
    DeviceError, InstallError, MapError, MappingRequest, NotConfigured, RecordingFacility,
    RegionDescriptor, RegionRegistry, SeekError, Whence, WindowDevice, PAGE_SIZE,
};

#[test]
fn full_lifecycle_from_descriptor_string() {
    let descriptor: RegionDescriptor = "0x100000000,0x1000000".parse().expect("parse descriptor");
    assert_eq!(descriptor.base, 0x1_0000_0000);
    assert_eq!(descriptor.size, 0x100_0000);

    let registry = RegionRegistry::new();
    registry.install(descriptor).expect("install descriptor");

    let mut device =
        WindowDevice::activate(&registry, RecordingFacility::new()).expect("activate device");
    let session = device.open();

    assert_eq!(device.seek(session, Whence::Start, 0).unwrap(), 0);
    assert_eq!(
        device
            .seek(session, Whence::Current, descriptor.size as i64)
            .unwrap(),
        descriptor.size
    );
    assert!(matches!(
        device.seek(session, Whence::Current, 1),
        Err(DeviceError::Seek(SeekError::OutOfRange { .. }))
    ));
    assert_eq!(device.seek(session, Whence::End, 0).unwrap(), descriptor.size);
    assert!(device.seek(session, Whence::End, 1).is_err());

    let (result, ()) = device
        .map(
            session,
            MappingRequest {
                offset: 0x10_0000,
                length: 0x8000,
            },
        )
        .expect("map window");
    assert_eq!(result.target(), descriptor.base + 0x10_0000);

    device.release(session).expect("release session");
    assert_eq!(device.session_count(), 0);
}

#[test]
fn unconfigured_feature_is_absent_end_to_end() {
    // A malformed descriptor never reaches the registry...
    let parsed = "garbage".parse::<RegionDescriptor>();
    assert!(parsed.is_err());

    // ...so the registry stays unconfigured and activation refuses, which is
    // exactly "feature absent" at the boundary.
    let registry = RegionRegistry::new();
    assert_eq!(registry.get(), Err(NotConfigured));
    let err = WindowDevice::activate(&registry, RecordingFacility::new()).unwrap_err();
    assert!(matches!(err, DeviceError::NotConfigured(_)));
    #[cfg(unix)]
    assert_eq!(err.raw_os_error(), libc::ENODEV);
}

#[test]
fn rejected_descriptors_never_activate() {
    let registry = RegionRegistry::new();
    assert_eq!(
        registry.install(RegionDescriptor {
            base: 0x1001,
            size: PAGE_SIZE
        }),
        Err(InstallError::Unaligned {
            base: 0x1001,
            size: PAGE_SIZE
        })
    );
    assert!(WindowDevice::activate(&registry, RecordingFacility::new()).is_err());
}

#[test]
fn one_bad_consumer_cannot_poison_the_window() {
    let registry = RegionRegistry::new();
    registry
        .install(RegionDescriptor {
            base: 0x20_0000,
            size: 8 * PAGE_SIZE,
        })
        .unwrap();
    let mut device =
        WindowDevice::activate(&registry, RecordingFacility::new()).expect("activate");

    let greedy = device.open();
    let polite = device.open();

    // The greedy consumer throws everything at the device and fails each
    // time.
    assert!(device
        .map(greedy, MappingRequest { offset: 0, length: u64::MAX })
        .is_err());
    assert!(device
        .map(greedy, MappingRequest { offset: 1, length: 8 })
        .is_err());
    assert!(device.seek(greedy, Whence::Start, -1).is_err());

    // The polite one never notices.
    assert_eq!(device.position(polite).unwrap(), 0);
    let (result, ()) = device
        .map(
            polite,
            MappingRequest {
                offset: PAGE_SIZE,
                length: PAGE_SIZE,
            },
        )
        .expect("valid map still works");
    assert_eq!(result.target(), 0x20_0000 + PAGE_SIZE);
}

#[test]
fn facility_outage_is_temporary_by_contract() {
    let registry = RegionRegistry::new();
    registry
        .install(RegionDescriptor {
            base: 0x10_0000,
            size: 4 * PAGE_SIZE,
        })
        .unwrap();
    let facility = RecordingFacility::new();
    facility.fail_next_install();
    let mut device = WindowDevice::activate(&registry, facility).expect("activate");
    let session = device.open();
    let request = MappingRequest {
        offset: 0,
        length: PAGE_SIZE,
    };

    let err = device.map(session, request).unwrap_err();
    assert!(matches!(
        err,
        DeviceError::Map(MapError::InstallFailed(_))
    ));

    // Same request, next call: the outage was the facility's, not ours.
    device.map(session, request).expect("retry succeeds");
}

#[cfg(unix)]
mod unix_backing {
    use std::os::unix::fs::FileExt;

    use shmwin::{
        MappingRequest, PhysMapFile, RegionDescriptor, RegionRegistry, WindowDevice, PAGE_SIZE,
    };

    #[test]
    fn windows_reach_the_backing_file_through_the_device() {
        let base = 1u64 << 32;
        let size = 2 * PAGE_SIZE;
        let file = tempfile::tempfile().expect("create temp backing");
        file.set_len(base + size).expect("extend backing");

        let registry = RegionRegistry::new();
        registry
            .install(RegionDescriptor { base, size })
            .expect("install");

        let mut device = WindowDevice::activate(
            &registry,
            PhysMapFile::from_file(file.try_clone().expect("clone backing fd")),
        )
        .expect("activate");
        let session = device.open();

        let (result, mut mapped) = device
            .map(
                session,
                MappingRequest {
                    offset: PAGE_SIZE,
                    length: PAGE_SIZE,
                },
            )
            .expect("map window");
        assert_eq!(result.target(), base + PAGE_SIZE);

        mapped.write_at(0, b"hello shared window").expect("write");
        let mut buf = [0u8; 19];
        file.read_exact_at(&mut buf, base + PAGE_SIZE)
            .expect("read back through backing file");
        assert_eq!(&buf, b"hello shared window");

        drop(mapped);
        device.release(session).expect("release");
    }
}
